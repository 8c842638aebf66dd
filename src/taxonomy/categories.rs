//! Self-referential category trees. The same shape backs both the product
//! category tree and the blog category tree; `TreeStore` selects the table.
//!
//! Slug collisions are broken by probing with a running count suffix. The
//! probe is not atomic under concurrency; the unique slug constraint is the
//! safety net and fires as a retryable conflict.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tracing::{info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::util::db::Db;
use crate::util::text::{slugify, suffixed};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub category_id: i64,
    pub parent_id: Option<i64>,
    pub category_name: String,
    pub slug: String,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub category_name: String,
    pub parent_id: Option<i64>,
    pub sort_order: i32,
    pub is_active: bool,
}

/// Table selector for the two identically-shaped trees.
#[derive(Debug, Clone, Copy)]
pub struct TreeStore {
    table: &'static str,
    entity: &'static str,
}

pub const CATEGORIES: TreeStore = TreeStore {
    table: "categories",
    entity: "category",
};
pub const ARTICLE_CATEGORIES: TreeStore = TreeStore {
    table: "article_categories",
    entity: "article category",
};

/// Whether attaching `node` under `new_parent` would make the node its own
/// ancestor. `nodes` maps id -> parent id.
pub fn creates_cycle(nodes: &HashMap<i64, Option<i64>>, node: i64, new_parent: Option<i64>) -> bool {
    let mut cursor = new_parent;
    let mut hops = 0usize;
    while let Some(id) = cursor {
        if id == node {
            return true;
        }
        hops += 1;
        if hops > nodes.len() {
            // parent chain already corrupt; refuse the reparent
            return true;
        }
        cursor = nodes.get(&id).copied().flatten();
    }
    false
}

impl TreeStore {
    #[instrument(skip(self, db), fields(table = self.table))]
    pub async fn list(&self, db: &Db) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query_as(&format!(
            "SELECT * FROM {} ORDER BY sort_order, category_name",
            self.table
        ))
        .fetch_all(&db.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, db: &Db, category_id: i64) -> StoreResult<Category> {
        sqlx::query_as(&format!(
            "SELECT * FROM {} WHERE category_id = $1",
            self.table
        ))
        .bind(category_id)
        .fetch_optional(&db.pool)
        .await?
        .ok_or(StoreError::NotFound(self.entity))
    }

    pub async fn get_by_slug(&self, db: &Db, slug: &str) -> StoreResult<Category> {
        sqlx::query_as(&format!(
            "SELECT * FROM {} WHERE slug = $1 AND is_active",
            self.table
        ))
        .bind(slug)
        .fetch_optional(&db.pool)
        .await?
        .ok_or(StoreError::NotFound(self.entity))
    }

    async fn parent_exists(&self, db: &Db, parent_id: i64) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE category_id = $1)",
            self.table
        ))
        .bind(parent_id)
        .fetch_one(&db.pool)
        .await?;
        Ok(exists)
    }

    /// First free `base`, `base-1`, `base-2`, ... candidate.
    async fn free_slug(&self, db: &Db, base: &str) -> StoreResult<String> {
        let mut attempt = 0u32;
        loop {
            let candidate = suffixed(base, attempt);
            let taken: bool = sqlx::query_scalar(&format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE slug = $1)",
                self.table
            ))
            .bind(&candidate)
            .fetch_one(&db.pool)
            .await?;
            if !taken {
                return Ok(candidate);
            }
            attempt += 1;
        }
    }

    #[instrument(skip(self, db, input), fields(table = self.table))]
    pub async fn create(&self, db: &Db, input: CategoryInput) -> StoreResult<Category> {
        let name = input.category_name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::validation("name is required"));
        }
        if let Some(parent_id) = input.parent_id {
            if !self.parent_exists(db, parent_id).await? {
                return Err(StoreError::validation("parent category does not exist"));
            }
        }
        let slug = self.free_slug(db, &slugify(&name)).await?;
        let row: Category = sqlx::query_as(&format!(
            "INSERT INTO {} (parent_id, category_name, slug, is_active, sort_order)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
            self.table
        ))
        .bind(input.parent_id)
        .bind(&name)
        .bind(&slug)
        .bind(input.is_active)
        .bind(input.sort_order)
        .fetch_one(&db.pool)
        .await?;
        info!(category_id = row.category_id, slug = %row.slug, "category created");
        Ok(row)
    }

    /// Rename/reparent. The slug stays stable across renames; reparenting is
    /// rejected when it would make the node its own ancestor.
    #[instrument(skip(self, db, input), fields(table = self.table))]
    pub async fn update(&self, db: &Db, category_id: i64, input: CategoryInput) -> StoreResult<Category> {
        let name = input.category_name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::validation("name is required"));
        }
        // existence check doubles as NotFound signal
        self.get(db, category_id).await?;

        if let Some(parent_id) = input.parent_id {
            if !self.parent_exists(db, parent_id).await? {
                return Err(StoreError::validation("parent category does not exist"));
            }
            let nodes: Vec<(i64, Option<i64>)> =
                sqlx::query_as(&format!("SELECT category_id, parent_id FROM {}", self.table))
                    .fetch_all(&db.pool)
                    .await?;
            let map: HashMap<i64, Option<i64>> = nodes.into_iter().collect();
            if creates_cycle(&map, category_id, Some(parent_id)) {
                return Err(StoreError::validation(
                    "category cannot become its own ancestor",
                ));
            }
        }

        let row: Category = sqlx::query_as(&format!(
            "UPDATE {} SET parent_id = $2, category_name = $3, is_active = $4,
                           sort_order = $5, updated_at = now()
             WHERE category_id = $1
             RETURNING *",
            self.table
        ))
        .bind(category_id)
        .bind(input.parent_id)
        .bind(&name)
        .bind(input.is_active)
        .bind(input.sort_order)
        .fetch_one(&db.pool)
        .await?;
        Ok(row)
    }

    /// Soft delete. Children are detached to the root level rather than
    /// deactivated with their parent; active products keep pointing at the
    /// deactivated category.
    #[instrument(skip(self, db), fields(table = self.table))]
    pub async fn soft_delete(&self, db: &Db, category_id: i64) -> StoreResult<()> {
        let mut tx = db.pool.begin().await?;
        let result = sqlx::query(&format!(
            "UPDATE {} SET is_active = false, updated_at = now() WHERE category_id = $1",
            self.table
        ))
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(self.entity));
        }
        sqlx::query(&format!(
            "UPDATE {} SET parent_id = NULL, updated_at = now() WHERE parent_id = $1",
            self.table
        ))
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest(edges: &[(i64, Option<i64>)]) -> HashMap<i64, Option<i64>> {
        edges.iter().copied().collect()
    }

    #[test]
    fn reparenting_to_root_is_fine() {
        let nodes = forest(&[(1, None), (2, Some(1))]);
        assert!(!creates_cycle(&nodes, 2, None));
        assert!(!creates_cycle(&nodes, 2, Some(1)));
    }

    #[test]
    fn direct_self_parent_is_a_cycle() {
        let nodes = forest(&[(1, None)]);
        assert!(creates_cycle(&nodes, 1, Some(1)));
    }

    #[test]
    fn ancestor_chain_cycle_is_detected() {
        // 1 <- 2 <- 3; attaching 1 under 3 closes the loop
        let nodes = forest(&[(1, None), (2, Some(1)), (3, Some(2))]);
        assert!(creates_cycle(&nodes, 1, Some(3)));
        assert!(!creates_cycle(&nodes, 3, Some(1)));
    }

    #[test]
    fn corrupt_parent_chain_refuses_reparent() {
        // 2 and 3 already form a loop not involving 1
        let nodes = forest(&[(1, None), (2, Some(3)), (3, Some(2))]);
        assert!(creates_cycle(&nodes, 1, Some(2)));
    }
}
