//! Brand management. Brands are referenced, never owned, by products, so
//! hard deletion is gated on a reference check.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tracing::{info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::util::db::Db;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Brand {
    pub brand_id: i64,
    pub brand_name: String,
    pub brand_name_en: Option<String>,
    pub logo_path: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BrandInput {
    pub brand_name: String,
    pub brand_name_en: Option<String>,
    pub logo_path: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
}

#[instrument(skip(db))]
pub async fn list_brands(db: &Db) -> StoreResult<Vec<Brand>> {
    let rows = sqlx::query_as("SELECT * FROM brands ORDER BY brand_name")
        .fetch_all(&db.pool)
        .await?;
    Ok(rows)
}

#[instrument(skip(db, input), fields(name = %input.brand_name))]
pub async fn create_brand(db: &Db, input: BrandInput) -> StoreResult<Brand> {
    let name = input.brand_name.trim().to_string();
    if name.is_empty() {
        return Err(StoreError::validation("brand name is required"));
    }
    let row: Brand = sqlx::query_as(
        "INSERT INTO brands (brand_name, brand_name_en, logo_path, description, is_active)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(&name)
    .bind(&input.brand_name_en)
    .bind(&input.logo_path)
    .bind(&input.description)
    .bind(input.is_active)
    .fetch_one(&db.pool)
    .await?;
    info!(brand_id = row.brand_id, "brand created");
    Ok(row)
}

#[instrument(skip(db, input))]
pub async fn update_brand(db: &Db, brand_id: i64, input: BrandInput) -> StoreResult<Brand> {
    let name = input.brand_name.trim().to_string();
    if name.is_empty() {
        return Err(StoreError::validation("brand name is required"));
    }
    sqlx::query_as(
        "UPDATE brands
         SET brand_name = $2, brand_name_en = $3, logo_path = $4,
             description = $5, is_active = $6, updated_at = now()
         WHERE brand_id = $1
         RETURNING *",
    )
    .bind(brand_id)
    .bind(&name)
    .bind(&input.brand_name_en)
    .bind(&input.logo_path)
    .bind(&input.description)
    .bind(input.is_active)
    .fetch_optional(&db.pool)
    .await?
    .ok_or(StoreError::NotFound("brand"))
}

/// Hard delete, blocked while any product references the brand.
#[instrument(skip(db))]
pub async fn delete_brand(db: &Db, brand_id: i64) -> StoreResult<()> {
    let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE brand_id = $1")
        .bind(brand_id)
        .fetch_one(&db.pool)
        .await?;
    if in_use > 0 {
        return Err(StoreError::validation(
            "brand is referenced by products and cannot be deleted",
        ));
    }
    let result = sqlx::query("DELETE FROM brands WHERE brand_id = $1")
        .bind(brand_id)
        .execute(&db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("brand"));
    }
    info!(brand_id, "brand deleted");
    Ok(())
}
