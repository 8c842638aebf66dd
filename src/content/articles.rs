//! Blog articles: publish state machine, view counter and image attachments.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tracing::{info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::taxonomy::categories::ARTICLE_CATEGORIES;
use crate::util::db::Db;
use crate::util::text::{slugify, suffixed};

pub const BLOG_PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Article {
    pub article_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub content: String,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub is_featured: bool,
    pub view_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ArticleImage {
    pub image_id: i64,
    pub article_id: i64,
    pub image_url: String,
    pub alt_text: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleInput {
    pub title: String,
    pub category_id: Option<i64>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub content: String,
    pub is_published: bool,
    pub is_featured: bool,
    pub is_active: bool,
}

/// Publish stamping: the first transition to published records the moment;
/// unpublishing and re-publishing never re-stamps.
pub fn next_published_at(
    existing: Option<DateTime<Utc>>,
    publish: bool,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if publish && existing.is_none() {
        Some(now)
    } else {
        existing
    }
}

async fn free_slug(db: &Db, base: &str) -> StoreResult<String> {
    let mut attempt = 0u32;
    loop {
        let candidate = suffixed(base, attempt);
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM articles WHERE slug = $1)")
                .bind(&candidate)
                .fetch_one(&db.pool)
                .await?;
        if !taken {
            return Ok(candidate);
        }
        attempt += 1;
    }
}

#[instrument(skip(db, input), fields(title = %input.title))]
pub async fn create_article(db: &Db, input: ArticleInput) -> StoreResult<Article> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(StoreError::validation("title is required"));
    }
    let slug = free_slug(db, &slugify(&title)).await?;
    let published_at = next_published_at(None, input.is_published, Utc::now());
    let row: Article = sqlx::query_as(
        "INSERT INTO articles
            (category_id, title, slug, meta_title, meta_description, meta_keywords,
             content, is_published, published_at, is_featured, is_active)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING *",
    )
    .bind(input.category_id)
    .bind(&title)
    .bind(&slug)
    .bind(&input.meta_title)
    .bind(&input.meta_description)
    .bind(&input.meta_keywords)
    .bind(&input.content)
    .bind(input.is_published)
    .bind(published_at)
    .bind(input.is_featured)
    .bind(input.is_active)
    .fetch_one(&db.pool)
    .await?;
    info!(article_id = row.article_id, slug = %row.slug, "article created");
    Ok(row)
}

#[instrument(skip(db, input))]
pub async fn update_article(db: &Db, article_id: i64, input: ArticleInput) -> StoreResult<Article> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(StoreError::validation("title is required"));
    }
    let existing: Article = sqlx::query_as("SELECT * FROM articles WHERE article_id = $1")
        .bind(article_id)
        .fetch_optional(&db.pool)
        .await?
        .ok_or(StoreError::NotFound("article"))?;

    let published_at = next_published_at(existing.published_at, input.is_published, Utc::now());
    let row: Article = sqlx::query_as(
        "UPDATE articles
         SET category_id = $2, title = $3, meta_title = $4, meta_description = $5,
             meta_keywords = $6, content = $7, is_published = $8, published_at = $9,
             is_featured = $10, is_active = $11, updated_at = now()
         WHERE article_id = $1
         RETURNING *",
    )
    .bind(article_id)
    .bind(input.category_id)
    .bind(&title)
    .bind(&input.meta_title)
    .bind(&input.meta_description)
    .bind(&input.meta_keywords)
    .bind(&input.content)
    .bind(input.is_published)
    .bind(published_at)
    .bind(input.is_featured)
    .bind(input.is_active)
    .fetch_one(&db.pool)
    .await?;
    Ok(row)
}

#[instrument(skip(db))]
pub async fn soft_delete_article(db: &Db, article_id: i64) -> StoreResult<()> {
    let result =
        sqlx::query("UPDATE articles SET is_active = false, updated_at = now() WHERE article_id = $1")
            .bind(article_id)
            .execute(&db.pool)
            .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("article"));
    }
    Ok(())
}

/// Published, active articles, newest publication first.
#[instrument(skip(db))]
pub async fn list_published(db: &Db, page: i64) -> StoreResult<(Vec<Article>, i64)> {
    let offset = crate::catalog::read::page_offset(page, BLOG_PAGE_SIZE);
    let items: Vec<Article> = sqlx::query_as(
        "SELECT * FROM articles WHERE is_published AND is_active
         ORDER BY published_at DESC NULLS LAST
         LIMIT $1 OFFSET $2",
    )
    .bind(BLOG_PAGE_SIZE)
    .bind(offset)
    .fetch_all(&db.pool)
    .await?;
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE is_published AND is_active")
            .fetch_one(&db.pool)
            .await?;
    Ok((items, total))
}

#[instrument(skip(db))]
pub async fn list_by_category_slug(db: &Db, slug: &str, page: i64) -> StoreResult<(Vec<Article>, i64)> {
    let category = ARTICLE_CATEGORIES.get_by_slug(db, slug).await?;
    let offset = crate::catalog::read::page_offset(page, BLOG_PAGE_SIZE);
    let items: Vec<Article> = sqlx::query_as(
        "SELECT * FROM articles
         WHERE category_id = $1 AND is_published AND is_active
         ORDER BY published_at DESC NULLS LAST
         LIMIT $2 OFFSET $3",
    )
    .bind(category.category_id)
    .bind(BLOG_PAGE_SIZE)
    .bind(offset)
    .fetch_all(&db.pool)
    .await?;
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM articles WHERE category_id = $1 AND is_published AND is_active",
    )
    .bind(category.category_id)
    .fetch_one(&db.pool)
    .await?;
    Ok((items, total))
}

/// Public detail: bumps the view counter as a side effect.
#[instrument(skip(db))]
pub async fn article_detail(db: &Db, slug: &str) -> StoreResult<Article> {
    sqlx::query_as(
        "UPDATE articles SET view_count = view_count + 1
         WHERE slug = $1 AND is_published AND is_active
         RETURNING *",
    )
    .bind(slug)
    .fetch_optional(&db.pool)
    .await?
    .ok_or(StoreError::NotFound("article"))
}

#[instrument(skip(db))]
pub async fn admin_list_articles(db: &Db) -> StoreResult<Vec<Article>> {
    let rows = sqlx::query_as("SELECT * FROM articles ORDER BY created_at DESC")
        .fetch_all(&db.pool)
        .await?;
    Ok(rows)
}

#[instrument(skip(db))]
pub async fn attach_image(
    db: &Db,
    article_id: i64,
    image_url: &str,
    alt_text: Option<&str>,
) -> StoreResult<ArticleImage> {
    let row: ArticleImage = sqlx::query_as(
        "INSERT INTO article_images (article_id, image_url, alt_text, sort_order)
         SELECT $1, $2, $3, COALESCE(MAX(sort_order) + 1, 0)
         FROM article_images WHERE article_id = $1
         RETURNING image_id, article_id, image_url, alt_text, sort_order",
    )
    .bind(article_id)
    .bind(image_url)
    .bind(alt_text)
    .fetch_one(&db.pool)
    .await?;
    Ok(row)
}

#[instrument(skip(db))]
pub async fn remove_image(db: &Db, image_id: i64) -> StoreResult<()> {
    let result = sqlx::query("DELETE FROM article_images WHERE image_id = $1")
        .bind(image_id)
        .execute(&db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("article image"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn first_publish_stamps_once() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        assert_eq!(next_published_at(None, true, now), Some(now));
    }

    #[test]
    fn republish_keeps_original_stamp() {
        let first = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
        assert_eq!(next_published_at(Some(first), true, later), Some(first));
        // unpublishing keeps the stamp too, so re-publishing cannot re-stamp
        assert_eq!(next_published_at(Some(first), false, later), Some(first));
    }

    #[test]
    fn never_published_stays_unstamped() {
        let now = Utc::now();
        assert_eq!(next_published_at(None, false, now), None);
    }
}
