//! Threaded article comments with three-state moderation: pending (neither
//! flag), approved, or spam. Approving clears spam and vice versa; the two
//! flags are never simultaneously true.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tracing::{info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::util::db::Db;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub comment_id: i64,
    pub article_id: i64,
    pub parent_id: Option<i64>,
    pub author_name: String,
    pub author_email: String,
    pub body: String,
    pub is_approved: bool,
    pub is_spam: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CommentInput {
    pub author_name: String,
    pub author_email: String,
    pub body: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    MarkSpam,
}

/// `(is_approved, is_spam)` after applying the action.
pub const fn moderation_flags(action: ModerationAction) -> (bool, bool) {
    match action {
        ModerationAction::Approve => (true, false),
        ModerationAction::MarkSpam => (false, true),
    }
}

#[instrument(skip(db, input), fields(article_id))]
pub async fn submit_comment(db: &Db, article_id: i64, input: CommentInput) -> StoreResult<Comment> {
    let author_name = input.author_name.trim().to_string();
    let body = input.body.trim().to_string();
    if author_name.is_empty() || body.is_empty() {
        return Err(StoreError::validation("name and comment body are required"));
    }
    let article_ok: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM articles
         WHERE article_id = $1 AND is_published AND is_active)",
    )
    .bind(article_id)
    .fetch_one(&db.pool)
    .await?;
    if !article_ok {
        return Err(StoreError::NotFound("article"));
    }
    if let Some(parent_id) = input.parent_id {
        let parent_ok: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM article_comments
             WHERE comment_id = $1 AND article_id = $2)",
        )
        .bind(parent_id)
        .bind(article_id)
        .fetch_one(&db.pool)
        .await?;
        if !parent_ok {
            return Err(StoreError::validation(
                "reply target does not belong to this article",
            ));
        }
    }
    // New comments start pending: neither approved nor spam.
    let row: Comment = sqlx::query_as(
        "INSERT INTO article_comments
            (article_id, parent_id, author_name, author_email, body)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(article_id)
    .bind(input.parent_id)
    .bind(&author_name)
    .bind(input.author_email.trim())
    .bind(&body)
    .fetch_one(&db.pool)
    .await?;
    info!(comment_id = row.comment_id, article_id, "comment submitted");
    Ok(row)
}

#[instrument(skip(db))]
pub async fn moderate_comment(
    db: &Db,
    comment_id: i64,
    action: ModerationAction,
) -> StoreResult<Comment> {
    let (is_approved, is_spam) = moderation_flags(action);
    sqlx::query_as(
        "UPDATE article_comments
         SET is_approved = $2, is_spam = $3, updated_at = now()
         WHERE comment_id = $1
         RETURNING *",
    )
    .bind(comment_id)
    .bind(is_approved)
    .bind(is_spam)
    .fetch_optional(&db.pool)
    .await?
    .ok_or(StoreError::NotFound("comment"))
}

/// Hard delete, unconditional.
#[instrument(skip(db))]
pub async fn delete_comment(db: &Db, comment_id: i64) -> StoreResult<()> {
    let result = sqlx::query("DELETE FROM article_comments WHERE comment_id = $1")
        .bind(comment_id)
        .execute(&db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("comment"));
    }
    info!(comment_id, "comment deleted");
    Ok(())
}

/// Public view: approved, non-spam comments in submission order.
#[instrument(skip(db))]
pub async fn list_approved(db: &Db, article_id: i64) -> StoreResult<Vec<Comment>> {
    let rows = sqlx::query_as(
        "SELECT * FROM article_comments
         WHERE article_id = $1 AND is_approved AND NOT is_spam
         ORDER BY created_at",
    )
    .bind(article_id)
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

/// Moderation queue: everything not yet approved and not flagged spam.
#[instrument(skip(db))]
pub async fn list_pending(db: &Db) -> StoreResult<Vec<Comment>> {
    let rows = sqlx::query_as(
        "SELECT * FROM article_comments
         WHERE NOT is_approved AND NOT is_spam
         ORDER BY created_at",
    )
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderation_flags_are_mutually_exclusive() {
        let (approved, spam) = moderation_flags(ModerationAction::Approve);
        assert!(approved && !spam);
        let (approved, spam) = moderation_flags(ModerationAction::MarkSpam);
        assert!(!approved && spam);
    }

    #[test]
    fn spam_then_approve_clears_spam() {
        // applying actions in sequence always lands on the last action's flags
        let after_spam = moderation_flags(ModerationAction::MarkSpam);
        assert_eq!(after_spam, (false, true));
        let after_approve = moderation_flags(ModerationAction::Approve);
        assert_eq!(after_approve, (true, false));
    }
}
