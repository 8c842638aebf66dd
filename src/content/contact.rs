//! Contact-message inbox with a best-effort per-IP rate limit.
//!
//! The limit is a read-then-write check and therefore a throttle, not a
//! guarantee: two simultaneous submissions from one IP can both pass.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tracing::{info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::util::db::Db;

/// Minimum spacing between messages from one IP.
pub const RATE_LIMIT_WINDOW_SECS: i64 = 5 * 60;

pub const INBOX_PAGE_SIZE: i64 = 20;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContactMessage {
    pub message_id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub body: String,
    pub ip_address: String,
    pub response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub body: String,
}

pub fn within_rate_window(last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - last < Duration::seconds(RATE_LIMIT_WINDOW_SECS)
}

#[instrument(skip(db, input), fields(ip = %ip_address))]
pub async fn submit_message(
    db: &Db,
    input: ContactInput,
    ip_address: &str,
) -> StoreResult<ContactMessage> {
    let name = input.name.trim().to_string();
    let email = input.email.trim().to_string();
    let body = input.body.trim().to_string();
    if name.is_empty() || email.is_empty() || body.is_empty() {
        return Err(StoreError::validation("name, email and message are required"));
    }

    let last: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT MAX(created_at) FROM contact_messages WHERE ip_address = $1")
            .bind(ip_address)
            .fetch_one(&db.pool)
            .await?;
    if let Some(last) = last {
        if within_rate_window(last, Utc::now()) {
            return Err(StoreError::validation(
                "please wait a few minutes before sending another message",
            ));
        }
    }

    let row: ContactMessage = sqlx::query_as(
        "INSERT INTO contact_messages (name, email, phone, subject, body, ip_address)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(&name)
    .bind(&email)
    .bind(&input.phone)
    .bind(&input.subject)
    .bind(&body)
    .bind(ip_address)
    .fetch_one(&db.pool)
    .await?;
    info!(message_id = row.message_id, "contact message received");
    Ok(row)
}

#[instrument(skip(db))]
pub async fn list_messages(db: &Db, page: i64) -> StoreResult<(Vec<ContactMessage>, i64)> {
    let offset = crate::catalog::read::page_offset(page, INBOX_PAGE_SIZE);
    let items: Vec<ContactMessage> = sqlx::query_as(
        "SELECT * FROM contact_messages ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(INBOX_PAGE_SIZE)
    .bind(offset)
    .fetch_all(&db.pool)
    .await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_messages")
        .fetch_one(&db.pool)
        .await?;
    Ok((items, total))
}

#[instrument(skip(db, response))]
pub async fn respond_to_message(db: &Db, message_id: i64, response: &str) -> StoreResult<ContactMessage> {
    let response = response.trim();
    if response.is_empty() {
        return Err(StoreError::validation("response text is required"));
    }
    sqlx::query_as(
        "UPDATE contact_messages
         SET response = $2, responded_at = now(), updated_at = now()
         WHERE message_id = $1
         RETURNING *",
    )
    .bind(message_id)
    .bind(response)
    .fetch_optional(&db.pool)
    .await?
    .ok_or(StoreError::NotFound("message"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_arithmetic() {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        assert!(within_rate_window(base, base + Duration::seconds(299)));
        assert!(!within_rate_window(base, base + Duration::seconds(300)));
        assert!(!within_rate_window(base, base + Duration::seconds(3600)));
    }
}
