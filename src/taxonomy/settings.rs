//! Key-value site settings. Readers must treat inactive keys as absent and
//! fall back to their hardcoded defaults.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tracing::{info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::util::db::Db;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SiteSetting {
    pub setting_key: String,
    pub setting_value: String,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-side fallback rule: inactive or missing settings yield the default.
pub fn effective_value<'a>(setting: Option<&'a SiteSetting>, default: &'a str) -> &'a str {
    match setting {
        Some(s) if s.is_active => &s.setting_value,
        _ => default,
    }
}

#[instrument(skip(db))]
pub async fn list_settings(db: &Db) -> StoreResult<Vec<SiteSetting>> {
    let rows = sqlx::query_as("SELECT * FROM site_settings ORDER BY sort_order, setting_key")
        .fetch_all(&db.pool)
        .await?;
    Ok(rows)
}

/// Insert-or-update by key; newly written settings are active.
#[instrument(skip(db, value))]
pub async fn upsert_setting(
    db: &Db,
    key: &str,
    value: &str,
    sort_order: i32,
) -> StoreResult<SiteSetting> {
    let key = key.trim();
    if key.is_empty() {
        return Err(StoreError::validation("setting key is required"));
    }
    let row: SiteSetting = sqlx::query_as(
        "INSERT INTO site_settings (setting_key, setting_value, is_active, sort_order)
         VALUES ($1, $2, true, $3)
         ON CONFLICT (setting_key)
         DO UPDATE SET setting_value = EXCLUDED.setting_value,
                       sort_order = EXCLUDED.sort_order,
                       updated_at = now()
         RETURNING *",
    )
    .bind(key)
    .bind(value)
    .bind(sort_order)
    .fetch_one(&db.pool)
    .await?;
    info!(key, "setting upserted");
    Ok(row)
}

#[instrument(skip(db))]
pub async fn toggle_setting(db: &Db, key: &str) -> StoreResult<SiteSetting> {
    sqlx::query_as(
        "UPDATE site_settings
         SET is_active = NOT is_active, updated_at = now()
         WHERE setting_key = $1
         RETURNING *",
    )
    .bind(key)
    .fetch_optional(&db.pool)
    .await?
    .ok_or(StoreError::NotFound("setting"))
}

#[instrument(skip(db))]
pub async fn delete_setting(db: &Db, key: &str) -> StoreResult<()> {
    let result = sqlx::query("DELETE FROM site_settings WHERE setting_key = $1")
        .bind(key)
        .execute(&db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("setting"));
    }
    Ok(())
}

/// Active value for a key, or `None` when the key is missing or inactive.
pub async fn get_value(db: &Db, key: &str) -> StoreResult<Option<String>> {
    let setting: Option<SiteSetting> =
        sqlx::query_as("SELECT * FROM site_settings WHERE setting_key = $1")
            .bind(key)
            .fetch_optional(&db.pool)
            .await?;
    Ok(setting
        .filter(|s| s.is_active)
        .map(|s| s.setting_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setting(value: &str, is_active: bool) -> SiteSetting {
        SiteSetting {
            setting_key: "site_title".into(),
            setting_value: value.into(),
            is_active,
            sort_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn inactive_settings_fall_back_to_default() {
        let active = setting("My Shop", true);
        let inactive = setting("My Shop", false);
        assert_eq!(effective_value(Some(&active), "Shopfront"), "My Shop");
        assert_eq!(effective_value(Some(&inactive), "Shopfront"), "Shopfront");
        assert_eq!(effective_value(None, "Shopfront"), "Shopfront");
    }
}
