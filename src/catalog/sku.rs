//! SKU generation and availability probing.
//!
//! Probing is read-then-write and therefore racy under concurrency: two
//! callers can be handed the same candidate before either commits. The
//! unique constraint on `product_variants.sku` is the real safety net; its
//! violation surfaces as a retryable `UniquenessConflict` from the write
//! model, never as a fatal error.

use tracing::instrument;

use crate::error::StoreResult;
use crate::util::db::Db;
use crate::util::text::{sku_base, suffixed};

async fn sku_exists(db: &Db, sku: &str) -> StoreResult<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM product_variants WHERE sku = $1)")
            .bind(sku)
            .fetch_one(&db.pool)
            .await?;
    Ok(exists)
}

/// Deterministic base from brand/name/size, then `-1`, `-2`, ... suffixes
/// until the store reports the candidate free.
#[instrument(skip(db))]
pub async fn generate_sku(db: &Db, product_name: &str, size: &str, brand: &str) -> StoreResult<String> {
    let base = sku_base(product_name, size, brand);
    let mut attempt = 0u32;
    loop {
        let candidate = suffixed(&base, attempt);
        if !sku_exists(db, &candidate).await? {
            return Ok(candidate);
        }
        attempt += 1;
    }
}

pub async fn sku_available(db: &Db, sku: &str) -> StoreResult<bool> {
    if sku.trim().is_empty() {
        return Ok(false);
    }
    Ok(!sku_exists(db, sku).await?)
}
