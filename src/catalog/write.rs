//! Catalog write model: product create/update and the synchronization rules
//! for dependent variants, attributes and images.
//!
//! Every multi-row mutation runs inside one transaction; dropping the
//! transaction on an early error rolls the whole operation back. Duplicate
//! attribute ids or SKUs in the input are deliberately NOT deduplicated: the
//! storage constraints fire inside the transaction and the caller sees a
//! retryable `UniquenessConflict`.

use std::collections::{HashMap, HashSet};

use sqlx::{PgConnection, Postgres, Transaction};
use tracing::{info, instrument};

use crate::catalog::types::{
    AttributePair, ImageInput, Product, ProductAttributeRow, ProductImage, ProductInput,
    ProductVariant, VariantInput, DEFAULT_VENDOR_ID,
};
use crate::error::{StoreError, StoreResult};
use crate::util::db::Db;
use crate::util::text::slugify;

#[derive(Debug, Clone, PartialEq)]
pub struct VariantWrite {
    pub input: VariantInput,
    pub is_default: bool,
}

/// Targeted changes that make the persisted variant set equal the desired
/// set, keyed by SKU. Replaces the legacy delete-all-then-reinsert approach
/// so row identity survives edits and no transient SKU conflict occurs
/// mid-transaction.
#[derive(Debug, Default, PartialEq)]
pub struct VariantSyncPlan {
    pub inserts: Vec<VariantWrite>,
    pub updates: Vec<(i64, VariantWrite)>,
    pub deletes: Vec<i64>,
}

pub fn plan_variant_sync(
    current: &[ProductVariant],
    desired: &[VariantInput],
    default_sku: Option<&str>,
) -> VariantSyncPlan {
    let by_sku: HashMap<&str, &ProductVariant> =
        current.iter().map(|v| (v.sku.as_str(), v)).collect();
    let mut consumed: HashSet<i64> = HashSet::new();
    let mut plan = VariantSyncPlan::default();

    for d in desired {
        let sku = d.sku.trim();
        if sku.is_empty() {
            continue;
        }
        let write = VariantWrite {
            input: d.clone(),
            is_default: default_sku == Some(sku),
        };
        match by_sku.get(sku) {
            // A duplicate SKU in the desired set falls through to an insert
            // and trips the unique constraint, failing the whole operation.
            Some(cur) if consumed.insert(cur.variant_id) => {
                plan.updates.push((cur.variant_id, write));
            }
            _ => plan.inserts.push(write),
        }
    }
    plan.deletes = current
        .iter()
        .filter(|v| !consumed.contains(&v.variant_id))
        .map(|v| v.variant_id)
        .collect();
    plan
}

#[derive(Debug, Default, PartialEq)]
pub struct AttributeSyncPlan {
    /// `(attribute_id, value)` rows to insert.
    pub inserts: Vec<(i64, String)>,
    /// `(row id, value)` rows whose value changed.
    pub updates: Vec<(i64, String)>,
    pub deletes: Vec<i64>,
}

pub fn plan_attribute_sync(
    current: &[ProductAttributeRow],
    desired: &[AttributePair],
) -> AttributeSyncPlan {
    let by_attr: HashMap<i64, &ProductAttributeRow> =
        current.iter().map(|r| (r.attribute_id, r)).collect();
    let mut consumed: HashSet<i64> = HashSet::new();
    let mut plan = AttributeSyncPlan::default();

    for pair in desired {
        let Some((attribute_id, value)) = pair.resolve() else {
            continue; // incomplete pairs are skipped silently
        };
        match by_attr.get(&attribute_id) {
            Some(row) if consumed.insert(row.id) => {
                if row.value != value {
                    plan.updates.push((row.id, value.to_string()));
                }
            }
            // Duplicate attribute ids become a second insert; the
            // (product_id, attribute_id) constraint rejects it at commit.
            _ => plan.inserts.push((attribute_id, value.to_string())),
        }
    }
    plan.deletes = current
        .iter()
        .filter(|r| !consumed.contains(&r.id))
        .map(|r| r.id)
        .collect();
    plan
}

/// Image reconciliation for updates: survivors keep their rows, everything
/// else is deleted, new uploads are appended with increasing sort order.
///
/// Featured/legacy-url resolution, in priority order: a surviving featured
/// image keeps the slot; else the first new upload takes it; else the first
/// surviving image by sort order is promoted; else nothing changes.
#[derive(Debug, Default, PartialEq)]
pub struct ImageSyncPlan {
    pub delete_ids: Vec<i64>,
    /// Sort order assigned to the first appended upload.
    pub next_sort: i32,
    /// Surviving image to flag as featured (promotion case).
    pub promote_image_id: Option<i64>,
    /// Whether the first appended upload becomes featured.
    pub feature_first_new: bool,
    /// Recomputed legacy `image_url`; `None` leaves it unchanged.
    pub image_url: Option<String>,
}

pub fn plan_image_sync(
    current: &[ProductImage],
    keep_ids: &[i64],
    new_uploads: &[ImageInput],
) -> ImageSyncPlan {
    let (survivors, removed): (Vec<&ProductImage>, Vec<&ProductImage>) =
        current.iter().partition(|img| keep_ids.contains(&img.image_id));

    let mut plan = ImageSyncPlan {
        delete_ids: removed.iter().map(|img| img.image_id).collect(),
        next_sort: survivors
            .iter()
            .map(|img| img.sort_order)
            .max()
            .map_or(0, |max| max + 1),
        ..ImageSyncPlan::default()
    };

    if let Some(featured) = survivors.iter().find(|img| img.is_featured) {
        plan.image_url = Some(featured.image_url.clone());
    } else if let Some(first_new) = new_uploads.first() {
        plan.feature_first_new = true;
        plan.image_url = Some(first_new.image_url.clone());
    } else if let Some(first) = survivors.iter().min_by_key(|img| img.sort_order) {
        plan.promote_image_id = Some(first.image_id);
        plan.image_url = Some(first.image_url.clone());
    }
    plan
}

async fn category_exists(conn: &mut PgConnection, category_id: i64) -> StoreResult<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE category_id = $1)")
            .bind(category_id)
            .fetch_one(conn)
            .await?;
    Ok(exists)
}

/// A brand reference that does not resolve is silently stored as NULL.
async fn resolve_brand(conn: &mut PgConnection, brand_id: Option<i64>) -> StoreResult<Option<i64>> {
    let Some(id) = brand_id else { return Ok(None) };
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM brands WHERE brand_id = $1)")
            .bind(id)
            .fetch_one(conn)
            .await?;
    Ok(exists.then_some(id))
}

async fn insert_variant(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    write: &VariantWrite,
) -> StoreResult<()> {
    let v = &write.input;
    sqlx::query(
        "INSERT INTO product_variants
            (product_id, sku, variant_name, size_value, size_unit,
             wholesale_price, retail_price, stock_quantity, is_default)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(product_id)
    .bind(v.sku.trim())
    .bind(v.variant_name())
    .bind(&v.size_value)
    .bind(&v.size_unit)
    .bind(&v.wholesale_price)
    .bind(&v.retail_price)
    .bind(v.stock_quantity)
    .bind(write.is_default)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_images(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    images: &[ImageInput],
    first_sort: i32,
    feature_first: bool,
) -> StoreResult<()> {
    for (i, img) in images.iter().enumerate() {
        sqlx::query(
            "INSERT INTO product_images
                (product_id, image_url, alt_text, title, caption, sort_order, is_featured)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(product_id)
        .bind(&img.image_url)
        .bind(&img.alt_text)
        .bind(&img.title)
        .bind(&img.caption)
        .bind(first_sort + i as i32)
        .bind(feature_first && i == 0)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[instrument(skip(db, input), fields(name = %input.product_name))]
pub async fn create_product(db: &Db, input: ProductInput) -> StoreResult<Product> {
    let name = input.product_name.trim().to_string();
    if name.is_empty() {
        return Err(StoreError::validation("product name is required"));
    }
    let category_id = input
        .category_id
        .ok_or_else(|| StoreError::validation("a valid category is required"))?;

    let mut tx = db.pool.begin().await?;

    if !category_exists(&mut *tx, category_id).await? {
        return Err(StoreError::validation("a valid category is required"));
    }
    let brand_id = resolve_brand(&mut *tx, input.brand_id).await?;

    // Slug uniqueness is not pre-checked; the unique constraint decides.
    let slug = slugify(&name);
    let image_url = input.images.first().map(|img| img.image_url.clone());

    let product: Product = sqlx::query_as(
        "INSERT INTO products
            (vendor_id, brand_id, category_id, product_name, slug,
             description, image_url, is_active)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(DEFAULT_VENDOR_ID)
    .bind(brand_id)
    .bind(category_id)
    .bind(&name)
    .bind(&slug)
    .bind(&input.description)
    .bind(&image_url)
    .bind(input.is_active)
    .fetch_one(&mut *tx)
    .await?;

    insert_images(&mut tx, product.product_id, &input.images, 0, true).await?;

    for pair in &input.attributes {
        let Some((attribute_id, value)) = pair.resolve() else {
            continue;
        };
        sqlx::query(
            "INSERT INTO product_attributes (product_id, attribute_id, value)
             VALUES ($1, $2, $3)",
        )
        .bind(product.product_id)
        .bind(attribute_id)
        .bind(value)
        .execute(&mut *tx)
        .await?;
    }

    let default_sku = input.default_sku.as_deref().map(str::trim);
    for v in &input.variants {
        let sku = v.sku.trim();
        if sku.is_empty() {
            continue;
        }
        let write = VariantWrite {
            input: v.clone(),
            is_default: default_sku == Some(sku),
        };
        insert_variant(&mut tx, product.product_id, &write).await?;
    }

    tx.commit().await?;
    info!(product_id = product.product_id, slug = %product.slug, "product created");
    Ok(product)
}

#[instrument(skip(db, input))]
pub async fn update_product(db: &Db, product_id: i64, input: ProductInput) -> StoreResult<Product> {
    let name = input.product_name.trim().to_string();
    if name.is_empty() {
        return Err(StoreError::validation("product name is required"));
    }
    let category_id = input
        .category_id
        .ok_or_else(|| StoreError::validation("a valid category is required"))?;

    let mut tx = db.pool.begin().await?;

    let existing: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE product_id = $1")
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;
    let existing = existing.ok_or(StoreError::NotFound("product"))?;

    if !category_exists(&mut *tx, category_id).await? {
        return Err(StoreError::validation("a valid category is required"));
    }
    let brand_id = resolve_brand(&mut *tx, input.brand_id).await?;

    // Attributes: diff against the persisted set keyed by attribute id.
    let current_attrs: Vec<ProductAttributeRow> = sqlx::query_as(
        "SELECT id, product_id, attribute_id, value
         FROM product_attributes WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_all(&mut *tx)
    .await?;
    let attr_plan = plan_attribute_sync(&current_attrs, &input.attributes);
    for id in &attr_plan.deletes {
        sqlx::query("DELETE FROM product_attributes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    for (id, value) in &attr_plan.updates {
        sqlx::query("UPDATE product_attributes SET value = $2 WHERE id = $1")
            .bind(id)
            .bind(value)
            .execute(&mut *tx)
            .await?;
    }
    for (attribute_id, value) in &attr_plan.inserts {
        sqlx::query(
            "INSERT INTO product_attributes (product_id, attribute_id, value)
             VALUES ($1, $2, $3)",
        )
        .bind(product_id)
        .bind(attribute_id)
        .bind(value)
        .execute(&mut *tx)
        .await?;
    }

    // Variants: diff keyed by SKU. Deletes run first so a SKU moving between
    // rows cannot collide with a row that is about to go away.
    let current_variants: Vec<ProductVariant> = sqlx::query_as(
        "SELECT * FROM product_variants WHERE product_id = $1 ORDER BY variant_id",
    )
    .bind(product_id)
    .fetch_all(&mut *tx)
    .await?;
    let default_sku = input.default_sku.as_deref().map(str::trim);
    let variant_plan = plan_variant_sync(&current_variants, &input.variants, default_sku);
    for id in &variant_plan.deletes {
        sqlx::query("DELETE FROM product_variants WHERE variant_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    for (variant_id, write) in &variant_plan.updates {
        let v = &write.input;
        sqlx::query(
            "UPDATE product_variants
             SET variant_name = $2, size_value = $3, size_unit = $4,
                 wholesale_price = $5, retail_price = $6, stock_quantity = $7,
                 is_default = $8, updated_at = now()
             WHERE variant_id = $1",
        )
        .bind(variant_id)
        .bind(v.variant_name())
        .bind(&v.size_value)
        .bind(&v.size_unit)
        .bind(&v.wholesale_price)
        .bind(&v.retail_price)
        .bind(v.stock_quantity)
        .bind(write.is_default)
        .execute(&mut *tx)
        .await?;
    }
    for write in &variant_plan.inserts {
        insert_variant(&mut tx, product_id, write).await?;
    }

    // Images: keep the requested ids, drop the rest, append new uploads.
    let current_images: Vec<ProductImage> = sqlx::query_as(
        "SELECT image_id, product_id, image_url, alt_text, title, caption,
                sort_order, is_featured
         FROM product_images WHERE product_id = $1 ORDER BY sort_order, image_id",
    )
    .bind(product_id)
    .fetch_all(&mut *tx)
    .await?;
    let image_plan = plan_image_sync(&current_images, &input.keep_image_ids, &input.images);
    for id in &image_plan.delete_ids {
        sqlx::query("DELETE FROM product_images WHERE image_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(id) = image_plan.promote_image_id {
        sqlx::query("UPDATE product_images SET is_featured = true WHERE image_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    insert_images(
        &mut tx,
        product_id,
        &input.images,
        image_plan.next_sort,
        image_plan.feature_first_new,
    )
    .await?;
    let image_url = image_plan.image_url.or(existing.image_url);

    let product: Product = sqlx::query_as(
        "UPDATE products
         SET brand_id = $2, category_id = $3, product_name = $4,
             description = $5, image_url = $6, is_active = $7, updated_at = now()
         WHERE product_id = $1
         RETURNING *",
    )
    .bind(product_id)
    .bind(brand_id)
    .bind(category_id)
    .bind(&name)
    .bind(&input.description)
    .bind(&image_url)
    .bind(input.is_active)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    info!(product_id, "product updated");
    Ok(product)
}

/// Soft delete: flips `is_active` off. Deactivating an already-inactive
/// product is a no-op success.
#[instrument(skip(db))]
pub async fn soft_delete_product(db: &Db, product_id: i64) -> StoreResult<()> {
    let result =
        sqlx::query("UPDATE products SET is_active = false, updated_at = now() WHERE product_id = $1")
            .bind(product_id)
            .execute(&db.pool)
            .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("product"));
    }
    info!(product_id, "product deactivated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::Utc;

    fn variant_row(variant_id: i64, sku: &str, retail: i64) -> ProductVariant {
        ProductVariant {
            variant_id,
            product_id: 1,
            sku: sku.to_string(),
            variant_name: None,
            size_value: None,
            size_unit: None,
            wholesale_price: BigDecimal::from(0),
            retail_price: BigDecimal::from(retail),
            stock_quantity: 0,
            is_active: true,
            is_default: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn variant_input(sku: &str, retail: i64) -> VariantInput {
        VariantInput {
            sku: sku.to_string(),
            size_value: Some("60".into()),
            size_unit: Some("cm".into()),
            wholesale_price: BigDecimal::from(0),
            retail_price: BigDecimal::from(retail),
            stock_quantity: 3,
        }
    }

    fn attr_row(id: i64, attribute_id: i64, value: &str) -> ProductAttributeRow {
        ProductAttributeRow {
            id,
            product_id: 1,
            attribute_id,
            value: value.to_string(),
        }
    }

    fn image_row(image_id: i64, url: &str, sort_order: i32, featured: bool) -> ProductImage {
        ProductImage {
            image_id,
            product_id: 1,
            image_url: url.to_string(),
            alt_text: None,
            title: None,
            caption: None,
            sort_order,
            is_featured: featured,
        }
    }

    fn upload(url: &str) -> ImageInput {
        ImageInput {
            image_url: url.to_string(),
            alt_text: None,
            title: None,
            caption: None,
        }
    }

    #[test]
    fn variant_sync_replaces_set_exactly() {
        let current = vec![variant_row(10, "A-1", 100), variant_row(11, "A-2", 200)];
        let desired = vec![variant_input("A-2", 250), variant_input("A-3", 300)];
        let plan = plan_variant_sync(&current, &desired, Some("A-3"));

        assert_eq!(plan.deletes, vec![10]);
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].0, 11);
        assert!(!plan.updates[0].1.is_default);
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].input.sku, "A-3");
        assert!(plan.inserts[0].is_default);
    }

    #[test]
    fn at_most_one_variant_is_flagged_default() {
        let desired = vec![variant_input("A", 1), variant_input("B", 2)];
        let plan = plan_variant_sync(&[], &desired, Some("B"));
        let flagged: Vec<_> = plan.inserts.iter().filter(|w| w.is_default).collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].input.sku, "B");
    }

    #[test]
    fn unmatched_default_sku_flags_nothing() {
        let desired = vec![variant_input("A", 1), variant_input("B", 2)];
        let plan = plan_variant_sync(&[], &desired, Some("ZZZ"));
        assert!(plan.inserts.iter().all(|w| !w.is_default));
    }

    #[test]
    fn empty_skus_are_skipped_silently() {
        let desired = vec![variant_input("", 1), variant_input("  ", 2), variant_input("A", 3)];
        let plan = plan_variant_sync(&[], &desired, None);
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].input.sku, "A");
    }

    #[test]
    fn duplicate_desired_sku_is_not_deduplicated() {
        let current = vec![variant_row(7, "DUP", 10)];
        let desired = vec![variant_input("DUP", 11), variant_input("DUP", 12)];
        let plan = plan_variant_sync(&current, &desired, None);
        // first occurrence updates, second stays an insert so the unique
        // constraint rejects the whole transaction
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.inserts.len(), 1);
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn attribute_sync_diffs_by_attribute_id() {
        let current = vec![attr_row(1, 100, "red"), attr_row(2, 101, "steel")];
        let desired = vec![
            AttributePair { attribute_id: Some(100), value: Some("blue".into()) },
            AttributePair { attribute_id: Some(102), value: Some("1.5kg".into()) },
            AttributePair { attribute_id: None, value: Some("orphan".into()) },
            AttributePair { attribute_id: Some(103), value: None },
        ];
        let plan = plan_attribute_sync(&current, &desired);
        assert_eq!(plan.updates, vec![(1, "blue".to_string())]);
        assert_eq!(plan.inserts, vec![(102, "1.5kg".to_string())]);
        assert_eq!(plan.deletes, vec![2]);
    }

    #[test]
    fn unchanged_attribute_value_emits_no_write() {
        let current = vec![attr_row(1, 100, "red")];
        let desired = vec![AttributePair {
            attribute_id: Some(100),
            value: Some("red".into()),
        }];
        let plan = plan_attribute_sync(&current, &desired);
        assert_eq!(plan, AttributeSyncPlan::default());
    }

    #[test]
    fn duplicate_attribute_ids_produce_conflicting_inserts() {
        let desired = vec![
            AttributePair { attribute_id: Some(100), value: Some("a".into()) },
            AttributePair { attribute_id: Some(100), value: Some("b".into()) },
        ];
        let plan = plan_attribute_sync(&[], &desired);
        assert_eq!(plan.inserts.len(), 2);
    }

    #[test]
    fn surviving_featured_image_keeps_the_slot() {
        let current = vec![
            image_row(1, "/u/a.jpg", 0, true),
            image_row(2, "/u/b.jpg", 1, false),
        ];
        let plan = plan_image_sync(&current, &[1, 2], &[upload("/u/c.jpg")]);
        assert!(plan.delete_ids.is_empty());
        assert_eq!(plan.next_sort, 2);
        assert!(!plan.feature_first_new);
        assert_eq!(plan.image_url.as_deref(), Some("/u/a.jpg"));
    }

    #[test]
    fn deleted_featured_image_hands_slot_to_first_upload() {
        let current = vec![
            image_row(1, "/u/a.jpg", 0, true),
            image_row(2, "/u/b.jpg", 1, false),
        ];
        let plan = plan_image_sync(&current, &[2], &[upload("/u/c.jpg")]);
        assert_eq!(plan.delete_ids, vec![1]);
        assert!(plan.feature_first_new);
        assert_eq!(plan.image_url.as_deref(), Some("/u/c.jpg"));
        assert_eq!(plan.next_sort, 2);
    }

    #[test]
    fn deleted_featured_image_promotes_first_survivor() {
        let current = vec![
            image_row(1, "/u/a.jpg", 0, true),
            image_row(2, "/u/b.jpg", 1, false),
            image_row(3, "/u/c.jpg", 2, false),
        ];
        let plan = plan_image_sync(&current, &[2, 3], &[]);
        assert_eq!(plan.delete_ids, vec![1]);
        assert_eq!(plan.promote_image_id, Some(2));
        assert_eq!(plan.image_url.as_deref(), Some("/u/b.jpg"));
    }

    #[test]
    fn no_images_leaves_legacy_url_unchanged() {
        let plan = plan_image_sync(&[], &[], &[]);
        assert_eq!(plan, ImageSyncPlan::default());
    }
}
