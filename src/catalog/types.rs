//! Catalog row types and write-model inputs.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Products created through the admin surface are attached to the built-in
/// vendor row seeded by the initial migration.
pub const DEFAULT_VENDOR_ID: i64 = 1;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub product_id: i64,
    pub vendor_id: i64,
    pub brand_id: Option<i64>,
    pub category_id: i64,
    pub product_name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProductVariant {
    pub variant_id: i64,
    pub product_id: i64,
    pub sku: String,
    pub variant_name: Option<String>,
    pub size_value: Option<String>,
    pub size_unit: Option<String>,
    pub wholesale_price: BigDecimal,
    pub retail_price: BigDecimal,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProductAttributeRow {
    pub id: i64,
    pub product_id: i64,
    pub attribute_id: i64,
    pub value: String,
}

/// Attribute value joined to its definition, as shown on product pages.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AttributeValue {
    pub attribute_id: i64,
    pub attribute_name: String,
    pub value: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProductImage {
    pub image_id: i64,
    pub product_id: i64,
    pub image_url: String,
    pub alt_text: Option<String>,
    pub title: Option<String>,
    pub caption: Option<String>,
    pub sort_order: i32,
    pub is_featured: bool,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Attribute {
    pub attribute_id: i64,
    pub attribute_name: String,
    pub attribute_type: String,
    pub is_filterable: bool,
    pub display_order: i32,
}

/// One `(attribute id, value)` pair, positionally zipped from the form.
/// Pairs missing either side are skipped silently by the write model.
#[derive(Debug, Clone, Deserialize)]
pub struct AttributePair {
    pub attribute_id: Option<i64>,
    pub value: Option<String>,
}

impl AttributePair {
    pub fn resolve(&self) -> Option<(i64, &str)> {
        let id = self.attribute_id?;
        let value = self.value.as_deref()?.trim();
        if value.is_empty() {
            None
        } else {
            Some((id, value))
        }
    }
}

/// Normalized variant row. Rows with an empty SKU never reach the write
/// model; lenient numeric parsing (non-numeric stock -> 0) happens at the
/// API boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantInput {
    pub sku: String,
    pub size_value: Option<String>,
    pub size_unit: Option<String>,
    pub wholesale_price: BigDecimal,
    pub retail_price: BigDecimal,
    pub stock_quantity: i32,
}

impl VariantInput {
    /// `"{size_value} {size_unit}"`, trimmed.
    pub fn variant_name(&self) -> String {
        format!(
            "{} {}",
            self.size_value.as_deref().unwrap_or(""),
            self.size_unit.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}

/// An upload that already went through the blob store; only the resulting
/// path plus caption metadata reaches the write model.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInput {
    pub image_url: String,
    pub alt_text: Option<String>,
    pub title: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProductInput {
    pub product_name: String,
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
    pub description: Option<String>,
    pub is_active: bool,
    pub attributes: Vec<AttributePair>,
    pub variants: Vec<VariantInput>,
    /// SKU picked as the default variant; `None` or an unmatched value
    /// leaves every row unflagged (read-time fallback applies).
    pub default_sku: Option<String>,
    pub images: Vec<ImageInput>,
    /// Update only: image ids to retain; everything else is deleted.
    pub keep_image_ids: Vec<i64>,
}
