// API request/response models (DTOs)

use std::str::FromStr;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::read::{SearchFilters, SortKey};
use crate::catalog::types::{AttributePair, ImageInput, ProductInput, VariantInput};
use crate::error::StoreError;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: Some(Meta::now()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            meta: Some(Meta::now()),
        }
    }
}

/// Metadata included in all API responses
#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub version: String,
}

impl Meta {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: uuid::Uuid::new_v4().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            StoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            StoreError::UniquenessConflict(_) => StatusCode::CONFLICT,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Save(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // internals stay in the log, not in the response body
        let message = match self {
            StoreError::Save(_) => "storage error; no changes were saved".to_string(),
            StoreError::UniquenessConflict(_) => {
                "a conflicting value already exists; please adjust and retry".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": message,
            "retryable": self.is_retryable(),
        }))
    }
}

/// Paginated listing envelope.
#[derive(Debug, Serialize)]
pub struct PageOf<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

fn default_true() -> bool {
    true
}

/// Form-style numeric parsing: absent or non-numeric values become zero
/// rather than rejecting the whole submission.
pub fn lenient_decimal(raw: Option<&str>) -> BigDecimal {
    raw.and_then(|s| BigDecimal::from_str(s.trim()).ok())
        .unwrap_or_else(|| BigDecimal::from(0))
}

pub fn lenient_stock(raw: Option<&str>) -> i32 {
    raw.and_then(|s| s.trim().parse::<i32>().ok()).unwrap_or(0)
}

#[derive(Debug, Deserialize)]
pub struct VariantForm {
    #[serde(default)]
    pub sku: String,
    pub size_value: Option<String>,
    pub size_unit: Option<String>,
    pub wholesale_price: Option<String>,
    pub retail_price: Option<String>,
    pub stock_quantity: Option<String>,
}

impl VariantForm {
    pub fn normalize(&self) -> VariantInput {
        VariantInput {
            sku: self.sku.clone(),
            size_value: self.size_value.clone(),
            size_unit: self.size_unit.clone(),
            wholesale_price: lenient_decimal(self.wholesale_price.as_deref()),
            retail_price: lenient_decimal(self.retail_price.as_deref()),
            stock_quantity: lenient_stock(self.stock_quantity.as_deref()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AttributePairForm {
    pub attribute_id: Option<i64>,
    pub value: Option<String>,
}

/// Upload payload: base64 bytes plus caption metadata.
#[derive(Debug, Deserialize)]
pub struct UploadForm {
    pub filename: String,
    pub data_base64: String,
    pub alt_text: Option<String>,
    pub title: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub product_name: String,
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub attributes: Vec<AttributePairForm>,
    #[serde(default)]
    pub variants: Vec<VariantForm>,
    pub default_sku: Option<String>,
    #[serde(default)]
    pub images: Vec<UploadForm>,
    #[serde(default)]
    pub keep_image_ids: Vec<i64>,
}

impl ProductForm {
    /// Build the write-model input; `stored_images` are the uploads that
    /// already made it through the blob store.
    pub fn into_input(self, stored_images: Vec<ImageInput>) -> ProductInput {
        ProductInput {
            product_name: self.product_name,
            category_id: self.category_id,
            brand_id: self.brand_id,
            description: self.description,
            is_active: self.is_active,
            attributes: self
                .attributes
                .into_iter()
                .map(|p| AttributePair {
                    attribute_id: p.attribute_id,
                    value: p.value,
                })
                .collect(),
            variants: self.variants.iter().map(VariantForm::normalize).collect(),
            default_sku: self.default_sku,
            images: stored_images,
            keep_image_ids: self.keep_image_ids,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateSkuRequest {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub brand: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckSkuRequest {
    pub sku: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// Storefront search parameters. Multi-valued filters arrive as
/// comma-separated id lists; unparsable tokens are dropped silently.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub category_ids: Option<String>,
    pub brand_ids: Option<String>,
    pub price_min: Option<String>,
    pub price_max: Option<String>,
    pub sort: Option<String>,
    pub page: Option<i64>,
}

fn parse_id_list(raw: Option<&str>) -> Vec<i64> {
    raw.map(|s| {
        s.split(',')
            .filter_map(|tok| tok.trim().parse::<i64>().ok())
            .collect()
    })
    .unwrap_or_default()
}

impl SearchQuery {
    pub fn into_filters(self) -> SearchFilters {
        SearchFilters {
            q: self.q,
            category_ids: parse_id_list(self.category_ids.as_deref()),
            brand_ids: parse_id_list(self.brand_ids.as_deref()),
            price_min: self
                .price_min
                .as_deref()
                .and_then(|s| BigDecimal::from_str(s.trim()).ok()),
            price_max: self
                .price_max
                .as_deref()
                .and_then(|s| BigDecimal::from_str(s.trim()).ok()),
            sort: SortKey::parse(self.sort.as_deref()),
            page: self.page.unwrap_or(1),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    pub brand_id: Option<i64>,
    pub category_id: Option<i64>,
    pub status: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub category_name: String,
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct BrandForm {
    #[serde(default)]
    pub brand_name: String,
    pub brand_name_en: Option<String>,
    pub logo_path: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_text_type() -> String {
    "text".to_string()
}

#[derive(Debug, Deserialize)]
pub struct AttributeForm {
    #[serde(default)]
    pub attribute_name: String,
    #[serde(default = "default_text_type")]
    pub attribute_type: String,
    #[serde(default)]
    pub is_filterable: bool,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Deserialize)]
pub struct ArticleForm {
    #[serde(default)]
    pub title: String,
    pub category_id: Option<i64>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
    #[serde(default)]
    pub body: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct RespondForm {
    #[serde(default)]
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct SettingForm {
    #[serde(default)]
    pub setting_key: String,
    #[serde(default)]
    pub setting_value: String,
    #[serde(default)]
    pub sort_order: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_numbers_default_to_zero() {
        assert_eq!(lenient_stock(None), 0);
        assert_eq!(lenient_stock(Some("abc")), 0);
        assert_eq!(lenient_stock(Some(" 7 ")), 7);
        assert_eq!(lenient_decimal(Some("oops")), BigDecimal::from(0));
        assert_eq!(lenient_decimal(Some("19.90")), BigDecimal::from_str("19.90").unwrap());
    }

    #[test]
    fn id_lists_drop_bad_tokens() {
        assert_eq!(parse_id_list(Some("1, 2,x,3")), vec![1, 2, 3]);
        assert_eq!(parse_id_list(Some("")), Vec::<i64>::new());
        assert_eq!(parse_id_list(None), Vec::<i64>::new());
    }

    #[test]
    fn search_query_maps_sort_and_page() {
        let q = SearchQuery {
            sort: Some("price-asc".into()),
            price_min: Some("100".into()),
            price_max: Some("not-a-number".into()),
            page: None,
            ..Default::default()
        };
        let f = q.into_filters();
        assert_eq!(f.sort, SortKey::PriceAsc);
        assert_eq!(f.price_min, Some(BigDecimal::from(100)));
        assert_eq!(f.price_max, None);
        assert_eq!(f.page, 1);
    }
}
