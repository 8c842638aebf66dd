//! Storefront read model: search/filter/sort query assembly, product detail
//! aggregation and the public listings.

use bigdecimal::BigDecimal;
use serde::Serialize;
use sqlx::{Postgres, QueryBuilder};
use tracing::instrument;

use crate::catalog::types::{AttributeValue, Product, ProductImage, ProductVariant};
use crate::error::{StoreError, StoreResult};
use crate::taxonomy::categories::Category;
use crate::util::db::Db;

/// Storefront search page size.
pub const SEARCH_PAGE_SIZE: i64 = 12;
/// Plain catalog listing page size.
pub const LIST_PAGE_SIZE: i64 = 20;
/// Related products shown on a detail page.
pub const RELATED_LIMIT: i64 = 4;
/// Newest products featured on the home page.
pub const HOME_PRODUCT_LIMIT: i64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Default ranking; currently recency, same as `Newest`.
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Newest,
}

impl SortKey {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("price-asc") => Self::PriceAsc,
            Some("price-desc") => Self::PriceDesc,
            Some("newest") => Self::Newest,
            _ => Self::Relevance,
        }
    }

    const fn needs_price(self) -> bool {
        matches!(self, Self::PriceAsc | Self::PriceDesc)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Case-insensitive substring over product name, description, brand name.
    pub q: Option<String>,
    /// OR within the filter.
    pub category_ids: Vec<i64>,
    /// OR within the filter.
    pub brand_ids: Vec<i64>,
    /// Inclusive bounds against active variant retail prices.
    pub price_min: Option<BigDecimal>,
    pub price_max: Option<BigDecimal>,
    pub sort: SortKey,
    /// 1-based page number; values below 1 are clamped.
    pub page: i64,
}

impl SearchFilters {
    fn needs_variant_join(&self) -> bool {
        self.price_min.is_some() || self.price_max.is_some() || self.sort.needs_price()
    }
}

pub fn page_offset(page: i64, per_page: i64) -> i64 {
    (page.max(1) - 1) * per_page
}

fn push_search_from_where(qb: &mut QueryBuilder<'static, Postgres>, f: &SearchFilters) {
    qb.push(" FROM products p LEFT JOIN brands b ON b.brand_id = p.brand_id");
    if f.needs_variant_join() {
        qb.push(" JOIN product_variants v ON v.product_id = p.product_id AND v.is_active");
    }
    qb.push(" WHERE p.is_active");

    if let Some(q) = f.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", q);
        qb.push(" AND (p.product_name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR p.description ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR b.brand_name ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
    if !f.category_ids.is_empty() {
        qb.push(" AND p.category_id = ANY(");
        qb.push_bind(f.category_ids.clone());
        qb.push(")");
    }
    if !f.brand_ids.is_empty() {
        qb.push(" AND p.brand_id = ANY(");
        qb.push_bind(f.brand_ids.clone());
        qb.push(")");
    }
    if let Some(min) = &f.price_min {
        qb.push(" AND v.retail_price >= ");
        qb.push_bind(min.clone());
    }
    if let Some(max) = &f.price_max {
        qb.push(" AND v.retail_price <= ");
        qb.push_bind(max.clone());
    }
}

/// Select query for one result page. When variants are joined, grouping by
/// the product primary key deduplicates multi-variant products and lets the
/// price sort aggregate over exactly the variants that passed the filter.
pub fn build_search_query(f: &SearchFilters) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT p.*");
    push_search_from_where(&mut qb, f);
    if f.needs_variant_join() {
        qb.push(" GROUP BY p.product_id");
    }
    qb.push(match f.sort {
        SortKey::PriceAsc => " ORDER BY MIN(v.retail_price) ASC, p.product_id",
        SortKey::PriceDesc => " ORDER BY MAX(v.retail_price) DESC, p.product_id",
        SortKey::Relevance | SortKey::Newest => " ORDER BY p.created_at DESC",
    });
    qb.push(" LIMIT ");
    qb.push_bind(SEARCH_PAGE_SIZE);
    qb.push(" OFFSET ");
    qb.push_bind(page_offset(f.page, SEARCH_PAGE_SIZE));
    qb
}

/// Count over the deduplicated filtered set.
pub fn build_count_query(f: &SearchFilters) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(DISTINCT p.product_id)");
    push_search_from_where(&mut qb, f);
    qb
}

#[instrument(skip(db, filters))]
pub async fn search(db: &Db, filters: &SearchFilters) -> StoreResult<(Vec<Product>, i64)> {
    let items: Vec<Product> = build_search_query(filters)
        .build_query_as()
        .fetch_all(&db.pool)
        .await?;
    let total: i64 = build_count_query(filters)
        .build_query_scalar()
        .fetch_one(&db.pool)
        .await?;
    Ok((items, total))
}

/// The variant flagged default, else the first in storage order, else none.
pub fn resolve_default_variant(variants: &[ProductVariant]) -> Option<&ProductVariant> {
    variants.iter().find(|v| v.is_default).or_else(|| variants.first())
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    pub variants: Vec<ProductVariant>,
    pub attributes: Vec<AttributeValue>,
    pub images: Vec<ProductImage>,
    pub default_variant_id: Option<i64>,
    /// `None` renders as the "no price" sentinel.
    pub default_price: Option<BigDecimal>,
    pub related: Vec<Product>,
}

#[instrument(skip(db))]
pub async fn product_detail(db: &Db, slug: &str) -> StoreResult<ProductDetail> {
    let product: Product =
        sqlx::query_as("SELECT * FROM products WHERE slug = $1 AND is_active")
            .bind(slug)
            .fetch_optional(&db.pool)
            .await?
            .ok_or(StoreError::NotFound("product"))?;

    let variants: Vec<ProductVariant> = sqlx::query_as(
        "SELECT * FROM product_variants WHERE product_id = $1 ORDER BY variant_id",
    )
    .bind(product.product_id)
    .fetch_all(&db.pool)
    .await?;

    let attributes: Vec<AttributeValue> = sqlx::query_as(
        "SELECT pa.attribute_id, a.attribute_name, pa.value
         FROM product_attributes pa
         JOIN attributes a ON a.attribute_id = pa.attribute_id
         WHERE pa.product_id = $1
         ORDER BY a.display_order, a.attribute_id",
    )
    .bind(product.product_id)
    .fetch_all(&db.pool)
    .await?;

    let images: Vec<ProductImage> = sqlx::query_as(
        "SELECT image_id, product_id, image_url, alt_text, title, caption,
                sort_order, is_featured
         FROM product_images WHERE product_id = $1 ORDER BY sort_order, image_id",
    )
    .bind(product.product_id)
    .fetch_all(&db.pool)
    .await?;

    let related: Vec<Product> = sqlx::query_as(
        "SELECT * FROM products
         WHERE category_id = $1 AND product_id <> $2 AND is_active
         ORDER BY created_at DESC
         LIMIT $3",
    )
    .bind(product.category_id)
    .bind(product.product_id)
    .bind(RELATED_LIMIT)
    .fetch_all(&db.pool)
    .await?;

    let default_variant = resolve_default_variant(&variants);
    Ok(ProductDetail {
        default_variant_id: default_variant.map(|v| v.variant_id),
        default_price: default_variant.map(|v| v.retail_price.clone()),
        product,
        variants,
        attributes,
        images,
        related,
    })
}

#[instrument(skip(db))]
pub async fn list_products(db: &Db, page: i64) -> StoreResult<(Vec<Product>, i64)> {
    let items: Vec<Product> = sqlx::query_as(
        "SELECT * FROM products WHERE is_active
         ORDER BY created_at DESC
         LIMIT $1 OFFSET $2",
    )
    .bind(LIST_PAGE_SIZE)
    .bind(page_offset(page, LIST_PAGE_SIZE))
    .fetch_all(&db.pool)
    .await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active")
        .fetch_one(&db.pool)
        .await?;
    Ok((items, total))
}

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub categories: Vec<Category>,
    pub featured_products: Vec<Product>,
}

/// Root categories plus the newest active products.
#[instrument(skip(db))]
pub async fn home_page(db: &Db) -> StoreResult<HomePage> {
    let categories: Vec<Category> = sqlx::query_as(
        "SELECT * FROM categories WHERE parent_id IS NULL AND is_active
         ORDER BY category_name",
    )
    .fetch_all(&db.pool)
    .await?;
    let featured_products: Vec<Product> = sqlx::query_as(
        "SELECT * FROM products WHERE is_active ORDER BY created_at DESC LIMIT $1",
    )
    .bind(HOME_PRODUCT_LIMIT)
    .fetch_all(&db.pool)
    .await?;
    Ok(HomePage {
        categories,
        featured_products,
    })
}

#[derive(Debug, Clone, Default)]
pub struct AdminProductFilter {
    pub brand_id: Option<i64>,
    pub category_id: Option<i64>,
    /// "active" | "inactive"; anything else means both.
    pub status: Option<String>,
    pub q: Option<String>,
}

/// Back-office listing: unpaginated, newest first, inactive rows included
/// unless filtered out.
#[instrument(skip(db, filter))]
pub async fn admin_list_products(db: &Db, filter: &AdminProductFilter) -> StoreResult<Vec<Product>> {
    let mut qb: QueryBuilder<'static, Postgres> =
        QueryBuilder::new("SELECT * FROM products WHERE true");
    if let Some(brand_id) = filter.brand_id {
        qb.push(" AND brand_id = ");
        qb.push_bind(brand_id);
    }
    if let Some(category_id) = filter.category_id {
        qb.push(" AND category_id = ");
        qb.push_bind(category_id);
    }
    match filter.status.as_deref() {
        Some("active") => {
            qb.push(" AND is_active");
        }
        Some("inactive") => {
            qb.push(" AND NOT is_active");
        }
        _ => {}
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        qb.push(" AND product_name ILIKE ");
        qb.push_bind(format!("%{}%", q));
    }
    qb.push(" ORDER BY created_at DESC");
    let items = qb.build_query_as().fetch_all(&db.pool).await?;
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn variant(variant_id: i64, is_default: bool) -> ProductVariant {
        ProductVariant {
            variant_id,
            product_id: 1,
            sku: format!("SKU-{variant_id}"),
            variant_name: None,
            size_value: None,
            size_unit: None,
            wholesale_price: BigDecimal::from(0),
            retail_price: BigDecimal::from(100 * variant_id),
            stock_quantity: 0,
            is_active: true,
            is_default,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn sort_key_parsing() {
        assert_eq!(SortKey::parse(Some("price-asc")), SortKey::PriceAsc);
        assert_eq!(SortKey::parse(Some("price-desc")), SortKey::PriceDesc);
        assert_eq!(SortKey::parse(Some("newest")), SortKey::Newest);
        assert_eq!(SortKey::parse(Some("garbage")), SortKey::Relevance);
        assert_eq!(SortKey::parse(None), SortKey::Relevance);
    }

    #[test]
    fn page_offset_clamps_to_first_page() {
        assert_eq!(page_offset(0, 12), 0);
        assert_eq!(page_offset(1, 12), 0);
        assert_eq!(page_offset(3, 12), 24);
    }

    #[test]
    fn plain_search_has_no_variant_join() {
        let f = SearchFilters {
            q: Some("filter".into()),
            page: 1,
            ..Default::default()
        };
        let sql = build_search_query(&f).sql().to_string();
        assert!(!sql.contains("JOIN product_variants"));
        assert!(!sql.contains("GROUP BY"));
        assert_eq!(sql.matches("ILIKE").count(), 3);
        assert!(sql.contains("ORDER BY p.created_at DESC"));
    }

    #[test]
    fn price_filter_joins_and_deduplicates() {
        let f = SearchFilters {
            price_min: Some(BigDecimal::from(100)),
            price_max: Some(BigDecimal::from(200)),
            sort: SortKey::PriceAsc,
            page: 1,
            ..Default::default()
        };
        let sql = build_search_query(&f).sql().to_string();
        assert!(sql.contains("JOIN product_variants v"));
        assert!(sql.contains("GROUP BY p.product_id"));
        assert!(sql.contains("ORDER BY MIN(v.retail_price) ASC"));

        let count_sql = build_count_query(&f).sql().to_string();
        assert!(count_sql.starts_with("SELECT COUNT(DISTINCT p.product_id)"));
        assert!(!count_sql.contains("GROUP BY"));
    }

    #[test]
    fn price_sort_alone_still_joins() {
        let f = SearchFilters {
            sort: SortKey::PriceDesc,
            page: 1,
            ..Default::default()
        };
        let sql = build_search_query(&f).sql().to_string();
        assert!(sql.contains("JOIN product_variants v"));
        assert!(sql.contains("ORDER BY MAX(v.retail_price) DESC"));
    }

    #[test]
    fn multi_valued_filters_use_any() {
        let f = SearchFilters {
            category_ids: vec![1, 2],
            brand_ids: vec![9],
            page: 2,
            ..Default::default()
        };
        let sql = build_search_query(&f).sql().to_string();
        assert!(sql.contains("p.category_id = ANY("));
        assert!(sql.contains("p.brand_id = ANY("));
    }

    #[test]
    fn default_variant_prefers_flag_then_storage_order() {
        let flagged = vec![variant(1, false), variant(2, true), variant(3, false)];
        assert_eq!(resolve_default_variant(&flagged).unwrap().variant_id, 2);

        let unflagged = vec![variant(4, false), variant(5, false)];
        assert_eq!(resolve_default_variant(&unflagged).unwrap().variant_id, 4);

        assert!(resolve_default_variant(&[]).is_none());
    }
}
