// Back-office handlers. Everything here sits behind the session
// middleware except login.

use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::instrument;

use crate::api::auth::{token_from_header, AdminCredentials, SessionStore};
use crate::api::models::{
    AdminListQuery, ApiResponse, ArticleForm, AttributeForm, BrandForm, CategoryForm,
    CheckSkuRequest, GenerateSkuRequest, LoginRequest, LoginResponse, PageOf, PageQuery,
    ProductForm, RespondForm, SettingForm, UploadForm,
};
use crate::blobstore::BlobStore;
use crate::catalog::read::{self, AdminProductFilter};
use crate::catalog::sku;
use crate::catalog::types::ImageInput;
use crate::catalog::write;
use crate::content::articles::{self, ArticleInput};
use crate::content::comments::{self, ModerationAction};
use crate::content::contact::{self, INBOX_PAGE_SIZE};
use crate::error::StoreError;
use crate::taxonomy::attributes::{self, AttributeInput};
use crate::taxonomy::brands::{self, BrandInput};
use crate::taxonomy::categories::{CategoryInput, TreeStore, ARTICLE_CATEGORIES, CATEGORIES};
use crate::taxonomy::settings;
use crate::util::db::Db;

// ---- session ----

#[instrument(skip(credentials, sessions, form))]
pub async fn login(
    credentials: web::Data<AdminCredentials>,
    sessions: web::Data<Arc<SessionStore>>,
    form: web::Json<LoginRequest>,
) -> HttpResponse {
    if credentials.matches(&form.username, &form.password) {
        let token = sessions.issue();
        tracing::info!(username = %form.username, "admin login succeeded");
        HttpResponse::Ok().json(ApiResponse::success(LoginResponse { token }))
    } else {
        tracing::warn!(username = %form.username, "admin login rejected");
        HttpResponse::Unauthorized().json(ApiResponse::<()>::error("invalid credentials"))
    }
}

pub async fn logout(sessions: web::Data<Arc<SessionStore>>, req: HttpRequest) -> HttpResponse {
    if let Some(token) = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(token_from_header)
    {
        sessions.revoke(&token);
    }
    HttpResponse::Ok().json(ApiResponse::success("logged out"))
}

// ---- products ----

/// Push uploads through the blob store. A failed store is logged and
/// skipped rather than failing the whole save.
fn store_uploads(blobs: &dyn BlobStore, uploads: &[UploadForm]) -> Vec<ImageInput> {
    uploads
        .iter()
        .filter_map(|upload| {
            let bytes = match BASE64.decode(upload.data_base64.trim()) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(filename = %upload.filename, error = %e, "skipping undecodable upload");
                    return None;
                }
            };
            match blobs.store(&upload.filename, &bytes) {
                Ok(url) => Some(ImageInput {
                    image_url: url,
                    alt_text: upload.alt_text.clone(),
                    title: upload.title.clone(),
                    caption: upload.caption.clone(),
                }),
                Err(e) => {
                    tracing::warn!(filename = %upload.filename, error = %e, "image store failed, skipping");
                    None
                }
            }
        })
        .collect()
}

pub async fn list_products(
    db: web::Data<Db>,
    query: web::Query<AdminListQuery>,
) -> Result<HttpResponse, StoreError> {
    let filter = AdminProductFilter {
        brand_id: query.brand_id,
        category_id: query.category_id,
        status: query.status.clone(),
        q: query.q.clone(),
    };
    let rows = read::admin_list_products(&db, &filter).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(rows)))
}

pub async fn create_product(
    db: web::Data<Db>,
    blobs: web::Data<Arc<dyn BlobStore>>,
    form: web::Json<ProductForm>,
) -> Result<HttpResponse, StoreError> {
    let form = form.into_inner();
    let stored = store_uploads(blobs.as_ref().as_ref(), &form.images);
    let product = write::create_product(&db, form.into_input(stored)).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(product)))
}

pub async fn update_product(
    db: web::Data<Db>,
    blobs: web::Data<Arc<dyn BlobStore>>,
    product_id: web::Path<i64>,
    form: web::Json<ProductForm>,
) -> Result<HttpResponse, StoreError> {
    let form = form.into_inner();
    let stored = store_uploads(blobs.as_ref().as_ref(), &form.images);
    let product = write::update_product(&db, *product_id, form.into_input(stored)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(product)))
}

pub async fn delete_product(
    db: web::Data<Db>,
    product_id: web::Path<i64>,
) -> Result<HttpResponse, StoreError> {
    write::soft_delete_product(&db, *product_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("deleted")))
}

pub async fn generate_sku(
    db: web::Data<Db>,
    form: web::Json<GenerateSkuRequest>,
) -> Result<HttpResponse, StoreError> {
    let sku = sku::generate_sku(&db, &form.product_name, &form.size, &form.brand).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({ "sku": sku }))))
}

pub async fn check_sku(
    db: web::Data<Db>,
    form: web::Json<CheckSkuRequest>,
) -> Result<HttpResponse, StoreError> {
    let available = sku::sku_available(&db, form.sku.as_deref().unwrap_or("")).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({ "available": available }))))
}

pub async fn list_attributes_api(db: web::Data<Db>) -> Result<HttpResponse, StoreError> {
    let rows = attributes::list_attributes(&db).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(rows)))
}

// ---- category trees ----

impl CategoryForm {
    fn into_input(self) -> CategoryInput {
        CategoryInput {
            category_name: self.category_name,
            parent_id: self.parent_id,
            sort_order: self.sort_order,
            is_active: self.is_active,
        }
    }
}

async fn tree_list(store: TreeStore, db: &Db) -> Result<HttpResponse, StoreError> {
    let rows = store.list(db).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(rows)))
}

async fn tree_create(
    store: TreeStore,
    db: &Db,
    form: CategoryForm,
) -> Result<HttpResponse, StoreError> {
    let row = store.create(db, form.into_input()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(row)))
}

async fn tree_update(
    store: TreeStore,
    db: &Db,
    id: i64,
    form: CategoryForm,
) -> Result<HttpResponse, StoreError> {
    let row = store.update(db, id, form.into_input()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(row)))
}

async fn tree_delete(store: TreeStore, db: &Db, id: i64) -> Result<HttpResponse, StoreError> {
    store.soft_delete(db, id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("deleted")))
}

pub async fn list_categories(db: web::Data<Db>) -> Result<HttpResponse, StoreError> {
    tree_list(CATEGORIES, &db).await
}

pub async fn create_category(
    db: web::Data<Db>,
    form: web::Json<CategoryForm>,
) -> Result<HttpResponse, StoreError> {
    tree_create(CATEGORIES, &db, form.into_inner()).await
}

pub async fn update_category(
    db: web::Data<Db>,
    id: web::Path<i64>,
    form: web::Json<CategoryForm>,
) -> Result<HttpResponse, StoreError> {
    tree_update(CATEGORIES, &db, *id, form.into_inner()).await
}

pub async fn delete_category(
    db: web::Data<Db>,
    id: web::Path<i64>,
) -> Result<HttpResponse, StoreError> {
    tree_delete(CATEGORIES, &db, *id).await
}

pub async fn list_article_categories(db: web::Data<Db>) -> Result<HttpResponse, StoreError> {
    tree_list(ARTICLE_CATEGORIES, &db).await
}

pub async fn create_article_category(
    db: web::Data<Db>,
    form: web::Json<CategoryForm>,
) -> Result<HttpResponse, StoreError> {
    tree_create(ARTICLE_CATEGORIES, &db, form.into_inner()).await
}

pub async fn update_article_category(
    db: web::Data<Db>,
    id: web::Path<i64>,
    form: web::Json<CategoryForm>,
) -> Result<HttpResponse, StoreError> {
    tree_update(ARTICLE_CATEGORIES, &db, *id, form.into_inner()).await
}

pub async fn delete_article_category(
    db: web::Data<Db>,
    id: web::Path<i64>,
) -> Result<HttpResponse, StoreError> {
    tree_delete(ARTICLE_CATEGORIES, &db, *id).await
}

// ---- brands ----

impl BrandForm {
    fn into_input(self) -> BrandInput {
        BrandInput {
            brand_name: self.brand_name,
            brand_name_en: self.brand_name_en,
            logo_path: self.logo_path,
            description: self.description,
            is_active: self.is_active,
        }
    }
}

pub async fn list_brands(db: web::Data<Db>) -> Result<HttpResponse, StoreError> {
    let rows = brands::list_brands(&db).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(rows)))
}

pub async fn create_brand(
    db: web::Data<Db>,
    form: web::Json<BrandForm>,
) -> Result<HttpResponse, StoreError> {
    let row = brands::create_brand(&db, form.into_inner().into_input()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(row)))
}

pub async fn update_brand(
    db: web::Data<Db>,
    id: web::Path<i64>,
    form: web::Json<BrandForm>,
) -> Result<HttpResponse, StoreError> {
    let row = brands::update_brand(&db, *id, form.into_inner().into_input()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(row)))
}

pub async fn delete_brand(
    db: web::Data<Db>,
    id: web::Path<i64>,
) -> Result<HttpResponse, StoreError> {
    brands::delete_brand(&db, *id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("deleted")))
}

// ---- attributes ----

impl AttributeForm {
    fn into_input(self) -> AttributeInput {
        AttributeInput {
            attribute_name: self.attribute_name,
            attribute_type: self.attribute_type,
            is_filterable: self.is_filterable,
            display_order: self.display_order,
        }
    }
}

pub async fn create_attribute(
    db: web::Data<Db>,
    form: web::Json<AttributeForm>,
) -> Result<HttpResponse, StoreError> {
    let row = attributes::create_attribute(&db, form.into_inner().into_input()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(row)))
}

pub async fn update_attribute(
    db: web::Data<Db>,
    id: web::Path<i64>,
    form: web::Json<AttributeForm>,
) -> Result<HttpResponse, StoreError> {
    let row = attributes::update_attribute(&db, *id, form.into_inner().into_input()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(row)))
}

pub async fn delete_attribute(
    db: web::Data<Db>,
    id: web::Path<i64>,
) -> Result<HttpResponse, StoreError> {
    attributes::delete_attribute(&db, *id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("deleted")))
}

// ---- articles ----

impl ArticleForm {
    fn into_input(self) -> ArticleInput {
        ArticleInput {
            title: self.title,
            category_id: self.category_id,
            meta_title: self.meta_title,
            meta_description: self.meta_description,
            meta_keywords: self.meta_keywords,
            content: self.content,
            is_published: self.is_published,
            is_featured: self.is_featured,
            is_active: self.is_active,
        }
    }
}

pub async fn list_articles(db: web::Data<Db>) -> Result<HttpResponse, StoreError> {
    let rows = articles::admin_list_articles(&db).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(rows)))
}

pub async fn create_article(
    db: web::Data<Db>,
    form: web::Json<ArticleForm>,
) -> Result<HttpResponse, StoreError> {
    let row = articles::create_article(&db, form.into_inner().into_input()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(row)))
}

pub async fn update_article(
    db: web::Data<Db>,
    id: web::Path<i64>,
    form: web::Json<ArticleForm>,
) -> Result<HttpResponse, StoreError> {
    let row = articles::update_article(&db, *id, form.into_inner().into_input()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(row)))
}

pub async fn delete_article(
    db: web::Data<Db>,
    id: web::Path<i64>,
) -> Result<HttpResponse, StoreError> {
    articles::soft_delete_article(&db, *id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("deleted")))
}

pub async fn attach_article_image(
    db: web::Data<Db>,
    blobs: web::Data<Arc<dyn BlobStore>>,
    id: web::Path<i64>,
    form: web::Json<UploadForm>,
) -> Result<HttpResponse, StoreError> {
    let upload = form.into_inner();
    let stored = store_uploads(blobs.as_ref().as_ref(), std::slice::from_ref(&upload));
    let image = match stored.first() {
        Some(input) => {
            articles::attach_image(&db, *id, &input.image_url, input.alt_text.as_deref()).await?
        }
        None => return Err(StoreError::validation("image could not be stored")),
    };
    Ok(HttpResponse::Created().json(ApiResponse::success(image)))
}

pub async fn remove_article_image(
    db: web::Data<Db>,
    image_id: web::Path<i64>,
) -> Result<HttpResponse, StoreError> {
    articles::remove_image(&db, *image_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("deleted")))
}

// ---- comment moderation ----

pub async fn pending_comments(db: web::Data<Db>) -> Result<HttpResponse, StoreError> {
    let rows = comments::list_pending(&db).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(rows)))
}

pub async fn approve_comment(
    db: web::Data<Db>,
    id: web::Path<i64>,
) -> Result<HttpResponse, StoreError> {
    let row = comments::moderate_comment(&db, *id, ModerationAction::Approve).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(row)))
}

pub async fn spam_comment(
    db: web::Data<Db>,
    id: web::Path<i64>,
) -> Result<HttpResponse, StoreError> {
    let row = comments::moderate_comment(&db, *id, ModerationAction::MarkSpam).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(row)))
}

pub async fn delete_comment(
    db: web::Data<Db>,
    id: web::Path<i64>,
) -> Result<HttpResponse, StoreError> {
    comments::delete_comment(&db, *id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("deleted")))
}

// ---- contact inbox ----

pub async fn list_messages(
    db: web::Data<Db>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, StoreError> {
    let page = query.page.unwrap_or(1);
    let (items, total) = contact::list_messages(&db, page).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(PageOf {
        items,
        total,
        page,
        per_page: INBOX_PAGE_SIZE,
    })))
}

pub async fn respond_message(
    db: web::Data<Db>,
    id: web::Path<i64>,
    form: web::Json<RespondForm>,
) -> Result<HttpResponse, StoreError> {
    let row = contact::respond_to_message(&db, *id, &form.response).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(row)))
}

// ---- site settings ----

pub async fn list_settings(db: web::Data<Db>) -> Result<HttpResponse, StoreError> {
    let rows = settings::list_settings(&db).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(rows)))
}

pub async fn upsert_setting(
    db: web::Data<Db>,
    form: web::Json<SettingForm>,
) -> Result<HttpResponse, StoreError> {
    let row =
        settings::upsert_setting(&db, &form.setting_key, &form.setting_value, form.sort_order)
            .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(row)))
}

pub async fn toggle_setting(
    db: web::Data<Db>,
    key: web::Path<String>,
) -> Result<HttpResponse, StoreError> {
    let row = settings::toggle_setting(&db, &key).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(row)))
}

pub async fn delete_setting(
    db: web::Data<Db>,
    key: web::Path<String>,
) -> Result<HttpResponse, StoreError> {
    settings::delete_setting(&db, &key).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("deleted")))
}
