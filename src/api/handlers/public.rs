// Storefront handlers: everything reachable without a session.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use tracing::instrument;

use crate::api::models::{
    ApiResponse, CommentForm, ContactForm, HealthResponse, PageOf, PageQuery, SearchQuery,
};
use crate::catalog::read::{
    self, HomePage, ProductDetail, LIST_PAGE_SIZE, SEARCH_PAGE_SIZE,
};
use crate::content::articles::{self, Article, BLOG_PAGE_SIZE};
use crate::content::comments::{self, Comment, CommentInput};
use crate::content::contact::{self, ContactInput};
use crate::error::StoreError;
use crate::util::db::Db;

#[instrument(skip(db))]
pub async fn health_check(db: web::Data<Db>) -> HttpResponse {
    let database = match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&db.pool)
        .await
    {
        Ok(_) => "connected",
        Err(e) => {
            tracing::error!(error = %e, "health check database probe failed");
            "unavailable"
        }
    };

    HttpResponse::Ok().json(ApiResponse::success(HealthResponse {
        status: "ok".to_string(),
        database: database.to_string(),
        uptime_seconds: crate::api::server::uptime_seconds(),
    }))
}

pub async fn home(db: web::Data<Db>) -> Result<HttpResponse, StoreError> {
    let page: HomePage = read::home_page(&db).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

pub async fn list_products(
    db: web::Data<Db>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, StoreError> {
    let page = query.page.unwrap_or(1);
    let (items, total) = read::list_products(&db, page).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(PageOf {
        items,
        total,
        page,
        per_page: LIST_PAGE_SIZE,
    })))
}

pub async fn product_detail(
    db: web::Data<Db>,
    slug: web::Path<String>,
) -> Result<HttpResponse, StoreError> {
    let detail: ProductDetail = read::product_detail(&db, &slug).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(detail)))
}

pub async fn search(
    db: web::Data<Db>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, StoreError> {
    let filters = query.into_inner().into_filters();
    let page = filters.page.max(1);
    let (items, total) = read::search(&db, &filters).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(PageOf {
        items,
        total,
        page,
        per_page: SEARCH_PAGE_SIZE,
    })))
}

pub async fn blog_index(
    db: web::Data<Db>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, StoreError> {
    let page = query.page.unwrap_or(1);
    let (items, total) = articles::list_published(&db, page).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(PageOf {
        items,
        total,
        page,
        per_page: BLOG_PAGE_SIZE,
    })))
}

pub async fn blog_category(
    db: web::Data<Db>,
    slug: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, StoreError> {
    let page = query.page.unwrap_or(1);
    let (items, total) = articles::list_by_category_slug(&db, &slug, page).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(PageOf {
        items,
        total,
        page,
        per_page: BLOG_PAGE_SIZE,
    })))
}

#[derive(Serialize)]
struct ArticleView {
    article: Article,
    comments: Vec<Comment>,
}

/// Article page: bumps the view counter and includes the approved
/// comment thread.
pub async fn blog_detail(
    db: web::Data<Db>,
    slug: web::Path<String>,
) -> Result<HttpResponse, StoreError> {
    let article = articles::article_detail(&db, &slug).await?;
    let comments = comments::list_approved(&db, article.article_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(ArticleView { article, comments })))
}

pub async fn submit_comment(
    db: web::Data<Db>,
    article_id: web::Path<i64>,
    form: web::Json<CommentForm>,
) -> Result<HttpResponse, StoreError> {
    let form = form.into_inner();
    let comment = comments::submit_comment(
        &db,
        *article_id,
        CommentInput {
            author_name: form.author_name,
            author_email: form.author_email,
            body: form.body,
            parent_id: form.parent_id,
        },
    )
    .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(comment)))
}

pub async fn submit_contact(
    db: web::Data<Db>,
    req: HttpRequest,
    form: web::Json<ContactForm>,
) -> Result<HttpResponse, StoreError> {
    let ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();
    let form = form.into_inner();
    let message = contact::submit_message(
        &db,
        ContactInput {
            name: form.name,
            email: form.email,
            phone: form.phone,
            subject: form.subject,
            body: form.body,
        },
        &ip,
    )
    .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(message)))
}
