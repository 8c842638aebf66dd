use actix_web::web;

use crate::api::handlers::{admin, public};

/// Storefront routes, no authentication.
pub fn configure_public(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(public::health_check))
        .route("/", web::get().to(public::home))
        .route("/products", web::get().to(public::list_products))
        .route("/products/{slug}", web::get().to(public::product_detail))
        .route("/search", web::get().to(public::search))
        .route("/blog", web::get().to(public::blog_index))
        .route("/blog/category/{slug}", web::get().to(public::blog_category))
        .route("/blog/{slug}", web::get().to(public::blog_detail))
        .route(
            "/articles/{article_id}/comments",
            web::post().to(public::submit_comment),
        )
        .route("/contact", web::post().to(public::submit_contact));
}

/// Back-office routes; mounted under /admin behind the session
/// middleware. Paths here are relative to the scope.
pub fn configure_admin(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::post().to(admin::login))
        .route("/logout", web::post().to(admin::logout))
        // products
        .route("/products", web::get().to(admin::list_products))
        .route("/products", web::post().to(admin::create_product))
        .route("/products/{id}", web::put().to(admin::update_product))
        .route("/products/{id}", web::delete().to(admin::delete_product))
        .route("/products/generate-sku", web::post().to(admin::generate_sku))
        .route("/products/check-sku", web::post().to(admin::check_sku))
        .route("/attributes/options", web::get().to(admin::list_attributes_api))
        // category trees
        .route("/categories", web::get().to(admin::list_categories))
        .route("/categories", web::post().to(admin::create_category))
        .route("/categories/{id}", web::put().to(admin::update_category))
        .route("/categories/{id}", web::delete().to(admin::delete_category))
        .route(
            "/article-categories",
            web::get().to(admin::list_article_categories),
        )
        .route(
            "/article-categories",
            web::post().to(admin::create_article_category),
        )
        .route(
            "/article-categories/{id}",
            web::put().to(admin::update_article_category),
        )
        .route(
            "/article-categories/{id}",
            web::delete().to(admin::delete_article_category),
        )
        // brands
        .route("/brands", web::get().to(admin::list_brands))
        .route("/brands", web::post().to(admin::create_brand))
        .route("/brands/{id}", web::put().to(admin::update_brand))
        .route("/brands/{id}", web::delete().to(admin::delete_brand))
        // attributes
        .route("/attributes", web::get().to(admin::list_attributes_api))
        .route("/attributes", web::post().to(admin::create_attribute))
        .route("/attributes/{id}", web::put().to(admin::update_attribute))
        .route("/attributes/{id}", web::delete().to(admin::delete_attribute))
        // articles
        .route("/articles", web::get().to(admin::list_articles))
        .route("/articles", web::post().to(admin::create_article))
        .route("/articles/{id}", web::put().to(admin::update_article))
        .route("/articles/{id}", web::delete().to(admin::delete_article))
        .route(
            "/articles/{id}/images",
            web::post().to(admin::attach_article_image),
        )
        .route(
            "/article-images/{id}",
            web::delete().to(admin::remove_article_image),
        )
        // comment moderation
        .route("/comments/pending", web::get().to(admin::pending_comments))
        .route("/comments/{id}/approve", web::post().to(admin::approve_comment))
        .route("/comments/{id}/spam", web::post().to(admin::spam_comment))
        .route("/comments/{id}", web::delete().to(admin::delete_comment))
        // contact inbox
        .route("/messages", web::get().to(admin::list_messages))
        .route("/messages/{id}/respond", web::post().to(admin::respond_message))
        // site settings
        .route("/settings", web::get().to(admin::list_settings))
        .route("/settings", web::post().to(admin::upsert_setting))
        .route("/settings/{key}/toggle", web::post().to(admin::toggle_setting))
        .route("/settings/{key}", web::delete().to(admin::delete_setting));
}
