//! API routes for the storefront server

pub mod admin;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod stripe_webhook;

use axum::routing::{delete, get, post};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::admin_auth_middleware;
use crate::error::ServiceError;
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, ServiceError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Public storefront (no auth)
    let storefront = Router::new()
        .route("/api/products", get(catalog::list_products))
        .route("/api/products/{id}", get(catalog::get_product))
        .route("/api/featured", get(catalog::list_featured))
        .route("/api/categories", get(catalog::list_categories))
        .route("/api/tags", get(catalog::list_tags))
        .route("/api/checkout/session", post(checkout::create_session));

    // Payment processor webhook (signature-verified, raw body)
    let webhook = Router::new().route("/stripe/webhook", post(stripe_webhook::handle_webhook));

    // Admin console (bearer token verified against the identity provider)
    let admin_routes = Router::new()
        .route(
            "/api/admin/products",
            get(admin::products::list).post(admin::products::create),
        )
        .route(
            "/api/admin/products/{id}",
            get(admin::products::get)
                .patch(admin::products::update)
                .delete(admin::products::remove),
        )
        .route(
            "/api/admin/featured",
            get(admin::featured::list).post(admin::featured::add),
        )
        .route("/api/admin/featured/{id}", delete(admin::featured::remove))
        .route(
            "/api/admin/categories",
            get(admin::taxonomy::list_categories).post(admin::taxonomy::create_category),
        )
        .route(
            "/api/admin/categories/{id}",
            delete(admin::taxonomy::delete_category).patch(admin::taxonomy::update_category),
        )
        .route(
            "/api/admin/tags",
            get(admin::taxonomy::list_tags).post(admin::taxonomy::create_tag),
        )
        .route("/api/admin/tags/{id}", delete(admin::taxonomy::delete_tag))
        .route("/api/admin/orders", get(admin::orders::list))
        .route("/api/admin/orders/{id}", get(admin::orders::get))
        .route("/api/admin/orders/{id}/ship", post(admin::orders::ship))
        .route(
            "/api/admin/orders/{id}/complete",
            post(admin::orders::complete),
        )
        .route("/api/admin/stats", get(admin::orders::stats))
        .route("/api/admin/upload", post(admin::upload::upload_image))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(storefront)
        .merge(webhook)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
