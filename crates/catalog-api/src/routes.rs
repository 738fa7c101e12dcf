//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::auth::middleware::session_guard;
use crate::handlers::{auth, categories, health, items, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI document for every route below
#[derive(OpenApi)]
#[openapi(
    info(title = "catalog-api", description = "Catalog backend with token-based authentication"),
    paths(
        auth::signup_handler,
        auth::signin_handler,
        categories::create_category,
        categories::list_top_level,
        categories::list_categories,
        categories::get_category,
        categories::update_category,
        categories::delete_category,
        items::create_item,
        items::list_items,
        items::get_item,
        items::update_item,
        items::delete_item,
        users::list_users,
        health::health_check,
    ),
    components(schemas(
        crate::auth::SignupRequest,
        crate::auth::SigninRequest,
        crate::auth::TokenResponse,
        crate::auth::UserPublic,
        crate::error::ErrorBody,
        crate::error::FieldError,
        crate::error::ValidationErrorBody,
        catalog_core::Category,
        catalog_core::NewCategory,
        catalog_core::CategoryUpdate,
        catalog_core::Item,
        catalog_core::NewItem,
        catalog_core::ItemUpdate,
        catalog_core::DeleteRequest,
        health::HealthResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Signup and signin"),
        (name = "categories", description = "Category management"),
        (name = "items", description = "Item management"),
        (name = "users", description = "Registered identities"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create API routes
///
/// Everything except signup, signin and the service endpoints sits behind
/// the session guard.
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/signup", post(auth::signup_handler))
        .route("/signin", post(auth::signin_handler))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::prometheus_metrics))
        .route("/api-docs/openapi.json", get(health::openapi_json));

    // Protected routes (session token required)
    let protected_routes = Router::new()
        .route(
            "/categories",
            post(categories::create_category)
                .get(categories::list_categories)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/categories/toplevel", get(categories::list_top_level))
        .route("/categories/:id", get(categories::get_category))
        .route(
            "/items",
            post(items::create_item)
                .get(items::list_items)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        .route("/items/:id", get(items::get_item))
        .route("/users", get(users::list_users))
        .route_layer(middleware::from_fn_with_state(state, session_guard));

    Router::new().merge(public_routes).merge(protected_routes)
}
