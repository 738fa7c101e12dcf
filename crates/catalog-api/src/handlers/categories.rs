//! Category handlers
//!
//! Author: hephaex@gmail.com

use crate::error::{AppError, AppJson, AppPath, AppQuery};
use crate::state::AppState;
use axum::{extract::State, Json};
use catalog_core::{Category, CategoryUpdate, DeleteRequest, NewCategory};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

/// Filter for `GET /categories`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryFilter {
    /// Only children of this category
    pub parent_cat_id: Option<i32>,
}

/// Create a category
#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    request_body = NewCategory,
    responses(
        (status = 200, description = "Category created", body = Category),
        (status = 400, description = "Unknown parent category", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    AppJson(category): AppJson<NewCategory>,
) -> Result<Json<Category>, AppError> {
    let created = state.catalog.create_category(&category).await?;
    tracing::debug!(cat_id = created.cat_id, "category created");
    Ok(Json(created))
}

/// Categories without a parent
#[utoipa::path(
    get,
    path = "/categories/toplevel",
    tag = "categories",
    responses(
        (status = 200, description = "Top-level categories", body = [Category]),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_top_level(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.catalog.list_top_level_categories().await?))
}

/// All categories, or the children of `parent_cat_id`
#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    params(CategoryFilter),
    responses(
        (status = 200, description = "Categories", body = [Category]),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    AppQuery(filter): AppQuery<CategoryFilter>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.catalog.list_categories(filter.parent_cat_id).await?))
}

/// One category by id
#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "categories",
    params(("id" = i32, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category", body = Category),
        (status = 404, description = "No such category", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Category>, AppError> {
    state
        .catalog
        .get_category(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Category".to_string()))
}

/// Update a category's label and/or parent
#[utoipa::path(
    put,
    path = "/categories",
    tag = "categories",
    request_body = CategoryUpdate,
    responses(
        (status = 200, description = "Updated category", body = Category),
        (status = 404, description = "No such category", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    AppJson(update): AppJson<CategoryUpdate>,
) -> Result<Json<Category>, AppError> {
    state
        .catalog
        .update_category(&update)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Category".to_string()))
}

/// Delete a category; children and items are detached
#[utoipa::path(
    delete,
    path = "/categories",
    tag = "categories",
    request_body = DeleteRequest,
    responses(
        (status = 200, description = "Deleted category", body = Category),
        (status = 404, description = "No such category", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<DeleteRequest>,
) -> Result<Json<Category>, AppError> {
    let deleted = state
        .catalog
        .delete_category(request.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))?;
    tracing::debug!(cat_id = deleted.cat_id, "category deleted");
    Ok(Json(deleted))
}
