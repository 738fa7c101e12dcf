//! Item handlers
//!
//! Author: hephaex@gmail.com

use crate::error::{AppError, AppJson, AppPath, AppQuery};
use crate::state::AppState;
use axum::{extract::State, Json};
use catalog_core::{DeleteRequest, Item, ItemUpdate, NewItem};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

/// Filter for `GET /items`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ItemFilter {
    /// Only items filed under this category
    pub cat_id: Option<i32>,
}

fn not_found() -> AppError {
    AppError::NotFound("Item".to_string())
}

#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    request_body = NewItem,
    responses(
        (status = 200, description = "Item created", body = Item),
        (status = 400, description = "Unknown category", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    AppJson(item): AppJson<NewItem>,
) -> Result<Json<Item>, AppError> {
    Ok(Json(state.catalog.create_item(&item).await?))
}

#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    params(ItemFilter),
    responses((status = 200, description = "Items", body = [Item])),
    security(("bearer_auth" = []))
)]
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    AppQuery(filter): AppQuery<ItemFilter>,
) -> Result<Json<Vec<Item>>, AppError> {
    Ok(Json(state.catalog.list_items(filter.cat_id).await?))
}

#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    params(("id" = i32, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item", body = Item),
        (status = 404, description = "No such item", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Item>, AppError> {
    state.catalog.get_item(id).await?.map(Json).ok_or_else(not_found)
}

/// Update an item; absent fields keep their current value
#[utoipa::path(
    put,
    path = "/items",
    tag = "items",
    request_body = ItemUpdate,
    responses(
        (status = 200, description = "Updated item", body = Item),
        (status = 404, description = "No such item", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    AppJson(update): AppJson<ItemUpdate>,
) -> Result<Json<Item>, AppError> {
    state
        .catalog
        .update_item(&update)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[utoipa::path(
    delete,
    path = "/items",
    tag = "items",
    request_body = DeleteRequest,
    responses(
        (status = 200, description = "Deleted item", body = Item),
        (status = 404, description = "No such item", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<DeleteRequest>,
) -> Result<Json<Item>, AppError> {
    state
        .catalog
        .delete_item(request.id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}
