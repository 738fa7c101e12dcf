//! Catalog Core - Domain models, configuration and storage
//!
//! This crate defines the abstractions shared by the catalog server:
//! - Category and item models with their parent/child linkage
//! - Common error types
//! - The `CatalogRepository` trait and its PostgreSQL store
//! - Configuration management

pub mod config;
pub mod store;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig};
pub use store::{CatalogRepository, PgCatalogStore};

#[cfg(any(test, feature = "test-utils"))]
pub use store::MemoryCatalogStore;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for catalog operations
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

// ============================================================================
// Categories
// ============================================================================

/// A category, optionally nested under a parent category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Category {
    pub cat_id: i32,
    pub label: String,
    pub parent_cat_id: Option<i32>,
}

/// Body of `POST /categories`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewCategory {
    pub label: String,
    #[serde(default)]
    pub parent_cat_id: Option<i32>,
}

/// Body of `PUT /categories`
///
/// `parent_cat_id` distinguishes three cases: field absent keeps the current
/// parent, explicit `null` moves the category to the top level, and a value
/// re-parents it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CategoryUpdate {
    pub id: i32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub parent_cat_id: Option<Option<i32>>,
}

// ============================================================================
// Items
// ============================================================================

/// An item filed under a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Item {
    pub item_id: i32,
    pub label: String,
    pub cat_id: Option<i32>,
}

/// Body of `POST /items`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewItem {
    pub label: String,
    #[serde(default)]
    pub cat_id: Option<i32>,
}

/// Body of `PUT /items`; absent fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ItemUpdate {
    pub id: i32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub cat_id: Option<i32>,
}

/// Body of the `DELETE` endpoints
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct DeleteRequest {
    pub id: i32,
}

/// Deserialize a present field as `Some(value)`, keeping `null` as `Some(None)`.
///
/// Combined with `#[serde(default)]` an absent field stays `None`.
pub fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_update_parent_absent() {
        let update: CategoryUpdate = serde_json::from_str(r#"{"id": 3, "label": "x"}"#).unwrap();
        assert_eq!(update.parent_cat_id, None);
        assert_eq!(update.label.as_deref(), Some("x"));
    }

    #[test]
    fn test_category_update_parent_null() {
        let update: CategoryUpdate =
            serde_json::from_str(r#"{"id": 3, "parent_cat_id": null}"#).unwrap();
        assert_eq!(update.parent_cat_id, Some(None));
        assert_eq!(update.label, None);
    }

    #[test]
    fn test_category_update_parent_value() {
        let update: CategoryUpdate =
            serde_json::from_str(r#"{"id": 3, "parent_cat_id": 7}"#).unwrap();
        assert_eq!(update.parent_cat_id, Some(Some(7)));
    }

    #[test]
    fn test_new_item_without_category() {
        let item: NewItem = serde_json::from_str(r#"{"label": "hammer"}"#).unwrap();
        assert_eq!(item.cat_id, None);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            CatalogError::NotFound("Category".to_string()).to_string(),
            "Category not found"
        );
    }
}
