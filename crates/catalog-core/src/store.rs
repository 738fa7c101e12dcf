//! PostgreSQL catalog store
//!
//! Provides category and item persistence using SQLx and PostgreSQL.
//! Every operation is a single parameterized statement; there are no
//! multi-statement transactions.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::{
    CatalogError, Category, CategoryUpdate, Item, ItemUpdate, NewCategory, NewItem, Result,
};

/// Trait for catalog operations
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Insert a category
    async fn create_category(&self, category: &NewCategory) -> Result<Category>;

    /// Categories without a parent
    async fn list_top_level_categories(&self) -> Result<Vec<Category>>;

    /// All categories, or only the direct children of `parent_cat_id`
    async fn list_categories(&self, parent_cat_id: Option<i32>) -> Result<Vec<Category>>;

    /// Get category by ID
    async fn get_category(&self, id: i32) -> Result<Option<Category>>;

    /// Apply a partial update, returning the updated row if it exists
    async fn update_category(&self, update: &CategoryUpdate) -> Result<Option<Category>>;

    /// Delete a category, returning the deleted row if it existed
    async fn delete_category(&self, id: i32) -> Result<Option<Category>>;

    /// Insert an item
    async fn create_item(&self, item: &NewItem) -> Result<Item>;

    /// All items, or only the items of `cat_id`
    async fn list_items(&self, cat_id: Option<i32>) -> Result<Vec<Item>>;

    /// Get item by ID
    async fn get_item(&self, id: i32) -> Result<Option<Item>>;

    /// Apply a partial update, returning the updated row if it exists
    async fn update_item(&self, update: &ItemUpdate) -> Result<Option<Item>>;

    /// Delete an item, returning the deleted row if it existed
    async fn delete_item(&self, id: i32) -> Result<Option<Item>>;
}

/// PostgreSQL catalog store
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Create a new catalog store connection
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| CatalogError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        tracing::info!(max_connections, "catalog store connected");
        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn db_error(context: &str, err: sqlx::Error) -> CatalogError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            return CatalogError::InvalidReference(db.message().to_string());
        }
    }
    CatalogError::DatabaseError(format!("{context}: {err}"))
}

#[async_trait]
impl CatalogRepository for PgCatalogStore {
    async fn create_category(&self, category: &NewCategory) -> Result<Category> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (label, parent_cat_id)
            VALUES ($1, $2)
            RETURNING cat_id, label, parent_cat_id
            "#,
        )
        .bind(&category.label)
        .bind(category.parent_cat_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create category", e))
    }

    async fn list_top_level_categories(&self) -> Result<Vec<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT cat_id, label, parent_cat_id FROM categories WHERE parent_cat_id IS NULL ORDER BY cat_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list categories", e))
    }

    async fn list_categories(&self, parent_cat_id: Option<i32>) -> Result<Vec<Category>> {
        let query = match parent_cat_id {
            Some(parent) => sqlx::query_as::<_, Category>(
                "SELECT cat_id, label, parent_cat_id FROM categories WHERE parent_cat_id = $1 ORDER BY cat_id",
            )
            .bind(parent),
            None => sqlx::query_as::<_, Category>(
                "SELECT cat_id, label, parent_cat_id FROM categories ORDER BY cat_id",
            ),
        };

        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list categories", e))
    }

    async fn get_category(&self, id: i32) -> Result<Option<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT cat_id, label, parent_cat_id FROM categories WHERE cat_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get category", e))
    }

    async fn update_category(&self, update: &CategoryUpdate) -> Result<Option<Category>> {
        let query = match update.parent_cat_id {
            Some(Some(parent)) => sqlx::query_as::<_, Category>(
                r#"
                UPDATE categories SET label = COALESCE($1, label), parent_cat_id = $2
                WHERE cat_id = $3
                RETURNING cat_id, label, parent_cat_id
                "#,
            )
            .bind(&update.label)
            .bind(parent)
            .bind(update.id),
            Some(None) => sqlx::query_as::<_, Category>(
                r#"
                UPDATE categories SET label = COALESCE($1, label), parent_cat_id = NULL
                WHERE cat_id = $2
                RETURNING cat_id, label, parent_cat_id
                "#,
            )
            .bind(&update.label)
            .bind(update.id),
            None => sqlx::query_as::<_, Category>(
                r#"
                UPDATE categories SET label = COALESCE($1, label)
                WHERE cat_id = $2
                RETURNING cat_id, label, parent_cat_id
                "#,
            )
            .bind(&update.label)
            .bind(update.id),
        };

        query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to update category", e))
    }

    async fn delete_category(&self, id: i32) -> Result<Option<Category>> {
        sqlx::query_as::<_, Category>(
            "DELETE FROM categories WHERE cat_id = $1 RETURNING cat_id, label, parent_cat_id",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to delete category", e))
    }

    async fn create_item(&self, item: &NewItem) -> Result<Item> {
        sqlx::query_as::<_, Item>(
            "INSERT INTO items (label, cat_id) VALUES ($1, $2) RETURNING item_id, label, cat_id",
        )
        .bind(&item.label)
        .bind(item.cat_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create item", e))
    }

    async fn list_items(&self, cat_id: Option<i32>) -> Result<Vec<Item>> {
        let query = match cat_id {
            Some(cat_id) => sqlx::query_as::<_, Item>(
                "SELECT item_id, label, cat_id FROM items WHERE cat_id = $1 ORDER BY item_id",
            )
            .bind(cat_id),
            None => sqlx::query_as::<_, Item>(
                "SELECT item_id, label, cat_id FROM items ORDER BY item_id",
            ),
        };

        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list items", e))
    }

    async fn get_item(&self, id: i32) -> Result<Option<Item>> {
        sqlx::query_as::<_, Item>("SELECT item_id, label, cat_id FROM items WHERE item_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get item", e))
    }

    async fn update_item(&self, update: &ItemUpdate) -> Result<Option<Item>> {
        sqlx::query_as::<_, Item>(
            r#"
            UPDATE items SET label = COALESCE($1, label), cat_id = COALESCE($2, cat_id)
            WHERE item_id = $3
            RETURNING item_id, label, cat_id
            "#,
        )
        .bind(&update.label)
        .bind(update.cat_id)
        .bind(update.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update item", e))
    }

    async fn delete_item(&self, id: i32) -> Result<Option<Item>> {
        sqlx::query_as::<_, Item>(
            "DELETE FROM items WHERE item_id = $1 RETURNING item_id, label, cat_id",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to delete item", e))
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryCatalogStore;

#[cfg(any(test, feature = "test-utils"))]
mod memory {
    use super::*;
    use std::collections::BTreeMap;
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct Tables {
        categories: BTreeMap<i32, Category>,
        items: BTreeMap<i32, Item>,
        next_cat_id: i32,
        next_item_id: i32,
    }

    impl Tables {
        fn check_category(&self, cat_id: Option<i32>) -> Result<()> {
            match cat_id {
                Some(id) if !self.categories.contains_key(&id) => Err(
                    CatalogError::InvalidReference(format!("category {id} does not exist")),
                ),
                _ => Ok(()),
            }
        }
    }

    /// In-memory catalog store mirroring the PostgreSQL schema's constraints
    #[derive(Default)]
    pub struct MemoryCatalogStore {
        tables: RwLock<Tables>,
    }

    impl MemoryCatalogStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl CatalogRepository for MemoryCatalogStore {
        async fn create_category(&self, category: &NewCategory) -> Result<Category> {
            let mut tables = self.tables.write().await;
            tables.check_category(category.parent_cat_id)?;

            tables.next_cat_id += 1;
            let row = Category {
                cat_id: tables.next_cat_id,
                label: category.label.clone(),
                parent_cat_id: category.parent_cat_id,
            };
            tables.categories.insert(row.cat_id, row.clone());
            Ok(row)
        }

        async fn list_top_level_categories(&self) -> Result<Vec<Category>> {
            let tables = self.tables.read().await;
            Ok(tables
                .categories
                .values()
                .filter(|c| c.parent_cat_id.is_none())
                .cloned()
                .collect())
        }

        async fn list_categories(&self, parent_cat_id: Option<i32>) -> Result<Vec<Category>> {
            let tables = self.tables.read().await;
            Ok(tables
                .categories
                .values()
                .filter(|c| parent_cat_id.is_none() || c.parent_cat_id == parent_cat_id)
                .cloned()
                .collect())
        }

        async fn get_category(&self, id: i32) -> Result<Option<Category>> {
            Ok(self.tables.read().await.categories.get(&id).cloned())
        }

        async fn update_category(&self, update: &CategoryUpdate) -> Result<Option<Category>> {
            let mut tables = self.tables.write().await;
            if let Some(parent) = update.parent_cat_id {
                tables.check_category(parent)?;
            }

            let Some(row) = tables.categories.get_mut(&update.id) else {
                return Ok(None);
            };
            if let Some(label) = &update.label {
                row.label = label.clone();
            }
            if let Some(parent) = update.parent_cat_id {
                row.parent_cat_id = parent;
            }
            Ok(Some(row.clone()))
        }

        async fn delete_category(&self, id: i32) -> Result<Option<Category>> {
            let mut tables = self.tables.write().await;
            let removed = tables.categories.remove(&id);
            if removed.is_some() {
                // ON DELETE SET NULL
                for child in tables.categories.values_mut() {
                    if child.parent_cat_id == Some(id) {
                        child.parent_cat_id = None;
                    }
                }
                for item in tables.items.values_mut() {
                    if item.cat_id == Some(id) {
                        item.cat_id = None;
                    }
                }
            }
            Ok(removed)
        }

        async fn create_item(&self, item: &NewItem) -> Result<Item> {
            let mut tables = self.tables.write().await;
            tables.check_category(item.cat_id)?;

            tables.next_item_id += 1;
            let row = Item {
                item_id: tables.next_item_id,
                label: item.label.clone(),
                cat_id: item.cat_id,
            };
            tables.items.insert(row.item_id, row.clone());
            Ok(row)
        }

        async fn list_items(&self, cat_id: Option<i32>) -> Result<Vec<Item>> {
            let tables = self.tables.read().await;
            Ok(tables
                .items
                .values()
                .filter(|i| cat_id.is_none() || i.cat_id == cat_id)
                .cloned()
                .collect())
        }

        async fn get_item(&self, id: i32) -> Result<Option<Item>> {
            Ok(self.tables.read().await.items.get(&id).cloned())
        }

        async fn update_item(&self, update: &ItemUpdate) -> Result<Option<Item>> {
            let mut tables = self.tables.write().await;
            tables.check_category(update.cat_id)?;

            let Some(row) = tables.items.get_mut(&update.id) else {
                return Ok(None);
            };
            if let Some(label) = &update.label {
                row.label = label.clone();
            }
            if let Some(cat_id) = update.cat_id {
                row.cat_id = Some(cat_id);
            }
            Ok(Some(row.clone()))
        }

        async fn delete_item(&self, id: i32) -> Result<Option<Item>> {
            Ok(self.tables.write().await.items.remove(&id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_category(label: &str, parent_cat_id: Option<i32>) -> NewCategory {
        NewCategory {
            label: label.to_string(),
            parent_cat_id,
        }
    }

    #[tokio::test]
    async fn test_top_level_and_children() {
        let store = MemoryCatalogStore::new();
        let tools = store.create_category(&new_category("tools", None)).await.unwrap();
        let saws = store
            .create_category(&new_category("saws", Some(tools.cat_id)))
            .await
            .unwrap();

        let top = store.list_top_level_categories().await.unwrap();
        assert_eq!(top, vec![tools.clone()]);

        let children = store.list_categories(Some(tools.cat_id)).await.unwrap();
        assert_eq!(children, vec![saws]);

        assert_eq!(store.list_categories(None).await.unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let store = MemoryCatalogStore::new();
        let result = tokio_test::block_on(store.create_category(&new_category("orphan", Some(42))));
        assert!(matches!(result, Err(CatalogError::InvalidReference(_))));
    }

    #[tokio::test]
    async fn test_category_update_tri_state() {
        let store = MemoryCatalogStore::new();
        let root = store.create_category(&new_category("root", None)).await.unwrap();
        let leaf = store
            .create_category(&new_category("leaf", Some(root.cat_id)))
            .await
            .unwrap();

        // Absent parent keeps the link
        let updated = store
            .update_category(&CategoryUpdate {
                id: leaf.cat_id,
                label: Some("renamed".to_string()),
                parent_cat_id: None,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.label, "renamed");
        assert_eq!(updated.parent_cat_id, Some(root.cat_id));

        // Explicit null detaches, label untouched
        let updated = store
            .update_category(&CategoryUpdate {
                id: leaf.cat_id,
                label: None,
                parent_cat_id: Some(None),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.label, "renamed");
        assert_eq!(updated.parent_cat_id, None);
    }

    #[tokio::test]
    async fn test_delete_category_detaches_dependents() {
        let store = MemoryCatalogStore::new();
        let root = store.create_category(&new_category("root", None)).await.unwrap();
        let item = store
            .create_item(&NewItem {
                label: "nail".to_string(),
                cat_id: Some(root.cat_id),
            })
            .await
            .unwrap();

        let deleted = store.delete_category(root.cat_id).await.unwrap();
        assert_eq!(deleted, Some(root.clone()));
        assert_eq!(store.delete_category(root.cat_id).await.unwrap(), None);

        let item = store.get_item(item.item_id).await.unwrap().unwrap();
        assert_eq!(item.cat_id, None);
    }

    #[tokio::test]
    async fn test_item_update_keeps_absent_fields() {
        let store = MemoryCatalogStore::new();
        let cat = store.create_category(&new_category("c", None)).await.unwrap();
        let item = store
            .create_item(&NewItem {
                label: "drill".to_string(),
                cat_id: Some(cat.cat_id),
            })
            .await
            .unwrap();

        let updated = store
            .update_item(&ItemUpdate {
                id: item.item_id,
                label: Some("cordless drill".to_string()),
                cat_id: None,
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.label, "cordless drill");
        assert_eq!(updated.cat_id, Some(cat.cat_id));
        assert_eq!(store.list_items(Some(cat.cat_id)).await.unwrap().len(), 1);
        assert!(store
            .update_item(&ItemUpdate {
                id: 999,
                ..Default::default()
            })
            .await
            .unwrap()
            .is_none());
    }
}
