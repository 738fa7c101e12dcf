//! Credential store for identity records
//!
//! This module provides the database access layer for the `users` table:
//! - Lookups by username, by username-or-email and by id
//! - Insertion of new identities
//! - Listing for the protected `/users` endpoint
//!
//! Uniqueness of `username` and `email` is enforced by the table's UNIQUE
//! constraints. A constraint violation on insert surfaces as
//! [`RepositoryError::Duplicate`], the same outcome as a lookup hit.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use utoipa::ToSchema;

/// Default role tag for self-registered identities
pub const DEFAULT_USERTYPE: i32 = 1;

/// Default privilege tag for self-registered identities
pub const DEFAULT_ADMINTYPE: i32 = 0;

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Username or email already exists")]
    Duplicate,
}

/// Stored identity record
///
/// The password is only ever present as its salted hash.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Identity {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub usertype: i32,
    pub admintype: i32,
}

/// Values for a new identity row
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub usertype: i32,
    pub admintype: i32,
}

/// Identity as exposed by the API (never includes the password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserPublic {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub usertype: i32,
    pub admintype: i32,
}

impl From<Identity> for UserPublic {
    fn from(identity: Identity) -> Self {
        Self {
            user_id: identity.user_id,
            username: identity.username,
            email: identity.email,
            usertype: identity.usertype,
            admintype: identity.admintype,
        }
    }
}

/// Trait for identity persistence
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Any identity whose username OR email matches
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<Identity>, RepositoryError>;

    /// Identity with exactly this username
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, RepositoryError>;

    /// Identity with this id
    async fn find_by_id(&self, user_id: i32) -> Result<Option<Identity>, RepositoryError>;

    /// Insert a new identity, returning the stored row
    async fn insert(&self, identity: &NewIdentity) -> Result<Identity, RepositoryError>;

    /// All identities ordered by id
    async fn list(&self) -> Result<Vec<Identity>, RepositoryError>;
}

/// PostgreSQL credential store
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(context: &str, err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::Duplicate;
        }
    }
    RepositoryError::DatabaseError(format!("{context}: {err}"))
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<Identity>, RepositoryError> {
        sqlx::query_as::<_, Identity>(
            r#"
            SELECT user_id, username, email, password_hash, usertype, admintype
            FROM users
            WHERE username = $1 OR email = $2
            LIMIT 1
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to check existing user", e))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, RepositoryError> {
        sqlx::query_as::<_, Identity>(
            r#"
            SELECT user_id, username, email, password_hash, usertype, admintype
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch user", e))
    }

    async fn find_by_id(&self, user_id: i32) -> Result<Option<Identity>, RepositoryError> {
        sqlx::query_as::<_, Identity>(
            r#"
            SELECT user_id, username, email, password_hash, usertype, admintype
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch user", e))
    }

    async fn insert(&self, identity: &NewIdentity) -> Result<Identity, RepositoryError> {
        sqlx::query_as::<_, Identity>(
            r#"
            INSERT INTO users (email, username, password_hash, usertype, admintype)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING user_id, username, email, password_hash, usertype, admintype
            "#,
        )
        .bind(&identity.email)
        .bind(&identity.username)
        .bind(&identity.password_hash)
        .bind(identity.usertype)
        .bind(identity.admintype)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create user", e))
    }

    async fn list(&self) -> Result<Vec<Identity>, RepositoryError> {
        sqlx::query_as::<_, Identity>(
            r#"
            SELECT user_id, username, email, password_hash, usertype, admintype
            FROM users
            ORDER BY user_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list users", e))
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryCredentialStore;

#[cfg(any(test, feature = "test-utils"))]
mod memory {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct Users {
        rows: BTreeMap<i32, Identity>,
        next_id: i32,
    }

    /// In-memory credential store with the same UNIQUE semantics as the table
    #[derive(Default)]
    pub struct MemoryCredentialStore {
        users: RwLock<Users>,
        unavailable: AtomicBool,
    }

    impl MemoryCredentialStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent call fail with a database error
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        /// Remove an identity out-of-band
        pub async fn remove(&self, user_id: i32) -> Option<Identity> {
            self.users.write().await.rows.remove(&user_id)
        }

        /// Number of stored identities
        pub async fn len(&self) -> usize {
            self.users.read().await.rows.len()
        }

        pub async fn is_empty(&self) -> bool {
            self.len().await == 0
        }

        fn check_available(&self) -> Result<(), RepositoryError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(RepositoryError::DatabaseError(
                    "connection refused".to_string(),
                ));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CredentialStore for MemoryCredentialStore {
        async fn find_by_username_or_email(
            &self,
            username: &str,
            email: &str,
        ) -> Result<Option<Identity>, RepositoryError> {
            self.check_available()?;
            let users = self.users.read().await;
            Ok(users
                .rows
                .values()
                .find(|u| u.username == username || u.email == email)
                .cloned())
        }

        async fn find_by_username(
            &self,
            username: &str,
        ) -> Result<Option<Identity>, RepositoryError> {
            self.check_available()?;
            let users = self.users.read().await;
            Ok(users.rows.values().find(|u| u.username == username).cloned())
        }

        async fn find_by_id(&self, user_id: i32) -> Result<Option<Identity>, RepositoryError> {
            self.check_available()?;
            Ok(self.users.read().await.rows.get(&user_id).cloned())
        }

        async fn insert(&self, identity: &NewIdentity) -> Result<Identity, RepositoryError> {
            self.check_available()?;
            let mut users = self.users.write().await;
            if users
                .rows
                .values()
                .any(|u| u.username == identity.username || u.email == identity.email)
            {
                return Err(RepositoryError::Duplicate);
            }

            users.next_id += 1;
            let row = Identity {
                user_id: users.next_id,
                username: identity.username.clone(),
                email: identity.email.clone(),
                password_hash: identity.password_hash.clone(),
                usertype: identity.usertype,
                admintype: identity.admintype,
            };
            users.rows.insert(row.user_id, row.clone());
            Ok(row)
        }

        async fn list(&self) -> Result<Vec<Identity>, RepositoryError> {
            self.check_available()?;
            Ok(self.users.read().await.rows.values().cloned().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_identity(username: &str, email: &str) -> NewIdentity {
        NewIdentity {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            usertype: DEFAULT_USERTYPE,
            admintype: DEFAULT_ADMINTYPE,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = MemoryCredentialStore::new();
        let created = store.insert(&new_identity("alice1", "a@x.com")).await.unwrap();

        assert_eq!(created.user_id, 1);
        assert_eq!(
            store.find_by_username("alice1").await.unwrap(),
            Some(created.clone())
        );
        assert_eq!(store.find_by_id(1).await.unwrap(), Some(created.clone()));
        assert_eq!(
            store
                .find_by_username_or_email("nobody", "a@x.com")
                .await
                .unwrap(),
            Some(created)
        );
        assert_eq!(store.find_by_username("bob123").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unique_constraints() {
        let store = MemoryCredentialStore::new();
        store.insert(&new_identity("alice1", "a@x.com")).await.unwrap();

        assert!(matches!(
            store.insert(&new_identity("alice1", "other@x.com")).await,
            Err(RepositoryError::Duplicate)
        ));
        assert!(matches!(
            store.insert(&new_identity("other1", "a@x.com")).await,
            Err(RepositoryError::Duplicate)
        ));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = MemoryCredentialStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.find_by_id(1).await,
            Err(RepositoryError::DatabaseError(_))
        ));
    }

    #[test]
    fn test_public_view_drops_hash() {
        let identity = Identity {
            user_id: 9,
            username: "alice1".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            usertype: 1,
            admintype: 0,
        };

        let json = serde_json::to_string(&UserPublic::from(identity)).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains("alice1"));
    }
}
