//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::auth::jwt::JwtConfig;
use crate::auth::password::PasswordConfig;
use crate::auth::repository::CredentialStore;
use crate::auth::service::AuthService;
use crate::middleware::Metrics;
use catalog_core::config::AppConfig;
use catalog_core::CatalogRepository;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Signup, signin and session admission
    pub auth: AuthService,
    /// Identity records, also listed by `/users`
    pub users: Arc<dyn CredentialStore>,
    /// Categories and items
    pub catalog: Arc<dyn CatalogRepository>,
    /// Prometheus collectors
    pub metrics: Metrics,
}

impl AppState {
    /// Create application state over the given stores
    pub fn new(
        config: AppConfig,
        users: Arc<dyn CredentialStore>,
        catalog: Arc<dyn CatalogRepository>,
        password_config: PasswordConfig,
    ) -> Result<Self, prometheus::Error> {
        let auth = AuthService::new(
            users.clone(),
            JwtConfig::from(&config.auth),
            password_config,
        );

        Ok(Self {
            config,
            start_time: Instant::now(),
            auth,
            users,
            catalog,
            metrics: Metrics::new()?,
        })
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl AppState {
    /// State over fresh in-memory stores with cheap password hashing
    pub fn for_testing(jwt_secret: &str) -> Self {
        use crate::auth::repository::MemoryCredentialStore;
        use catalog_core::MemoryCatalogStore;

        Self::for_testing_with(
            jwt_secret,
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemoryCatalogStore::new()),
        )
    }

    /// State over caller-provided stores
    pub fn for_testing_with(
        jwt_secret: &str,
        users: Arc<dyn CredentialStore>,
        catalog: Arc<dyn CatalogRepository>,
    ) -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = jwt_secret.to_string();

        Self::new(config, users, catalog, PasswordConfig::fast_for_tests())
            .expect("fresh registry accepts the catalog collectors")
    }
}
