//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use dishdash_core::AuthProvider;

use crate::config::ServerConfig;
use crate::services::catalog::CatalogCache;
use crate::services::oauth::{OAuthClient, OAuthError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    catalog: CatalogCache,
    google: Option<OAuthClient>,
    facebook: Option<OAuthClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if an OAuth client cannot be built.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, OAuthError> {
        let google = config
            .google
            .as_ref()
            .map(|c| OAuthClient::new(AuthProvider::Google, c))
            .transpose()?;
        let facebook = config
            .facebook
            .as_ref()
            .map(|c| OAuthClient::new(AuthProvider::Facebook, c))
            .transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog: CatalogCache::new(),
                google,
                facebook,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the catalog cache.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    /// OAuth client for `provider`, if it is configured.
    #[must_use]
    pub fn oauth(&self, provider: AuthProvider) -> Option<&OAuthClient> {
        match provider {
            AuthProvider::Google => self.inner.google.as_ref(),
            AuthProvider::Facebook => self.inner.facebook.as_ref(),
            AuthProvider::Email => None,
        }
    }
}
