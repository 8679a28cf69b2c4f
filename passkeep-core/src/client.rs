//! Wiring of the session subsystem from configuration.

use std::sync::Arc;

use crate::api::{ApiClient, HttpSessionApi};
use crate::config::ClientConfig;
use crate::coordinator::SessionCoordinator;
use crate::error::PasskeepError;
use crate::provider::ProviderRegistry;
use crate::store::SessionStore;
use crate::token_cache::TokenCache;

/// A fully wired session subsystem.
///
/// Owns one [`TokenCache`] shared by the authenticated [`ApiClient`] and the
/// [`SessionCoordinator`], so a login is visible to the very next request.
///
/// # Example
///
/// ```rust,ignore
/// use passkeep_core::{ClientConfig, MemorySessionStore, PasskeepClient, ProviderRegistry};
///
/// let client = PasskeepClient::new(
///     &ClientConfig::new("https://books.example.com/api/"),
///     Arc::new(MemorySessionStore::new()),
///     ProviderRegistry::new().with(Arc::new(google)),
/// )?;
/// client.prewarm().await?;
/// let events = client.coordinator().login(Provider::Google);
/// ```
#[derive(Clone)]
pub struct PasskeepClient {
    store: Arc<dyn SessionStore>,
    cache: Arc<TokenCache>,
    api: ApiClient,
    coordinator: SessionCoordinator,
}

impl PasskeepClient {
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn SessionStore>,
        providers: ProviderRegistry,
    ) -> Result<Self, PasskeepError> {
        config.validate()?;

        let cache = Arc::new(TokenCache::with_cold_load_timeout(
            store.clone(),
            config.cold_load_timeout(),
        ));
        let api = ApiClient::new(config, cache.clone())?;
        let session_api = Arc::new(HttpSessionApi::new(api.clone(), config.endpoints.clone()));
        let coordinator =
            SessionCoordinator::new(providers, session_api, store.clone(), cache.clone());

        tracing::debug!("Session subsystem ready against {}", api.base_url());

        Ok(Self {
            store,
            cache,
            api,
            coordinator,
        })
    }

    /// Load the token cache before the first request needs it.
    pub async fn prewarm(&self) -> Result<(), PasskeepError> {
        self.cache.prewarm().await?;
        Ok(())
    }

    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }

    /// Authenticated transport for business endpoints.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &Arc<TokenCache> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }
}

impl std::fmt::Debug for PasskeepClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasskeepClient")
            .field("api", &self.api)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
