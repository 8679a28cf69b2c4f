//! Identity provider abstraction and registry.
//!
//! This module provides:
//! - [`CredentialProvider`] - Interactive login/logout against one identity provider
//! - [`ProviderRegistry`] - Registry of configured credential providers
//! - [`CallbackProvider`] - Adapter for callback-style provider SDKs
//!
//! Provider SDKs are black boxes; whatever they do interactively, they hand
//! back a uniform [`SocialCredential`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{Provider, SocialCredential};

mod callback;

pub use callback::{CallbackProvider, LoginCallback, LoginSdk, LogoutCallback, ABANDONED_MESSAGE};

/// Interactive login against a single identity provider.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// The provider this implementation talks to.
    fn provider(&self) -> Provider;

    /// Run the provider's login flow. May show provider UI.
    async fn login(&self) -> SocialCredential;

    /// Log out at the provider. Best effort; returns whether it succeeded.
    async fn logout(&self) -> bool;
}

/// Registry of credential providers, one per [`Provider`].
///
/// # Example
///
/// ```rust,ignore
/// use passkeep_core::provider::ProviderRegistry;
///
/// let registry = ProviderRegistry::new()
///     .with(Arc::new(google))
///     .with(Arc::new(kakao));
///
/// assert!(registry.contains(Provider::Google));
/// ```
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<Provider, Arc<dyn CredentialProvider>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, builder style.
    pub fn with(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Register a provider.
    ///
    /// Replaces and returns any provider already registered for the same
    /// [`Provider`].
    pub fn register(
        &mut self,
        provider: Arc<dyn CredentialProvider>,
    ) -> Option<Arc<dyn CredentialProvider>> {
        self.providers.insert(provider.provider(), provider)
    }

    /// Get the credential provider for `provider`.
    pub fn get(&self, provider: Provider) -> Option<Arc<dyn CredentialProvider>> {
        self.providers.get(&provider).cloned()
    }

    /// Check if a provider is registered.
    pub fn contains(&self, provider: Provider) -> bool {
        self.providers.contains_key(&provider)
    }

    /// Registered providers, in declaration order.
    pub fn providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.providers.contains_key(p))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}
