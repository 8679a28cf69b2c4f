//! Non-interactive credential providers for the command line.
//!
//! A terminal cannot show provider login UI, so the CLI takes the provider's
//! credential from the environment: `PASSKEEP_<PROVIDER>_TOKEN` and
//! `PASSKEEP_<PROVIDER>_ID`.

use async_trait::async_trait;
use passkeep_core::{
    CredentialProvider, Provider, ProviderCredential, ProviderRegistry, SocialCredential,
};
use std::sync::Arc;
use tracing::debug;

/// Default environment variable prefix.
pub const ENV_PREFIX: &str = "PASSKEEP";

/// Credential provider reading a provider token from environment variables.
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    provider: Provider,
    prefix: String,
}

impl EnvCredentialProvider {
    pub fn new(provider: Provider) -> Self {
        Self::with_prefix(provider, ENV_PREFIX)
    }

    pub fn with_prefix(provider: Provider, prefix: impl Into<String>) -> Self {
        Self {
            provider,
            prefix: prefix.into(),
        }
    }

    fn env_var(&self, suffix: &str) -> String {
        format!(
            "{}_{}_{}",
            self.prefix,
            self.provider.as_str().to_uppercase(),
            suffix
        )
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn login(&self) -> SocialCredential {
        let token_var = self.env_var("TOKEN");
        let id_var = self.env_var("ID");
        debug!("looking for env vars: {}, {}", token_var, id_var);

        match (std::env::var(&token_var), std::env::var(&id_var)) {
            (Ok(token), Ok(id)) if !token.is_empty() && !id.is_empty() => {
                SocialCredential::Success(ProviderCredential::new(self.provider, id, token))
            }
            _ => SocialCredential::failure(format!(
                "no {} credential: set {} and {}",
                self.provider, token_var, id_var
            )),
        }
    }

    async fn logout(&self) -> bool {
        // Nothing is held provider-side
        true
    }
}

/// Registry with an environment provider for every [`Provider`].
pub fn env_registry() -> ProviderRegistry {
    Provider::ALL
        .into_iter()
        .fold(ProviderRegistry::new(), |registry, provider| {
            registry.with(Arc::new(EnvCredentialProvider::new(provider)))
        })
}
