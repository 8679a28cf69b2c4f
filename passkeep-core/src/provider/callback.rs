//! Adapter from callback-style provider SDKs to [`CredentialProvider`].
//!
//! Provider SDKs report login results through callbacks with separate
//! success, cancel and error branches. [`CallbackProvider`] hands the SDK a
//! one-shot [`LoginCallback`] and awaits whichever branch fires. This is the
//! only place that deals with callback plumbing.

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::CredentialProvider;
use crate::model::{Provider, ProviderCredential, SocialCredential};

/// Failure message when an SDK drops its callback without calling it.
pub const ABANDONED_MESSAGE: &str = "login was abandoned";

/// A provider SDK that reports results through callbacks.
///
/// Implementations may call back from any thread, synchronously or later.
pub trait LoginSdk: Send + Sync {
    /// Start the interactive login and eventually fire `callback`.
    fn start_login(&self, callback: LoginCallback);

    /// Start the provider-side logout and eventually fire `callback`.
    fn start_logout(&self, callback: LogoutCallback);
}

/// Single-use login callback. Each branch consumes it.
#[derive(Debug)]
pub struct LoginCallback {
    provider: Provider,
    tx: oneshot::Sender<SocialCredential>,
}

impl LoginCallback {
    /// The user authenticated.
    pub fn success(self, provider_id: impl Into<String>, access_token: impl Into<String>) {
        let credential = ProviderCredential::new(self.provider, provider_id, access_token);
        self.complete(SocialCredential::Success(credential));
    }

    /// The user dismissed the provider UI.
    pub fn cancelled(self) {
        self.complete(SocialCredential::failure("cancelled"));
    }

    /// The provider reported an error.
    pub fn error(self, message: impl Into<String>) {
        self.complete(SocialCredential::failure(message));
    }

    fn complete(self, credential: SocialCredential) {
        if self.tx.send(credential).is_err() {
            tracing::debug!("{} login finished after the caller stopped waiting", self.provider);
        }
    }
}

/// Single-use logout callback.
#[derive(Debug)]
pub struct LogoutCallback {
    tx: oneshot::Sender<bool>,
}

impl LogoutCallback {
    /// Report whether the provider-side logout succeeded.
    pub fn complete(self, succeeded: bool) {
        let _ = self.tx.send(succeeded);
    }
}

/// [`CredentialProvider`] over a callback-style [`LoginSdk`].
#[derive(Debug)]
pub struct CallbackProvider<S> {
    provider: Provider,
    sdk: S,
}

impl<S: LoginSdk> CallbackProvider<S> {
    pub fn new(provider: Provider, sdk: S) -> Self {
        Self { provider, sdk }
    }
}

#[async_trait]
impl<S: LoginSdk> CredentialProvider for CallbackProvider<S> {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn login(&self) -> SocialCredential {
        let (tx, rx) = oneshot::channel();
        self.sdk.start_login(LoginCallback {
            provider: self.provider,
            tx,
        });

        rx.await
            .unwrap_or_else(|_| SocialCredential::failure(ABANDONED_MESSAGE))
    }

    async fn logout(&self) -> bool {
        let (tx, rx) = oneshot::channel();
        self.sdk.start_logout(LogoutCallback { tx });

        rx.await.unwrap_or(false)
    }
}
