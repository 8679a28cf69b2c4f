//! # Passkeep Core
//!
//! Session and authentication subsystem for Passkeep clients.
//!
//! This crate provides:
//! - Domain types for providers, credentials and sessions
//! - A session store trait with memory, file and (optionally) keyring backends
//! - A token cache that lets every outgoing request carry the bearer token
//!   without waiting on storage
//! - An authenticated HTTP transport with a no-retry 401 policy
//! - A coordinator for login, signup and logout, reported as event streams
//! - [`Outcome`] sequences for multi-stage asynchronous results
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use passkeep_core::{ClientConfig, FileSessionStore, PasskeepClient, Provider, SessionEvent};
//!
//! async fn login(registry: passkeep_core::ProviderRegistry) -> Result<(), passkeep_core::PasskeepError> {
//!     let store = Arc::new(FileSessionStore::open(FileSessionStore::default_path()?)?);
//!     let client = PasskeepClient::new(&ClientConfig::new("https://books.example.com/api/"), store, registry)?;
//!     client.prewarm().await?;
//!
//!     let mut events = client.coordinator().login(Provider::Google);
//!     while let Some(event) = events.next().await {
//!         if let SessionEvent::Failed { reason } = event {
//!             eprintln!("login failed: {reason}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod authenticator;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod outcome;
pub mod provider;
pub mod store;
pub mod token_cache;

// Re-export commonly used types at crate root
pub use model::{
    ParseError,
    Provider,
    ProviderCredential,
    Session,
    SessionKey,
    SocialCredential,
};

pub use store::{
    FileSessionStore,
    MemorySessionStore,
    Secret,
    SessionStore,
    StoreBackend,
    StoreError,
    create_store,
};

#[cfg(feature = "keyring-store")]
pub use store::KeyringSessionStore;

pub use token_cache::{CachedToken, TokenCache};

pub use authenticator::{FailureHandler, RequestAuthenticator, RetryDecision, UnauthorizedNotice};

pub use api::{ApiClient, ApiError, HttpSessionApi, SessionApi};

pub use config::{ClientConfig, Endpoints};

pub use coordinator::{SessionCoordinator, SessionEvent};

pub use outcome::{Outcome, track};

pub use provider::{CallbackProvider, CredentialProvider, LoginSdk, ProviderRegistry};

pub use client::PasskeepClient;

pub use error::PasskeepError;
