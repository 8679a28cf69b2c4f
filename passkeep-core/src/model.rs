//! Domain model types for Passkeep.
//!
//! This module defines the core types used throughout Passkeep:
//! - [`Provider`] - Identity provider a user logs in with
//! - [`ProviderCredential`] - Credential issued by a provider after interactive login
//! - [`SocialCredential`] - Uniform outcome of an interactive provider login
//! - [`Session`] - Application session persisted after a successful exchange
//! - [`SessionKey`] - Keys under which a session is persisted

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::store::Secret;

/// Identity provider a user authenticates with.
///
/// The wire name (used in backend requests and storage) is lowercase.
///
/// # Examples
///
/// ```
/// use passkeep_core::Provider;
///
/// let provider: Provider = "KAKAO".parse().unwrap();
/// assert_eq!(provider, Provider::Kakao);
/// assert_eq!(provider.as_str(), "kakao");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Kakao,
    Naver,
}

impl Provider {
    /// All supported providers.
    pub const ALL: [Provider; 3] = [Provider::Google, Provider::Kakao, Provider::Naver];

    /// Get the provider's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Kakao => "kakao",
            Self::Naver => "naver",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "kakao" => Ok(Self::Kakao),
            "naver" => Ok(Self::Naver),
            other => Err(ParseError::UnknownProvider {
                name: other.to_string(),
            }),
        }
    }
}

/// Credential issued by an identity provider after a successful interactive login.
///
/// Carried forward unchanged into the backend exchange, or into a signup
/// operation when the identity is not yet registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredential {
    /// The provider that issued the credential.
    pub provider: Provider,

    /// The user's identifier at the provider.
    pub provider_id: String,

    /// The provider-issued access token.
    pub access_token: Secret,
}

impl ProviderCredential {
    /// Create a new provider credential.
    pub fn new(
        provider: Provider,
        provider_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            provider_id: provider_id.into(),
            access_token: Secret::new(access_token),
        }
    }
}

/// Uniform outcome of an interactive provider login.
///
/// Exactly one of the credential or the failure message exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocialCredential {
    /// The provider authenticated the user.
    Success(ProviderCredential),

    /// The user cancelled or the provider rejected the login.
    ///
    /// The message is whatever the provider supplied and may be empty.
    Failure { message: String },
}

impl SocialCredential {
    /// Create a failed credential result.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    /// Whether the login succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Key under which one field of a [`Session`] is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKey {
    /// Provider name.
    Provider,

    /// Application bearer token.
    Authorization,

    /// Application refresh token.
    RefreshToken,

    /// User display name.
    DisplayName,
}

impl SessionKey {
    /// All session keys, in persistence order.
    pub const ALL: [SessionKey; 4] = [
        SessionKey::Provider,
        SessionKey::Authorization,
        SessionKey::RefreshToken,
        SessionKey::DisplayName,
    ];

    /// Get the key as a string for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Authorization => "authorization",
            Self::RefreshToken => "refresh_token",
            Self::DisplayName => "display_name",
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Application session persisted after a successful login exchange.
///
/// A session is either fully present in storage or fully absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Provider the user logged in with.
    pub provider: Provider,

    /// Bearer token attached to authenticated requests.
    pub authorization: Secret,

    /// Refresh token issued by the backend (stored, never exchanged).
    pub refresh_token: Secret,

    /// Name shown to the user.
    pub display_name: String,
}

impl Session {
    /// Create a new session.
    pub fn new(
        provider: Provider,
        authorization: impl Into<String>,
        refresh_token: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            authorization: Secret::new(authorization),
            refresh_token: Secret::new(refresh_token),
            display_name: display_name.into(),
        }
    }

    /// Flatten the session into key/value pairs for a single atomic store write.
    pub fn to_entries(&self) -> Vec<(SessionKey, String)> {
        vec![
            (SessionKey::Provider, self.provider.as_str().to_string()),
            (
                SessionKey::Authorization,
                self.authorization.expose().to_string(),
            ),
            (
                SessionKey::RefreshToken,
                self.refresh_token.expose().to_string(),
            ),
            (SessionKey::DisplayName, self.display_name.clone()),
        ]
    }

    /// Rebuild a session from stored values.
    ///
    /// Returns `None` unless every field is present and the provider parses.
    pub fn from_lookup(mut lookup: impl FnMut(SessionKey) -> Option<String>) -> Option<Self> {
        let provider = lookup(SessionKey::Provider)?.parse().ok()?;
        let authorization = lookup(SessionKey::Authorization)?;
        let refresh_token = lookup(SessionKey::RefreshToken)?;
        let display_name = lookup(SessionKey::DisplayName)?;

        Some(Self::new(provider, authorization, refresh_token, display_name))
    }
}

/// Error parsing a model value.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unknown provider: '{name}'")]
    UnknownProvider { name: String },
}
