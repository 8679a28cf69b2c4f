//! Transport hooks: bearer decoration and the 401 policy.
//!
//! - [`RequestAuthenticator`] attaches `Authorization: Bearer <token>` to
//!   outgoing requests when the [`TokenCache`] holds a token.
//! - [`FailureHandler`] decides what happens after a `401 Unauthorized`.
//!   There is no refresh-token exchange: the answer is always
//!   [`RetryDecision::GiveUp`] and the user must log in again.

use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Request, Response};
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::broadcast;
use url::Url;

use crate::store::Secret;
use crate::token_cache::TokenCache;

/// Decorates outgoing requests with the cached bearer token.
#[derive(Debug, Clone)]
pub struct RequestAuthenticator {
    cache: Arc<TokenCache>,
}

impl RequestAuthenticator {
    pub fn new(cache: Arc<TokenCache>) -> Self {
        Self { cache }
    }

    /// Attach the bearer token, if any, to `request`.
    ///
    /// Never performs network I/O. A cold cache is loaded synchronously
    /// (bounded); inside a multi-threaded runtime the load runs under
    /// `block_in_place` so other tasks keep running.
    pub fn decorate(&self, request: &mut Request) {
        let Some(token) = self.current_token() else {
            tracing::trace!("No session token, sending {} unauthenticated", request.url());
            return;
        };

        match HeaderValue::from_str(&format!("Bearer {}", token.expose())) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(e) => {
                tracing::warn!("Session token is not a valid header value, not attaching it: {}", e);
            }
        }
    }

    fn current_token(&self) -> Option<Secret> {
        let multi_threaded = Handle::try_current()
            .map(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
            .unwrap_or(false);

        if multi_threaded && !self.cache.is_warm() {
            tokio::task::block_in_place(|| self.cache.get_token())
        } else {
            self.cache.get_token()
        }
    }
}

/// What the transport should do after an unauthorized response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Surface the failure; the caller re-authenticates interactively.
    GiveUp,
}

/// Published whenever the backend rejects the session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedNotice {
    /// The request that was rejected.
    pub url: Url,

    /// When the rejection was observed.
    pub at: DateTime<Utc>,
}

/// Policy for `401 Unauthorized` responses.
///
/// Never retries. Each rejection is broadcast so UI code can prompt the
/// user to log in again.
#[derive(Debug, Clone)]
pub struct FailureHandler {
    notices: broadcast::Sender<UnauthorizedNotice>,
}

impl FailureHandler {
    const NOTICE_CAPACITY: usize = 16;

    pub fn new() -> Self {
        let (notices, _rx) = broadcast::channel(Self::NOTICE_CAPACITY);
        Self { notices }
    }

    /// Subscribe to unauthorized notices.
    pub fn subscribe(&self) -> broadcast::Receiver<UnauthorizedNotice> {
        self.notices.subscribe()
    }

    /// Handle a `401` response.
    pub fn on_unauthorized(&self, response: &Response) -> RetryDecision {
        tracing::warn!(
            "Backend rejected session for {}; not retrying, re-authentication required",
            response.url()
        );

        // No subscribers is fine
        let _ = self.notices.send(UnauthorizedNotice {
            url: response.url().clone(),
            at: Utc::now(),
        });

        RetryDecision::GiveUp
    }
}

impl Default for FailureHandler {
    fn default() -> Self {
        Self::new()
    }
}
