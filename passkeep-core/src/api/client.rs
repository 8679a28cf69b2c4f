use futures::stream::BoxStream;
use reqwest::{Request, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

use super::ApiError;
use crate::authenticator::{FailureHandler, RequestAuthenticator, RetryDecision};
use crate::config::ClientConfig;
use crate::outcome::{Outcome, track};
use crate::token_cache::TokenCache;

/// Authenticated HTTP transport.
///
/// Every request passes through [`RequestAuthenticator::decorate`] and is
/// sent exactly once. A `401` is handed to the [`FailureHandler`], which
/// never asks for a retry.
///
/// # Example
///
/// ```rust,ignore
/// use passkeep_core::{ApiClient, ClientConfig, TokenCache};
///
/// let client = ApiClient::new(&ClientConfig::new("https://books.example.com/api/"), cache)?;
/// let shelves: serde_json::Value = client.get_json("library/shelves").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    authenticator: RequestAuthenticator,
    failures: FailureHandler,
}

impl ApiClient {
    /// Build a client from configuration.
    pub fn new(config: &ClientConfig, cache: Arc<TokenCache>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Self::with_http_client(http, &config.base_url, cache)
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn with_http_client(
        http: reqwest::Client,
        base_url: &str,
        cache: Arc<TokenCache>,
    ) -> Result<Self, ApiError> {
        // Url::join drops the last segment unless the base ends in '/'
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        Ok(Self {
            http,
            base_url,
            authenticator: RequestAuthenticator::new(cache),
            failures: FailureHandler::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The 401 policy, for subscribing to unauthorized notices.
    pub fn failures(&self) -> &FailureHandler {
        &self.failures
    }

    /// Resolve `path` against the base URL.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Decorate and send a request once.
    ///
    /// Non-success statuses are classified into [`ApiError`].
    pub async fn execute(&self, mut request: Request) -> Result<Response, ApiError> {
        self.authenticator.decorate(&mut request);
        tracing::debug!("{} {}", request.method(), request.url());

        let response = self.http.execute(request).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return match self.failures.on_unauthorized(&response) {
                RetryDecision::GiveUp => Err(ApiError::Unauthorized),
            };
        }
        if !status.is_success() {
            tracing::debug!("{} answered {}", response.url(), status);
            return Err(ApiError::from_status(status));
        }

        Ok(response)
    }

    /// `GET` a JSON document.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.http.get(self.url(path)?).build()?;
        let response = self.execute(request).await?;
        Ok(response.json().await?)
    }

    /// `POST` a JSON body.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, ApiError> {
        let request = self.http.post(self.url(path)?).json(body).build()?;
        self.execute(request).await
    }

    /// `POST` without a body.
    pub async fn post_empty(&self, path: &str) -> Result<Response, ApiError> {
        let request = self.http.post(self.url(path)?).build()?;
        self.execute(request).await
    }

    /// `GET` a JSON document as an outcome sequence.
    pub fn fetch<T>(&self, path: &str) -> BoxStream<'static, Outcome<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let client = self.clone();
        let path = path.to_string();
        track(async move { client.get_json::<T>(&path).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySessionStore;

    fn client(base: &str) -> ApiClient {
        let cache = Arc::new(TokenCache::new(Arc::new(MemorySessionStore::new())));
        ApiClient::with_http_client(reqwest::Client::new(), base, cache).unwrap()
    }

    #[test]
    fn test_url_keeps_base_path() {
        let client = client("https://books.example.com/api");
        assert_eq!(
            client.url("/auth/login").unwrap().as_str(),
            "https://books.example.com/api/auth/login"
        );
        assert_eq!(
            client.url("library").unwrap().as_str(),
            "https://books.example.com/api/library"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let cache = Arc::new(TokenCache::new(Arc::new(MemorySessionStore::new())));
        let result = ApiClient::with_http_client(reqwest::Client::new(), "not a url", cache);
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }
}
