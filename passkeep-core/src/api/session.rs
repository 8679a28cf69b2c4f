use async_trait::async_trait;
use reqwest::Response;
use serde::{Deserialize, Serialize};

use super::{ApiClient, ApiError};
use crate::config::Endpoints;
use crate::model::{Provider, ProviderCredential, Session};

/// Backend endpoints that create and end application sessions.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Ask whether the provider identity already has an account.
    async fn check_registration(&self, credential: &ProviderCredential) -> Result<bool, ApiError>;

    /// Exchange a provider credential for an application session.
    async fn exchange(&self, credential: &ProviderCredential) -> Result<Session, ApiError>;

    /// Register a new account for the provider identity and open a session.
    async fn signup(
        &self,
        credential: &ProviderCredential,
        display_name: &str,
    ) -> Result<Session, ApiError>;

    /// End the server-side session. Idempotent on the backend.
    async fn logout(&self) -> Result<(), ApiError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckRequest<'a> {
    provider: Provider,
    provider_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    registered: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRequest<'a> {
    provider: Provider,
    token: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequest<'a> {
    provider: Provider,
    token: &'a str,
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    display_name: String,
}

/// [`SessionApi`] over HTTP.
///
/// Session responses carry the application tokens in headers (names from
/// [`Endpoints`]) and the display name in a JSON body.
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    client: ApiClient,
    endpoints: Endpoints,
}

impl HttpSessionApi {
    pub fn new(client: ApiClient, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    async fn into_session(
        &self,
        provider: Provider,
        response: Response,
    ) -> Result<Session, ApiError> {
        let authorization = header_value(&response, &self.endpoints.authorization_header)
            .map(|value| strip_bearer(&value).to_string())
            .filter(|token| !token.is_empty());
        let refresh_token = header_value(&response, &self.endpoints.refresh_token_header);

        let (Some(authorization), Some(refresh_token)) = (authorization, refresh_token) else {
            tracing::warn!("Session response from {} is missing token headers", response.url());
            return Err(ApiError::TokensMissing);
        };

        let body: SessionResponse = response.json().await?;
        Ok(Session::new(
            provider,
            authorization,
            refresh_token,
            body.display_name,
        ))
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn check_registration(&self, credential: &ProviderCredential) -> Result<bool, ApiError> {
        let request = CheckRequest {
            provider: credential.provider,
            provider_id: &credential.provider_id,
        };
        let response = self.client.post_json(&self.endpoints.check, &request).await?;
        let body: CheckResponse = response.json().await?;
        Ok(body.registered)
    }

    async fn exchange(&self, credential: &ProviderCredential) -> Result<Session, ApiError> {
        let request = ExchangeRequest {
            provider: credential.provider,
            token: credential.access_token.expose(),
        };
        let response = self.client.post_json(&self.endpoints.login, &request).await?;
        self.into_session(credential.provider, response).await
    }

    async fn signup(
        &self,
        credential: &ProviderCredential,
        display_name: &str,
    ) -> Result<Session, ApiError> {
        let request = SignupRequest {
            provider: credential.provider,
            token: credential.access_token.expose(),
            display_name,
        };
        let response = self.client.post_json(&self.endpoints.signup, &request).await?;
        self.into_session(credential.provider, response).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.client.post_empty(&self.endpoints.logout).await?;
        Ok(())
    }
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Drop a leading `Bearer` scheme. A bare scheme yields an empty token.
fn strip_bearer(value: &str) -> &str {
    let value = value.trim();
    match value.split_once(char::is_whitespace) {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        None if value.eq_ignore_ascii_case("bearer") => "",
        _ => value,
    }
}
