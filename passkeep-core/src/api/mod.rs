//! Backend access.
//!
//! This module provides:
//! - [`ApiError`] - Classified transport and backend failures
//! - [`ApiClient`] - Authenticated HTTP transport
//! - [`SessionApi`] - Backend session endpoints, with [`HttpSessionApi`] over HTTP

use reqwest::StatusCode;
use thiserror::Error;

mod client;
mod session;

pub use client::ApiClient;
pub use session::{HttpSessionApi, SessionApi};

/// Error type for backend calls.
///
/// The `Display` output is the user-facing message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request")]
    BadRequest,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("server error")]
    Server { status: u16 },

    /// Any other non-success status.
    #[error("unexpected response (status {status})")]
    Unexpected { status: u16 },

    /// No response was received.
    #[error("network error")]
    Network { message: String },

    /// A session response lacked one of the token headers.
    #[error("tokens missing")]
    TokensMissing,

    /// The response body could not be decoded.
    #[error("invalid response body: {message}")]
    Decode { message: String },

    /// An endpoint URL could not be built.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Classify a non-success status.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => Self::BadRequest,
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden,
            StatusCode::NOT_FOUND => Self::NotFound,
            s if s.is_server_error() => Self::Server { status: s.as_u16() },
            s => Self::Unexpected { status: s.as_u16() },
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode {
                message: e.to_string(),
            }
        } else if let Some(status) = e.status() {
            Self::from_status(status)
        } else {
            Self::Network {
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification_messages() {
        let cases = [
            (400, "bad request"),
            (401, "unauthorized"),
            (403, "forbidden"),
            (404, "not found"),
            (500, "server error"),
            (503, "server error"),
            (418, "unexpected response (status 418)"),
        ];

        for (code, message) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(ApiError::from_status(status).user_message(), message);
        }
    }

    #[test]
    fn test_network_error_hides_transport_detail() {
        let err = ApiError::Network {
            message: "connection refused".to_string(),
        };
        assert_eq!(err.user_message(), "network error");
    }
}
