//! Top-level error types for Passkeep.

use thiserror::Error;

use crate::api::ApiError;
use crate::model::ParseError;
use crate::store::StoreError;

/// Top-level error type encompassing all Passkeep errors.
#[derive(Debug, Error)]
pub enum PasskeepError {
    /// Error from session storage operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error talking to the backend.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Error parsing user input.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Invalid client configuration.
    #[error("configuration error: {message}")]
    Config { message: String },
}
