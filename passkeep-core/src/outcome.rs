//! Three-state outcome of an asynchronous operation.
//!
//! Every data-layer operation reports progress the same way: one
//! [`Outcome::Pending`] as soon as it starts, followed by exactly one
//! terminal [`Outcome::Ok`] or [`Outcome::Fail`]. [`track`] builds such a
//! sequence from any future returning a `Result`.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use passkeep_core::outcome::{track, Outcome};
//!
//! let mut outcomes = track(async { Ok::<_, std::io::Error>(42) });
//! assert_eq!(outcomes.next().await, Some(Outcome::Pending));
//! assert_eq!(outcomes.next().await, Some(Outcome::Ok(42)));
//! assert_eq!(outcomes.next().await, None);
//! ```

use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;
use std::future::Future;

/// Reason used when a failure carries no message of its own.
pub const NETWORK_ERROR_MESSAGE: &str = "network error";

/// Progress of an asynchronous operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation has started and has not finished.
    Pending,

    /// The operation finished with a value.
    Ok(T),

    /// The operation failed; the reason is human readable.
    Fail(String),
}

impl<T> Outcome<T> {
    /// Failure with the given reason.
    pub fn fail(reason: impl Into<String>) -> Self {
        Self::fail_or_default(Some(reason.into()))
    }

    /// Failure with the given reason, or the generic network message when
    /// the reason is missing or blank.
    pub fn fail_or_default(reason: Option<String>) -> Self {
        match reason {
            Some(reason) if !reason.trim().is_empty() => Self::Fail(reason),
            _ => Self::Fail(NETWORK_ERROR_MESSAGE.to_string()),
        }
    }

    /// Terminal outcome for a finished operation.
    pub fn from_result<E: fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::fail(e.to_string()),
        }
    }

    /// Whether this value ends the sequence.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Map the success value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Pending => Outcome::Pending,
            Self::Ok(value) => Outcome::Ok(f(value)),
            Self::Fail(reason) => Outcome::Fail(reason),
        }
    }

    /// The terminal result, or `None` while pending.
    pub fn into_result(self) -> Option<Result<T, String>> {
        match self {
            Self::Pending => None,
            Self::Ok(value) => Some(Ok(value)),
            Self::Fail(reason) => Some(Err(reason)),
        }
    }
}

/// Run `future` as an outcome sequence.
///
/// Yields `Pending` before the future is first polled, then exactly one
/// terminal value, then ends. Dropping the stream cancels the future.
pub fn track<T, E, F>(future: F) -> BoxStream<'static, Outcome<T>>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    stream::once(async { Outcome::Pending })
        .chain(stream::once(async move { Outcome::from_result(future.await) }))
        .boxed()
}
