//! Error types for the storefront client.
//!
//! # Design
//! `NotFound` and `Unauthorized` get dedicated variants because callers
//! react to them differently from "the server returned an unexpected
//! status". All other non-2xx responses land in `Http` with the raw status,
//! the server's `message` field when it sent one, and the body for debugging.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by `HttpClient`, `StoreClient`, and `Storefront`.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server rejected the credential (401). The session has been cleared.
    #[error("authentication required")]
    Unauthorized,

    /// The request timed out, including its single retry.
    #[error("request timed out")]
    Timeout,

    /// The request never produced a response (DNS, refused connection, ...).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server returned a non-2xx status other than 401 and 404.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: String,
    },

    /// Input rejected before any request was built.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Classify a non-success status.
    ///
    /// The server reports failures as `{"message": "..."}`; when the body has
    /// no such field the raw body is used as the message.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => ApiError::Unauthorized,
            404 => ApiError::NotFound,
            _ => {
                let message = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| v.get("message")?.as_str().map(str::to_string))
                    .unwrap_or_else(|| body.to_string());
                ApiError::Http {
                    status,
                    message,
                    body: body.to_string(),
                }
            }
        }
    }
}

/// Failures below the HTTP layer, reported by a `Transport`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Errors raised while reading `ClientConfig` from the environment.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("timeout must be non-zero, got {0:?}")]
    ZeroTimeout(Duration),
}
