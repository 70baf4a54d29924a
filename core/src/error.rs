//! Error types for the Mautic API client.
//!
//! # Design
//! `TransportError` belongs to the transport layer and is carried into
//! `ApiError::Transport` untouched. Every other failure is a completed HTTP
//! exchange that did not produce what the caller asked for; `Service` holds
//! the human-readable message Mautic supplied whenever it supplied one.

use thiserror::Error;

/// The transport could not complete the HTTP exchange (DNS, connect, TLS,
/// reset). The message is the transport's own.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Errors returned by `MauticClient` and `MauticApi`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Username or password is blank. Raised before any network I/O.
    #[error("{0}")]
    Configuration(String),

    /// The transport failed; message propagated verbatim.
    #[error("{0}")]
    Transport(String),

    /// Mautic answered with an unexpected status. `message` is the service's
    /// `errors[0].message` when present, otherwise a generic description of
    /// the raw response.
    #[error("{message}")]
    Service { status: u16, message: String },

    /// A success response whose body could not be decoded.
    #[error("deserialization failed: {0}")]
    Decode(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Encode(String),
}

impl ApiError {
    pub(crate) fn missing_credentials() -> Self {
        ApiError::Configuration(
            "Mautic credentials are required to process an API request.".to_string(),
        )
    }

    /// HTTP status of the failed exchange, if one completed.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Service { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::Transport(err.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_is_carried_verbatim() {
        let err: ApiError = TransportError("connection refused".to_string()).into();
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn service_error_displays_message_only() {
        let err = ApiError::Service {
            status: 422,
            message: "Email already exists".to_string(),
        };
        assert_eq!(err.to_string(), "Email already exists");
        assert_eq!(err.status(), Some(422));
    }
}
