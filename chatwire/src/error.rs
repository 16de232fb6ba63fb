//! Internal error helpers for mapping HTTP/reqwest errors to [`TransportError`].

use std::time::Duration;

use chatwire_types::TransportError;

/// Map a non-success HTTP status and its body to a [`TransportError`].
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> TransportError {
    TransportError::Status {
        status: status.as_u16(),
        body: body.to_string(),
    }
}

/// Map a [`reqwest::Error`] to a [`TransportError`].
///
/// `timeout` is the configured limit that a timed-out request ran into, if
/// one was configured.
pub(crate) fn map_reqwest_error(err: reqwest::Error, timeout: Option<Duration>) -> TransportError {
    match timeout {
        Some(limit) if err.is_timeout() => TransportError::Timeout(limit),
        _ => TransportError::Network(Box::new(err)),
    }
}
