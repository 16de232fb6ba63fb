//! Error types for the streaming pipeline.

use std::time::Duration;

/// Failures of the request or of the byte stream underneath a session.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("http status {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body, as far as it could be read.
        body: String,
    },
    /// Network-level error (connection reset, DNS failure, etc.).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The request or a body read timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

/// The byte stream was not valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// An invalid byte sequence appeared in the stream.
    #[error("invalid utf-8 sequence at byte {offset} of the stream")]
    InvalidSequence {
        /// Stream offset of the first invalid byte.
        offset: usize,
    },
    /// The stream ended inside a multi-byte sequence.
    #[error("stream ended inside a utf-8 sequence ({pending} bytes pending)")]
    Truncated {
        /// Number of bytes of the unfinished sequence.
        pending: usize,
    },
}

/// Fatal session errors, plus the expected abort signal.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The request could not be issued or the body could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The body was not valid UTF-8.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    /// A frame grew past the configured limit without a line terminator.
    #[error("frame too large: {buffered} bytes buffered, limit is {limit}")]
    FrameTooLarge {
        /// The configured maximum frame size in bytes.
        limit: usize,
        /// How many bytes were buffered when the limit tripped.
        buffered: usize,
    },
    /// The caller aborted the session. Not a failure.
    #[error("aborted")]
    Aborted,
}

impl StreamError {
    /// Whether this error was caused by the caller aborting the session.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Whether this error ends the session as `Errored`.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_abort()
    }
}

/// A single frame could not be decoded as an event. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unparseable frame ({reason}): {preview}")]
pub struct ParseError {
    /// What the JSON decoder reported.
    pub reason: String,
    /// The start of the offending payload, for logs.
    pub preview: String,
}

impl ParseError {
    const PREVIEW_CHARS: usize = 64;

    /// Build a parse error for `payload`, keeping a short preview of it.
    pub fn new(reason: impl Into<String>, payload: &str) -> Self {
        Self {
            reason: reason.into(),
            preview: payload.chars().take(Self::PREVIEW_CHARS).collect(),
        }
    }
}
