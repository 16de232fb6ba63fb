//! The request-issuing seam between the controller and the network.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use chatwire_types::TransportError;
use futures::Stream;
use reqwest::header::HeaderMap;

/// A response body as a stream of chunks in arrival order.
///
/// Dropping the stream cancels the underlying connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// One request to issue.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    /// Target URL.
    pub endpoint: String,
    /// JSON request body.
    pub body: serde_json::Value,
    /// Per-request headers.
    pub headers: HeaderMap,
}

/// Issues a request and hands back its response body as a [`ByteStream`].
///
/// Implementations resolve once the response headers are in. Non-success
/// statuses and connection failures are reported as [`TransportError`]s
/// here, before any chunk is read.
pub trait Transport: Send + Sync {
    /// Submit `request` and return its body stream.
    fn submit(
        &self,
        request: StreamRequest,
    ) -> impl Future<Output = Result<ByteStream, TransportError>> + Send;
}
