//! reqwest-backed [`Transport`].

use std::future::Future;
use std::time::Duration;

use chatwire_types::TransportError;
use futures::StreamExt;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use crate::config::{ConfigError, StreamConfig};
use crate::error::{map_http_status, map_reqwest_error};
use crate::transport::{ByteStream, StreamRequest, Transport};

/// HTTP transport that POSTs a JSON body and streams the response.
///
/// # Example
///
/// ```no_run
/// use chatwire::{HttpTransport, StreamConfig};
///
/// let config = StreamConfig::default().header("authorization", "Bearer token");
/// let transport = HttpTransport::from_config(&config)?;
/// # Ok::<(), chatwire::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Shared HTTP client.
    pub(crate) client: reqwest::Client,
    /// Headers sent with every request.
    pub(crate) default_headers: HeaderMap,
    /// Connect timeout configured on `client`, for error reporting.
    pub(crate) connect_timeout: Option<Duration>,
}

impl HttpTransport {
    /// Create a transport with a default client and no extra headers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            default_headers: HeaderMap::new(),
            connect_timeout: None,
        }
    }

    /// Build a transport from `config` (default headers and connect timeout).
    pub fn from_config(config: &StreamConfig) -> Result<Self, ConfigError> {
        let connect_timeout = config.connect_timeout_duration();
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build().map_err(ConfigError::HttpClient)?;

        Ok(Self {
            client,
            default_headers: config.header_map()?,
            connect_timeout,
        })
    }

    /// Use a preconfigured [`reqwest::Client`].
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Headers for one request: defaults first, then per-request overrides.
    pub(crate) fn merged_headers(&self, overrides: HeaderMap) -> HeaderMap {
        let mut headers = self.default_headers.clone();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        headers.extend(overrides);
        headers
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn submit(
        &self,
        request: StreamRequest,
    ) -> impl Future<Output = Result<ByteStream, TransportError>> + Send {
        let http_client = self.client.clone();
        let headers = self.merged_headers(request.headers);
        let timeout = self.connect_timeout;

        async move {
            tracing::debug!(url = %request.endpoint, "sending streaming chat request");

            let response = http_client
                .post(&request.endpoint)
                .headers(headers)
                .json(&request.body)
                .send()
                .await
                .map_err(|e| map_reqwest_error(e, timeout))?;

            let status = response.status();
            if !status.is_success() {
                let body_text = response
                    .text()
                    .await
                    .map_err(|e| map_reqwest_error(e, timeout))?;
                return Err(map_http_status(status, &body_text));
            }

            let body = response
                .bytes_stream()
                .map(move |chunk| chunk.map_err(|e| map_reqwest_error(e, timeout)));
            Ok(Box::pin(body) as ByteStream)
        }
    }
}
