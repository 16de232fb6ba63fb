//! Controller and transport configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

/// Default streaming endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/api/chat/stream";

/// Default cap on a single buffered frame (1 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Errors from building a [`StreamConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue {
        /// The variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
    },
    /// A default header name or value is not valid HTTP.
    #[error("invalid header {name:?}")]
    InvalidHeader {
        /// The offending header name.
        name: String,
    },
    /// The HTTP client could not be built (e.g. the TLS backend failed).
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Settings shared by the controller and the HTTP transport.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use chatwire::StreamConfig;
///
/// let config = StreamConfig::default()
///     .endpoint("https://chat.example.com/api/stream")
///     .max_frame_bytes(256 * 1024)
///     .connect_timeout(Duration::from_secs(10))
///     .header("x-tenant", "acme");
/// assert_eq!(config.max_frame_bytes, 256 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// URL the request body is POSTed to.
    pub endpoint: String,
    /// Largest line the frame splitter will buffer before failing.
    pub max_frame_bytes: usize,
    /// Connect timeout in seconds. `None` leaves reqwest's default.
    pub connect_timeout_secs: Option<u64>,
    /// Headers sent with every request; per-request headers win.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            connect_timeout_secs: None,
            default_headers: BTreeMap::new(),
        }
    }
}

impl StreamConfig {
    /// Read overrides from `CHATWIRE_ENDPOINT`, `CHATWIRE_MAX_FRAME_BYTES`
    /// and `CHATWIRE_CONNECT_TIMEOUT_SECS`. Unset variables keep defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(endpoint) = lookup("CHATWIRE_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(raw) = lookup("CHATWIRE_MAX_FRAME_BYTES") {
            config.max_frame_bytes = parse_var("CHATWIRE_MAX_FRAME_BYTES", raw)?;
        }
        if let Some(raw) = lookup("CHATWIRE_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout_secs = Some(parse_var("CHATWIRE_CONNECT_TIMEOUT_SECS", raw)?);
        }
        Ok(config)
    }

    /// Override the endpoint URL.
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    /// Override the frame size limit.
    #[must_use]
    pub fn max_frame_bytes(mut self, limit: usize) -> Self {
        self.max_frame_bytes = limit;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// The connect timeout as a [`Duration`], if set.
    #[must_use]
    pub fn connect_timeout_duration(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    /// The default headers as a [`HeaderMap`].
    pub fn header_map(&self) -> Result<HeaderMap, ConfigError> {
        let mut map = HeaderMap::with_capacity(self.default_headers.len());
        for (name, value) in &self.default_headers {
            let invalid = || ConfigError::InvalidHeader { name: name.clone() };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, raw: String) -> Result<T, ConfigError> {
    let parsed = raw.trim().parse();
    parsed.map_err(|_| ConfigError::InvalidValue { var, value: raw })
}
