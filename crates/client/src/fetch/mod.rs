//! HTTP fetch of source documents.
//!
//! ### Contract
//! - One outbound request per call, no retries. A failed refresh is retried
//!   by the next request for the same key.
//! - Every request carries the configured User-Agent so the source can
//!   attribute traffic.
//! - Transport failures, non-success statuses and timeouts are reported as
//!   distinct [`FetchError`] variants.
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, source_url};

use missal_core::Error;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string identifying this service.
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("missal/", env!("CARGO_PKG_VERSION")).to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&missal_core::config::AppConfig> for FetchConfig {
    fn from(config: &missal_core::config::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// A single document request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    /// Extra headers sent with the request.
    pub headers: BTreeMap<String, String>,
    /// Overrides the client's default timeout when set.
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    pub fn new(url: Url) -> Self {
        Self { url, headers: BTreeMap::new(), timeout: None }
    }
}

/// A fetched source document.
#[derive(Debug, Clone)]
pub struct Document {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body, lossily decoded as UTF-8
    pub body: String,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl Document {
    /// Build a document from markup already in hand.
    pub fn from_html(url: Url, body: impl Into<String>) -> Self {
        Self {
            final_url: url.clone(),
            url,
            status: 200,
            content_type: Some("text/html".to_string()),
            body: body.into(),
            fetch_ms: 0,
        }
    }
}

/// Fetch failures, kept apart so callers can tell "source down" from "too slow".
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Network, DNS or TLS failure.
    #[error("transport error fetching {url}: {reason}")]
    Transport { url: String, reason: String },

    /// Non-success response status.
    #[error("status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Timed out connecting or reading the body.
    #[error("timed out fetching {0}")]
    Timeout(String),

    /// Body exceeded the byte limit.
    #[error("{url}: {len} bytes exceeds {max}")]
    TooLarge { url: String, len: usize, max: usize },

    /// A configured header could not be put on the wire.
    #[error("invalid request header {0}")]
    InvalidHeader(String),
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Transport { .. } => Error::FetchTransport(err.to_string()),
            FetchError::HttpStatus { url, status } => Error::HttpStatus { status, url },
            FetchError::Timeout(url) => Error::FetchTimeout(url),
            FetchError::TooLarge { .. } => Error::FetchTooLarge(err.to_string()),
            FetchError::InvalidHeader(_) => Error::Internal(err.to_string()),
        }
    }
}

fn classify(url: &Url, err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Transport { url: url.to_string(), reason: err.to_string() }
    }
}

/// Something that can retrieve a document.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Document, FetchError>;
}

/// HTTP fetch client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn headers(request: &FetchRequest) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| FetchError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value).map_err(|_| FetchError::InvalidHeader(name.as_str().to_string()))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn check_size(&self, url: &Url, len: usize) -> Result<(), FetchError> {
        if len > self.config.max_bytes {
            return Err(FetchError::TooLarge { url: url.to_string(), len, max: self.config.max_bytes });
        }
        Ok(())
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    /// Fetch a document, enforcing status and byte limits.
    async fn fetch(&self, request: &FetchRequest) -> Result<Document, FetchError> {
        let start = Instant::now();
        let url = request.url.clone();

        let mut builder = self.http.get(url.as_str()).headers(Self::headers(request)?);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| classify(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus { url: url.to_string(), status: status.as_u16() });
        }

        if let Some(len) = response.content_length() {
            self.check_size(&url, len as usize)?;
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes: Bytes = response.bytes().await.map_err(|e| classify(&url, &e))?;
        self.check_size(&url, bytes.len())?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(%url, %final_url, fetch_ms, bytes = bytes.len(), "fetched source document");

        Ok(Document {
            url,
            final_url,
            status: status.as_u16(),
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
            fetch_ms,
        })
    }
}
