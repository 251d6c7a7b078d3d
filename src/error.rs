//! Error types for hadoop-exporter
//!
//! Errors are split by lifecycle: `StartupError` is fatal and caught before
//! the server starts serving, while `ScrapeError` aborts only the poll that
//! produced it and is reported through the scrape-failure counter.

use thiserror::Error;

/// Errors raised while fetching the management endpoint.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The endpoint answered 401 and no credential is configured
    #[error("endpoint requires authentication (HTTP 401) and no credential is configured")]
    AuthRequired,

    /// Principal did not have the `user@REALM` shape
    #[error("malformed principal '{0}': expected exactly one '@' (user@REALM)")]
    MalformedPrincipal(String),

    /// Kerberos login failed
    #[error("Kerberos login failed for '{principal}': {reason}")]
    Login { principal: String, reason: String },

    /// SPNEGO context establishment failed
    #[error("SPNEGO negotiation failed for '{spn}': {reason}")]
    Negotiation { spn: String, reason: String },

    /// Endpoint URL could not be parsed or has no host
    #[error("invalid endpoint URL '{0}'")]
    InvalidUrl(String),

    /// HTTP request failed
    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),

    /// Request exceeded the configured timeout
    #[error("request timed out")]
    Timeout,

    /// Endpoint answered with a non-success status other than 401
    #[error("endpoint returned HTTP {0}")]
    HttpStatus(u16),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err)
        }
    }
}

/// Errors raised while decoding the bean envelope.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The body was not valid JSON
    #[error("invalid JSON: {0}")]
    Json(String),

    /// The top-level value was not an object
    #[error("top-level JSON value is not an object")]
    NotAnObject,

    /// The top-level object has no `beans` key
    #[error("missing 'beans' key in response")]
    MissingBeans,

    /// `beans` was present but not an array
    #[error("'beans' is not an array")]
    BeansNotArray,

    /// An element of the `beans` array was not an object
    #[error("bean at index {0} is not an object")]
    BeanNotObject(usize),
}

/// A recoverable per-poll failure.
///
/// A `ScrapeError` never terminates the process; the poller logs it,
/// increments the failure counter, and the registry keeps its
/// last-known-good values.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Fetch stage failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Decode stage failed
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}

impl ScrapeError {
    /// Stage name for logging and failure accounting
    pub fn stage(&self) -> &'static str {
        match self {
            ScrapeError::Fetch(_) => "fetch",
            ScrapeError::Decode(_) => "decode",
        }
    }
}

/// A fatal error raised before the server starts serving.
#[derive(Error, Debug)]
pub enum StartupError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// HTTP client could not be constructed
    #[error("failed to initialize HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),

    /// Keytab file is missing or unreadable
    #[error("keytab '{path}' is not readable: {source}")]
    KeytabUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Credential configuration is inconsistent or malformed
    #[error("invalid credential configuration: {0}")]
    Credential(String),
}
