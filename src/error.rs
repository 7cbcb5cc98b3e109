// src/error.rs
// =============================================================================
// Error types for the mirroring pipeline.
//
// Every failure the crawler can hit falls into one of a few buckets:
// - Fetch: the HTTP GET failed (transport, timeout, non-2xx)
// - Parse: the HTML rewrite pass failed
// - Filesystem: we could not create a directory or write a file
// - Setup: bad arguments or initialization failed before any worker started
//
// Only Setup errors end the run. Everything else is recorded against a
// single URL and the crawl carries on.
// =============================================================================

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Why a single GET failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Server answered with a non-2xx status
    Status(u16),
    /// Request exceeded the configured timeout
    Timeout,
    /// Could not connect (DNS, refused, unreachable)
    Connect,
    /// TLS handshake or certificate problem
    Tls,
    /// Redirect loop or redirect limit exceeded
    TooManyRedirects,
    /// Redirects ended on a URL outside the mirrored site
    OffSite(String),
    /// The connection broke while reading the body
    Body(String),
    /// Anything reqwest reports that we don't categorize further
    Other(String),
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::Status(code) => write!(f, "HTTP {}", code),
            FetchErrorKind::Timeout => write!(f, "request timed out"),
            FetchErrorKind::Connect => write!(f, "connection failed"),
            FetchErrorKind::Tls => write!(f, "TLS error"),
            FetchErrorKind::TooManyRedirects => write!(f, "too many redirects"),
            FetchErrorKind::OffSite(url) => write!(f, "redirected off-site to {}", url),
            FetchErrorKind::Body(msg) => write!(f, "body read failed: {}", msg),
            FetchErrorKind::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// A failed GET, carrying the URL that was requested.
#[derive(Error, Debug, Clone)]
#[error("failed to fetch {url}: {kind}")]
pub struct FetchError {
    pub url: String,
    pub kind: FetchErrorKind,
}

impl FetchError {
    pub fn new(url: impl Into<String>, kind: FetchErrorKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }

    /// Categorizes a reqwest error into one of our fetch failure kinds.
    pub fn from_reqwest(url: impl Into<String>, error: reqwest::Error) -> Self {
        let error_string = error.to_string();

        let kind = if error.is_timeout() {
            FetchErrorKind::Timeout
        } else if error.is_redirect() {
            FetchErrorKind::TooManyRedirects
        } else if let Some(status) = error.status() {
            FetchErrorKind::Status(status.as_u16())
        } else if error.is_connect() {
            FetchErrorKind::Connect
        } else if error_string.contains("certificate") || error_string.contains("tls") {
            FetchErrorKind::Tls
        } else if error.is_body() || error.is_decode() {
            FetchErrorKind::Body(error_string)
        } else {
            FetchErrorKind::Other(error_string)
        };

        Self::new(url, kind)
    }
}

/// Unified error type for the mirror.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// HTTP GET failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// HTML could not be rewritten
    #[error("failed to rewrite {url}: {message}")]
    Parse { url: String, message: String },

    /// Directory or file operation failed
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid arguments or failed initialization
    #[error("{0}")]
    Setup(String),

    /// Config file did not parse
    #[error("invalid config file: {0}")]
    Config(#[from] toml::de::Error),
}

impl MirrorError {
    /// Create a parse error for the page at `url`.
    pub fn parse(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a filesystem error for `path`.
    pub fn filesystem(path: &Path, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create a setup error.
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup(message.into())
    }
}
