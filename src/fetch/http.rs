// src/fetch/http.rs
// =============================================================================
// This module performs the HTTP GETs for the crawl.
//
// Key functionality:
// - One GET per URL, with a fixed timeout and no internal retries
// - Non-2xx statuses are failures (we never save an error page)
// - Redirects are followed, but a confined fetcher refuses to end up on
//   another site
// - `Fetched::url` is where the body actually came from (after redirects)
// - Pages are buffered as text because they get parsed before being written
// - Everything else is streamed to disk chunk by chunk
//
// Rust concepts:
// - async/await: the worker awaits the network instead of blocking a thread
// - Streams: the body arrives as a stream of byte chunks
// =============================================================================

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt; // StreamExt gives us .next() on the body stream
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tokio::io::AsyncWriteExt;
use url::Url;

use super::disk::ensure_parent;
use crate::error::{FetchError, FetchErrorKind, MirrorError, Result};
use crate::site::Site;

/// Shared HTTP client. Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    // When set, responses whose final URL is off this site are failures
    scope: Option<Arc<Site>>,
}

impl Fetcher {
    /// Builds the client used by every worker.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| MirrorError::setup(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self { client, scope: None })
    }

    /// Rejects every response that redirected away from `site`.
    pub fn confined_to(self, site: Arc<Site>) -> Self {
        Self {
            scope: Some(site),
            ..self
        }
    }

    /// Issues a single GET and checks the status.
    ///
    /// The body is not read yet; the caller decides whether to buffer it
    /// (`Fetched::text`) or stream it to disk (`Fetched::save_to`).
    pub async fn fetch(&self, url: &Url) -> std::result::Result<Fetched, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;

        let final_url = response.url().clone();
        if let Some(site) = &self.scope {
            if !site.in_scope(&final_url) {
                return Err(FetchError::new(
                    url.as_str(),
                    FetchErrorKind::OffSite(final_url.to_string()),
                ));
            }
        }

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(url.as_str(), FetchErrorKind::Status(status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        Ok(Fetched {
            url: final_url,
            content_type,
            response,
        })
    }

    /// GETs `url` and streams the body into `dest`. Returns the bytes written.
    pub async fn download(&self, url: &Url, dest: &Path) -> Result<u64> {
        let fetched = self.fetch(url).await?;
        fetched.save_to(dest).await
    }
}

/// A successful response whose body has not been consumed yet.
pub struct Fetched {
    url: Url,
    content_type: String,
    response: Response,
}

impl Fetched {
    /// The URL the body was served from, after following redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The raw Content-Type header, or "" when the server sent none.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// True when the server says this is an HTML document.
    pub fn is_html(&self) -> bool {
        is_html_content_type(&self.content_type)
    }

    /// Buffers the whole body as text, decoding with the declared charset.
    pub async fn text(self) -> std::result::Result<String, FetchError> {
        let url = self.url;
        self.response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))
    }

    /// Streams the body into `dest`, creating parent directories first.
    ///
    /// A partially written file is removed if the stream breaks.
    pub async fn save_to(self, dest: &Path) -> Result<u64> {
        ensure_parent(dest).await?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| MirrorError::filesystem(dest, e))?;

        let url = self.url;
        let mut stream = self.response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let outcome = match chunk {
                Ok(bytes) => file
                    .write_all(&bytes)
                    .await
                    .map(|_| bytes.len() as u64)
                    .map_err(|e| MirrorError::filesystem(dest, e)),
                Err(e) => Err(FetchError::from_reqwest(url.as_str(), e).into()),
            };

            match outcome {
                Ok(n) => written += n,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(dest).await;
                    return Err(e);
                }
            }
        }

        file.flush().await.map_err(|e| MirrorError::filesystem(dest, e))?;
        Ok(written)
    }
}

// Matches "text/html", "text/html; charset=utf-8", "application/xhtml+xml"
fn is_html_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}
