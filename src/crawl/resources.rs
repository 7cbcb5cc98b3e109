// src/crawl/resources.rs
// =============================================================================
// Exactly-once downloads for resources found while rewriting pages.
//
// The first worker to claim a resource URL downloads it; every later claim
// (from any worker, any page) returns immediately. The claim is a single
// insert under a lock, so two workers can never both decide to fetch the same
// file.
// =============================================================================

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::stats::{Counter, Stats};
use crate::fetch::Fetcher;
use crate::rewrite::ResourceSink;
use crate::site::CrawlTarget;

/// Resource URL -> local file, for every resource ever claimed.
#[derive(Debug, Default)]
pub struct ResourceMap {
    entries: Mutex<HashMap<String, PathBuf>>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key` -> `path` unless `key` was claimed before.
    /// Returns true for the first claim only.
    pub fn claim(&self, key: &str, path: &Path) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains_key(key) {
            return false;
        }
        entries.insert(key.to_string(), path.to_path_buf());
        true
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// The `ResourceSink` used by the crawl: claims, downloads, counts.
pub struct ResourceDownloader {
    fetcher: Fetcher,
    stats: Arc<Stats>,
    claimed: ResourceMap,
}

impl ResourceDownloader {
    pub fn new(fetcher: Fetcher, stats: Arc<Stats>) -> Self {
        Self {
            fetcher,
            stats,
            claimed: ResourceMap::new(),
        }
    }

    /// Distinct resources claimed so far.
    #[cfg(test)]
    pub fn claimed(&self) -> usize {
        self.claimed.len()
    }
}

#[async_trait]
impl ResourceSink for ResourceDownloader {
    async fn ensure(&self, target: &CrawlTarget, local_path: &Path) {
        if !self.claimed.claim(target.key(), local_path) {
            log::debug!("Resource already handled: {}", target.url);
            return;
        }

        match self.fetcher.download(&target.url, local_path).await {
            Ok(bytes) => {
                self.stats.increment(Counter::Resources);
                log::info!("Downloaded resource: {} ({} bytes)", target.url, bytes);
            }
            Err(e) => {
                self.stats.increment(Counter::Errors);
                log::error!("Failed to download {}: {}", target.url, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use url::Url;

    #[test]
    fn test_claim_only_once() {
        let map = ResourceMap::new();
        assert!(map.claim("https://example.com/a.png", Path::new("a.png")));
        assert!(!map.claim("https://example.com/a.png", Path::new("a.png")));
        assert!(map.claim("https://example.com/b.png", Path::new("b.png")));
        assert_eq!(map.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_ensure_fetches_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/img/banner.jpg")
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body("jpegbytes")
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let stats = Arc::new(Stats::new());
        let fetcher = Fetcher::new(Duration::from_secs(5), "site-mirror-test").unwrap();
        let sink = Arc::new(ResourceDownloader::new(fetcher, stats.clone()));

        let url = Url::parse(&format!("{}/img/banner.jpg", server.url())).unwrap();
        let target = CrawlTarget::resource(url);
        let dest = dir.path().join("img/banner.jpg");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let sink = sink.clone();
                let target = target.clone();
                let dest = dest.clone();
                tokio::spawn(async move { sink.ensure(&target, &dest).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        mock.assert_async().await;
        assert_eq!(sink.claimed(), 1);
        assert_eq!(stats.snapshot_with_depth(0).resources, 1);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "jpegbytes");
    }

    #[tokio::test]
    async fn test_failed_resource_counts_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/gone.css")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let stats = Arc::new(Stats::new());
        let fetcher = Fetcher::new(Duration::from_secs(5), "site-mirror-test").unwrap();
        let sink = ResourceDownloader::new(fetcher, stats.clone());

        let url = Url::parse(&format!("{}/gone.css", server.url())).unwrap();
        let dest = dir.path().join("gone.css");
        sink.ensure(&CrawlTarget::resource(url), &dest).await;

        let snapshot = stats.snapshot_with_depth(0);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.resources, 0);
        assert!(!dest.exists());
    }
}
