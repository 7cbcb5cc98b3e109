// src/crawl/engine.rs
// =============================================================================
// The worker pool and the orchestrator that runs a whole mirror.
//
// Each worker loops:
// 1. take a target from the frontier (give up after the idle timeout)
// 2. sleep for the politeness delay
// 3. GET it
// 4. HTML: rewrite links, download new resources, queue new pages, save
//    anything else: stream it straight to disk
// 5. report the target as done
//
// Workers never talk to each other. Everything shared goes through the
// frontier (what to do next) and the stats (what happened).
//
// A failure while processing one URL is logged and counted. It never stops
// the worker or the pool.
// =============================================================================

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use super::queue::Frontier;
use super::resources::ResourceDownloader;
use super::stats::{report_progress, Counter, Snapshot, Stats};
use crate::config::MirrorConfig;
use crate::error::Result;
use crate::fetch::{write_file, Fetcher};
use crate::rewrite::rewrite_page;
use crate::site::{CrawlTarget, Site};

/// Timing and sizing of one crawl.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub threads: usize,
    pub delay: Duration,
    pub idle_timeout: Duration,
    pub grace_period: Duration,
    pub progress_interval: Duration,
    /// Most memory the HTML rewriter may buffer for one page
    pub rewrite_memory_limit: usize,
}

impl CrawlSettings {
    pub fn from_config(config: &MirrorConfig) -> Result<Self> {
        Ok(Self {
            threads: config.threads,
            delay: config.delay()?,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            grace_period: Duration::from_secs(config.grace_period_secs),
            progress_interval: Duration::from_secs(config.progress_interval_secs),
            rewrite_memory_limit: config.rewrite_memory_limit_bytes,
        })
    }
}

/// How the crawl ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every queued target was processed
    Completed,
    /// The shutdown signal fired first
    Interrupted,
}

/// Final result handed to the presentation layer.
#[derive(Debug, Clone)]
pub struct Report {
    pub outcome: Outcome,
    pub snapshot: Snapshot,
    pub root: PathBuf,
}

/// One mirroring run over a site.
pub struct Mirror {
    site: Arc<Site>,
    fetcher: Fetcher,
    settings: CrawlSettings,
}

impl Mirror {
    /// The fetcher is confined to `site`: a redirect off the site fails the URL.
    pub fn new(site: Site, fetcher: Fetcher, settings: CrawlSettings) -> Self {
        let site = Arc::new(site);
        Self {
            fetcher: fetcher.confined_to(site.clone()),
            site,
            settings,
        }
    }

    /// Crawls until the frontier's join barrier opens or `shutdown` resolves.
    ///
    /// Either way the frontier is closed afterwards and workers get the grace
    /// period to wind down. Workers still busy after that are left to finish
    /// on their own; none is cancelled mid-request.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Report {
        let stats = Arc::new(Stats::new());
        let frontier = Arc::new(Frontier::new(CrawlTarget::page(self.site.seed().clone())));
        let resources = Arc::new(ResourceDownloader::new(self.fetcher.clone(), stats.clone()));

        let context = Arc::new(WorkerContext {
            site: self.site.clone(),
            fetcher: self.fetcher.clone(),
            frontier: frontier.clone(),
            stats: stats.clone(),
            resources,
            delay: self.settings.delay,
            rewrite_memory_limit: self.settings.rewrite_memory_limit,
        });

        let mut workers = JoinSet::new();
        for id in 1..=self.settings.threads {
            workers.spawn(worker(id, context.clone(), self.settings.idle_timeout));
            log::debug!("Started worker {}", id);
        }

        let reporter = tokio::spawn(report_progress(
            stats.clone(),
            frontier.clone(),
            self.settings.progress_interval,
        ));

        tokio::pin!(shutdown);
        let outcome = tokio::select! {
            _ = frontier.wait_idle() => Outcome::Completed,
            _ = &mut shutdown => Outcome::Interrupted,
        };

        frontier.close();
        drain(workers, self.settings.grace_period).await;
        reporter.abort();

        Report {
            outcome,
            snapshot: stats.snapshot(&frontier),
            root: self.site.root().to_path_buf(),
        }
    }
}

// Waits up to `grace` for workers to exit, then detaches the rest.
async fn drain(mut workers: JoinSet<()>, grace: Duration) {
    let joined = tokio::time::timeout(grace, async {
        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                log::warn!("Worker task failed: {}", e);
            }
        }
    })
    .await;

    if joined.is_err() {
        log::warn!("{} worker(s) still busy after grace period", workers.len());
        workers.detach_all();
    }
}

async fn worker(id: usize, context: Arc<WorkerContext>, idle_timeout: Duration) {
    while let Some(target) = context.frontier.dequeue(idle_timeout).await {
        context.process(&target).await;
        context.frontier.mark_done();
    }
    log::debug!("Worker {} exiting", id);
}

// Everything a worker needs, shared by all workers
struct WorkerContext {
    site: Arc<Site>,
    fetcher: Fetcher,
    frontier: Arc<Frontier>,
    stats: Arc<Stats>,
    resources: Arc<ResourceDownloader>,
    delay: Duration,
    rewrite_memory_limit: usize,
}

impl WorkerContext {
    async fn process(&self, target: &CrawlTarget) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        log::info!("Processing: {}", target.url);

        if let Err(e) = self.fetch_and_save(target).await {
            self.stats.increment(Counter::Errors);
            log::error!("Error processing {}: {}", target.url, e);
        }
    }

    async fn fetch_and_save(&self, target: &CrawlTarget) -> Result<()> {
        let fetched = self.fetcher.fetch(&target.url).await?;
        let local_path = self.site.map_path(&target.url, target.role);

        if !fetched.is_html() {
            log::debug!("{} is {:?}, saving as-is", fetched.url(), fetched.content_type());
            let bytes = fetched.save_to(&local_path).await?;
            self.stats.increment(Counter::Resources);
            log::info!("Downloaded resource: {} ({} bytes)", target.url, bytes);
            return Ok(());
        }

        // Relative links resolve against where the body came from, which
        // differs from target.url after a redirect (/docs -> /docs/)
        let served_from = fetched.url().clone();
        let html = fetched.text().await?;
        let rewritten = rewrite_page(
            &html,
            &target.url,
            &served_from,
            &self.site,
            self.resources.as_ref(),
            self.rewrite_memory_limit,
        )
        .await;

        let content = match rewritten {
            Ok(page) => {
                for discovered in page.pages {
                    let url = discovered.url.clone();
                    if self.frontier.try_enqueue(discovered) {
                        log::debug!("Queued: {}", url);
                    }
                }
                page.html
            }
            Err(e) => {
                // Keep the page, just without offline links
                self.stats.increment(Counter::Errors);
                log::error!("{}; saving original content", e);
                html
            }
        };

        write_file(&local_path, content.as_bytes()).await?;
        self.stats.increment(Counter::Pages);
        log::info!("Downloaded and processed: {}", target.url);
        Ok(())
    }
}
