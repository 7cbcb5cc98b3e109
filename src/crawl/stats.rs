// src/crawl/stats.rs
// =============================================================================
// Crawl counters and the periodic progress line.
//
// All three counters live behind one mutex so a snapshot never mixes values
// from before and after an update. A snapshot also holds the frontier's queue
// lock while it reads them, so the queue depth belongs to the same instant.
// The progress reporter only ever reads.
//
// Lock order is queue, then counters. Nothing takes them the other way round.
// =============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use super::queue::Frontier;

/// Which counter to bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Pages,
    Resources,
    Errors,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    pages: u64,
    resources: u64,
    errors: u64,
}

/// Shared crawl statistics.
#[derive(Debug)]
pub struct Stats {
    counters: Mutex<Counters>,
    started: Instant,
}

/// A consistent point-in-time view of the crawl.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Snapshot {
    pub pages: u64,
    pub resources: u64,
    pub errors: u64,
    pub elapsed_seconds: f64,
    pub queue_depth: usize,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            started: Instant::now(),
        }
    }

    pub fn increment(&self, counter: Counter) {
        let mut counters = self.counters.lock();
        match counter {
            Counter::Pages => counters.pages += 1,
            Counter::Resources => counters.resources += 1,
            Counter::Errors => counters.errors += 1,
        }
    }

    /// Reads the counters and the frontier's queue depth in one critical section.
    pub fn snapshot(&self, frontier: &Frontier) -> Snapshot {
        frontier.with_len(|queue_depth| self.snapshot_with_depth(queue_depth))
    }

    // Reads all counters under one lock
    pub(super) fn snapshot_with_depth(&self, queue_depth: usize) -> Snapshot {
        let counters = *self.counters.lock();
        Snapshot {
            pages: counters.pages,
            resources: counters.resources,
            errors: counters.errors,
            elapsed_seconds: self.started.elapsed().as_secs_f64(),
            queue_depth,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs a progress line every `every` until the frontier's join barrier opens.
pub async fn report_progress(stats: Arc<Stats>, frontier: Arc<Frontier>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick fires immediately; skip it so we don't log 0/0/0
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = frontier.wait_idle() => break,
            _ = ticker.tick() => {
                let snapshot = stats.snapshot(&frontier);
                log::info!("{}", format_progress(&snapshot));
            }
        }
    }
}

/// "Progress: 3 pages, 12 resources, 0 errors | Queue: 4 | Time: 6.1s"
pub fn format_progress(snapshot: &Snapshot) -> String {
    format!(
        "Progress: {} pages, {} resources, {} errors | Queue: {} | Time: {:.1}s",
        snapshot.pages, snapshot.resources, snapshot.errors, snapshot.queue_depth, snapshot.elapsed_seconds
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::CrawlTarget;
    use url::Url;

    #[test]
    fn test_increment_and_snapshot() {
        let stats = Stats::new();
        stats.increment(Counter::Pages);
        stats.increment(Counter::Resources);
        stats.increment(Counter::Resources);
        stats.increment(Counter::Errors);

        let snapshot = stats.snapshot_with_depth(7);
        assert_eq!(snapshot.pages, 1);
        assert_eq!(snapshot.resources, 2);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.queue_depth, 7);
        assert!(snapshot.elapsed_seconds >= 0.0);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let stats = Arc::new(Stats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.increment(Counter::Errors);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.snapshot_with_depth(0).errors, 8000);
    }

    #[test]
    fn test_snapshot_reads_queue_depth_from_frontier() {
        let page = |path: &str| CrawlTarget::page(Url::parse(&format!("https://example.com{}", path)).unwrap());
        let frontier = Frontier::new(page("/"));
        frontier.try_enqueue(page("/a"));
        frontier.try_enqueue(page("/b"));

        let stats = Stats::new();
        stats.increment(Counter::Pages);

        let snapshot = stats.snapshot(&frontier);
        assert_eq!(snapshot.queue_depth, 3);
        assert_eq!(snapshot.pages, 1);
        assert_eq!(snapshot.queue_depth, frontier.len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_snapshot_while_frontier_changes() {
        let page = |path: String| CrawlTarget::page(Url::parse(&format!("https://example.com{}", path)).unwrap());
        let frontier = Arc::new(Frontier::new(page("/".to_string())));
        let stats = Arc::new(Stats::new());

        // One "worker" enqueues a page and counts it in the same step
        let producer = {
            let (frontier, stats) = (frontier.clone(), stats.clone());
            tokio::spawn(async move {
                for i in 0..500 {
                    frontier.try_enqueue(page(format!("/p{}", i)));
                    stats.increment(Counter::Pages);
                }
            })
        };

        for _ in 0..200 {
            let snapshot = stats.snapshot(&frontier);
            // Nothing is dequeued, so the queue never holds fewer pages than counted
            assert!(snapshot.queue_depth as u64 >= snapshot.pages);
            tokio::task::yield_now().await;
        }
        producer.await.unwrap();

        let snapshot = stats.snapshot(&frontier);
        assert_eq!(snapshot.queue_depth, 501);
        assert_eq!(snapshot.pages, 500);
    }

    #[test]
    fn test_format_progress() {
        let snapshot = Snapshot {
            pages: 3,
            resources: 12,
            errors: 0,
            elapsed_seconds: 6.14,
            queue_depth: 4,
        };
        assert_eq!(
            format_progress(&snapshot),
            "Progress: 3 pages, 12 resources, 0 errors | Queue: 4 | Time: 6.1s"
        );
    }

    #[tokio::test]
    async fn test_reporter_stops_when_barrier_opens() {
        let seed = CrawlTarget::page(Url::parse("https://example.com/").unwrap());
        let frontier = Arc::new(Frontier::new(seed));
        let stats = Arc::new(Stats::new());

        let reporter = tokio::spawn(report_progress(stats, frontier.clone(), Duration::from_millis(5)));

        frontier.dequeue(Duration::from_millis(10)).await.unwrap();
        frontier.mark_done();

        tokio::time::timeout(Duration::from_secs(1), reporter)
            .await
            .expect("reporter should stop")
            .unwrap();
    }
}
