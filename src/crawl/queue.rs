// src/crawl/queue.rs
// =============================================================================
// This module implements the URL frontier shared by all workers.
//
// How it works:
// 1. The seed URL is marked visited and queued when the frontier is created
// 2. Workers pop targets off the queue (waiting up to a timeout when empty)
// 3. Pages discovered while rewriting go through `try_enqueue`, which checks
//    the visited set and pushes in one critical section, so a URL is queued
//    at most once no matter how many workers find it
// 4. Each processed target is reported with `mark_done`
// 5. When every queued target has been marked done, the join barrier opens
//
// Termination is counted, not guessed: `outstanding` goes up on every
// enqueue and down on every `mark_done`. Zero means the queue is empty AND
// nobody is still processing something that could enqueue more.
//
// Rust concepts:
// - Mutex: one lock per structure (visited set, queue), never one global lock
// - Notify: lets async tasks sleep until another task wakes them
// - Atomics: lock-free counters for the barrier and the closed flag
// =============================================================================

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::site::CrawlTarget;

/// Work queue plus visited set plus join barrier.
pub struct Frontier {
    // Every URL ever enqueued (not "ever completed")
    visited: Mutex<HashSet<String>>,
    queue: Mutex<VecDeque<CrawlTarget>>,
    // Wakes a worker waiting in `dequeue`
    ready: Notify,
    // Enqueued but not yet marked done
    outstanding: AtomicUsize,
    // Wakes `wait_idle` when `outstanding` drops to zero
    idle: Notify,
    closed: AtomicBool,
}

impl Frontier {
    /// Creates a frontier holding only `seed`, already marked visited.
    pub fn new(seed: CrawlTarget) -> Self {
        let mut visited = HashSet::new();
        visited.insert(seed.key().to_string());

        let mut queue = VecDeque::new();
        queue.push_back(seed);

        Self {
            visited: Mutex::new(visited),
            queue: Mutex::new(queue),
            ready: Notify::new(),
            outstanding: AtomicUsize::new(1),
            idle: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Queues `target` unless its URL was ever queued before.
    ///
    /// Returns true if this call queued it. Returns false for duplicates and
    /// once the frontier has been closed.
    pub fn try_enqueue(&self, target: CrawlTarget) -> bool {
        if self.is_closed() {
            return false;
        }

        {
            let mut visited = self.visited.lock();
            if !visited.insert(target.key().to_string()) {
                return false;
            }
            // Counted before it becomes visible to workers, so the barrier
            // can never see zero while this target is in flight
            self.outstanding.fetch_add(1, Ordering::SeqCst);
        }

        self.queue.lock().push_back(target);
        self.ready.notify_one();
        true
    }

    /// Pops the next target, waiting up to `timeout` for one to arrive.
    ///
    /// Returns None on timeout or once the frontier is closed.
    pub async fn dequeue(&self, timeout: Duration) -> Option<CrawlTarget> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            // Register interest before checking, so a push that lands between
            // the check and the await still wakes us
            let notified = self.ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_closed() {
                return None;
            }

            if let Some(target) = self.queue.lock().pop_front() {
                return Some(target);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    /// Reports that one dequeued target has been fully processed.
    pub fn mark_done(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Waits until every enqueued target has been marked done.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }

            notified.await;
        }
    }

    /// Stops handing out and accepting work. Waiting workers wake up with None.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.ready.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Targets waiting in the queue right now.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Runs `read` with the queue depth while the queue is locked, so nothing
    /// is enqueued or dequeued until it returns.
    pub fn with_len<R>(&self, read: impl FnOnce(usize) -> R) -> R {
        let queue = self.queue.lock();
        read(queue.len())
    }

    /// Targets enqueued but not yet marked done (queued + in progress).
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Number of distinct URLs ever enqueued.
    #[cfg(test)]
    pub fn visited_count(&self) -> usize {
        self.visited.lock().len()
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why not count running workers to know when we're done?
//    - A worker can be between "popped a URL" and "pushed what it found"
//    - At that moment the queue is empty and it looks idle from outside
//    - Counting outstanding work items has no such gap
//
// 2. What is tokio::pin! for?
//    - `Notified` futures must not move once they've been polled
//    - pin! fixes it in place on the stack so we can call enable() on it
//
// 3. Why parking_lot::Mutex and not tokio::sync::Mutex?
//    - We never hold these locks across an .await
//    - A plain blocking mutex is cheaper for short critical sections
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use url::Url;

    fn page(path: &str) -> CrawlTarget {
        CrawlTarget::page(Url::parse(&format!("https://example.com{}", path)).unwrap())
    }

    #[tokio::test]
    async fn test_seed_is_queued_and_visited() {
        let frontier = Frontier::new(page("/"));
        assert_eq!(frontier.len(), 1);
        assert!(!frontier.try_enqueue(page("/")));

        let first = frontier.dequeue(Duration::from_millis(10)).await.unwrap();
        assert_eq!(first.url.as_str(), "https://example.com/");
    }

    #[tokio::test]
    async fn test_fragment_variants_are_duplicates() {
        let frontier = Frontier::new(page("/"));
        assert!(frontier.try_enqueue(page("/about")));
        assert!(!frontier.try_enqueue(page("/about#team")));
        assert_eq!(frontier.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_enqueue_of_same_url_succeeds_once() {
        let frontier = Arc::new(Frontier::new(page("/")));

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let frontier = frontier.clone();
                tokio::spawn(async move { frontier.try_enqueue(page("/same")) })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(frontier.len(), 2);
        assert_eq!(frontier.visited_count(), 2);
    }

    #[tokio::test]
    async fn test_dequeue_times_out_when_empty() {
        let frontier = Frontier::new(page("/"));
        frontier.dequeue(Duration::from_millis(10)).await.unwrap();

        let started = std::time::Instant::now();
        assert!(frontier.dequeue(Duration::from_millis(50)).await.is_none());
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_dequeue_wakes_on_enqueue() {
        let frontier = Arc::new(Frontier::new(page("/")));
        frontier.dequeue(Duration::from_millis(10)).await.unwrap();

        let waiter = {
            let frontier = frontier.clone();
            tokio::spawn(async move { frontier.dequeue(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(frontier.try_enqueue(page("/late")));

        let target = waiter.await.unwrap().unwrap();
        assert_eq!(target.url.as_str(), "https://example.com/late");
    }

    #[tokio::test]
    async fn test_join_barrier_waits_for_in_progress_work() {
        let frontier = Arc::new(Frontier::new(page("/")));
        let seed = frontier.dequeue(Duration::from_millis(10)).await.unwrap();

        // Queue empty, but the seed is still being processed
        assert_eq!(frontier.len(), 0);
        assert_eq!(frontier.outstanding(), 1);

        let barrier = {
            let frontier = frontier.clone();
            tokio::spawn(async move { frontier.wait_idle().await })
        };

        // Processing the seed discovers one more page
        assert!(frontier.try_enqueue(page("/child")));
        drop(seed);
        frontier.mark_done();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!barrier.is_finished());

        frontier.dequeue(Duration::from_millis(10)).await.unwrap();
        frontier.mark_done();

        tokio::time::timeout(Duration::from_secs(1), barrier)
            .await
            .expect("barrier should open")
            .unwrap();
        assert_eq!(frontier.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_close_wakes_waiters_and_rejects_work() {
        let frontier = Arc::new(Frontier::new(page("/")));
        frontier.dequeue(Duration::from_millis(10)).await.unwrap();

        let waiter = {
            let frontier = frontier.clone();
            tokio::spawn(async move { frontier.dequeue(Duration::from_secs(30)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.close();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("close should wake the waiter")
            .unwrap();
        assert!(result.is_none());
        assert!(!frontier.try_enqueue(page("/after-close")));
    }
}
