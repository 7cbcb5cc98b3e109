// src/crawl/mod.rs
// =============================================================================
// This module runs the crawl.
//
// Submodules:
// - queue: the frontier (work queue + visited set + join barrier)
// - stats: counters and the progress reporter
// - resources: exactly-once resource downloads used by the rewriter
// - engine: the worker pool and the orchestrator
//
// Data flow:
//   seed -> frontier -> worker -> fetch -> rewrite -> (resources downloaded,
//   pages enqueued) -> file written -> stats -> next target
// =============================================================================

mod engine;
mod queue;
mod resources;
mod stats;

pub use engine::{CrawlSettings, Mirror, Outcome, Report};
