// src/rewrite/mod.rs
// =============================================================================
// This module turns a fetched page into its offline copy.
//
// Submodules:
// - attrs: which attribute of which element carries a reference
// - html: the rewrite pass itself (pure, no I/O)
//
// `rewrite_page` runs the pass and then handles what it found:
// - resources are downloaded right away through the injected `ResourceSink`
// - pages are handed back so the caller can enqueue them
//
// Resources are fetched during the rewrite (not queued) so a stylesheet used
// by fifty pages is downloaded by whichever worker sees it first, exactly once.
// =============================================================================

mod attrs;
mod html;

use std::path::Path;

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::site::{CrawlTarget, Role, Site};

use html::rewrite_html_from;

/// Downloads resources found while rewriting.
///
/// Implementations must make sure each resource URL is fetched and written
/// at most once for the whole crawl, no matter how many pages reference it.
#[async_trait]
pub trait ResourceSink: Send + Sync {
    async fn ensure(&self, target: &CrawlTarget, local_path: &Path);
}

/// A rewritten page plus the pages it links to.
#[derive(Debug, Clone)]
pub struct RewrittenPage {
    pub html: String,
    pub pages: Vec<CrawlTarget>,
}

/// Rewrites `html` and downloads every in-scope resource it references.
///
/// Fails only if the HTML could not be rewritten; in that case nothing has
/// been downloaded and the caller should keep the original content.
///
/// `served_from` is the URL the body came from after redirects; relative
/// references resolve against it. `memory_limit` bounds the rewriter's
/// buffers for this page.
pub async fn rewrite_page(
    html: &str,
    page_url: &Url,
    served_from: &Url,
    site: &Site,
    resources: &dyn ResourceSink,
    memory_limit: usize,
) -> Result<RewrittenPage> {
    let rewritten = rewrite_html_from(html, page_url, served_from, site, memory_limit)?;

    let mut pages = Vec::new();
    for discovery in rewritten.discovered {
        match discovery.target.role {
            Role::Resource => resources.ensure(&discovery.target, &discovery.local_path).await,
            Role::Page => pages.push(discovery.target),
        }
    }

    Ok(RewrittenPage {
        html: rewritten.html,
        pages,
    })
}
