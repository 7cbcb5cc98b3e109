// src/rewrite/html.rs
// =============================================================================
// This module rewrites a downloaded page so it works offline.
//
// We use two HTML crates:
// - `scraper` for a quick read-only look at the document (is there a
//   <base href> that changes how relative links resolve?)
// - `lol_html` for the rewrite itself. It streams through the markup and lets
//   us change attributes in place, so everything we don't touch comes out
//   byte-for-byte as it went in.
//
// For each reference we:
// 1. resolve it against the page (or its <base href>)
// 2. skip it if it leaves the site
// 3. compute its local file with the path mapper
// 4. point the attribute at that file, relative to this page
// 5. remember it as a discovery (page to crawl or resource to download)
//
// Nothing here touches the network or the disk. The caller decides what to do
// with the discoveries.
// =============================================================================

use std::cell::RefCell;
use std::collections::HashSet;
use std::error::Error;
use std::path::PathBuf;

use lol_html::html_content::Element;
use lol_html::{element, HtmlRewriter, MemorySettings, Settings};
use scraper::{Html, Selector};
use url::Url;

use super::attrs::{self, Reference};
use crate::error::{MirrorError, Result};
use crate::site::{CrawlTarget, Role, Site};

type HandlerResult = std::result::Result<(), Box<dyn Error + Send + Sync>>;

/// An in-scope reference found while rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub target: CrawlTarget,
    pub local_path: PathBuf,
}

/// Output of one rewrite pass.
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub html: String,
    /// Unique per (URL, role), in document order.
    pub discovered: Vec<Discovery>,
}

// lol_html's own default for the parsing buffer
const PREALLOCATED_BUFFER: usize = 1024;

/// Rewrites every in-scope link and asset reference in `html`.
///
/// `page_url` is the URL the document was fetched from.
#[cfg(test)]
pub fn rewrite_html(html: &str, page_url: &Url, site: &Site) -> Result<Rewritten> {
    rewrite_html_from(html, page_url, page_url, site, usize::MAX)
}

/// Rewrites a page that may have been redirected.
///
/// References resolve against `served_from` (where the body really came
/// from, e.g. `/docs/` for a request to `/docs`), while the rewritten values
/// stay relative to the file `page_url` is saved as.
///
/// `memory_limit` caps what the rewriter may buffer; going over it is a
/// parse failure.
pub fn rewrite_html_from(
    html: &str,
    page_url: &Url,
    served_from: &Url,
    site: &Site,
    memory_limit: usize,
) -> Result<Rewritten> {
    let context = PageContext {
        site,
        base: document_base(html, served_from),
        page_path: site.map_path(page_url, Role::Page),
        discovered: RefCell::new(Vec::new()),
        seen: RefCell::new(HashSet::new()),
    };

    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("a[href]", |el| context.visit(el, attrs::anchor_reference)),
                element!("link[href]", |el| context.visit(el, attrs::link_reference)),
                element!("img", |el| context.visit(el, attrs::media_reference)),
                element!("script", |el| context.visit(el, attrs::media_reference)),
                element!("source", |el| context.visit(el, attrs::media_reference)),
                element!("video", |el| context.visit(el, attrs::media_reference)),
                element!("audio", |el| context.visit(el, attrs::media_reference)),
                // Offline copies must resolve against their own location
                element!("base[href]", |el| {
                    el.remove();
                    Ok(())
                }),
            ],
            memory_settings: MemorySettings {
                preallocated_parsing_buffer_size: PREALLOCATED_BUFFER.min(memory_limit),
                max_allowed_memory_usage: memory_limit,
            },
            ..Settings::default()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| MirrorError::parse(page_url.as_str(), e))?;
    rewriter
        .end()
        .map_err(|e| MirrorError::parse(page_url.as_str(), e))?;

    let html = String::from_utf8(output).map_err(|e| MirrorError::parse(page_url.as_str(), e))?;

    Ok(Rewritten {
        html,
        discovered: context.discovered.into_inner(),
    })
}

// State shared by all element handlers of one rewrite pass
struct PageContext<'a> {
    site: &'a Site,
    base: Url,
    page_path: PathBuf,
    discovered: RefCell<Vec<Discovery>>,
    seen: RefCell<HashSet<(String, Role)>>,
}

impl PageContext<'_> {
    fn visit(&self, el: &mut Element, read: fn(&Element) -> Option<Reference>) -> HandlerResult {
        let Some(reference) = read(el) else {
            return Ok(());
        };

        let Some(absolute) = self.site.resolve(&self.base, &reference.value) else {
            return Ok(());
        };

        if !self.site.in_scope(&absolute) {
            return Ok(());
        }

        let fragment = absolute.fragment().map(str::to_string);
        let target = CrawlTarget::new(absolute, reference.role);
        let local_path = self.site.map_path(&target.url, target.role);
        let href = self
            .site
            .relative_href(&self.page_path, &local_path, fragment.as_deref());

        attrs::set_reference(el, &reference, &href)?;

        if self
            .seen
            .borrow_mut()
            .insert((target.key().to_string(), target.role))
        {
            self.discovered
                .borrow_mut()
                .push(Discovery { target, local_path });
        }

        Ok(())
    }
}

// The URL relative references resolve against: <base href> if present and
// valid, otherwise the page URL.
fn document_base(html: &str, page_url: &Url) -> Url {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("base[href]") else {
        return page_url.clone();
    };

    document
        .select(&selector)
        .next()
        .and_then(|base| base.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone())
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why RefCell?
//    - lol_html calls a separate closure for each selector
//    - All of them need to push into the same discovery list
//    - RefCell lets several closures share one value and still mutate it,
//      with the borrow rules checked at runtime instead of compile time
//
// 2. Why not just use scraper for everything?
//    - scraper builds a full DOM tree and serializes it back out
//    - That output is "equivalent" HTML but not identical to the input
//    - lol_html only touches the attributes we change
//
// 3. What does `let ... else` do?
//    - It binds a pattern or runs the else block, which must return
//    - Handy for "skip this element if X is missing" early exits
// -----------------------------------------------------------------------------
