// src/site/mod.rs
// =============================================================================
// This module describes the site being mirrored.
//
// Submodules:
// - scope: resolving references and deciding whether a URL belongs to the site
// - paths: mapping a remote URL to a file inside the mirror root
//
// The `Site` struct ties both together. It is built once from the seed URL and
// then shared read-only by every worker, so it needs no locking.
// =============================================================================

mod paths;
mod scope;

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{MirrorError, Result};

pub use paths::{encode_href, mirror_dir_name};
pub use scope::canonicalize;

/// How a URL was discovered, which decides how it is stored and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// A document we crawl further (`<a href>`, non-stylesheet `<link href>`)
    Page,
    /// An asset downloaded once during the rewrite pass (images, scripts, CSS)
    Resource,
}

/// A URL waiting to be processed, with the role it was discovered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrawlTarget {
    pub url: Url,
    pub role: Role,
}

impl CrawlTarget {
    /// Builds a target from an already resolved URL.
    ///
    /// The fragment is stripped so `page#a` and `page#b` are the same target.
    pub fn new(url: Url, role: Role) -> Self {
        Self {
            url: canonicalize(url),
            role,
        }
    }

    pub fn page(url: Url) -> Self {
        Self::new(url, Role::Page)
    }

    #[cfg(test)]
    pub fn resource(url: Url) -> Self {
        Self::new(url, Role::Resource)
    }

    /// The string used for dedup in the visited set and the resource map.
    pub fn key(&self) -> &str {
        self.url.as_str()
    }
}

/// The crawl's fixed target host and the local directory mirroring it.
#[derive(Debug, Clone)]
pub struct Site {
    seed: Url,
    host: String,
    port: Option<u16>,
    root: PathBuf,
}

impl Site {
    /// Creates the site description for `seed`, placing the mirror root
    /// (`mirror_<host>`) inside `output_dir`.
    ///
    /// Fails if the seed is not an http(s) URL with a host.
    pub fn new(seed: &Url, output_dir: &Path) -> Result<Self> {
        if !scope::is_web_scheme(seed) {
            return Err(MirrorError::setup(format!(
                "URL must start with http:// or https://: {}",
                seed
            )));
        }

        let host = seed
            .host_str()
            .ok_or_else(|| MirrorError::setup(format!("URL has no host: {}", seed)))?
            .to_ascii_lowercase();

        Ok(Self {
            seed: canonicalize(seed.clone()),
            host,
            port: seed.port(),
            root: output_dir.join(mirror_dir_name(seed)),
        })
    }

    /// The seed URL, without fragment.
    pub fn seed(&self) -> &Url {
        &self.seed
    }

    /// The host every in-scope URL must share.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The mirror root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `reference` against `base`. See [`scope::resolve`].
    pub fn resolve(&self, base: &Url, reference: &str) -> Option<Url> {
        scope::resolve(base, reference)
    }

    /// True if `url` belongs to this site and can be mirrored.
    pub fn in_scope(&self, url: &Url) -> bool {
        scope::in_scope(url, &self.host, self.port)
    }

    /// Local file for `url` under the mirror root. See [`paths::map_path`].
    pub fn map_path(&self, url: &Url, role: Role) -> PathBuf {
        self.root.join(paths::map_path(url, role))
    }

    /// The attribute value a page at `from_page` should use to reach `target`.
    ///
    /// The value is relative to the page's own directory and percent-encoded,
    /// with the target's fragment re-appended when it had one.
    pub fn relative_href(&self, from_page: &Path, target: &Path, fragment: Option<&str>) -> String {
        let from_dir = from_page.parent().unwrap_or(&self.root);
        let relative = pathdiff::diff_paths(target, from_dir).unwrap_or_else(|| target.to_path_buf());

        let mut href = encode_href(&relative);
        if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
            href.push('#');
            href.push_str(fragment);
        }
        href
    }

    /// Creates the mirror root. Failing here is fatal for the run.
    pub fn create_root(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| MirrorError::setup(format!("cannot create {}: {}", self.root.display(), e)))
    }
}
