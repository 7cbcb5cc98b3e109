// src/site/scope.rs
// =============================================================================
// Resolving references and deciding whether they belong to the mirrored site.
//
// A reference found in a page can be:
// - absolute ("https://example.com/about")
// - host-relative ("/about")
// - path-relative ("about", "../about")
// - something we never mirror ("mailto:", "javascript:", "#top", "data:")
//
// We resolve everything against the page URL with `Url::join`, which follows
// the standard base-URI rules, and then compare hosts. Nothing here returns an
// error: a reference we can't make sense of is simply out of scope.
// =============================================================================

use url::Url;

/// Resolves a (possibly relative) reference against `base`.
///
/// Returns None for references that never point at a mirrorable document:
/// empty values, fragment-only anchors, and scripting/mail/phone/data links.
pub fn resolve(base: &Url, reference: &str) -> Option<Url> {
    let reference = reference.trim();

    if reference.is_empty()
        || reference.starts_with('#')
        || reference.starts_with("mailto:")
        || reference.starts_with("tel:")
        || reference.starts_with("javascript:")
        || reference.starts_with("data:")
    {
        return None;
    }

    base.join(reference).ok()
}

/// True if `url` is on the crawl's host (and explicit port, if any).
///
/// Relative references have already been given the base host by `resolve`,
/// so they land here as same-host absolute URLs.
pub fn in_scope(url: &Url, host: &str, port: Option<u16>) -> bool {
    if !is_web_scheme(url) {
        return false;
    }

    match url.host_str() {
        Some(candidate) => candidate.eq_ignore_ascii_case(host) && url.port() == port,
        None => false,
    }
}

/// Only http and https URLs are ever fetched.
pub fn is_web_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Drops the fragment. Two URLs that differ only by `#...` are the same
/// document and must dedup to one entry.
pub fn canonicalize(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/docs/page").unwrap()
    }

    #[test]
    fn test_resolve_host_relative() {
        let url = resolve(&base(), "/about").unwrap();
        assert_eq!(url.as_str(), "https://example.com/about");
    }

    #[test]
    fn test_resolve_path_relative() {
        let url = resolve(&base(), "../img/a.png").unwrap();
        assert_eq!(url.as_str(), "https://example.com/img/a.png");
    }

    #[test]
    fn test_resolve_absolute_passes_through() {
        let url = resolve(&base(), "https://other.com/x").unwrap();
        assert_eq!(url.as_str(), "https://other.com/x");
    }

    #[test]
    fn test_resolve_protocol_relative() {
        let url = resolve(&base(), "//example.com/style.css").unwrap();
        assert_eq!(url.as_str(), "https://example.com/style.css");
    }

    #[test]
    fn test_resolve_skips_special_references() {
        assert!(resolve(&base(), "#section").is_none());
        assert!(resolve(&base(), "mailto:me@example.com").is_none());
        assert!(resolve(&base(), "javascript:void(0)").is_none());
        assert!(resolve(&base(), "tel:+123").is_none());
        assert!(resolve(&base(), "data:image/png;base64,AAAA").is_none());
        assert!(resolve(&base(), "   ").is_none());
    }

    #[test]
    fn test_in_scope_same_host() {
        let url = Url::parse("https://example.com/a").unwrap();
        assert!(in_scope(&url, "example.com", None));
    }

    #[test]
    fn test_in_scope_ignores_scheme_and_case() {
        let url = Url::parse("http://EXAMPLE.com/a").unwrap();
        assert!(in_scope(&url, "example.com", None));
    }

    #[test]
    fn test_in_scope_resolved_relatives() {
        for reference in ["/about", "about", "./about", "../x/y.png"] {
            let url = resolve(&base(), reference).unwrap();
            assert!(in_scope(&url, "example.com", None), "{} should be in scope", reference);
        }
    }

    #[test]
    fn test_out_of_scope_other_host() {
        let url = Url::parse("https://other.com/x").unwrap();
        assert!(!in_scope(&url, "example.com", None));

        let sub = Url::parse("https://cdn.example.com/x").unwrap();
        assert!(!in_scope(&sub, "example.com", None));
    }

    #[test]
    fn test_out_of_scope_other_port() {
        let url = Url::parse("http://example.com:8080/x").unwrap();
        assert!(!in_scope(&url, "example.com", None));
        assert!(in_scope(&url, "example.com", Some(8080)));
    }

    #[test]
    fn test_out_of_scope_non_web_scheme() {
        let url = Url::parse("ftp://example.com/file").unwrap();
        assert!(!in_scope(&url, "example.com", None));
    }

    #[test]
    fn test_canonicalize_drops_fragment_keeps_query() {
        let url = canonicalize(Url::parse("https://example.com/p?x=1#top").unwrap());
        assert_eq!(url.as_str(), "https://example.com/p?x=1");
    }
}
