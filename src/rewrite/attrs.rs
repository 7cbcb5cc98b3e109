// src/rewrite/attrs.rs
// =============================================================================
// Typed access to the few attributes the rewriter cares about.
//
// Instead of poking at arbitrary attribute names, each element kind has one
// function that says which attribute holds its reference and what role the
// referenced URL plays:
//
//   <a href>                     -> Page
//   <link rel="stylesheet" href> -> Resource
//   <link href> (anything else)  -> Page
//   <img|script|source|video|audio src>  -> Resource
//   ... with data-src as the fallback when src is missing (lazy loading)
// =============================================================================

use lol_html::errors::AttributeNameError;
use lol_html::html_content::Element;

use crate::site::Role;

/// An attribute that can carry a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAttr {
    Href,
    Src,
    DataSrc,
}

impl LinkAttr {
    pub fn name(self) -> &'static str {
        match self {
            LinkAttr::Href => "href",
            LinkAttr::Src => "src",
            LinkAttr::DataSrc => "data-src",
        }
    }
}

/// A reference read from an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub attr: LinkAttr,
    pub value: String,
    pub role: Role,
}

/// `<a href>`: a page to crawl.
pub fn anchor_reference(el: &Element) -> Option<Reference> {
    read(el, LinkAttr::Href, Role::Page)
}

/// `<link href>`: a stylesheet is a resource, everything else a page.
pub fn link_reference(el: &Element) -> Option<Reference> {
    let role = if is_stylesheet(el.get_attribute("rel").as_deref()) {
        Role::Resource
    } else {
        Role::Page
    };
    read(el, LinkAttr::Href, role)
}

/// Media and script elements: `src`, or `data-src` when `src` is missing or empty.
pub fn media_reference(el: &Element) -> Option<Reference> {
    read(el, LinkAttr::Src, Role::Resource).or_else(|| read(el, LinkAttr::DataSrc, Role::Resource))
}

/// Replaces the attribute the reference was read from.
pub fn set_reference(el: &mut Element, reference: &Reference, value: &str) -> Result<(), AttributeNameError> {
    el.set_attribute(reference.attr.name(), value)
}

fn read(el: &Element, attr: LinkAttr, role: Role) -> Option<Reference> {
    el.get_attribute(attr.name())
        .filter(|value| !value.trim().is_empty())
        .map(|value| Reference { attr, value, role })
}

// rel is a space separated token list, e.g. rel="preload stylesheet"
fn is_stylesheet(rel: Option<&str>) -> bool {
    rel.map(|rel| {
        rel.split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case("stylesheet"))
    })
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_names() {
        assert_eq!(LinkAttr::Href.name(), "href");
        assert_eq!(LinkAttr::Src.name(), "src");
        assert_eq!(LinkAttr::DataSrc.name(), "data-src");
    }

    #[test]
    fn test_is_stylesheet() {
        assert!(is_stylesheet(Some("stylesheet")));
        assert!(is_stylesheet(Some("preload StyleSheet")));
        assert!(!is_stylesheet(Some("icon")));
        assert!(!is_stylesheet(None));
    }
}
