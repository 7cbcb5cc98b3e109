// src/site/paths.rs
// =============================================================================
// Mapping remote URLs to local files.
//
// Rules:
// - "" and "/"           -> index.html
// - "/docs/"             -> docs/index.html
// - "/about" (Page)      -> about.html      (extension added for pages only)
// - "/logo" (Resource)   -> logo            (resources keep their name as-is)
// - "/a.php?x=1"         -> a@x=1.php       (query folded into the file name)
// - "/p?a=1&b=2"         -> p@a=1%26b=2.html
//
// Path segments are percent-decoded so "a%20b.png" becomes the file "a b.png".
// When we turn a local path back into an href we encode it again, so the
// browser lands on the same file.
//
// Two different URLs must never share a file. Every character that can't be
// kept as-is ('@', '%', separators, anything odd in a query) is written as
// %XX, and '%' itself is escaped, so the folding can always be undone. Long
// queries are cut and tagged with a hash of the full query.
//
// This is a pure function of the URL and role. It never touches the disk;
// whoever writes the file creates the parent directories.
// =============================================================================

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use url::Url;

use super::Role;

const INDEX_FILE: &str = "index.html";

// Keeps file names well under common filesystem limits
const MAX_QUERY_LEN: usize = 120;

// Hex digits of the query hash kept after a cut
const QUERY_HASH_LEN: usize = 16;

/// Maps `url` to a path relative to the mirror root.
pub fn map_path(url: &Url, role: Role) -> PathBuf {
    let raw_path = url.path();
    let mut segments: Vec<String> = raw_path.split('/').filter_map(decode_segment).collect();

    let names_directory = raw_path.is_empty() || raw_path.ends_with('/');
    let mut file_name = match segments.pop() {
        Some(last) if !names_directory => last,
        Some(last) => {
            segments.push(last);
            INDEX_FILE.to_string()
        }
        None => INDEX_FILE.to_string(),
    };

    if role == Role::Page && Path::new(&file_name).extension().is_none() {
        file_name.push_str(".html");
    }

    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        file_name = with_query(&file_name, query);
    }

    let mut path: PathBuf = segments.into_iter().collect();
    path.push(file_name);
    path
}

/// Directory name for the mirror of `seed`: `mirror_<host>[_<port>]`.
pub fn mirror_dir_name(seed: &Url) -> String {
    let host = seed.host_str().unwrap_or("unknown").to_ascii_lowercase();
    let name = match seed.port() {
        Some(port) => format!("mirror_{}_{}", host, port),
        None => format!("mirror_{}", host),
    };
    name.replace([':', '[', ']'], "_")
}

/// Turns a relative local path into an href, percent-encoding each segment.
pub fn encode_href(relative: &Path) -> String {
    let parts: Vec<Cow<'_, str>> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(Cow::Owned(
                urlencoding::encode(&name.to_string_lossy()).into_owned(),
            )),
            Component::ParentDir => Some(Cow::Borrowed("..")),
            _ => None,
        })
        .collect();

    parts.join("/")
}

// Decodes one URL path segment into a safe file name component.
// Returns None for segments that must not appear in a local path.
fn decode_segment(segment: &str) -> Option<String> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return None;
    }

    let decoded = urlencoding::decode(segment)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| segment.to_string());

    let cleaned = escape(&decoded, |c| !matches!(c, '%' | '@' | '/' | '\\' | '\0'));

    match cleaned.as_str() {
        "" | "." | ".." => None,
        _ => Some(cleaned),
    }
}

// Writes every char rejected by `keep` as %XX (one per UTF-8 byte).
fn escape(text: &str, keep: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if keep(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    out
}

// The query as it appears in a file name. Cut queries end in "~<hash>";
// '~' is always escaped otherwise, so a cut name can't match an uncut one.
fn query_token(query: &str) -> String {
    // '.' is escaped too, so the extension split after the query is unambiguous
    let escaped = escape(query, |c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '='));
    if escaped.len() <= MAX_QUERY_LEN {
        return escaped;
    }

    let digest = hex::encode(Sha256::digest(query.as_bytes()));
    format!("{}~{}", &escaped[..MAX_QUERY_LEN], &digest[..QUERY_HASH_LEN])
}

// Inserts "@<query>" between the file stem and its extension.
fn with_query(file_name: &str, query: &str) -> String {
    let sanitized = query_token(query);

    let path = Path::new(file_name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!(
            "{}@{}.{}",
            stem.to_string_lossy(),
            sanitized,
            ext.to_string_lossy()
        ),
        _ => format!("{}@{}", file_name, sanitized),
    }
}
