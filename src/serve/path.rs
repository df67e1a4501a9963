//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

/// Decode a request URL into a `/`-trimmed relative path, dropping the
/// query string and fragment.
pub fn url_to_rel(url: &str) -> String {
    use percent_encoding::percent_decode_str;

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}

/// Resolve a relative path under `root`, handling index.html for directories.
pub fn resolve_in(root: &Path, rel: &str) -> Option<PathBuf> {
    // Reject paths with suspicious patterns early
    if rel.split('/').any(|segment| segment == "..") {
        return None;
    }

    // Canonicalize to resolve symlinks and verify path is under root
    let canonical = root.join(rel).canonicalize().ok()?;
    let root_canonical = root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }
    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }
    None
}

/// Strip a route prefix at a segment boundary: `/node_modules` matches
/// `node_modules/x.js` but not `node_modules_old/x.js`.
pub fn strip_route<'a>(rel: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_matches('/');
    let rest = rel.strip_prefix(prefix)?;
    match rest.strip_prefix('/') {
        Some(rest) => Some(rest),
        None if rest.is_empty() => Some(""),
        None => None,
    }
}
