use std::sync::LazyLock;

use regex::Regex;

static IMG_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img[^>]+src="([^">]+)""#).unwrap());

/// Lazily yield every `<img ... src="...">` location in `markup`, left to right.
///
/// Tags without a quoted `src` simply don't match; the scan resumes after them.
/// Calling again restarts from the beginning of the markup.
pub fn scan_references(markup: &str) -> impl Iterator<Item = &str> + '_ {
    IMG_SRC_RE
        .captures_iter(markup)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

/// Rewrite a raw `src` value into an absolute location under `origin`.
pub fn normalize_reference(raw: &str, origin: &str) -> String {
    let origin = origin.trim_end_matches('/');
    if raw.starts_with("//") {
        format!("https:{}", raw)
    } else if raw.starts_with('/') {
        format!("{}{}", origin, raw)
    } else if !raw.starts_with("http") {
        let rest = raw.strip_prefix("./").unwrap_or(raw);
        format!("{}/{}", origin, rest)
    } else {
        raw.to_string()
    }
}
