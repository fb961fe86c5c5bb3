//! Path and query content checks.

use url::Url;

/// Query fragments that indicate a script-injection attempt.
pub const INJECTION_MARKERS: &[&str] = &[
    "<script",
    "javascript:",
    "onload=",
    "onerror=",
    "onclick=",
    "onmouseover=",
    "onfocus=",
];

/// Whether the path contains `..`, literally or percent-encoded.
pub fn has_path_traversal(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.contains("..") || lower.contains("%2e%2e") || lower.contains("%2e.") || lower.contains(".%2e")
}

/// The first injection marker found in the query, raw or decoded.
pub fn find_injection_marker(url: &Url) -> Option<&'static str> {
    let raw = url.query()?.to_ascii_lowercase();
    let decoded = url
        .query_pairs()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
        .to_lowercase();

    INJECTION_MARKERS
        .iter()
        .copied()
        .find(|marker| raw.contains(marker) || decoded.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_traversal_literal_and_encoded() {
        assert!(has_path_traversal("/assets/..%2fsecret"));
        assert!(has_path_traversal("/a/%2E%2E%2fetc"));
        assert!(has_path_traversal("/a/.%2e%2fetc"));
        assert!(!has_path_traversal("/assets/app.js"));
        assert!(!has_path_traversal("/"));
    }

    #[test]
    fn test_parser_already_collapses_dot_segments() {
        // Whole-segment traversal is resolved by the URL parser before we see it.
        assert_eq!(url("https://beekon.ai/a/../b").path(), "/b");
    }

    #[test]
    fn test_script_tag_in_query_is_found_after_encoding() {
        let u = url("https://beekon.ai/api/search?q=<script>alert(1)</script>");
        assert!(u.query().unwrap().contains("%3C"));
        assert_eq!(find_injection_marker(&u), Some("<script"));
    }

    #[test]
    fn test_event_handler_and_scheme_markers() {
        assert_eq!(find_injection_marker(&url("https://beekon.ai/x?onerror=1")), Some("onerror="));
        assert_eq!(find_injection_marker(&url("https://beekon.ai/x?next=JavaScript:void(0)")), Some("javascript:"));
        assert_eq!(find_injection_marker(&url("https://beekon.ai/x?q=%3Cscript")), Some("<script"));
    }

    #[test]
    fn test_clean_query() {
        assert_eq!(find_injection_marker(&url("https://beekon.ai/api/x?website_id=1&range=7d")), None);
        assert_eq!(find_injection_marker(&url("https://beekon.ai/api/x")), None);
    }
}
