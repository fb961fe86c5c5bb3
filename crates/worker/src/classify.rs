//! Request classification.
//!
//! Rules are checked in a fixed order and the first match wins: static
//! assets, then API calls, then images. Everything else is a navigation.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

pub const STATIC_EXTENSIONS: &[&str] = &["js", "mjs", "css", "woff", "woff2", "ttf", "eot", "otf", "ico", "webmanifest"];

pub const STATIC_PATHS: &[&str] = &["/manifest.json"];

pub const STATIC_PREFIXES: &[&str] = &["/assets/", "/static/"];

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "avif", "bmp"];

/// Database REST, auth, edge function, storage and realtime endpoints.
static API_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(rest|auth|functions|storage|realtime)/v1/").expect("valid API path pattern"));

/// The four request classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    Static,
    Api,
    Image,
    Navigation,
}

/// Lowercased extension of the last path segment.
fn extension(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

pub fn is_static(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    STATIC_PATHS.contains(&lower.as_str())
        || STATIC_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
        || extension(&lower).is_some_and(|ext| STATIC_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_api(path: &str) -> bool {
    path.starts_with("/api/") || API_PATTERN.is_match(path)
}

pub fn is_image(path: &str) -> bool {
    extension(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Classify a request URL.
pub fn classify(url: &Url) -> RequestClass {
    let path = url.path();
    if is_static(path) {
        RequestClass::Static
    } else if is_api(path) {
        RequestClass::Api
    } else if is_image(path) {
        RequestClass::Image
    } else {
        RequestClass::Navigation
    }
}
