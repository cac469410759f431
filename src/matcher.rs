use once_cell::sync::Lazy;
use regex::Regex;

/// Recognized mlb.com video URL. The first capture group is the slug.
///
/// Both [`is_valid`] and [`extract_slug`] go through this one pattern.
static VIDEO_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:[A-Za-z0-9-]+\.)?mlb\.com/video/([^/?&#]+)")
        .expect("Failed to compile mlb.com video regex")
});

/// Returns true if `url` is an mlb.com video URL with a slug.
pub fn is_valid(url: &str) -> bool {
    VIDEO_URL_REGEX.is_match(url.trim())
}

/// Extract the video slug from an mlb.com video URL.
///
/// Surrounding whitespace is ignored, nothing else is normalized.
pub fn extract_slug(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    VIDEO_URL_REGEX
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}
