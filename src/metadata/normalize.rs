use crate::metadata::types::{ValidationError, VideoRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde_json::Value;
use url::Url;

static PARENTHETICAL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(.*?\)").expect("Failed to compile parenthetical regex"));
static HASHTAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\w+").expect("Failed to compile hashtag regex"));
static WHITESPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));
static INLINE_SPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\x0B\x0C]+").expect("Failed to compile inline space regex"));

const PLAYBACK_URL_POINTER: &str = "/feeds/0/playbacks/0/url";
const POSTER_SRC_POINTER: &str = "/feeds/0/image/cuts/2/src";

/// Turn a raw metadata document into a [`VideoRecord`].
///
/// Only a missing or unsafe playback url is an error, every other field
/// degrades to its empty value.
pub fn normalize(raw: &Value, poster_cdn_base: &str) -> Result<VideoRecord, ValidationError> {
    let playback = raw
        .pointer(PLAYBACK_URL_POINTER)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or(ValidationError::MissingPlaybackUrl)?;

    let video_url = sanitize_url(playback)
        .ok_or_else(|| ValidationError::UnsafePlaybackUrl(playback.to_string()))?;

    Ok(VideoRecord {
        title: clean_title(str_field(raw, "title")),
        description: clean_description(str_field(raw, "description")),
        video_url,
        poster_url: poster_url(raw, poster_cdn_base),
        duration: coerce_duration(raw.get("duration")),
        date: clean_plain(str_field(raw, "date")),
    })
}

fn str_field<'a>(raw: &'a Value, key: &str) -> &'a str {
    raw.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Make `url` a safe absolute http(s) url.
///
/// Protocol-relative urls are upgraded to https. Unsafe characters come
/// back percent-encoded. Returns `None` for anything else.
pub fn sanitize_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    let url_to_parse = if url.starts_with("//") {
        format!("https:{}", url)
    } else {
        url.to_string()
    };

    let parsed = Url::parse(&url_to_parse).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.host_str()?;

    Some(parsed.to_string())
}

/// Poster on the image CDN, named after the third image cut.
fn poster_url(raw: &Value, poster_cdn_base: &str) -> String {
    let Some(src) = raw
        .pointer(POSTER_SRC_POINTER)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|src| !src.is_empty())
    else {
        return String::new();
    };

    let path = src.split(&['?', '#'][..]).next().unwrap_or_default();
    let filename = path.rsplit('/').next().unwrap_or_default();
    if filename.is_empty() {
        return String::new();
    }

    let poster = format!("{}/{}.jpg", poster_cdn_base.trim_end_matches('/'), filename);
    sanitize_url(&poster).unwrap_or_default()
}

pub fn clean_title(title: &str) -> String {
    let title = PARENTHETICAL_REGEX.replace_all(title, "");
    let title = strip_markup(&title);
    collapse_whitespace(&title)
}

/// Hashtags are removed after markup so encoded entities like `&#39;` survive.
pub fn clean_description(description: &str) -> String {
    let description = strip_markup(description);
    let description = HASHTAG_REGEX.replace_all(&description, "");

    description
        .lines()
        .map(|line| INLINE_SPACE_REGEX.replace_all(line, " ").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn clean_plain(value: &str) -> String {
    collapse_whitespace(&strip_markup(value))
}

fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_REGEX.replace_all(value, " ").trim().to_string()
}

const MAX_STRIP_PASSES: usize = 8;

/// Text content of an html fragment, without script and style bodies.
///
/// Decoding `&lt;b&gt;` yields `<b>`, so passes repeat until the text
/// stops changing.
fn strip_markup(input: &str) -> String {
    let mut text = input.to_string();
    for _ in 0..MAX_STRIP_PASSES {
        if !text.contains('<') && !text.contains('&') {
            return text;
        }
        let next = text_content(&text);
        if next == text {
            return text;
        }
        text = next;
    }

    // still decoding after every pass; drop what could open a tag
    text.replace(&['<', '>'][..], "")
}

fn text_content(input: &str) -> String {
    let fragment = Html::parse_fragment(input);
    let mut text = String::with_capacity(input.len());

    for node in fragment.root_element().descendants() {
        let Some(chunk) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|parent| {
            parent
                .value()
                .as_element()
                .map(|el| matches!(el.name(), "script" | "style"))
                .unwrap_or(false)
        });

        if !hidden {
            text.push_str(chunk);
        }
    }

    text
}

/// Seconds from a json number, a decimal string, or `MM:SS` / `HH:MM:SS`.
pub fn coerce_duration(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f > 0.0)
                    .map(|f| f as u64)
            })
            .unwrap_or(0),
        Some(Value::String(s)) => parse_duration_str(s.trim()).unwrap_or(0),
        _ => 0,
    }
}

fn parse_duration_str(value: &str) -> Option<u64> {
    if value.contains(':') {
        let parts = value
            .split(':')
            .map(|part| part.trim().parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;

        if !(2..=3).contains(&parts.len()) {
            return None;
        }

        return parts
            .into_iter()
            .try_fold(0u64, |acc, part| acc.checked_mul(60)?.checked_add(part));
    }

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(seconds);
    }

    value
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f as u64)
}
