use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Normalized video metadata handed to callers.
///
/// Only built by [`crate::metadata::normalize::normalize`], which refuses
/// payloads without a playable url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub title: String,
    pub description: String,
    pub video_url: String,
    /// Empty when upstream has no usable image cut.
    pub poster_url: String,
    /// Seconds.
    pub duration: u64,
    /// Opaque, passed through as upstream formats it.
    pub date: String,
}

/// Why the metadata endpoint did not give us a JSON document.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// Network, DNS, timeout, or body read failure
    #[error("request for {slug} failed: {source}")]
    Transport {
        slug: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request for {slug} returned status {status}")]
    Status { slug: String, status: StatusCode },

    #[error("response for {slug} is not valid json: {source}")]
    Json {
        slug: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot build request url for {slug}: {reason}")]
    Url { slug: String, reason: String },
}

impl FetchError {
    pub fn slug(&self) -> &str {
        match self {
            FetchError::Transport { slug, .. }
            | FetchError::Status { slug, .. }
            | FetchError::Json { slug, .. }
            | FetchError::Url { slug, .. } => slug,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Transport { source, .. } if source.is_timeout())
    }
}

/// Upstream JSON was fetched but is not usable.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("payload has no feeds[0].playbacks[0].url")]
    MissingPlaybackUrl,

    #[error("playback url {0:?} is not a safe http(s) url")]
    UnsafePlaybackUrl(String),
}
