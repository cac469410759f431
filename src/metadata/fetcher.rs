use crate::metadata::types::FetchError;
use reqwest::{header, StatusCode};
use serde_json::Value;
use std::error::Error;
use std::time::Duration;
use url::Url;

/// Source of raw video metadata documents.
pub trait VideoFetcher: Send + Sync {
    /// Fetch the raw metadata document for `slug`. Never retries.
    fn fetch(&self, slug: &str) -> Result<Value, FetchError>;

    /// Get the name of this fetcher for logging/debugging
    fn name(&self) -> &'static str;
}

/// mlb.com data-service client.
pub struct MlbFetcher {
    client: reqwest::blocking::Client,
    base_url: Url,
}

impl MlbFetcher {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .http1_only()
            .build()?;

        Self::with_client(client, base_url)
    }

    pub fn with_client(client: reqwest::blocking::Client, base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("metadata base url {base_url} cannot have path segments");
        }

        Ok(Self { client, base_url })
    }

    /// `<base>/<slug>`, with the slug percent-encoded as one path segment.
    pub fn endpoint_url(&self, slug: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Url {
                slug: slug.to_string(),
                reason: format!("{} cannot be a base", self.base_url),
            })?
            .pop_if_empty()
            .push(slug);
        Ok(url)
    }
}

impl VideoFetcher for MlbFetcher {
    fn fetch(&self, slug: &str) -> Result<Value, FetchError> {
        let url = self.endpoint_url(slug)?;
        log::debug!("{slug}: requesting {url}");

        let resp = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .map_err(|source| {
                log::debug!("{slug}: {}", root_cause(&source));
                FetchError::Transport {
                    slug: slug.to_string(),
                    source,
                }
            })?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                slug: slug.to_string(),
                status,
            });
        }

        let body = resp.bytes().map_err(|source| FetchError::Transport {
            slug: slug.to_string(),
            source,
        })?;

        serde_json::from_slice(&body).map_err(|source| FetchError::Json {
            slug: slug.to_string(),
            source,
        })
    }

    fn name(&self) -> &'static str {
        "mlb.com"
    }
}

/// Innermost error message, which for reqwest is usually the useful one.
pub fn root_cause(error: &reqwest::Error) -> String {
    let mut current: &dyn Error = error;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}
