use crate::{
    app::errors::VideoError,
    cache::VideoCache,
    matcher,
    metadata::{self, VideoFetcher, VideoRecord},
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

/// Result of a url check. Never touches network or cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlValidation {
    pub valid: bool,
    pub slug: Option<String>,
}

/// Entry point of the import pipeline: url → slug → cache → fetch →
/// normalize → cache.
///
/// Built once at startup and shared behind an `Arc`. Holds no per-request
/// state, so concurrent imports are independent.
pub struct VideoService {
    cache: VideoCache,
    fetcher: Arc<dyn VideoFetcher>,
    cache_ttl: Duration,
    poster_cdn_base: String,
}

impl VideoService {
    pub fn new(
        cache: VideoCache,
        fetcher: Arc<dyn VideoFetcher>,
        cache_ttl: Duration,
        poster_cdn_base: &str,
    ) -> Self {
        Self {
            cache,
            fetcher,
            cache_ttl,
            poster_cdn_base: poster_cdn_base.to_string(),
        }
    }

    /// Import a video by its public url.
    ///
    /// A cached record short-circuits the fetch. Failures are not retried.
    pub fn import_by_url(&self, url: &str) -> Result<VideoRecord, VideoError> {
        let slug = matcher::extract_slug(url).ok_or_else(|| {
            log::debug!("rejected url {url:?}");
            VideoError::InvalidUrl
        })?;

        if let Some(record) = self.cache.get(&slug) {
            log::debug!("slug={slug} outcome=cache_hit");
            return Ok(record);
        }

        let fetcher = self.fetcher.name();
        let raw = self.fetcher.fetch(&slug).map_err(|err| {
            log::warn!(
                "fetcher={fetcher} slug={} outcome=fetch_error timeout={} err={err}",
                err.slug(),
                err.is_timeout()
            );
            VideoError::FetchFailed
        })?;

        let record = metadata::normalize(&raw, &self.poster_cdn_base).map_err(|err| {
            log::warn!("fetcher={fetcher} slug={slug} outcome=invalid_payload err={err}");
            VideoError::FetchFailed
        })?;

        if let Err(err) = self.cache.set(&slug, &record, self.cache_ttl) {
            log::warn!("slug={slug} failed to cache record: {err}");
        }

        log::info!("fetcher={fetcher} slug={slug} outcome=imported");
        Ok(record)
    }

    pub fn validate_url(&self, url: &str) -> UrlValidation {
        Self::check_url(url)
    }

    /// Same as [`Self::validate_url`], usable without building a service.
    pub fn check_url(url: &str) -> UrlValidation {
        if !matcher::is_valid(url) {
            return UrlValidation {
                valid: false,
                slug: None,
            };
        }

        let slug = matcher::extract_slug(url);
        UrlValidation {
            valid: slug.is_some(),
            slug,
        }
    }

    /// Drop one cached slug, or everything when `slug` is `None`.
    /// Returns how many entries were removed.
    pub fn clear_cache(&self, slug: Option<&str>) -> Result<usize, VideoError> {
        let cleared = match slug {
            Some(slug) => usize::from(self.cache.delete(slug)?),
            None => self.cache.delete_all()?,
        };

        log::info!("cleared {cleared} cached video(s) slug={slug:?}");
        Ok(cleared)
    }
}
