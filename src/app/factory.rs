use crate::{
    app::service::VideoService,
    cache::VideoCache,
    config::{CacheBackend, Config},
    metadata::MlbFetcher,
    storage::{self, StorageManager},
};
use anyhow::{Context, Result};
use homedir::my_home;
use std::sync::Arc;
use std::time::Duration;

/// Builds the long-lived application components from configuration
pub struct AppFactory;

impl AppFactory {
    /// Base directory from `MLBV_BASE_PATH`, or `~/.local/share/mlbv`.
    pub fn get_base_path() -> Result<String> {
        if let Ok(base_path) = std::env::var("MLBV_BASE_PATH") {
            return Ok(base_path);
        }

        let home = my_home()
            .context("Could not determine home directory")?
            .context("Home directory path is empty")?;
        Ok(format!("{}/.local/share/mlbv", home.to_string_lossy()))
    }

    /// Load config.yaml and apply environment overrides
    pub fn create_config(base_path: &str) -> Result<Config> {
        std::fs::create_dir_all(base_path)
            .context("Failed to create application base directory")?;

        let mut config = Config::load_with(base_path)?;
        config.apply_env()?;
        Ok(config)
    }

    /// The shared key-value store the cache lives in
    pub fn create_storage(config: &Config) -> Result<Arc<dyn StorageManager>> {
        let store: Arc<dyn StorageManager> = match config.cache_backend {
            CacheBackend::Local => Arc::new(storage::BackendLocal::new(config.base_path())?),
            CacheBackend::Memory => Arc::new(storage::BackendMemory::new()),
        };
        Ok(store)
    }

    /// Must run outside of an async runtime: the blocking http client
    /// refuses to be built inside one.
    pub fn create_service(config: &Config) -> Result<VideoService> {
        let fetcher = MlbFetcher::new(
            &config.metadata_base_url,
            Duration::from_secs(config.fetch_timeout_secs),
            &config.user_agent,
        )
        .context("Failed to build mlb.com client")?;

        let cache = VideoCache::new(Self::create_storage(config)?);

        log::debug!(
            "video service ready: backend={:?} ttl={}s timeout={}s",
            config.cache_backend,
            config.cache_ttl_secs,
            config.fetch_timeout_secs
        );

        Ok(VideoService::new(
            cache,
            Arc::new(fetcher),
            Duration::from_secs(config.cache_ttl_secs),
            &config.poster_cdn_base,
        ))
    }
}
