use crate::storage::{self, StorageManager};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
const DEFAULT_METADATA_BASE_URL: &str = "https://www.mlb.com/data-service/en/videos";
const DEFAULT_POSTER_CDN_BASE: &str =
    "https://img.mlbstatic.com/mlb-images/image/upload/t_16x9/t_w1536/mlb";
const DEFAULT_USER_AGENT: &str = concat!(
    "mlbv/",
    env!("CARGO_PKG_VERSION"),
    " (video metadata importer)"
);
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Where cached video records are kept
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Files in the base directory, next to config.yaml
    #[default]
    Local,
    /// Process memory, lost on restart
    Memory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Upstream request timeout in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// How long an imported video stays cached, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_metadata_base_url")]
    pub metadata_base_url: String,

    /// Poster urls are `<poster_cdn_base>/<image name>.jpg`
    #[serde(default = "default_poster_cdn_base")]
    pub poster_cdn_base: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Bearer token for import and validate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_token: Option<String>,

    /// Bearer token for everything, including cache clearing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_token: Option<String>,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            metadata_base_url: default_metadata_base_url(),
            poster_cdn_base: default_poster_cdn_base(),
            user_agent: default_user_agent(),
            listen_addr: default_listen_addr(),
            cache_backend: CacheBackend::default(),
            edit_token: None,
            admin_token: None,
            base_path: String::new(),
        }
    }
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_metadata_base_url() -> String {
    DEFAULT_METADATA_BASE_URL.to_string()
}

fn default_poster_cdn_base() -> String {
    DEFAULT_POSTER_CDN_BASE.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn is_http_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be greater than 0");
        }

        if !is_http_url(&self.metadata_base_url) {
            bail!(
                "metadata_base_url must be an http(s) url, got {:?}",
                self.metadata_base_url
            );
        }

        if !is_http_url(&self.poster_cdn_base) {
            bail!(
                "poster_cdn_base must be an http(s) url, got {:?}",
                self.poster_cdn_base
            );
        }

        if self.user_agent.trim().is_empty() {
            bail!("user_agent must not be empty");
        }

        Ok(())
    }

    /// Apply `MLBV_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let lookup = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(value) = lookup("MLBV_FETCH_TIMEOUT") {
            self.fetch_timeout_secs = value
                .parse()
                .with_context(|| format!("MLBV_FETCH_TIMEOUT is not a number of seconds: {value:?}"))?;
        }

        if let Some(value) = lookup("MLBV_CACHE_TTL") {
            self.cache_ttl_secs = value
                .parse()
                .with_context(|| format!("MLBV_CACHE_TTL is not a number of seconds: {value:?}"))?;
        }

        if let Some(value) = lookup("MLBV_LISTEN") {
            self.listen_addr = value;
        }

        if let Some(value) = lookup("MLBV_EDIT_TOKEN") {
            self.edit_token = Some(value);
        }

        if let Some(value) = lookup("MLBV_ADMIN_TOKEN") {
            self.admin_token = Some(value);
        }

        self.validate()
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn load_with(base_path: &str) -> Result<Self> {
        let store = storage::BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str =
            String::from_utf8(store.read(CONFIG_FILE)?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }
}
