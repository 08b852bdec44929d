//! Client configuration
//!
//! # Environment variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | ARTSPARK_STORE_URL | (unset) | Hosted store project URL |
//! | ARTSPARK_ANON_KEY | (unset) | Hosted store anon key |
//! | ARTSPARK_DATA_DIR | ./artspark-data | On-device storage directory |
//! | ARTSPARK_REQUEST_TIMEOUT_MS | 15000 | Per-request timeout |
//! | ARTSPARK_BOOTSTRAP_TIMEOUT_MS | 5000 | Profile/session bootstrap deadline |
//! | ARTSPARK_STALE_AFTER_SECS | 300 | Freshness window of cached data |
//! | ARTSPARK_REFRESH_INTERVAL_SECS | 60 | Period of the staleness check |
//! | ARTSPARK_OFFLINE_READS | true | Serve reads from the local mirror when the store is down |
//!
//! Missing or placeholder credentials select the on-device backend.

use std::path::PathBuf;
use std::time::Duration;

/// Values shipped in the project template; treated as "not configured"
const PLACEHOLDER_URLS: &[&str] = &["https://your-project.supabase.co"];
const PLACEHOLDER_KEYS: &[&str] = &["your-anon-key", "your-anon-key-here"];

/// Backend selected once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Hosted relational store
    Remote { url: String, anon_key: String },
    /// On-device storage only
    Local,
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hosted store URL (e.g., "https://abc.supabase.co")
    pub store_url: Option<String>,

    /// Hosted store anon key
    pub anon_key: Option<String>,

    /// Directory for the on-device store (theme, fallback collections)
    pub data_dir: PathBuf,

    /// Timeout for ordinary store requests
    pub request_timeout: Duration,

    /// Deadline for the profile/session bootstrap call
    pub bootstrap_timeout: Duration,

    /// Cached data older than this is stale
    pub stale_after: Duration,

    /// How often the background task looks for stale caches
    pub refresh_interval: Duration,

    /// Mirror remote reads locally and serve them when the store is unreachable
    pub offline_reads: bool,
}

impl ClientConfig {
    /// Configuration with defaults and no remote credentials
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_url: None,
            anon_key: None,
            data_dir: data_dir.into(),
            request_timeout: Duration::from_secs(15),
            bootstrap_timeout: Duration::from_secs(5),
            stale_after: Duration::from_secs(5 * 60),
            refresh_interval: Duration::from_secs(60),
            offline_reads: true,
        }
    }

    /// Load from environment variables (and a `.env` file if present)
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }

        let mut config = Self::new(
            std::env::var("ARTSPARK_DATA_DIR").unwrap_or_else(|_| "./artspark-data".into()),
        );
        config.store_url = std::env::var("ARTSPARK_STORE_URL").ok();
        config.anon_key = std::env::var("ARTSPARK_ANON_KEY").ok();

        if let Some(ms) = env_parse::<u64>("ARTSPARK_REQUEST_TIMEOUT_MS") {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("ARTSPARK_BOOTSTRAP_TIMEOUT_MS") {
            config = config.with_bootstrap_timeout(Duration::from_millis(ms));
        }
        if let Some(secs) = env_parse::<u64>("ARTSPARK_STALE_AFTER_SECS") {
            config.stale_after = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("ARTSPARK_REFRESH_INTERVAL_SECS") {
            config.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(flag) = env_parse::<bool>("ARTSPARK_OFFLINE_READS") {
            config.offline_reads = flag;
        }
        config
    }

    /// Set hosted store credentials
    pub fn with_store(mut self, url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        self.store_url = Some(url.into());
        self.anon_key = Some(anon_key.into());
        self
    }

    /// Set the data directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the bootstrap deadline (recommended 3-10 s)
    pub fn with_bootstrap_timeout(mut self, timeout: Duration) -> Self {
        if timeout < Duration::from_secs(3) || timeout > Duration::from_secs(10) {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                "Bootstrap timeout outside the recommended 3-10s range"
            );
        }
        self.bootstrap_timeout = timeout;
        self
    }

    /// Set the freshness window
    pub fn with_stale_after(mut self, window: Duration) -> Self {
        self.stale_after = window;
        self
    }

    /// Set the staleness check period
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Enable or disable the local read mirror
    pub fn with_offline_reads(mut self, enabled: bool) -> Self {
        self.offline_reads = enabled;
        self
    }

    /// Resolve which backend to use.
    ///
    /// This is the only place that inspects credentials.
    pub fn backend(&self) -> Backend {
        let url = self
            .store_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty() && !PLACEHOLDER_URLS.contains(u));
        let key = self
            .anon_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && !PLACEHOLDER_KEYS.contains(k));

        match (url, key) {
            (Some(url), Some(key)) => Backend::Remote {
                url: url.trim_end_matches('/').to_string(),
                anon_key: key.to_string(),
            },
            _ => Backend::Local,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("./artspark-data")
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "Ignoring unparsable environment value");
            None
        }
    }
}
