//! Configuration types for collection sessions.
//!
//! Every section deserializes from JSON with per-field defaults, so a partial
//! document (or `{}`) yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigError;

/// Longest accepted timeout, in seconds.
pub const MAX_TIMEOUT_SECS: f64 = 86_400.0;

/// Converts configured seconds to a Duration clamped to `0..=MAX_TIMEOUT_SECS`.
pub(crate) fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0).min(MAX_TIMEOUT_SECS)).unwrap_or(Duration::ZERO)
}

fn check_timeout(field: &str, secs: f64, allow_zero: bool) -> Result<(), ConfigError> {
    if !secs.is_finite() || secs > MAX_TIMEOUT_SECS {
        return Err(ConfigError::invalid(field, "must be finite and at most 86400 seconds"));
    }
    if allow_zero && secs < 0.0 {
        return Err(ConfigError::invalid(field, "must not be negative"));
    }
    if !allow_zero && secs <= 0.0 {
        return Err(ConfigError::invalid(field, "must be positive"));
    }
    Ok(())
}

/// Top-level configuration for a collection session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Arrival detection settings.
    #[serde(default)]
    pub navigation: NavigationConfig,
    /// Pagination timing and retry settings.
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Storage sinks and chunking.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Site profile used to resolve and recognise target pages.
    #[serde(default)]
    pub site: SiteProfile,
}

impl CrawlConfig {
    /// Creates a configuration with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from a JSON string and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    /// Sets the navigation section.
    #[must_use]
    pub fn with_navigation(mut self, navigation: NavigationConfig) -> Self {
        self.navigation = navigation;
        self
    }

    /// Sets the pagination section.
    #[must_use]
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Sets the storage section.
    #[must_use]
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Sets the site profile.
    #[must_use]
    pub fn with_site(mut self, site: SiteProfile) -> Self {
        self.site = site;
        self
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_timeout(
            "navigation.arrival_timeout_secs",
            self.navigation.arrival_timeout_secs,
            false,
        )?;
        check_timeout(
            "navigation.page_ready_timeout_secs",
            self.navigation.page_ready_timeout_secs,
            true,
        )?;
        check_timeout("storage.remote.timeout_secs", self.storage.remote.timeout_secs, true)?;
        if self.pagination.block_size == 0 {
            return Err(ConfigError::invalid("pagination.block_size", "must be at least 1"));
        }
        if self.pagination.verify_attempts == 0 {
            return Err(ConfigError::invalid(
                "pagination.verify_attempts",
                "must be at least 1",
            ));
        }
        if self.pagination.min_delay_ms > self.pagination.max_delay_ms {
            return Err(ConfigError::invalid(
                "pagination.min_delay_ms",
                "must not exceed max_delay_ms",
            ));
        }
        if self.storage.chunk_page_threshold == 0 {
            return Err(ConfigError::invalid(
                "storage.chunk_page_threshold",
                "must be at least 1",
            ));
        }
        if self.storage.base_name.trim().is_empty() {
            return Err(ConfigError::invalid("storage.base_name", "must not be empty"));
        }
        if !self.site.search_url_template.contains("{query}") {
            return Err(ConfigError::invalid(
                "site.search_url_template",
                "must contain a {query} placeholder",
            ));
        }
        if self.storage.remote.enabled && self.storage.remote.uri.trim().is_empty() {
            return Err(ConfigError::invalid(
                "storage.remote.uri",
                "required when the remote store is enabled",
            ));
        }
        Ok(())
    }
}

/// Settings for detecting arrival at the target page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Upper bound on waiting for arrival, in seconds.
    #[serde(default = "default_arrival_timeout")]
    pub arrival_timeout_secs: f64,
    /// Delay before reading a freshly created tab's URL.
    #[serde(default = "default_new_tab_settle")]
    pub new_tab_settle_ms: u64,
    /// Interval between countdown progress updates.
    #[serde(default = "default_countdown_interval")]
    pub countdown_interval_ms: u64,
    /// Upper bound on waiting for the arrived page to render.
    #[serde(default = "default_page_ready_timeout")]
    pub page_ready_timeout_secs: f64,
    /// Interval between page-ready probes.
    #[serde(default = "default_page_ready_interval")]
    pub page_ready_interval_ms: u64,
}

fn default_arrival_timeout() -> f64 {
    120.0
}

fn default_new_tab_settle() -> u64 {
    500
}

fn default_countdown_interval() -> u64 {
    1000
}

fn default_page_ready_timeout() -> f64 {
    60.0
}

fn default_page_ready_interval() -> u64 {
    1000
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            arrival_timeout_secs: default_arrival_timeout(),
            new_tab_settle_ms: default_new_tab_settle(),
            countdown_interval_ms: default_countdown_interval(),
            page_ready_timeout_secs: default_page_ready_timeout(),
            page_ready_interval_ms: default_page_ready_interval(),
        }
    }
}

impl NavigationConfig {
    /// Sets the arrival timeout.
    #[must_use]
    pub fn with_arrival_timeout(mut self, seconds: f64) -> Self {
        self.arrival_timeout_secs = seconds;
        self
    }

    /// Sets the new-tab settle delay.
    #[must_use]
    pub fn with_new_tab_settle_ms(mut self, ms: u64) -> Self {
        self.new_tab_settle_ms = ms;
        self
    }

    /// Gets the arrival timeout as a Duration.
    #[must_use]
    pub fn arrival_timeout(&self) -> Duration {
        seconds(self.arrival_timeout_secs)
    }

    /// Gets the new-tab settle delay as a Duration.
    #[must_use]
    pub fn new_tab_settle(&self) -> Duration {
        Duration::from_millis(self.new_tab_settle_ms)
    }

    /// Gets the countdown interval as a Duration.
    #[must_use]
    pub fn countdown_interval(&self) -> Duration {
        Duration::from_millis(self.countdown_interval_ms.max(1))
    }

    /// Gets the page-ready bound as a Duration.
    #[must_use]
    pub fn page_ready_timeout(&self) -> Duration {
        seconds(self.page_ready_timeout_secs)
    }

    /// Gets the page-ready probe interval as a Duration.
    #[must_use]
    pub fn page_ready_interval(&self) -> Duration {
        Duration::from_millis(self.page_ready_interval_ms.max(1))
    }
}

/// Timing and retry bounds for pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Lower bound of the jittered per-page delay.
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,
    /// Upper bound of the jittered per-page delay.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Number of page numbers visible in one block window.
    #[serde(default = "default_block_size")]
    pub block_size: u32,
    /// Delay after each block jump.
    #[serde(default = "default_block_settle")]
    pub block_settle_ms: u64,
    /// Polls of the selected-page indicator per verification.
    #[serde(default = "default_verify_attempts")]
    pub verify_attempts: usize,
    /// Interval between selected-page polls.
    #[serde(default = "default_verify_interval")]
    pub verify_interval_ms: u64,
    /// Extra exact-page clicks after a failed verification.
    #[serde(default = "default_click_retries")]
    pub click_retries: usize,
}

fn default_min_delay() -> u64 {
    2000
}

fn default_max_delay() -> u64 {
    4000
}

fn default_block_size() -> u32 {
    10
}

fn default_block_settle() -> u64 {
    2000
}

fn default_verify_attempts() -> usize {
    8
}

fn default_verify_interval() -> u64 {
    800
}

fn default_click_retries() -> usize {
    3
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
            block_size: default_block_size(),
            block_settle_ms: default_block_settle(),
            verify_attempts: default_verify_attempts(),
            verify_interval_ms: default_verify_interval(),
            click_retries: default_click_retries(),
        }
    }
}

impl PaginationConfig {
    /// Sets the jittered per-page delay range.
    #[must_use]
    pub fn with_delay_range_ms(mut self, min: u64, max: u64) -> Self {
        self.min_delay_ms = min;
        self.max_delay_ms = max;
        self
    }

    /// Sets the block size.
    #[must_use]
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    /// Sets the block settle delay.
    #[must_use]
    pub fn with_block_settle_ms(mut self, ms: u64) -> Self {
        self.block_settle_ms = ms;
        self
    }

    /// Sets the verification polling bounds.
    #[must_use]
    pub fn with_verification(mut self, attempts: usize, interval_ms: u64) -> Self {
        self.verify_attempts = attempts;
        self.verify_interval_ms = interval_ms;
        self
    }

    /// Sets the exact-page click retry count.
    #[must_use]
    pub fn with_click_retries(mut self, retries: usize) -> Self {
        self.click_retries = retries;
        self
    }

    /// Gets the block settle delay as a Duration.
    #[must_use]
    pub fn block_settle(&self) -> Duration {
        Duration::from_millis(self.block_settle_ms)
    }

    /// Gets the verification interval as a Duration.
    #[must_use]
    pub fn verify_interval(&self) -> Duration {
        Duration::from_millis(self.verify_interval_ms)
    }
}

/// Toggle for a file sink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileSinkConfig {
    /// Whether the sink is enabled.
    #[serde(default)]
    pub enabled: bool,
}

impl FileSinkConfig {
    /// Creates an enabled sink.
    #[must_use]
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    /// Creates a disabled sink.
    #[must_use]
    pub fn disabled() -> Self {
        Self { enabled: false }
    }
}

/// Settings for the remote document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStoreConfig {
    /// Whether the remote store is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Base URI of the store.
    #[serde(default)]
    pub uri: String,
    /// Collection name; defaults to the storage base name when empty.
    #[serde(default)]
    pub collection: String,
    /// Request timeout in seconds.
    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: f64,
}

fn default_remote_timeout() -> f64 {
    30.0
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            uri: String::new(),
            collection: String::new(),
            timeout_secs: default_remote_timeout(),
        }
    }
}

/// Storage sinks and chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base name shared by every artifact of a session.
    #[serde(default = "default_base_name")]
    pub base_name: String,
    /// Pages per tabular chunk.
    #[serde(default = "default_chunk_threshold")]
    pub chunk_page_threshold: u32,
    /// Root under which `results/` is created. Empty means the working directory.
    #[serde(default)]
    pub root_dir: String,
    /// Structured single-artifact record file.
    #[serde(default = "FileSinkConfig::enabled")]
    pub json: FileSinkConfig,
    /// Tabular (CSV) chunk and consolidated artifacts.
    #[serde(default = "FileSinkConfig::enabled")]
    pub tabular: FileSinkConfig,
    /// Remote document store.
    #[serde(default)]
    pub remote: RemoteStoreConfig,
}

fn default_base_name() -> String {
    "records".to_string()
}

fn default_chunk_threshold() -> u32 {
    50
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_name: default_base_name(),
            chunk_page_threshold: default_chunk_threshold(),
            root_dir: String::new(),
            json: FileSinkConfig::enabled(),
            tabular: FileSinkConfig::enabled(),
            remote: RemoteStoreConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Sets the artifact base name.
    #[must_use]
    pub fn with_base_name(mut self, name: impl Into<String>) -> Self {
        self.base_name = name.into();
        self
    }

    /// Sets the chunk page threshold.
    #[must_use]
    pub fn with_chunk_threshold(mut self, pages: u32) -> Self {
        self.chunk_page_threshold = pages;
        self
    }

    /// Sets the root directory.
    #[must_use]
    pub fn with_root_dir(mut self, root: impl Into<String>) -> Self {
        self.root_dir = root.into();
        self
    }

    /// Enables the remote store at the given URI.
    #[must_use]
    pub fn with_remote(mut self, uri: impl Into<String>) -> Self {
        self.remote.enabled = true;
        self.remote.uri = uri.into();
        self
    }

    /// Returns the remote collection name.
    #[must_use]
    pub fn remote_collection(&self) -> &str {
        if self.remote.collection.is_empty() {
            &self.base_name
        } else {
            &self.remote.collection
        }
    }
}

/// Describes how to reach and recognise target pages on one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Search URL with a `{query}` placeholder.
    #[serde(default = "default_search_template")]
    pub search_url_template: String,
    /// Host fragments that identify a target page.
    #[serde(default = "default_target_hosts")]
    pub target_hosts: Vec<String>,
    /// Path fragment that identifies a target page.
    #[serde(default = "default_path_marker")]
    pub target_path_marker: String,
}

fn default_search_template() -> String {
    "https://search.naver.com/search.naver?where=nexearch&ie=utf8&query={query}".to_string()
}

fn default_target_hosts() -> Vec<String> {
    vec![
        "smartstore.naver.com".to_string(),
        "brand.naver.com".to_string(),
    ]
}

fn default_path_marker() -> String {
    "/products/".to_string()
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            search_url_template: default_search_template(),
            target_hosts: default_target_hosts(),
            target_path_marker: default_path_marker(),
        }
    }
}

impl SiteProfile {
    /// Sets the target hosts.
    #[must_use]
    pub fn with_target_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the path marker.
    #[must_use]
    pub fn with_path_marker(mut self, marker: impl Into<String>) -> Self {
        self.target_path_marker = marker.into();
        self
    }

    /// Sets the search URL template.
    #[must_use]
    pub fn with_search_template(mut self, template: impl Into<String>) -> Self {
        self.search_url_template = template.into();
        self
    }
}
