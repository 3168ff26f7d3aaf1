use crate::core::{AdminError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://dragonball-api.com/api";
pub const DEFAULT_PAGE_SIZE: u64 = 12;
pub const DEFAULT_DATA_DIR: &str = ".dragonball-admin";

pub const ENV_API_URL: &str = "DRAGONBALL_API_URL";
pub const ENV_DATA_DIR: &str = "DRAGONBALL_ADMIN_DATA_DIR";
pub const ENV_PAGE_SIZE: &str = "DRAGONBALL_ADMIN_PAGE_SIZE";

/// Console configuration
///
/// Built with the builder methods below, or from the environment with
/// [`ConsoleConfig::from_env`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    /// Base URL of the upstream API, without the collection segment
    pub api_base_url: String,

    /// Records requested per page
    pub page_size: u64,

    /// Directory holding the durable key-value blobs
    pub data_dir: PathBuf,

    /// Per-request timeout. `None` keeps the transport default
    pub request_timeout: Option<Duration>,
}

impl ConsoleConfig {
    pub fn new() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            request_timeout: None,
        }
    }

    /// Set the upstream base URL
    pub fn api_base_url(mut self, url: &str) -> Self {
        self.api_base_url = url.to_string();
        self
    }

    /// Set the page size
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the data directory
    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Defaults overridden by `DRAGONBALL_API_URL`, `DRAGONBALL_ADMIN_DATA_DIR`
    /// and `DRAGONBALL_ADMIN_PAGE_SIZE` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ConsoleConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config = config.api_base_url(url.trim());
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            config = config.data_dir(dir.trim());
        }
        if let Some(size) = lookup(ENV_PAGE_SIZE).filter(|v| !v.trim().is_empty()) {
            let size = size.trim().parse::<u64>().map_err(|_| {
                AdminError::Validation(format!("{} must be a positive integer", ENV_PAGE_SIZE))
            })?;
            config = config.page_size(size);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(AdminError::Validation("page_size must be > 0".to_string()));
        }

        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(AdminError::Validation(format!(
                "api_base_url must start with http:// or https://, got '{}'",
                self.api_base_url
            )));
        }

        Ok(())
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ConsoleConfig::default();
        assert_eq!(config.api_base_url, "https://dragonball-api.com/api");
        assert_eq!(config.page_size, 12);
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ConsoleConfig::new()
            .api_base_url("http://localhost:8080/api")
            .page_size(20)
            .data_dir("/tmp/console")
            .request_timeout(Duration::from_secs(5));

        assert_eq!(config.api_base_url, "http://localhost:8080/api");
        assert_eq!(config.page_size, 20);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/console"));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_URL, "http://127.0.0.1:3000/api"),
            (ENV_PAGE_SIZE, " 8 "),
        ]
        .into_iter()
        .collect();

        let config = ConsoleConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.api_base_url, "http://127.0.0.1:3000/api");
        assert_eq!(config.page_size, 8);
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
    }

    #[test]
    fn test_invalid_values() {
        assert!(ConsoleConfig::from_lookup(|key| (key == ENV_PAGE_SIZE).then(|| "zero".to_string())).is_err());
        assert!(ConsoleConfig::new().page_size(0).validate().is_err());
        assert!(ConsoleConfig::new().api_base_url("ftp://nope").validate().is_err());
    }
}
