use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure for TrendLens.
///
/// Every section is handed to the component that needs it; nothing is read
/// from global state once the file is loaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Trending listing page settings
    #[serde(default)]
    pub listing: ListingConfig,

    /// Repository metadata API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Enrichment limits
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Backoff for listing and metadata requests
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ListingConfig {
    /// Base URL of the trending listing
    #[serde(default = "default_listing_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with listing requests
    #[serde(default = "default_browser_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApiConfig {
    /// Base URL of the repository metadata API
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Personal access token; enrichment is disabled without one
    pub token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with API requests
    #[serde(default = "default_api_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EnrichmentConfig {
    /// Set to false to return listing data only
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Number of top-ranked repositories that get README, commit and language lookups
    #[serde(default = "default_detail_limit")]
    pub detail_limit: usize,

    /// Repositories enriched concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Characters of README kept per repository
    #[serde(default = "default_readme_chars")]
    pub readme_chars: usize,

    /// Recent commits requested per repository (at most 5)
    #[serde(default = "default_commit_count")]
    pub commit_count: usize,

    /// Topics kept per repository (at most 10)
    #[serde(default = "default_max_topics")]
    pub max_topics: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before the first retry, in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Growth factor between consecutive waits
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,

    /// Upper bound on a single wait, in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            base_url: default_listing_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_browser_user_agent(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
            user_agent: default_api_user_agent(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detail_limit: default_detail_limit(),
            workers: default_workers(),
            readme_chars: default_readme_chars(),
            commit_count: default_commit_count(),
            max_topics: default_max_topics(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_listing_base_url() -> String {
    "https://github.com/trending".to_string()
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_browser_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_api_user_agent() -> String {
    concat!("trendlens/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_true() -> bool {
    true
}

fn default_detail_limit() -> usize {
    10
}

fn default_workers() -> usize {
    4
}

fn default_readme_chars() -> usize {
    2000
}

fn default_commit_count() -> usize {
    5
}

fn default_max_topics() -> usize {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    2_000
}

fn default_multiplier() -> u32 {
    2
}

fn default_max_delay_ms() -> u64 {
    10_000
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./trendlens.toml
    /// 3. ./trendlens.json
    /// 4. ./trendlens.yaml
    /// 5. ./trendlens.yml
    /// 6. `<user config dir>/trendlens/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if path.exists() {
                return Self::load_from_path(path);
            }
            log::warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let candidates = [
            "trendlens.toml",
            "trendlens.json",
            "trendlens.yaml",
            "trendlens.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            return Self::load_from_path(&path);
        }

        Ok(Self::default())
    }

    /// Per-user configuration file location, if the platform has one.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("trendlens").join("config.toml"))
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listing.base_url, "https://github.com/trending");
        assert_eq!(config.api.base_url, "https://api.github.com");
        assert!(config.api.token.is_none());
        assert!(config.enrichment.enabled);
        assert_eq!(config.enrichment.detail_limit, 10);
        assert_eq!(config.enrichment.readme_chars, 2000);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_delay_ms, 2_000);
        assert_eq!(config.retry.max_delay_ms, 10_000);
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[api]
token = "ghp-test-token"
base-url = "https://github.example.com/api/v3"

[enrichment]
detail-limit = 3
workers = 2

[retry]
max-attempts = 5
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.api.token, Some("ghp-test-token".to_string()));
        assert_eq!(config.api.base_url, "https://github.example.com/api/v3");
        assert_eq!(config.enrichment.detail_limit, 3);
        assert_eq!(config.enrichment.workers, 2);
        assert_eq!(config.enrichment.commit_count, 5);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.multiplier, 2);
        assert_eq!(config.listing.timeout_secs, 30);
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "listing": {
    "base-url": "http://localhost:8080/trending",
    "timeout-secs": 5
  },
  "enrichment": {
    "enabled": false
  }
}"#;
        write!(temp_file, "{}", json_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.listing.base_url, "http://localhost:8080/trending");
        assert_eq!(config.listing.timeout_secs, 5);
        assert!(!config.enrichment.enabled);
        assert_eq!(config.enrichment.detail_limit, 10);
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        let yaml_content = "enrichment:\n  readme-chars: 500\nretry:\n  initial-delay-ms: 0\n";
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.enrichment.readme_chars, 500);
        assert_eq!(config.retry.initial_delay_ms, 0);
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load(Some(Path::new("nonexistent.toml"))).unwrap();
        assert_eq!(config.listing.base_url, "https://github.com/trending");
        assert_eq!(config.enrichment.detail_limit, 10);
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("trendlens.yaml");

        let mut config = Config::default();
        config.api.token = Some("ghp-saved".to_string());
        config.enrichment.workers = 8;
        config.save(&path).unwrap();

        let reloaded = Config::load(Some(&path)).unwrap();
        assert_eq!(reloaded.api.token, Some("ghp-saved".to_string()));
        assert_eq!(reloaded.enrichment.workers, 8);
    }

    #[test]
    fn test_invalid_config_reports_path() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "[retry]\nmax-attempts = \"lots\"\n").unwrap();

        let err = Config::load_from_path(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML config"));
    }
}
