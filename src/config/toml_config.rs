use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{validate_path, validate_positive_number, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "http://localhost:5002";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_STORE_PATH: &str = "./commute-sync.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub json: bool,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_store_path() -> String {
    DEFAULT_STORE_PATH.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl SyncConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SyncError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SyncError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_BASE_URL})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SyncError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }
}

impl Validate for SyncConfig {
    fn validate(&self) -> Result<()> {
        // 驗證 API 位址
        validate_url("api.base_url", &self.api.base_url)?;

        // 驗證逾時
        validate_positive_number("api.timeout_seconds", self.api.timeout_seconds, 1)?;

        // 驗證儲存路徑
        validate_path("storage.path", &self.storage.path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = SyncConfig::from_toml_str("").unwrap();

        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.api.base_url, "http://localhost:5002");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let config = SyncConfig::from_toml_str(
            r#"
            [api]
            base_url = "https://api.example.com"
            timeout_seconds = 3

            [storage]
            path = "/var/lib/commute-sync/store.json"

            [logging]
            verbose = true
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.api.timeout_seconds, 3);
        assert_eq!(config.storage.path, "/var/lib/commute-sync/store.json");
        assert!(config.logging.verbose);
        assert!(config.logging.json);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("COMMUTE_SYNC_TEST_API", "https://durations.example.com");
        let config = SyncConfig::from_toml_str(
            r#"
            [api]
            base_url = "${COMMUTE_SYNC_TEST_API}"
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://durations.example.com");

        let untouched = SyncConfig::from_toml_str(
            r#"
            [storage]
            path = "${COMMUTE_SYNC_UNSET_VARIABLE}"
            "#,
        )
        .unwrap();
        assert_eq!(untouched.storage.path, "${COMMUTE_SYNC_UNSET_VARIABLE}");
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let mut config = SyncConfig::default();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.api.timeout_seconds = 0;
        assert!(config.validate().is_err());

        assert!(SyncConfig::from_toml_str("[api]\ntimeout_seconds = \"soon\"").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\npath = \"./data/store.json\"").unwrap();

        let config = SyncConfig::from_file(file.path()).unwrap();
        assert_eq!(config.storage.path, "./data/store.json");
        assert!(SyncConfig::from_file("/nonexistent/commute-sync.toml").is_err());
    }
}
