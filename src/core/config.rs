use crate::core::model::Currency;
use crate::core::positions::PositionOptions;
use crate::core::quotes::ResolverOptions;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const DEFAULT_METAL_URL: &str = "https://api.metalpriceapi.com/v1";
const DEFAULT_STOCK_URL: &str = "http://localhost:8090";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MetalPriceConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StockServiceConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub metal_price: Option<MetalPriceConfig>,
    pub stock: Option<StockServiceConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            metal_price: Some(MetalPriceConfig {
                base_url: DEFAULT_METAL_URL.to_string(),
                api_key: String::new(),
            }),
            stock: Some(StockServiceConfig {
                base_url: DEFAULT_STOCK_URL.to_string(),
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn metal_price_url(&self) -> &str {
        self.metal_price
            .as_ref()
            .map_or(DEFAULT_METAL_URL, |p| &p.base_url)
    }

    pub fn metal_price_key(&self) -> &str {
        self.metal_price.as_ref().map_or("", |p| &p.api_key)
    }

    pub fn stock_url(&self) -> &str {
        self.stock.as_ref().map_or(DEFAULT_STOCK_URL, |p| &p.base_url)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// Keep quotes on disk between runs.
    pub persist: bool,
    pub security_ttl_secs: u64,
    pub provider_timeout_ms: u64,
    pub max_concurrent_quotes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            persist: true,
            security_ttl_secs: 60,
            provider_timeout_ms: 5000,
            max_concurrent_quotes: 8,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub owner: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    pub ledger_path: String,
    pub data_path: Option<String>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Directory of the file this config was read from.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

fn default_currency() -> Currency {
    Currency::Eur
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("io", "finsight", "finsight")
        .context("Could not determine project directories")
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(project_dirs()?.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.base_dir = path.as_ref().parent().map(Path::to_path_buf);
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// The ledger location, relative paths taken from the config file's directory.
    pub fn ledger_file_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.ledger_path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            timeout: Duration::from_millis(self.cache.provider_timeout_ms),
            ..ResolverOptions::default()
        }
    }

    pub fn position_options(&self) -> PositionOptions {
        PositionOptions {
            currency: self.currency,
            security_ttl: Duration::from_secs(self.cache.security_ttl_secs),
            max_concurrent: self.cache.max_concurrent_quotes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
owner: "alice"
currency: "USD"
ledger_path: "/tmp/ledger.yaml"
providers:
  metal_price:
    base_url: "http://example.com/metals"
    api_key: "abc"
  stock:
    base_url: "http://example.com/stocks"
cache:
  persist: false
  security_ttl_secs: 120
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.owner.as_deref(), Some("alice"));
        assert_eq!(config.currency, Currency::Usd);
        assert_eq!(config.providers.metal_price_url(), "http://example.com/metals");
        assert_eq!(config.providers.metal_price_key(), "abc");
        assert_eq!(config.providers.stock_url(), "http://example.com/stocks");
        assert!(!config.cache.persist);
        assert_eq!(config.cache.security_ttl_secs, 120);
        // Unset keys fall back to defaults.
        assert_eq!(config.cache.provider_timeout_ms, 5000);
        assert_eq!(config.cache.max_concurrent_quotes, 8);
        assert_eq!(
            config.position_options().security_ttl,
            Duration::from_secs(120)
        );
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig =
            serde_yaml::from_str("ledger_path: ledger.yaml\n").expect("Failed to deserialize");
        assert!(config.owner.is_none());
        assert_eq!(config.currency, Currency::Eur);
        assert_eq!(config.providers.metal_price_url(), DEFAULT_METAL_URL);
        assert!(config.cache.persist);
        assert_eq!(
            config.resolver_options().timeout,
            Duration::from_millis(5000)
        );
    }

    #[test]
    fn test_relative_ledger_path_follows_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config_path = dir.path().join("config.yaml");
        fs::write(&config_path, "ledger_path: books/ledger.yaml\n").unwrap();

        let config = AppConfig::load_from_path(&config_path).unwrap();
        assert_eq!(
            config.ledger_file_path(),
            dir.path().join("books").join("ledger.yaml")
        );
    }

    #[test]
    fn test_custom_data_path_wins() {
        let config: AppConfig =
            serde_yaml::from_str("ledger_path: l.yaml\ndata_path: /var/lib/finsight\n").unwrap();
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/var/lib/finsight")
        );
    }
}
