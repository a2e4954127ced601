use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");
const EXAMPLE_LEDGER: &str = include_str!("../../docs/example_ledger.yaml");

/// Writes the example config to the default location.
pub fn setup() -> Result<()> {
    let path = AppConfig::default_config_path()?;
    let written = setup_at_path(&path)?;
    println!("Wrote {}", written.config.display());
    if let Some(ledger) = written.ledger {
        println!("Wrote {}", ledger.display());
    }
    Ok(())
}

#[derive(Debug)]
pub struct SetupFiles {
    pub config: PathBuf,
    /// Only set when no ledger existed yet.
    pub ledger: Option<PathBuf>,
}

/// Writes the example config to `path` plus the sample ledger it points at.
/// An existing config is never overwritten; an existing ledger is left alone.
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<SetupFiles> {
    let path = path.as_ref();
    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;
    info!(path = %path.display(), "Created default configuration");

    let config = AppConfig::load_from_path(path)?;
    let ledger_path = config.ledger_file_path();
    let ledger = if ledger_path.exists() {
        info!(path = %ledger_path.display(), "Keeping existing ledger");
        None
    } else {
        fs::write(&ledger_path, EXAMPLE_LEDGER)
            .with_context(|| format!("Failed to write ledger to {}", ledger_path.display()))?;
        info!(path = %ledger_path.display(), "Created example ledger");
        Some(ledger_path)
    };

    Ok(SetupFiles {
        config: path.to_path_buf(),
        ledger,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LedgerFile;
    use tempfile::TempDir;

    #[test]
    fn test_setup_writes_config_and_ledger() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nested").join("config.yaml");

        let written = setup_at_path(&config_path)?;

        let content = fs::read_to_string(&config_path)?;
        assert!(content.contains("# Example configuration file for finsight"));
        assert!(content.contains("ledger_path:"));
        assert_eq!(
            written.ledger,
            Some(temp_dir.path().join("nested").join("ledger.yaml"))
        );
        Ok(())
    }

    #[test]
    fn test_setup_refuses_to_overwrite_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "test")?;

        let err = setup_at_path(&config_path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(fs::read_to_string(&config_path)?, "test");
        Ok(())
    }

    #[test]
    fn test_setup_keeps_existing_ledger() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let ledger_path = temp_dir.path().join("ledger.yaml");
        fs::write(&ledger_path, "categories: []\n")?;

        let written = setup_at_path(temp_dir.path().join("config.yaml"))?;
        assert!(written.ledger.is_none());
        assert_eq!(fs::read_to_string(&ledger_path)?, "categories: []\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_example_files_load() -> Result<()> {
        let config: AppConfig = serde_yaml::from_str(EXAMPLE_CONFIG)?;
        assert!(config.owner.is_some());
        assert!(config.providers.metal_price.is_some());
        assert!(config.providers.stock.is_some());

        let temp_dir = TempDir::new()?;
        let ledger_path = temp_dir.path().join("ledger.yaml");
        fs::write(&ledger_path, EXAMPLE_LEDGER)?;
        let data = LedgerFile::new(&ledger_path).load().await?;
        assert_eq!(data.stock_positions.len(), 2);
        Ok(())
    }
}
