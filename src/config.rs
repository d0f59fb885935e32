//! Engine settings read from an optional TOML file and `EINVOICE__*` environment variables
use super::store::{SledStore, StoreError};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_CONFIG_FILE: &str = "config/einvoice.toml";

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Remove the database when it is dropped
    #[serde(default)]
    pub temporary: bool,
    #[serde(default)]
    pub flush_every_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./einvoice-ledger")
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            temporary: false,
            flush_every_ms: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl EngineConfig {
    /// Load from `file` (or `config/einvoice.toml` when absent, if it exists),
    /// then apply `EINVOICE__SECTION__KEY` environment overrides.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        Config::builder()
            .add_source(file_source)
            .add_source(Environment::with_prefix("EINVOICE").separator("__"))
            .build()?
            .try_deserialize()
    }
}

impl StoreConfig {
    pub fn open(&self) -> Result<SledStore, StoreError> {
        let mut config = sled::Config::new()
            .path(&self.path)
            .temporary(self.temporary);
        if let Some(ms) = self.flush_every_ms {
            config = config.flush_every_ms(Some(ms));
        }
        Ok(SledStore::new(Arc::new(config.open()?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = EngineConfig::default();

        assert_eq!(config.store.path, PathBuf::from("./einvoice-ledger"));
        assert!(!config.store.temporary);
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn loads_sections_from_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("einvoice.toml");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "[store]\npath = \"/var/lib/einvoice\"\nflush_every_ms = 500")?;
        writeln!(file, "[log]\nfilter = \"einvoice_ledger=debug\"")?;

        let config = EngineConfig::load(Some(&path))?;
        assert_eq!(config.store.path, PathBuf::from("/var/lib/einvoice"));
        assert_eq!(config.store.flush_every_ms, Some(500));
        assert_eq!(config.log.filter, "einvoice_ledger=debug");
        Ok(())
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(EngineConfig::load(Some(Path::new("/nonexistent/einvoice.toml"))).is_err());
    }

    #[test]
    fn opens_a_temporary_store() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = StoreConfig {
            path: dir.path().join("ledger"),
            temporary: true,
            flush_every_ms: None,
        }
        .open()?;

        assert!(store.instance().is_empty());
        Ok(())
    }
}
