//! Configuration file loading.
//!
//! Lookup order: `--config`, then `$ESTATE_CONFIG`, then
//! `<config dir>/estate/config.toml`, then built-in defaults. Sections missing
//! from the file keep their defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use estate_graph::{GeocoderConfig, GraphConfig};
use estate_ml::{EmbeddingConfig, GdsConfig};

pub const CONFIG_ENV: &str = "ESTATE_CONFIG";

/// All runtime settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EstateConfig {
    pub graph: GraphConfig,
    pub geocoder: GeocoderConfig,
    pub embedding: EmbeddingConfig,
    pub gds: GdsConfig,
}

/// Connection settings given on the command line or through `NEO4J_*`.
#[derive(Debug, Clone, Default)]
pub struct GraphOverrides {
    pub uri: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub db: Option<String>,
}

impl EstateConfig {
    /// Resolve and load the configuration file.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match (explicit, env_path) {
            (Some(path), _) => Self::from_file(path),
            (None, Some(path)) => Self::from_file(&path),
            (None, None) => match default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("No configuration file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_overrides(&mut self, overrides: GraphOverrides) {
        if let Some(uri) = overrides.uri {
            self.graph.uri = uri;
        }
        if let Some(user) = overrides.user {
            self.graph.user = user;
        }
        if let Some(password) = overrides.password {
            self.graph.password = password;
        }
        if let Some(db) = overrides.db {
            self.graph.db = db;
        }
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("estate").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = EstateConfig::from_toml(
            r#"
            [graph]
            uri = "bolt://graph.internal:7687"
            db = "vienna"

            [geocoder]
            max_retries = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.graph.uri, "bolt://graph.internal:7687");
        assert_eq!(config.graph.db, "vienna");
        assert_eq!(config.graph.user, "neo4j");
        assert_eq!(config.geocoder.max_retries, 5);
        assert_eq!(config.geocoder.min_interval_ms, 1000);
        assert_eq!(config.embedding.model, "RotatE");
        assert_eq!(config.gds.graph_name, "apartment-graph");
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = EstateConfig::from_toml("").unwrap();
        assert_eq!(config.graph.uri, "bolt://localhost:7687");
        assert_eq!(config.embedding.embedding_dim, 50);
    }

    #[test]
    fn test_overrides_win() {
        let mut config = EstateConfig::default();
        config.apply_overrides(GraphOverrides {
            uri: Some("bolt://other:7687".into()),
            password: Some("secret".into()),
            ..Default::default()
        });

        assert_eq!(config.graph.uri, "bolt://other:7687");
        assert_eq!(config.graph.password, "secret");
        assert_eq!(config.graph.user, "neo4j");
    }

    #[test]
    fn test_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("estate.toml");
        std::fs::write(&path, "[gds]\ntimeout_secs = 30\n").unwrap();

        let config = EstateConfig::load(Some(&path)).unwrap();
        assert_eq!(config.gds.timeout_secs, 30);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EstateConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_invalid_toml_fails() {
        assert!(EstateConfig::from_toml("[graph\nuri = 1").is_err());
    }
}
