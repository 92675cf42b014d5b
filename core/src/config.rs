//! Marketplace configuration, read from `<home>/config.toml`.
//!
//! ```toml
//! [marketplace]
//! database_path = "marketplace.db"
//! index_path = "summary-index.json"
//! default_limit = 10
//!
//! [embeddings]
//! enabled = true
//! model = "text-embedding-3-small"
//! ```

use crate::embeddings::EmbeddingsConfig;
use crate::error::ConfigError;
use crate::retrieval::DEFAULT_SEARCH_LIMIT;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;

/// Overrides the marketplace home directory.
pub const HOME_ENV_VAR: &str = "KMARKET_HOME";

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct MarketConfig {
    /// Directory the config was loaded from; relative paths resolve against it.
    #[serde(skip)]
    pub home: PathBuf,

    #[serde(default)]
    pub marketplace: MarketplaceConfig,

    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MarketplaceConfig {
    /// SQLite database holding listings
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Persisted summary embedding index (one file per marketplace)
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Result count when a caller gives no limit
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            index_path: default_index_path(),
            default_limit: default_limit(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("marketplace.db")
}

fn default_index_path() -> PathBuf {
    PathBuf::from("summary-index.json")
}

const fn default_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

impl MarketConfig {
    /// `$KMARKET_HOME`, else `~/.kmarket`.
    pub fn default_home() -> Result<PathBuf, ConfigError> {
        if let Ok(home) = std::env::var(HOME_ENV_VAR)
            && !home.trim().is_empty()
        {
            return Ok(PathBuf::from(home));
        }
        dirs::home_dir()
            .map(|home| home.join(".kmarket"))
            .ok_or(ConfigError::NoHomeDir)
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_home(Self::default_home()?)
    }

    /// Read `<home>/config.toml`; a missing file yields defaults.
    pub fn load_from_home(home: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let home = home.into();
        let path = home.join(CONFIG_FILE_NAME);

        let mut config = match std::fs::read_to_string(&path) {
            Ok(raw) => toml::from_str::<Self>(&raw).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        config.home = home;
        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.marketplace.database_path)
    }

    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.marketplace.index_path)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.home.join(path)
        }
    }
}
