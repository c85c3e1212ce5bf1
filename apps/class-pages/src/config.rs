//! # Configuration
//!
//! Layered host configuration. Precedence, highest first:
//!
//! 1. CLI flags (applied by the `cli` module)
//! 2. Environment variables
//! 3. The TOML file (`--config <path>`, else `./class-pages.toml` if present)
//! 4. Compiled-in defaults
//!
//! ## Environment Variables
//!
//! - `CLASS_PAGES_API_KEY`: Bearer key that makes a caller privileged
//! - `CLASS_PAGES_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `CLASS_PAGES_CORS_ORIGINS`: Comma-separated origins, or "*" for all

use class_pages_core::primitives::DEFAULT_SUBCLASS_LABEL;
use class_pages_core::{ClassPagesError, Vocabulary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "class-pages.toml";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

pub const API_KEY_ENV: &str = "CLASS_PAGES_API_KEY";
pub const RATE_LIMIT_ENV: &str = "CLASS_PAGES_RATE_LIMIT";
pub const CORS_ORIGINS_ENV: &str = "CLASS_PAGES_CORS_ORIGINS";

/// Default rate limit: 100 requests per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

// =============================================================================
// CONFIG STRUCTURE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding one `<source>.json` catalog per source key.
    pub catalog_dir: PathBuf,
    /// redb settings database.
    pub database: PathBuf,
    /// Subclass tab label when a class has no override.
    pub default_subclass_label: String,
    pub server: ServerConfig,
    pub vocabulary: VocabularyConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_dir: PathBuf::from("catalog"),
            database: PathBuf::from("class-pages.db"),
            default_subclass_label: DEFAULT_SUBCLASS_LABEL.to_string(),
            server: ServerConfig::default(),
            vocabulary: VocabularyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
    /// Comma-separated origins or "*"; unset means localhost only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_key: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            cors_origins: None,
        }
    }
}

/// Replacement level and school tables. An absent table keeps the
/// compiled-in default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    /// Level number (as a string key) -> bucket label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels: Option<BTreeMap<String, String>>,
    /// School key -> label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schools: Option<BTreeMap<String, String>>,
}

impl VocabularyConfig {
    /// Build the effective vocabulary.
    pub fn resolve(&self) -> Result<Vocabulary, ClassPagesError> {
        let defaults = Vocabulary::default();

        let levels = match &self.levels {
            None => defaults
                .levels()
                .map(|(l, s)| (l, s.to_string()))
                .collect::<Vec<_>>(),
            Some(table) => table
                .iter()
                .map(|(key, label)| {
                    key.trim()
                        .parse::<u8>()
                        .map(|level| (level, label.clone()))
                        .map_err(|_| {
                            ClassPagesError::DeserializationError(format!(
                                "vocabulary.levels: '{}' is not a level number",
                                key
                            ))
                        })
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        let schools = match &self.schools {
            None => defaults
                .schools()
                .map(|(k, s)| (k.to_string(), s.to_string()))
                .collect::<Vec<_>>(),
            Some(table) => table.iter().map(|(k, s)| (k.clone(), s.clone())).collect(),
        };

        Ok(Vocabulary::new(levels, schools))
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl AppConfig {
    /// Load the file layer.
    ///
    /// An explicit path must exist. Without one, `./class-pages.toml` is
    /// used when present and the defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ClassPagesError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ClassPagesError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            ClassPagesError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ClassPagesError::IoError(format!(
                "Config size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            ClassPagesError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ClassPagesError> {
        toml::from_str(text).map_err(|e| ClassPagesError::DeserializationError(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ClassPagesError> {
        toml::to_string_pretty(self).map_err(|e| ClassPagesError::SerializationError(e.to_string()))
    }

    /// Apply the environment layer from the process environment.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    /// Apply the environment layer from an arbitrary lookup.
    ///
    /// Empty values are ignored. An unparsable rate limit is logged and
    /// ignored.
    #[must_use]
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = var(API_KEY_ENV) {
            self.server.api_key = Some(key);
        }
        if let Some(raw) = var(RATE_LIMIT_ENV) {
            match raw.trim().parse() {
                Ok(rate) => self.server.rate_limit = rate,
                Err(_) => tracing::warn!("{}: '{}' is not a number, ignored", RATE_LIMIT_ENV, raw),
            }
        }
        if let Some(origins) = var(CORS_ORIGINS_ENV) {
            self.server.cors_origins = Some(origins);
        }
        self
    }

    /// The configured API key, if non-empty.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.server.api_key.as_deref().filter(|k| !k.is_empty())
    }
}
