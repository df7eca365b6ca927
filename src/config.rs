use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub shortcuts: ShortcutsConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Upper bound on results returned per data source.
    pub max_results: u32,
    /// Distinct-contact cap during contact row accumulation.
    pub contact_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortcutsConfig {
    /// Package bundle roots scanned for shortcut descriptors.
    pub bundle_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Override for the snapshot directory; default is the user cache dir.
    pub directory: Option<String>,
}

#[allow(clippy::derivable_impls)]
impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            shortcuts: ShortcutsConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 20,
            contact_limit: 10,
        }
    }
}

impl Default for ShortcutsConfig {
    fn default() -> Self {
        Self {
            bundle_dirs: vec!["/usr/share/scout/packages".to_string()],
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { directory: None }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("scout")
            .join("config.toml")
    }

    /// Load config from file, or return defaults if not found
    pub fn load() -> Self {
        let path = Self::config_path();

        let mut config = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => config,
                    Err(e) => {
                        warn!(error = %e, "failed to parse config, using defaults");
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!(error = %e, "failed to read config, using defaults");
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.validate();
        config
    }

    /// Validate and clamp config values to acceptable ranges
    fn validate(&mut self) {
        self.search.max_results = self.search.max_results.clamp(1, 100);
        self.search.contact_limit = self.search.contact_limit.clamp(1, 50);
    }

    /// Expanded bundle roots for the filesystem platform.
    pub fn bundle_roots(&self) -> Vec<PathBuf> {
        self.shortcuts
            .bundle_dirs
            .iter()
            .map(PathBuf::from)
            .collect()
    }

    /// The directory cache snapshots live in.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache.directory.as_ref().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.search.max_results, 20);
        assert_eq!(config.search.contact_limit, 10);
        assert!(config.cache_dir().is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [search]
            max_results = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.search.contact_limit, 10);
    }

    #[test]
    fn test_validate_clamps() {
        let mut config = Config::default();
        config.search.max_results = 0;
        config.search.contact_limit = 9999;
        config.validate();
        assert_eq!(config.search.max_results, 1);
        assert_eq!(config.search.contact_limit, 50);
    }
}
