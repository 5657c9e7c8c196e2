//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::selection::{DEFAULT_HISTORY_CAPACITY, SelectionStrategy};

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "AGENTGRAPH_CONFIG_DIR";

/// Agentgraph configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseSettings,
    pub selection: SelectionConfig,
    pub graph: GraphConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database file; `graph.db` in the config directory when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub default_strategy: String,
    pub max_agents: usize,
    pub min_confidence: f64,
    pub history_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Hop limit for path queries when the caller gives none
    pub default_path_depth: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            default_strategy: SelectionStrategy::Adaptive.as_str().to_string(),
            max_agents: 3,
            min_confidence: 0.5,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_path_depth: 5,
        }
    }
}

impl SelectionConfig {
    /// The configured default strategy, parsed
    pub fn strategy(&self) -> crate::Result<SelectionStrategy> {
        self.default_strategy.parse()
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var(CONFIG_DIR_ENV) {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("agentgraph")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.selection
            .strategy()
            .map_err(|e| anyhow!("selection.default_strategy: {}", e))?;

        if self.selection.max_agents == 0 {
            return Err(anyhow!("selection.max_agents must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.selection.min_confidence) {
            return Err(anyhow!(
                "selection.min_confidence must be between 0.0 and 1.0"
            ));
        }
        if self.selection.history_capacity == 0 {
            return Err(anyhow!("selection.history_capacity must be at least 1"));
        }
        if self.graph.default_path_depth == 0 {
            return Err(anyhow!("graph.default_path_depth must be at least 1"));
        }
        Ok(())
    }

    /// Database file to open, resolving the default location
    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("graph.db")),
        }
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "database.path" => Ok(self
                .database
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(default)".to_string())),
            "selection.default_strategy" => Ok(self.selection.default_strategy.clone()),
            "selection.max_agents" => Ok(self.selection.max_agents.to_string()),
            "selection.min_confidence" => Ok(self.selection.min_confidence.to_string()),
            "selection.history_capacity" => Ok(self.selection.history_capacity.to_string()),
            "graph.default_path_depth" => Ok(self.graph.default_path_depth.to_string()),
            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `agentgraph config show` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut updated = self.clone();
        match key {
            "database.path" => {
                updated.database.path = Some(PathBuf::from(value));
            }
            "selection.default_strategy" => {
                let strategy: SelectionStrategy =
                    value.parse().map_err(|e| anyhow!("{}", e))?;
                updated.selection.default_strategy = strategy.as_str().to_string();
            }
            "selection.max_agents" => {
                updated.selection.max_agents = value
                    .parse()
                    .with_context(|| format!("Invalid max_agents value: {}", value))?;
            }
            "selection.min_confidence" => {
                updated.selection.min_confidence = value
                    .parse()
                    .with_context(|| format!("Invalid min_confidence value: {}", value))?;
            }
            "selection.history_capacity" => {
                updated.selection.history_capacity = value
                    .parse()
                    .with_context(|| format!("Invalid history_capacity value: {}", value))?;
            }
            "graph.default_path_depth" => {
                updated.graph.default_path_depth = value
                    .parse()
                    .with_context(|| format!("Invalid default_path_depth value: {}", value))?;
            }
            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `agentgraph config show` to see available keys.",
                    key
                ));
            }
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        [
            "database.path",
            "selection.default_strategy",
            "selection.max_agents",
            "selection.min_confidence",
            "selection.history_capacity",
            "graph.default_path_depth",
        ]
        .into_iter()
        .map(|key| Ok((key.to_string(), self.get(key)?)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.database.path.is_none());
        assert_eq!(config.selection.default_strategy, "adaptive");
        assert_eq!(config.selection.max_agents, 3);
        assert_eq!(config.selection.min_confidence, 0.5);
        assert_eq!(config.selection.history_capacity, 1000);
        assert_eq!(config.graph.default_path_depth, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("selection.default_strategy", "GREEDY").unwrap();
        config.set("selection.max_agents", "5").unwrap();
        config.set("database.path", "/tmp/agents.db").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.selection.default_strategy, "greedy");
        assert_eq!(loaded.database_path().unwrap(), PathBuf::from("/tmp/agents.db"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[selection]\nmax_agents = 7\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.selection.max_agents, 7);
        assert_eq!(loaded.selection.min_confidence, 0.5);
        assert_eq!(loaded.graph.default_path_depth, 5);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[selection]\nmin_confidence = 3.0\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        fs::write(&path, "[selection]\ndefault_strategy = \"fastest\"\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("default_strategy"));
    }

    #[test]
    fn test_set_validates_without_partial_updates() {
        let mut config = Config::default();
        assert!(config.set("selection.min_confidence", "1.5").is_err());
        assert!(config.set("selection.max_agents", "0").is_err());
        assert!(config.set("selection.max_agents", "many").is_err());
        assert!(config.set("selection.default_strategy", "fastest").is_err());
        assert!(config.set("llm.model", "x").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_list_covers_every_key() {
        let listed = Config::default().list().unwrap();
        assert_eq!(listed.len(), 6);
        assert_eq!(listed[0], ("database.path".to_string(), "(default)".to_string()));
    }
}
