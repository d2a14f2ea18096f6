//! Configuration for treegrant

use crate::TreeGrantError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default location of the config file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = ".treegrant/config.toml";

/// Default configuration as TOML
pub const DEFAULT_CONFIG: &str = r#"# Treegrant Configuration
# Relative paths are resolved against the directory holding this file.

[providers]
# authority = root directory exposed as tree://<authority>/<tree-id>
local = ".."

[grants]
# JSON file holding persisted read grants
store = "grants.json"

[service]
bind = "127.0.0.1"
port = 3000
"#;

/// Treegrant configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub providers: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub grants: GrantsConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantsConfig {
    #[serde(default = "default_store")]
    pub store: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_store() -> PathBuf {
    PathBuf::from("grants.json")
}
fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3000
}

impl Default for GrantsConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse config from TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| TreeGrantError::ConfigParse(e.to_string()))?;
        for authority in config.providers.keys() {
            if authority.is_empty()
                || !authority
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
            {
                return Err(TreeGrantError::ConfigParse(format!(
                    "invalid provider authority {:?}",
                    authority
                )));
            }
        }
        Ok(config)
    }

    /// Write the default config to `path`, refusing to overwrite
    pub fn init(path: &Path) -> crate::Result<()> {
        if path.exists() {
            return Err(TreeGrantError::ConfigExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, DEFAULT_CONFIG)?;
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Provider roots with relative paths resolved
    pub fn provider_roots(&self) -> BTreeMap<String, PathBuf> {
        self.providers
            .iter()
            .map(|(authority, root)| (authority.clone(), self.resolve(root)))
            .collect()
    }

    /// Grant store path with relative paths resolved
    pub fn grant_store(&self) -> PathBuf {
        self.resolve(&self.grants.store)
    }
}
