use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::schedule::proposals::PROPOSALS_API_URL;
use crate::schedule::wiki::WIKI_SCHEDULE_URL;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub proposals: ProposalsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_url")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_store_path")]
    pub store_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_wiki_url")]
    pub wiki_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalsConfig {
    #[serde(default = "default_proposals_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub store_path: Option<String>,
    pub rpc_url: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/gate-tracker/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(store_path) = overrides.store_path {
            self.storage.store_path = store_path;
        }
        if let Some(rpc_url) = overrides.rpc_url {
            self.rpc.url = rpc_url;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_store_path(&self) -> PathBuf {
        expand_tilde(&self.storage.store_path)
    }

    pub fn default_template() -> String {
        let template = r#"[rpc]
url = "https://api.mainnet-beta.solana.com"

[storage]
store_path = "~/.local/share/gate-tracker/feature-gates.json"

[schedule]
wiki_url = "https://github.com/anza-xyz/agave/wiki/feature-gate-tracker-schedule.json"

[proposals]
api_url = "https://api.github.com/repos/solana-foundation/solana-improvement-documents/contents/proposals"
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            wiki_url: default_wiki_url(),
        }
    }
}

impl Default for ProposalsConfig {
    fn default() -> Self {
        Self {
            api_url: default_proposals_url(),
        }
    }
}

fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_store_path() -> String {
    "~/.local/share/gate-tracker/feature-gates.json".to_string()
}

fn default_wiki_url() -> String {
    WIKI_SCHEDULE_URL.to_string()
}

fn default_proposals_url() -> String {
    PROPOSALS_API_URL.to_string()
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigOverrides};

    #[test]
    fn template_parses_back_into_defaults() {
        let parsed: Config = toml::from_str(&Config::default_template()).expect("valid template");
        let defaults = Config::default();
        assert_eq!(parsed.rpc.url, defaults.rpc.url);
        assert_eq!(parsed.storage.store_path, defaults.storage.store_path);
        assert_eq!(parsed.schedule.wiki_url, defaults.schedule.wiki_url);
        assert_eq!(parsed.proposals.api_url, defaults.proposals.api_url);
    }

    #[test]
    fn overrides_replace_store_and_rpc() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            store_path: Some("/tmp/gates.json".to_string()),
            rpc_url: Some("http://localhost:8899".to_string()),
        });
        assert_eq!(config.storage.store_path, "/tmp/gates.json");
        assert_eq!(config.rpc.url, "http://localhost:8899");
    }

    #[test]
    fn partial_config_fills_missing_sections() {
        let parsed: Config =
            toml::from_str("[rpc]\nurl = \"http://localhost:8899\"\n").expect("partial config");
        assert_eq!(parsed.rpc.url, "http://localhost:8899");
        assert!(!parsed.storage.store_path.is_empty());
    }
}
