//! CLI configuration file handling.
//!
//! A small TOML file supplies the defaults that flags and environment
//! variables override: the ledger path and the cloud endpoint. The
//! bearer token is never stored here; it comes from the auth
//! collaborator via `DIARY_TOKEN`.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DiaryConfig {
    #[serde(default)]
    pub diary: DiarySection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DiarySection {
    pub path: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServerSection {
    pub url: Option<String>,
}

impl DiaryConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read config {}: {}", path.display(), e))?;
        let config = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: DiaryConfig = toml::from_str(
            "[diary]\npath = \"/data/diary.db\"\n\n[server]\nurl = \"https://trial.example.com\"\n",
        )
        .unwrap();
        assert_eq!(config.diary.path.as_deref(), Some("/data/diary.db"));
        assert_eq!(
            config.server.url.as_deref(),
            Some("https://trial.example.com")
        );
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config: DiaryConfig = toml::from_str("").unwrap();
        assert!(config.diary.path.is_none());
        assert!(config.server.url.is_none());
    }
}
