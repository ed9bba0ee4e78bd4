use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::client::ClientConfig;

/// Settings stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// base_domain = "https://api.darksky.net/"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,

    /// Overrides the default API endpoint when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_domain: Option<String>,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("net", "darksky", "darksky-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Store the API key, trimming surrounding whitespace.
    pub fn set_api_key(&mut self, api_key: &str) -> Result<()> {
        let key = api_key.trim();
        if key.is_empty() {
            return Err(anyhow!("API key must not be empty"));
        }

        self.api_key = Some(key.to_string());
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build a client configuration from the stored settings.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `darksky configure` and enter your API key."
            )
        })?;

        let config = ClientConfig::new(api_key);
        Ok(match &self.base_domain {
            Some(domain) => config.with_base_domain(domain.as_str()),
            None => config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DEFAULT_BASE_DOMAIN;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("darksky-core-test-{}-{name}", std::process::id()))
            .join("config.toml")
    }

    #[test]
    fn client_config_errors_when_key_not_set() {
        let cfg = Config::default();
        let err = cfg.client_config().unwrap_err();

        assert!(err.to_string().contains("No API key configured"));
        assert!(err.to_string().contains("Hint: run `darksky configure`"));
    }

    #[test]
    fn client_config_uses_default_domain() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY").unwrap();

        let client = cfg.client_config().expect("key is set");
        assert_eq!(client.api_key, "KEY");
        assert_eq!(client.base_domain, DEFAULT_BASE_DOMAIN);
        assert!(cfg.is_configured());
    }

    #[test]
    fn client_config_honours_base_domain_override() {
        let cfg = Config {
            api_key: Some("KEY".into()),
            base_domain: Some("http://localhost:9000/".into()),
        };

        let client = cfg.client_config().unwrap();
        assert_eq!(client.base_domain, "http://localhost:9000/");
    }

    #[test]
    fn set_api_key_trims_and_rejects_blank() {
        let mut cfg = Config::default();

        cfg.set_api_key("  abc \n").unwrap();
        assert_eq!(cfg.api_key.as_deref(), Some("abc"));

        assert!(cfg.set_api_key("   ").is_err());
        assert_eq!(cfg.api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn missing_file_loads_default() {
        let path = scratch_path("missing");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_then_load_keeps_settings() {
        let path = scratch_path("save");
        let cfg = Config { api_key: Some("KEY".into()), base_domain: None };

        cfg.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn invalid_toml_reports_path() {
        let path = scratch_path("invalid");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "api_key = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
