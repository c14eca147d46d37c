use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::tone::Tone;

/// Base URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable that overrides the configured base URL.
pub const API_URL_ENV: &str = "FREY_API_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Like `load_from`, but an unreadable or malformed file gives the
    /// defaults and the reason instead of an error, so it can be rewritten.
    pub fn load_lenient_from(path: &Path) -> (Self, Option<String>) {
        match Self::load_from(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::new(), Some(e.to_string())),
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Resolve the API base URL once, in precedence order:
    /// command line, `FREY_API_URL`, config file, built-in default.
    pub fn resolve_api_url(&self, cli_override: Option<&str>) -> String {
        let env_value = std::env::var(API_URL_ENV).ok();
        self.resolve_api_url_with(cli_override, env_value.as_deref())
    }

    fn resolve_api_url_with(&self, cli_override: Option<&str>, env_value: Option<&str>) -> String {
        [cli_override, env_value, self.api_base_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .map(normalize_base_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Starting tone for the generator; unknown labels fall back to the first tone.
    pub fn initial_tone(&self) -> Tone {
        self.default_tone
            .as_deref()
            .and_then(|label| label.parse().ok())
            .unwrap_or_default()
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("frey").join("config.json"))
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            api_base_url: Some("http://example.test:9000".to_string()),
            default_tone: Some("Amical".to_string()),
            log_file: None,
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    fn malformed_file_can_be_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ \"api_base_url\": ").unwrap();

        let (mut config, warning) = Config::load_lenient_from(&path);
        assert_eq!(config, Config::new());
        assert!(warning.unwrap().contains("Invalid config file"));

        config.api_base_url = Some("http://fixed:8000".to_string());
        config.save_to(&path).unwrap();
        let (reloaded, warning) = Config::load_lenient_from(&path);
        assert_eq!(warning, None);
        assert_eq!(reloaded.api_base_url.as_deref(), Some("http://fixed:8000"));
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let config = Config {
            api_base_url: Some("http://file:1".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_api_url_with(Some("http://cli:1/"), Some("http://env:1")),
            "http://cli:1"
        );
        assert_eq!(config.resolve_api_url_with(None, Some("http://env:1")), "http://env:1");
        assert_eq!(config.resolve_api_url_with(None, None), "http://file:1");
    }

    #[test]
    fn blank_values_fall_through_to_default() {
        let config = Config {
            api_base_url: Some("   ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolve_api_url_with(Some(""), Some(" ")), DEFAULT_API_URL);
    }

    #[test]
    fn unknown_default_tone_falls_back() {
        let mut config = Config::new();
        assert_eq!(config.initial_tone(), Tone::Professionnel);
        config.default_tone = Some("drole".to_string());
        assert_eq!(config.initial_tone(), Tone::Drole);
        config.default_tone = Some("sarcastique".to_string());
        assert_eq!(config.initial_tone(), Tone::Professionnel);
    }
}
