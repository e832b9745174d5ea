/// Configuration management for htredirects
///
/// htredirects stores configuration in ~/.htredirects/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// htredirects configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Site settings
    #[serde(default)]
    pub site: SiteConfig,

    /// Rule defaults
    #[serde(default)]
    pub rules: RulesConfig,

    /// Backup settings
    #[serde(default)]
    pub backup: BackupConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            rules: RulesConfig::default(),
            backup: BackupConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Path to the .htaccess file being managed
    #[serde(default)]
    pub htaccess_path: Option<String>,

    /// Site host prefix stripped from URLs on save (e.g. "https://example.com")
    #[serde(default)]
    pub host: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Default redirect status code for new rules
    #[serde(default = "default_status")]
    pub default_status: Option<u16>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            default_status: Some(301),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Keep a timestamped copy of the file before every save
    #[serde(default = "default_enabled")]
    pub enabled: Option<bool>,

    /// Custom backup directory (defaults to ~/.htredirects/backups)
    #[serde(default)]
    pub backup_dir: Option<String>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: Some(true),
            backup_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write debug logs to ~/.htredirects/htredirects.log
    #[serde(default = "default_debug")]
    pub debug: Option<bool>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { debug: Some(false) }
    }
}

// Default functions for serde
fn default_status() -> Option<u16> { Some(301) }
fn default_enabled() -> Option<bool> { Some(true) }
fn default_debug() -> Option<bool> { Some(false) }

impl Config {
    /// Resolved backup directory, honoring the configured override.
    pub fn backup_dir(&self) -> Result<Option<PathBuf>> {
        if self.backup.enabled != Some(true) {
            return Ok(None);
        }

        if let Some(dir) = &self.backup.backup_dir {
            return Ok(Some(PathBuf::from(dir)));
        }

        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
        Ok(Some(home_dir.join(".htredirects").join("backups")))
    }
}

/// Get the configuration file path
pub fn config_file_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;

    let config_dir = home_dir.join(".htredirects");
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;

    Ok(config_dir.join("config.toml"))
}

/// Get the default configuration file content with comments
fn get_default_config_content() -> &'static str {
    r#"# htredirects Configuration File
#
# This file controls default behavior for htredirects. Values set here can
# be overridden by command-line flags.

[site]
# Path to the .htaccess file being managed (usually your public web root).
#htaccess_path = "/var/www/public/.htaccess"

# Site host prefix stripped from URLs when rules are saved.
# With this set, pasting "https://example.com/old-page" as a source URL
# stores it as "/old-page".
#host = "https://example.com"

[rules]
# Default redirect status code for new rules (default: 301)
# 301 - permanent redirect, 302 - temporary redirect
default_status = 301

[backup]
# Keep a timestamped copy of the file before every save (default: true)
enabled = true

# Custom backup directory (optional)
# Uncomment to use a custom location instead of ~/.htredirects/backups/
#backup_dir = "/mnt/backups/htredirects"

[logging]
# Write debug logs to ~/.htredirects/htredirects.log (default: false)
debug = false
"#
}

/// Save the default commented configuration file
pub fn save_default_config() -> Result<()> {
    let config_path = config_file_path()?;

    fs::write(&config_path, get_default_config_content())
        .with_context(|| format!("Failed to write default config file: {}", config_path.display()))?;

    Ok(())
}

/// Load configuration from file, creating default if needed
///
/// If the config file doesn't exist, creates it with defaults and returns them.
/// If the config file is malformed, recreates it with defaults.
pub fn load_config() -> Result<Config> {
    let config_path = config_file_path()?;

    if !config_path.exists() {
        save_default_config()?;
    }

    let config_str = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

    let config: Config = match toml::from_str(&config_str) {
        Ok(config) => config,
        Err(_) => {
            // Config is malformed, recreate with defaults
            save_default_config()?;
            return Ok(Config::default());
        }
    };

    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &Config) -> Result<()> {
    let config_path = config_file_path()?;

    let config_str = toml::to_string_pretty(config)
        .context("Failed to serialize config")?;

    fs::write(&config_path, config_str)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    Ok(())
}

/// Validate configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(status) = config.rules.default_status {
        if !(300..=399).contains(&status) {
            anyhow::bail!("Invalid default_status: {} (must be a 3xx code)", status);
        }
    }

    if let Some(host) = &config.site.host {
        if !host.is_empty() && !host.starts_with("http") {
            anyhow::bail!("Invalid host: {} (must start with http or https)", host);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.rules.default_status, Some(301));
        assert_eq!(config.backup.enabled, Some(true));
        assert_eq!(config.logging.debug, Some(false));
        assert!(config.site.htaccess_path.is_none());
    }

    #[test]
    fn test_validate_config_valid() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_config_invalid_status() {
        let mut config = Config::default();
        config.rules.default_status = Some(200);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_invalid_host() {
        let mut config = Config::default();
        config.site.host = Some("example.com".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[site]"));
        assert!(toml_str.contains("[rules]"));
        assert!(toml_str.contains("[backup]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_default_config_template_parses() {
        let config: Config = toml::from_str(get_default_config_content()).unwrap();
        assert_eq!(config.rules.default_status, Some(301));
    }

    #[test]
    fn test_backup_dir_disabled() {
        let mut config = Config::default();
        config.backup.enabled = Some(false);
        assert!(config.backup_dir().unwrap().is_none());
    }

    #[test]
    fn test_backup_dir_override() {
        let mut config = Config::default();
        config.backup.backup_dir = Some("/tmp/custom".to_string());
        assert_eq!(
            config.backup_dir().unwrap(),
            Some(PathBuf::from("/tmp/custom"))
        );
    }
}
