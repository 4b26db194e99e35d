//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILSCANNER_CONFIG` (environment variable)
//! 2. `~/.config/mailscanner/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailscanner\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::source::ProviderProfile;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Remote mailbox settings.
    pub imap: ImapConfig,
    /// Synchronization tuning.
    pub sync: SyncConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Remote mailbox settings. Defaults describe Gmail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImapConfig {
    /// IMAP server host name.
    pub host: String,
    /// IMAPS port.
    pub port: u16,
    /// Folder holding every message of the account.
    pub all_folder: String,
    /// Folder holding the messages the account sent.
    pub sent_folder: String,
    /// Login name. The command line and `GMAIL_ADDRESS` take precedence.
    pub username: Option<String>,
}

/// Synchronization tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Identifiers inserted per transaction during discovery.
    pub batch_size: usize,
    /// Rows read per query when paging through a table.
    pub page_size: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ImapConfig {
    fn default() -> Self {
        let gmail = ProviderProfile::gmail();
        Self {
            host: gmail.host,
            port: gmail.port,
            all_folder: gmail.all_folder,
            sent_folder: gmail.sent_folder,
            username: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            page_size: 500,
        }
    }
}

impl ImapConfig {
    /// The provider profile described by this section.
    pub fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            host: self.host.clone(),
            port: self.port,
            all_folder: self.all_folder.clone(),
            sent_folder: self.sent_folder.clone(),
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILSCANNER_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailscanner").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailscanner")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.imap.host, "imap.gmail.com");
        assert_eq!(cfg.imap.port, 993);
        assert_eq!(cfg.imap.all_folder, "[Gmail]/All Mail");
        assert_eq!(cfg.imap.sent_folder, "[Gmail]/Sent Mail");
        assert_eq!(cfg.sync.batch_size, 1000);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.imap.host, cfg.imap.host);
        assert_eq!(parsed.imap.sent_folder, cfg.imap.sent_folder);
        assert_eq!(parsed.sync.page_size, cfg.sync.page_size);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[imap]
host = "imap.fastmail.com"
all_folder = "Archive"
sent_folder = "Sent"
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.imap.host, "imap.fastmail.com");
        assert_eq!(cfg.imap.port, 993);
        assert_eq!(cfg.general.log_level, "warn");

        let profile = cfg.imap.profile();
        assert_eq!(profile.all_folder, "Archive");
        assert_eq!(profile.sent_folder, "Sent");
    }
}
