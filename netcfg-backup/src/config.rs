//! Configuration management for the backup tool.
//!
//! Loads configuration from an optional TOML file, then applies `.env` and
//! environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the archive passphrase.
pub const PASSPHRASE_ENV: &str = "NETCFG_ARCHIVE_PASSPHRASE";

/// Environment variable overriding the output root directory.
pub const OUTPUT_ROOT_ENV: &str = "NETCFG_OUTPUT_ROOT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the dated backup tree and the archive are created in
    #[serde(default = "default_output_root")]
    pub root: PathBuf,

    /// Directory holding the per-group inventory CSV files
    #[serde(default = "default_inventory_dir")]
    pub inventory_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// TCP port checked before opening a session
    #[serde(default = "default_probe_port")]
    pub port: u16,

    /// Connection attempts before a device is considered down
    #[serde(default = "default_probe_attempts")]
    pub attempts: u32,

    /// Per-attempt connect timeout
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound on one device's whole session (connect, elevate, fetch)
    #[serde(default = "default_session_timeout_secs")]
    pub timeout_secs: u64,

    /// Read timeout while waiting for a single command's output
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Abort the group on the first session failure instead of skipping the device
    #[serde(default)]
    pub fail_fast: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Passphrase protecting the encrypted archive
    #[serde(default)]
    pub passphrase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_inventory_dir() -> PathBuf {
    PathBuf::from("CSV")
}

fn default_probe_port() -> u16 {
    22
}

fn default_probe_attempts() -> u32 {
    2
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_session_timeout_secs() -> u64 {
    120
}

fn default_command_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
            inventory_dir: default_inventory_dir(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            port: default_probe_port(),
            attempts: default_probe_attempts(),
            timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_session_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            fail_fast: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `.env` and process environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        let _ = dotenvy::dotenv();

        if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
            self.archive.passphrase = passphrase;
        }
        if let Ok(root) = std::env::var(OUTPUT_ROOT_ENV) {
            self.output.root = PathBuf::from(root);
        }
        self
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.timeout_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session.timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.session.command_timeout_secs)
    }
}
