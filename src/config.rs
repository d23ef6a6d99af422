//! Runtime configuration
//!
//! Layered: defaults, then `config.yaml`, then `SECDASH_*` environment
//! variables, then command-line flags.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CALCULATING_HOLD, CONFIG_DIR_NAME, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS, MAX_POLL_ATTEMPTS,
    POLL_INTERVAL, TOAST_LIFETIME,
};

/// Command-line flags
#[derive(Debug, Default, Parser)]
#[command(name = "secdash", version, about = "Security operations KPI dashboard for the terminal")]
pub struct Cli {
    /// Base URL of the dashboard API
    #[arg(long)]
    pub api_url: Option<String>,

    /// Path to a config.yaml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Where to write logs
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_url: String,
    pub timeout_secs: u64,
    pub log_file: PathBuf,
    /// `EnvFilter` directive, e.g. `info` or `secdash_tui=debug`
    pub log_filter: String,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub calculating_hold_ms: u64,
    pub toast_lifetime_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_file: PathBuf::from("secdash.log"),
            log_filter: String::from("info"),
            poll_interval_ms: POLL_INTERVAL.as_millis() as u64,
            max_poll_attempts: MAX_POLL_ATTEMPTS,
            calculating_hold_ms: CALCULATING_HOLD.as_millis() as u64,
            toast_lifetime_ms: TOAST_LIFETIME.as_millis() as u64,
        }
    }
}

impl AppConfig {
    /// Load the full layered configuration
    pub fn load(cli: &Cli) -> Result<Self> {
        let path = cli.config.clone().unwrap_or_else(|| config_dir().join("config.yaml"));
        let mut cfg = Self::from_file(&path)?.unwrap_or_default();
        cfg.apply_env(|key| env::var(key).ok())?;
        cfg.apply_cli(cli);
        cfg.api_url = cfg.api_url.trim_end_matches('/').to_string();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Runs before logging is up, so bad values are errors rather than warnings
    pub fn validate(&self) -> Result<()> {
        ensure!(self.timeout_secs > 0, "timeout_secs must be greater than zero");
        ensure!(self.poll_interval_ms > 0, "poll_interval_ms must be greater than zero");
        ensure!(self.max_poll_attempts > 0, "max_poll_attempts must be greater than zero");
        Ok(())
    }

    /// Reads a YAML file; a missing file is not an error
    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let cfg = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(cfg))
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = var("SECDASH_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = var("SECDASH_LOG_FILE") {
            self.log_file = PathBuf::from(v);
        }
        if let Some(v) = var("SECDASH_LOG") {
            self.log_filter = v;
        }
        if let Some(v) = var("SECDASH_TIMEOUT_SECS") {
            self.timeout_secs = v
                .trim()
                .parse()
                .with_context(|| format!("SECDASH_TIMEOUT_SECS is not a number of seconds: {:?}", v))?;
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.api_url {
            self.api_url = url.clone();
        }
        if let Some(path) = &cli.log_file {
            self.log_file = path.clone();
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn toast_lifetime(&self) -> Duration {
        Duration::from_millis(self.toast_lifetime_ms)
    }
}

/// `~/.secdash`, or `./.secdash` when there is no home directory
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_file_then_env_then_cli() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "api_url: http://file:8000\ntimeout_secs: 5\nmax_poll_attempts: 10\n").unwrap();

        let mut cfg = AppConfig::from_file(&path).unwrap().unwrap();
        assert_eq!(cfg.api_url, "http://file:8000");
        assert_eq!(cfg.max_poll_attempts, 10);
        // Unset keys keep their defaults
        assert_eq!(cfg.poll_interval_ms, 2000);

        let vars: HashMap<&str, &str> =
            HashMap::from([("SECDASH_API_URL", "http://env:8000"), ("SECDASH_TIMEOUT_SECS", "12")]);
        cfg.apply_env(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.api_url, "http://env:8000");
        assert_eq!(cfg.timeout_secs, 12);

        let cli = Cli {
            api_url: Some("http://cli:8000".into()),
            ..Default::default()
        };
        cfg.apply_cli(&cli);
        assert_eq!(cfg.api_url, "http://cli:8000");
    }

    #[test]
    fn test_unparseable_timeout_env_is_an_error() {
        let mut cfg = AppConfig::default();
        let err = cfg
            .apply_env(|k| (k == "SECDASH_TIMEOUT_SECS").then(|| String::from("junk")))
            .unwrap_err();
        assert!(err.to_string().contains("SECDASH_TIMEOUT_SECS"));
        assert_eq!(cfg.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_zero_durations_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "poll_interval_ms: 0\n").unwrap();
        let cfg = AppConfig::from_file(&path).unwrap().unwrap();
        assert!(cfg.validate().is_err());

        let cfg = AppConfig {
            timeout_secs: 0,
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::from_file(&dir.path().join("nope.yaml")).unwrap().is_none());
    }

    #[test]
    fn test_bad_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "timeout_secs: [not a number").unwrap();
        assert!(AppConfig::from_file(&path).is_err());
    }
}
