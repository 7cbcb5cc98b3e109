// src/config.rs
// =============================================================================
// Crawl configuration.
//
// Values come from three places, later ones winning:
// 1. built-in defaults
// 2. an optional TOML file (--config mirror.toml)
// 3. command-line flags
//
// Example file:
//
//   threads = 20
//   delay_secs = 0.5
//   request_timeout_secs = 30
//   output_dir = "/tmp/mirrors"
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{MirrorError, Result};

/// Every tunable of a mirroring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Number of concurrent workers
    pub threads: usize,
    /// Politeness delay each worker sleeps before every page fetch
    pub delay_secs: f64,
    /// Timeout for a single GET
    pub request_timeout_secs: u64,
    /// How long an idle worker waits for new work before exiting
    pub idle_timeout_secs: u64,
    /// How long the orchestrator waits for workers after the crawl is done
    pub grace_period_secs: u64,
    /// How often the progress line is logged
    pub progress_interval_secs: u64,
    /// Cap on what the HTML rewriter may buffer for one page. A page that
    /// needs more is saved without rewriting and counted as an error.
    pub rewrite_memory_limit_bytes: usize,
    pub user_agent: String,
    /// Directory in which `mirror_<host>` is created
    pub output_dir: PathBuf,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            threads: 10,
            delay_secs: 0.1,
            request_timeout_secs: 30,
            idle_timeout_secs: 10,
            grace_period_secs: 2,
            progress_interval_secs: 2,
            rewrite_memory_limit_bytes: 64 * 1024 * 1024,
            user_agent: concat!("site-mirror/", env!("CARGO_PKG_VERSION")).to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl MirrorConfig {
    /// Parses a TOML config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            MirrorError::setup(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Builds the effective config: file (if given) then CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Overrides file/default values with flags the user actually passed.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(threads) = cli.threads {
            self.threads = threads;
        }
        if let Some(delay) = cli.delay {
            self.delay_secs = delay;
        }
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
    }

    /// Rejects values the crawl can't run with.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(MirrorError::setup("threads must be at least 1"));
        }
        self.delay()?;
        if self.request_timeout_secs == 0 {
            return Err(MirrorError::setup("request_timeout_secs must be greater than 0"));
        }
        if self.idle_timeout_secs == 0 {
            return Err(MirrorError::setup("idle_timeout_secs must be greater than 0"));
        }
        if self.progress_interval_secs == 0 {
            return Err(MirrorError::setup("progress_interval_secs must be greater than 0"));
        }
        if self.rewrite_memory_limit_bytes == 0 {
            return Err(MirrorError::setup("rewrite_memory_limit_bytes must be greater than 0"));
        }
        Ok(())
    }

    /// The politeness delay as a Duration. Fails for negative or non-finite values.
    pub fn delay(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.delay_secs)
            .map_err(|_| MirrorError::setup(format!("invalid delay: {}", self.delay_secs)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults() {
        let config = MirrorConfig::default();
        assert_eq!(config.threads, 10);
        assert_eq!(config.delay_secs, 0.1);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MirrorConfig::from_toml("threads = 3\ndelay_secs = 0.5\n").unwrap();
        assert_eq!(config.threads, 3);
        assert_eq!(config.delay_secs, 0.5);
        assert_eq!(config.idle_timeout_secs, 10);
        assert_eq!(config.rewrite_memory_limit_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = MirrorConfig::from_toml("threads = \"many\"").unwrap_err();
        assert!(matches!(err, MirrorError::Config(_)));
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mirror.toml");
        std::fs::write(&path, "threads = 3\ndelay_secs = 0.5\n").unwrap();

        let cli = Cli::parse_from([
            "site-mirror",
            "https://example.com",
            "--config",
            path.to_str().unwrap(),
            "-t",
            "7",
        ]);
        let config = MirrorConfig::load(&cli).unwrap();

        assert_eq!(config.threads, 7);
        assert_eq!(config.delay_secs, 0.5);
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let cli = Cli::parse_from(["site-mirror", "https://example.com", "-c", "/nonexistent/mirror.toml"]);
        assert!(MirrorConfig::load(&cli).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let zero_threads = MirrorConfig {
            threads: 0,
            ..MirrorConfig::default()
        };
        assert!(zero_threads.validate().is_err());

        let negative_delay = MirrorConfig {
            delay_secs: -1.0,
            ..MirrorConfig::default()
        };
        assert!(negative_delay.validate().is_err());
    }
}
