//! Deployment and gateway configuration.
//!
//! The swarm reads one TOML file describing the gateways to target and the
//! bot population. Discovery follows the deployment-tool convention: a
//! marker config next to the running executable wins, then the working
//! directory.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Marker config file probed next to the executable.
pub const CONFIG_FILE_NAME: &str = "gatesim.toml";

/// Payload compression applied per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressFormat {
    /// Frames travel uncompressed.
    #[default]
    None,
    /// Each frame is deflate-compressed.
    Deflate,
}

/// One front-facing gateway the bots may connect to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Gateway host name or address.
    pub host: String,
    /// WebSocket port.
    pub port: u16,
    /// Connect over TLS (certificate validation stays disabled in this
    /// harness).
    #[serde(default)]
    pub encrypt: bool,
    /// Per-frame payload compression.
    #[serde(default)]
    pub compress: CompressFormat,
}

/// Randomized reconnect backoff bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Shortest delay between connect attempts, in milliseconds.
    pub min_delay_ms: u64,
    /// Longest delay between connect attempts, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_delay_ms: 1_000,
            max_delay_ms: 10_000,
        }
    }
}

/// Whole-swarm deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Number of simulated clients to run.
    pub bots: usize,
    /// Upgrade recoverable errors to process exit.
    pub strict: bool,
    /// Outbound flush / tick period in milliseconds.
    pub flush_interval_ms: u64,
    /// Reconnect backoff bounds.
    pub retry: RetryPolicy,
    /// Gateways to spread the bots across.
    #[serde(rename = "gate")]
    pub gates: Vec<GateConfig>,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            bots: 1,
            strict: false,
            flush_interval_ms: 100,
            retry: RetryPolicy::default(),
            gates: Vec::new(),
        }
    }
}

impl SwarmConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: SwarmConfig = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the swarm cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.bots == 0 {
            bail!("bots must be at least 1");
        }
        if self.gates.is_empty() {
            bail!("no gateways configured");
        }
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            bail!(
                "retry.min_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.min_delay_ms,
                self.retry.max_delay_ms
            );
        }
        Ok(())
    }

    /// Outbound flush / tick period.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

/// Locate `gatesim.toml` next to the running executable, falling back to
/// the working directory. Returns `None` when neither exists.
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    let cwd = PathBuf::from(CONFIG_FILE_NAME);
    cwd.is_file().then_some(cwd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let config: SwarmConfig = toml::from_str(
            r#"
            bots = 50
            strict = true
            flush_interval_ms = 200

            [retry]
            min_delay_ms = 500
            max_delay_ms = 2000

            [[gate]]
            host = "10.0.0.1"
            port = 8001
            encrypt = true
            compress = "deflate"

            [[gate]]
            host = "10.0.0.2"
            port = 8001
            "#,
        )
        .expect("parse");

        assert_eq!(config.bots, 50);
        assert!(config.strict);
        assert_eq!(config.flush_interval(), Duration::from_millis(200));
        assert_eq!(config.retry.min_delay_ms, 500);
        assert_eq!(config.gates.len(), 2);
        assert!(config.gates[0].encrypt);
        assert_eq!(config.gates[0].compress, CompressFormat::Deflate);
        assert!(!config.gates[1].encrypt);
        assert_eq!(config.gates[1].compress, CompressFormat::None);
        config.validate().expect("valid");
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let config: SwarmConfig = toml::from_str(
            r#"
            [[gate]]
            host = "localhost"
            port = 9000
            "#,
        )
        .expect("parse");

        assert_eq!(config.bots, 1);
        assert!(!config.strict);
        assert_eq!(config.flush_interval_ms, 100);
        assert_eq!(config.retry.min_delay_ms, 1_000);
        assert_eq!(config.retry.max_delay_ms, 10_000);
    }

    #[test]
    fn empty_gate_list_is_rejected() {
        let config = SwarmConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_retry_bounds_are_rejected() {
        let mut config = SwarmConfig {
            gates: vec![GateConfig {
                host: "localhost".into(),
                port: 1,
                encrypt: false,
                compress: CompressFormat::None,
            }],
            ..SwarmConfig::default()
        };
        config.retry = RetryPolicy {
            min_delay_ms: 100,
            max_delay_ms: 10,
        };
        assert!(config.validate().is_err());
    }
}
