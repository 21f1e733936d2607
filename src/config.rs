//! Configuration loading.
//!
//! Sources, in order of precedence: built-in defaults, an optional TOML file
//! (`payshield.toml` or `--config <FILE>`), then environment variables with
//! the `PAYSHIELD__` prefix (e.g. `PAYSHIELD__NETWORK__RPC_URL`).

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::types::ShieldError;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ShieldConfig {
    pub network: NetworkConfig,
    pub policy: PolicyConfig,
    pub judge: JudgeConfig,
    pub signing: SigningConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    /// Ticker -> contract address registry for swap probing.
    pub tokens: std::collections::HashMap<String, String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "cronos-testnet".to_string(),
            chain_id: 338,
            rpc_url: "https://evm-t3.cronos.org".to_string(),
            tokens: std::collections::HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Per-transaction cap in base units; `None` disables the check.
    pub max_amount: Option<String>,
    pub denylist: Vec<String>,
    pub rate_limit_max_calls: Option<usize>,
    pub rate_limit_window_secs: Option<u64>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_amount: Some("100000000".to_string()), // 100 USDC
            denylist: Vec::new(),
            rate_limit_max_calls: None,
            rate_limit_window_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/assess".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Wallet private key; usually supplied via environment.
    pub private_key: Option<String>,
    /// Payment validity window in seconds.
    pub timeout_seconds: u64,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self { private_key: None, timeout_seconds: 300 }
    }
}

impl ShieldConfig {
    /// Load configuration from file and environment.
    pub fn load(config_file: Option<&str>) -> Result<Self, ShieldError> {
        let mut builder = Config::builder();

        if let Some(path) = config_file {
            builder = builder.add_source(File::with_name(path));
        } else if Path::new("payshield.toml").exists() {
            builder = builder.add_source(File::with_name("payshield"));
        }

        builder = builder.add_source(Environment::with_prefix("PAYSHIELD").separator("__"));

        let raw = builder
            .build()
            .map_err(|e| ShieldError::Config(format!("failed to read configuration: {}", e)))?;
        let config: ShieldConfig = raw
            .try_deserialize()
            .map_err(|e| ShieldError::Config(format!("configuration parsing error: {}", e)))?;

        config.validate()?;
        info!(network = %config.network.name, "configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ShieldError> {
        if self.network.name.is_empty() {
            return Err(ShieldError::Config("network name must not be empty".to_string()));
        }
        if self.network.rpc_url.is_empty() {
            return Err(ShieldError::Config("RPC URL must not be empty".to_string()));
        }
        if self.signing.timeout_seconds == 0 {
            return Err(ShieldError::Config(
                "signing timeout must be at least one second".to_string(),
            ));
        }
        if self.rate_limit_enabled() && self.policy.rate_limit_max_calls == Some(0) {
            return Err(ShieldError::Config(
                "rate limit must allow at least one call".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rate_limit_enabled(&self) -> bool {
        self.policy.rate_limit_max_calls.is_some() && self.policy.rate_limit_window_secs.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ShieldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.network.name, "cronos-testnet");
        assert_eq!(config.network.chain_id, 338);
        assert_eq!(config.signing.timeout_seconds, 300);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = ShieldConfig::default();
        config.signing.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rate_limit_requires_both_knobs() {
        let mut config = ShieldConfig::default();
        config.policy.rate_limit_max_calls = Some(5);
        assert!(!config.rate_limit_enabled());
        config.policy.rate_limit_window_secs = Some(60);
        assert!(config.rate_limit_enabled());
    }
}
