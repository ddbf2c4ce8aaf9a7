//! Configuration
//!
//! Everything the adapters are built from, as one JSON document. Missing
//! fields fall back to their defaults, so a file only needs to name what it
//! changes.

use polywallet_evm::{CoinbaseOptions, EvmSettings, NetworkProfile, RpcEndpoints};
use polywallet_provider::{HttpBridgeDirectory, ProviderError};
use polywallet_resilience::PollConfig;
use polywallet_tron::TronSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid configuration JSON
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A poll schedule cannot run
    #[error("Invalid poll settings for {name}: {reason}")]
    InvalidPoll {
        /// Which schedule
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// WalletConnect needs a backend to list relay bridges
    #[error("wallet_connect.bridge_endpoint is not set")]
    MissingBridgeEndpoint,

    /// The bridge backend URL is unusable
    #[error("Bridge directory: {0}")]
    Bridge(#[from] ProviderError),
}

/// A poll schedule in milliseconds, bounded either by a number of checks or
/// by a time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    pub interval_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

impl PollSettings {
    pub fn within(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval_ms,
            timeout_ms: Some(timeout_ms),
            attempts: None,
        }
    }

    pub fn attempts(interval_ms: u64, attempts: u32) -> Self {
        Self {
            interval_ms,
            timeout_ms: None,
            attempts: Some(attempts),
        }
    }

    /// Converts to a runnable schedule; `attempts` wins when both bounds are set
    pub fn to_poll_config(&self, name: &'static str) -> Result<PollConfig, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidPoll {
            name,
            reason: reason.to_string(),
        };
        if self.interval_ms == 0 {
            return Err(invalid("interval_ms must be positive"));
        }
        let interval = Duration::from_millis(self.interval_ms);
        match (self.attempts, self.timeout_ms) {
            (Some(0), _) => Err(invalid("attempts must be positive")),
            (Some(n), _) => Ok(PollConfig::attempts(interval, n)),
            (None, Some(timeout)) if timeout < self.interval_ms => {
                Err(invalid("timeout_ms is shorter than one interval"))
            }
            (None, Some(timeout)) => Ok(PollConfig::within(interval, Duration::from_millis(timeout))),
            (None, None) => Err(invalid("needs attempts or timeout_ms")),
        }
    }
}

/// WalletConnect relay settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WalletConnectConfig {
    /// Backend base URL serving `getWalletBridgeUrl`
    pub bridge_endpoint: Option<String>,
    /// RPC URLs per chain id handed to the session
    pub rpc: RpcEndpoints,
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub network: NetworkProfile,
    pub chain_switch: PollSettings,
    pub tron_injection: PollSettings,
    pub approval_receipt: PollSettings,
    pub wallet_connect: WalletConnectConfig,
    pub coinbase: CoinbaseOptions,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: NetworkProfile::Mainnet,
            chain_switch: PollSettings::within(300, 5_000),
            tron_injection: PollSettings::attempts(10, 50),
            approval_receipt: PollSettings::within(1_000, 120_000),
            wallet_connect: WalletConnectConfig::default(),
            coinbase: CoinbaseOptions::default(),
        }
    }
}

impl WalletConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Checks every poll schedule
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.evm_settings()?;
        self.tron_settings()?;
        Ok(())
    }

    pub fn evm_settings(&self) -> Result<EvmSettings, ConfigError> {
        Ok(EvmSettings {
            network: self.network,
            chain_switch: self.chain_switch.to_poll_config("chain_switch")?,
            approval_receipt: self.approval_receipt.to_poll_config("approval_receipt")?,
            ..EvmSettings::default()
        })
    }

    pub fn tron_settings(&self) -> Result<TronSettings, ConfigError> {
        Ok(TronSettings {
            injection: self.tron_injection.to_poll_config("tron_injection")?,
        })
    }

    /// The HTTP bridge directory for `wallet_connect.bridge_endpoint`
    pub fn bridge_directory(&self) -> Result<HttpBridgeDirectory, ConfigError> {
        let endpoint = self
            .wallet_connect
            .bridge_endpoint
            .as_deref()
            .ok_or(ConfigError::MissingBridgeEndpoint)?;
        Ok(HttpBridgeDirectory::new(endpoint)?)
    }
}
