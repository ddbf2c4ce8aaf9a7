//! # Polywallet Provider
//!
//! The capabilities wallet adapters consume from the page they run in.
//!
//! Browser wallets are reached through an injected object (`window.ethereum`,
//! `window.BinanceChain`, `window.tronWeb`). Here each is an explicit
//! capability handed to the adapter instead of a global:
//!
//! - [`ChainProvider`] - EIP-1193 style `request` plus `chainChanged` /
//!   `accountsChanged` events
//! - [`TronProvider`] - the subset of TronWeb the adapters call
//! - [`InjectedEnvironment`] - lookup of whichever providers are present
//! - [`SessionStore`] - host-local key/value storage
//! - [`HostEvents`] - notifications adapters emit for the host
//! - [`BridgeDirectory`] - backend list of WalletConnect relay bridges
//!
//! ## Example
//!
//! ```ignore
//! use polywallet_provider::{ChainProvider, Injected};
//! use serde_json::json;
//!
//! let env = Injected::new().with_ethereum(provider);
//! if let Some(eth) = env.ethereum() {
//!     let accounts = eth.request("eth_requestAccounts", json!([])).await?;
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bridge;
pub mod client;
pub mod environment;
pub mod ethereum;
pub mod events;
pub mod store;
pub mod tron;

use thiserror::Error;

pub use bridge::{
    select_bridge, select_bridge_with, BridgeDirectory, BridgeProviderFactory, HttpBridgeDirectory,
    WalletConnectSession, WalletLinkOptions,
};
pub use client::{HttpClientConfig, RpcClient};
pub use environment::{Injected, InjectedEnvironment};
pub use ethereum::{
    methods, ChainProvider, EventHandler, ListenerId, ProviderEvent, ProviderFlags, Subscription,
    USER_REJECTED_CODE,
};
pub use events::{HostEvent, HostEvents, CHAIN_CHANGED_EVENT};
pub use store::{keys, MemoryStore, SessionStore};
pub use tron::{SendOptions, TronProvider};

/// The message Binance Chain Wallet reports when the user declines
pub const USER_REJECTED_SENTINEL: &str = "user rejected";

/// Provider-related errors
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider answered with a JSON-RPC style error
    #[error("RPC error: code={code}, message={message}")]
    Rpc {
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },

    /// The wallet reported the user declined the request
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The provider does not implement the method
    #[error("Unsupported method: {0}")]
    Unsupported(String),

    /// The provider or session is gone
    #[error("Provider disconnected")]
    Disconnected,

    /// The provider answered with something unexpected
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered with a non-success envelope
    #[error("Backend error: {0}")]
    Backend(String),
}

impl ProviderError {
    /// Builds an RPC error
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        ProviderError::Rpc {
            code,
            message: message.into(),
        }
    }

    /// The EIP-1193 "user rejected request" error
    pub fn user_rejected() -> Self {
        Self::rpc(USER_REJECTED_CODE, "User rejected the request.")
    }

    /// Checks if the user declined the request
    pub fn is_user_rejection(&self) -> bool {
        match self {
            ProviderError::Rpc { code, .. } => *code == USER_REJECTED_CODE,
            ProviderError::Rejected(reason) => reason == USER_REJECTED_SENTINEL,
            _ => false,
        }
    }
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;
