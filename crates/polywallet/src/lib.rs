//! # Polywallet
//!
//! One [`WalletAdapter`](polywallet_traits::WalletAdapter) interface over the
//! browser wallets a betting front end offers: Tronlink, MetaMask,
//! WalletConnect, Coinbase Wallet and Binance Chain Wallet.
//!
//! ## Crates
//!
//! | Module | Crate | Contents |
//! |--------|-------|----------|
//! | [`error`] | `polywallet-error` | `WalletError`, `WalletStatus` |
//! | [`traits`] | `polywallet-traits` | `WalletAdapter`, `CurrencySelection` |
//! | [`provider`] | `polywallet-provider` | provider capabilities, store, host events |
//! | [`resilience`] | `polywallet-resilience` | bounded polling |
//! | [`erc20`] | `polywallet_erc20` | token contracts, allowance guard |
//! | [`evm`] | `polywallet_evm` | the four EVM wallets |
//! | [`tron`] | `polywallet_tron` | Tronlink |
//!
//! ## Example
//!
//! ```no_run
//! use polywallet::prelude::*;
//!
//! # async fn run(host: HostContext) -> Result<(), Box<dyn std::error::Error>> {
//! let config = WalletConfig::load("polywallet.json")?;
//! let mut wallets = WalletRegistry::standard(&config, host)?;
//!
//! if let Some(metamask) = wallets.by_name_mut("MetaMask") {
//!     metamask.enable(&CurrencySelection::native(ChainType::Eth)).await?;
//!     println!("{} holds {} ETH", metamask.address(), metamask.get_balance().await?);
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod config;
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;
pub mod registry;

pub use config::{ConfigError, PollSettings, WalletConfig, WalletConnectConfig};
pub use registry::{HostContext, WalletRegistry};

// ============================================================================
// Re-exports
// ============================================================================

pub use polywallet_erc20 as erc20;
pub use polywallet_error as error;
pub use polywallet_evm as evm;
pub use polywallet_provider as provider;
pub use polywallet_resilience as resilience;
pub use polywallet_traits as traits;
pub use polywallet_tron as tron;

/// Prelude module for convenient imports
///
/// ```
/// use polywallet::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{ConfigError, HostContext, PollSettings, WalletConfig, WalletRegistry};
    pub use polywallet_evm::{NetworkProfile, RpcEndpoints, CoinbaseOptions};
    pub use polywallet_provider::{HostEvent, HostEvents, MemoryStore, SessionStore};
    pub use polywallet_traits::prelude::*;
}

/// Returns the polywallet version
pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
