//! # Polywallet EVM Wallets
//!
//! MetaMask, Coinbase Wallet, Binance Chain Wallet and WalletConnect share
//! one adapter, [`EvmWalletAdapter`], parameterised by a [`Variant`] and a
//! [`ProviderDetector`]. Connecting runs the same steps for each:
//!
//! 1. detect the provider
//! 2. negotiate the chain with [`ChainNegotiator`], polling until the
//!    wallet really is on the target chain
//! 3. request the account
//!
//! Token payments pass through `polywallet_erc20`'s allowance guard first.
//!
//! ## Example
//!
//! ```no_run
//! use polywallet_evm::prelude::*;
//! use polywallet_provider::{HostEvents, Injected, MemoryStore};
//! use std::sync::Arc;
//!
//! # async fn connect() -> WalletResult<()> {
//! let ctx = EvmContext {
//!     env: Arc::new(Injected::new()),
//!     store: Arc::new(MemoryStore::new()),
//!     events: HostEvents::default(),
//!     settings: EvmSettings::default(),
//! };
//! let mut wallet = metamask(&ctx);
//! wallet.enable(&CurrencySelection::native(ChainType::Eth)).await?;
//! println!("connected {} on {}", wallet.address(), wallet.browser().url);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod chain;
pub mod detector;
pub mod negotiator;
pub mod variant;
mod wallets;

pub use adapter::{EvmSettings, EvmWalletAdapter};
pub use chain::{family_of, ChainId, ChainRules, NetworkProfile};
pub use detector::{CoinbaseOptions, ProviderDetector, RpcEndpoints};
pub use negotiator::{ChainNegotiator, NegotiationOutcome, NegotiationState};
pub use variant::Variant;
pub use wallets::{binance_chain_wallet, coinbase_wallet, metamask, wallet_connect, EvmContext};

pub mod prelude;
