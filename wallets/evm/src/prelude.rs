//! This prelude module simplifies importing many useful items from the polywallet_evm crate using a glob import.
//!
//! To use this prelude, add the following to your code:
//! ```
//! use polywallet_evm::prelude::*;
//! ```

pub use crate::{
    binance_chain_wallet, coinbase_wallet, metamask, wallet_connect, ChainId, CoinbaseOptions,
    EvmContext, EvmSettings, EvmWalletAdapter, NetworkProfile, RpcEndpoints,
};

pub use polywallet_traits::prelude::*;
