//! # Polywallet Traits
//!
//! The capability contract every wallet adapter implements, plus the small
//! value types that flow through it.
//!
//! ## Core Types
//!
//! - [`WalletAdapter`] - connect, switch currency, read balance, transfer, sign
//! - [`CurrencySelection`] - what the host wants to pay with
//! - [`ChainType`] - the chain families a currency can live on
//! - [`WalletInfo`] - static identity of a wallet variant
//!
//! ## Example
//!
//! ```ignore
//! use polywallet_traits::prelude::*;
//!
//! async fn connect(wallet: &mut dyn WalletAdapter) -> WalletResult<f64> {
//!     wallet.enable(&CurrencySelection::native(ChainType::Eth)).await?;
//!     wallet.get_balance().await
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use polywallet_error::{Result as WalletResult, WalletError, WalletStatus};

/// Chain families a currency can be paid on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChainType {
    /// Ethereum and its test networks
    #[serde(rename = "ETH")]
    Eth,
    /// Tron
    #[serde(rename = "TRX")]
    Trx,
    /// BNB Smart Chain
    #[serde(rename = "BNB")]
    Bnb,
}

/// Chains that settle through a contract call
pub const CONTRACT_CHAINS: [ChainType; 3] = [ChainType::Eth, ChainType::Trx, ChainType::Bnb];

impl ChainType {
    /// Returns the ticker used for the chain and its native coin
    pub fn symbol(&self) -> &'static str {
        match self {
            ChainType::Eth => "ETH",
            ChainType::Trx => "TRX",
            ChainType::Bnb => "BNB",
        }
    }

    /// Returns the native coin currency code
    pub fn native_currency(&self) -> &'static str {
        self.symbol()
    }

    /// Returns true for EVM-family chains
    pub fn is_evm(&self) -> bool {
        matches!(self, ChainType::Eth | ChainType::Bnb)
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for ChainType {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ETH" => Ok(ChainType::Eth),
            "TRX" => Ok(ChainType::Trx),
            "BNB" => Ok(ChainType::Bnb),
            _ => Err(WalletError::ChainError),
        }
    }
}

/// The currency a host wants to enable or pay with.
///
/// A `token` address routes balance reads and transfers through the token
/// contract; without one the chain's native coin is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencySelection {
    /// Currency code (e.g. "ETH", "USDT")
    pub currency: String,
    /// Chain the currency lives on
    pub chain: ChainType,
    /// Token contract address, absent for the native coin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl CurrencySelection {
    /// Selects the native coin of a chain
    pub fn native(chain: ChainType) -> Self {
        Self {
            currency: chain.native_currency().to_string(),
            chain,
            token: None,
        }
    }

    /// Selects a token contract on a chain
    pub fn token(currency: impl Into<String>, chain: ChainType, address: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            chain,
            token: Some(address.into()),
        }
    }

    /// Checks if this selection uses a token contract
    pub fn is_token(&self) -> bool {
        self.token.is_some()
    }
}

/// A betting order forwarded to the settlement contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Option identifier placed in the bet slip
    #[serde(rename = "optionId")]
    pub option_id: String,
}

impl Order {
    /// Creates a new order
    pub fn new(option_id: impl Into<String>) -> Self {
        Self {
            option_id: option_id.into(),
        }
    }
}

/// Block explorer link for the connected address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserLink {
    /// Explorer name (e.g. "Etherscan")
    pub name: String,
    /// Address page URL
    pub url: String,
}

impl BrowserLink {
    /// Creates a new link
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// The link reported when no session is active
    pub fn empty() -> Self {
        Self::default()
    }

    /// Checks if both fields are empty
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.url.is_empty()
    }
}

/// Static identity of a wallet variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletInfo {
    /// Display name
    pub name: String,
    /// Where users can install the wallet
    pub homepage: Option<String>,
    /// Chains the wallet can connect to
    pub supported_chains: Vec<ChainType>,
    /// Currencies the wallet can pay with
    pub supported_currencies: Vec<String>,
}

impl WalletInfo {
    /// Creates wallet identity from its supported chains, using their native coins as currencies
    pub fn new(name: impl Into<String>, homepage: Option<&str>, chains: &[ChainType]) -> Self {
        Self {
            name: name.into(),
            homepage: homepage.map(str::to_string),
            supported_chains: chains.to_vec(),
            supported_currencies: chains.iter().map(|c| c.native_currency().to_string()).collect(),
        }
    }

    /// Checks if the wallet can connect to the chain
    pub fn supports_chain(&self, chain: ChainType) -> bool {
        self.supported_chains.contains(&chain)
    }
}

/// The contract every wallet adapter implements.
///
/// Adapters never return provider or contract errors: each method converts
/// failures into a [`WalletError`] at its own boundary. Two reads degrade
/// instead of failing:
///
/// - [`get_balance`](Self::get_balance) reports `Ok(0.0)` when the read
///   itself fails, and only errors with [`WalletError::UserNotLogged`] when no
///   session exists.
/// - [`signature`](Self::signature) reports `None` on any failure.
///
/// Calls made before `enable` completes observe "not logged in" failures;
/// nothing is queued.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Returns the wallet identity
    fn info(&self) -> &WalletInfo;

    /// Returns the display name
    fn name(&self) -> &str {
        &self.info().name
    }

    /// Returns the connected address, empty when no session exists
    fn address(&self) -> &str;

    /// Returns true once `enable` has completed
    fn is_enabled(&self) -> bool;

    /// Returns the chain of the active session
    fn enabled_chain(&self) -> Option<ChainType>;

    /// Returns the currency of the active session
    fn enabled_currency(&self) -> Option<&str>;

    /// Connects the wallet for a currency.
    ///
    /// Returns immediately if already enabled with the same currency. Any
    /// failure logs the adapter out before returning.
    async fn enable(&mut self, selection: &CurrencySelection) -> WalletResult<()>;

    /// Switches the active currency without reconnecting
    async fn change_currency(&mut self, selection: &CurrencySelection) -> WalletResult<()>;

    /// Reads the balance of the active currency
    async fn get_balance(&self) -> WalletResult<f64>;

    /// Pays `amount` of the selected currency into the bet slip contract at `to`
    async fn transaction(
        &self,
        to: &str,
        amount: f64,
        order: &Order,
        selection: &CurrencySelection,
    ) -> WalletResult<()>;

    /// Requests a personal message signature
    async fn signature(&self, message: &str) -> Option<String>;

    /// Clears the session and detaches listeners
    async fn logout(&mut self);

    /// Returns the explorer link for the connected address
    fn browser(&self) -> BrowserLink;
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        BrowserLink, ChainType, CurrencySelection, Order, WalletAdapter, WalletError, WalletInfo,
        WalletResult, WalletStatus, CONTRACT_CHAINS,
    };
}
