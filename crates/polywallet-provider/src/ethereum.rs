//! EVM provider capability
//!
//! Modelled on EIP-1193: a single `request` entry point, a readable chain id
//! and change events.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::Result;

/// EIP-1193 code for a request the user declined
pub const USER_REJECTED_CODE: i64 = 4001;

/// Provider method names adapters call
pub mod methods {
    /// Requests account access
    pub const ETH_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    /// Reads a native balance
    pub const ETH_GET_BALANCE: &str = "eth_getBalance";
    /// Read-only contract call
    pub const ETH_CALL: &str = "eth_call";
    /// Submits a transaction for the wallet to sign
    pub const ETH_SEND_TRANSACTION: &str = "eth_sendTransaction";
    /// Reads a mined transaction's receipt
    pub const ETH_GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";
    /// Personal message signature
    pub const PERSONAL_SIGN: &str = "personal_sign";
    /// Switches to a chain the wallet knows
    pub const WALLET_SWITCH_ETHEREUM_CHAIN: &str = "wallet_switchEthereumChain";
    /// Adds (and switches to) a chain the wallet may not know
    pub const WALLET_ADD_ETHEREUM_CHAIN: &str = "wallet_addEthereumChain";
    /// Binance Chain Wallet network switch, params `[networkId]`
    pub const BNB_SWITCH_NETWORK: &str = "bnb_switchNetwork";
    /// Binance Chain Wallet account listing
    pub const BNB_REQUEST_ADDRESSES: &str = "bnb_requestAddresses";
    /// Binance Chain Wallet signature, params `[address, hexMessage]`
    pub const BNB_SIGN: &str = "bnb_sign";
}

/// Events a provider emits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The wallet moved to another chain; carries the new chain id
    ChainChanged(String),
    /// The exposed accounts changed; empty when the user disconnected
    AccountsChanged(Vec<String>),
    /// The wallet closed the connection
    Disconnect,
}

impl ProviderEvent {
    /// The provider-side event name
    pub fn name(&self) -> &'static str {
        match self {
            ProviderEvent::ChainChanged(_) => "chainChanged",
            ProviderEvent::AccountsChanged(_) => "accountsChanged",
            ProviderEvent::Disconnect => "disconnect",
        }
    }
}

/// Callback registered with [`ChainProvider::on`]
pub type EventHandler = Arc<dyn Fn(&ProviderEvent) + Send + Sync>;

/// Handle returned when registering a listener
pub type ListenerId = u64;

/// Identity flags some wallets set on their provider object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderFlags {
    /// Set by MetaMask
    pub is_metamask: bool,
    /// Set by Coinbase Wallet (WalletLink)
    pub is_wallet_link: bool,
}

/// An EVM wallet provider
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Sends a request and waits for the wallet's answer
    async fn request(&self, method: &str, params: Value) -> Result<Value>;

    /// The chain id the provider currently reports, as given (hex or decimal)
    fn chain_id(&self) -> Option<String>;

    /// Identity flags
    fn flags(&self) -> ProviderFlags {
        ProviderFlags::default()
    }

    /// Registers an event listener
    fn on(&self, handler: EventHandler) -> ListenerId;

    /// Removes a listener; unknown ids are ignored
    fn remove_listener(&self, id: ListenerId);

    /// Closes a bridge session; injected providers have nothing to close
    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }
}

type Cancel = Box<dyn FnOnce() + Send + Sync>;

/// Owns a set of registered listeners and removes them when unsubscribed or
/// dropped
#[derive(Default)]
pub struct Subscription {
    cancel: Option<Cancel>,
}

impl Subscription {
    /// Wraps an arbitrary removal callback
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Registers every handler on `provider`, removing them all on unsubscribe
    pub fn listen(provider: Arc<dyn ChainProvider>, handlers: Vec<EventHandler>) -> Self {
        let ids: Vec<ListenerId> = handlers.into_iter().map(|h| provider.on(h)).collect();
        Self::new(move || {
            for id in ids {
                provider.remove_listener(id);
            }
        })
    }

    /// Removes the listeners; calling again does nothing
    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Checks if listeners are still registered
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
