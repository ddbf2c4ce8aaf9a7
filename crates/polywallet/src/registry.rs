//! The ordered set of wallets offered to the host

use polywallet_evm::{binance_chain_wallet, coinbase_wallet, metamask, wallet_connect, EvmContext};
use polywallet_provider::{
    BridgeDirectory, BridgeProviderFactory, HostEvents, InjectedEnvironment, SessionStore,
};
use polywallet_traits::WalletAdapter;
use polywallet_tron::TronWalletAdapter;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::config::{ConfigError, WalletConfig};

/// What the host application provides to every wallet
#[derive(Clone)]
pub struct HostContext {
    /// Injected browser providers
    pub env: Arc<dyn InjectedEnvironment>,
    /// Host-local storage
    pub store: Arc<dyn SessionStore>,
    /// Builds WalletConnect and WalletLink relay providers
    pub bridges: Arc<dyn BridgeProviderFactory>,
    /// Relay bridge source; `None` uses `wallet_connect.bridge_endpoint`
    pub directory: Option<Arc<dyn BridgeDirectory>>,
    /// Host notifications
    pub events: HostEvents,
}

/// Fixed, ordered collection of wallet adapters.
///
/// The registry only looks adapters up; connecting, switching and logging
/// out all happen on the adapter itself.
pub struct WalletRegistry {
    adapters: Vec<Box<dyn WalletAdapter>>,
    events: HostEvents,
}

impl WalletRegistry {
    /// Wraps adapters in the order given
    pub fn new(adapters: Vec<Box<dyn WalletAdapter>>, events: HostEvents) -> Self {
        Self { adapters, events }
    }

    /// The five supported wallets: Tronlink, MetaMask, WalletConnect,
    /// CoinBase and Binance Chain Wallet, in that order
    pub fn standard(config: &WalletConfig, host: HostContext) -> Result<Self, ConfigError> {
        let directory = match host.directory {
            Some(directory) => directory,
            None => Arc::new(config.bridge_directory()?),
        };
        let ctx = EvmContext {
            env: host.env.clone(),
            store: host.store.clone(),
            events: host.events.clone(),
            settings: config.evm_settings()?,
        };

        let adapters: Vec<Box<dyn WalletAdapter>> = vec![
            Box::new(TronWalletAdapter::new(
                host.env.clone(),
                host.store.clone(),
                host.events.clone(),
                config.tron_settings()?,
            )),
            Box::new(metamask(&ctx)),
            Box::new(wallet_connect(
                &ctx,
                directory,
                host.bridges.clone(),
                config.wallet_connect.rpc.clone(),
            )),
            Box::new(coinbase_wallet(&ctx, host.bridges, config.coinbase.clone())),
            Box::new(binance_chain_wallet(&ctx)),
        ];
        debug!(count = adapters.len(), network = ?config.network, "wallet registry built");

        Ok(Self::new(adapters, host.events))
    }

    pub fn adapters(&self) -> &[Box<dyn WalletAdapter>] {
        &self.adapters
    }

    pub fn get(&self, index: usize) -> Option<&dyn WalletAdapter> {
        self.adapters.get(index).map(|a| a.as_ref())
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut (dyn WalletAdapter + 'static)> {
        self.adapters.get_mut(index).map(|a| a.as_mut())
    }

    /// Finds a wallet by display name, ignoring case
    pub fn by_name(&self, name: &str) -> Option<&dyn WalletAdapter> {
        self.position(name).and_then(|i| self.get(i))
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut (dyn WalletAdapter + 'static)> {
        let index = self.position(name)?;
        self.get_mut(index)
    }

    /// Display names in registry order
    pub fn names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// The bus the wallets publish host events on
    pub fn events(&self) -> &HostEvents {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.adapters
            .iter()
            .position(|a| a.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Debug for WalletRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletRegistry")
            .field("wallets", &self.names())
            .finish()
    }
}
