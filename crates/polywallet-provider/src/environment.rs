//! Lookup of the providers a page has injected

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::ethereum::ChainProvider;
use crate::tron::TronProvider;

/// What the host page exposes to adapters.
///
/// Every lookup is live: adapters call these on each connect attempt, so a
/// provider injected late is picked up by the next poll.
pub trait InjectedEnvironment: Send + Sync {
    /// `window.ethereum`
    fn ethereum(&self) -> Option<Arc<dyn ChainProvider>>;

    /// `window.ethereum.providers`, empty when only one wallet is installed
    fn ethereum_providers(&self) -> Vec<Arc<dyn ChainProvider>>;

    /// `window.BinanceChain`
    fn binance_chain(&self) -> Option<Arc<dyn ChainProvider>>;

    /// `window.tronWeb`
    fn tron_web(&self) -> Option<Arc<dyn TronProvider>>;

    /// A query parameter of the page URL
    fn query_param(&self, name: &str) -> Option<String>;
}

#[derive(Default)]
struct Slots {
    ethereum: Option<Arc<dyn ChainProvider>>,
    providers: Vec<Arc<dyn ChainProvider>>,
    binance_chain: Option<Arc<dyn ChainProvider>>,
    tron_web: Option<Arc<dyn TronProvider>>,
    query: HashMap<String, String>,
}

/// An [`InjectedEnvironment`] whose slots the host fills in
#[derive(Default, Clone)]
pub struct Injected {
    slots: Arc<RwLock<Slots>>,
}

impl Injected {
    /// Creates an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Slots> {
        self.slots.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slots> {
        self.slots.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sets `window.ethereum`
    pub fn with_ethereum(self, provider: Arc<dyn ChainProvider>) -> Self {
        self.set_ethereum(Some(provider));
        self
    }

    /// Adds an entry to `window.ethereum.providers`
    pub fn with_provider(self, provider: Arc<dyn ChainProvider>) -> Self {
        self.write().providers.push(provider);
        self
    }

    /// Sets `window.BinanceChain`
    pub fn with_binance_chain(self, provider: Arc<dyn ChainProvider>) -> Self {
        self.write().binance_chain = Some(provider);
        self
    }

    /// Sets `window.tronWeb`
    pub fn with_tron_web(self, provider: Arc<dyn TronProvider>) -> Self {
        self.set_tron_web(Some(provider));
        self
    }

    /// Sets a page query parameter
    pub fn with_query_param(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.write().query.insert(name.into(), value.into());
        self
    }

    /// Replaces `window.ethereum`
    pub fn set_ethereum(&self, provider: Option<Arc<dyn ChainProvider>>) {
        self.write().ethereum = provider;
    }

    /// Replaces `window.tronWeb`, e.g. once the extension finishes injecting
    pub fn set_tron_web(&self, provider: Option<Arc<dyn TronProvider>>) {
        self.write().tron_web = provider;
    }
}

impl InjectedEnvironment for Injected {
    fn ethereum(&self) -> Option<Arc<dyn ChainProvider>> {
        self.read().ethereum.clone()
    }

    fn ethereum_providers(&self) -> Vec<Arc<dyn ChainProvider>> {
        self.read().providers.clone()
    }

    fn binance_chain(&self) -> Option<Arc<dyn ChainProvider>> {
        self.read().binance_chain.clone()
    }

    fn tron_web(&self) -> Option<Arc<dyn TronProvider>> {
        self.read().tron_web.clone()
    }

    fn query_param(&self, name: &str) -> Option<String> {
        self.read().query.get(name).cloned()
    }
}

impl fmt::Debug for Injected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.read();
        f.debug_struct("Injected")
            .field("ethereum", &slots.ethereum.is_some())
            .field("providers", &slots.providers.len())
            .field("binance_chain", &slots.binance_chain.is_some())
            .field("tron_web", &slots.tron_web.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_environment() {
        let env = Injected::new();
        assert!(env.ethereum().is_none());
        assert!(env.ethereum_providers().is_empty());
        assert!(env.binance_chain().is_none());
        assert!(env.tron_web().is_none());
        assert_eq!(env.query_param("walletConnectId"), None);
    }

    #[test]
    fn test_query_params() {
        let env = Injected::new().with_query_param("walletConnectId", "97");
        assert_eq!(env.query_param("walletConnectId").as_deref(), Some("97"));
    }

    #[test]
    fn test_clones_share_slots() {
        let env = Injected::new();
        let view = env.clone();
        env.set_tron_web(None);
        assert!(view.tron_web().is_none());
        assert!(format!("{view:?}").contains("tron_web: false"));
    }
}
