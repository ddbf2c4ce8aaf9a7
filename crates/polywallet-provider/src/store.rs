//! Host-local key/value storage (the page's `localStorage`)

use dashmap::DashMap;

/// Storage keys shared with the host page
pub mod keys {
    /// Set while the host is logged in through a contract wallet
    pub const CONTRACT_WALLET: &str = "BITGAME_CONTRACT_WALLET";
    /// Currency to restore after a reload
    pub const CONTRACT_CURRENCY: &str = "BITGAME_CONTRACT_CURRENCY";
    /// Last chosen WalletConnect relay bridge host
    pub const WALLET_CONNECT_BRIDGE: &str = "walletConnectBridgeUrl";
    /// Cached WalletConnect session (JSON with a `bridge` field)
    pub const WALLET_CONNECT_SESSION: &str = "walletconnect";
}

/// String key/value storage that outlives an adapter session
pub trait SessionStore: Send + Sync {
    /// Reads a value
    fn get(&self, key: &str) -> Option<String>;

    /// Writes a value
    fn set(&self, key: &str, value: &str);

    /// Deletes a value
    fn remove(&self, key: &str);
}

/// In-memory [`SessionStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}
