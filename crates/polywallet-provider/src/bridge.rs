//! WalletConnect relay bridges and bridge-backed providers
//!
//! Wallets without an injected object (WalletConnect, the Coinbase Wallet
//! WalletLink fallback) are reached through a relay. The host supplies the
//! relay client through [`BridgeProviderFactory`]; this module picks the
//! relay.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::client::RpcClient;
use crate::ethereum::ChainProvider;
use crate::store::{keys, SessionStore};
use crate::{ProviderError, Result};

const SUCCESS_CODE: &str = "0000";

/// Source of acceptable relay bridge hosts
#[async_trait]
pub trait BridgeDirectory: Send + Sync {
    /// Host names (no scheme) of bridges the backend allows
    async fn bridge_hosts(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "rspCode")]
    rsp_code: String,
    #[serde(default)]
    data: Option<BridgeList>,
}

#[derive(Debug, Deserialize)]
struct BridgeList {
    #[serde(default)]
    list: Vec<String>,
}

/// [`BridgeDirectory`] backed by the `getWalletBridgeUrl` backend endpoint
#[derive(Debug)]
pub struct HttpBridgeDirectory {
    client: RpcClient,
    url: Url,
}

impl HttpBridgeDirectory {
    /// Path appended to the backend base URL
    pub const PATH: &'static str = "getWalletBridgeUrl";

    /// Creates a directory for the backend at `endpoint`
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_client(endpoint, RpcClient::new()?)
    }

    /// Creates a directory reusing an existing client
    pub fn with_client(endpoint: &str, client: RpcClient) -> Result<Self> {
        let mut base = endpoint.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let url = Url::parse(&base)
            .and_then(|u| u.join(Self::PATH))
            .map_err(|e| ProviderError::InvalidUrl(e.to_string()))?;
        Ok(Self { client, url })
    }

    /// The full endpoint URL
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl BridgeDirectory for HttpBridgeDirectory {
    async fn bridge_hosts(&self) -> Result<Vec<String>> {
        let envelope: Envelope = self.client.get(self.url.as_str()).await?;
        if envelope.rsp_code != SUCCESS_CODE {
            return Err(ProviderError::Backend(format!(
                "rspCode {}",
                envelope.rsp_code
            )));
        }
        let hosts = envelope.data.map(|d| d.list).unwrap_or_default();
        debug!(count = hosts.len(), "fetched bridge hosts");
        Ok(hosts)
    }
}

fn strip_scheme(url: &str) -> &str {
    url.trim_start_matches("https://").trim_start_matches("http://")
}

fn cached_session_bridge(store: &dyn SessionStore) -> Option<String> {
    let raw = store.get(keys::WALLET_CONNECT_SESSION)?;
    let session: serde_json::Value = serde_json::from_str(&raw).ok()?;
    let bridge = session.get("bridge")?.as_str()?;
    let host = strip_scheme(bridge);
    (!host.is_empty()).then(|| host.to_string())
}

/// Picks the relay bridge host to use, with the thread RNG
pub fn select_bridge(hosts: &[String], store: &dyn SessionStore) -> Option<String> {
    select_bridge_with(hosts, store, &mut rand::thread_rng())
}

/// Picks the relay bridge host to use.
///
/// A cached WalletConnect session on a bridge the backend no longer lists is
/// discarded. The previously saved bridge is kept while it stays listed;
/// otherwise a listed host is chosen at random and saved.
pub fn select_bridge_with<R: Rng + ?Sized>(
    hosts: &[String],
    store: &dyn SessionStore,
    rng: &mut R,
) -> Option<String> {
    if let Some(stale) = cached_session_bridge(store) {
        if !hosts.contains(&stale) {
            debug!(bridge = %stale, "discarding session cached on unlisted bridge");
            store.remove(keys::WALLET_CONNECT_SESSION);
        }
    }

    if let Some(saved) = store.get(keys::WALLET_CONNECT_BRIDGE) {
        if hosts.contains(&saved) {
            return Some(saved);
        }
    }

    let chosen = hosts.choose(rng)?.clone();
    info!(bridge = %chosen, "selected WalletConnect bridge");
    store.set(keys::WALLET_CONNECT_BRIDGE, &chosen);
    Some(chosen)
}

/// Parameters for a WalletConnect session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletConnectSession {
    /// Bridge URL including scheme
    pub bridge: String,
    /// Chain the session is requested on
    pub chain_id: u64,
    /// RPC URL per chain id for read calls
    pub rpc: BTreeMap<u64, String>,
}

/// Parameters for a Coinbase WalletLink provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletLinkOptions {
    /// Application name shown in the wallet
    pub app_name: String,
    /// JSON-RPC node used for reads
    pub node_url: String,
    /// Chain the provider starts on
    pub chain_id: u64,
}

/// Builds providers that talk to a wallet through a relay
#[async_trait]
pub trait BridgeProviderFactory: Send + Sync {
    /// Opens a WalletConnect session provider
    async fn wallet_connect(&self, session: &WalletConnectSession) -> Result<Arc<dyn ChainProvider>>;

    /// Creates a Coinbase WalletLink provider
    async fn wallet_link(&self, options: &WalletLinkOptions) -> Result<Arc<dyn ChainProvider>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn hosts() -> Vec<String> {
        vec!["bridge-a.example.org".to_string(), "bridge-b.example.org".to_string()]
    }

    #[test]
    fn test_directory_url() {
        let dir = HttpBridgeDirectory::new("https://api.example.org/wallet").unwrap();
        assert_eq!(dir.url().as_str(), "https://api.example.org/wallet/getWalletBridgeUrl");

        assert!(HttpBridgeDirectory::new("not a url").is_err());
    }

    #[test]
    fn test_empty_list_selects_nothing() {
        let store = MemoryStore::new();
        assert_eq!(select_bridge(&[], &store), None);
        assert!(store.get(keys::WALLET_CONNECT_BRIDGE).is_none());
    }

    #[test]
    fn test_saved_bridge_is_reused() {
        let store = MemoryStore::new();
        store.set(keys::WALLET_CONNECT_BRIDGE, "bridge-b.example.org");
        assert_eq!(select_bridge(&hosts(), &store).as_deref(), Some("bridge-b.example.org"));
    }

    #[test]
    fn test_unlisted_saved_bridge_is_replaced() {
        let store = MemoryStore::new();
        store.set(keys::WALLET_CONNECT_BRIDGE, "gone.example.org");
        let mut rng = StdRng::seed_from_u64(7);

        let chosen = select_bridge_with(&hosts(), &store, &mut rng).unwrap();
        assert!(hosts().contains(&chosen));
        assert_eq!(store.get(keys::WALLET_CONNECT_BRIDGE), Some(chosen));
    }

    #[test]
    fn test_stale_session_is_discarded() {
        let store = MemoryStore::new();
        store.set(keys::WALLET_CONNECT_SESSION, r#"{"bridge":"https://gone.example.org"}"#);
        select_bridge(&hosts(), &store);
        assert!(store.get(keys::WALLET_CONNECT_SESSION).is_none());
    }

    #[test]
    fn test_listed_session_is_kept() {
        let store = MemoryStore::new();
        store.set(keys::WALLET_CONNECT_SESSION, r#"{"bridge":"https://bridge-a.example.org"}"#);
        select_bridge(&hosts(), &store);
        assert!(store.get(keys::WALLET_CONNECT_SESSION).is_some());
    }

    #[test]
    fn test_unparseable_session_is_ignored() {
        let store = MemoryStore::new();
        store.set(keys::WALLET_CONNECT_SESSION, "{not json");
        assert!(select_bridge(&hosts(), &store).is_some());
        assert!(store.get(keys::WALLET_CONNECT_SESSION).is_some());
    }
}
