//! How each wallet finds its provider

use async_trait::async_trait;
use polywallet_provider::{
    select_bridge, BridgeDirectory, BridgeProviderFactory, ChainProvider, InjectedEnvironment,
    ProviderFlags, SessionStore, WalletConnectSession, WalletLinkOptions,
};
use polywallet_traits::{ChainType, WalletError, WalletResult};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::chain::{ChainId, ChainRules};

/// Page query parameter that pins the WalletConnect chain id
pub const WALLET_CONNECT_ID_PARAM: &str = "walletConnectId";

/// Locates the provider a wallet variant talks to
#[async_trait]
pub trait ProviderDetector: Send + Sync {
    /// Finds or builds the provider for a connection to `family`
    async fn detect(
        &self,
        family: ChainType,
        rules: &ChainRules,
    ) -> WalletResult<Arc<dyn ChainProvider>>;
}

fn flagged(
    env: &dyn InjectedEnvironment,
    flag: impl Fn(ProviderFlags) -> bool,
) -> Option<Arc<dyn ChainProvider>> {
    env.ethereum_providers()
        .into_iter()
        .filter(|p| flag(p.flags()))
        .last()
}

/// MetaMask: the flagged entry of `window.ethereum.providers`, else
/// `window.ethereum` itself
pub struct MetaMaskDetector {
    env: Arc<dyn InjectedEnvironment>,
}

impl MetaMaskDetector {
    /// Detects in `env`
    pub fn new(env: Arc<dyn InjectedEnvironment>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl ProviderDetector for MetaMaskDetector {
    async fn detect(&self, _family: ChainType, _rules: &ChainRules) -> WalletResult<Arc<dyn ChainProvider>> {
        let ethereum = self.env.ethereum().ok_or(WalletError::NotFound)?;
        match flagged(self.env.as_ref(), |f| f.is_metamask) {
            Some(provider) => {
                debug!("using MetaMask entry of a multi-provider page");
                Ok(provider)
            }
            None => Ok(ethereum),
        }
    }
}

/// Coinbase WalletLink settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinbaseOptions {
    /// Application name shown in the wallet
    pub app_name: String,
    /// Node the fallback provider reads through
    pub node_url: String,
}

impl Default for CoinbaseOptions {
    fn default() -> Self {
        Self {
            app_name: "bitgame".to_string(),
            node_url: "https://mainnet-infura.wallet.coinbase.com/v3/".to_string(),
        }
    }
}

/// Coinbase Wallet: the WalletLink-flagged injected entry, else a bridge
/// provider built by the host
pub struct CoinbaseDetector {
    env: Arc<dyn InjectedEnvironment>,
    factory: Arc<dyn BridgeProviderFactory>,
    options: CoinbaseOptions,
}

impl CoinbaseDetector {
    /// Detects in `env`, falling back to `factory`
    pub fn new(
        env: Arc<dyn InjectedEnvironment>,
        factory: Arc<dyn BridgeProviderFactory>,
        options: CoinbaseOptions,
    ) -> Self {
        Self {
            env,
            factory,
            options,
        }
    }
}

#[async_trait]
impl ProviderDetector for CoinbaseDetector {
    async fn detect(&self, family: ChainType, rules: &ChainRules) -> WalletResult<Arc<dyn ChainProvider>> {
        if self.env.ethereum().is_some() {
            if let Some(provider) = flagged(self.env.as_ref(), |f| f.is_wallet_link) {
                return Ok(provider);
            }
        }

        let chain_id = rules.target(family).ok_or(WalletError::ChainError)?;
        let options = WalletLinkOptions {
            app_name: self.options.app_name.clone(),
            node_url: self.options.node_url.clone(),
            chain_id: chain_id.value(),
        };
        debug!(chain = %chain_id, "building WalletLink provider");
        self.factory.wallet_link(&options).await.map_err(|e| {
            warn!(error = %e, "WalletLink provider unavailable");
            WalletError::NotFound
        })
    }
}

/// Binance Chain Wallet: `window.BinanceChain`
pub struct BinanceChainDetector {
    env: Arc<dyn InjectedEnvironment>,
}

impl BinanceChainDetector {
    /// Detects in `env`
    pub fn new(env: Arc<dyn InjectedEnvironment>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl ProviderDetector for BinanceChainDetector {
    async fn detect(&self, _family: ChainType, _rules: &ChainRules) -> WalletResult<Arc<dyn ChainProvider>> {
        self.env.binance_chain().ok_or(WalletError::NotFound)
    }
}

/// WalletConnect RPC endpoints, several per chain to spread load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcEndpoints(pub BTreeMap<u64, Vec<String>>);

impl RpcEndpoints {
    /// Picks one URL per chain at random
    pub fn pick(&self) -> BTreeMap<u64, String> {
        let mut rng = rand::thread_rng();
        self.0
            .iter()
            .filter_map(|(id, urls)| urls.choose(&mut rng).map(|url| (*id, url.clone())))
            .collect()
    }
}

impl Default for RpcEndpoints {
    fn default() -> Self {
        let bsc = [
            "https://bsc-dataseed.binance.org/",
            "https://bsc-dataseed1.defibit.io/",
            "https://bsc-dataseed1.ninicoin.io/",
            "https://bsc-dataseed2.defibit.io/",
            "https://bsc-dataseed3.defibit.io/",
            "https://bsc-dataseed4.defibit.io/",
            "https://bsc-dataseed2.ninicoin.io/",
            "https://bsc-dataseed3.ninicoin.io/",
            "https://bsc-dataseed4.ninicoin.io/",
            "https://bsc-dataseed1.binance.org/",
            "https://bsc-dataseed2.binance.org/",
            "https://bsc-dataseed3.binance.org/",
            "https://bsc-dataseed4.binance.org/",
        ];
        let bsc_testnet = [
            "https://data-seed-prebsc-1-s1.binance.org:8545/",
            "https://data-seed-prebsc-2-s1.binance.org:8545/",
            "https://data-seed-prebsc-1-s2.binance.org:8545/",
            "https://data-seed-prebsc-2-s2.binance.org:8545/",
            "https://data-seed-prebsc-1-s3.binance.org:8545/",
            "https://data-seed-prebsc-2-s3.binance.org:8545/",
        ];
        let to_vec = |urls: &[&str]| urls.iter().map(|u| u.to_string()).collect::<Vec<_>>();

        let mut map = BTreeMap::new();
        map.insert(ChainId::ETHEREUM.value(), vec!["https://cloudflare-eth.com".to_string()]);
        map.insert(ChainId::BSC.value(), to_vec(&bsc));
        map.insert(ChainId::BSC_TESTNET.value(), to_vec(&bsc_testnet));
        RpcEndpoints(map)
    }
}

/// WalletConnect: a relay session on a backend-approved bridge
pub struct WalletConnectDetector {
    env: Arc<dyn InjectedEnvironment>,
    directory: Arc<dyn BridgeDirectory>,
    store: Arc<dyn SessionStore>,
    factory: Arc<dyn BridgeProviderFactory>,
    rpc: RpcEndpoints,
}

impl WalletConnectDetector {
    /// Opens sessions through `factory` on bridges listed by `directory`
    pub fn new(
        env: Arc<dyn InjectedEnvironment>,
        directory: Arc<dyn BridgeDirectory>,
        store: Arc<dyn SessionStore>,
        factory: Arc<dyn BridgeProviderFactory>,
        rpc: RpcEndpoints,
    ) -> Self {
        Self {
            env,
            directory,
            store,
            factory,
            rpc,
        }
    }

    /// Chain id the session is requested on
    pub fn session_chain(&self, family: ChainType) -> u64 {
        let pinned = self
            .env
            .query_param(WALLET_CONNECT_ID_PARAM)
            .and_then(|raw| ChainId::parse(&raw).ok());
        match (pinned, family) {
            (Some(id), _) => id.value(),
            (None, ChainType::Bnb) => ChainId::BSC.value(),
            (None, _) => ChainId::ETHEREUM.value(),
        }
    }
}

#[async_trait]
impl ProviderDetector for WalletConnectDetector {
    async fn detect(&self, family: ChainType, _rules: &ChainRules) -> WalletResult<Arc<dyn ChainProvider>> {
        let hosts = self.directory.bridge_hosts().await.map_err(|e| {
            warn!(error = %e, "bridge list unavailable");
            WalletError::Fail
        })?;
        let bridge = select_bridge(&hosts, self.store.as_ref()).ok_or_else(|| {
            warn!("backend listed no bridges");
            WalletError::Fail
        })?;

        let session = WalletConnectSession {
            bridge: format!("https://{bridge}"),
            chain_id: self.session_chain(family),
            rpc: self.rpc.pick(),
        };
        debug!(bridge = %session.bridge, chain = session.chain_id, "opening WalletConnect session");
        self.factory.wallet_connect(&session).await.map_err(|e| {
            warn!(error = %e, "WalletConnect session could not be created");
            WalletError::NotFound
        })
    }
}
