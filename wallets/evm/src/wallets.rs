//! Constructors for the four EVM wallets

use polywallet_provider::{
    BridgeDirectory, BridgeProviderFactory, HostEvents, InjectedEnvironment, SessionStore,
};
use std::sync::Arc;

use crate::adapter::{EvmSettings, EvmWalletAdapter};
use crate::detector::{
    BinanceChainDetector, CoinbaseDetector, CoinbaseOptions, MetaMaskDetector, RpcEndpoints,
    WalletConnectDetector,
};
use crate::variant::Variant;

/// What every EVM wallet is built from
#[derive(Clone)]
pub struct EvmContext {
    /// Injected providers
    pub env: Arc<dyn InjectedEnvironment>,
    /// Host-local storage
    pub store: Arc<dyn SessionStore>,
    /// Host notifications
    pub events: HostEvents,
    /// Timing and approval settings
    pub settings: EvmSettings,
}

impl EvmContext {
    fn adapter(&self, variant: Variant, detector: Box<dyn crate::ProviderDetector>) -> EvmWalletAdapter {
        EvmWalletAdapter::new(
            variant,
            detector,
            self.store.clone(),
            self.events.clone(),
            self.settings,
        )
    }
}

/// MetaMask
pub fn metamask(ctx: &EvmContext) -> EvmWalletAdapter {
    ctx.adapter(
        Variant::metamask(ctx.settings.network),
        Box::new(MetaMaskDetector::new(ctx.env.clone())),
    )
}

/// Coinbase Wallet, with a WalletLink fallback built by `factory`
pub fn coinbase_wallet(
    ctx: &EvmContext,
    factory: Arc<dyn BridgeProviderFactory>,
    options: CoinbaseOptions,
) -> EvmWalletAdapter {
    ctx.adapter(
        Variant::coinbase(ctx.settings.network),
        Box::new(CoinbaseDetector::new(ctx.env.clone(), factory, options)),
    )
}

/// Binance Chain Wallet
pub fn binance_chain_wallet(ctx: &EvmContext) -> EvmWalletAdapter {
    ctx.adapter(
        Variant::binance_chain(ctx.settings.network),
        Box::new(BinanceChainDetector::new(ctx.env.clone())),
    )
}

/// WalletConnect over a bridge from `directory`
pub fn wallet_connect(
    ctx: &EvmContext,
    directory: Arc<dyn BridgeDirectory>,
    factory: Arc<dyn BridgeProviderFactory>,
    rpc: RpcEndpoints,
) -> EvmWalletAdapter {
    ctx.adapter(
        Variant::wallet_connect(ctx.settings.network),
        Box::new(WalletConnectDetector::new(
            ctx.env.clone(),
            directory,
            ctx.store.clone(),
            factory,
            rpc,
        )),
    )
}
