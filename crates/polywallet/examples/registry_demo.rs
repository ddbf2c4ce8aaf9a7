//! Registry Demo
//!
//! Builds the standard wallet list over scripted providers and connects
//! MetaMask and Tronlink the way a front end would.
//!
//! Run with:
//! ```bash
//! POLYWALLET_LOG=debug cargo run -p polywallet --example registry_demo
//! ```

use polywallet::prelude::*;
use polywallet::provider::Injected;
use polywallet_testing::{
    fixtures, MockBridgeDirectory, MockBridgeFactory, MockEnvironment, MockEvmProvider,
    MockTronProvider,
};
use std::error::Error;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    polywallet::logging::init("polywallet=info");

    let ethereum = MockEvmProvider::metamask("0x38").with_accounts(&[fixtures::ACCOUNT]);
    ethereum.respond("eth_getBalance", serde_json::json!("0x1bc16d674ec80000"));
    let tron = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT)).with_balance(42_000_000);

    let host = HostContext {
        env: Arc::new(MockEnvironment::new(
            Injected::new()
                .with_ethereum(Arc::new(ethereum.clone()))
                .with_tron_web(Arc::new(tron)),
        )),
        store: Arc::new(MemoryStore::new()),
        bridges: Arc::new(MockBridgeFactory::new(ethereum)),
        directory: Some(Arc::new(MockBridgeDirectory::new(&["bridge.example.org"]))),
        events: HostEvents::default(),
    };
    let mut wallets = WalletRegistry::standard(&WalletConfig::default(), host)?;

    println!("Wallets: {}", wallets.names().join(", "));

    for (name, chain) in [("MetaMask", ChainType::Bnb), ("Tronlink", ChainType::Trx)] {
        let Some(wallet) = wallets.by_name_mut(name) else {
            continue;
        };
        match wallet.enable(&CurrencySelection::native(chain)).await {
            Ok(()) => {
                let balance = wallet.get_balance().await?;
                let link = wallet.browser();
                println!("{name}: {} holds {balance} {chain}", wallet.address());
                println!("  {} {}", link.name, link.url);
            }
            Err(e) => println!("{name}: {} ({e})", WalletStatus::from(e).code()),
        }
    }

    Ok(())
}
