//! MetaMask adapter against a scripted provider
//!
//! MetaMask is the reference EVM flow: negotiate the chain, then request the
//! account. Most generic adapter behaviour is checked here.

use polywallet_evm::prelude::*;
use polywallet_provider::{keys, methods, HostEvent, HostEvents, Injected, MemoryStore, ProviderEvent, SessionStore};
use polywallet_resilience::PollConfig;
use polywallet_testing::{fixtures, selectors, MockEnvironment, MockEvmProvider, MockReply, SwitchBehavior};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct Harness {
    env: Arc<MockEnvironment>,
    store: Arc<MemoryStore>,
    events: HostEvents,
    wallet: EvmWalletAdapter,
}

fn harness(provider: &MockEvmProvider) -> Harness {
    let env = Arc::new(MockEnvironment::new(
        Injected::new().with_ethereum(Arc::new(provider.clone())),
    ));
    let store = Arc::new(MemoryStore::new());
    let events = HostEvents::default();
    let ctx = EvmContext {
        env: env.clone(),
        store: store.clone(),
        events: events.clone(),
        settings: EvmSettings {
            approval_receipt: PollConfig::attempts(Duration::from_millis(10), 3),
            ..EvmSettings::default()
        },
    };
    Harness {
        wallet: metamask(&ctx),
        env,
        store,
        events,
    }
}

fn eth() -> CurrencySelection {
    CurrencySelection::native(ChainType::Eth)
}

fn usdt() -> CurrencySelection {
    CurrencySelection::token("USDT", ChainType::Eth, fixtures::TOKEN)
}

fn bet_slip_sends(provider: &MockEvmProvider) -> usize {
    provider
        .requests()
        .iter()
        .filter(|r| {
            r.method == methods::ETH_SEND_TRANSACTION
                && r.params[0]["to"].as_str() == Some(fixtures::BET_CONTRACT)
        })
        .count()
}

// ============================================================================
// Enable
// ============================================================================

mod enable_tests {
    use super::*;

    #[tokio::test]
    async fn test_enable_on_accepted_chain() {
        let provider = MockEvmProvider::metamask("0x1").with_accounts(&[fixtures::ACCOUNT]);
        let mut h = harness(&provider);

        h.wallet.enable(&eth()).await.unwrap();

        assert!(h.wallet.is_enabled());
        assert_eq!(h.wallet.address(), fixtures::ACCOUNT);
        assert_eq!(h.wallet.enabled_chain(), Some(ChainType::Eth));
        assert_eq!(h.wallet.enabled_currency(), Some("ETH"));
        assert_eq!(provider.count(methods::WALLET_SWITCH_ETHEREUM_CHAIN), 0);
    }

    #[tokio::test]
    async fn test_second_enable_skips_detection() {
        let provider = MockEvmProvider::metamask("0x1").with_accounts(&[fixtures::ACCOUNT]);
        let mut h = harness(&provider);

        h.wallet.enable(&eth()).await.unwrap();
        let lookups = h.env.lookups();
        let requests = provider.requests().len();

        assert_eq!(h.wallet.enable(&eth()).await, Ok(()));
        assert_eq!(h.env.lookups(), lookups);
        assert_eq!(provider.requests().len(), requests);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rinkeby_switches_to_mainnet() {
        let provider = MockEvmProvider::metamask("0x4")
            .with_switch(SwitchBehavior::ApplyAfter(Duration::from_millis(2000)))
            .with_accounts(&[fixtures::ACCOUNT]);
        let mut h = harness(&provider);

        h.wallet.enable(&eth()).await.unwrap();

        let requests = provider.requests();
        assert_eq!(requests[0].method, methods::WALLET_SWITCH_ETHEREUM_CHAIN);
        assert_eq!(requests[0].params, json!([{ "chainId": "0x1" }]));
        assert_eq!(requests[1].method, methods::ETH_REQUEST_ACCOUNTS);
        assert_eq!(h.wallet.address(), fixtures::ACCOUNT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_switch_is_rejected_after_window() {
        let provider = MockEvmProvider::metamask("0x4")
            .with_switch(SwitchBehavior::Ignore)
            .with_accounts(&[fixtures::ACCOUNT]);
        let mut h = harness(&provider);

        let start = Instant::now();
        let result = h.wallet.enable(&eth()).await;
        let elapsed = start.elapsed();

        assert_eq!(result, Err(WalletError::UserRejectedLogin));
        assert!(elapsed > Duration::from_millis(5000));
        assert!(elapsed <= Duration::from_millis(5100));
        assert_eq!(provider.count(methods::ETH_REQUEST_ACCOUNTS), 0);
        assert_eq!(h.wallet.address(), "");
        assert!(!h.wallet.is_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bnb_uses_add_chain() {
        let provider = MockEvmProvider::metamask("0x1").with_accounts(&[fixtures::ACCOUNT]);
        let mut h = harness(&provider);

        h.wallet.enable(&CurrencySelection::native(ChainType::Bnb)).await.unwrap();

        let add = provider.requests().remove(0);
        assert_eq!(add.method, methods::WALLET_ADD_ETHEREUM_CHAIN);
        assert_eq!(add.params[0]["chainId"], "0x38");
        assert_eq!(h.wallet.enabled_chain(), Some(ChainType::Bnb));
    }

    #[tokio::test]
    async fn test_rejected_accounts_leave_no_state() {
        let provider = MockEvmProvider::metamask("0x1");
        provider.reply(methods::ETH_REQUEST_ACCOUNTS, MockReply::user_rejected());
        let mut h = harness(&provider);

        assert_eq!(h.wallet.enable(&eth()).await, Err(WalletError::UserRejectedLogin));
        assert_eq!(h.wallet.address(), "");
        assert!(!h.wallet.is_enabled());
        assert_eq!(h.wallet.enabled_currency(), None);
        assert_eq!(provider.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_account_failures() {
        let provider = MockEvmProvider::metamask("0x1");
        provider.respond(methods::ETH_REQUEST_ACCOUNTS, json!([]));
        let mut h = harness(&provider);
        assert_eq!(h.wallet.enable(&eth()).await, Err(WalletError::UserNotLogged));

        provider.reply(methods::ETH_REQUEST_ACCOUNTS, MockReply::internal());
        assert_eq!(h.wallet.enable(&eth()).await, Err(WalletError::UserNotLogged));

        provider.respond(methods::ETH_REQUEST_ACCOUNTS, json!(["not-an-address"]));
        assert_eq!(h.wallet.enable(&eth()).await, Err(WalletError::AddressError));
        assert!(!h.wallet.is_enabled());
    }

    #[tokio::test]
    async fn test_missing_provider() {
        let env = Arc::new(MockEnvironment::default());
        let ctx = EvmContext {
            env,
            store: Arc::new(MemoryStore::new()),
            events: HostEvents::default(),
            settings: EvmSettings::default(),
        };
        let mut wallet = metamask(&ctx);

        assert_eq!(wallet.enable(&eth()).await, Err(WalletError::NotFound));
        assert_eq!(wallet.enable(&CurrencySelection::native(ChainType::Trx)).await, Err(WalletError::ChainError));
    }
}

// ============================================================================
// Change Currency and Listeners
// ============================================================================

mod session_tests {
    use super::*;

    #[tokio::test]
    async fn test_change_currency_without_session_fails() {
        let provider = MockEvmProvider::metamask("0x1");
        let mut h = harness(&provider);
        assert_eq!(h.wallet.change_currency(&eth()).await, Err(WalletError::Fail));
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_currency_negotiates() {
        let provider = MockEvmProvider::metamask("0x1").with_accounts(&[fixtures::ACCOUNT]);
        let mut h = harness(&provider);
        h.wallet.enable(&eth()).await.unwrap();

        h.wallet.change_currency(&eth()).await.unwrap();
        assert_eq!(provider.count(methods::WALLET_ADD_ETHEREUM_CHAIN), 0);

        h.wallet.change_currency(&CurrencySelection::native(ChainType::Bnb)).await.unwrap();
        assert_eq!(provider.count(methods::WALLET_ADD_ETHEREUM_CHAIN), 1);
        assert_eq!(h.wallet.enabled_currency(), Some("BNB"));
        assert_eq!(h.wallet.address(), fixtures::ACCOUNT);
        assert_eq!(provider.listener_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_change_keeps_session() {
        let provider = MockEvmProvider::metamask("0x1")
            .with_switch(SwitchBehavior::Ignore)
            .with_accounts(&[fixtures::ACCOUNT]);
        let mut h = harness(&provider);
        h.wallet.enable(&eth()).await.unwrap();

        let result = h.wallet.change_currency(&CurrencySelection::native(ChainType::Bnb)).await;
        assert_eq!(result, Err(WalletError::UserRejectedLogin));
        assert!(h.wallet.is_enabled());
        assert_eq!(h.wallet.enabled_currency(), Some("ETH"));
    }

    #[tokio::test]
    async fn test_chain_change_to_other_family_requests_reload() {
        let provider = MockEvmProvider::metamask("0x1").with_accounts(&[fixtures::ACCOUNT]);
        let mut h = harness(&provider);
        let mut rx = h.events.subscribe();
        h.wallet.enable(&eth()).await.unwrap();

        provider.emit(ProviderEvent::ChainChanged("0x5".into()));
        assert!(rx.try_recv().is_err());

        provider.emit(ProviderEvent::ChainChanged("0x38".into()));
        assert_eq!(h.store.get(keys::CONTRACT_CURRENCY).as_deref(), Some("BNB"));
        assert_eq!(rx.try_recv().unwrap(), HostEvent::ReloadRequested);
    }

    #[tokio::test]
    async fn test_account_removal_forgets_wallet() {
        let provider = MockEvmProvider::metamask("0x1").with_accounts(&[fixtures::ACCOUNT]);
        let mut h = harness(&provider);
        h.store.set(keys::CONTRACT_WALLET, "MetaMask");
        let mut rx = h.events.subscribe();
        h.wallet.enable(&eth()).await.unwrap();

        provider.emit(ProviderEvent::AccountsChanged(vec![]));
        assert!(h.store.get(keys::CONTRACT_WALLET).is_none());
        assert_eq!(rx.try_recv().unwrap(), HostEvent::ReloadRequested);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent_and_detaches() {
        let provider = MockEvmProvider::metamask("0x1").with_accounts(&[fixtures::ACCOUNT]);
        let mut h = harness(&provider);
        h.wallet.enable(&eth()).await.unwrap();
        assert_eq!(provider.listener_count(), 1);

        h.wallet.logout().await;
        h.wallet.logout().await;

        assert_eq!(provider.listener_count(), 0);
        assert_eq!(h.wallet.address(), "");
        assert!(h.wallet.browser().is_empty());
    }
}

// ============================================================================
// Balance, Signature and Explorer
// ============================================================================

mod read_tests {
    use super::*;

    #[tokio::test]
    async fn test_balance_requires_session() {
        let provider = MockEvmProvider::metamask("0x1");
        let h = harness(&provider);
        assert_eq!(h.wallet.get_balance().await, Err(WalletError::UserNotLogged));
    }

    #[tokio::test]
    async fn test_native_balance() {
        let provider = MockEvmProvider::metamask("0x1").with_accounts(&[fixtures::ACCOUNT]);
        provider.respond(methods::ETH_GET_BALANCE, json!("0x1bc16d674ec80000"));
        let mut h = harness(&provider);
        h.wallet.enable(&eth()).await.unwrap();

        assert_eq!(h.wallet.get_balance().await, Ok(2.0));
    }

    #[tokio::test]
    async fn test_token_balance_uses_decimals() {
        let provider = MockEvmProvider::metamask("0x1")
            .with_accounts(&[fixtures::ACCOUNT])
            .with_token(6, 12_340_000, 0);
        let mut h = harness(&provider);
        h.wallet.enable(&usdt()).await.unwrap();

        assert!(h.wallet.token_contract().is_some());
        assert_eq!(h.wallet.get_balance().await, Ok(12.34));
    }

    #[tokio::test]
    async fn test_failed_balance_read_reports_zero() {
        let provider = MockEvmProvider::metamask("0x1").with_accounts(&[fixtures::ACCOUNT]);
        provider.reply(methods::ETH_GET_BALANCE, MockReply::internal());
        let mut h = harness(&provider);
        h.wallet.enable(&eth()).await.unwrap();

        assert_eq!(h.wallet.get_balance().await, Ok(0.0));
    }

    #[tokio::test]
    async fn test_signature() {
        let provider = MockEvmProvider::metamask("0x1").with_accounts(&[fixtures::ACCOUNT]);
        provider.respond(methods::PERSONAL_SIGN, json!("0xsigned"));
        let mut h = harness(&provider);

        assert_eq!(h.wallet.signature("hello").await, None);
        h.wallet.enable(&eth()).await.unwrap();
        assert_eq!(h.wallet.signature("hello").await.as_deref(), Some("0xsigned"));

        let sign = provider
            .requests()
            .into_iter()
            .find(|r| r.method == methods::PERSONAL_SIGN)
            .unwrap();
        assert_eq!(sign.params, json!(["0x68656c6c6f", fixtures::ACCOUNT]));

        provider.reply(methods::PERSONAL_SIGN, MockReply::user_rejected());
        assert_eq!(h.wallet.signature("hello").await, None);
    }

    #[tokio::test]
    async fn test_browser_link_follows_chain() {
        let provider = MockEvmProvider::metamask("0x1").with_accounts(&[fixtures::ACCOUNT]);
        let mut h = harness(&provider);
        assert!(h.wallet.browser().is_empty());

        h.wallet.enable(&eth()).await.unwrap();
        let link = h.wallet.browser();
        assert_eq!(link.name, "Etherscan");
        assert_eq!(link.url, format!("https://etherscan.io/address/{}", fixtures::ACCOUNT));
    }
}

// ============================================================================
// Transactions
// ============================================================================

mod transaction_tests {
    use super::*;

    #[tokio::test]
    async fn test_transaction_requires_session() {
        let provider = MockEvmProvider::metamask("0x1");
        let h = harness(&provider);
        let result = h
            .wallet
            .transaction(fixtures::BET_CONTRACT, 1.0, &Order::new("1"), &eth())
            .await;
        assert_eq!(result, Err(WalletError::UserNotLogged));
    }

    #[tokio::test]
    async fn test_native_bet_slip() {
        let provider = MockEvmProvider::metamask("0x1")
            .with_accounts(&[fixtures::ACCOUNT])
            .with_successful_sends();
        let mut h = harness(&provider);
        h.wallet.enable(&eth()).await.unwrap();

        h.wallet
            .transaction(fixtures::BET_CONTRACT, 0.5, &Order::new("42"), &eth())
            .await
            .unwrap();

        let send = provider
            .requests()
            .into_iter()
            .find(|r| r.method == methods::ETH_SEND_TRANSACTION)
            .unwrap();
        assert_eq!(send.params[0]["from"], fixtures::ACCOUNT);
        assert_eq!(send.params[0]["to"], fixtures::BET_CONTRACT);
        assert_eq!(send.params[0]["value"], "0x6f05b59d3b20000");
    }

    #[tokio::test]
    async fn test_rejected_send_fails() {
        let provider = MockEvmProvider::metamask("0x1").with_accounts(&[fixtures::ACCOUNT]);
        provider.reply(methods::ETH_SEND_TRANSACTION, MockReply::user_rejected());
        let mut h = harness(&provider);
        h.wallet.enable(&eth()).await.unwrap();

        let result = h
            .wallet
            .transaction(fixtures::BET_CONTRACT, 1.0, &Order::new("1"), &eth())
            .await;
        assert_eq!(result, Err(WalletError::Fail));
    }

    #[tokio::test]
    async fn test_token_with_allowance_skips_approve() {
        let provider = MockEvmProvider::metamask("0x1")
            .with_accounts(&[fixtures::ACCOUNT])
            .with_token(6, 0, 100_000_000)
            .with_successful_sends();
        let mut h = harness(&provider);
        h.wallet.enable(&usdt()).await.unwrap();

        h.wallet
            .transaction(fixtures::BET_CONTRACT, 25.0, &Order::new("9"), &usdt())
            .await
            .unwrap();

        assert!(provider.sends_calling(selectors::APPROVE).is_empty());
        assert_eq!(bet_slip_sends(&provider), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_without_allowance_approves_once() {
        let provider = MockEvmProvider::metamask("0x1")
            .with_accounts(&[fixtures::ACCOUNT])
            .with_token(6, 0, 0)
            .with_successful_sends();
        let mut h = harness(&provider);
        h.wallet.enable(&usdt()).await.unwrap();

        h.wallet
            .transaction(fixtures::BET_CONTRACT, 25.0, &Order::new("9"), &usdt())
            .await
            .unwrap();

        assert_eq!(provider.sends_calling(selectors::APPROVE).len(), 1);
        assert_eq!(bet_slip_sends(&provider), 1);
    }

    #[tokio::test]
    async fn test_failed_approval_blocks_transfer() {
        let provider = MockEvmProvider::metamask("0x1")
            .with_accounts(&[fixtures::ACCOUNT])
            .with_token(6, 0, 0);
        provider.reply(methods::ETH_SEND_TRANSACTION, MockReply::user_rejected());
        let mut h = harness(&provider);
        h.wallet.enable(&usdt()).await.unwrap();

        let result = h
            .wallet
            .transaction(fixtures::BET_CONTRACT, 25.0, &Order::new("9"), &usdt())
            .await;

        assert_eq!(result, Err(WalletError::Fail));
        assert_eq!(provider.sends_calling(selectors::APPROVE).len(), 1);
        assert_eq!(bet_slip_sends(&provider), 0);
    }
}
