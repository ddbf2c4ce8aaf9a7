//! Tronlink adapter against a scripted TronWeb

use polywallet_provider::{keys, HostEvent, HostEvents, Injected, MemoryStore, ProviderEvent, SessionStore};
use polywallet_testing::{fixtures, MockEnvironment, MockReply, MockTronProvider};
use polywallet_traits::prelude::*;
use polywallet_tron::{TronSettings, TronWalletAdapter};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct Harness {
    injected: Injected,
    store: Arc<MemoryStore>,
    events: HostEvents,
    wallet: TronWalletAdapter,
}

fn harness(injected: Injected) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let events = HostEvents::default();
    let wallet = TronWalletAdapter::new(
        Arc::new(injected.clone()),
        store.clone(),
        events.clone(),
        TronSettings::default(),
    );
    Harness {
        injected,
        store,
        events,
        wallet,
    }
}

fn with_tron(provider: &MockTronProvider) -> Harness {
    harness(Injected::new().with_tron_web(Arc::new(provider.clone())))
}

fn trx() -> CurrencySelection {
    CurrencySelection::native(ChainType::Trx)
}

fn usdt() -> CurrencySelection {
    CurrencySelection::token("USDT", ChainType::Trx, fixtures::TRON_TOKEN)
}

fn token_provider(allowance: &str) -> MockTronProvider {
    MockTronProvider::new(Some(fixtures::TRON_ACCOUNT))
        .respond_call("decimals", json!(6))
        .respond_call("balanceOf", json!("12500000"))
        .respond_call("allowance", json!(allowance))
}

// ============================================================================
// ENABLE
// ============================================================================

mod enable_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_missing_tron_web_is_not_found_after_polling() {
        let mut h = harness(Injected::new());

        let start = Instant::now();
        let result = h.wallet.enable(&trx()).await;

        assert_eq!(result, Err(WalletError::NotFound));
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!(start.elapsed() < Duration::from_millis(520));
        assert!(!h.wallet.is_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_injection_is_picked_up() {
        let mut h = harness(Injected::new());
        let injected = h.injected.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let tron = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT));
            injected.set_tron_web(Some(Arc::new(tron)));
        });

        h.wallet.enable(&trx()).await.unwrap();

        assert_eq!(h.wallet.address(), fixtures::TRON_ACCOUNT);
        assert_eq!(h.wallet.enabled_chain(), Some(ChainType::Trx));
        assert_eq!(h.wallet.enabled_currency(), Some("TRX"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_locked_wallet_is_not_found() {
        let provider = MockTronProvider::new(None);
        let mut h = with_tron(&provider);

        assert_eq!(h.wallet.enable(&trx()).await, Err(WalletError::NotFound));

        provider.set_address(Some(fixtures::TRON_ACCOUNT));
        assert_eq!(h.wallet.enable(&trx()).await, Ok(()));
    }

    #[tokio::test]
    async fn test_malformed_address() {
        let provider = MockTronProvider::new(Some("T-not-base58"));
        let mut h = with_tron(&provider);

        assert_eq!(h.wallet.enable(&trx()).await, Err(WalletError::AddressError));
        assert_eq!(h.wallet.address(), "");
        assert_eq!(provider.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_only_trx() {
        let provider = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT));
        let mut h = with_tron(&provider);

        let result = h.wallet.enable(&CurrencySelection::native(ChainType::Eth)).await;
        assert_eq!(result, Err(WalletError::ChainError));
        assert_eq!(h.wallet.info().name, "Tronlink");
        assert_eq!(h.wallet.info().supported_currencies, vec!["TRX".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_token_fails() {
        let provider = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT));
        let mut h = with_tron(&provider);

        let bad = CurrencySelection::token("USDT", ChainType::Trx, fixtures::TOKEN);
        assert_eq!(h.wallet.enable(&bad).await, Err(WalletError::Fail));
        assert!(!h.wallet.is_enabled());
    }
}

// ============================================================================
// SESSION
// ============================================================================

mod session_tests {
    use super::*;

    #[tokio::test]
    async fn test_change_currency() {
        let provider = token_provider("0");
        let mut h = with_tron(&provider);
        assert_eq!(h.wallet.change_currency(&usdt()).await, Err(WalletError::Fail));

        h.wallet.enable(&trx()).await.unwrap();
        assert!(h.wallet.token_contract().is_none());

        h.wallet.change_currency(&usdt()).await.unwrap();
        assert_eq!(h.wallet.enabled_currency(), Some("USDT"));
        assert!(h.wallet.token_contract().is_some());

        let eth = CurrencySelection::native(ChainType::Eth);
        assert_eq!(h.wallet.change_currency(&eth).await, Err(WalletError::ChainError));
    }

    #[tokio::test]
    async fn test_same_currency_is_a_no_op() {
        let provider = token_provider("0");
        let mut h = with_tron(&provider);
        h.wallet.enable(&usdt()).await.unwrap();
        let calls = provider.calls().len();

        assert_eq!(h.wallet.change_currency(&usdt()).await, Ok(()));
        assert_eq!(h.wallet.enabled_currency(), Some("USDT"));
        assert!(h.wallet.token_contract().is_some());
        assert_eq!(provider.calls().len(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_enable_skips_lookup() {
        let provider = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT));
        let env = Arc::new(MockEnvironment::new(
            Injected::new().with_tron_web(Arc::new(provider.clone())),
        ));
        let mut wallet = TronWalletAdapter::new(
            env.clone(),
            Arc::new(MemoryStore::new()),
            HostEvents::default(),
            TronSettings::default(),
        );

        wallet.enable(&trx()).await.unwrap();
        let lookups = env.lookups();
        wallet.enable(&trx()).await.unwrap();

        assert_eq!(env.lookups(), lookups);
        assert_eq!(provider.listener_count(), 1);
        assert_eq!(wallet.address(), fixtures::TRON_ACCOUNT);
    }

    #[tokio::test]
    async fn test_new_currency_replaces_listener() {
        let provider = token_provider("0");
        let mut h = with_tron(&provider);

        h.wallet.enable(&trx()).await.unwrap();
        h.wallet.enable(&usdt()).await.unwrap();

        assert_eq!(h.wallet.enabled_currency(), Some("USDT"));
        assert_eq!(provider.listener_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_message_forgets_wallet() {
        let provider = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT));
        let mut h = with_tron(&provider);
        h.store.set(keys::CONTRACT_WALLET, "Tronlink");
        let mut rx = h.events.subscribe();
        h.wallet.enable(&trx()).await.unwrap();

        provider.emit(ProviderEvent::AccountsChanged(vec![]));
        assert!(rx.try_recv().is_err());

        provider.emit(ProviderEvent::Disconnect);
        assert!(h.store.get(keys::CONTRACT_WALLET).is_none());
        assert_eq!(rx.try_recv().unwrap(), HostEvent::ReloadRequested);
    }

    #[tokio::test]
    async fn test_logout_removes_listener() {
        let provider = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT));
        let mut h = with_tron(&provider);
        h.wallet.enable(&trx()).await.unwrap();
        assert_eq!(provider.listener_count(), 1);

        h.wallet.logout().await;
        h.wallet.logout().await;

        assert_eq!(provider.listener_count(), 0);
        assert!(h.wallet.browser().is_empty());
    }

    #[tokio::test]
    async fn test_browser_and_signature() {
        let provider = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT));
        let mut h = with_tron(&provider);
        assert_eq!(h.wallet.signature("hi").await, None);

        h.wallet.enable(&trx()).await.unwrap();
        let link = h.wallet.browser();
        assert_eq!(link.name, "Tron Link");
        assert_eq!(link.url, format!("https://tronscan.org/#/address/{}", fixtures::TRON_ACCOUNT));
        assert_eq!(h.wallet.signature("hi").await.as_deref(), Some("0xsigned"));
    }

    #[tokio::test]
    async fn test_declined_signature() {
        let provider = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT))
            .with_sign(MockReply::Rejected("Confirmation declined by user".into()));
        let mut h = with_tron(&provider);
        h.wallet.enable(&trx()).await.unwrap();

        assert_eq!(h.wallet.signature("hi").await, None);
    }
}

// ============================================================================
// BALANCE
// ============================================================================

mod balance_tests {
    use super::*;

    #[tokio::test]
    async fn test_requires_session() {
        let h = harness(Injected::new());
        assert_eq!(h.wallet.get_balance().await, Err(WalletError::UserNotLogged));
    }

    #[tokio::test]
    async fn test_native_balance_in_trx() {
        let provider = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT)).with_balance(1_500_000);
        let mut h = with_tron(&provider);
        h.wallet.enable(&trx()).await.unwrap();

        assert_eq!(h.wallet.get_balance().await, Ok(1.5));
    }

    #[tokio::test]
    async fn test_token_balance() {
        let provider = token_provider("0");
        let mut h = with_tron(&provider);
        h.wallet.enable(&usdt()).await.unwrap();

        assert_eq!(h.wallet.get_balance().await, Ok(12.5));
    }

    #[tokio::test]
    async fn test_failed_read_reports_zero() {
        let provider = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT)).with_failing_balance();
        let mut h = with_tron(&provider);
        h.wallet.enable(&trx()).await.unwrap();

        assert_eq!(h.wallet.get_balance().await, Ok(0.0));
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

mod transaction_tests {
    use super::*;

    #[tokio::test]
    async fn test_requires_session() {
        let h = harness(Injected::new());
        let result = h
            .wallet
            .transaction(fixtures::TRON_CONTRACT, 1.0, &Order::new("1"), &trx())
            .await;
        assert_eq!(result, Err(WalletError::UserNotLogged));
    }

    #[tokio::test]
    async fn test_native_bet_slip() {
        let provider = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT));
        let mut h = with_tron(&provider);
        h.wallet.enable(&trx()).await.unwrap();

        h.wallet
            .transaction(fixtures::TRON_CONTRACT, 2.5, &Order::new("77"), &trx())
            .await
            .unwrap();

        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].contract, fixtures::TRON_CONTRACT);
        assert_eq!(sent[0].method, "combinedBetSlip");
        assert_eq!(
            sent[0].args,
            vec![json!(["77"]), json!(["2500000"]), json!([]), json!([])]
        );
        assert_eq!(sent[0].options.call_value, 2_500_000);
        assert!(!sent[0].options.should_poll_response);
    }

    #[tokio::test]
    async fn test_empty_result_fails() {
        let provider = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT))
            .reply_send("combinedBetSlip", MockReply::Ok(Value::Null));
        let mut h = with_tron(&provider);
        h.wallet.enable(&trx()).await.unwrap();

        let result = h
            .wallet
            .transaction(fixtures::TRON_CONTRACT, 1.0, &Order::new("1"), &trx())
            .await;
        assert_eq!(result, Err(WalletError::Fail));
    }

    #[tokio::test]
    async fn test_token_with_allowance() {
        let provider = token_provider("100000000");
        let mut h = with_tron(&provider);
        h.wallet.enable(&usdt()).await.unwrap();

        h.wallet
            .transaction(fixtures::TRON_CONTRACT, 25.0, &Order::new("5"), &usdt())
            .await
            .unwrap();

        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, "combinedBetSlip_ERC20");
        assert_eq!(sent[0].args[0], json!(fixtures::TRON_TOKEN));
        assert_eq!(sent[0].args[2], json!(["25000000"]));
        assert_eq!(sent[0].options.call_value, 0);
    }

    #[tokio::test]
    async fn test_token_approves_exact_amount() {
        let provider = token_provider("0");
        let mut h = with_tron(&provider);
        h.wallet.enable(&usdt()).await.unwrap();

        h.wallet
            .transaction(fixtures::TRON_CONTRACT, 25.0, &Order::new("5"), &usdt())
            .await
            .unwrap();

        let sent = provider.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].method, "approve");
        assert_eq!(sent[0].contract, fixtures::TRON_TOKEN);
        assert_eq!(sent[0].args, vec![json!(fixtures::TRON_CONTRACT), json!("25000000")]);
        assert_eq!(sent[1].method, "combinedBetSlip_ERC20");
    }

    #[tokio::test]
    async fn test_failed_approval_blocks_transfer() {
        let provider = token_provider("0").reply_send("approve", MockReply::user_rejected());
        let mut h = with_tron(&provider);
        h.wallet.enable(&usdt()).await.unwrap();

        let result = h
            .wallet
            .transaction(fixtures::TRON_CONTRACT, 25.0, &Order::new("5"), &usdt())
            .await;

        assert_eq!(result, Err(WalletError::Fail));
        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, "approve");
    }
}
