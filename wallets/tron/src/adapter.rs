//! The Tronlink adapter

use alloy::primitives::U256;
use async_trait::async_trait;
use polywallet_erc20::units::{amount_to_string, from_base_units, to_base_units};
use polywallet_erc20::{
    AllowanceGuard, ApprovalPolicy, TokenContract, BET_SLIP_METHOD, BET_SLIP_TOKEN_METHOD,
};
use polywallet_provider::{
    keys, HostEvent, HostEvents, InjectedEnvironment, ProviderEvent, SendOptions, SessionStore,
    Subscription, TronProvider,
};
use polywallet_resilience::{await_condition, PollConfig};
use polywallet_traits::{
    BrowserLink, ChainType, CurrencySelection, Order, WalletAdapter, WalletError, WalletInfo,
    WalletResult,
};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::address::validate_address;
use crate::contract::TronTokenContract;

/// TRX has 6 decimals; 1 TRX = 1,000,000 SUN
pub const TRX_DECIMALS: u8 = 6;

const EXPLORER_NAME: &str = "Tron Link";
const EXPLORER_URL: &str = "https://tronscan.org/#/address/";

// ============================================================================
// CONFIG
// ============================================================================

/// Timing for the Tronlink adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TronSettings {
    /// How long to wait for TronLink to inject and unlock
    pub injection: PollConfig,
}

impl Default for TronSettings {
    fn default() -> Self {
        Self {
            injection: PollConfig::tron_injection(),
        }
    }
}

// ============================================================================
// WALLET
// ============================================================================

struct Session {
    provider: Arc<dyn TronProvider>,
    address: String,
    currency: String,
    token: Option<TronTokenContract>,
    listeners: Subscription,
}

/// TronLink, reached through the page's `tronWeb`.
///
/// There is a single Tron network, so connecting never switches chains; it
/// only waits for the extension to expose an unlocked account.
pub struct TronWalletAdapter {
    info: WalletInfo,
    env: Arc<dyn InjectedEnvironment>,
    store: Arc<dyn SessionStore>,
    events: HostEvents,
    settings: TronSettings,
    session: Option<Session>,
}

impl TronWalletAdapter {
    /// Creates a logged-out adapter reading `tronWeb` from `env`
    pub fn new(
        env: Arc<dyn InjectedEnvironment>,
        store: Arc<dyn SessionStore>,
        events: HostEvents,
        settings: TronSettings,
    ) -> Self {
        Self {
            info: WalletInfo::new("Tronlink", Some("https://www.tronlink.org/"), &[ChainType::Trx]),
            env,
            store,
            events,
            settings,
            session: None,
        }
    }

    /// The active session's token contract
    pub fn token_contract(&self) -> Option<&TronTokenContract> {
        self.session.as_ref()?.token.as_ref()
    }

    async fn wait_for_injection(&self) -> WalletResult<(Arc<dyn TronProvider>, String)> {
        let outcome = await_condition(self.settings.injection, || {
            let env = self.env.clone();
            async move {
                env.tron_web()
                    .and_then(|tron| tron.default_address())
                    .is_some()
            }
        })
        .await;
        if !outcome.is_confirmed() {
            debug!("tronWeb never exposed an account");
            return Err(WalletError::NotFound);
        }

        let provider = self.env.tron_web().ok_or(WalletError::NotFound)?;
        let address = provider.default_address().ok_or(WalletError::NotFound)?;
        Ok((provider, address))
    }

    fn token_for(
        provider: &Arc<dyn TronProvider>,
        selection: &CurrencySelection,
    ) -> WalletResult<Option<TronTokenContract>> {
        selection
            .token
            .as_deref()
            .map(|token| {
                TronTokenContract::new(provider.clone(), token).map_err(|e| {
                    warn!(token, error = %e, "unusable token contract");
                    WalletError::Fail
                })
            })
            .transpose()
    }

    fn watch(&self, provider: &Arc<dyn TronProvider>) -> Subscription {
        let store = self.store.clone();
        let events = self.events.clone();
        let id = provider.on(Arc::new(move |event: &ProviderEvent| {
            if *event == ProviderEvent::Disconnect {
                store.remove(keys::CONTRACT_WALLET);
                events.emit(HostEvent::ReloadRequested);
            }
        }));
        let provider = provider.clone();
        Subscription::new(move || provider.remove_listener(id))
    }

    async fn connect(&self, selection: &CurrencySelection) -> WalletResult<Session> {
        if !self.info.supports_chain(selection.chain) {
            return Err(WalletError::ChainError);
        }

        let (provider, address) = self.wait_for_injection().await?;
        validate_address(&address).map_err(|e| {
            warn!(%address, error = %e, "tronWeb reported a malformed address");
            WalletError::AddressError
        })?;

        let token = Self::token_for(&provider, selection)?;
        let listeners = self.watch(&provider);
        Ok(Session {
            provider,
            address,
            currency: selection.currency.clone(),
            token,
            listeners,
        })
    }

    async fn read_balance(&self, session: &Session) -> Result<f64, String> {
        match &session.token {
            Some(token) => {
                let decimals = token.decimals().await.map_err(|e| e.to_string())?;
                let raw = token
                    .balance_of(&session.address)
                    .await
                    .map_err(|e| e.to_string())?;
                from_base_units(raw, decimals).map_err(|e| e.to_string())
            }
            None => {
                let sun = session.provider.balance().await.map_err(|e| e.to_string())?;
                from_base_units(U256::from(sun), TRX_DECIMALS).map_err(|e| e.to_string())
            }
        }
    }

    async fn pay(
        &self,
        session: &Session,
        to: &str,
        amount: f64,
        order: &Order,
        selection: &CurrencySelection,
    ) -> Result<(), String> {
        let amount = amount_to_string(amount).map_err(|e| e.to_string())?;
        let option_ids = json!([order.option_id]);

        let (method, args, call_value) = match selection.token.as_deref() {
            Some(token) => {
                let contract = TronTokenContract::new(session.provider.clone(), token)
                    .map_err(|e| e.to_string())?;
                let approval = AllowanceGuard::new(&contract, ApprovalPolicy::Exact)
                    .ensure(&session.address, to, &amount)
                    .await;
                if !approval.is_approved() {
                    return Err("token approval was not granted".to_string());
                }
                let decimals = contract.decimals().await.map_err(|e| e.to_string())?;
                let units = to_base_units(&amount, decimals).map_err(|e| e.to_string())?;
                let args = vec![
                    json!(token),
                    option_ids,
                    json!([units.to_string()]),
                    json!([]),
                    json!([]),
                ];
                (BET_SLIP_TOKEN_METHOD, args, 0)
            }
            None => {
                let sun = to_base_units(&amount, TRX_DECIMALS).map_err(|e| e.to_string())?;
                let call_value = u64::try_from(sun).map_err(|_| format!("{amount} TRX does not fit a call value"))?;
                let args = vec![option_ids, json!([sun.to_string()]), json!([]), json!([])];
                (BET_SLIP_METHOD, args, call_value)
            }
        };

        let result = session
            .provider
            .send(to, method, args, SendOptions::with_value(call_value))
            .await
            .map_err(|e| e.to_string())?;
        match result {
            Some(tx) => {
                info!(wallet = %self.info.name, %tx, "bet slip submitted");
                Ok(())
            }
            None => Err(format!("{method} returned nothing")),
        }
    }
}

#[async_trait]
impl WalletAdapter for TronWalletAdapter {
    fn info(&self) -> &WalletInfo {
        &self.info
    }

    fn address(&self) -> &str {
        self.session.as_ref().map_or("", |s| s.address.as_str())
    }

    fn is_enabled(&self) -> bool {
        self.session.is_some()
    }

    fn enabled_chain(&self) -> Option<ChainType> {
        self.session.as_ref().map(|_| ChainType::Trx)
    }

    fn enabled_currency(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.currency.as_str())
    }

    async fn enable(&mut self, selection: &CurrencySelection) -> WalletResult<()> {
        if self.enabled_currency() == Some(selection.currency.as_str()) {
            return Ok(());
        }

        debug!(currency = %selection.currency, "enabling Tronlink");
        // a new currency reconnects from scratch
        self.logout().await;
        match self.connect(selection).await {
            Ok(session) => {
                info!(address = %session.address, "Tronlink enabled");
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Tronlink enable failed");
                self.logout().await;
                Err(e)
            }
        }
    }

    async fn change_currency(&mut self, selection: &CurrencySelection) -> WalletResult<()> {
        let Some(session) = self.session.as_mut() else {
            return Err(WalletError::Fail);
        };
        if session.currency == selection.currency {
            return Ok(());
        }
        if selection.chain != ChainType::Trx {
            return Err(WalletError::ChainError);
        }
        session.token = Self::token_for(&session.provider, selection)?;
        session.currency = selection.currency.clone();
        Ok(())
    }

    async fn get_balance(&self) -> WalletResult<f64> {
        let session = self.session.as_ref().ok_or(WalletError::UserNotLogged)?;
        match self.read_balance(session).await {
            Ok(balance) => Ok(balance),
            Err(e) => {
                warn!(error = %e, "Tronlink balance read failed, reporting 0");
                Ok(0.0)
            }
        }
    }

    async fn transaction(
        &self,
        to: &str,
        amount: f64,
        order: &Order,
        selection: &CurrencySelection,
    ) -> WalletResult<()> {
        let session = self.session.as_ref().ok_or(WalletError::UserNotLogged)?;
        self.pay(session, to, amount, order, selection)
            .await
            .map_err(|e| {
                warn!(error = %e, "Tronlink transaction failed");
                WalletError::Fail
            })
    }

    async fn signature(&self, message: &str) -> Option<String> {
        let session = self.session.as_ref()?;
        let payload = format!("0x{}", hex::encode(message.as_bytes()));
        match session.provider.sign(&payload).await {
            Ok(signature) => Some(signature),
            Err(e) => {
                debug!(error = %e, "signature declined or failed");
                None
            }
        }
    }

    async fn logout(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.listeners.unsubscribe();
            info!("Tronlink logged out");
        }
    }

    fn browser(&self) -> BrowserLink {
        match &self.session {
            Some(session) => BrowserLink::new(EXPLORER_NAME, format!("{EXPLORER_URL}{}", session.address)),
            None => BrowserLink::empty(),
        }
    }
}

impl fmt::Debug for TronWalletAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TronWalletAdapter")
            .field("address", &self.address())
            .field("currency", &self.enabled_currency())
            .finish()
    }
}
