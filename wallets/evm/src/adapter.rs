//! The generic EVM wallet adapter

use async_trait::async_trait;
use polywallet_erc20::units::{amount_to_string, from_base_units, parse_quantity, ETHER_DECIMALS};
use polywallet_erc20::{encode_bet_slip, AllowanceGuard, ApprovalPolicy, Erc20Contract, TokenContract};
use polywallet_provider::{
    keys, methods, ChainProvider, EventHandler, HostEvent, HostEvents, ProviderEvent,
    SessionStore, Subscription,
};
use polywallet_resilience::PollConfig;
use polywallet_traits::{
    BrowserLink, ChainType, CurrencySelection, Order, WalletAdapter, WalletError, WalletInfo,
    WalletResult,
};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chain::{explorer_link, family_of, ChainId, NetworkProfile};
use crate::detector::ProviderDetector;
use crate::negotiator::ChainNegotiator;
use crate::variant::{AccountAccess, ChangeWatch, ConnectOrder, SignMethod, Variant};

/// Timing and approval settings shared by the EVM wallets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmSettings {
    /// Networks to target
    pub network: NetworkProfile,
    /// Chain switch confirmation schedule
    pub chain_switch: PollConfig,
    /// Approval receipt schedule
    pub approval_receipt: PollConfig,
    /// Approval sizing
    pub approval_policy: ApprovalPolicy,
}

impl Default for EvmSettings {
    fn default() -> Self {
        Self {
            network: NetworkProfile::default(),
            chain_switch: PollConfig::chain_switch(),
            approval_receipt: Erc20Contract::default_receipt_poll(),
            approval_policy: ApprovalPolicy::default(),
        }
    }
}

struct Session {
    provider: Arc<dyn ChainProvider>,
    address: String,
    chain: ChainType,
    currency: String,
    token: Option<Erc20Contract>,
    listeners: Subscription,
}

/// One EVM wallet: a [`Variant`] plus the detector that finds its provider.
///
/// The session exists only once `enable` has fully succeeded, so an adapter
/// is either completely connected or completely logged out.
pub struct EvmWalletAdapter {
    variant: Variant,
    detector: Box<dyn ProviderDetector>,
    store: Arc<dyn SessionStore>,
    events: HostEvents,
    settings: EvmSettings,
    session: Option<Session>,
}

impl EvmWalletAdapter {
    /// Creates a logged-out adapter
    pub fn new(
        variant: Variant,
        detector: Box<dyn ProviderDetector>,
        store: Arc<dyn SessionStore>,
        events: HostEvents,
        settings: EvmSettings,
    ) -> Self {
        Self {
            variant,
            detector,
            store,
            events,
            settings,
            session: None,
        }
    }

    /// The wallet's behaviour
    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Currencies the host may offer right now. WalletConnect narrows this
    /// to the family its session is on.
    pub fn current_supported_currencies(&self) -> Vec<String> {
        match &self.session {
            Some(session) if self.variant.narrow_currencies => {
                vec![session.chain.native_currency().to_string()]
            }
            _ => self.variant.info.supported_currencies.clone(),
        }
    }

    /// The active session's token contract
    pub fn token_contract(&self) -> Option<&Erc20Contract> {
        self.session.as_ref()?.token.as_ref()
    }

    async fn negotiate(&self, provider: &dyn ChainProvider, family: ChainType) -> WalletResult<()> {
        let rules = &self.variant.rules;
        ChainNegotiator::new(rules, self.settings.chain_switch)
            .negotiate(Some(provider), family)
            .await
            .into_result(rules)
    }

    fn check_session_family(provider: &dyn ChainProvider, family: ChainType) -> WalletResult<()> {
        let session_family = provider
            .chain_id()
            .and_then(|raw| ChainId::parse(&raw).ok())
            .and_then(family_of);
        if session_family == Some(family) {
            Ok(())
        } else {
            warn!(chain = ?provider.chain_id(), %family, "session opened on the wrong chain");
            Err(WalletError::WalletConnectChainError)
        }
    }

    async fn request_address(&self, provider: &dyn ChainProvider) -> WalletResult<String> {
        let method = match self.variant.accounts {
            AccountAccess::Ethereum => methods::ETH_REQUEST_ACCOUNTS,
            AccountAccess::Binance => methods::BNB_REQUEST_ADDRESSES,
        };
        let accounts = provider.request(method, json!([])).await.map_err(|e| {
            if e.is_user_rejection() {
                WalletError::UserRejectedLogin
            } else {
                debug!(error = %e, "account request failed");
                WalletError::UserNotLogged
            }
        })?;

        let mut entries = accounts
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str);
        let address = match self.variant.accounts {
            AccountAccess::Ethereum => entries.next(),
            AccountAccess::Binance => entries.find(|a| a.starts_with("0x")),
        }
        .ok_or(WalletError::UserNotLogged)?;

        polywallet_erc20::contract::parse_address(address).map_err(|_| WalletError::AddressError)?;
        Ok(address.to_string())
    }

    async fn establish(
        &self,
        provider: &dyn ChainProvider,
        family: ChainType,
    ) -> WalletResult<String> {
        match self.variant.order {
            ConnectOrder::NegotiateFirst => {
                self.negotiate(provider, family).await?;
                self.request_address(provider).await
            }
            ConnectOrder::AccountsFirst => {
                let address = self.request_address(provider).await?;
                self.negotiate(provider, family).await?;
                Ok(address)
            }
            ConnectOrder::SessionBound => {
                let address = self.request_address(provider).await?;
                Self::check_session_family(provider, family)?;
                Ok(address)
            }
        }
    }

    fn token_for(
        &self,
        provider: &Arc<dyn ChainProvider>,
        token: &str,
    ) -> WalletResult<Erc20Contract> {
        Erc20Contract::new(provider.clone(), token)
            .map(|c| c.with_receipt_poll(self.settings.approval_receipt))
            .map_err(|e| {
                warn!(token, error = %e, "unusable token contract");
                WalletError::Fail
            })
    }

    fn session_token(
        &self,
        provider: &Arc<dyn ChainProvider>,
        selection: &CurrencySelection,
    ) -> WalletResult<Option<Erc20Contract>> {
        selection
            .token
            .as_deref()
            .map(|token| self.token_for(provider, token))
            .transpose()
    }

    async fn connect(&self, selection: &CurrencySelection) -> WalletResult<Session> {
        if !self.variant.info.supports_chain(selection.chain) {
            return Err(WalletError::ChainError);
        }

        let provider = self.detector.detect(selection.chain, &self.variant.rules).await?;
        let established = match self.establish(provider.as_ref(), selection.chain).await {
            Ok(address) => self
                .session_token(&provider, selection)
                .map(|token| (address, token)),
            Err(e) => Err(e),
        };
        let (address, token) = match established {
            Ok(parts) => parts,
            Err(e) => {
                self.release(provider.as_ref()).await;
                return Err(e);
            }
        };

        let listeners = self.watch(&provider, selection.chain);
        Ok(Session {
            provider,
            address,
            chain: selection.chain,
            currency: selection.currency.clone(),
            token,
            listeners,
        })
    }

    /// Closes relay sessions; injected wallets stay connected
    async fn release(&self, provider: &dyn ChainProvider) {
        if self.variant.disconnect_on_logout {
            if let Err(e) = provider.disconnect().await {
                debug!(error = %e, "provider disconnect failed");
            }
        }
    }

    fn watch(&self, provider: &Arc<dyn ChainProvider>, enabled: ChainType) -> Subscription {
        let store = self.store.clone();
        let events = self.events.clone();

        let handler: EventHandler = match self.variant.watch {
            ChangeWatch::Ignore => return Subscription::default(),
            ChangeWatch::Reload => Arc::new(move |event: &ProviderEvent| match event {
                ProviderEvent::AccountsChanged(accounts) => {
                    if accounts.is_empty() {
                        store.remove(keys::CONTRACT_WALLET);
                    }
                    events.emit(HostEvent::ReloadRequested);
                }
                ProviderEvent::ChainChanged(raw) => {
                    let family = ChainId::parse(raw)
                        .ok()
                        .and_then(family_of)
                        .filter(|f| *f == ChainType::Bnb)
                        .unwrap_or(ChainType::Eth);
                    if family != enabled {
                        store.set(keys::CONTRACT_CURRENCY, family.native_currency());
                        events.emit(HostEvent::ReloadRequested);
                    }
                }
                ProviderEvent::Disconnect => {}
            }),
            ChangeWatch::HostEvents => Arc::new(move |event: &ProviderEvent| match event {
                ProviderEvent::ChainChanged(raw) => {
                    match ChainId::parse(raw).ok().and_then(family_of) {
                        Some(family) => events.emit(HostEvent::ChainChanged {
                            currency: family.native_currency().to_string(),
                        }),
                        None => warn!(chain = %raw, "wallet moved to an unsupported chain"),
                    }
                }
                ProviderEvent::AccountsChanged(_) => events.emit(HostEvent::ReloadRequested),
                ProviderEvent::Disconnect => {}
            }),
        };
        Subscription::listen(provider.clone(), vec![handler])
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
                let raw = session
                    .provider
                    .request(methods::ETH_GET_BALANCE, json!([session.address, "latest"]))
                    .await
                    .map_err(|e| e.to_string())?;
                let wei = parse_quantity(raw.as_str().unwrap_or_default()).map_err(|e| e.to_string())?;
                from_base_units(wei, ETHER_DECIMALS).map_err(|e| e.to_string())
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
        let token = selection.token.as_deref();

        let decimals = match token {
            Some(address) => {
                let contract = self
                    .token_for(&session.provider, address)
                    .map_err(|e| e.to_string())?;
                let approval = AllowanceGuard::new(&contract, self.settings.approval_policy)
                    .ensure(&session.address, to, &amount)
                    .await;
                if !approval.is_approved() {
                    return Err("token approval was not granted".to_string());
                }
                contract.decimals().await.map_err(|e| e.to_string())?
            }
            None => ETHER_DECIMALS,
        };

        let call = encode_bet_slip(order, &amount, token, decimals).map_err(|e| e.to_string())?;
        let tx = json!([{
            "from": session.address,
            "to": to,
            "data": call.data_hex(),
            "value": call.value_hex(),
        }]);
        let hash = session
            .provider
            .request(methods::ETH_SEND_TRANSACTION, tx)
            .await
            .map_err(|e| e.to_string())?;
        info!(wallet = %self.variant.info.name, tx = %hash, "bet slip submitted");
        Ok(())
    }
}

#[async_trait]
impl WalletAdapter for EvmWalletAdapter {
    fn info(&self) -> &WalletInfo {
        &self.variant.info
    }

    fn address(&self) -> &str {
        self.session.as_ref().map_or("", |s| s.address.as_str())
    }

    fn is_enabled(&self) -> bool {
        self.session.is_some()
    }

    fn enabled_chain(&self) -> Option<ChainType> {
        self.session.as_ref().map(|s| s.chain)
    }

    fn enabled_currency(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.currency.as_str())
    }

    async fn enable(&mut self, selection: &CurrencySelection) -> WalletResult<()> {
        if self.enabled_currency() == Some(selection.currency.as_str()) {
            return Ok(());
        }

        debug!(wallet = %self.variant.info.name, currency = %selection.currency, "enabling wallet");
        // a new currency reconnects from scratch
        self.logout().await;
        match self.connect(selection).await {
            Ok(session) => {
                info!(wallet = %self.variant.info.name, address = %session.address, chain = %session.chain, "wallet enabled");
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                warn!(wallet = %self.variant.info.name, error = %e, "enable failed");
                self.logout().await;
                Err(e)
            }
        }
    }

    async fn change_currency(&mut self, selection: &CurrencySelection) -> WalletResult<()> {
        let Some(session) = self.session.as_ref() else {
            return Err(WalletError::Fail);
        };
        if session.currency == selection.currency {
            return Ok(());
        }
        if !self.variant.info.supports_chain(selection.chain) {
            return Err(WalletError::ChainError);
        }

        let provider = session.provider.clone();
        match self.variant.order {
            ConnectOrder::SessionBound => Self::check_session_family(provider.as_ref(), selection.chain)?,
            _ => self.negotiate(provider.as_ref(), selection.chain).await?,
        }

        let token = self.session_token(&provider, selection)?;
        let listeners = self.watch(&provider, selection.chain);
        if let Some(session) = self.session.as_mut() {
            session.chain = selection.chain;
            session.currency = selection.currency.clone();
            session.token = token;
            session.listeners = listeners;
        }
        debug!(currency = %selection.currency, "currency changed");
        Ok(())
    }

    async fn get_balance(&self) -> WalletResult<f64> {
        let session = self.session.as_ref().ok_or(WalletError::UserNotLogged)?;
        match self.read_balance(session).await {
            Ok(balance) => Ok(balance),
            Err(e) => {
                warn!(wallet = %self.variant.info.name, error = %e, "balance read failed, reporting 0");
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
                warn!(wallet = %self.variant.info.name, error = %e, "transaction failed");
                WalletError::Fail
            })
    }

    async fn signature(&self, message: &str) -> Option<String> {
        let session = self.session.as_ref()?;
        let payload = format!("0x{}", hex::encode(message.as_bytes()));
        let result = match self.variant.sign {
            SignMethod::Personal => {
                session
                    .provider
                    .request(methods::PERSONAL_SIGN, json!([payload, session.address]))
                    .await
            }
            SignMethod::Binance => {
                session
                    .provider
                    .request(methods::BNB_SIGN, json!([session.address, payload]))
                    .await
            }
        };

        let value = match result {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "signature declined or failed");
                return None;
            }
        };
        let signature = match self.variant.sign {
            SignMethod::Personal => value.as_str(),
            SignMethod::Binance => value.get("signature").and_then(Value::as_str),
        };
        signature.map(str::to_string)
    }

    async fn logout(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.listeners.unsubscribe();
        self.release(session.provider.as_ref()).await;
        info!(wallet = %self.variant.info.name, "wallet logged out");
    }

    fn browser(&self) -> BrowserLink {
        let Some(session) = &self.session else {
            return BrowserLink::empty();
        };
        let chain_id = session
            .provider
            .chain_id()
            .and_then(|raw| ChainId::parse(&raw).ok())
            .or_else(|| self.variant.rules.target(session.chain));
        match chain_id {
            Some(id) => explorer_link(id, &session.address),
            None => BrowserLink::empty(),
        }
    }
}

impl fmt::Debug for EvmWalletAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmWalletAdapter")
            .field("wallet", &self.variant.info.name)
            .field("address", &self.address())
            .field("chain", &self.enabled_chain())
            .finish()
    }
}
