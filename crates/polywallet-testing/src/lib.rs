//! # Polywallet Testing Infrastructure
//!
//! Scriptable stand-ins for the wallet providers a page injects:
//! - [`MockEvmProvider`] - chain id, per-method replies, request log, events
//! - [`MockTronProvider`] - TronWeb with scripted contract calls
//! - [`MockEnvironment`] - an injected environment that counts lookups
//! - [`MockBridgeFactory`] / [`MockBridgeDirectory`] - relay collaborators
//! - proptest strategies for amounts and addresses
//!
//! ## Usage
//!
//! ```rust,ignore
//! use polywallet_testing::*;
//!
//! // Wallet on Rinkeby that follows switch requests
//! let provider = MockEvmProvider::metamask("0x4")
//!     .with_accounts(&["0x00000000000000000000000000000000000000a1"]);
//!
//! // Wallet that acknowledges switches but never moves
//! let stubborn = MockEvmProvider::new("0x4").with_switch(SwitchBehavior::Ignore);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use polywallet_provider::{
    methods, BridgeDirectory, BridgeProviderFactory, ChainProvider, EventHandler, Injected,
    InjectedEnvironment, ListenerId, ProviderError, ProviderEvent, ProviderFlags, SendOptions,
    TronProvider, WalletConnectSession, WalletLinkOptions,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

type ProviderResult<T> = std::result::Result<T, ProviderError>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Scripted Replies
// ============================================================================

/// A scripted provider answer
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Resolve with a value
    Ok(Value),
    /// Fail with an RPC error
    Rpc(i64, String),
    /// Fail with a wallet-specific rejection message
    Rejected(String),
    /// Never resolve
    Hang,
}

impl MockReply {
    /// The EIP-1193 user rejection
    pub fn user_rejected() -> Self {
        MockReply::Rpc(4001, "User rejected the request.".into())
    }

    /// A generic internal error
    pub fn internal() -> Self {
        MockReply::Rpc(-32603, "Internal JSON-RPC error.".into())
    }

    async fn resolve(self) -> ProviderResult<Value> {
        match self {
            MockReply::Ok(value) => Ok(value),
            MockReply::Rpc(code, message) => Err(ProviderError::rpc(code, message)),
            MockReply::Rejected(reason) => Err(ProviderError::Rejected(reason)),
            MockReply::Hang => std::future::pending().await,
        }
    }
}

/// 4-byte selectors of the ERC20 calls adapters make, hex with `0x`
pub mod selectors {
    /// `decimals()`
    pub const DECIMALS: &str = "0x313ce567";
    /// `balanceOf(address)`
    pub const BALANCE_OF: &str = "0x70a08231";
    /// `allowance(address,address)`
    pub const ALLOWANCE: &str = "0xdd62ed3e";
    /// `approve(address,uint256)`
    pub const APPROVE: &str = "0x095ea7b3";
}

/// ABI-encodes an unsigned integer as a single 32-byte word
pub fn abi_word(value: u128) -> String {
    format!("0x{value:064x}")
}

// ============================================================================
// EVM Provider
// ============================================================================

/// What a [`MockEvmProvider`] does when asked to switch chains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchBehavior {
    /// Move to the requested chain immediately
    Apply,
    /// Move to the requested chain after a delay
    ApplyAfter(Duration),
    /// Acknowledge the request but stay put (the user closed the popup)
    Ignore,
}

/// A recorded request
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Method name
    pub method: String,
    /// Parameters as sent
    pub params: Value,
}

impl RecordedRequest {
    /// The `data` field of the first param object, for contract calls
    pub fn data(&self) -> Option<&str> {
        self.params.get(0)?.get("data")?.as_str()
    }

    /// Checks if the call data starts with `selector`
    pub fn calls(&self, selector: &str) -> bool {
        self.data().is_some_and(|d| d.starts_with(selector))
    }
}

struct EvmState {
    chain_id: Option<String>,
    flags: ProviderFlags,
    switch: SwitchBehavior,
    replies: HashMap<String, MockReply>,
    queued: HashMap<String, VecDeque<MockReply>>,
    by_selector: HashMap<(String, String), MockReply>,
    requests: Vec<RecordedRequest>,
    listeners: BTreeMap<ListenerId, EventHandler>,
    next_listener: ListenerId,
    disconnects: usize,
}

/// Scriptable EVM provider.
///
/// Unscripted methods fail with [`ProviderError::Unsupported`]. Switch
/// requests (`wallet_switchEthereumChain`, `wallet_addEthereumChain`,
/// `bnb_switchNetwork`) succeed and follow [`SwitchBehavior`] unless a reply is
/// scripted for them.
#[derive(Clone)]
pub struct MockEvmProvider {
    state: Arc<Mutex<EvmState>>,
}

impl MockEvmProvider {
    /// A provider reporting `chain_id`
    pub fn new(chain_id: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(EvmState {
                chain_id: Some(chain_id.to_string()),
                flags: ProviderFlags::default(),
                switch: SwitchBehavior::Apply,
                replies: HashMap::new(),
                queued: HashMap::new(),
                by_selector: HashMap::new(),
                requests: Vec::new(),
                listeners: BTreeMap::new(),
                next_listener: 1,
                disconnects: 0,
            })),
        }
    }

    /// A provider flagged as MetaMask
    pub fn metamask(chain_id: &str) -> Self {
        Self::new(chain_id).with_flags(ProviderFlags {
            is_metamask: true,
            is_wallet_link: false,
        })
    }

    /// A provider flagged as Coinbase WalletLink
    pub fn wallet_link(chain_id: &str) -> Self {
        Self::new(chain_id).with_flags(ProviderFlags {
            is_metamask: false,
            is_wallet_link: true,
        })
    }

    /// Sets the identity flags
    pub fn with_flags(self, flags: ProviderFlags) -> Self {
        lock(&self.state).flags = flags;
        self
    }

    /// Sets the switch behaviour
    pub fn with_switch(self, behavior: SwitchBehavior) -> Self {
        lock(&self.state).switch = behavior;
        self
    }

    /// Scripts `eth_requestAccounts` and `bnb_requestAddresses`
    pub fn with_accounts(self, accounts: &[&str]) -> Self {
        self.respond(methods::ETH_REQUEST_ACCOUNTS, json!(accounts));
        self.respond(methods::BNB_REQUEST_ADDRESSES, json!(accounts));
        self
    }

    /// Scripts an ERC20 token: decimals, balance and current allowance
    pub fn with_token(self, decimals: u8, balance: u128, allowance: u128) -> Self {
        self.respond_call(selectors::DECIMALS, json!(abi_word(decimals as u128)));
        self.respond_call(selectors::BALANCE_OF, json!(abi_word(balance)));
        self.respond_call(selectors::ALLOWANCE, json!(abi_word(allowance)));
        self
    }

    /// Scripts a successful send and a mined receipt
    pub fn with_successful_sends(self) -> Self {
        self.respond(methods::ETH_SEND_TRANSACTION, json!(format!("0x{}", "ab".repeat(32))));
        self.respond(methods::ETH_GET_TRANSACTION_RECEIPT, json!({ "status": "0x1" }));
        self
    }

    /// Replies to every call of `method` with `value`
    pub fn respond(&self, method: &str, value: Value) {
        self.reply(method, MockReply::Ok(value));
    }

    /// Replies to every call of `method` with `reply`
    pub fn reply(&self, method: &str, reply: MockReply) {
        lock(&self.state).replies.insert(method.to_string(), reply);
    }

    /// Replies to the next call of `method` only
    pub fn reply_once(&self, method: &str, reply: MockReply) {
        lock(&self.state)
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Replies to `eth_call` whose data starts with `selector`
    pub fn respond_call(&self, selector: &str, value: Value) {
        self.reply_selector(methods::ETH_CALL, selector, MockReply::Ok(value));
    }

    /// Replies to `method` calls whose data starts with `selector`
    pub fn reply_selector(&self, method: &str, selector: &str, reply: MockReply) {
        lock(&self.state)
            .by_selector
            .insert((method.to_string(), selector.to_string()), reply);
    }

    /// Changes the reported chain id without emitting an event
    pub fn set_chain_id(&self, chain_id: Option<&str>) {
        lock(&self.state).chain_id = chain_id.map(str::to_string);
    }

    /// Delivers an event to every listener
    pub fn emit(&self, event: ProviderEvent) {
        let handlers: Vec<EventHandler> = lock(&self.state).listeners.values().cloned().collect();
        for handler in handlers {
            handler(&event);
        }
    }

    /// Every request so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    /// Number of calls of `method`
    pub fn count(&self, method: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    /// `eth_sendTransaction` requests whose data starts with `selector`
    pub fn sends_calling(&self, selector: &str) -> Vec<RecordedRequest> {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.method == methods::ETH_SEND_TRANSACTION && r.calls(selector))
            .cloned()
            .collect()
    }

    /// Registered listeners
    pub fn listener_count(&self) -> usize {
        lock(&self.state).listeners.len()
    }

    /// Number of `disconnect` calls
    pub fn disconnect_count(&self) -> usize {
        lock(&self.state).disconnects
    }

    fn switch_target(method: &str, params: &Value) -> Option<String> {
        match method {
            methods::WALLET_SWITCH_ETHEREUM_CHAIN | methods::WALLET_ADD_ETHEREUM_CHAIN => params
                .get(0)?
                .get("chainId")?
                .as_str()
                .map(str::to_string),
            methods::BNB_SWITCH_NETWORK => match params.get(0)?.as_str()? {
                "bsc-mainnet" => Some("0x38".into()),
                "bsc-testnet" => Some("0x61".into()),
                "eth-mainnet" => Some("0x1".into()),
                _ => None,
            },
            _ => None,
        }
    }

    fn scripted(&self, method: &str, params: &Value) -> Option<MockReply> {
        let mut state = lock(&self.state);
        if let Some(reply) = state.queued.get_mut(method).and_then(VecDeque::pop_front) {
            return Some(reply);
        }
        let data = params
            .get(0)
            .and_then(|p| p.get("data"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let by_selector = state
            .by_selector
            .iter()
            .find(|((m, sel), _)| m == method && data.starts_with(sel.as_str()))
            .map(|(_, reply)| reply.clone());
        by_selector.or_else(|| state.replies.get(method).cloned())
    }
}

#[async_trait]
impl ChainProvider for MockEvmProvider {
    async fn request(&self, method: &str, params: Value) -> ProviderResult<Value> {
        lock(&self.state).requests.push(RecordedRequest {
            method: method.to_string(),
            params: params.clone(),
        });

        if let Some(reply) = self.scripted(method, &params) {
            return reply.resolve().await;
        }

        if let Some(target) = Self::switch_target(method, &params) {
            let behavior = lock(&self.state).switch;
            match behavior {
                SwitchBehavior::Apply => self.set_chain_id(Some(&target)),
                SwitchBehavior::ApplyAfter(delay) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        lock(&state).chain_id = Some(target);
                    });
                }
                SwitchBehavior::Ignore => {}
            }
            return Ok(Value::Null);
        }

        Err(ProviderError::Unsupported(method.to_string()))
    }

    fn chain_id(&self) -> Option<String> {
        lock(&self.state).chain_id.clone()
    }

    fn flags(&self) -> ProviderFlags {
        lock(&self.state).flags
    }

    fn on(&self, handler: EventHandler) -> ListenerId {
        let mut state = lock(&self.state);
        let id = state.next_listener;
        state.next_listener += 1;
        state.listeners.insert(id, handler);
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        lock(&self.state).listeners.remove(&id);
    }

    async fn disconnect(&self) -> ProviderResult<()> {
        lock(&self.state).disconnects += 1;
        Ok(())
    }
}

// ============================================================================
// Tron Provider
// ============================================================================

/// A recorded Tron contract send
#[derive(Debug, Clone, PartialEq)]
pub struct TronSend {
    /// Contract address
    pub contract: String,
    /// Method name
    pub method: String,
    /// Arguments
    pub args: Vec<Value>,
    /// Options
    pub options: SendOptions,
}

struct TronState {
    address: Option<String>,
    balance: Result<u64, String>,
    calls: HashMap<String, MockReply>,
    sends: HashMap<String, MockReply>,
    sign: MockReply,
    sent: Vec<TronSend>,
    call_log: Vec<(String, String)>,
    listeners: BTreeMap<ListenerId, EventHandler>,
    next_listener: ListenerId,
}

/// Scriptable TronWeb
#[derive(Clone)]
pub struct MockTronProvider {
    state: Arc<Mutex<TronState>>,
}

impl MockTronProvider {
    /// A TronWeb with `address` unlocked
    pub fn new(address: Option<&str>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TronState {
                address: address.map(str::to_string),
                balance: Ok(0),
                calls: HashMap::new(),
                sends: HashMap::new(),
                sign: MockReply::Ok(json!("0xsigned")),
                sent: Vec::new(),
                call_log: Vec::new(),
                listeners: BTreeMap::new(),
                next_listener: 1,
            })),
        }
    }

    /// Sets the native balance in SUN
    pub fn with_balance(self, sun: u64) -> Self {
        lock(&self.state).balance = Ok(sun);
        self
    }

    /// Makes balance reads fail
    pub fn with_failing_balance(self) -> Self {
        lock(&self.state).balance = Err("node unavailable".into());
        self
    }

    /// Replies to read calls of `method`
    pub fn respond_call(self, method: &str, value: Value) -> Self {
        lock(&self.state)
            .calls
            .insert(method.to_string(), MockReply::Ok(value));
        self
    }

    /// Replies to sends of `method`
    pub fn reply_send(self, method: &str, reply: MockReply) -> Self {
        lock(&self.state).sends.insert(method.to_string(), reply);
        self
    }

    /// Sets the signature reply
    pub fn with_sign(self, reply: MockReply) -> Self {
        lock(&self.state).sign = reply;
        self
    }

    /// Unlocks or locks the account
    pub fn set_address(&self, address: Option<&str>) {
        lock(&self.state).address = address.map(str::to_string);
    }

    /// Every send so far
    pub fn sent(&self) -> Vec<TronSend> {
        lock(&self.state).sent.clone()
    }

    /// `(contract, method)` of every read call so far
    pub fn calls(&self) -> Vec<(String, String)> {
        lock(&self.state).call_log.clone()
    }

    /// Registered listeners
    pub fn listener_count(&self) -> usize {
        lock(&self.state).listeners.len()
    }

    /// Delivers an event to every listener
    pub fn emit(&self, event: ProviderEvent) {
        let handlers: Vec<EventHandler> = lock(&self.state).listeners.values().cloned().collect();
        for handler in handlers {
            handler(&event);
        }
    }
}

#[async_trait]
impl TronProvider for MockTronProvider {
    fn default_address(&self) -> Option<String> {
        lock(&self.state).address.clone()
    }

    async fn balance(&self) -> ProviderResult<u64> {
        lock(&self.state)
            .balance
            .clone()
            .map_err(ProviderError::InvalidResponse)
    }

    async fn call(&self, contract: &str, method: &str, _args: Vec<Value>) -> ProviderResult<Value> {
        let reply = {
            let mut state = lock(&self.state);
            state.call_log.push((contract.to_string(), method.to_string()));
            state.calls.get(method).cloned()
        };
        match reply {
            Some(reply) => reply.resolve().await,
            None => Err(ProviderError::Unsupported(method.to_string())),
        }
    }

    async fn send(
        &self,
        contract: &str,
        method: &str,
        args: Vec<Value>,
        options: SendOptions,
    ) -> ProviderResult<Option<Value>> {
        let reply = {
            let mut state = lock(&self.state);
            state.sent.push(TronSend {
                contract: contract.to_string(),
                method: method.to_string(),
                args,
                options,
            });
            state
                .sends
                .get(method)
                .cloned()
                .unwrap_or(MockReply::Ok(json!("tx-id")))
        };
        let value = reply.resolve().await?;
        Ok((!value.is_null()).then_some(value))
    }

    async fn sign(&self, _hex_message: &str) -> ProviderResult<String> {
        let reply = lock(&self.state).sign.clone();
        let value = reply.resolve().await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::InvalidResponse(value.to_string()))
    }

    fn on(&self, handler: EventHandler) -> ListenerId {
        let mut state = lock(&self.state);
        let id = state.next_listener;
        state.next_listener += 1;
        state.listeners.insert(id, handler);
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        lock(&self.state).listeners.remove(&id);
    }
}

// ============================================================================
// Environment and Relay Collaborators
// ============================================================================

/// An [`InjectedEnvironment`] that counts provider lookups
#[derive(Debug, Default)]
pub struct MockEnvironment {
    injected: Injected,
    lookups: AtomicUsize,
}

impl MockEnvironment {
    /// Wraps a configured environment
    pub fn new(injected: Injected) -> Self {
        Self {
            injected,
            lookups: AtomicUsize::new(0),
        }
    }

    /// The wrapped environment, for late injection
    pub fn injected(&self) -> &Injected {
        &self.injected
    }

    /// Provider lookups so far (query parameters not counted)
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.lookups.fetch_add(1, Ordering::SeqCst);
    }
}

impl InjectedEnvironment for MockEnvironment {
    fn ethereum(&self) -> Option<Arc<dyn ChainProvider>> {
        self.hit();
        self.injected.ethereum()
    }

    fn ethereum_providers(&self) -> Vec<Arc<dyn ChainProvider>> {
        self.hit();
        self.injected.ethereum_providers()
    }

    fn binance_chain(&self) -> Option<Arc<dyn ChainProvider>> {
        self.hit();
        self.injected.binance_chain()
    }

    fn tron_web(&self) -> Option<Arc<dyn TronProvider>> {
        self.hit();
        self.injected.tron_web()
    }

    fn query_param(&self, name: &str) -> Option<String> {
        self.injected.query_param(name)
    }
}

/// A [`BridgeDirectory`] with a fixed answer
#[derive(Debug, Clone)]
pub struct MockBridgeDirectory {
    hosts: Option<Vec<String>>,
}

impl MockBridgeDirectory {
    /// Lists `hosts`
    pub fn new(hosts: &[&str]) -> Self {
        Self {
            hosts: Some(hosts.iter().map(|h| h.to_string()).collect()),
        }
    }

    /// Fails every lookup
    pub fn failing() -> Self {
        Self { hosts: None }
    }
}

#[async_trait]
impl BridgeDirectory for MockBridgeDirectory {
    async fn bridge_hosts(&self) -> ProviderResult<Vec<String>> {
        self.hosts
            .clone()
            .ok_or_else(|| ProviderError::Backend("rspCode 9999".into()))
    }
}

/// A [`BridgeProviderFactory`] handing out a fixed provider
#[derive(Clone, Default)]
pub struct MockBridgeFactory {
    provider: Option<MockEvmProvider>,
    sessions: Arc<Mutex<Vec<WalletConnectSession>>>,
    links: Arc<Mutex<Vec<WalletLinkOptions>>>,
}

impl MockBridgeFactory {
    /// Hands out `provider` for every session
    pub fn new(provider: MockEvmProvider) -> Self {
        Self {
            provider: Some(provider),
            ..Self::default()
        }
    }

    /// WalletConnect sessions requested so far
    pub fn sessions(&self) -> Vec<WalletConnectSession> {
        lock(&self.sessions).clone()
    }

    /// WalletLink providers requested so far
    pub fn links(&self) -> Vec<WalletLinkOptions> {
        lock(&self.links).clone()
    }

    fn provider(&self) -> ProviderResult<Arc<dyn ChainProvider>> {
        self.provider
            .clone()
            .map(|p| Arc::new(p) as Arc<dyn ChainProvider>)
            .ok_or(ProviderError::Disconnected)
    }
}

#[async_trait]
impl BridgeProviderFactory for MockBridgeFactory {
    async fn wallet_connect(
        &self,
        session: &WalletConnectSession,
    ) -> ProviderResult<Arc<dyn ChainProvider>> {
        lock(&self.sessions).push(session.clone());
        self.provider()
    }

    async fn wallet_link(
        &self,
        options: &WalletLinkOptions,
    ) -> ProviderResult<Arc<dyn ChainProvider>> {
        lock(&self.links).push(options.clone());
        self.provider()
    }
}

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Decimal amount strings with 1 to 9 integer digits and up to 6 fraction digits
pub fn decimal_amount() -> impl Strategy<Value = String> {
    (1u64..1_000_000_000u64, prop::option::of(0u32..1_000_000u32)).prop_map(|(int, frac)| {
        match frac {
            Some(frac) => format!("{int}.{frac:06}"),
            None => int.to_string(),
        }
    })
}

/// Lower-case hex EVM addresses
pub fn evm_address() -> impl Strategy<Value = String> {
    prop::array::uniform20(any::<u8>()).prop_map(|bytes| {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        format!("0x{hex}")
    })
}

/// Well-known test addresses
pub mod fixtures {
    /// The connected EVM account
    pub const ACCOUNT: &str = "0x00000000000000000000000000000000000000a1";
    /// The bet-slip contract
    pub const BET_CONTRACT: &str = "0x00000000000000000000000000000000000000b2";
    /// An ERC20 token
    pub const TOKEN: &str = "0x00000000000000000000000000000000000000c3";
    /// A Tron account
    pub const TRON_ACCOUNT: &str = "TLa2f6VPqDgRE67v1736s7bJ8Ray5wYjU7";
    /// A Tron bet-slip contract
    pub const TRON_CONTRACT: &str = "TXYZopYRdj2D9XRtbG411XZZ3kM5VkAeBf";
    /// A TRC20 token
    pub const TRON_TOKEN: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
}

// ============================================================================
// Tests
// ============================================================================
