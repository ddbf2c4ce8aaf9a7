//! TronWeb capability

use async_trait::async_trait;
use serde_json::Value;

use crate::ethereum::{EventHandler, ListenerId};
use crate::Result;

/// Options for a state-changing contract call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// SUN transferred to the contract with the call
    pub call_value: u64,
    /// Wait for solidity-node confirmation before returning
    pub should_poll_response: bool,
}

impl SendOptions {
    /// Sends `call_value` SUN without waiting for confirmation
    pub fn with_value(call_value: u64) -> Self {
        Self {
            call_value,
            should_poll_response: false,
        }
    }
}

/// The TronWeb surface the Tron adapter uses.
///
/// Contract arguments and results are JSON values; integers may come back as
/// numbers or decimal strings.
#[async_trait]
pub trait TronProvider: Send + Sync {
    /// The base58 address of the unlocked account, if any
    fn default_address(&self) -> Option<String>;

    /// Native balance of the default account in SUN
    async fn balance(&self) -> Result<u64>;

    /// Read-only contract call
    async fn call(&self, contract: &str, method: &str, args: Vec<Value>) -> Result<Value>;

    /// State-changing contract call; `None` when the wallet returned nothing
    async fn send(
        &self,
        contract: &str,
        method: &str,
        args: Vec<Value>,
        options: SendOptions,
    ) -> Result<Option<Value>>;

    /// Signs a hex encoded message
    async fn sign(&self, hex_message: &str) -> Result<String>;

    /// Listens for TronLink page messages, delivered as provider events
    fn on(&self, handler: EventHandler) -> ListenerId;

    /// Removes a listener
    fn remove_listener(&self, id: ListenerId);
}
