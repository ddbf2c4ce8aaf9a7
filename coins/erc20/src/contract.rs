//! Token contract access through a wallet provider

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use polywallet_provider::{methods, ChainProvider};
use polywallet_resilience::{await_condition, PollConfig};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};

use crate::Erc20Error;

sol! {
    function decimals() external view returns (uint8);
    function balanceOf(address account) external view returns (uint256);
    function allowance(address owner, address spender) external view returns (uint256);
    function approve(address spender, uint256 amount) external returns (bool);
}

/// The token calls adapters need, independent of chain family
#[async_trait]
pub trait TokenContract: Send + Sync {
    /// The token contract address
    fn address(&self) -> &str;

    /// Token decimals
    async fn decimals(&self) -> Result<u8, Erc20Error>;

    /// Balance of `owner` in base units
    async fn balance_of(&self, owner: &str) -> Result<U256, Erc20Error>;

    /// How much `spender` may move on behalf of `owner`
    async fn allowance(&self, owner: &str, spender: &str) -> Result<U256, Erc20Error>;

    /// Submits `approve(spender, amount)` from `owner`, resolving once the
    /// approval is confirmed
    async fn approve(&self, owner: &str, spender: &str, amount: U256) -> Result<(), Erc20Error>;
}

/// Parses an EVM address
pub fn parse_address(raw: &str) -> Result<Address, Erc20Error> {
    raw.parse::<Address>()
        .map_err(|e| Erc20Error::InvalidAddress(format!("{raw}: {e}")))
}

/// An ERC20 contract reached through the wallet's provider
#[derive(Clone)]
pub struct Erc20Contract {
    provider: Arc<dyn ChainProvider>,
    address: Address,
    raw_address: String,
    receipt_poll: PollConfig,
}

impl Erc20Contract {
    /// Default receipt wait: check every second for two minutes
    pub fn default_receipt_poll() -> PollConfig {
        PollConfig::within(Duration::from_secs(1), Duration::from_secs(120))
    }

    /// Binds the contract at `address`
    pub fn new(provider: Arc<dyn ChainProvider>, address: &str) -> Result<Self, Erc20Error> {
        Ok(Self {
            provider,
            address: parse_address(address)?,
            raw_address: address.to_string(),
            receipt_poll: Self::default_receipt_poll(),
        })
    }

    /// Sets how approval receipts are awaited
    pub fn with_receipt_poll(mut self, poll: PollConfig) -> Self {
        self.receipt_poll = poll;
        self
    }

    async fn call_contract<C: SolCall>(&self, call: C) -> Result<C::Return, Erc20Error> {
        let data = format!("0x{}", hex::encode(call.abi_encode()));
        let params = json!([{ "to": self.address.to_string(), "data": data }, "latest"]);
        let result = self.provider.request(methods::ETH_CALL, params).await?;

        let raw = result
            .as_str()
            .ok_or_else(|| Erc20Error::Decode(format!("eth_call returned {result}")))?;
        let bytes = hex::decode(raw.trim_start_matches("0x"))
            .map_err(|e| Erc20Error::Decode(e.to_string()))?;

        C::abi_decode_returns(&bytes).map_err(|e| Erc20Error::Decode(format!("Decode error: {e}")))
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<(), Erc20Error> {
        let status: Arc<OnceLock<bool>> = Arc::new(OnceLock::new());
        let outcome = await_condition(self.receipt_poll, || {
            let provider = self.provider.clone();
            let status = status.clone();
            let hash = tx_hash.to_string();
            async move {
                match provider
                    .request(methods::ETH_GET_TRANSACTION_RECEIPT, json!([hash]))
                    .await
                {
                    Ok(Value::Null) => false,
                    Ok(receipt) => {
                        let ok = receipt.get("status").and_then(Value::as_str) == Some("0x1");
                        let _ = status.set(ok);
                        true
                    }
                    Err(e) => {
                        debug!(error = %e, "receipt lookup failed, retrying");
                        false
                    }
                }
            }
        })
        .await;

        match (outcome.is_confirmed(), status.get()) {
            (true, Some(true)) => Ok(()),
            (true, _) => Err(Erc20Error::Reverted(tx_hash.to_string())),
            (false, _) => {
                warn!(tx = tx_hash, "approval receipt never arrived");
                Err(Erc20Error::NotConfirmed(tx_hash.to_string()))
            }
        }
    }
}

#[async_trait]
impl TokenContract for Erc20Contract {
    fn address(&self) -> &str {
        &self.raw_address
    }

    async fn decimals(&self) -> Result<u8, Erc20Error> {
        self.call_contract(decimalsCall {}).await
    }

    async fn balance_of(&self, owner: &str) -> Result<U256, Erc20Error> {
        let account = parse_address(owner)?;
        self.call_contract(balanceOfCall { account }).await
    }

    async fn allowance(&self, owner: &str, spender: &str) -> Result<U256, Erc20Error> {
        let call = allowanceCall {
            owner: parse_address(owner)?,
            spender: parse_address(spender)?,
        };
        self.call_contract(call).await
    }

    async fn approve(&self, owner: &str, spender: &str, amount: U256) -> Result<(), Erc20Error> {
        let from = parse_address(owner)?;
        let call = approveCall {
            spender: parse_address(spender)?,
            amount,
        };
        let data = format!("0x{}", hex::encode(call.abi_encode()));
        let tx = json!([{
            "from": from.to_string(),
            "to": self.address.to_string(),
            "data": data,
        }]);

        let hash = self.provider.request(methods::ETH_SEND_TRANSACTION, tx).await?;
        let hash = hash
            .as_str()
            .ok_or_else(|| Erc20Error::Decode(format!("transaction hash {hash}")))?;
        debug!(tx = hash, token = %self.address, "approval submitted");

        self.wait_for_receipt(hash).await
    }
}

impl std::fmt::Debug for Erc20Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Erc20Contract")
            .field("address", &self.address)
            .finish()
    }
}
