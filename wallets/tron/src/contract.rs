//! TRC20 tokens through TronWeb

use alloy::primitives::U256;
use async_trait::async_trait;
use polywallet_erc20::{Erc20Error, TokenContract};
use polywallet_provider::{SendOptions, TronProvider};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::address::validate_address;

/// Reads a TronWeb integer result.
///
/// Depending on the contract and TronWeb version integers come back as JSON
/// numbers, decimal or hex strings, `BigNumber` objects (`{"_hex": ..}`) or a
/// one-element result tuple.
pub fn read_uint(value: &Value) -> Result<U256, Erc20Error> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| Erc20Error::Decode(format!("not an unsigned integer: {n}"))),
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex) if hex.is_empty() => Ok(U256::ZERO),
            Some(hex) => U256::from_str_radix(hex, 16).map_err(|e| Erc20Error::Decode(e.to_string())),
            None => U256::from_str(s).map_err(|e| Erc20Error::Decode(e.to_string())),
        },
        Value::Object(map) => map
            .get("_hex")
            .or_else(|| map.get("hex"))
            .map(read_uint)
            .unwrap_or_else(|| Err(Erc20Error::Decode(format!("unexpected object: {value}")))),
        Value::Array(items) if items.len() == 1 => read_uint(&items[0]),
        other => Err(Erc20Error::Decode(format!("unexpected result: {other}"))),
    }
}

/// A TRC20 token reached through the injected TronWeb
#[derive(Clone)]
pub struct TronTokenContract {
    provider: Arc<dyn TronProvider>,
    address: String,
}

impl TronTokenContract {
    /// Binds the token at `address`, which must be a valid Tron address
    pub fn new(provider: Arc<dyn TronProvider>, address: &str) -> Result<Self, Erc20Error> {
        validate_address(address).map_err(|e| Erc20Error::InvalidAddress(format!("{address}: {e}")))?;
        Ok(Self {
            provider,
            address: address.to_string(),
        })
    }
}

#[async_trait]
impl TokenContract for TronTokenContract {
    fn address(&self) -> &str {
        &self.address
    }

    async fn decimals(&self) -> Result<u8, Erc20Error> {
        let raw = self.provider.call(&self.address, "decimals", vec![]).await?;
        let decimals = read_uint(&raw)?;
        u8::try_from(decimals).map_err(|_| Erc20Error::Decode(format!("decimals out of range: {decimals}")))
    }

    async fn balance_of(&self, owner: &str) -> Result<U256, Erc20Error> {
        let raw = self
            .provider
            .call(&self.address, "balanceOf", vec![json!(owner)])
            .await?;
        read_uint(&raw)
    }

    async fn allowance(&self, owner: &str, spender: &str) -> Result<U256, Erc20Error> {
        let raw = self
            .provider
            .call(&self.address, "allowance", vec![json!(owner), json!(spender)])
            .await?;
        read_uint(&raw)
    }

    // TronLink signs with its unlocked account, which is the owner.
    async fn approve(&self, _owner: &str, spender: &str, amount: U256) -> Result<(), Erc20Error> {
        let result = self
            .provider
            .send(
                &self.address,
                "approve",
                vec![json!(spender), json!(amount.to_string())],
                SendOptions::default(),
            )
            .await?;
        match result {
            Some(tx) => {
                debug!(token = %self.address, %tx, "approve sent");
                Ok(())
            }
            None => Err(Erc20Error::NotConfirmed("approve returned no transaction".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polywallet_testing::{fixtures, MockReply, MockTronProvider};

    fn token(provider: MockTronProvider) -> TronTokenContract {
        TronTokenContract::new(Arc::new(provider), fixtures::TRON_TOKEN).unwrap()
    }

    #[test]
    fn test_read_uint_shapes() {
        assert_eq!(read_uint(&json!(6)).unwrap(), U256::from(6));
        assert_eq!(read_uint(&json!("1500000")).unwrap(), U256::from(1_500_000));
        assert_eq!(read_uint(&json!("0x0f")).unwrap(), U256::from(15));
        assert_eq!(read_uint(&json!({ "_hex": "0x10" })).unwrap(), U256::from(16));
        assert_eq!(read_uint(&json!([{ "_hex": "0x01" }])).unwrap(), U256::from(1));
        assert!(read_uint(&json!(-1)).is_err());
        assert!(read_uint(&json!(null)).is_err());
        assert!(read_uint(&json!({ "value": 1 })).is_err());
    }

    #[test]
    fn test_rejects_evm_address() {
        let provider = Arc::new(MockTronProvider::new(None));
        assert!(matches!(
            TronTokenContract::new(provider, fixtures::TOKEN),
            Err(Erc20Error::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_reads() {
        let provider = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT))
            .respond_call("decimals", json!(6))
            .respond_call("balanceOf", json!({ "_hex": "0x0f4240" }))
            .respond_call("allowance", json!("250"));
        let contract = token(provider.clone());

        assert_eq!(contract.decimals().await.unwrap(), 6);
        assert_eq!(contract.balance_of(fixtures::TRON_ACCOUNT).await.unwrap(), U256::from(1_000_000));
        assert_eq!(
            contract.allowance(fixtures::TRON_ACCOUNT, fixtures::TRON_CONTRACT).await.unwrap(),
            U256::from(250)
        );
        assert!(provider.calls().iter().all(|(c, _)| c == fixtures::TRON_TOKEN));
    }

    #[tokio::test]
    async fn test_decimals_out_of_range() {
        let contract = token(MockTronProvider::new(None).respond_call("decimals", json!(300)));
        assert!(matches!(contract.decimals().await, Err(Erc20Error::Decode(_))));
    }

    #[tokio::test]
    async fn test_approve() {
        let provider = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT));
        let contract = token(provider.clone());

        contract
            .approve(fixtures::TRON_ACCOUNT, fixtures::TRON_CONTRACT, U256::from(5_000_000))
            .await
            .unwrap();

        let sent = provider.sent().remove(0);
        assert_eq!(sent.contract, fixtures::TRON_TOKEN);
        assert_eq!(sent.method, "approve");
        assert_eq!(sent.args, vec![json!(fixtures::TRON_CONTRACT), json!("5000000")]);
        assert_eq!(sent.options.call_value, 0);
    }

    #[tokio::test]
    async fn test_approve_without_result_fails() {
        let provider = MockTronProvider::new(Some(fixtures::TRON_ACCOUNT))
            .reply_send("approve", MockReply::Ok(Value::Null));
        let contract = token(provider);

        let result = contract
            .approve(fixtures::TRON_ACCOUNT, fixtures::TRON_CONTRACT, U256::from(1))
            .await;
        assert!(matches!(result, Err(Erc20Error::NotConfirmed(_))));
    }
}
