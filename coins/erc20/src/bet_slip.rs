//! Bet-slip contract calls
//!
//! Every wallet pays through the same contract: `combinedBetSlip` for the
//! chain's native coin (the stake travels as the call value) and
//! `combinedBetSlip_ERC20` for tokens (pulled through the allowance).
//! A single-bet slip carries one option id and one amount; the fold arrays
//! stay empty.

use alloy::primitives::U256;
use alloy::sol;
use alloy::sol_types::SolCall;
use polywallet_traits::Order;

use crate::contract::parse_address;
use crate::units::{to_base_units, ETHER_DECIMALS};
use crate::Erc20Error;

/// Native-coin bet method
pub const BET_SLIP_METHOD: &str = "combinedBetSlip";

/// Token bet method
pub const BET_SLIP_TOKEN_METHOD: &str = "combinedBetSlip_ERC20";

sol! {
    function combinedBetSlip(
        string[] optionIds,
        uint256[] amounts,
        uint8[] foldTypes,
        uint256[] foldAmounts
    ) external payable returns (bool);

    function combinedBetSlip_ERC20(
        address token,
        string[] optionIds,
        uint256[] amounts,
        uint8[] foldTypes,
        uint256[] foldAmounts
    ) external payable returns (bool);
}

/// Encoded call data plus the native value to attach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetSlipCall {
    /// ABI-encoded call
    pub data: Vec<u8>,
    /// Native value in wei, zero for token bets
    pub value: U256,
}

impl BetSlipCall {
    /// Call data as `0x` hex
    pub fn data_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.data))
    }

    /// Value as a JSON-RPC quantity
    pub fn value_hex(&self) -> String {
        format!("{:#x}", self.value)
    }
}

/// Encodes a single bet of `amount` on `order`.
///
/// With a `token` the amount is scaled by `decimals` and sent through
/// `combinedBetSlip_ERC20`; otherwise it is scaled to wei and attached as
/// value.
pub fn encode_bet_slip(
    order: &Order,
    amount: &str,
    token: Option<&str>,
    decimals: u8,
) -> Result<BetSlipCall, Erc20Error> {
    let option_ids = vec![order.option_id.clone()];

    match token {
        Some(token) => {
            let call = combinedBetSlip_ERC20Call {
                token: parse_address(token)?,
                optionIds: option_ids,
                amounts: vec![to_base_units(amount, decimals)?],
                foldTypes: Vec::new(),
                foldAmounts: Vec::new(),
            };
            Ok(BetSlipCall {
                data: call.abi_encode(),
                value: U256::ZERO,
            })
        }
        None => {
            let wei = to_base_units(amount, ETHER_DECIMALS)?;
            let call = combinedBetSlipCall {
                optionIds: option_ids,
                amounts: vec![wei],
                foldTypes: Vec::new(),
                foldAmounts: Vec::new(),
            };
            Ok(BetSlipCall {
                data: call.abi_encode(),
                value: wei,
            })
        }
    }
}
