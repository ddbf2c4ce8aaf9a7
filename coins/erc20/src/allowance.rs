//! Token approval before transfers
//!
//! A bet-slip transfer pulls tokens from the owner, so the bet contract must
//! hold an allowance first. [`AllowanceGuard::ensure`] reads the current
//! allowance on every call and submits a single `approve` only when it does
//! not cover the transfer.

use alloy::primitives::U256;
use tracing::{debug, info, warn};

use crate::contract::TokenContract;
use crate::units::{integer_digits, to_base_units};
use crate::Erc20Error;

/// How large an approval to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalPolicy {
    /// Scale the amount so its integer part fills this many digits, so one
    /// approval covers many later transfers
    DigitBudget(u32),
    /// Approve exactly the transfer amount
    Exact,
}

impl ApprovalPolicy {
    /// Digits the EVM wallets scale approvals up to
    pub const DEFAULT_DIGITS: u32 = 15;
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        ApprovalPolicy::DigitBudget(Self::DEFAULT_DIGITS)
    }
}

/// Approval amount in base units for a decimal `amount`.
///
/// With `DigitBudget(n)` and `k` integer digits in `amount` the result is
/// `amount * 10^(n - k)` in base units (no scaling once `k >= n`).
pub fn compute_allowance_amount(
    amount: &str,
    decimals: u8,
    policy: ApprovalPolicy,
) -> Result<U256, Erc20Error> {
    let base = to_base_units(amount, decimals)?;
    match policy {
        ApprovalPolicy::Exact => Ok(base),
        ApprovalPolicy::DigitBudget(digits) => {
            let k = u32::try_from(integer_digits(amount)?).unwrap_or(u32::MAX);
            let exponent = digits.saturating_sub(k);
            let multiplier = U256::from(10u8).pow(U256::from(exponent));
            base.checked_mul(multiplier)
                .ok_or_else(|| Erc20Error::Units(format!("approval for {amount} overflows")))
        }
    }
}

/// One allowance check, never cached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowanceState {
    /// Token holder
    pub owner: String,
    /// Contract allowed to move the tokens
    pub spender: String,
    /// Allowance on chain, base units
    pub current_allowance: U256,
    /// Transfer amount, base units
    pub requested_amount: U256,
}

impl AllowanceState {
    /// Checks if the current allowance covers the transfer
    pub fn is_covered(&self) -> bool {
        self.current_allowance >= self.requested_amount
    }
}

/// Outcome of [`AllowanceGuard::ensure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    /// The existing allowance already covered the transfer
    Sufficient,
    /// A new approval for `amount` base units was confirmed
    Granted {
        /// Approved amount
        amount: U256,
    },
    /// Reading, submitting or confirming the approval failed
    Denied,
}

impl Approval {
    /// Checks if the transfer may proceed
    pub fn is_approved(&self) -> bool {
        !matches!(self, Approval::Denied)
    }
}

/// Runs the approval protocol against one token
pub struct AllowanceGuard<'a> {
    token: &'a dyn TokenContract,
    policy: ApprovalPolicy,
}

impl<'a> AllowanceGuard<'a> {
    /// Guards transfers of `token`
    pub fn new(token: &'a dyn TokenContract, policy: ApprovalPolicy) -> Self {
        Self { token, policy }
    }

    /// Reads the allowance and converts `amount` with the token's decimals
    pub async fn check(
        &self,
        owner: &str,
        spender: &str,
        amount: &str,
    ) -> Result<AllowanceState, Erc20Error> {
        let decimals = self.token.decimals().await?;
        let requested_amount = to_base_units(amount, decimals)?;
        let current_allowance = self.token.allowance(owner, spender).await?;
        Ok(AllowanceState {
            owner: owner.to_string(),
            spender: spender.to_string(),
            current_allowance,
            requested_amount,
        })
    }

    /// Makes sure `spender` may move `amount` of the owner's tokens
    pub async fn ensure(&self, owner: &str, spender: &str, amount: &str) -> Approval {
        match self.try_ensure(owner, spender, amount).await {
            Ok(approval) => approval,
            Err(e) => {
                warn!(token = self.token.address(), error = %e, "token approval failed");
                Approval::Denied
            }
        }
    }

    async fn try_ensure(
        &self,
        owner: &str,
        spender: &str,
        amount: &str,
    ) -> Result<Approval, Erc20Error> {
        let state = self.check(owner, spender, amount).await?;
        if state.is_covered() {
            debug!(allowance = %state.current_allowance, "allowance covers transfer");
            return Ok(Approval::Sufficient);
        }

        let decimals = self.token.decimals().await?;
        let approve_amount = compute_allowance_amount(amount, decimals, self.policy)?
            .max(state.requested_amount);
        self.token.approve(owner, spender, approve_amount).await?;
        info!(token = self.token.address(), amount = %approve_amount, "approval confirmed");
        Ok(Approval::Granted {
            amount: approve_amount,
        })
    }
}
