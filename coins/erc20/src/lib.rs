//! Polywallet ERC-20 module
//!
//! Token access shared by the wallet adapters:
//!
//! - [`units`] converts host decimal amounts to and from base units
//! - [`contract`] defines [`TokenContract`] and the provider-backed
//!   [`Erc20Contract`]
//! - [`allowance`] runs the approval protocol that precedes token transfers
//! - [`bet_slip`] encodes the bet-slip contract calls transfers are made with

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod allowance;
pub mod bet_slip;
pub mod contract;
pub mod units;

use polywallet_provider::ProviderError;
use thiserror::Error;

pub use allowance::{compute_allowance_amount, AllowanceGuard, AllowanceState, Approval, ApprovalPolicy};
pub use bet_slip::{encode_bet_slip, BET_SLIP_METHOD, BET_SLIP_TOKEN_METHOD};
pub use contract::{Erc20Contract, TokenContract};

/// Token and unit errors
#[derive(Error, Debug)]
pub enum Erc20Error {
    /// The provider call failed
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Address failed to parse
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Amount is negative, not finite, or not a plain decimal
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Unit conversion failed
    #[error("Unit conversion error: {0}")]
    Units(String),

    /// The contract or provider returned data that does not decode
    #[error("Decode error: {0}")]
    Decode(String),

    /// The transaction was mined but reverted
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    /// No receipt arrived in time
    #[error("Transaction not confirmed: {0}")]
    NotConfirmed(String),
}

/// Exposes commonly used types when working with ERC-20 tokens.
pub mod prelude {
    pub use super::allowance::{AllowanceGuard, Approval, ApprovalPolicy};
    pub use super::contract::{Erc20Contract, TokenContract};
    pub use super::units::{from_base_units, to_base_units};
    pub use super::Erc20Error;
}
