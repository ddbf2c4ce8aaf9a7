//! Tronlink support for polywallet
//!
//! TronLink injects `tronWeb` some time after the page loads, so enabling
//! polls for it (50 checks, 10 ms apart by default) before giving up with
//! `NotFound`. Token transfers use the same bet-slip contract methods as the
//! EVM wallets, approved through `polywallet_erc20`'s allowance guard.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod adapter;
pub mod contract;

pub use adapter::{TronSettings, TronWalletAdapter, TRX_DECIMALS};
pub use address::{is_valid_address, validate_address, TronAddressError};
pub use contract::TronTokenContract;
