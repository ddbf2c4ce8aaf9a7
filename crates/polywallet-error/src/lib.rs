//! # Polywallet Error
//!
//! Status codes shared by every wallet adapter in the polywallet workspace.
//!
//! Adapter operations return [`Result<T>`], where the error side is one of the
//! [`WalletError`] codes. Hosts that need the flat code set (including the
//! success code) convert through [`WalletStatus`].
//!
//! ## Example
//!
//! ```
//! use polywallet_error::{WalletError, WalletStatus};
//!
//! let outcome: Result<(), WalletError> = Err(WalletError::UserRejectedLogin);
//! let status = WalletStatus::from(outcome);
//! assert_eq!(status.code(), "user_rejected_login");
//! assert!(!status.is_success());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::fmt;
use thiserror::Error;

/// Failure codes an adapter reports to the host.
///
/// Every adapter method converts its internal provider and contract failures
/// into one of these before returning.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WalletError {
    /// Submission, encoding or approval failure
    #[cfg_attr(feature = "serde", serde(rename = "fail"))]
    #[error("wallet operation failed")]
    Fail,

    /// The wallet provider is not present
    #[cfg_attr(feature = "serde", serde(rename = "wallet_not_found"))]
    #[error("wallet provider not found")]
    NotFound,

    /// The user declined a connection or a chain switch
    #[cfg_attr(feature = "serde", serde(rename = "user_rejected_login"))]
    #[error("user rejected the login request")]
    UserRejectedLogin,

    /// The wallet exposed an address that could not be used
    #[cfg_attr(feature = "serde", serde(rename = "user_address_error"))]
    #[error("wallet returned an unusable address")]
    AddressError,

    /// No account is exposed, or no session exists
    #[cfg_attr(feature = "serde", serde(rename = "user_not_logged"))]
    #[error("user is not logged in")]
    UserNotLogged,

    /// The wallet is on a chain the requested currency cannot use
    #[cfg_attr(feature = "serde", serde(rename = "wallet_chain_error"))]
    #[error("wallet is connected to an unsupported chain")]
    ChainError,

    /// The WalletConnect session was opened on the wrong chain family
    #[cfg_attr(feature = "serde", serde(rename = "wallet_connect_chain_error"))]
    #[error("WalletConnect session is on the wrong chain")]
    WalletConnectChainError,
}

impl WalletError {
    /// Returns the stable string code the host sees
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::Fail => "fail",
            WalletError::NotFound => "wallet_not_found",
            WalletError::UserRejectedLogin => "user_rejected_login",
            WalletError::AddressError => "user_address_error",
            WalletError::UserNotLogged => "user_not_logged",
            WalletError::ChainError => "wallet_chain_error",
            WalletError::WalletConnectChainError => "wallet_connect_chain_error",
        }
    }

    /// Returns true if the host may simply call `enable` again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::UserRejectedLogin | WalletError::UserNotLogged | WalletError::Fail
        )
    }

    /// Returns true if the host should prompt the user to install the wallet
    pub fn needs_install(&self) -> bool {
        matches!(self, WalletError::NotFound)
    }
}

/// Convenient Result type using WalletError
pub type Result<T> = std::result::Result<T, WalletError>;

/// The full host-facing code set, success included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WalletStatus {
    /// The operation completed
    Success,
    /// The operation failed with the given code
    #[cfg_attr(feature = "serde", serde(untagged))]
    Error(WalletError),
}

impl WalletStatus {
    /// Returns the stable string code the host sees
    pub fn code(&self) -> &'static str {
        match self {
            WalletStatus::Success => "success",
            WalletStatus::Error(err) => err.code(),
        }
    }

    /// Checks if this is the success code
    pub fn is_success(&self) -> bool {
        matches!(self, WalletStatus::Success)
    }

    /// Parses a host string code
    pub fn from_code(code: &str) -> Option<Self> {
        let err = match code {
            "success" => return Some(WalletStatus::Success),
            "fail" => WalletError::Fail,
            "wallet_not_found" => WalletError::NotFound,
            "user_rejected_login" => WalletError::UserRejectedLogin,
            "user_address_error" => WalletError::AddressError,
            "user_not_logged" => WalletError::UserNotLogged,
            "wallet_chain_error" => WalletError::ChainError,
            "wallet_connect_chain_error" => WalletError::WalletConnectChainError,
            _ => return None,
        };
        Some(WalletStatus::Error(err))
    }
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<WalletError> for WalletStatus {
    fn from(err: WalletError) -> Self {
        WalletStatus::Error(err)
    }
}

impl<T> From<Result<T>> for WalletStatus {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(_) => WalletStatus::Success,
            Err(err) => WalletStatus::Error(err),
        }
    }
}
