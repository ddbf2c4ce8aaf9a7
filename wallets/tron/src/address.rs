//! Base58check Tron addresses

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Version byte of mainnet addresses
pub const TRON_ADDRESS_PREFIX: u8 = 0x41;

const DECODED_LEN: usize = 25;

/// Why a string is not a Tron address
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TronAddressError {
    /// Characters outside the base58 alphabet
    #[error("Not base58: {0}")]
    Encoding(String),
    /// Wrong decoded length
    #[error("Expected {DECODED_LEN} bytes, got {0}")]
    Length(usize),
    /// Not a mainnet address
    #[error("Unexpected version byte {0:#04x}")]
    Prefix(u8),
    /// Mistyped address
    #[error("Checksum mismatch")]
    Checksum,
}

/// Checks the base58 form, version byte and double-SHA256 checksum
pub fn validate_address(address: &str) -> Result<(), TronAddressError> {
    let decoded = bs58::decode(address)
        .into_vec()
        .map_err(|e| TronAddressError::Encoding(e.to_string()))?;

    if decoded.len() != DECODED_LEN {
        return Err(TronAddressError::Length(decoded.len()));
    }
    if decoded[0] != TRON_ADDRESS_PREFIX {
        return Err(TronAddressError::Prefix(decoded[0]));
    }

    let (payload, checksum) = decoded.split_at(21);
    let hash = Sha256::digest(Sha256::digest(payload));
    if &hash[..4] != checksum {
        return Err(TronAddressError::Checksum);
    }
    Ok(())
}

/// Checks if `address` is a well-formed Tron address
pub fn is_valid_address(address: &str) -> bool {
    validate_address(address).is_ok()
}
