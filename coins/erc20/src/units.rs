//! Decimal amount <-> base unit conversion

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::U256;

use crate::Erc20Error;

/// Decimals of ETH, BNB and most ERC20 tokens
pub const ETHER_DECIMALS: u8 = 18;

/// Renders a host amount the way it is typed, without exponent notation
pub fn amount_to_string(amount: f64) -> Result<String, Erc20Error> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Erc20Error::InvalidAmount(amount.to_string()));
    }
    Ok(amount.to_string())
}

/// Splits a plain decimal string into integer and fraction digits
fn split_decimal(amount: &str) -> Result<(&str, &str), Erc20Error> {
    let invalid = || Erc20Error::InvalidAmount(amount.to_string());
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() || !digits(int_part) || !digits(frac_part) {
        return Err(invalid());
    }
    Ok((int_part, frac_part))
}

/// Number of digits in the integer part, e.g. 3 for "123.4" and 1 for "0.5"
pub fn integer_digits(amount: &str) -> Result<usize, Erc20Error> {
    split_decimal(amount).map(|(int_part, _)| int_part.len())
}

/// Scales a decimal amount by `10^decimals`.
///
/// Fraction digits beyond `decimals` are dropped.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256, Erc20Error> {
    let (int_part, frac_part) = split_decimal(amount)?;
    let keep = frac_part.len().min(decimals as usize);
    let normalized = if keep == 0 {
        int_part.to_string()
    } else {
        format!("{int_part}.{}", &frac_part[..keep])
    };
    let parsed = parse_units(&normalized, decimals).map_err(|e| Erc20Error::Units(e.to_string()))?;
    Ok(parsed.get_absolute())
}

/// Converts base units to a decimal number with `decimals` places
pub fn from_base_units(value: U256, decimals: u8) -> Result<f64, Erc20Error> {
    let formatted = format_units(value, decimals).map_err(|e| Erc20Error::Units(e.to_string()))?;
    formatted
        .parse::<f64>()
        .map_err(|e| Erc20Error::Units(e.to_string()))
}

/// Parses a hex quantity (`0x...`) as returned by JSON-RPC
pub fn parse_quantity(raw: &str) -> Result<U256, Erc20Error> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| Erc20Error::Decode(format!("not a hex quantity: {raw}")))?;
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).map_err(|e| Erc20Error::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_to_string() {
        assert_eq!(amount_to_string(5.0).unwrap(), "5");
        assert_eq!(amount_to_string(123.4).unwrap(), "123.4");
        assert_eq!(amount_to_string(0.1).unwrap(), "0.1");
        assert!(amount_to_string(-1.0).is_err());
        assert!(amount_to_string(f64::NAN).is_err());
    }

    #[test]
    fn test_integer_digits() {
        assert_eq!(integer_digits("5").unwrap(), 1);
        assert_eq!(integer_digits("123.4").unwrap(), 3);
        assert_eq!(integer_digits("0.25").unwrap(), 1);
        assert!(integer_digits(".5").is_err());
        assert!(integer_digits("1e5").is_err());
    }

    #[test]
    fn test_to_base_units() {
        assert_eq!(
            to_base_units("1", 18).unwrap(),
            U256::from(1_000_000_000_000_000_000u128)
        );
        assert_eq!(to_base_units("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(to_base_units("0.1", 18).unwrap(), U256::from(100_000_000_000_000_000u128));
    }

    #[test]
    fn test_to_base_units_truncates_extra_fraction() {
        assert_eq!(to_base_units("1.2345678", 6).unwrap(), U256::from(1_234_567u64));
        assert_eq!(to_base_units("7.9", 0).unwrap(), U256::from(7u64));
    }

    #[test]
    fn test_to_base_units_rejects_garbage() {
        assert!(to_base_units("-1", 18).is_err());
        assert!(to_base_units("abc", 18).is_err());
        assert!(to_base_units("", 18).is_err());
    }

    #[test]
    fn test_from_base_units() {
        assert_eq!(from_base_units(U256::from(1_500_000u64), 6).unwrap(), 1.5);
        assert_eq!(from_base_units(U256::ZERO, 18).unwrap(), 0.0);
        assert_eq!(
            from_base_units(U256::from(2_000_000_000_000_000_000u128), 18).unwrap(),
            2.0
        );
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), U256::ZERO);
        assert_eq!(parse_quantity("0xde0b6b3a7640000").unwrap(), U256::from(10u64.pow(18)));
        assert!(parse_quantity("123").is_err());
    }
}
