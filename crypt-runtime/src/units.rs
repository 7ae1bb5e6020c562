//! Human decimal amounts <-> raw integer units of an asset with `decimals`
//! fractional digits.

use std::str::FromStr;

use alloy_primitives::U256;
use rust_decimal::Decimal;

use crate::error::{CryptError, CryptResult, arithmetic_err};

/// `1.5` with 18 decimals becomes `1_500_000_000_000_000_000`. Digits beyond
/// `decimals` are truncated.
pub fn parse_units(amount: &Decimal, decimals: u32) -> CryptResult<U256> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(CryptError::Config(format!("negative amount {amount}")));
    }
    let text = amount.normalize().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let frac: String = frac_part
        .chars()
        .chain(std::iter::repeat('0'))
        .take(decimals as usize)
        .collect();
    let digits = format!("{int_part}{frac}");
    U256::from_str_radix(&digits, 10)
        .map_err(|e| arithmetic_err(format!("{amount} -> raw units: {e}")))
}

/// Inverse of [`parse_units`]. Fails when the value has more significant
/// digits than `Decimal` can hold.
pub fn format_units(raw: U256, decimals: u32) -> CryptResult<Decimal> {
    let digits = raw.to_string();
    let width = decimals as usize;
    let padded = format!("{digits:0>width$}", width = width + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - width);
    let text = if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    };
    Decimal::from_str(&text)
        .map(|d| d.normalize())
        .map_err(|e| arithmetic_err(format!("{raw} -> decimal: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    #[test]
    fn test_parse_whole_and_fractional() {
        assert_eq!(parse_units(&Decimal::new(100, 0), 18).unwrap(), ether(100));
        assert_eq!(parse_units(&Decimal::new(15, 1), 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(parse_units(&Decimal::new(1, 7), 6).unwrap(), U256::ZERO);
        assert_eq!(parse_units(&Decimal::new(2, 0), 0).unwrap(), U256::from(2u64));
    }

    #[test]
    fn test_parse_rejects_negative() {
        let err = parse_units(&Decimal::new(-1, 0), 18).unwrap_err();
        assert_eq!(err.reason(), "invalid config");
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(1_500_000u64), 6).unwrap(), Decimal::new(15, 1));
        assert_eq!(format_units(U256::from(5u64), 6).unwrap(), Decimal::new(5, 6));
        assert_eq!(format_units(U256::from(7u64), 0).unwrap(), Decimal::new(7, 0));
        let withdrawn = U256::from(99_900u64) * U256::from(10u64).pow(U256::from(15u64));
        assert_eq!(format_units(withdrawn, 18).unwrap(), Decimal::new(999, 1));
    }
}
