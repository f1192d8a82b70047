//! Token amount type.
//!
//! Amounts are represented as fixed-point integers (u128) to avoid floating-point errors.
//! The smallest unit is 1 base unit; one whole token is [`TOKEN_UNIT`] base units.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of decimals of the governance token.
pub const TOKEN_DECIMALS: u32 = 18;

/// Base units in one whole token (10^18).
pub const TOKEN_UNIT: u128 = 10u128.pow(TOKEN_DECIMALS);

/// Governance token amount in base units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    /// Whole tokens, truncating any fractional part.
    pub fn whole_tokens(&self) -> u128 {
        self.0 / TOKEN_UNIT
    }

    /// Fractional part in base units.
    pub fn fraction(&self) -> u128 {
        self.0 % TOKEN_UNIT
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parse a decimal string such as `"1.5"` or `"42"` into base units.
    pub fn parse_decimal(s: &str) -> Result<Self, TypesError> {
        let invalid = || TypesError::InvalidAmount(s.to_string());
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > TOKEN_DECIMALS as usize {
            return Err(invalid());
        }
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let frac_units: u128 = if frac.is_empty() {
            0
        } else {
            let digits: u128 = frac.parse().map_err(|_| invalid())?;
            digits * 10u128.pow(TOKEN_DECIMALS - frac.len() as u32)
        };
        whole
            .checked_mul(TOKEN_UNIT)
            .and_then(|w| w.checked_add(frac_units))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl From<u128> for TokenAmount {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frac = self.fraction();
        if frac == 0 {
            write!(f, "{}", self.whole_tokens())
        } else {
            let digits = format!("{:0>18}", frac);
            write!(f, "{}.{}", self.whole_tokens(), digits.trim_end_matches('0'))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_token_is_ten_to_the_eighteen() {
        assert_eq!(TOKEN_UNIT, 1_000_000_000_000_000_000);
        assert_eq!(TokenAmount::new(TOKEN_UNIT).whole_tokens(), 1);
    }

    #[test]
    fn display_trims_fraction() {
        assert_eq!(TokenAmount::new(4 * TOKEN_UNIT).to_string(), "4");
        assert_eq!(TokenAmount::new(TOKEN_UNIT + TOKEN_UNIT / 2).to_string(), "1.5");
        assert_eq!(TokenAmount::new(1).to_string(), "0.000000000000000001");
    }

    #[test]
    fn parse_decimal_handles_fractions() {
        assert_eq!(TokenAmount::parse_decimal("1.5").unwrap().raw(), 1_500_000_000_000_000_000);
        assert_eq!(TokenAmount::parse_decimal("3").unwrap(), TokenAmount::new(3 * TOKEN_UNIT));
        assert_eq!(TokenAmount::parse_decimal(".25").unwrap().raw(), TOKEN_UNIT / 4);
        assert!(TokenAmount::parse_decimal("").is_err());
        assert!(TokenAmount::parse_decimal("1.0000000000000000001").is_err());
        assert!(TokenAmount::parse_decimal("abc").is_err());
    }

    #[test]
    fn parse_decimal_detects_overflow() {
        assert!(TokenAmount::parse_decimal(&u128::MAX.to_string()).is_err());
    }
}
