//! Account address type with `0x` prefix.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An account address: `0x` followed by 1 to 40 hex digits.
///
/// Addresses identify participants, the session owner, proposal executors and
/// the engine's own custody account on the token ledger. Construction
/// normalises to lowercase and zero-pads to the full 40 digits, so `0xB0B`
/// and `0x0…0b0b` are the same account.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// The standard prefix for all addresses.
    pub const PREFIX: &'static str = "0x";

    /// Maximum number of hex digits after the prefix.
    pub const MAX_DIGITS: usize = 40;

    /// Create a new address from a raw string.
    ///
    /// # Panics
    /// Panics if the string is not a well-formed address. Use [`Address::parse`]
    /// for untrusted input.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(Self::well_formed(&s), "address must be 0x followed by hex digits");
        Self::canonical(&s)
    }

    /// Parse an address, rejecting malformed input.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        if Self::well_formed(raw) {
            Ok(Self::canonical(raw))
        } else {
            Err(TypesError::InvalidAddress(raw.to_string()))
        }
    }

    /// The all-zero address. Never a valid mint or transfer target.
    pub fn zero() -> Self {
        Self(format!("0x{}", "0".repeat(Self::MAX_DIGITS)))
    }

    /// Build an address from a number, zero-padded to full width.
    pub fn from_index(n: u64) -> Self {
        Self(format!("0x{:0>40x}", n))
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0[Self::PREFIX.len()..].bytes().all(|b| b == b'0')
    }

    fn canonical(s: &str) -> Self {
        let digits = &s[Self::PREFIX.len()..];
        Self(format!("0x{:0>40}", digits.to_ascii_lowercase()))
    }

    fn well_formed(s: &str) -> bool {
        match s.strip_prefix(Self::PREFIX) {
            Some(digits) => {
                !digits.is_empty()
                    && digits.len() <= Self::MAX_DIGITS
                    && digits.bytes().all(|b| b.is_ascii_hexdigit())
            }
            None => false,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_short_and_full_width() {
        assert!(Address::parse("0xa11ce").is_ok());
        assert!(Address::parse(&format!("0x{}", "f".repeat(40))).is_ok());
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(Address::parse("a11ce").is_err());
        assert!(Address::parse("0x").is_err());
        assert!(Address::parse("0xzz").is_err());
        assert!(Address::parse(&format!("0x{}", "1".repeat(41))).is_err());
    }

    #[test]
    fn addresses_compare_case_insensitively() {
        assert_eq!(Address::new("0xABCDEF"), Address::new("0xabcdef"));
    }

    #[test]
    fn short_form_is_padded() {
        assert_eq!(Address::new("0x1"), Address::from_index(1));
        assert_eq!(Address::new("0xb0b").as_str().len(), 42);
        assert_eq!(Address::new("0xc0de").to_string(), Address::from_index(0xc0de).to_string());
    }

    #[test]
    fn zero_address_is_zero() {
        assert!(Address::zero().is_zero());
        assert!(!Address::from_index(1).is_zero());
    }

    #[test]
    fn serde_rejects_malformed_address() {
        let ok: Result<Address, _> = serde_json::from_str("\"0xb0b\"");
        assert_eq!(ok.unwrap(), Address::new("0xb0b"));
        let bad: Result<Address, _> = serde_json::from_str("\"bob\"");
        assert!(bad.is_err());
    }
}
