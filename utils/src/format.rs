//! Amount formatting helpers.

use qvote_types::TokenAmount;

/// Format base units as a decimal token amount with its symbol.
pub fn format_tokens(raw: u128, symbol: &str) -> String {
    format!("{} {}", TokenAmount::new(raw), symbol)
}

/// Format an integer with `_` every three digits: `1200000` → `1_200_000`.
pub fn group_digits(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('_');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use qvote_types::TOKEN_UNIT;

    #[test]
    fn tokens_use_decimal_display() {
        assert_eq!(format_tokens(3 * TOKEN_UNIT, "STK"), "3 STK");
        assert_eq!(format_tokens(TOKEN_UNIT / 2, "STK"), "0.5 STK");
    }

    #[test]
    fn digits_are_grouped() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1_000), "1_000");
        assert_eq!(group_digits(1_200_000), "1_200_000");
    }
}
