use std::str::FromStr;

use rust_decimal::Decimal;

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹', '₩', '₽', '¢'];

/// Returns the trimmed cell text, or `None` for blank cells.
pub fn non_null(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// Coerces spreadsheet text into a money amount.
///
/// Accepts currency symbols, thousands separators and accounting-style
/// negatives such as `(12.50)`. Anything else (`N/A`, `-`, free text) is
/// missing rather than zero.
pub fn parse_amount(value: &str) -> Option<Decimal> {
    let trimmed = non_null(value)?;
    let (negative, body) = match trimmed
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
    {
        Some(inner) => (true, inner.trim()),
        None => (false, trimmed),
    };
    let cleaned = body
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' ') && !CURRENCY_SYMBOLS.contains(c))
        .collect::<String>();
    if cleaned.is_empty() {
        return None;
    }
    let parsed = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()?;
    Some(if negative { -parsed } else { parsed })
}

pub fn format_amount(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn parse_amount_accepts_plain_and_decorated_numbers() {
        assert_eq!(parse_amount("10"), Some(dec("10")));
        assert_eq!(parse_amount(" 12.50 "), Some(dec("12.50")));
        assert_eq!(parse_amount("$1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("₹ 500"), Some(dec("500")));
        assert_eq!(parse_amount("-5"), Some(dec("-5")));
        assert_eq!(parse_amount("(7.25)"), Some(dec("-7.25")));
        assert_eq!(parse_amount("1e3"), Some(dec("1000")));
    }

    #[test]
    fn parse_amount_treats_garbage_as_missing() {
        assert_eq!(parse_amount("N/A"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("$"), None);
        assert_eq!(parse_amount("-"), None);
        assert_eq!(parse_amount("ten"), None);
    }

    #[test]
    fn format_amount_uses_two_decimals() {
        assert_eq!(format_amount(dec("10")), "10.00");
        assert_eq!(format_amount(dec("3.14159")), "3.14");
    }

    #[test]
    fn non_null_trims_blank_cells() {
        assert_eq!(non_null("  Alice "), Some("Alice"));
        assert_eq!(non_null("   "), None);
    }
}
