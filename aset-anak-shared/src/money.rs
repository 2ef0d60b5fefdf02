//! Display formatting for amounts and weights (`ms-MY` style grouping).
//! Formatting never feeds back into stored values.

use rust_decimal::{Decimal, RoundingStrategy};

pub const CURRENCY_PREFIX: &str = "RM";

/// `1234.5` → `"1,234.50"`.
pub fn format_amount(amount: Decimal) -> String {
    format_grouped(amount, 2)
}

/// `1234.5` → `"RM 1,234.50"`.
pub fn format_ringgit(amount: Decimal) -> String {
    format!("{} {}", CURRENCY_PREFIX, format_amount(amount))
}

/// `2.5` → `"2.500 g"`.
pub fn format_weight(grams: Decimal) -> String {
    format!("{} g", format_grouped(grams, 3))
}

fn format_grouped(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.*}", dp as usize, rounded.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(text.len() + int_part.len() / 3 + 1);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        grouped.push('-');
    }
    let digits = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn groups_thousands_with_two_decimals() {
        assert_eq!(format_amount(d("0")), "0.00");
        assert_eq!(format_amount(d("500")), "500.00");
        assert_eq!(format_amount(d("1234.5")), "1,234.50");
        assert_eq!(format_amount(d("1234567.891")), "1,234,567.89");
        assert_eq!(format_amount(d("100000")), "100,000.00");
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(format_amount(d("0.005")), "0.01");
        assert_eq!(format_amount(d("2.345")), "2.35");
        assert_eq!(format_amount(d("999.995")), "1,000.00");
    }

    #[test]
    fn ringgit_and_weight_labels() {
        assert_eq!(format_ringgit(d("500")), "RM 500.00");
        assert_eq!(format_weight(d("2.5")), "2.500 g");
        assert_eq!(format_weight(d("1000.0004")), "1,000.000 g");
    }
}
