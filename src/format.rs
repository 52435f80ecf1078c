//! Human-readable rendering of prices and premiums.
//!
//! Presentation only. Values are converted to `Decimal` so rounding is
//! half away from zero and never shows binary float artifacts.

use rust_decimal::{Decimal, RoundingStrategy};

/// Shown in place of a premium or price that could not be computed.
pub const NEUTRAL_DASH: &str = "-";

fn to_decimal(value: f64, dp: u32) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero))
}

fn group_int_digits(int_part: &str) -> String {
    // Insert commas every 3 digits, preserving any leading zeros.
    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3);
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        out.push(ch);
        let remaining = len.saturating_sub(i + 1);
        if remaining > 0 && remaining % 3 == 0 {
            out.push(',');
        }
    }
    out
}

fn pad_fraction_to_dp(s: &str, dp: u32) -> String {
    if dp == 0 {
        return s
            .split_once('.')
            .map(|(i, _)| i.to_string())
            .unwrap_or_else(|| s.to_string());
    }

    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));

    let mut out = String::with_capacity(int_part.len() + 1 + dp as usize);
    out.push_str(int_part);
    out.push('.');
    out.extend(frac_part.chars().chain(std::iter::repeat('0')).take(dp as usize));
    out
}

fn group_number_string(s: &str) -> String {
    match s.split_once('.') {
        Some((int_part, frac)) => format!("{}.{frac}", group_int_digits(int_part)),
        None => group_int_digits(s),
    }
}

/// Format an amount with a currency symbol, fixed decimals and optional
/// thousands separators. Sign precedes the symbol (`-$1,234.50`).
pub fn format_amount(value: f64, symbol: &str, dp: u32, grouping: bool) -> String {
    let Some(rounded) = to_decimal(value, dp) else {
        return NEUTRAL_DASH.to_string();
    };

    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let mut s = pad_fraction_to_dp(&rounded.abs().normalize().to_string(), dp);
    if grouping {
        s = group_number_string(&s);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(symbol);
    out.push_str(&s);
    out
}

/// KRW price, whole won, always grouped. Unknown prices render as a dash.
pub fn format_krw(value: f64) -> String {
    if value <= 0.0 {
        return NEUTRAL_DASH.to_string();
    }
    format_amount(value, "₩", 0, true)
}

/// USD price. Sub-dollar prices get at least four decimals so small caps
/// stay readable. Unknown prices render as a dash.
pub fn format_usd(value: f64, dp: u32, grouping: bool) -> String {
    if value <= 0.0 {
        return NEUTRAL_DASH.to_string();
    }
    let dp = if value < 1.0 { dp.max(4) } else { dp };
    format_amount(value, "$", dp, grouping)
}

/// Signed percentage: `+7.14%`, `-0.52%`, `0.00%`.
pub fn format_percent(value: f64, dp: u32) -> String {
    let Some(rounded) = to_decimal(value, dp) else {
        return NEUTRAL_DASH.to_string();
    };
    let body = pad_fraction_to_dp(&rounded.abs().normalize().to_string(), dp);
    let sign = if rounded.is_zero() {
        ""
    } else if rounded.is_sign_negative() {
        "-"
    } else {
        "+"
    };
    format!("{sign}{body}%")
}

/// Premium cell: a dash when either operand was missing, otherwise a signed
/// percentage.
pub fn format_premium(value: f64, available: bool, dp: u32) -> String {
    if available {
        format_percent(value, dp)
    } else {
        NEUTRAL_DASH.to_string()
    }
}
