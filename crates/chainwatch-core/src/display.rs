//! Formatting helpers for UI frontends.

use crate::types::{Amount, Balance, ChainInfo};

/// Fractional digits shown for amounts below the abbreviation thresholds.
const FRACTION_DIGITS: u32 = 4;

/// Format a raw amount with the token's decimals and symbol.
///
/// Large values are abbreviated (`1.2m DOT`, `45k DOT`); smaller ones keep
/// four fractional digits. Any `decimals` value is accepted.
pub fn format_amount(amount: Amount, decimals: u8, symbol: &str) -> String {
    let decimals = u32::from(decimals);
    // Past 10^38 no u128 amount reaches one whole unit.
    let (whole, rem) = match 10u128.checked_pow(decimals) {
        Some(divisor) => (amount / divisor, amount % divisor),
        None => (0, amount),
    };

    if whole >= 1_000_000 {
        let m = whole as f64 / 1_000_000.0;
        format!("{:.1}m {}", m, symbol)
    } else if whole >= 10_000 {
        let k = whole as f64 / 1_000.0;
        format!("{:.0}k {}", k, symbol)
    } else {
        let frac = if decimals >= FRACTION_DIGITS {
            10u128
                .checked_pow(decimals - FRACTION_DIGITS)
                .map_or(0, |scale| rem / scale)
        } else {
            rem * 10u128.pow(FRACTION_DIGITS - decimals)
        };
        format!("{}.{:04} {}", whole, frac, symbol)
    }
}

/// One-line summary of a balance in the chain's native token.
pub fn format_balance(balance: &Balance, chain: &ChainInfo) -> String {
    let fmt = |amount| format_amount(amount, chain.token_decimals, &chain.token_symbol);
    format!(
        "{} (free {}, reserved {})",
        fmt(balance.total()),
        fmt(balance.free()),
        fmt(balance.reserved())
    )
}
