//! Canonical decimal rounding for prices and sizes
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Published values carry at most [`WIRE_SCALE`] fractional digits with
//! trailing zeros stripped, so `12.50000000` goes out as `12.5` and
//! `1.00000000` as `1`.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Maximum fractional digits on any published price or size.
pub const WIRE_SCALE: u32 = 8;

/// Round a value to the canonical wire form.
///
/// Rounds half away from zero at 8 fractional digits, then strips
/// trailing zeros.
pub fn round_canonical(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(WIRE_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Parse a raw decimal string from the feed.
///
/// Falls back to scientific notation ("1e-8"), which some exchanges emit
/// for dust-sized levels. Returns None for anything unparseable.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}
