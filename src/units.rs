//! Native amount parsing and formatting.

use thiserror::Error;

/// Decimal places of the native unit.
pub const NATIVE_DECIMALS: u32 = 9;

/// Smallest units per native unit.
pub const UNITS_PER_NATIVE: u64 = 10u64.pow(NATIVE_DECIMALS);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("'{0}' is not a decimal amount")]
    Invalid(String),

    #[error("at most {max} decimal places are supported", max = NATIVE_DECIMALS)]
    TooPrecise,

    #[error("amount is too large")]
    Overflow,
}

/// Parse "0.001" style native amounts into smallest units.
pub fn parse_native_amount(input: &str) -> Result<u64, AmountError> {
    let input = input.trim();
    let invalid = || AmountError::Invalid(input.to_string());

    let (whole, frac) = match input.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (input, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > NATIVE_DECIMALS as usize {
        return Err(AmountError::TooPrecise);
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| AmountError::Overflow)?
    };
    let frac_units: u64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = NATIVE_DECIMALS as usize);
        padded.parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(UNITS_PER_NATIVE)
        .and_then(|units| units.checked_add(frac_units))
        .ok_or(AmountError::Overflow)
}

/// Render smallest units as a native decimal without trailing zeros.
pub fn format_native(units: u64) -> String {
    let whole = units / UNITS_PER_NATIVE;
    let frac = units % UNITS_PER_NATIVE;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = NATIVE_DECIMALS as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
