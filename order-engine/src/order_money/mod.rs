//! Money calculation utilities using rust_decimal for precision
//!
//! All calculations are done using `Decimal` internally, then converted to `f64`
//! for storage, spreadsheet cells and serialization.

use crate::core::{ValidationErrors, ValidationIssue};
use rust_decimal::prelude::*;
use shared::models::OrderLine;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal for calculation
///
/// Inputs are validated with [`validate_lines`] first. A NaN/Infinity that
/// still gets here is logged and treated as zero.
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(
            value = ?value,
            "Non-finite f64 in monetary calculation, defaulting to zero"
        );
        Decimal::ZERO
    })
}

/// Convert Decimal back to f64, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    round_money(value).to_f64().unwrap_or_default()
}

#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Effective price × quantity, rounded
pub fn calculate_line_total(line: &OrderLine) -> Decimal {
    round_money(to_decimal(line.effective_price()) * to_decimal(line.quantity))
}

/// Sum of rounded line totals
pub fn calculate_order_total(lines: &[OrderLine]) -> Decimal {
    lines.iter().map(calculate_line_total).sum()
}

/// Quantities must be finite and positive, prices finite and non-negative
///
/// Line numbers in the issues are 1-based.
pub fn validate_lines(lines: &[OrderLine]) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        if !line.quantity.is_finite() || line.quantity <= 0.0 {
            errors.push(ValidationIssue::InvalidQuantity {
                line: line_no,
                value: line.quantity,
            });
        }
        let bad_price = std::iter::once(line.unit_price)
            .chain(line.override_price)
            .find(|p| !p.is_finite() || *p < 0.0);
        if let Some(bad) = bad_price {
            errors.push(ValidationIssue::InvalidPrice {
                line: line_no,
                value: bad,
            });
        }
    }
    errors
}
