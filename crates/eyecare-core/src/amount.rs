//! Money limits matching the `NUMERIC` columns: prices are `(14, 2)` and
//! movement totals `(18, 2)`.

use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};

pub const AMOUNT_SCALE: u32 = 2;

/// Largest unit price or catalog amount: 999 999 999 999.99.
pub fn max_price() -> Decimal {
    Decimal::new(99_999_999_999_999, AMOUNT_SCALE)
}

/// Largest movement total: 9 999 999 999 999 999.99.
pub fn max_total_value() -> Decimal {
    Decimal::new(999_999_999_999_999_999, AMOUNT_SCALE)
}

/// Accepts a non-negative amount with at most two decimal places that fits
/// the price columns. Trailing zeros do not count as decimal places.
pub fn checked_price(field: &'static str, amount: Decimal) -> LedgerResult<Decimal> {
    if amount < Decimal::ZERO {
        return Err(LedgerError::validation(
            field,
            format!("{field} must be non-negative"),
        ));
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(LedgerError::validation(
            field,
            format!("{field} must have at most {AMOUNT_SCALE} decimal places"),
        ));
    }
    if amount > max_price() {
        return Err(LedgerError::validation(
            field,
            format!("{field} must not exceed {}", max_price()),
        ));
    }
    Ok(amount)
}

/// `unit_price * |quantity|`, refused when it does not fit a movement total.
pub fn line_total(unit_price: Decimal, quantity: i64) -> LedgerResult<Decimal> {
    unit_price
        .checked_mul(Decimal::from(quantity.unsigned_abs()))
        .filter(|total| *total <= max_total_value())
        .ok_or_else(|| {
            LedgerError::validation(
                "unit_price",
                format!("unit_price times quantity must not exceed {}", max_total_value()),
            )
        })
}
