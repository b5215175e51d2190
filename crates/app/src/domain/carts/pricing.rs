//! Line pricing
//!
//! Quantities are bounded by the `INTEGER` column they are stored in and
//! totals by `NUMERIC(18, 2)`. Anything past either bound is rejected rather
//! than wrapped or rounded.

use rust_decimal::Decimal;

use crate::domain::carts::errors::RejectionReason;

pub const MAX_LINE_QUANTITY: u32 = i32::MAX.unsigned_abs();

pub const MAX_LINE_TOTAL: Decimal = Decimal::from_parts(
    // 9_999_999_999_999_999.99
    2_808_348_671,
    232_830_643,
    0,
    false,
    2,
);

/// Validates a caller-supplied quantity.
///
/// # Errors
///
/// Rejects anything below one, and anything the store cannot hold.
pub fn requested_quantity(quantity: i32) -> Result<u32, RejectionReason> {
    if quantity < 1 {
        return Err(RejectionReason::InvalidQuantity);
    }

    Ok(quantity.unsigned_abs())
}

/// Quantity after merging `added` units into a line that already holds
/// `existing`.
///
/// # Errors
///
/// Rejects a sum beyond [`MAX_LINE_QUANTITY`].
pub fn merged_quantity(existing: u32, added: u32) -> Result<u32, RejectionReason> {
    existing
        .checked_add(added)
        .filter(|quantity| *quantity <= MAX_LINE_QUANTITY)
        .ok_or(RejectionReason::QuantityOutOfRange)
}

/// `quantity * unit_price`, exact to the cent.
///
/// # Errors
///
/// Rejects a total that overflows or exceeds [`MAX_LINE_TOTAL`].
pub fn line_total(quantity: u32, unit_price: Decimal) -> Result<Decimal, RejectionReason> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .filter(|total| *total <= MAX_LINE_TOTAL)
        .ok_or(RejectionReason::QuantityOutOfRange)
}
