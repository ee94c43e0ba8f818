//! Clawback of one-time commission by contract tenure.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_core::rates::ClawbackSchedule;
use tally_core::{ClawbackOutcome, InvalidInputError, Sale, SaleStatus, TallyError};

/// Split `commission` into the part the consultant keeps and the part
/// reclaimed.
///
/// Cancelled contracts keep the schedule's cancelled fraction whatever their
/// tenure. Pending contracts are treated as zero tenure. `percentage` is the
/// keep fraction applied.
pub fn calculate_clawback(
    commission: Decimal,
    months_active: Decimal,
    status: SaleStatus,
    schedule: &ClawbackSchedule,
) -> Result<ClawbackOutcome, TallyError> {
    if months_active < Decimal::ZERO {
        return Err(InvalidInputError::NegativeMonthsActive(months_active).into());
    }

    let percentage = match status {
        SaleStatus::Cancelled => schedule.cancelled_keep,
        SaleStatus::Pending => schedule.keep_fraction(Decimal::ZERO)?,
        SaleStatus::Active => schedule.keep_fraction(months_active)?,
    };
    let keep_amount = commission * percentage;

    Ok(ClawbackOutcome {
        keep_amount,
        clawback_amount: commission - keep_amount,
        percentage,
    })
}

/// Clawback for `sale` as of `as_of`, tenure taken from the sale itself.
pub fn clawback_for_sale(
    sale: &Sale,
    commission: Decimal,
    as_of: NaiveDate,
    schedule: &ClawbackSchedule,
) -> Result<ClawbackOutcome, TallyError> {
    let months = sale.months_active(as_of)?;
    calculate_clawback(commission, months, sale.status, schedule)
}
