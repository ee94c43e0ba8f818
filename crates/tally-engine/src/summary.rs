//! Portfolio overview across a consultant's sales.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tally_core::{RateSchedule, Sale, SaleStatus, TallyError};

use crate::clawback::calculate_clawback;
use crate::commission::calculate_sale_commission;
use crate::incentive::sale_points;

/// Round to cents, halves away from zero. Only applied to presented totals.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PortfolioSummary {
    /// Commission on active sales.
    pub total_earned: Decimal,
    /// Cancelled sales' reclaimed commission plus active sales' clawback.
    pub total_clawback: Decimal,
    /// Kept commission on active sales. Cancelled sales contribute nothing.
    pub net_payable: Decimal,
    /// Commission on active sales still inside their first month.
    pub pending_payout: Decimal,
    /// Kept commission on active sales past their first month.
    pub available_payout: Decimal,
    pub active_sales: usize,
    pub cancelled_sales: usize,
    pub pending_sales: usize,
    pub total_asp: Decimal,
    pub active_asp: Decimal,
}

impl PortfolioSummary {
    /// Copy with every money field rounded to cents.
    pub fn rounded(&self) -> Self {
        Self {
            total_earned: round_currency(self.total_earned),
            total_clawback: round_currency(self.total_clawback),
            net_payable: round_currency(self.net_payable),
            pending_payout: round_currency(self.pending_payout),
            available_payout: round_currency(self.available_payout),
            ..self.clone()
        }
    }
}

/// Summarize `sales` as of `as_of`. Each sale is priced with the rate book
/// in force on its sale date.
pub fn summarize_portfolio(
    sales: &[Sale],
    as_of: NaiveDate,
    schedule: &RateSchedule,
) -> Result<PortfolioSummary, TallyError> {
    let mut summary = PortfolioSummary::default();

    for sale in sales {
        let rates = schedule.for_date(sale.sale_date)?;
        let points = sale_points(&sale.items, rates)?;
        summary.total_asp += points;

        match sale.status {
            SaleStatus::Pending => summary.pending_sales += 1,
            SaleStatus::Cancelled => {
                summary.cancelled_sales += 1;
                let commission = calculate_sale_commission(sale, rates)?.total_amount();
                let months = sale.months_active(as_of)?;
                let outcome = calculate_clawback(commission, months, sale.status, &rates.clawback)?;
                summary.total_clawback += outcome.clawback_amount;
            }
            SaleStatus::Active => {
                summary.active_sales += 1;
                summary.active_asp += points;
                let commission = calculate_sale_commission(sale, rates)?.total_amount();
                let months = sale.months_active(as_of)?;
                let outcome = calculate_clawback(commission, months, sale.status, &rates.clawback)?;
                summary.total_earned += commission;
                summary.total_clawback += outcome.clawback_amount;
                summary.net_payable += outcome.keep_amount;
                if months < Decimal::ONE {
                    summary.pending_payout += commission;
                } else {
                    summary.available_payout += outcome.keep_amount;
                }
            }
        }
    }

    Ok(summary)
}
