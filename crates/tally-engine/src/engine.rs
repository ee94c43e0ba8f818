//! [`CommissionEngine`]: the calculators bound to a rate schedule.
//!
//! Every call picks the rate book in force on the sale's date, so a sale is
//! always priced under the rules that applied when it was made. Errors are
//! logged here with full detail; callers show users
//! [`TallyError::public_message`] only.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tally_core::rates::RewardOption;
use tally_core::store::{SaleStore, TeamDirectory};
use tally_core::{
    ClawbackOutcome, ConsultantId, FidelityLedgerEntry, Period, RateBook, RateSchedule, Rank, Sale,
    SaleStatus, SponsorChain, StorageError, TallyError,
};
use tracing::{debug, error, info, warn};

use crate::clawback::calculate_clawback;
use crate::commission::{calculate_sale_commission, SaleCommission};
use crate::fidelity;
use crate::incentive::{self, IncentiveLedger, LedgerUpdate, QuickStartStatus};
use crate::summary::{self, PortfolioSummary};
use crate::upline::{distribute_sale_commission, totals_by_level, ItemUplinePayouts, LevelTotal};

/// Everything owed on a sale as of a given date.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SaleSettlement {
    pub sale_id: String,
    pub consultant: ConsultantId,
    pub status: SaleStatus,
    pub rate_version: String,
    pub as_of: NaiveDate,
    pub months_active: Decimal,
    pub commission: SaleCommission,
    pub clawback: ClawbackOutcome,
    /// Distributed from the commission before clawback.
    pub upline: Vec<ItemUplinePayouts>,
    pub upline_totals: Vec<LevelTotal>,
}

#[derive(Debug, Clone, Default)]
pub struct CommissionEngine {
    schedule: RateSchedule,
}

fn logged<T>(subject: &str, result: Result<T, TallyError>) -> Result<T, TallyError> {
    match &result {
        Err(TallyError::Configuration(e)) => error!(subject, error = %e, "rate configuration error"),
        Err(e) => warn!(subject, error = %e, "calculation rejected"),
        Ok(_) => {}
    }
    result
}

impl CommissionEngine {
    pub fn new(schedule: RateSchedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &RateSchedule {
        &self.schedule
    }

    /// Rate book in force on `date`.
    pub fn rates_on(&self, date: NaiveDate) -> Result<&RateBook, TallyError> {
        Ok(self.schedule.for_date(date)?)
    }

    pub fn commission(&self, sale: &Sale) -> Result<SaleCommission, TallyError> {
        logged(&sale.id, self.commission_inner(sale))
    }

    fn commission_inner(&self, sale: &Sale) -> Result<SaleCommission, TallyError> {
        let rates = self.rates_on(sale.sale_date)?;
        Ok(calculate_sale_commission(sale, rates)?)
    }

    /// Commission, clawback and upline payouts for `sale` as of `as_of`.
    pub fn settle(
        &self,
        sale: &Sale,
        chain: &SponsorChain,
        as_of: NaiveDate,
    ) -> Result<SaleSettlement, TallyError> {
        logged(&sale.id, self.settle_inner(sale, chain, as_of))
    }

    fn settle_inner(
        &self,
        sale: &Sale,
        chain: &SponsorChain,
        as_of: NaiveDate,
    ) -> Result<SaleSettlement, TallyError> {
        let rates = self.rates_on(sale.sale_date)?;
        let commission = calculate_sale_commission(sale, rates)?;
        let months_active = sale.months_active(as_of)?;
        let clawback = calculate_clawback(
            commission.total_amount(),
            months_active,
            sale.status,
            &rates.clawback,
        )?;
        let upline = distribute_sale_commission(&commission, chain, rates)?;
        let upline_totals = totals_by_level(&upline);

        debug!(
            sale = %sale.id,
            version = %rates.version,
            commission = %commission.total_amount(),
            keep = %clawback.keep_amount,
            sponsors = chain.len(),
            "settled sale"
        );

        Ok(SaleSettlement {
            sale_id: sale.id.clone(),
            consultant: sale.consultant.clone(),
            status: sale.status,
            rate_version: rates.version.clone(),
            as_of,
            months_active,
            commission,
            clawback,
            upline,
            upline_totals,
        })
    }

    pub fn fidelity_for_month(
        &self,
        sale: &Sale,
        chain: &SponsorChain,
        period: Period,
    ) -> Result<Vec<FidelityLedgerEntry>, TallyError> {
        logged(
            &sale.id,
            self.rates_on(sale.sale_date)
                .and_then(|rates| fidelity::fidelity_for_month(sale, chain, period, rates)),
        )
    }

    pub fn accrued_fidelity(&self, sale: &Sale, through: Period) -> Result<Decimal, TallyError> {
        logged(
            &sale.id,
            self.rates_on(sale.sale_date)
                .and_then(|rates| fidelity::accrued_fidelity(sale, through, rates)),
        )
    }

    /// Add the sale's ASP points to `ledger`.
    pub fn record_sale(
        &self,
        ledger: &IncentiveLedger,
        sale: &Sale,
    ) -> Result<LedgerUpdate, TallyError> {
        logged(
            &sale.id,
            self.rates_on(sale.sale_date)
                .and_then(|rates| Ok(ledger.record_sale(sale, rates)?)),
        )
    }

    /// Rebuild a ledger from a consultant's sales. Pending sales earn no
    /// points yet; cancelled ones keep theirs.
    pub fn ledger_for(
        &self,
        consultant: &ConsultantId,
        sales: &[Sale],
    ) -> Result<IncentiveLedger, TallyError> {
        let mut ledger = IncentiveLedger::new(consultant.clone());
        for sale in sales
            .iter()
            .filter(|s| &s.consultant == consultant && s.status != SaleStatus::Pending)
        {
            ledger = self.record_sale(&ledger, sale)?.ledger;
        }
        Ok(ledger)
    }

    /// Credit quick start quarter points under the book in force on `on`.
    pub fn award_quarter(
        &self,
        ledger: &IncentiveLedger,
        quarter: u8,
        on: NaiveDate,
    ) -> Result<LedgerUpdate, TallyError> {
        logged(
            "point-award",
            self.rates_on(on)
                .and_then(|rates| Ok(ledger.award_quarter(quarter, rates)?)),
        )
    }

    /// Credit promotion points under the book in force on `on`.
    pub fn award_promotion(
        &self,
        ledger: &IncentiveLedger,
        level: u8,
        on: NaiveDate,
    ) -> Result<LedgerUpdate, TallyError> {
        logged(
            "point-award",
            self.rates_on(on)
                .and_then(|rates| Ok(ledger.award_promotion(level, rates)?)),
        )
    }

    /// Reward options at `tier` under the current rate book.
    pub fn rewards_for(&self, tier: &str, rank: Rank) -> Result<Vec<RewardOption>, TallyError> {
        logged(
            tier,
            incentive::rewards_for(tier, rank, self.schedule.latest()).map_err(Into::into),
        )
    }

    pub fn quick_start(
        &self,
        start_date: NaiveDate,
        sales: &[Sale],
    ) -> Result<QuickStartStatus, TallyError> {
        logged(
            "quick-start",
            incentive::evaluate_quick_start(start_date, sales, &self.schedule).map_err(Into::into),
        )
    }

    pub fn summarize(&self, sales: &[Sale], as_of: NaiveDate) -> Result<PortfolioSummary, TallyError> {
        logged(
            "portfolio",
            summary::summarize_portfolio(sales, as_of, &self.schedule),
        )
    }

    // -----------------------------------------------------------------------
    // Store-backed operations
    // -----------------------------------------------------------------------

    fn load_sale(store: &dyn SaleStore, sale_id: &str) -> Result<Sale, TallyError> {
        store
            .get_sale(sale_id)?
            .ok_or_else(|| StorageError::SaleNotFound(sale_id.to_string()).into())
    }

    /// Settle a stored sale against the seller's current sponsor chain.
    pub fn settle_stored(
        &self,
        store: &dyn SaleStore,
        directory: &dyn TeamDirectory,
        sale_id: &str,
        as_of: NaiveDate,
    ) -> Result<SaleSettlement, TallyError> {
        let sale = Self::load_sale(store, sale_id)?;
        let chain = directory.sponsor_chain(&sale.consultant)?;
        self.settle(&sale, &chain, as_of)
    }

    /// Cancel a stored sale. Fails with a version conflict if the record
    /// changed since it was read.
    pub fn cancel_stored(
        &self,
        store: &dyn SaleStore,
        sale_id: &str,
        on: NaiveDate,
    ) -> Result<Sale, TallyError> {
        let cancelled = Self::load_sale(store, sale_id)?.cancel(on)?;
        logged(sale_id, store.save_sale(&cancelled))?;
        info!(sale = sale_id, %on, "sale cancelled");
        Ok(cancelled)
    }

    pub fn reactivate_stored(&self, store: &dyn SaleStore, sale_id: &str) -> Result<Sale, TallyError> {
        let reactivated = Self::load_sale(store, sale_id)?.reactivate()?;
        logged(sale_id, store.save_sale(&reactivated))?;
        info!(sale = sale_id, "sale reactivated");
        Ok(reactivated)
    }

    pub fn activate_stored(
        &self,
        store: &dyn SaleStore,
        sale_id: &str,
        on: NaiveDate,
    ) -> Result<Sale, TallyError> {
        let activated = Self::load_sale(store, sale_id)?.activate(on)?;
        logged(sale_id, store.save_sale(&activated))?;
        info!(sale = sale_id, %on, "sale activated");
        Ok(activated)
    }
}
