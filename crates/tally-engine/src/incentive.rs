//! ASP incentive points, the tier ladder and the Personal Quick Start.
//!
//! Points only ever grow. Choosing a reward is bookkeeping outside the
//! ledger; it never reduces `total_points`.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tally_core::rates::{IncentiveTier, RewardOption};
use tally_core::{
    ConfigurationError, ConsultantId, RateBook, RateSchedule, Rank, Sale, SaleItem, SaleStatus,
};
use tracing::info;

// ---------------------------------------------------------------------------
// Points
// ---------------------------------------------------------------------------

pub fn item_points(item: &SaleItem, rates: &RateBook) -> Result<Decimal, ConfigurationError> {
    rates.asp_rate(item.product_type, &item.product)
}

/// Points for a set of items. Fails as a whole if any item has no rate.
pub fn sale_points(items: &[SaleItem], rates: &RateBook) -> Result<Decimal, ConfigurationError> {
    items.iter().map(|item| item_points(item, rates)).sum()
}

/// Tiers whose threshold `points` has reached, ascending.
pub fn unlocked_tiers(points: Decimal, tiers: &[IncentiveTier]) -> Vec<&IncentiveTier> {
    tiers.iter().filter(|t| points >= t.threshold).collect()
}

/// Reward options at `tier` for a consultant of `rank`.
pub fn rewards_for(
    tier: &str,
    rank: Rank,
    rates: &RateBook,
) -> Result<Vec<RewardOption>, ConfigurationError> {
    rates.rewards(tier, rank).map(<[RewardOption]>::to_vec)
}

// ---------------------------------------------------------------------------
// IncentiveLedger
// ---------------------------------------------------------------------------

/// Running ASP total for one consultant.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct IncentiveLedger {
    pub consultant: ConsultantId,
    pub total_points: Decimal,
}

/// Result of adding points to a ledger.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LedgerUpdate {
    pub ledger: IncentiveLedger,
    pub points_added: Decimal,
    /// Tiers crossed by this update, ascending.
    pub newly_unlocked: Vec<String>,
}

impl IncentiveLedger {
    pub fn new(consultant: ConsultantId) -> Self {
        Self::with_points(consultant, Decimal::ZERO)
    }

    pub fn with_points(consultant: ConsultantId, total_points: Decimal) -> Self {
        Self {
            consultant,
            total_points,
        }
    }

    /// Add `points` and report tiers crossed. Negative amounts are ignored so
    /// the total never decreases.
    pub fn add_points(&self, points: Decimal, tiers: &[IncentiveTier]) -> LedgerUpdate {
        let points_added = points.max(Decimal::ZERO);
        let total_points = self.total_points + points_added;
        let newly_unlocked: Vec<String> = tiers
            .iter()
            .filter(|t| self.total_points < t.threshold && total_points >= t.threshold)
            .map(|t| t.name.clone())
            .collect();

        if !newly_unlocked.is_empty() {
            info!(
                consultant = %self.consultant,
                total = %total_points,
                tiers = ?newly_unlocked,
                "incentive tiers unlocked"
            );
        }

        LedgerUpdate {
            ledger: Self {
                consultant: self.consultant.clone(),
                total_points,
            },
            points_added,
            newly_unlocked,
        }
    }

    pub fn record_items(
        &self,
        items: &[SaleItem],
        rates: &RateBook,
    ) -> Result<LedgerUpdate, ConfigurationError> {
        let points = sale_points(items, rates)?;
        Ok(self.add_points(points, rates.tiers()))
    }

    pub fn record_sale(&self, sale: &Sale, rates: &RateBook) -> Result<LedgerUpdate, ConfigurationError> {
        self.record_items(&sale.items, rates)
    }

    /// Credit the points for keeping the quick start pace through `quarter`.
    pub fn award_quarter(&self, quarter: u8, rates: &RateBook) -> Result<LedgerUpdate, ConfigurationError> {
        let points = rates.quarter_points(quarter)?;
        Ok(self.add_points(points, rates.tiers()))
    }

    /// Credit title and bonus points for a promotion `level` levels down the
    /// team, 0 being the consultant's own.
    pub fn award_promotion(&self, level: u8, rates: &RateBook) -> Result<LedgerUpdate, ConfigurationError> {
        let points = rates.promotion_points(level)?.total();
        Ok(self.add_points(points, rates.tiers()))
    }

    pub fn unlocked_tiers<'a>(&self, tiers: &'a [IncentiveTier]) -> Vec<&'a IncentiveTier> {
        unlocked_tiers(self.total_points, tiers)
    }

    /// Lowest tier not yet reached, if any.
    pub fn next_tier<'a>(&self, tiers: &'a [IncentiveTier]) -> Option<&'a IncentiveTier> {
        tiers.iter().find(|t| self.total_points < t.threshold)
    }

    /// Points still needed for [`next_tier`](Self::next_tier); zero once the
    /// ladder is complete.
    pub fn points_to_next_tier(&self, tiers: &[IncentiveTier]) -> Decimal {
        self.next_tier(tiers)
            .map_or(Decimal::ZERO, |t| t.threshold - self.total_points)
    }
}

// ---------------------------------------------------------------------------
// Personal Quick Start
// ---------------------------------------------------------------------------

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct QuickStartStatus {
    pub window_opens: NaiveDate,
    pub window_closes: NaiveDate,
    pub points_in_window: Decimal,
    pub required_points: Decimal,
    pub achieved: bool,
    /// Cash and points awarded; zero unless achieved.
    pub cash_bonus: Decimal,
    pub bonus_points: Decimal,
}

/// Evaluate the Personal Quick Start for a consultant who started on
/// `start_date`. Only active sales dated inside the window count.
///
/// The window, threshold and award come from the book in force on
/// `start_date`; each sale's points come from the book in force on its own
/// sale date.
pub fn evaluate_quick_start(
    start_date: NaiveDate,
    sales: &[Sale],
    schedule: &RateSchedule,
) -> Result<QuickStartStatus, ConfigurationError> {
    let rules = &schedule.for_date(start_date)?.quick_start;
    let window_closes = start_date
        .checked_add_days(Days::new(u64::from(rules.window_days)))
        .unwrap_or(NaiveDate::MAX);

    let mut points_in_window = Decimal::ZERO;
    for sale in sales.iter().filter(|s| {
        s.status == SaleStatus::Active && s.sale_date >= start_date && s.sale_date <= window_closes
    }) {
        points_in_window += sale_points(&sale.items, schedule.for_date(sale.sale_date)?)?;
    }

    let achieved = points_in_window >= rules.required_asp;
    let (cash_bonus, bonus_points) = if achieved {
        (rules.cash_bonus, rules.bonus_points)
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };

    Ok(QuickStartStatus {
        window_opens: start_date,
        window_closes,
        points_in_window,
        required_points: rules.required_asp,
        achieved,
        cash_bonus,
        bonus_points,
    })
}
