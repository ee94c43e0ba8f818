//! Core domain types: ranks, sale items, sales and calculation results.
//!
//! All monetary values are base-unit euros held as [`Decimal`]; cents are
//! the fractional part. Nothing here rounds.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;

/// Maximum number of sponsor levels above a seller.
pub const MAX_UPLINE_LEVELS: u8 = 7;

/// Consultant seniority, lowest to highest.
///
/// The derived ordering follows seniority, so `Rank::BC < Rank::PMC`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    BC,
    SC,
    EC,
    PC,
    MC,
    NMC,
    PMC,
}

impl Rank {
    /// Every rank in seniority order.
    pub const ALL: [Rank; 7] = [
        Rank::BC,
        Rank::SC,
        Rank::EC,
        Rank::PC,
        Rank::MC,
        Rank::NMC,
        Rank::PMC,
    ];

    /// Position in [`Rank::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Result<Self, InvalidInputError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(InvalidInputError::RankOutOfRange(index))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BC => "BC",
            Self::SC => "SC",
            Self::EC => "EC",
            Self::PC => "PC",
            Self::MC => "MC",
            Self::NMC => "NMC",
            Self::PMC => "PMC",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = InvalidInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| InvalidInputError::UnknownRank(s.to_string()))
    }
}

/// The service family a sale item belongs to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Mobile,
    Internet,
    Tv,
    Energy,
}

impl ProductType {
    pub const ALL: [ProductType; 4] = [
        ProductType::Mobile,
        ProductType::Internet,
        ProductType::Tv,
        ProductType::Energy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Internet => "internet",
            Self::Tv => "tv",
            Self::Energy => "energy",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = InvalidInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| InvalidInputError::UnknownProductType(s.to_string()))
    }
}

/// Lifecycle state of a sale.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    /// Entered but not yet activated by the provider.
    #[default]
    Pending,
    Active,
    Cancelled,
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        })
    }
}

/// Opaque consultant identity supplied by the identity layer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ConsultantId(pub String);

impl ConsultantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsultantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sponsors above a seller, nearest first. Index 0 is upline level 1.
///
/// Holds at most [`MAX_UPLINE_LEVELS`] entries; a shorter chain simply has
/// fewer paid levels.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(try_from = "Vec<ConsultantId>", into = "Vec<ConsultantId>")]
pub struct SponsorChain(Vec<ConsultantId>);

impl SponsorChain {
    pub fn new(sponsors: Vec<ConsultantId>) -> Result<Self, InvalidInputError> {
        if sponsors.len() > MAX_UPLINE_LEVELS as usize {
            return Err(InvalidInputError::SponsorChainTooLong(sponsors.len()));
        }
        Ok(Self(sponsors))
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(level, sponsor)` pairs with levels starting at 1.
    pub fn levels(&self) -> impl Iterator<Item = (u8, &ConsultantId)> {
        self.0.iter().enumerate().map(|(i, id)| (i as u8 + 1, id))
    }
}

impl TryFrom<Vec<ConsultantId>> for SponsorChain {
    type Error = InvalidInputError;

    fn try_from(sponsors: Vec<ConsultantId>) -> Result<Self, Self::Error> {
        Self::new(sponsors)
    }
}

impl From<SponsorChain> for Vec<ConsultantId> {
    fn from(chain: SponsorChain) -> Self {
        chain.0
    }
}

/// One sold product line.
///
/// `rank` is the seller's rank when the sale was made, so later promotions
/// never change a historical commission.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SaleItem {
    pub id: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    /// Plan or category key, e.g. "Medium", "Zen", "SoHo".
    pub product: String,
    pub rank: Rank,
    #[serde(default)]
    pub has_convergence: bool,
    #[serde(default)]
    pub has_portability: bool,
    #[serde(default)]
    pub is_soho: bool,
}

impl SaleItem {
    pub fn new(
        id: impl Into<String>,
        product_type: ProductType,
        product: impl Into<String>,
        rank: Rank,
    ) -> Self {
        Self {
            id: id.into(),
            product_type,
            product: product.into(),
            rank,
            has_convergence: false,
            has_portability: false,
            is_soho: false,
        }
    }

    pub fn with_convergence(mut self, on: bool) -> Self {
        self.has_convergence = on;
        self
    }

    pub fn with_portability(mut self, on: bool) -> Self {
        self.has_portability = on;
        self
    }

    pub fn with_soho(mut self, on: bool) -> Self {
        self.is_soho = on;
        self
    }
}

/// Items sold together to one customer.
///
/// Status changes produce a new value; the original items and their
/// commission never change. `version` is bumped on every transition so the
/// record store can apply compare-and-swap writes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Sale {
    pub id: String,
    pub consultant: ConsultantId,
    #[serde(default)]
    pub status: SaleStatus,
    /// Activation date; the clock origin for clawback and fidelity.
    pub sale_date: NaiveDate,
    #[serde(default)]
    pub cancelled_on: Option<NaiveDate>,
    pub items: Vec<SaleItem>,
    #[serde(default)]
    pub version: u64,
}

impl Sale {
    pub fn new(
        id: impl Into<String>,
        consultant: ConsultantId,
        sale_date: NaiveDate,
        items: Vec<SaleItem>,
    ) -> Self {
        Self {
            id: id.into(),
            consultant,
            status: SaleStatus::Active,
            sale_date,
            cancelled_on: None,
            items,
            version: 0,
        }
    }

    /// Elapsed whole months since `sale_date`, frozen at the cancellation
    /// date for cancelled sales. Pending sales have zero tenure.
    pub fn months_active(&self, as_of: NaiveDate) -> Result<Decimal, InvalidInputError> {
        let end = match self.status {
            SaleStatus::Pending => return Ok(Decimal::ZERO),
            SaleStatus::Active => as_of,
            SaleStatus::Cancelled => {
                let cancelled_on = self
                    .cancelled_on
                    .ok_or_else(|| InvalidInputError::MissingCancellationDate(self.id.clone()))?;
                cancelled_on.min(as_of)
            }
        };
        let months = whole_months_between(self.sale_date, end);
        if months < 0 {
            return Err(InvalidInputError::NegativeMonthsActive(Decimal::from(months)));
        }
        Ok(Decimal::from(months))
    }

    /// Pending -> active, setting the activation date.
    pub fn activate(&self, on: NaiveDate) -> Result<Self, InvalidInputError> {
        self.check_transition(SaleStatus::Pending, SaleStatus::Active)?;
        Ok(Self {
            status: SaleStatus::Active,
            sale_date: on,
            version: self.version + 1,
            ..self.clone()
        })
    }

    /// Active -> cancelled. Tenure freezes at `on`.
    pub fn cancel(&self, on: NaiveDate) -> Result<Self, InvalidInputError> {
        self.check_transition(SaleStatus::Active, SaleStatus::Cancelled)?;
        if on < self.sale_date {
            return Err(InvalidInputError::CancelledBeforeSale {
                sale_date: self.sale_date,
                cancelled_on: on,
            });
        }
        Ok(Self {
            status: SaleStatus::Cancelled,
            cancelled_on: Some(on),
            version: self.version + 1,
            ..self.clone()
        })
    }

    /// Cancelled -> active. Drops the cancellation date so tenure runs again
    /// from the original sale date.
    pub fn reactivate(&self) -> Result<Self, InvalidInputError> {
        self.check_transition(SaleStatus::Cancelled, SaleStatus::Active)?;
        Ok(Self {
            status: SaleStatus::Active,
            cancelled_on: None,
            version: self.version + 1,
            ..self.clone()
        })
    }

    fn check_transition(&self, from: SaleStatus, to: SaleStatus) -> Result<(), InvalidInputError> {
        if self.status != from {
            return Err(InvalidInputError::StatusTransition {
                from: self.status,
                to,
            });
        }
        Ok(())
    }
}

/// Whole calendar months from `from` to `to`; negative when `to < from`.
///
/// A month counts once the same day-of-month is reached, so Jan 15 -> Feb 14
/// is 0 and Jan 15 -> Feb 15 is 1.
pub fn whole_months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    if to < from {
        return -whole_months_between(to, from).max(1);
    }
    let months = (to.year() as i64 - from.year() as i64) * 12 + to.month() as i64
        - from.month() as i64;
    if to.day() < from.day() { months - 1 } else { months }
}

/// A calendar month used for fidelity accrual.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    first_day: NaiveDate,
    last_day: NaiveDate,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, InvalidInputError> {
        let invalid = InvalidInputError::InvalidPeriod { year, month };
        let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| invalid.clone())?;
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let last_day = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .ok_or(invalid)?;
        Ok(Self { first_day, last_day })
    }

    /// The month containing `date`.
    pub fn containing(date: NaiveDate) -> Result<Self, InvalidInputError> {
        Self::new(date.year(), date.month())
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn last_day(&self) -> NaiveDate {
        self.last_day
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    pub fn next(&self) -> Result<Self, InvalidInputError> {
        if self.month() == 12 {
            Self::new(self.year() + 1, 1)
        } else {
            Self::new(self.year(), self.month() + 1)
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.first_day <= date && date <= self.last_day
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One-time commission for a single item.
///
/// `total` always equals the sum of the four components; the fields are
/// private so the invariant cannot be broken after construction.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CommissionBreakdown {
    base: Decimal,
    convergence_bonus: Decimal,
    portability_bonus: Decimal,
    soho_bonus: Decimal,
    total: Decimal,
}

impl CommissionBreakdown {
    pub const ZERO: Self = Self {
        base: Decimal::ZERO,
        convergence_bonus: Decimal::ZERO,
        portability_bonus: Decimal::ZERO,
        soho_bonus: Decimal::ZERO,
        total: Decimal::ZERO,
    };

    pub fn new(
        base: Decimal,
        convergence_bonus: Decimal,
        portability_bonus: Decimal,
        soho_bonus: Decimal,
    ) -> Self {
        Self {
            base,
            convergence_bonus,
            portability_bonus,
            soho_bonus,
            total: base + convergence_bonus + portability_bonus + soho_bonus,
        }
    }

    pub fn base(&self) -> Decimal {
        self.base
    }

    pub fn convergence_bonus(&self) -> Decimal {
        self.convergence_bonus
    }

    pub fn portability_bonus(&self) -> Decimal {
        self.portability_bonus
    }

    pub fn soho_bonus(&self) -> Decimal {
        self.soho_bonus
    }

    pub fn total(&self) -> Decimal {
        self.total
    }
}

impl Add for CommissionBreakdown {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.base + rhs.base,
            self.convergence_bonus + rhs.convergence_bonus,
            self.portability_bonus + rhs.portability_bonus,
            self.soho_bonus + rhs.soho_bonus,
        )
    }
}

impl Sum for CommissionBreakdown {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Payable and clawed-back split of a one-time commission.
///
/// `percentage` is the keep fraction that was applied (0.25 means 25% kept);
/// the clawed-back fraction is `1 - percentage`.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClawbackOutcome {
    pub keep_amount: Decimal,
    pub clawback_amount: Decimal,
    pub percentage: Decimal,
}

/// Amount owed to one sponsor level.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct UplinePayout {
    pub level: u8,
    pub consultant: ConsultantId,
    pub share: Decimal,
    pub amount: Decimal,
}

/// A recurring monthly fidelity entitlement for one contract.
///
/// Personal entries have no `level`; upline entries carry the level and the
/// share applied to the seller's personal fidelity.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FidelityLedgerEntry {
    pub sale_id: String,
    pub item_id: String,
    pub period: Period,
    pub service: String,
    pub rank: Rank,
    pub monthly_rate: Decimal,
    pub beneficiary: ConsultantId,
    pub level: Option<u8>,
    pub share: Option<Decimal>,
    pub amount: Decimal,
}
