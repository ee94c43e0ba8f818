//! Versioned rate tables.
//!
//! A [`RateBook`] is one immutable version of every lookup the engine needs.
//! A [`RateSchedule`] orders several versions by `effective_from` so that a
//! historical sale is always priced with the book that was in force on its
//! sale date. Lookups for unknown keys fail with [`ConfigurationError`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ConfigurationError, InvalidInputError};
use crate::types::{MAX_UPLINE_LEVELS, ProductType, Rank};

// ---------------------------------------------------------------------------
// RankTable
// ---------------------------------------------------------------------------

/// A value for every [`Rank`].
///
/// Deserialization fails unless all seven ranks are present, so a loaded
/// table can never miss a rank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankTable<T>([T; 7]);

impl<T> RankTable<T> {
    pub fn new(values: [T; 7]) -> Self {
        Self(values)
    }

    pub fn get(&self, rank: Rank) -> &T {
        &self.0[rank.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Rank, &T)> {
        Rank::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T: Clone> RankTable<T> {
    /// The same value for every rank.
    pub fn uniform(value: T) -> Self {
        Self(std::array::from_fn(|_| value.clone()))
    }
}

impl<T: Serialize> Serialize for RankTable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(7))?;
        for (rank, value) in self.iter() {
            map.serialize_entry(&rank, value)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for RankTable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RankTableVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for RankTableVisitor<T> {
            type Value = RankTable<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map with an entry for every rank (BC, SC, EC, PC, MC, NMC, PMC)")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries: BTreeMap<Rank, T> = BTreeMap::new();
                while let Some((rank, value)) = access.next_entry::<Rank, T>()? {
                    if entries.insert(rank, value).is_some() {
                        return Err(de::Error::custom(format!("duplicate rank {rank}")));
                    }
                }
                let mut values = Vec::with_capacity(Rank::ALL.len());
                for rank in Rank::ALL {
                    match entries.remove(&rank) {
                        Some(v) => values.push(v),
                        None => return Err(de::Error::custom(format!("missing rank {rank}"))),
                    }
                }
                let values: [T; 7] = values
                    .try_into()
                    .map_err(|_| de::Error::custom("rank table must have seven entries"))?;
                Ok(RankTable(values))
            }
        }

        deserializer.deserialize_map(RankTableVisitor(PhantomData))
    }
}

// ---------------------------------------------------------------------------
// Upline shares
// ---------------------------------------------------------------------------

/// Per-level fractions applied to a downline amount.
///
/// Slot 0 is the seller's own level (used by some fidelity tables); slots
/// 1-7 are upline levels. Levels are independent overrides and are not
/// expected to sum to one.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct UplineShares([Decimal; 8]);

impl UplineShares {
    pub fn new(shares: [Decimal; 8]) -> Self {
        Self(shares)
    }

    /// Share for upline `level` (1-7).
    pub fn share(&self, level: u8) -> Result<Decimal, InvalidInputError> {
        if !(1..=MAX_UPLINE_LEVELS).contains(&level) {
            return Err(InvalidInputError::UplineLevelOutOfRange(level));
        }
        Ok(self.0[level as usize])
    }

    /// The level-0 slot.
    pub fn own_share(&self) -> Decimal {
        self.0[0]
    }

    fn is_non_negative(&self) -> bool {
        self.0.iter().all(|s| !s.is_sign_negative())
    }
}

// ---------------------------------------------------------------------------
// Bonuses, clawback, incentives
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MobileBonuses {
    pub convergence: Decimal,
    pub portability: Decimal,
    pub soho: Decimal,
    /// Plans that qualify for any mobile bonus.
    pub premium_plans: BTreeSet<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct InternetBonuses {
    pub convergence: Decimal,
    /// "Easy Switch" number portability.
    pub portability: Decimal,
}

/// Tenure bucket: from `from_months` upward, keep `keep` of the commission.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClawbackBucket {
    pub from_months: Decimal,
    pub keep: Decimal,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ClawbackSchedule {
    /// Keep fraction for cancelled contracts, regardless of tenure.
    pub cancelled_keep: Decimal,
    /// Ascending buckets; the first must start at zero months.
    pub buckets: Vec<ClawbackBucket>,
}

impl ClawbackSchedule {
    /// Keep fraction for an active contract with `months_active` tenure.
    pub fn keep_fraction(&self, months_active: Decimal) -> Result<Decimal, ConfigurationError> {
        self.buckets
            .iter()
            .rev()
            .find(|b| b.from_months <= months_active)
            .map(|b| b.keep)
            .ok_or_else(|| {
                ConfigurationError::InvalidRates(format!(
                    "no clawback bucket covers {months_active} months"
                ))
            })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AspRates {
    pub by_product: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub by_type: BTreeMap<ProductType, Decimal>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IncentiveTier {
    pub name: String,
    pub threshold: Decimal,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RewardOption {
    Gift(String),
    CashBonus(Decimal),
}

/// Personal Quick Start: a one-time achievement for new consultants.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct QuickStartRules {
    pub window_days: u32,
    pub required_asp: Decimal,
    pub cash_bonus: Decimal,
    pub bonus_points: Decimal,
}

/// Title and bonus points credited for one promotion.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PromotionPoints {
    pub title: Decimal,
    pub bonus: Decimal,
}

impl PromotionPoints {
    pub fn total(&self) -> Decimal {
        self.title + self.bonus
    }
}

/// Points credited outside product sales.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PointAwards {
    /// Quarters after the Personal Quick Start, Q1 first.
    #[serde(default)]
    pub quarters: Vec<Decimal>,
    #[serde(default)]
    pub own_promotion: PromotionPoints,
    /// Promotion of a team member, level 1 first.
    #[serde(default)]
    pub team_promotions: Vec<PromotionPoints>,
}

// ---------------------------------------------------------------------------
// RateBook
// ---------------------------------------------------------------------------

/// One version of every rate table.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RateBook {
    pub version: String,
    pub effective_from: NaiveDate,
    pub mobile: BTreeMap<String, RankTable<Decimal>>,
    pub mobile_bonuses: MobileBonuses,
    pub internet_plans: BTreeSet<String>,
    pub internet: RankTable<Decimal>,
    pub internet_bonuses: InternetBonuses,
    pub tv_packages: BTreeSet<String>,
    pub tv: RankTable<Decimal>,
    pub energy: BTreeMap<String, RankTable<Decimal>>,
    pub upline_commission: BTreeMap<ProductType, UplineShares>,
    pub fidelity: BTreeMap<String, RankTable<Decimal>>,
    pub upline_fidelity: BTreeMap<String, UplineShares>,
    pub clawback: ClawbackSchedule,
    pub asp: AspRates,
    pub tiers: Vec<IncentiveTier>,
    pub rewards: BTreeMap<String, RankTable<Vec<RewardOption>>>,
    pub quick_start: QuickStartRules,
    #[serde(default)]
    pub point_awards: PointAwards,
}

impl RateBook {
    /// Base one-time commission for a product sold at `rank`.
    ///
    /// Internet and TV are flat per rank but the product must still be a
    /// known plan, so a misspelt plan never earns a silent commission.
    pub fn base_commission(
        &self,
        product_type: ProductType,
        product: &str,
        rank: Rank,
    ) -> Result<Decimal, ConfigurationError> {
        let unknown = || ConfigurationError::UnknownProduct {
            product_type,
            product: product.to_string(),
        };
        match product_type {
            ProductType::Mobile => self.mobile.get(product).map(|t| *t.get(rank)).ok_or_else(unknown),
            ProductType::Energy => self.energy.get(product).map(|t| *t.get(rank)).ok_or_else(unknown),
            ProductType::Internet if self.internet_plans.contains(product) => {
                Ok(*self.internet.get(rank))
            }
            ProductType::Tv if self.tv_packages.contains(product) => Ok(*self.tv.get(rank)),
            ProductType::Internet | ProductType::Tv => Err(unknown()),
        }
    }

    pub fn is_premium_mobile(&self, product: &str) -> bool {
        self.mobile_bonuses.premium_plans.contains(product)
    }

    pub fn upline_commission_shares(
        &self,
        product_type: ProductType,
    ) -> Result<&UplineShares, ConfigurationError> {
        self.upline_commission
            .get(&product_type)
            .ok_or_else(|| ConfigurationError::MissingUplineShares(product_type.to_string()))
    }

    pub fn has_fidelity_service(&self, service: &str) -> bool {
        self.fidelity.contains_key(service)
    }

    pub fn fidelity_rate(&self, service: &str, rank: Rank) -> Result<Decimal, ConfigurationError> {
        self.fidelity
            .get(service)
            .map(|t| *t.get(rank))
            .ok_or_else(|| ConfigurationError::UnknownFidelityService(service.to_string()))
    }

    pub fn upline_fidelity_shares(&self, service: &str) -> Result<&UplineShares, ConfigurationError> {
        self.upline_fidelity
            .get(service)
            .ok_or_else(|| ConfigurationError::MissingUplineShares(service.to_string()))
    }

    /// ASP points for one item: product-specific rate, then the type-generic
    /// rate, otherwise a configuration error.
    pub fn asp_rate(&self, product_type: ProductType, product: &str) -> Result<Decimal, ConfigurationError> {
        self.asp
            .by_product
            .get(product)
            .or_else(|| self.asp.by_type.get(&product_type))
            .copied()
            .ok_or_else(|| ConfigurationError::MissingAspRate {
                product_type,
                product: product.to_string(),
            })
    }

    /// Tier ladder in ascending threshold order.
    pub fn tiers(&self) -> &[IncentiveTier] {
        &self.tiers
    }

    pub fn tier(&self, name: &str) -> Result<&IncentiveTier, ConfigurationError> {
        self.tiers
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigurationError::UnknownTier(name.to_string()))
    }

    pub fn rewards(&self, tier: &str, rank: Rank) -> Result<&[RewardOption], ConfigurationError> {
        let tier = self.tier(tier)?;
        self.rewards
            .get(&tier.name)
            .map(|t| t.get(rank).as_slice())
            .ok_or_else(|| ConfigurationError::MissingRewards(tier.name.clone()))
    }

    /// Points for keeping the quick start pace through `quarter` (1 is Q1).
    pub fn quarter_points(&self, quarter: u8) -> Result<Decimal, ConfigurationError> {
        usize::from(quarter)
            .checked_sub(1)
            .and_then(|i| self.point_awards.quarters.get(i))
            .copied()
            .ok_or_else(|| ConfigurationError::MissingPointAward(format!("quarter Q{quarter}")))
    }

    /// Points for a promotion `level` levels down the team. Level 0 is the
    /// consultant's own promotion.
    pub fn promotion_points(&self, level: u8) -> Result<PromotionPoints, ConfigurationError> {
        match usize::from(level) {
            0 => Ok(self.point_awards.own_promotion),
            n => self
                .point_awards
                .team_promotions
                .get(n - 1)
                .copied()
                .ok_or_else(|| {
                    ConfigurationError::MissingPointAward(format!("promotion at level {level}"))
                }),
        }
    }

    /// Check cross-table consistency. Called whenever a book is loaded.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |msg: String| Err(ConfigurationError::InvalidRates(format!("{}: {msg}", self.version)));

        for plan in &self.mobile_bonuses.premium_plans {
            if !self.mobile.contains_key(plan) {
                return invalid(format!("premium plan {plan} has no mobile rates"));
            }
        }

        for product_type in ProductType::ALL {
            if !self.upline_commission.contains_key(&product_type) {
                return invalid(format!("no upline commission shares for {product_type}"));
            }
        }
        let shares = self.upline_commission.values().chain(self.upline_fidelity.values());
        if shares.into_iter().any(|s| !s.is_non_negative()) {
            return invalid("negative upline share".to_string());
        }

        let money = self
            .mobile
            .values()
            .chain(self.energy.values())
            .chain(self.fidelity.values())
            .chain([&self.internet, &self.tv])
            .flat_map(|t| t.iter().map(|(_, v)| *v));
        if money.into_iter().any(|v| v.is_sign_negative()) {
            return invalid("negative rate".to_string());
        }
        let points = self.asp.by_product.values().chain(self.asp.by_type.values());
        if points.into_iter().any(|p| p.is_sign_negative()) {
            return invalid("negative ASP rate".to_string());
        }

        let awards = &self.point_awards;
        if awards.team_promotions.len() > usize::from(MAX_UPLINE_LEVELS) {
            return invalid("team promotion points beyond level 7".to_string());
        }
        let promotions = awards.team_promotions.iter().chain([&awards.own_promotion]);
        if awards
            .quarters
            .iter()
            .copied()
            .chain(promotions.flat_map(|p| [p.title, p.bonus]))
            .any(|p| p.is_sign_negative())
        {
            return invalid("negative award points".to_string());
        }

        match self.clawback.buckets.first() {
            Some(first) if first.from_months.is_zero() => {}
            _ => return invalid("clawback buckets must start at 0 months".to_string()),
        }
        if self
            .clawback
            .buckets
            .windows(2)
            .any(|w| w[0].from_months >= w[1].from_months)
        {
            return invalid("clawback buckets must be strictly ascending".to_string());
        }
        let keeps = self.clawback.buckets.iter().map(|b| b.keep);
        if keeps
            .chain([self.clawback.cancelled_keep])
            .any(|k| k < Decimal::ZERO || k > Decimal::ONE)
        {
            return invalid("keep fractions must lie in [0, 1]".to_string());
        }

        if self.tiers.windows(2).any(|w| w[0].threshold >= w[1].threshold) {
            return invalid("tier thresholds must be strictly ascending".to_string());
        }
        for tier in &self.tiers {
            if !self.rewards.contains_key(&tier.name) {
                return invalid(format!("tier {} has no rewards", tier.name));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RateSchedule
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum RateFile {
    Many(Vec<RateBook>),
    One(Box<RateBook>),
}

/// Rate book versions ordered by `effective_from`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateSchedule {
    versions: Vec<RateBook>,
}

impl RateSchedule {
    /// Validate and order the given versions. Two versions may not share an
    /// `effective_from` date.
    pub fn new(mut versions: Vec<RateBook>) -> Result<Self, ConfigurationError> {
        if versions.is_empty() {
            return Err(ConfigurationError::InvalidRates("no rate versions".to_string()));
        }
        for book in &versions {
            book.validate()?;
        }
        versions.sort_by_key(|b| b.effective_from);
        if let Some(w) = versions
            .windows(2)
            .find(|w| w[0].effective_from == w[1].effective_from)
        {
            return Err(ConfigurationError::InvalidRates(format!(
                "versions {} and {} share effective date {}",
                w[0].version, w[1].version, w[0].effective_from
            )));
        }
        Ok(Self { versions })
    }

    pub fn single(book: RateBook) -> Result<Self, ConfigurationError> {
        Self::new(vec![book])
    }

    /// Parse a JSON document holding either one rate book or an array.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let file: RateFile = serde_json::from_str(json)
            .map_err(|e| ConfigurationError::InvalidRates(e.to_string()))?;
        match file {
            RateFile::Many(books) => Self::new(books),
            RateFile::One(book) => Self::single(*book),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigurationError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::InvalidRates(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// The book in force on `date`: the latest version whose
    /// `effective_from` is on or before it.
    pub fn for_date(&self, date: NaiveDate) -> Result<&RateBook, ConfigurationError> {
        self.versions
            .iter()
            .rev()
            .find(|b| b.effective_from <= date)
            .ok_or(ConfigurationError::NoRateVersion(date))
    }

    pub fn latest(&self) -> &RateBook {
        // `new` rejects an empty list.
        &self.versions[self.versions.len() - 1]
    }

    pub fn versions(&self) -> &[RateBook] {
        &self.versions
    }
}

impl Default for RateSchedule {
    fn default() -> Self {
        Self {
            versions: vec![RateBook::default()],
        }
    }
}
