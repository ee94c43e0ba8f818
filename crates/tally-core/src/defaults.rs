//! Built-in rate book reproducing the current reseller rate card.
//!
//! All amounts are euros. Upline fidelity shares are published as
//! percentages and stored here as fractions.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::rates::{
    AspRates, ClawbackBucket, ClawbackSchedule, IncentiveTier, InternetBonuses, MobileBonuses,
    PointAwards, PromotionPoints, QuickStartRules, RankTable, RateBook, RewardOption, UplineShares,
};
use crate::types::{ProductType, Rank};

/// Version label of the built-in rate book.
pub const DEFAULT_RATE_VERSION: &str = "default";

/// Mobile plans, lowest to highest tier.
pub const MOBILE_PLANS: [&str; 5] = ["Child", "Small", "Medium", "Large", "Unlimited"];

/// Mobile plans eligible for convergence, portability and SoHo bonuses.
pub const PREMIUM_MOBILE_PLANS: [&str; 3] = ["Medium", "Large", "Unlimited"];

pub const INTERNET_PLANS: [&str; 3] = ["Start", "Zen", "Giga"];

pub const TV_PACKAGES: [&str; 3] = ["TV Life", "TV", "TV Plus"];

pub const ENERGY_CATEGORIES: [&str; 3] = ["Residential", "SoHo", "Maintenance"];

/// Upline share of a downline's one-time commission, levels 1-7.
pub const UPLINE_COMMISSION_SHARES: [Decimal; 7] = [
    dec!(0.10),
    dec!(0.05),
    dec!(0.03),
    dec!(0.03),
    dec!(0.02),
    dec!(0.01),
    dec!(0.01),
];

/// BC earns `bc`; every rank from SC upward earns `rest`.
fn starter_split(bc: Decimal, rest: Decimal) -> RankTable<Decimal> {
    RankTable::new([bc, rest, rest, rest, rest, rest, rest])
}

fn percent_shares(percent: [Decimal; 8]) -> UplineShares {
    UplineShares::new(percent.map(|p| p / dec!(100)))
}

fn strings<const N: usize>(values: [&str; N]) -> BTreeSet<String> {
    values.into_iter().map(str::to_string).collect()
}

fn gifts(names: &[&str]) -> Vec<RewardOption> {
    names.iter().map(|n| RewardOption::Gift(n.to_string())).collect()
}

fn cash_by_rank(amounts: [Decimal; 7]) -> RankTable<Vec<RewardOption>> {
    RankTable::new(amounts.map(|a| vec![RewardOption::CashBonus(a)]))
}

fn mobile_rates() -> BTreeMap<String, RankTable<Decimal>> {
    [
        ("Child", starter_split(dec!(1), dec!(5))),
        ("Small", starter_split(dec!(10), dec!(15))),
        ("Medium", starter_split(dec!(35), dec!(40))),
        ("Large", starter_split(dec!(50), dec!(55))),
        ("Unlimited", starter_split(dec!(60), dec!(65))),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn energy_rates() -> BTreeMap<String, RankTable<Decimal>> {
    [
        ("Residential", starter_split(dec!(20), dec!(25))),
        ("SoHo", starter_split(dec!(40), dec!(45))),
        ("Maintenance", starter_split(dec!(20), dec!(25))),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn fidelity_rates() -> BTreeMap<String, RankTable<Decimal>> {
    [
        ("Internet", dec!(0.35)),
        ("Energy", dec!(0.35)),
        ("Mobile Child", dec!(0.25)),
        ("Mobile Small", dec!(0.50)),
        ("Mobile Medium", dec!(1.00)),
        ("Mobile Large", dec!(1.25)),
        ("Mobile Unlimited", dec!(1.50)),
        ("Go Light", dec!(0.40)),
        ("Go Plus", dec!(0.80)),
        ("Go Intense", dec!(1.00)),
        ("Go Extreme", dec!(1.75)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), RankTable::uniform(v)))
    .collect()
}

fn upline_fidelity_shares() -> BTreeMap<String, UplineShares> {
    let standard = [
        dec!(1.00), dec!(0.43), dec!(0.14), dec!(0.14), dec!(0.14), dec!(0.14), dec!(0.14), dec!(0.57),
    ];
    let half = [
        dec!(0.50), dec!(0.21), dec!(0.07), dec!(0.07), dec!(0.07), dec!(0.07), dec!(0.07), dec!(0.29),
    ];
    let high = [
        dec!(1.60), dec!(0.64), dec!(0.21), dec!(0.21), dec!(0.21), dec!(0.21), dec!(0.21), dec!(0.89),
    ];
    [
        ("Internet", standard),
        ("Energy", standard),
        ("Mobile Child", half),
        ("Mobile Small", standard),
        ("Mobile Medium", high),
        (
            "Mobile Large",
            [dec!(1.25), dec!(0.53), dec!(0.17), dec!(0.17), dec!(0.17), dec!(0.17), dec!(0.17), dec!(0.73)],
        ),
        (
            "Mobile Unlimited",
            [dec!(1.50), dec!(0.64), dec!(0.21), dec!(0.21), dec!(0.21), dec!(0.21), dec!(0.21), dec!(0.89)],
        ),
        (
            "Go Light",
            [dec!(0.40), dec!(0.17), dec!(0.06), dec!(0.06), dec!(0.06), dec!(0.06), dec!(0.06), dec!(0.23)],
        ),
        (
            "Go Plus",
            [dec!(0.80), dec!(0.34), dec!(0.11), dec!(0.11), dec!(0.11), dec!(0.11), dec!(0.11), dec!(0.46)],
        ),
        ("Go Intense", standard),
        (
            "Go Extreme",
            [dec!(1.75), dec!(0.75), dec!(0.25), dec!(0.25), dec!(0.25), dec!(0.25), dec!(0.25), dec!(1.00)],
        ),
        ("EasyInternet@Home", half),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), percent_shares(v)))
    .collect()
}

fn asp_rates() -> AspRates {
    let by_product = [
        ("Child", dec!(0.25)),
        ("Small", dec!(0.50)),
        ("Medium", dec!(1.00)),
        ("Large", dec!(1.25)),
        ("Unlimited", dec!(1.50)),
        ("Start", dec!(1.00)),
        ("Zen", dec!(1.00)),
        ("Giga", dec!(1.00)),
        ("TV Life", dec!(0.50)),
        ("TV", dec!(1.00)),
        ("TV Plus", dec!(1.00)),
        ("Residential", dec!(1.00)),
        ("SoHo", dec!(2.00)),
        ("Maintenance", dec!(1.00)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    AspRates {
        by_product,
        by_type: BTreeMap::new(),
    }
}

fn tiers() -> Vec<IncentiveTier> {
    [
        ("IRON", dec!(75)),
        ("BRONZE", dec!(100)),
        ("SILVER", dec!(150)),
        ("GOLD", dec!(225)),
        ("PLATINUM", dec!(325)),
        ("SAPPHIRE", dec!(400)),
        ("DIAMOND", dec!(500)),
    ]
    .into_iter()
    .map(|(name, threshold)| IncentiveTier {
        name: name.to_string(),
        threshold,
    })
    .collect()
}

fn rewards() -> BTreeMap<String, RankTable<Vec<RewardOption>>> {
    let mut rewards = BTreeMap::new();
    rewards.insert(
        "IRON".to_string(),
        RankTable::uniform(gifts(&[
            "Lenovo Tablet",
            "JBL PartyBox",
            "IKEA cadeaubon €200",
            "Tankkaart €200",
        ])),
    );
    rewards.insert(
        "BRONZE".to_string(),
        RankTable::uniform(gifts(&[
            "EUFY robotstofzuiger",
            "Lenovo IdeaPad laptop",
            "Bongo parachutesprong",
            "Tankkaart €200",
        ])),
    );
    rewards.insert(
        "SILVER".to_string(),
        RankTable::uniform(gifts(&[
            "Apple iPhone 17",
            "GOOD MORNING SALES €1000",
            "ECOVACS robotmaaier",
            "Kadonation voucher €1000",
        ])),
    );
    rewards.insert(
        "GOLD".to_string(),
        RankTable::uniform(vec![RewardOption::CashBonus(dec!(1000))]),
    );
    rewards.insert(
        "PLATINUM".to_string(),
        cash_by_rank([
            dec!(1000), dec!(1000), dec!(1000), dec!(1000), dec!(1500), dec!(1750), dec!(2000),
        ]),
    );
    rewards.insert(
        "SAPPHIRE".to_string(),
        cash_by_rank([
            dec!(1000), dec!(1500), dec!(1750), dec!(2000), dec!(2250), dec!(2500), dec!(2750),
        ]),
    );
    rewards.insert(
        "DIAMOND".to_string(),
        cash_by_rank([
            dec!(1500), dec!(2000), dec!(2500), dec!(2750), dec!(3000), dec!(3250), dec!(3500),
        ]),
    );
    rewards
}

/// Quick start quarter ladder and team promotion points.
fn point_awards() -> PointAwards {
    let promotion = |title, bonus| PromotionPoints { title, bonus };
    PointAwards {
        quarters: vec![dec!(20), dec!(10), dec!(5), dec!(5), dec!(5), dec!(5), dec!(10)],
        own_promotion: promotion(dec!(10), dec!(20)),
        team_promotions: vec![
            promotion(dec!(10), dec!(25)),
            promotion(dec!(10), dec!(15)),
            promotion(dec!(5), dec!(10)),
            promotion(dec!(5), dec!(5)),
            promotion(dec!(5), dec!(5)),
            promotion(dec!(5), dec!(5)),
            promotion(dec!(5), dec!(5)),
        ],
    }
}

impl Default for RateBook {
    fn default() -> Self {
        let commission_shares = {
            let mut shares = [Decimal::ZERO; 8];
            shares[1..].copy_from_slice(&UPLINE_COMMISSION_SHARES);
            UplineShares::new(shares)
        };

        Self {
            version: DEFAULT_RATE_VERSION.to_string(),
            effective_from: NaiveDate::default(),
            mobile: mobile_rates(),
            mobile_bonuses: MobileBonuses {
                convergence: dec!(12),
                portability: dec!(20),
                soho: dec!(15),
                premium_plans: strings(PREMIUM_MOBILE_PLANS),
            },
            internet_plans: strings(INTERNET_PLANS),
            internet: starter_split(dec!(15), dec!(20)),
            internet_bonuses: InternetBonuses {
                convergence: dec!(15),
                portability: dec!(12),
            },
            tv_packages: strings(TV_PACKAGES),
            tv: RankTable::uniform(dec!(10)),
            energy: energy_rates(),
            upline_commission: ProductType::ALL
                .into_iter()
                .map(|t| (t, commission_shares))
                .collect(),
            fidelity: fidelity_rates(),
            upline_fidelity: upline_fidelity_shares(),
            clawback: ClawbackSchedule {
                cancelled_keep: Decimal::ZERO,
                buckets: vec![
                    ClawbackBucket { from_months: dec!(0), keep: dec!(0) },
                    ClawbackBucket { from_months: dec!(1), keep: dec!(0.25) },
                    ClawbackBucket { from_months: dec!(6), keep: dec!(0.75) },
                ],
            },
            asp: asp_rates(),
            tiers: tiers(),
            rewards: rewards(),
            quick_start: QuickStartRules {
                window_days: 40,
                required_asp: dec!(12),
                cash_bonus: dec!(150),
                bonus_points: dec!(50),
            },
            point_awards: point_awards(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mobile_plan_is_priced() {
        let book = RateBook::default();
        for plan in MOBILE_PLANS {
            assert!(book.mobile.contains_key(plan), "missing {plan}");
            assert!(book.asp.by_product.contains_key(plan), "missing ASP for {plan}");
        }
    }

    #[test]
    fn only_bc_has_starter_rates() {
        let book = RateBook::default();
        let medium = &book.mobile["Medium"];
        assert_eq!(*medium.get(Rank::BC), dec!(35));
        for rank in &Rank::ALL[1..] {
            assert_eq!(*medium.get(*rank), dec!(40));
        }
    }

    #[test]
    fn upline_fidelity_stored_as_fractions() {
        let book = RateBook::default();
        let internet = book.upline_fidelity_shares("Internet").unwrap();
        assert_eq!(internet.own_share(), dec!(0.01));
        assert_eq!(internet.share(1).unwrap(), dec!(0.0043));
        assert_eq!(internet.share(7).unwrap(), dec!(0.0057));
    }

    #[test]
    fn commission_shares_do_not_sum_to_one() {
        let total: Decimal = UPLINE_COMMISSION_SHARES.iter().sum();
        assert_eq!(total, dec!(0.25));
    }

    #[test]
    fn tier_ladder() {
        let book = RateBook::default();
        let thresholds: Vec<_> = book.tiers().iter().map(|t| t.threshold).collect();
        assert_eq!(
            thresholds,
            vec![dec!(75), dec!(100), dec!(150), dec!(225), dec!(325), dec!(400), dec!(500)]
        );
    }

    #[test]
    fn quick_start_quarters_follow_the_pqs_award() {
        let book = RateBook::default();
        let ladder: Decimal = book.point_awards.quarters.iter().sum();
        assert_eq!(book.quick_start.bonus_points + ladder, dec!(110));
        let team: Decimal = book.point_awards.team_promotions.iter().map(|p| p.total()).sum();
        assert_eq!(team, dec!(115));
    }

    #[test]
    fn energy_soho_category_is_priced() {
        let book = RateBook::default();
        for category in ENERGY_CATEGORIES {
            assert!(book.energy.contains_key(category));
        }
        assert_eq!(
            book.base_commission(ProductType::Energy, "SoHo", Rank::PC).unwrap(),
            dec!(45)
        );
    }
}
