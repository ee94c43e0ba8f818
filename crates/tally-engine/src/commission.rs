//! Personal one-time commission.
//!
//! [`calculate_personal_commission`] prices a single item from its own flags.
//! [`calculate_sale_commission`] first runs [`resolve_convergence`] over the
//! whole sale so the convergence bonus depends only on what was sold
//! together, never on the order items were entered.

use rust_decimal::Decimal;
use serde::Serialize;
use tally_core::{CommissionBreakdown, ConfigurationError, ProductType, RateBook, Sale, SaleItem};
use tracing::debug;

/// Commission for one item of a sale.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ItemCommission {
    pub item_id: String,
    pub product_type: ProductType,
    pub breakdown: CommissionBreakdown,
}

/// Commission for a whole sale, items in entry order.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SaleCommission {
    pub sale_id: String,
    pub items: Vec<ItemCommission>,
    pub total: CommissionBreakdown,
}

impl SaleCommission {
    pub fn total_amount(&self) -> Decimal {
        self.total.total()
    }
}

fn bonus_if(on: bool, amount: Decimal) -> Decimal {
    if on { amount } else { Decimal::ZERO }
}

/// One-time commission for a single item.
///
/// Mobile bonuses are paid only on premium plans; lower plans earn the base
/// rate whatever their flags say. Internet bonuses are not tier-gated. TV and
/// energy carry no bonuses.
pub fn calculate_personal_commission(
    item: &SaleItem,
    rates: &RateBook,
) -> Result<CommissionBreakdown, ConfigurationError> {
    let base = rates.base_commission(item.product_type, &item.product, item.rank)?;

    let breakdown = match item.product_type {
        ProductType::Mobile if rates.is_premium_mobile(&item.product) => {
            let bonuses = &rates.mobile_bonuses;
            CommissionBreakdown::new(
                base,
                bonus_if(item.has_convergence, bonuses.convergence),
                bonus_if(item.has_portability, bonuses.portability),
                bonus_if(item.is_soho, bonuses.soho),
            )
        }
        ProductType::Internet => {
            let bonuses = &rates.internet_bonuses;
            CommissionBreakdown::new(
                base,
                bonus_if(item.has_convergence, bonuses.convergence),
                bonus_if(item.has_portability, bonuses.portability),
                Decimal::ZERO,
            )
        }
        ProductType::Mobile | ProductType::Tv | ProductType::Energy => {
            CommissionBreakdown::new(base, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
        }
    };

    debug!(
        item = %item.id,
        product_type = %item.product_type,
        product = %item.product,
        rank = %item.rank,
        total = %breakdown.total(),
        "priced item"
    );
    Ok(breakdown)
}

/// Recompute every item's convergence flag from the sale's composition.
///
/// A bundle exists when the sale holds both an internet and a mobile item
/// and at least one of them is flagged for convergence. In a bundle the
/// first internet item carries the flag, and so does one premium mobile
/// line: the first flagged one, or the first premium line when the
/// declaration sits on the internet side only (entry order). Every other
/// item has it cleared. Without a bundle no item carries it.
pub fn resolve_convergence(items: &[SaleItem], rates: &RateBook) -> Vec<SaleItem> {
    let is_bundle_side = |t: ProductType| matches!(t, ProductType::Internet | ProductType::Mobile);
    let has_internet = items.iter().any(|i| i.product_type == ProductType::Internet);
    let has_mobile = items.iter().any(|i| i.product_type == ProductType::Mobile);
    let declared = items
        .iter()
        .any(|i| is_bundle_side(i.product_type) && i.has_convergence);
    let bundle = has_internet && has_mobile && declared;

    let first_internet = items
        .iter()
        .position(|i| i.product_type == ProductType::Internet);
    let premium =
        |i: &SaleItem| i.product_type == ProductType::Mobile && rates.is_premium_mobile(&i.product);
    let first_premium_mobile = items
        .iter()
        .position(|i| premium(i) && i.has_convergence)
        .or_else(|| items.iter().position(premium));

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| SaleItem {
            has_convergence: bundle
                && (Some(idx) == first_internet || Some(idx) == first_premium_mobile),
            ..item.clone()
        })
        .collect()
}

/// Commission for every item of `sale` plus the sale total.
///
/// Fails as a whole if any item fails; there is no partial result. An empty
/// sale yields all-zero totals.
pub fn calculate_sale_commission(
    sale: &Sale,
    rates: &RateBook,
) -> Result<SaleCommission, ConfigurationError> {
    let resolved = resolve_convergence(&sale.items, rates);
    let items = resolved
        .iter()
        .map(|item| {
            calculate_personal_commission(item, rates).map(|breakdown| ItemCommission {
                item_id: item.id.clone(),
                product_type: item.product_type,
                breakdown,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let total = items.iter().map(|i| i.breakdown).sum();

    Ok(SaleCommission {
        sale_id: sale.id.clone(),
        items,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use tally_core::{ConsultantId, Rank};

    fn rates() -> RateBook {
        RateBook::default()
    }

    fn mobile(id: &str, plan: &str) -> SaleItem {
        SaleItem::new(id, ProductType::Mobile, plan, Rank::PMC)
    }

    fn internet(id: &str) -> SaleItem {
        SaleItem::new(id, ProductType::Internet, "Zen", Rank::PMC)
    }

    fn sale(items: Vec<SaleItem>) -> Sale {
        Sale::new(
            "S-1",
            ConsultantId::new("alice"),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            items,
        )
    }

    // ------------------------------------------------------------------
    // calculate_personal_commission
    // ------------------------------------------------------------------

    #[test]
    fn premium_mobile_with_all_flags() {
        let item = mobile("m", "Large")
            .with_convergence(true)
            .with_portability(true)
            .with_soho(true);
        let b = calculate_personal_commission(&item, &rates()).unwrap();
        assert_eq!(b.base(), dec!(55));
        assert_eq!(b.convergence_bonus(), dec!(12));
        assert_eq!(b.portability_bonus(), dec!(20));
        assert_eq!(b.soho_bonus(), dec!(15));
        assert_eq!(b.total(), dec!(102));
    }

    #[test]
    fn low_tier_mobile_never_gets_bonuses() {
        for plan in ["Child", "Small"] {
            let item = mobile("m", plan)
                .with_convergence(true)
                .with_portability(true)
                .with_soho(true);
            let b = calculate_personal_commission(&item, &rates()).unwrap();
            assert_eq!(b.total(), b.base(), "{plan} earned a bonus");
        }
    }

    #[test]
    fn internet_bonuses_are_ungated() {
        let item = internet("i").with_convergence(true).with_portability(true);
        let b = calculate_personal_commission(&item, &rates()).unwrap();
        assert_eq!(b.base(), dec!(20));
        assert_eq!(b.convergence_bonus(), dec!(15));
        assert_eq!(b.portability_bonus(), dec!(12));
        assert_eq!(b.soho_bonus(), dec!(0));
    }

    #[test]
    fn bc_internet_rate() {
        let item = SaleItem::new("i", ProductType::Internet, "Start", Rank::BC);
        assert_eq!(calculate_personal_commission(&item, &rates()).unwrap().base(), dec!(15));
    }

    #[test]
    fn tv_and_energy_ignore_flags() {
        let tv = SaleItem::new("t", ProductType::Tv, "TV Life", Rank::SC).with_portability(true);
        assert_eq!(calculate_personal_commission(&tv, &rates()).unwrap().total(), dec!(10));
        let energy = SaleItem::new("e", ProductType::Energy, "SoHo", Rank::BC).with_soho(true);
        assert_eq!(calculate_personal_commission(&energy, &rates()).unwrap().total(), dec!(40));
    }

    #[test]
    fn unknown_plan_fails_loudly() {
        let item = mobile("m", "Jumbo");
        assert!(matches!(
            calculate_personal_commission(&item, &rates()),
            Err(ConfigurationError::UnknownProduct { .. })
        ));
    }

    // ------------------------------------------------------------------
    // resolve_convergence / calculate_sale_commission
    // ------------------------------------------------------------------

    #[test]
    fn bundle_grants_both_sides() {
        let s = sale(vec![internet("i"), mobile("m", "Medium").with_convergence(true)]);
        let c = calculate_sale_commission(&s, &rates()).unwrap();
        assert_eq!(c.items[0].breakdown.convergence_bonus(), dec!(15));
        assert_eq!(c.items[1].breakdown.convergence_bonus(), dec!(12));
        assert_eq!(c.total_amount(), dec!(87));
    }

    #[test]
    fn bundle_is_order_independent() {
        let a = sale(vec![internet("i"), mobile("m", "Medium").with_convergence(true)]);
        let b = sale(vec![mobile("m", "Medium").with_convergence(true), internet("i")]);
        let ca = calculate_sale_commission(&a, &rates()).unwrap();
        let cb = calculate_sale_commission(&b, &rates()).unwrap();
        assert_eq!(ca.total, cb.total);
    }

    #[test]
    fn only_first_premium_line_gets_mobile_convergence() {
        let s = sale(vec![
            mobile("m1", "Small").with_convergence(true),
            mobile("m2", "Medium").with_convergence(true),
            internet("i").with_convergence(true),
            mobile("m3", "Unlimited").with_convergence(true),
        ]);
        let c = calculate_sale_commission(&s, &rates()).unwrap();
        let conv: Vec<_> = c.items.iter().map(|i| i.breakdown.convergence_bonus()).collect();
        assert_eq!(conv, vec![dec!(0), dec!(12), dec!(15), dec!(0)]);
    }

    #[test]
    fn flagged_premium_line_wins_over_earlier_unflagged_one() {
        let s = sale(vec![
            internet("i").with_convergence(true),
            mobile("m1", "Medium"),
            mobile("m2", "Large").with_convergence(true),
        ]);
        let c = calculate_sale_commission(&s, &rates()).unwrap();
        let conv: Vec<_> = c.items.iter().map(|i| i.breakdown.convergence_bonus()).collect();
        assert_eq!(conv, vec![dec!(15), dec!(0), dec!(12)]);

        // Declared on the internet side only: the first premium line is used.
        let s = sale(vec![
            internet("i").with_convergence(true),
            mobile("m1", "Medium"),
            mobile("m2", "Large"),
        ]);
        let c = calculate_sale_commission(&s, &rates()).unwrap();
        let conv: Vec<_> = c.items.iter().map(|i| i.breakdown.convergence_bonus()).collect();
        assert_eq!(conv, vec![dec!(15), dec!(12), dec!(0)]);
    }

    #[test]
    fn no_bundle_without_counterpart() {
        let s = sale(vec![
            mobile("m1", "Medium").with_convergence(true),
            mobile("m2", "Large").with_convergence(true),
        ]);
        let c = calculate_sale_commission(&s, &rates()).unwrap();
        assert_eq!(c.total.convergence_bonus(), dec!(0));
    }

    #[test]
    fn no_bundle_without_declaration() {
        let s = sale(vec![internet("i"), mobile("m", "Medium")]);
        let c = calculate_sale_commission(&s, &rates()).unwrap();
        assert_eq!(c.total.convergence_bonus(), dec!(0));
    }

    #[test]
    fn empty_sale_is_all_zero() {
        let c = calculate_sale_commission(&sale(vec![]), &rates()).unwrap();
        assert!(c.items.is_empty());
        assert_eq!(c.total, CommissionBreakdown::ZERO);
    }

    #[test]
    fn one_bad_item_fails_the_sale() {
        let s = sale(vec![internet("i"), mobile("m", "Giant")]);
        assert!(calculate_sale_commission(&s, &rates()).is_err());
    }

    #[test]
    fn resolve_does_not_touch_other_flags() {
        let items = vec![mobile("m", "Medium").with_portability(true).with_convergence(true)];
        let resolved = resolve_convergence(&items, &rates());
        assert!(!resolved[0].has_convergence);
        assert!(resolved[0].has_portability);
        assert!(items[0].has_convergence);
    }

    fn arb_item() -> impl Strategy<Value = SaleItem> {
        let plans = prop::sample::select(vec![
            (ProductType::Mobile, "Child"),
            (ProductType::Mobile, "Small"),
            (ProductType::Mobile, "Medium"),
            (ProductType::Mobile, "Large"),
            (ProductType::Mobile, "Unlimited"),
            (ProductType::Internet, "Zen"),
            (ProductType::Tv, "TV Plus"),
            (ProductType::Energy, "Residential"),
        ]);
        (plans, 0usize..7, any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |((t, p), r, conv, port, soho)| {
                SaleItem::new("x", t, p, Rank::from_index(r).unwrap())
                    .with_convergence(conv)
                    .with_portability(port)
                    .with_soho(soho)
            },
        )
    }

    proptest! {
        #[test]
        fn total_equals_component_sum(item in arb_item()) {
            let b = calculate_personal_commission(&item, &rates()).unwrap();
            prop_assert_eq!(
                b.total(),
                b.base() + b.convergence_bonus() + b.portability_bonus() + b.soho_bonus()
            );
        }

        #[test]
        fn sale_total_is_permutation_invariant(
            items in prop::collection::vec(arb_item(), 0..6),
            rotate in 0usize..6,
        ) {
            let mut rotated = items.clone();
            if !rotated.is_empty() {
                let k = rotate % rotated.len();
                rotated.rotate_left(k);
            }
            let a = calculate_sale_commission(&sale(items), &rates()).unwrap();
            let b = calculate_sale_commission(&sale(rotated), &rates()).unwrap();
            prop_assert_eq!(a.total_amount(), b.total_amount());
        }
    }
}
