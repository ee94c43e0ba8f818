//! Property tests over randomized sales.
//!
//! Invariants checked:
//! - keep + clawback equals the commission, for every tenure and status
//! - sale totals do not depend on item order
//! - low-tier mobile plans never earn bonuses
//! - unlocked tiers only grow as points are recorded
//! - upline payouts never exceed the commission they are drawn from

use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_core::{ConsultantId, ProductType, RateBook, Rank, SaleItem, SaleStatus};
use tally_engine::clawback::calculate_clawback;
use tally_engine::commission::calculate_sale_commission;
use tally_engine::{CommissionEngine, IncentiveLedger};
use tally_tests::helpers::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_rank() -> impl Strategy<Value = Rank> {
    prop::sample::select(Rank::ALL.to_vec())
}

fn arb_item() -> impl Strategy<Value = SaleItem> {
    let products = prop::sample::select(vec![
        (ProductType::Mobile, "Child"),
        (ProductType::Mobile, "Small"),
        (ProductType::Mobile, "Medium"),
        (ProductType::Mobile, "Large"),
        (ProductType::Mobile, "Unlimited"),
        (ProductType::Internet, "Start"),
        (ProductType::Internet, "Zen"),
        (ProductType::Internet, "Giga"),
        (ProductType::Tv, "TV Life"),
        (ProductType::Tv, "TV"),
        (ProductType::Tv, "TV Plus"),
        (ProductType::Energy, "Residential"),
        (ProductType::Energy, "SoHo"),
        (ProductType::Energy, "Maintenance"),
    ]);
    (products, arb_rank(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |((t, p), rank, conv, port, soho)| {
            SaleItem::new(p, t, p, rank)
                .with_convergence(conv)
                .with_portability(port)
                .with_soho(soho)
        },
    )
}

fn arb_items() -> impl Strategy<Value = Vec<SaleItem>> {
    prop::collection::vec(arb_item(), 0..8)
}

/// A list of items and a permutation of it.
fn arb_items_and_shuffle() -> impl Strategy<Value = (Vec<SaleItem>, Vec<SaleItem>)> {
    arb_items().prop_flat_map(|items| (Just(items.clone()), Just(items).prop_shuffle()))
}

fn arb_status() -> impl Strategy<Value = SaleStatus> {
    prop::sample::select(vec![SaleStatus::Pending, SaleStatus::Active, SaleStatus::Cancelled])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn keep_plus_clawback_is_exact(
        cents in 0i64..100_000_000,
        thousandths in 0i64..120_000,
        status in arb_status(),
    ) {
        let schedule = RateBook::default().clawback;
        let commission = Decimal::new(cents, 2);
        let months = Decimal::new(thousandths, 3);
        let out = calculate_clawback(commission, months, status, &schedule).unwrap();
        prop_assert_eq!(out.keep_amount + out.clawback_amount, commission);
        if status == SaleStatus::Cancelled {
            prop_assert!(out.keep_amount.is_zero());
        }
    }

    #[test]
    fn sale_total_ignores_item_order((items, shuffled) in arb_items_and_shuffle()) {
        let rates = RateBook::default();
        let a = calculate_sale_commission(&sale("A", date(2025, 1, 1), items), &rates).unwrap();
        let b = calculate_sale_commission(&sale("B", date(2025, 1, 1), shuffled), &rates).unwrap();
        prop_assert_eq!(a.total, b.total);
    }

    #[test]
    fn at_most_one_mobile_convergence_per_sale(items in arb_items()) {
        let rates = RateBook::default();
        let c = calculate_sale_commission(&sale("S", date(2025, 1, 1), items), &rates).unwrap();
        let mobile_conv = c
            .items
            .iter()
            .filter(|i| i.product_type == ProductType::Mobile && !i.breakdown.convergence_bonus().is_zero())
            .count();
        prop_assert!(mobile_conv <= 1);
    }

    #[test]
    fn low_tier_mobile_is_base_only(items in arb_items()) {
        let rates = RateBook::default();
        let s = sale("S", date(2025, 1, 1), items.clone());
        let c = calculate_sale_commission(&s, &rates).unwrap();
        for (item, priced) in items.iter().zip(&c.items) {
            if item.product_type == ProductType::Mobile && !rates.is_premium_mobile(&item.product) {
                prop_assert_eq!(priced.breakdown.total(), priced.breakdown.base());
            }
        }
    }

    #[test]
    fn unlocked_tiers_never_shrink(sales in prop::collection::vec(arb_items(), 0..30)) {
        let engine = CommissionEngine::default();
        let tiers = engine.schedule().latest().tiers();
        let mut ledger = IncentiveLedger::new(ConsultantId::new("alice"));
        let mut unlocked = 0;
        for (n, items) in sales.into_iter().enumerate() {
            let s = sale(&format!("S-{n}"), date(2025, 1, 1), items);
            ledger = engine.record_sale(&ledger, &s).unwrap().ledger;
            let now = ledger.unlocked_tiers(tiers).len();
            prop_assert!(now >= unlocked);
            unlocked = now;
        }
    }

    #[test]
    fn upline_never_exceeds_commission(items in arb_items(), depth in 0usize..=7) {
        let engine = CommissionEngine::default();
        let s = sale("S", date(2025, 1, 1), items);
        let out = engine.settle(&s, &chain(depth), date(2025, 12, 1)).unwrap();
        let paid: Decimal = out.upline_totals.iter().map(|t| t.amount).sum();
        prop_assert!(paid <= out.commission.total_amount());
        prop_assert_eq!(out.upline_totals.len(), if s.items.is_empty() { 0 } else { depth });
    }
}
