//! Monthly fidelity (recurring) commission.
//!
//! Each item maps to a fidelity service. The seller earns the service's
//! monthly rate for every month the sale accrues; sponsors earn a share of
//! that personal amount by level. TV has no fidelity service.

use rust_decimal::Decimal;
use tally_core::{
    ConfigurationError, FidelityLedgerEntry, Period, ProductType, RateBook, Rank, Sale, SaleItem,
    SaleStatus, SponsorChain, TallyError,
};

use crate::upline::upline_amount;

/// Fidelity service an item pays under, or `None` if it earns no fidelity.
///
/// A product listed in the fidelity table under its own name is its own
/// service; otherwise mobile plans map to `Mobile <plan>` and internet and
/// energy to their generic services.
pub fn fidelity_service(item: &SaleItem, rates: &RateBook) -> Option<String> {
    if item.product_type == ProductType::Tv {
        return None;
    }
    if rates.has_fidelity_service(&item.product) {
        return Some(item.product.clone());
    }
    match item.product_type {
        ProductType::Mobile => Some(format!("Mobile {}", item.product)),
        ProductType::Internet => Some("Internet".to_string()),
        ProductType::Energy => Some("Energy".to_string()),
        ProductType::Tv => None,
    }
}

/// Monthly amount the seller earns on `service` at `rank`.
pub fn personal_fidelity(
    service: &str,
    rank: Rank,
    rates: &RateBook,
) -> Result<Decimal, ConfigurationError> {
    rates.fidelity_rate(service, rank)
}

/// Monthly amount the sponsor at `level` earns from a seller's
/// `personal_amount` on `service`.
pub fn upline_fidelity(
    personal_amount: Decimal,
    service: &str,
    level: u8,
    rates: &RateBook,
) -> Result<Decimal, TallyError> {
    upline_amount(personal_amount, rates.upline_fidelity_shares(service)?, level)
}

/// Whether `sale` pays fidelity for `period`.
///
/// The activation month pays in full. A cancelled sale stops paying from the
/// month it was cancelled in.
pub fn accrues_in(sale: &Sale, period: Period) -> bool {
    let started = sale.sale_date <= period.last_day();
    match sale.status {
        SaleStatus::Pending => false,
        SaleStatus::Active => started,
        SaleStatus::Cancelled => {
            started && sale.cancelled_on.is_some_and(|on| on > period.last_day())
        }
    }
}

/// Ledger entries for one month: a personal entry per fidelity-bearing item
/// plus one entry per sponsor in `chain`.
pub fn fidelity_for_month(
    sale: &Sale,
    chain: &SponsorChain,
    period: Period,
    rates: &RateBook,
) -> Result<Vec<FidelityLedgerEntry>, TallyError> {
    if !accrues_in(sale, period) {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for item in &sale.items {
        let Some(service) = fidelity_service(item, rates) else {
            continue;
        };
        let monthly_rate = personal_fidelity(&service, item.rank, rates)?;
        let shares = rates.upline_fidelity_shares(&service)?;
        let entry = |beneficiary, level, share, amount| FidelityLedgerEntry {
            sale_id: sale.id.clone(),
            item_id: item.id.clone(),
            period,
            service: service.clone(),
            rank: item.rank,
            monthly_rate,
            beneficiary,
            level,
            share,
            amount,
        };

        entries.push(entry(sale.consultant.clone(), None, None, monthly_rate));
        for (level, sponsor) in chain.levels() {
            let amount = upline_amount(monthly_rate, shares, level)?;
            entries.push(entry(
                sponsor.clone(),
                Some(level),
                Some(shares.share(level)?),
                amount,
            ));
        }
    }
    Ok(entries)
}

/// Personal fidelity the seller has accrued from activation through
/// `through`, inclusive.
pub fn accrued_fidelity(
    sale: &Sale,
    through: Period,
    rates: &RateBook,
) -> Result<Decimal, TallyError> {
    if sale.status == SaleStatus::Pending {
        return Ok(Decimal::ZERO);
    }

    let mut monthly = Decimal::ZERO;
    for item in &sale.items {
        if let Some(service) = fidelity_service(item, rates) {
            monthly += personal_fidelity(&service, item.rank, rates)?;
        }
    }

    let mut total = Decimal::ZERO;
    let mut period = Period::containing(sale.sale_date)?;
    while period <= through {
        if accrues_in(sale, period) {
            total += monthly;
        }
        period = period.next()?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tally_core::ConsultantId;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(y: i32, m: u32) -> Period {
        Period::new(y, m).unwrap()
    }

    fn rates() -> RateBook {
        RateBook::default()
    }

    fn sale(items: Vec<SaleItem>) -> Sale {
        Sale::new("S-1", ConsultantId::new("alice"), date(2025, 1, 20), items)
    }

    fn chain(n: usize) -> SponsorChain {
        SponsorChain::new((1..=n).map(|i| ConsultantId::new(format!("s{i}"))).collect()).unwrap()
    }

    #[test]
    fn service_mapping() {
        let r = rates();
        let m = SaleItem::new("m", ProductType::Mobile, "Large", Rank::BC);
        assert_eq!(fidelity_service(&m, &r).as_deref(), Some("Mobile Large"));
        let i = SaleItem::new("i", ProductType::Internet, "Giga", Rank::BC);
        assert_eq!(fidelity_service(&i, &r).as_deref(), Some("Internet"));
        let e = SaleItem::new("e", ProductType::Energy, "SoHo", Rank::BC);
        assert_eq!(fidelity_service(&e, &r).as_deref(), Some("Energy"));
        let t = SaleItem::new("t", ProductType::Tv, "TV", Rank::BC);
        assert_eq!(fidelity_service(&t, &r), None);
        let go = SaleItem::new("g", ProductType::Mobile, "Go Plus", Rank::BC);
        assert_eq!(fidelity_service(&go, &r).as_deref(), Some("Go Plus"));
    }

    #[test]
    fn personal_rates() {
        let r = rates();
        assert_eq!(personal_fidelity("Internet", Rank::SC, &r).unwrap(), dec!(0.35));
        assert_eq!(personal_fidelity("Mobile Unlimited", Rank::BC, &r).unwrap(), dec!(1.50));
        assert!(matches!(
            personal_fidelity("Satellite", Rank::BC, &r),
            Err(ConfigurationError::UnknownFidelityService(_))
        ));
    }

    #[test]
    fn upline_share_of_personal() {
        let r = rates();
        let shares = r.upline_fidelity_shares("Internet").unwrap();
        let expected = dec!(0.35) * shares.share(1).unwrap();
        assert_eq!(upline_fidelity(dec!(0.35), "Internet", 1, &r).unwrap(), expected);
        assert!(upline_fidelity(dec!(0.35), "Internet", 0, &r).is_err());
    }

    #[test]
    fn activation_month_accrues_in_full() {
        let s = sale(vec![]);
        assert!(!accrues_in(&s, period(2024, 12)));
        assert!(accrues_in(&s, period(2025, 1)));
        assert!(accrues_in(&s, period(2025, 6)));
    }

    #[test]
    fn cancellation_month_pays_nothing() {
        let s = sale(vec![]).cancel(date(2025, 3, 10)).unwrap();
        assert!(accrues_in(&s, period(2025, 2)));
        assert!(!accrues_in(&s, period(2025, 3)));
        assert!(!accrues_in(&s, period(2025, 4)));
    }

    #[test]
    fn pending_never_accrues() {
        let mut s = sale(vec![]);
        s.status = SaleStatus::Pending;
        assert!(!accrues_in(&s, period(2025, 2)));
    }

    #[test]
    fn monthly_entries_for_personal_and_upline() {
        let s = sale(vec![
            SaleItem::new("i", ProductType::Internet, "Zen", Rank::PC),
            SaleItem::new("t", ProductType::Tv, "TV", Rank::PC),
        ]);
        let entries = fidelity_for_month(&s, &chain(2), period(2025, 2), &rates()).unwrap();
        assert_eq!(entries.len(), 3);

        let personal = &entries[0];
        assert_eq!(personal.beneficiary, ConsultantId::new("alice"));
        assert_eq!(personal.level, None);
        assert_eq!(personal.amount, dec!(0.35));
        assert_eq!(personal.period.to_string(), "2025-02");

        assert_eq!(entries[1].level, Some(1));
        assert_eq!(entries[2].beneficiary, ConsultantId::new("s2"));
        for (upline, level) in entries[1..].iter().zip(1u8..) {
            let expected = upline_fidelity(dec!(0.35), "Internet", level, &rates()).unwrap();
            assert_eq!(upline.amount, expected);
            assert_eq!(upline.amount, dec!(0.35) * upline.share.unwrap());
        }
        assert!(entries.iter().all(|e| e.item_id == "i"));
    }

    #[test]
    fn no_entries_outside_accrual() {
        let s = sale(vec![SaleItem::new("i", ProductType::Internet, "Zen", Rank::PC)]);
        assert!(fidelity_for_month(&s, &chain(1), period(2024, 11), &rates())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn accrued_sums_active_months() {
        let s = sale(vec![
            SaleItem::new("i", ProductType::Internet, "Zen", Rank::PC),
            SaleItem::new("m", ProductType::Mobile, "Medium", Rank::PC),
        ]);
        // Jan..=Apr, 1.35 per month.
        assert_eq!(accrued_fidelity(&s, period(2025, 4), &rates()).unwrap(), dec!(5.40));

        let cancelled = s.cancel(date(2025, 3, 1)).unwrap();
        assert_eq!(
            accrued_fidelity(&cancelled, period(2025, 12), &rates()).unwrap(),
            dec!(2.70)
        );
    }

    #[test]
    fn accrued_before_activation_is_zero() {
        let s = sale(vec![SaleItem::new("i", ProductType::Internet, "Zen", Rank::PC)]);
        assert_eq!(accrued_fidelity(&s, period(2024, 6), &rates()).unwrap(), Decimal::ZERO);
    }
}
