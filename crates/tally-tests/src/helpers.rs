//! Shared builders for scenario and property tests.

use chrono::NaiveDate;
use tally_core::{ConsultantId, ProductType, Rank, Sale, SaleItem, SponsorChain};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn mobile(id: &str, plan: &str, rank: Rank) -> SaleItem {
    SaleItem::new(id, ProductType::Mobile, plan, rank)
}

pub fn internet(id: &str, plan: &str, rank: Rank) -> SaleItem {
    SaleItem::new(id, ProductType::Internet, plan, rank)
}

pub fn tv(id: &str, package: &str, rank: Rank) -> SaleItem {
    SaleItem::new(id, ProductType::Tv, package, rank)
}

pub fn energy(id: &str, category: &str, rank: Rank) -> SaleItem {
    SaleItem::new(id, ProductType::Energy, category, rank)
}

/// Active sale by `alice` on `on`.
pub fn sale(id: &str, on: NaiveDate, items: Vec<SaleItem>) -> Sale {
    Sale::new(id, ConsultantId::new("alice"), on, items)
}

/// Sponsor chain `sponsor-1..=sponsor-n`.
pub fn chain(n: usize) -> SponsorChain {
    SponsorChain::new(
        (1..=n)
            .map(|i| ConsultantId::new(format!("sponsor-{i}")))
            .collect(),
    )
    .unwrap()
}
