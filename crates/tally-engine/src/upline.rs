//! Upline distribution of one-time commission.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tally_core::rates::UplineShares;
use tally_core::{ConsultantId, RateBook, SponsorChain, TallyError, UplinePayout};

use crate::commission::SaleCommission;

/// Amount owed to the sponsor at `level` (1..=7) on `base`.
pub fn upline_amount(
    base: Decimal,
    shares: &UplineShares,
    level: u8,
) -> Result<Decimal, TallyError> {
    Ok(base * shares.share(level)?)
}

/// One payout per sponsor in `chain`. Levels beyond the chain are skipped.
pub fn distribute(
    base: Decimal,
    shares: &UplineShares,
    chain: &SponsorChain,
) -> Result<Vec<UplinePayout>, TallyError> {
    chain
        .levels()
        .map(|(level, consultant)| -> Result<UplinePayout, TallyError> {
            let share = shares.share(level)?;
            Ok(UplinePayout {
                level,
                consultant: consultant.clone(),
                share,
                amount: base * share,
            })
        })
        .collect()
}

/// Upline payouts for one item of a sale.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ItemUplinePayouts {
    pub item_id: String,
    pub payouts: Vec<UplinePayout>,
}

/// What a sponsor receives across every item of a sale.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LevelTotal {
    pub level: u8,
    pub consultant: ConsultantId,
    pub amount: Decimal,
}

/// Distribute each item's commission using the shares for its product type.
pub fn distribute_sale_commission(
    commission: &SaleCommission,
    chain: &SponsorChain,
    rates: &RateBook,
) -> Result<Vec<ItemUplinePayouts>, TallyError> {
    commission
        .items
        .iter()
        .map(|item| -> Result<ItemUplinePayouts, TallyError> {
            let shares = rates.upline_commission_shares(item.product_type)?;
            Ok(ItemUplinePayouts {
                item_id: item.item_id.clone(),
                payouts: distribute(item.breakdown.total(), shares, chain)?,
            })
        })
        .collect()
}

/// Sum per-item payouts into one line per level, ascending.
pub fn totals_by_level(items: &[ItemUplinePayouts]) -> Vec<LevelTotal> {
    let mut totals: BTreeMap<u8, LevelTotal> = BTreeMap::new();
    for payout in items.iter().flat_map(|i| &i.payouts) {
        totals
            .entry(payout.level)
            .and_modify(|t| t.amount += payout.amount)
            .or_insert_with(|| LevelTotal {
                level: payout.level,
                consultant: payout.consultant.clone(),
                amount: payout.amount,
            });
    }
    totals.into_values().collect()
}
