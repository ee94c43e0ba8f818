//! Error types for the Tally engine.
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{ProductType, SaleStatus};

/// A rate-table lookup failed. Surfaced to callers, never defaulted to zero.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("unknown {product_type} product: {product}")] UnknownProduct { product_type: ProductType, product: String },
    #[error("unknown fidelity service: {0}")] UnknownFidelityService(String),
    #[error("no upline shares configured for {0}")] MissingUplineShares(String),
    #[error("no ASP rate for {product_type} product {product}")] MissingAspRate { product_type: ProductType, product: String },
    #[error("unknown incentive tier: {0}")] UnknownTier(String),
    #[error("no rewards configured for tier {0}")] MissingRewards(String),
    #[error("no point award configured for {0}")] MissingPointAward(String),
    #[error("no rate version in effect on {0}")] NoRateVersion(NaiveDate),
    #[error("invalid rate data: {0}")] InvalidRates(String),
}

/// The caller passed a value outside the domain of the calculation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInputError {
    #[error("rank index out of range: {0}")] RankOutOfRange(usize),
    #[error("unknown rank: {0}")] UnknownRank(String),
    #[error("unknown product type: {0}")] UnknownProductType(String),
    #[error("negative months active: {0}")] NegativeMonthsActive(Decimal),
    #[error("upline level out of range: {0} (expected 1-7)")] UplineLevelOutOfRange(u8),
    #[error("sponsor chain too long: {0} > 7")] SponsorChainTooLong(usize),
    #[error("invalid status transition: {from} -> {to}")] StatusTransition { from: SaleStatus, to: SaleStatus },
    #[error("cancellation on {cancelled_on} precedes sale date {sale_date}")] CancelledBeforeSale { sale_date: NaiveDate, cancelled_on: NaiveDate },
    #[error("cancelled sale {0} has no cancellation date")] MissingCancellationDate(String),
    #[error("invalid period: {year}-{month}")] InvalidPeriod { year: i32, month: u32 },
}

/// Failures raised by the external record store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("sale not found: {0}")] SaleNotFound(String),
    #[error("consultant not found: {0}")] ConsultantNotFound(String),
    #[error("version conflict on sale {sale_id}: expected {expected}, found {found}")] VersionConflict { sale_id: String, expected: u64, found: u64 },
    #[error("backend: {0}")] Backend(String),
}

#[derive(Error, Debug)]
pub enum TallyError {
    #[error(transparent)] Configuration(#[from] ConfigurationError),
    #[error(transparent)] InvalidInput(#[from] InvalidInputError),
    #[error(transparent)] Storage(#[from] StorageError),
}

impl TallyError {
    /// Message safe to show to end users.
    ///
    /// Configuration and storage details stay in the operator logs; only
    /// invalid-input errors are echoed back verbatim.
    pub fn public_message(&self) -> String {
        match self {
            Self::Configuration(_) => "commission rates are not configured for this sale".to_string(),
            Self::InvalidInput(e) => e.to_string(),
            Self::Storage(StorageError::SaleNotFound(id)) => format!("sale not found: {id}"),
            Self::Storage(StorageError::VersionConflict { .. }) => {
                "sale was modified concurrently, retry".to_string()
            }
            Self::Storage(_) => "record store unavailable".to_string(),
        }
    }

    /// Whether the error should map to a client-side (4xx) response.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(StorageError::Backend(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_details_are_not_public() {
        let err = TallyError::from(ConfigurationError::UnknownProduct {
            product_type: ProductType::Mobile,
            product: "Mediun".into(),
        });
        assert!(err.to_string().contains("Mediun"));
        assert!(!err.public_message().contains("Mediun"));
    }

    #[test]
    fn invalid_input_is_echoed() {
        let err = TallyError::from(InvalidInputError::UplineLevelOutOfRange(9));
        assert_eq!(err.public_message(), "upline level out of range: 9 (expected 1-7)");
        assert!(err.is_client_error());
    }

    #[test]
    fn backend_failure_is_server_side() {
        let err = TallyError::from(StorageError::Backend("disk full".into()));
        assert!(!err.is_client_error());
        assert_eq!(err.public_message(), "record store unavailable");
    }
}
