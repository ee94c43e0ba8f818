//! # tally-core
//! Foundation types, versioned rate tables and trait seams for the Tally
//! commission engine.

pub mod defaults;
pub mod error;
pub mod rates;
pub mod store;
pub mod types;

pub use error::{ConfigurationError, InvalidInputError, StorageError, TallyError};
pub use rates::{RateBook, RateSchedule};
pub use types::{
    ClawbackOutcome, CommissionBreakdown, ConsultantId, FidelityLedgerEntry, Period, ProductType,
    Rank, Sale, SaleItem, SaleStatus, SponsorChain, UplinePayout,
};
