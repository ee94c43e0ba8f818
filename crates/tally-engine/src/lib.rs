//! # tally-engine: commission and incentive calculators.
//!
//! All amounts are [`rust_decimal::Decimal`] and nothing is rounded during
//! calculation. Rounding to cents is a presentation step
//! ([`summary::round_currency`]).
//!
//! - **Personal commission**: rank-based base rate plus convergence,
//!   portability and SoHo bonuses, gated to premium mobile plans.
//! - **Upline**: fixed per-level shares of a sale's commission across up to
//!   seven sponsors.
//! - **Fidelity**: monthly recurring amounts per service, personal and upline.
//! - **Clawback**: keep fraction by contract tenure.
//! - **Incentives**: ASP points, the tier ladder, rank-gated rewards and the
//!   Personal Quick Start.

pub mod clawback;
pub mod commission;
pub mod engine;
pub mod fidelity;
pub mod incentive;
pub mod summary;
pub mod upline;

pub use clawback::calculate_clawback;
pub use commission::{calculate_personal_commission, calculate_sale_commission, SaleCommission};
pub use engine::{CommissionEngine, SaleSettlement};
pub use incentive::{IncentiveLedger, LedgerUpdate, QuickStartStatus};
pub use summary::{round_currency, PortfolioSummary};
