//! Trait seams to the external record store and team directory.
//!
//! - [`SaleStore`]: read/write access to sale records (storage layer implements)
//! - [`TeamDirectory`]: consultant rank and sponsor chain (identity layer implements)
//!
//! The engine never assumes it is the only writer. Status changes go through
//! [`SaleStore::save_sale`] with the version the caller read, and the store
//! rejects the write if someone else got there first.

use std::collections::HashMap;

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::{StorageError, TallyError};
use crate::types::{ConsultantId, Rank, Sale, SponsorChain};

/// Read/write access to sale records.
pub trait SaleStore: Send + Sync {
    /// Look up a sale by id. Returns `None` if unknown.
    fn get_sale(&self, id: &str) -> Result<Option<Sale>, TallyError>;

    /// All sales made by `consultant`, in entry order.
    fn sales_for(&self, consultant: &ConsultantId) -> Result<Vec<Sale>, TallyError>;

    /// Compare-and-swap write. `sale.version` must be exactly one ahead of
    /// the stored version, otherwise [`StorageError::VersionConflict`].
    fn save_sale(&self, sale: &Sale) -> Result<(), TallyError>;
}

/// Consultant profile as seen by the engine.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConsultantProfile {
    pub id: ConsultantId,
    pub rank: Rank,
    #[serde(default)]
    pub sponsors: SponsorChain,
    /// First day in the network; the Personal Quick Start window opens here.
    pub start_date: NaiveDate,
}

/// Consultant ranks and sponsor chains.
pub trait TeamDirectory: Send + Sync {
    fn profile(&self, id: &ConsultantId) -> Result<ConsultantProfile, TallyError>;

    fn sponsor_chain(&self, id: &ConsultantId) -> Result<SponsorChain, TallyError> {
        Ok(self.profile(id)?.sponsors)
    }
}

/// Process-local store holding sales and consultant profiles.
///
/// Used by the CLI and in tests. Safe to share between threads; each write
/// is serialized by the inner lock.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sales: RwLock<Vec<Sale>>,
    consultants: RwLock<HashMap<ConsultantId, ConsultantProfile>>,
}

/// Serialized snapshot accepted by [`InMemoryStore::from_json_str`].
#[derive(Deserialize)]
struct Snapshot {
    #[serde(default)]
    consultants: Vec<ConsultantProfile>,
    #[serde(default)]
    sales: Vec<Sale>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(consultants: Vec<ConsultantProfile>, sales: Vec<Sale>) -> Self {
        Self {
            sales: RwLock::new(sales),
            consultants: RwLock::new(consultants.into_iter().map(|c| (c.id.clone(), c)).collect()),
        }
    }

    /// Load `{"consultants": [...], "sales": [...]}`.
    pub fn from_json_str(json: &str) -> Result<Self, TallyError> {
        let snapshot: Snapshot = serde_json::from_str(json)
            .map_err(|e| StorageError::Backend(format!("invalid snapshot: {e}")))?;
        Ok(Self::with_records(snapshot.consultants, snapshot.sales))
    }

    pub fn insert_sale(&self, sale: Sale) {
        self.sales.write().push(sale);
    }

    pub fn insert_consultant(&self, profile: ConsultantProfile) {
        self.consultants.write().insert(profile.id.clone(), profile);
    }

    pub fn all_sales(&self) -> Vec<Sale> {
        self.sales.read().clone()
    }
}

impl SaleStore for InMemoryStore {
    fn get_sale(&self, id: &str) -> Result<Option<Sale>, TallyError> {
        Ok(self.sales.read().iter().find(|s| s.id == id).cloned())
    }

    fn sales_for(&self, consultant: &ConsultantId) -> Result<Vec<Sale>, TallyError> {
        Ok(self
            .sales
            .read()
            .iter()
            .filter(|s| &s.consultant == consultant)
            .cloned()
            .collect())
    }

    fn save_sale(&self, sale: &Sale) -> Result<(), TallyError> {
        let mut sales = self.sales.write();
        let stored = sales
            .iter_mut()
            .find(|s| s.id == sale.id)
            .ok_or_else(|| StorageError::SaleNotFound(sale.id.clone()))?;
        if stored.version + 1 != sale.version {
            return Err(StorageError::VersionConflict {
                sale_id: sale.id.clone(),
                expected: sale.version.saturating_sub(1),
                found: stored.version,
            }
            .into());
        }
        *stored = sale.clone();
        Ok(())
    }
}

impl TeamDirectory for InMemoryStore {
    fn profile(&self, id: &ConsultantId) -> Result<ConsultantProfile, TallyError> {
        self.consultants
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::ConsultantNotFound(id.to_string()).into())
    }
}
