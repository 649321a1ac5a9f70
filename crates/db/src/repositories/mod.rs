use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use linebook_core::domain::catalog::{CatalogEntry, CatalogEntryId, Unit};
use linebook_core::domain::line_item::{JobId, LineItem, LineItemId};

pub mod catalog;
pub mod line_item;
pub mod memory;

pub use catalog::SqlCatalogRepository;
pub use line_item::SqlLineItemRepository;
pub use memory::{InMemoryCatalogRepository, InMemoryLineItemRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("line number conflict for job `{job_id}` after {attempts} attempts")]
    LineNumberConflict { job_id: String, attempts: u32 },
    #[error("catalog position conflict for entry `{entry_id}` after {attempts} attempts")]
    PositionConflict { entry_id: String, attempts: u32 },
}

pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Row to be inserted on the create path. `line_no` and timestamps are
/// assigned by the repository so that numbering stays atomic.
#[derive(Clone, Debug, PartialEq)]
pub struct NewLineItem {
    pub id: LineItemId,
    pub job_id: JobId,
    pub description_raw: String,
    pub description_clean: String,
    pub category_id: Option<CatalogEntryId>,
    pub unit: Unit,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub ai_confidence: f64,
    pub finalized: bool,
    pub taxable: bool,
    pub taxable_amount: Option<Decimal>,
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Entries in their defined catalog order; this order is the matcher's
    /// precedence contract.
    async fn list_entries(&self) -> Result<Vec<CatalogEntry>, RepositoryError>;
    async fn find_by_id(&self, id: &CatalogEntryId)
        -> Result<Option<CatalogEntry>, RepositoryError>;
    async fn save(&self, entry: CatalogEntry) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait LineItemRepository: Send + Sync {
    async fn find_by_id(&self, id: &LineItemId) -> Result<Option<LineItem>, RepositoryError>;
    async fn list_for_job(&self, job_id: &JobId) -> Result<Vec<LineItem>, RepositoryError>;
    /// Insert with an atomically assigned `line_no` (max per job + 1). Two
    /// concurrent creates on the same job must never persist the same
    /// number.
    async fn create(&self, item: NewLineItem) -> Result<LineItem, RepositoryError>;
    async fn update(&self, item: LineItem) -> Result<(), RepositoryError>;
}
