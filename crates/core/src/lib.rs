pub mod config;
pub mod domain;
pub mod errors;
pub mod interpret;

pub use domain::catalog::{CatalogEntry, CatalogEntryId, Unit};
pub use domain::line_item::{JobId, LineItem, LineItemId, LineItemPatch};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use interpret::confidence::aggregate_confidence;
pub use interpret::extractor::{extract_quantity, QuantityMatch};
pub use interpret::matcher::{Catalog, CategoryMatch};
pub use interpret::normalize::normalize;
