use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntryId(pub String);

/// Billing unit for a price-book entry. The wire format accepts the common
/// contractor spellings (`sf`, `hr`, ...) but the canonical form is fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Each,
    Sqft,
    Lf,
    Hour,
    Day,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Each => "each",
            Self::Sqft => "sqft",
            Self::Lf => "lf",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Unit {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "each" | "ea" => Ok(Self::Each),
            "sqft" | "sf" | "sq ft" | "square feet" | "square foot" => Ok(Self::Sqft),
            "lf" | "linear feet" | "linear foot" => Ok(Self::Lf),
            "hour" | "hr" | "hours" | "hrs" => Ok(Self::Hour),
            "day" | "days" => Ok(Self::Day),
            other => Err(DomainError::UnknownUnit { value: other.to_string() }),
        }
    }
}

/// One contractor-curated price-book definition. Read-only to the
/// interpretation pipeline; managed elsewhere.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: CatalogEntryId,
    pub name: String,
    pub unit: Unit,
    pub default_price: Decimal,
    pub aliases: Vec<String>,
}

impl CatalogEntry {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvariantViolation(
                "catalog entry name must not be empty".to_string(),
            ));
        }
        if self.default_price < Decimal::ZERO {
            return Err(DomainError::InvariantViolation(format!(
                "catalog entry `{}` has negative default price {}",
                self.id.0, self.default_price
            )));
        }
        Ok(())
    }
}
