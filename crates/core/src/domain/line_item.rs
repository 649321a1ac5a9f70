use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{CatalogEntryId, Unit};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItemId(pub String);

/// One priced row on a job. `ai_confidence` is written only by the
/// interpretation pipeline; once `finalized` is set the orchestrator applies
/// explicit edits only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub job_id: JobId,
    pub line_no: i64,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LineItem {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.job_id.0.trim().is_empty() {
            return Err(DomainError::MissingJobId);
        }
        if self.line_no <= 0 {
            return Err(DomainError::InvariantViolation(format!(
                "line_no must be positive, got {}",
                self.line_no
            )));
        }
        if self.quantity < Decimal::ZERO {
            return Err(DomainError::InvariantViolation("quantity must not be negative".into()));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(DomainError::InvariantViolation("unit_price must not be negative".into()));
        }
        if !(0.0..=1.0).contains(&self.ai_confidence) {
            return Err(DomainError::InvariantViolation(format!(
                "ai_confidence must be within 0.0..=1.0, got {}",
                self.ai_confidence
            )));
        }
        Ok(())
    }

    /// Apply explicitly supplied fields verbatim. Fields absent from the
    /// patch keep their prior persisted values.
    pub fn apply(&mut self, patch: LineItemPatch, now: DateTime<Utc>) {
        if let Some(raw) = patch.description_raw {
            self.description_raw = raw;
        }
        if let Some(clean) = patch.description_clean {
            self.description_clean = clean;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = Some(category_id);
        }
        if let Some(unit) = patch.unit {
            self.unit = unit;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(unit_price) = patch.unit_price {
            self.unit_price = unit_price;
        }
        if let Some(finalized) = patch.finalized {
            self.finalized = finalized;
        }
        if let Some(taxable) = patch.taxable {
            self.taxable = taxable;
        }
        if let Some(taxable_amount) = patch.taxable_amount {
            self.taxable_amount = taxable_amount;
        }
        self.updated_at = now;
    }
}

/// Explicit patch for an existing line item. `None` means "not supplied";
/// for `taxable_amount` the inner `Option` distinguishes an explicit clear
/// (`Some(None)`) from "not supplied" (`None`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineItemPatch {
    pub description_raw: Option<String>,
    pub description_clean: Option<String>,
    pub category_id: Option<CatalogEntryId>,
    pub unit: Option<Unit>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub finalized: Option<bool>,
    pub taxable: Option<bool>,
    pub taxable_amount: Option<Option<Decimal>>,
}

impl LineItemPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::catalog::Unit;

    use super::{JobId, LineItem, LineItemId, LineItemPatch};

    fn item() -> LineItem {
        LineItem {
            id: LineItemId("li-1".to_string()),
            job_id: JobId("job-1".to_string()),
            line_no: 1,
            description_raw: "800 sf of plank flooring".to_string(),
            description_clean: "800 sf of plank flooring.".to_string(),
            category_id: None,
            unit: Unit::Sqft,
            quantity: Decimal::from(800),
            unit_price: Decimal::new(200, 2),
            ai_confidence: 0.9,
            finalized: false,
            taxable: true,
            taxable_amount: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn price_only_patch_leaves_quantity_and_unit_unchanged() {
        let mut item = item();
        let patch =
            LineItemPatch { unit_price: Some(Decimal::new(4550, 2)), ..LineItemPatch::default() };

        item.apply(patch, Utc::now());

        assert_eq!(item.unit_price, Decimal::new(4550, 2));
        assert_eq!(item.quantity, Decimal::from(800));
        assert_eq!(item.unit, Unit::Sqft);
    }

    #[test]
    fn taxable_amount_distinguishes_clear_from_absent() {
        let mut item = item();
        item.taxable_amount = Some(Decimal::new(10_000, 2));

        item.apply(LineItemPatch::default(), Utc::now());
        assert_eq!(item.taxable_amount, Some(Decimal::new(10_000, 2)));

        let clear = LineItemPatch { taxable_amount: Some(None), ..LineItemPatch::default() };
        item.apply(clear, Utc::now());
        assert_eq!(item.taxable_amount, None);
    }

    #[test]
    fn validate_rejects_empty_job_id() {
        let mut item = item();
        item.job_id = JobId("  ".to_string());
        assert!(item.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_confidence() {
        let mut item = item();
        item.ai_confidence = 1.2;
        assert!(item.validate().is_err());
    }
}
