use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use linebook_core::domain::catalog::{CatalogEntryId, Unit};
use linebook_core::domain::line_item::{JobId, LineItemId, LineItemPatch};
use linebook_core::errors::{ApplicationError, DomainError};
use linebook_core::interpret::confidence::aggregate_confidence;
use linebook_core::interpret::extractor::extract_quantity;
use linebook_core::interpret::matcher::Catalog;
use linebook_db::repositories::{
    CatalogRepository, LineItemRepository, NewLineItem, RepositoryError,
};

use crate::polish::RewriterWithFallback;

/// Upsert input. `None` means "not supplied"; for `taxable_amount` the inner
/// `Option` is an explicit clear.
#[derive(Clone, Debug, Default)]
pub struct UpsertRequest {
    pub job_id: String,
    pub item_id: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub unit: Option<Unit>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub finalize: Option<bool>,
    pub taxable: Option<bool>,
    pub taxable_amount: Option<Option<Decimal>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpsertOutcome {
    pub id: LineItemId,
    pub line_no: i64,
    pub created: bool,
    pub ai_confidence: f64,
}

/// Top-level entry point of the interpretation pipeline.
///
/// On create, missing pricing fields are inferred from the description
/// against a catalog rebuilt fresh from the datastore; explicit caller
/// values always win. On update, only explicitly supplied fields are
/// applied, with no inference and no confidence recomputation. Retrying an
/// update with the same `item_id` is idempotent; retrying a create produces
/// a new row, so callers needing at-most-once semantics must not resubmit
/// creates blindly.
pub struct LineItemService {
    catalog: Arc<dyn CatalogRepository>,
    line_items: Arc<dyn LineItemRepository>,
    polisher: RewriterWithFallback,
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

impl LineItemService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        line_items: Arc<dyn LineItemRepository>,
        polisher: RewriterWithFallback,
    ) -> Self {
        Self { catalog, line_items, polisher }
    }

    pub async fn upsert(&self, request: UpsertRequest) -> Result<UpsertOutcome, ApplicationError> {
        if request.job_id.trim().is_empty() {
            return Err(DomainError::MissingJobId.into());
        }
        if request.quantity.is_some_and(|quantity| quantity < Decimal::ZERO) {
            return Err(
                DomainError::InvariantViolation("quantity must not be negative".into()).into()
            );
        }
        if request.unit_price.is_some_and(|price| price < Decimal::ZERO) {
            return Err(
                DomainError::InvariantViolation("unit_price must not be negative".into()).into()
            );
        }

        match request.item_id.clone() {
            Some(item_id) => self.update_existing(item_id, request).await,
            None => self.create_new(request).await,
        }
    }

    async fn create_new(&self, request: UpsertRequest) -> Result<UpsertOutcome, ApplicationError> {
        let job_id = JobId(request.job_id.trim().to_string());

        let mut category_id = request.category_id.clone().map(CatalogEntryId);
        let mut category_unit: Option<Unit> = None;
        let mut category_price: Option<Decimal> = None;
        let mut category_confidence: Option<f64> = None;
        let mut extracted_unit: Option<Unit> = None;
        let mut extracted_quantity: Option<Decimal> = None;
        let mut quantity_confidence: Option<f64> = None;

        let needs_inference = request.unit_price.is_none()
            || request.unit.is_none()
            || request.quantity.is_none();

        // Rebuilt from the datastore on every create so pricing is always
        // current.
        let catalog = Catalog::new(self.catalog.list_entries().await.map_err(persistence)?);

        if let Some(explicit) = &category_id {
            if let Some(entry) = catalog.find(explicit) {
                category_unit = Some(entry.unit);
                category_price = Some(entry.default_price);
            }
        }

        if needs_inference {
            if let Some(description) = request.description.as_deref() {
                if category_id.is_none() {
                    if let Some(matched) = catalog.match_description(description) {
                        category_unit = Some(matched.entry.unit);
                        category_price = Some(matched.entry.default_price);
                        category_id = Some(matched.entry.id);
                        category_confidence = Some(matched.confidence);
                    }
                }
                if let Some(extracted) = extract_quantity(description) {
                    extracted_quantity = Some(extracted.quantity);
                    extracted_unit = Some(extracted.unit);
                    quantity_confidence = Some(extracted.confidence);
                }
            }
        }

        // Explicit wins; extractor-derived unit fills next; category unit is
        // the last-resort default. Default price comes from the resolved
        // category and does not raise confidence.
        let unit = request.unit.or(extracted_unit).or(category_unit).unwrap_or(Unit::Each);
        let quantity = request.quantity.or(extracted_quantity).unwrap_or(Decimal::ONE);
        let unit_price = request.unit_price.or(category_price).unwrap_or(Decimal::ZERO);

        let price_resolved = request.unit_price.is_some() || category_price.is_some();
        let quantity_resolved = request.quantity.is_some() || extracted_quantity.is_some();
        let ai_confidence = aggregate_confidence(
            category_confidence,
            quantity_confidence,
            price_resolved,
            quantity_resolved,
        );

        let description_raw = request.description.clone().unwrap_or_default();
        let description_clean = match request.description.as_deref() {
            Some(text) => self.polisher.polish(text).await,
            None => String::new(),
        };

        let created = self
            .line_items
            .create(NewLineItem {
                id: LineItemId(Uuid::new_v4().to_string()),
                job_id: job_id.clone(),
                description_raw,
                description_clean,
                category_id,
                unit,
                quantity,
                unit_price,
                ai_confidence,
                finalized: request.finalize.unwrap_or(false),
                taxable: request.taxable.unwrap_or(false),
                taxable_amount: request.taxable_amount.flatten(),
            })
            .await
            .map_err(persistence)?;

        info!(
            event_name = "pipeline.line_item.created",
            job_id = %job_id.0,
            line_no = created.line_no,
            ai_confidence = created.ai_confidence,
            "line item created"
        );

        Ok(UpsertOutcome {
            id: created.id,
            line_no: created.line_no,
            created: true,
            ai_confidence: created.ai_confidence,
        })
    }

    async fn update_existing(
        &self,
        item_id: String,
        request: UpsertRequest,
    ) -> Result<UpsertOutcome, ApplicationError> {
        let id = LineItemId(item_id);
        let mut item = self
            .line_items
            .find_by_id(&id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::UnknownLineItem { id: id.0.clone() })?;

        if item.job_id.0 != request.job_id.trim() {
            return Err(DomainError::InvariantViolation(format!(
                "line item `{}` does not belong to job `{}`",
                id.0, request.job_id
            ))
            .into());
        }

        let mut patch = LineItemPatch {
            category_id: request.category_id.map(CatalogEntryId),
            unit: request.unit,
            quantity: request.quantity,
            unit_price: request.unit_price,
            finalized: request.finalize,
            taxable: request.taxable,
            taxable_amount: request.taxable_amount,
            ..LineItemPatch::default()
        };
        if let Some(description) = request.description {
            patch.description_clean = Some(self.polisher.polish(&description).await);
            patch.description_raw = Some(description);
        }

        item.apply(patch, Utc::now());
        item.validate().map_err(ApplicationError::from)?;
        self.line_items.update(item.clone()).await.map_err(persistence)?;

        info!(
            event_name = "pipeline.line_item.updated",
            job_id = %item.job_id.0,
            line_no = item.line_no,
            "line item updated"
        );

        Ok(UpsertOutcome {
            id: item.id,
            line_no: item.line_no,
            created: false,
            ai_confidence: item.ai_confidence,
        })
    }
}
