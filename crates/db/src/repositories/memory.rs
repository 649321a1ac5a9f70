use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use linebook_core::domain::catalog::{CatalogEntry, CatalogEntryId};
use linebook_core::domain::line_item::{JobId, LineItem, LineItemId};

use super::{CatalogRepository, LineItemRepository, NewLineItem, RepositoryError};

/// Catalog entries kept in insertion order, matching the SQL repository's
/// position ordering.
#[derive(Default)]
pub struct InMemoryCatalogRepository {
    entries: RwLock<Vec<CatalogEntry>>,
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list_entries(&self) -> Result<Vec<CatalogEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.clone())
    }

    async fn find_by_id(
        &self,
        id: &CatalogEntryId,
    ) -> Result<Option<CatalogEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|entry| &entry.id == id).cloned())
    }

    async fn save(&self, entry: CatalogEntry) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|existing| existing.id == entry.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryLineItemRepository {
    items: RwLock<HashMap<String, LineItem>>,
}

#[async_trait::async_trait]
impl LineItemRepository for InMemoryLineItemRepository {
    async fn find_by_id(&self, id: &LineItemId) -> Result<Option<LineItem>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.get(&id.0).cloned())
    }

    async fn list_for_job(&self, job_id: &JobId) -> Result<Vec<LineItem>, RepositoryError> {
        let items = self.items.read().await;
        let mut matching: Vec<LineItem> =
            items.values().filter(|item| &item.job_id == job_id).cloned().collect();
        matching.sort_by_key(|item| item.line_no);
        Ok(matching)
    }

    async fn create(&self, item: NewLineItem) -> Result<LineItem, RepositoryError> {
        // Assignment happens under the single write lock, so numbering
        // cannot race.
        let mut items = self.items.write().await;
        let line_no = items
            .values()
            .filter(|existing| existing.job_id == item.job_id)
            .map(|existing| existing.line_no)
            .max()
            .unwrap_or(0)
            + 1;

        let now = Utc::now();
        let created = LineItem {
            id: item.id,
            job_id: item.job_id,
            line_no,
            description_raw: item.description_raw,
            description_clean: item.description_clean,
            category_id: item.category_id,
            unit: item.unit,
            quantity: item.quantity,
            unit_price: item.unit_price,
            ai_confidence: item.ai_confidence,
            finalized: item.finalized,
            taxable: item.taxable,
            taxable_amount: item.taxable_amount,
            created_at: now,
            updated_at: now,
        };
        items.insert(created.id.0.clone(), created.clone());
        Ok(created)
    }

    async fn update(&self, item: LineItem) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        items.insert(item.id.0.clone(), item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use linebook_core::domain::catalog::{CatalogEntry, CatalogEntryId, Unit};
    use linebook_core::domain::line_item::{JobId, LineItemId};

    use crate::repositories::{
        CatalogRepository, InMemoryCatalogRepository, InMemoryLineItemRepository,
        LineItemRepository, NewLineItem,
    };

    #[tokio::test]
    async fn catalog_round_trip_keeps_insertion_order() {
        let repo = InMemoryCatalogRepository::default();
        for (id, name) in [("cat-1", "Flooring"), ("cat-2", "Paint")] {
            repo.save(CatalogEntry {
                id: CatalogEntryId(id.to_string()),
                name: name.to_string(),
                unit: Unit::Each,
                default_price: Decimal::ZERO,
                aliases: vec![],
            })
            .await
            .expect("save");
        }

        let entries = repo.list_entries().await.expect("list");
        assert_eq!(
            entries.iter().map(|e| e.id.0.as_str()).collect::<Vec<_>>(),
            vec!["cat-1", "cat-2"]
        );
    }

    #[tokio::test]
    async fn line_numbers_increase_per_job() {
        let repo = InMemoryLineItemRepository::default();
        let new_item = |id: &str, job: &str| NewLineItem {
            id: LineItemId(id.to_string()),
            job_id: JobId(job.to_string()),
            description_raw: "x".to_string(),
            description_clean: "X.".to_string(),
            category_id: None,
            unit: Unit::Each,
            quantity: Decimal::ONE,
            unit_price: Decimal::ZERO,
            ai_confidence: 0.0,
            finalized: false,
            taxable: false,
            taxable_amount: None,
        };

        let first = repo.create(new_item("li-1", "job-1")).await.expect("create");
        let second = repo.create(new_item("li-2", "job-1")).await.expect("create");
        let other = repo.create(new_item("li-3", "job-2")).await.expect("create");

        assert_eq!((first.line_no, second.line_no, other.line_no), (1, 2, 1));
    }
}
