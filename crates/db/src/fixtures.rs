//! Deterministic demo price book for local development and the CLI `seed`
//! command.

use rust_decimal::Decimal;
use sqlx::Row;

use linebook_core::domain::catalog::{CatalogEntry, CatalogEntryId, Unit};

use crate::repositories::{CatalogRepository, RepositoryError, SqlCatalogRepository};
use crate::DbPool;

pub struct DemoPriceBook;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedVerification {
    pub entry_count: i64,
    pub alias_count: i64,
}

impl DemoPriceBook {
    pub fn entries() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry {
                id: CatalogEntryId("cat-plank-flooring".to_string()),
                name: "Plank Flooring".to_string(),
                unit: Unit::Sqft,
                default_price: Decimal::new(200, 2),
                aliases: vec!["lvp".to_string(), "vinyl plank".to_string()],
            },
            CatalogEntry {
                id: CatalogEntryId("cat-interior-paint".to_string()),
                name: "Interior Paint".to_string(),
                unit: Unit::Sqft,
                default_price: Decimal::new(150, 2),
                aliases: vec!["painting".to_string(), "paint".to_string()],
            },
            CatalogEntry {
                id: CatalogEntryId("cat-baseboard".to_string()),
                name: "Baseboard".to_string(),
                unit: Unit::Lf,
                default_price: Decimal::new(350, 2),
                aliases: vec!["base trim".to_string(), "trim".to_string()],
            },
            CatalogEntry {
                id: CatalogEntryId("cat-demo-labor".to_string()),
                name: "Demolition Labor".to_string(),
                unit: Unit::Hour,
                default_price: Decimal::new(6500, 2),
                aliases: vec!["demo".to_string(), "tear out".to_string()],
            },
        ]
    }

    pub async fn load(pool: &DbPool) -> Result<(), RepositoryError> {
        let repo = SqlCatalogRepository::new(pool.clone());
        for entry in Self::entries() {
            repo.save(entry).await?;
        }
        Ok(())
    }

    pub async fn verify(pool: &DbPool) -> Result<SeedVerification, RepositoryError> {
        let entry_count = sqlx::query("SELECT COUNT(*) AS count FROM catalog_entry")
            .fetch_one(pool)
            .await?
            .get::<i64, _>("count");
        let alias_count = sqlx::query("SELECT COUNT(*) AS count FROM catalog_alias")
            .fetch_one(pool)
            .await?
            .get::<i64, _>("count");

        Ok(SeedVerification { entry_count, alias_count })
    }
}

#[cfg(test)]
mod tests {
    use crate::fixtures::DemoPriceBook;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn seed_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        DemoPriceBook::load(&pool).await.expect("first load");
        DemoPriceBook::load(&pool).await.expect("second load");

        let verification = DemoPriceBook::verify(&pool).await.expect("verify");
        assert_eq!(verification.entry_count, 4);
        assert_eq!(verification.alias_count, 8);

        pool.close().await;
    }
}
