use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Row;

use linebook_core::domain::catalog::{CatalogEntry, CatalogEntryId, Unit};

use super::{is_unique_violation, CatalogRepository, RepositoryError};
use crate::DbPool;

/// Bounded retries when two concurrent saves of new entries collide on the
/// unique position index.
const POSITION_CONFLICT_RETRIES: u32 = 5;

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn aliases_for(&self, entry_id: &str) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT alias FROM catalog_alias WHERE entry_id = ? ORDER BY position",
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.get::<String, _>("alias")).collect())
    }
}

fn decode_unit(raw: &str) -> Result<Unit, RepositoryError> {
    raw.parse()
        .map_err(|_| RepositoryError::Decode(format!("invalid unit `{raw}` in catalog_entry")))
}

fn decode_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    raw.parse()
        .map_err(|_| RepositoryError::Decode(format!("invalid decimal `{raw}` in {column}")))
}

fn entry_from_row(row: &sqlx::sqlite::SqliteRow, aliases: Vec<String>) -> Result<CatalogEntry, RepositoryError> {
    Ok(CatalogEntry {
        id: CatalogEntryId(row.get::<String, _>("id")),
        name: row.get::<String, _>("name"),
        unit: decode_unit(&row.get::<String, _>("unit"))?,
        default_price: decode_decimal("catalog_entry.default_price", &row.get::<String, _>("default_price"))?,
        aliases,
    })
}

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn list_entries(&self) -> Result<Vec<CatalogEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, unit, default_price FROM catalog_entry ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let aliases = self.aliases_for(&row.get::<String, _>("id")).await?;
            entries.push(entry_from_row(row, aliases)?);
        }
        Ok(entries)
    }

    async fn find_by_id(
        &self,
        id: &CatalogEntryId,
    ) -> Result<Option<CatalogEntry>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, unit, default_price FROM catalog_entry WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let aliases = self.aliases_for(&id.0).await?;
                Ok(Some(entry_from_row(&row, aliases)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, entry: CatalogEntry) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();

        // Position is computed inside the INSERT, same as line_no on
        // line_item; the unique index catches concurrent inserts of new
        // entries and we retry. Resaving an existing id keeps its position.
        let mut inserted = false;
        for _ in 0..POSITION_CONFLICT_RETRIES {
            let result = sqlx::query(
                "INSERT INTO catalog_entry (id, name, unit, default_price, position, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, (SELECT COALESCE(MAX(position), 0) + 1 FROM catalog_entry), ?, ?) \
                 ON CONFLICT(id) DO UPDATE SET \
                   name = excluded.name, \
                   unit = excluded.unit, \
                   default_price = excluded.default_price, \
                   updated_at = excluded.updated_at",
            )
            .bind(&entry.id.0)
            .bind(&entry.name)
            .bind(entry.unit.as_str())
            .bind(entry.default_price.to_string())
            .bind(&now)
            .bind(&now)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => {
                    inserted = true;
                    break;
                }
                Err(error) if is_unique_violation(&error) => continue,
                Err(error) => return Err(error.into()),
            }
        }
        if !inserted {
            return Err(RepositoryError::PositionConflict {
                entry_id: entry.id.0,
                attempts: POSITION_CONFLICT_RETRIES,
            });
        }

        sqlx::query("DELETE FROM catalog_alias WHERE entry_id = ?")
            .bind(&entry.id.0)
            .execute(&self.pool)
            .await?;

        for (position, alias) in entry.aliases.iter().enumerate() {
            sqlx::query(
                "INSERT INTO catalog_alias (id, entry_id, alias, position) VALUES (?, ?, ?, ?)",
            )
            .bind(format!("{}:alias:{position}", entry.id.0))
            .bind(&entry.id.0)
            .bind(alias)
            .bind(position as i64)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use linebook_core::domain::catalog::{CatalogEntry, CatalogEntryId, Unit};

    use crate::repositories::{CatalogRepository, SqlCatalogRepository};
    use crate::{connect_with_settings, migrations};

    fn entry(id: &str, name: &str, aliases: &[&str]) -> CatalogEntry {
        CatalogEntry {
            id: CatalogEntryId(id.to_string()),
            name: name.to_string(),
            unit: Unit::Sqft,
            default_price: Decimal::new(200, 2),
            aliases: aliases.iter().map(ToString::to_string).collect(),
        }
    }

    #[tokio::test]
    async fn save_and_list_preserves_catalog_order_and_aliases() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repo = SqlCatalogRepository::new(pool.clone());

        repo.save(entry("cat-1", "Plank Flooring", &["lvp", "vinyl plank"]))
            .await
            .expect("save first");
        repo.save(entry("cat-2", "Interior Paint", &["painting"])).await.expect("save second");

        let entries = repo.list_entries().await.expect("list");
        assert_eq!(
            entries.iter().map(|e| e.id.0.as_str()).collect::<Vec<_>>(),
            vec!["cat-1", "cat-2"]
        );
        assert_eq!(entries[0].aliases, vec!["lvp".to_string(), "vinyl plank".to_string()]);

        pool.close().await;
    }

    #[tokio::test]
    async fn resave_keeps_position_and_replaces_aliases() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repo = SqlCatalogRepository::new(pool.clone());

        repo.save(entry("cat-1", "Plank Flooring", &["lvp"])).await.expect("save");
        repo.save(entry("cat-2", "Interior Paint", &[])).await.expect("save");
        repo.save(entry("cat-1", "Plank Flooring", &["vinyl plank"])).await.expect("resave");

        let entries = repo.list_entries().await.expect("list");
        assert_eq!(entries[0].id.0, "cat-1");
        assert_eq!(entries[0].aliases, vec!["vinyl plank".to_string()]);

        let found = repo
            .find_by_id(&CatalogEntryId("cat-2".to_string()))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.name, "Interior Paint");

        pool.close().await;
    }

    #[tokio::test]
    async fn concurrent_saves_never_share_a_position() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 4, 30)
            .await
            .expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repo = std::sync::Arc::new(SqlCatalogRepository::new(pool.clone()));

        let mut handles = Vec::new();
        for index in 0..8 {
            let repo = std::sync::Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.save(entry(&format!("cat-{index}"), &format!("Entry {index}"), &[])).await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("save");
        }

        let mut positions: Vec<i64> = sqlx::query("SELECT position FROM catalog_entry")
            .fetch_all(&pool)
            .await
            .expect("positions")
            .iter()
            .map(|row| sqlx::Row::get::<i64, _>(row, "position"))
            .collect();
        positions.sort_unstable();
        positions.dedup();
        assert_eq!(positions.len(), 8, "positions must be unique");

        pool.close().await;
    }
}
