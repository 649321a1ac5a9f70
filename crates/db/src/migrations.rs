use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::connect_with_settings;

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "catalog_entry",
        "catalog_alias",
        "line_item",
        "idx_catalog_entry_position",
        "idx_catalog_alias_entry_id",
        "idx_line_item_job_id",
        "idx_line_item_category_id",
    ];

    #[tokio::test]
    async fn migrations_create_baseline_schema() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for object in MANAGED_SCHEMA_OBJECTS {
            let count = sqlx::query(
                "SELECT COUNT(*) AS count FROM sqlite_master \
                 WHERE type IN ('table', 'index') AND name = ?",
            )
            .bind(object)
            .fetch_one(&pool)
            .await
            .expect("check schema object")
            .get::<i64, _>("count");

            assert_eq!(count, 1, "expected schema object `{object}` after migration");
        }

        pool.close().await;
    }

    #[tokio::test]
    async fn catalog_entry_enforces_unique_position() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let insert = "INSERT INTO catalog_entry \
             (id, name, unit, default_price, position, created_at, updated_at) \
             VALUES (?, 'Plank Flooring', 'sqft', '2.00', 1, '2026-01-01', '2026-01-01')";

        sqlx::query(insert).bind("cat-1").execute(&pool).await.expect("first insert");
        let duplicate = sqlx::query(insert).bind("cat-2").execute(&pool).await;

        let error = duplicate.expect_err("duplicate position should be rejected");
        assert!(matches!(
            error,
            sqlx::Error::Database(ref db) if db.is_unique_violation()
        ));

        pool.close().await;
    }

    #[tokio::test]
    async fn line_item_enforces_unique_line_no_per_job() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let insert = "INSERT INTO line_item \
             (id, job_id, line_no, description_raw, description_clean, unit, quantity, \
              unit_price, ai_confidence, finalized, taxable, created_at, updated_at) \
             VALUES (?, 'job-1', 1, 'x', 'X.', 'each', '1', '0', 0, 0, 0, '2026-01-01', '2026-01-01')";

        sqlx::query(insert).bind("li-1").execute(&pool).await.expect("first insert");
        let duplicate = sqlx::query(insert).bind("li-2").execute(&pool).await;

        let error = duplicate.expect_err("duplicate line_no should be rejected");
        assert!(matches!(
            error,
            sqlx::Error::Database(ref db) if db.is_unique_violation()
        ));

        pool.close().await;
    }
}
