use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use linebook_core::domain::catalog::CatalogEntryId;
use linebook_core::domain::line_item::{JobId, LineItem, LineItemId};

use super::{is_unique_violation, LineItemRepository, NewLineItem, RepositoryError};
use crate::DbPool;

/// Bounded retries when two concurrent creates on one job collide on the
/// UNIQUE(job_id, line_no) constraint.
const LINE_NO_CONFLICT_RETRIES: u32 = 5;

pub struct SqlLineItemRepository {
    pool: DbPool,
}

impl SqlLineItemRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    raw.parse()
        .map_err(|_| RepositoryError::Decode(format!("invalid decimal `{raw}` in {column}")))
}

fn decode_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| RepositoryError::Decode(format!("invalid timestamp `{raw}` in {column}")))
}

fn item_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<LineItem, RepositoryError> {
    let taxable_amount = match row.get::<Option<String>, _>("taxable_amount") {
        Some(raw) => Some(decode_decimal("line_item.taxable_amount", &raw)?),
        None => None,
    };

    Ok(LineItem {
        id: LineItemId(row.get::<String, _>("id")),
        job_id: JobId(row.get::<String, _>("job_id")),
        line_no: row.get::<i64, _>("line_no"),
        description_raw: row.get::<String, _>("description_raw"),
        description_clean: row.get::<String, _>("description_clean"),
        category_id: row.get::<Option<String>, _>("category_id").map(CatalogEntryId),
        unit: row
            .get::<String, _>("unit")
            .parse()
            .map_err(|_| RepositoryError::Decode("invalid unit in line_item".to_string()))?,
        quantity: decode_decimal("line_item.quantity", &row.get::<String, _>("quantity"))?,
        unit_price: decode_decimal("line_item.unit_price", &row.get::<String, _>("unit_price"))?,
        ai_confidence: row.get::<f64, _>("ai_confidence"),
        finalized: row.get::<i64, _>("finalized") != 0,
        taxable: row.get::<i64, _>("taxable") != 0,
        taxable_amount,
        created_at: decode_timestamp("line_item.created_at", &row.get::<String, _>("created_at"))?,
        updated_at: decode_timestamp("line_item.updated_at", &row.get::<String, _>("updated_at"))?,
    })
}

const SELECT_COLUMNS: &str = "id, job_id, line_no, description_raw, description_clean, \
     category_id, unit, quantity, unit_price, ai_confidence, finalized, taxable, \
     taxable_amount, created_at, updated_at";

#[async_trait::async_trait]
impl LineItemRepository for SqlLineItemRepository {
    async fn find_by_id(&self, id: &LineItemId) -> Result<Option<LineItem>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM line_item WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn list_for_job(&self, job_id: &JobId) -> Result<Vec<LineItem>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM line_item WHERE job_id = ? ORDER BY line_no"
        ))
        .bind(&job_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(item_from_row).collect()
    }

    async fn create(&self, item: NewLineItem) -> Result<LineItem, RepositoryError> {
        // line_no is computed inside the INSERT itself, so the read of the
        // current maximum and the write are one statement. The unique
        // constraint catches the remaining write-write races and we retry.
        for _ in 0..LINE_NO_CONFLICT_RETRIES {
            let now = Utc::now();
            let result = sqlx::query(
                "INSERT INTO line_item \
                 (id, job_id, line_no, description_raw, description_clean, category_id, unit, \
                  quantity, unit_price, ai_confidence, finalized, taxable, taxable_amount, \
                  created_at, updated_at) \
                 VALUES (?, ?, \
                   (SELECT COALESCE(MAX(line_no), 0) + 1 FROM line_item WHERE job_id = ?), \
                   ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 RETURNING line_no",
            )
            .bind(&item.id.0)
            .bind(&item.job_id.0)
            .bind(&item.job_id.0)
            .bind(&item.description_raw)
            .bind(&item.description_clean)
            .bind(item.category_id.as_ref().map(|id| id.0.clone()))
            .bind(item.unit.as_str())
            .bind(item.quantity.to_string())
            .bind(item.unit_price.to_string())
            .bind(item.ai_confidence)
            .bind(item.finalized as i64)
            .bind(item.taxable as i64)
            .bind(item.taxable_amount.map(|amount| amount.to_string()))
            .bind(now.to_rfc3339())
            .bind(now.to_rfc3339())
            .fetch_one(&self.pool)
            .await;

            match result {
                Ok(row) => {
                    return Ok(LineItem {
                        id: item.id,
                        job_id: item.job_id,
                        line_no: row.get::<i64, _>("line_no"),
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
                    });
                }
                Err(error) if is_unique_violation(&error) => continue,
                Err(error) => return Err(error.into()),
            }
        }

        Err(RepositoryError::LineNumberConflict {
            job_id: item.job_id.0,
            attempts: LINE_NO_CONFLICT_RETRIES,
        })
    }

    async fn update(&self, item: LineItem) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE line_item SET \
               description_raw = ?, description_clean = ?, category_id = ?, unit = ?, \
               quantity = ?, unit_price = ?, ai_confidence = ?, finalized = ?, taxable = ?, \
               taxable_amount = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&item.description_raw)
        .bind(&item.description_clean)
        .bind(item.category_id.as_ref().map(|id| id.0.clone()))
        .bind(item.unit.as_str())
        .bind(item.quantity.to_string())
        .bind(item.unit_price.to_string())
        .bind(item.ai_confidence)
        .bind(item.finalized as i64)
        .bind(item.taxable as i64)
        .bind(item.taxable_amount.map(|amount| amount.to_string()))
        .bind(item.updated_at.to_rfc3339())
        .bind(&item.id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
