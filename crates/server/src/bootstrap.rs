use std::sync::Arc;

use linebook_core::config::{AppConfig, ConfigError, LoadOptions};
use linebook_db::repositories::{SqlCatalogRepository, SqlLineItemRepository};
use linebook_db::{connect_with_settings, migrations, DbPool};
use linebook_engine::rewriter::TextRewriter;
use linebook_engine::{HttpRewriter, LineItemService, RewriteError, RewriterWithFallback};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<LineItemService>,
    pub rewriter_enabled: bool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("rewriter client could not be constructed: {0}")]
    Rewriter(#[source] RewriteError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let rewriter = HttpRewriter::from_config(&config.rewriter)
        .map_err(BootstrapError::Rewriter)?
        .map(|client| Arc::new(client) as Arc<dyn TextRewriter>);
    let rewriter_enabled = rewriter.is_some();

    let service = Arc::new(LineItemService::new(
        Arc::new(SqlCatalogRepository::new(db_pool.clone())),
        Arc::new(SqlLineItemRepository::new(db_pool.clone())),
        RewriterWithFallback::new(rewriter),
    ));

    Ok(Application { config, db_pool, service, rewriter_enabled })
}

#[cfg(test)]
mod tests {
    use linebook_core::config::{ConfigOverrides, LoadOptions};
    use linebook_db::DemoPriceBook;
    use linebook_engine::UpsertRequest;
    use rust_decimal::Decimal;

    use crate::bootstrap::bootstrap;

    fn memory_options() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_serves_the_upsert_path() {
        let app = bootstrap(memory_options()).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('catalog_entry', 'catalog_alias', 'line_item')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("baseline tables present");
        assert_eq!(table_count, 3);

        DemoPriceBook::load(&app.db_pool).await.expect("seed demo price book");

        let outcome = app
            .service
            .upsert(UpsertRequest {
                job_id: "job-smoke".to_string(),
                description: Some("800 sf of plank flooring".to_string()),
                ..UpsertRequest::default()
            })
            .await
            .expect("upsert should succeed");

        assert_eq!(outcome.line_no, 1);
        assert_eq!(outcome.ai_confidence, 0.9);

        let (unit_price,): (String,) =
            sqlx::query_as("SELECT unit_price FROM line_item WHERE id = ?")
                .bind(&outcome.id.0)
                .fetch_one(&app.db_pool)
                .await
                .expect("created row present");
        assert_eq!(unit_price.parse::<Decimal>().expect("decimal"), Decimal::new(200, 2));

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_without_rewriter_config_runs_in_deterministic_mode() {
        let app = bootstrap(memory_options()).await.expect("bootstrap");
        assert!(!app.rewriter_enabled);
        app.db_pool.close().await;
    }
}
