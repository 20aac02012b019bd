use anyhow::Result;
use municollect_payments::config::AppConfig;
use municollect_payments::repo::pg_ledger::PgLedgerStore;
use municollect_payments::repo::LedgerStore;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// `--once` runs a single pass for cron-style deployments.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(cfg.db_acquire_timeout_secs))
        .connect(&cfg.database_url)
        .await?;

    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool));
    let sweeper = cfg.sweeper(store);

    if std::env::args().any(|a| a == "--once") {
        let report = sweeper.sweep_once(chrono::Utc::now()).await?;
        tracing::info!("sweep finished: {} expired (cutoff {})", report.expired, report.cutoff);
        return Ok(());
    }

    sweeper.run().await;
    Ok(())
}
