use municollect_payments::config::AppConfig;
use municollect_payments::http::middleware::rate_limit::RateLimitState;
use municollect_payments::repo::pg_ledger::PgLedgerStore;
use municollect_payments::repo::LedgerStore;
use municollect_payments::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_max_connections)
        .acquire_timeout(std::time::Duration::from_secs(cfg.db_acquire_timeout_secs))
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool));
    let redis_client = redis::Client::open(cfg.redis_url.clone())?;
    let sweeper = cfg.sweeper(store.clone());

    if cfg.sweeper_enabled {
        tokio::spawn(sweeper.clone().run());
    } else {
        tracing::info!("in-process expiration sweeper disabled");
    }

    let state = AppState::new(store, sweeper, redis_client.clone());
    let limits = RateLimitState {
        redis_client,
        max_per_minute: cfg.rate_limit_per_minute,
    };
    let app = municollect_payments::http::router(state, cfg.internal_api_key.clone(), limits);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
