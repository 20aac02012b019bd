use crate::error::PaymentError;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("ledger store not ready: {:#}", e);
            false
        }
    };

    let redis_ok = async {
        if let Ok(mut conn) = state.redis_client.get_multiplexed_async_connection().await {
            let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
            return pong.is_ok();
        }
        false
    }
    .await;

    // Redis only backs rate limiting, which fails open.
    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "ready": db_ok,
            "db": db_ok,
            "redis": redis_ok
        })),
    )
        .into_response()
}

pub async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"alive": true}))).into_response()
}

pub async fn run_sweep(State(state): State<AppState>) -> Result<Response, PaymentError> {
    let report = state.sweeper.sweep_once(chrono::Utc::now()).await?;
    Ok(Json(report).into_response())
}
