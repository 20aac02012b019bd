use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use redis::AsyncCommands;

#[derive(Clone)]
pub struct RateLimitState {
    pub redis_client: redis::Client,
    pub max_per_minute: i64,
}

pub fn client_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

pub async fn enforce(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = format!(
        "qr-rate:{}:{}",
        client_ip(&request),
        chrono::Utc::now().format("%Y%m%d%H%M")
    );

    // Redis being down must not take redemption offline.
    match state.redis_client.get_multiplexed_async_connection().await {
        Ok(mut conn) => {
            let count: i64 = conn.incr(&key, 1).await.unwrap_or(1);
            let _: bool = conn.expire(&key, 120).await.unwrap_or(false);
            if count > state.max_per_minute {
                tracing::warn!("rate limit hit for {}", key);
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(serde_json::json!({
                        "error": {"code": "RATE_LIMITED", "message": "too many QR lookups, retry shortly"}
                    })),
                )
                    .into_response();
            }
        }
        Err(e) => tracing::debug!("rate limiter unavailable: {}", e),
    }

    next.run(request).await
}
