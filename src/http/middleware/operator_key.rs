use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub const OPERATOR_KEY_HEADER: &str = "X-Internal-Api-Key";

pub async fn require_operator_key(
    State(expected): State<String>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(OPERATOR_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    match provided {
        Some(key) if !expected.is_empty() && key == expected => next.run(request).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": {"code": "UNAUTHORIZED", "message": "operator key required"}
            })),
        )
            .into_response(),
    }
}
