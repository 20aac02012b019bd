use crate::domain::validation::ValidationErrors;
use crate::error::PaymentError;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Option<Uuid>);

impl Caller {
    pub fn require(&self) -> Result<Uuid, PaymentError> {
        self.0
            .ok_or_else(|| ValidationErrors::single("userId", format!("{USER_ID_HEADER} header is required")).into())
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = PaymentError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(Caller(None));
        };
        raw.to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(|id| Caller(Some(id)))
            .ok_or_else(|| ValidationErrors::single("userId", "must be a UUID").into())
    }
}

pub fn json_body<T>(body: Result<axum::Json<T>, JsonRejection>) -> Result<T, PaymentError> {
    body.map(|axum::Json(v)| v)
        .map_err(|e| ValidationErrors::single("body", e.body_text()).into())
}

pub fn path_uuid(path: Result<axum::extract::Path<Uuid>, PathRejection>, field: &str) -> Result<Uuid, PaymentError> {
    path.map(|axum::extract::Path(id)| id)
        .map_err(|_| ValidationErrors::single(field, "must be a UUID").into())
}
