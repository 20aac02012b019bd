use crate::domain::payment::Payment;
use crate::domain::qrcode::{GenerateQrRequest, ValidateQrRequest};
use crate::domain::validation::ValidationErrors;
use crate::error::{ErrorPayload, PaymentError};
use crate::http::caller::json_body;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<Payment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

pub async fn generate_qr(
    State(state): State<AppState>,
    body: Result<Json<GenerateQrRequest>, JsonRejection>,
) -> Result<Response, PaymentError> {
    let req = json_body(body)?;
    let payment_id = req
        .payment_id
        .filter(|id| !id.is_nil())
        .ok_or_else(|| ValidationErrors::single("paymentId", "is required"))?;
    let artifact = state.qr_service.generate_code(payment_id, &req).await?;
    Ok((StatusCode::CREATED, Json(artifact)).into_response())
}

/// A refused code still answers with `valid: false` so scanners can branch on
/// one field; store failures keep the plain error envelope.
pub async fn validate_qr(
    State(state): State<AppState>,
    body: Result<Json<ValidateQrRequest>, JsonRejection>,
) -> Result<Response, PaymentError> {
    let req = json_body(body)?;
    match state.qr_service.validate_code(&req.code).await {
        Ok(payment) => Ok(Json(ValidationOutcome {
            valid: true,
            payment: Some(payment),
            error: None,
        })
        .into_response()),
        Err(e @ PaymentError::Store(_)) => Err(e),
        Err(e) => Ok((
            e.status_code(),
            Json(ValidationOutcome {
                valid: false,
                payment: None,
                error: Some(e.envelope().error),
            }),
        )
            .into_response()),
    }
}

pub async fn qr_details(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, PaymentError> {
    let artifact = state.qr_service.code_details(&code).await?;
    Ok(Json(artifact).into_response())
}

pub async fn regenerate_qr(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Option<Json<GenerateQrRequest>>,
) -> Result<Response, PaymentError> {
    let payment_id = Uuid::parse_str(raw_id.trim())
        .map_err(|_| ValidationErrors::single("paymentId", "must be a UUID"))?;
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let artifact = state.qr_service.regenerate_code(payment_id, &req).await?;
    Ok(Json(artifact).into_response())
}
