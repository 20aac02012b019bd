use crate::domain::payment::PaymentStatus;
use crate::domain::validation::ValidationErrors;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(ValidationErrors),
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
    #[error("cannot issue a QR code for payment with status '{status}'")]
    InvalidState { status: PaymentStatus },
    #[error("invalid QR code")]
    InvalidCode,
    #[error("QR code has expired")]
    Expired,
    #[error("QR code is no longer valid - payment status: {status}")]
    CodeNoLongerValid { status: PaymentStatus },
    #[error("failed to generate a unique QR code after {attempts} attempts")]
    Conflict { attempts: u32 },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<ValidationErrors> for PaymentError {
    fn from(e: ValidationErrors) -> Self {
        PaymentError::InvalidInput(e)
    }
}

impl From<crate::domain::validation::FieldError> for PaymentError {
    fn from(e: crate::domain::validation::FieldError) -> Self {
        PaymentError::InvalidInput(ValidationErrors(vec![e]))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::NotFound(_) => StatusCode::NOT_FOUND,
            PaymentError::InvalidInput(_)
            | PaymentError::InvalidTransition { .. }
            | PaymentError::InvalidState { .. }
            | PaymentError::InvalidCode
            | PaymentError::Expired
            | PaymentError::CodeNoLongerValid { .. } => StatusCode::BAD_REQUEST,
            PaymentError::Conflict { .. } => StatusCode::CONFLICT,
            PaymentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::NotFound(_) => "NOT_FOUND",
            PaymentError::InvalidInput(_) => "INVALID_INPUT",
            PaymentError::InvalidTransition { .. } => "INVALID_TRANSITION",
            PaymentError::InvalidState { .. } => "INVALID_STATE",
            PaymentError::InvalidCode => "INVALID_CODE",
            PaymentError::Expired => "CODE_EXPIRED",
            PaymentError::CodeNoLongerValid { .. } => "CODE_NO_LONGER_VALID",
            PaymentError::Conflict { .. } => "CODE_GENERATION_CONFLICT",
            PaymentError::Store(_) => "INTERNAL_ERROR",
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let (message, details) = match self {
            PaymentError::Store(_) => ("internal server error".to_string(), None),
            PaymentError::InvalidInput(errors) => {
                (self.to_string(), serde_json::to_value(errors).ok())
            }
            PaymentError::InvalidTransition { from, to } => (
                self.to_string(),
                Some(serde_json::json!({"from": from, "to": to})),
            ),
            PaymentError::InvalidState { status } | PaymentError::CodeNoLongerValid { status } => {
                (self.to_string(), Some(serde_json::json!({"status": status})))
            }
            _ => (self.to_string(), None),
        };

        ErrorEnvelope {
            error: ErrorPayload {
                code: self.code().to_string(),
                message,
                details,
            },
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        if let PaymentError::Store(e) = &self {
            tracing::error!("store failure: {:#}", e);
        }
        (self.status_code(), Json(self.envelope())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_hide_the_cause() {
        let err = PaymentError::Store(anyhow::anyhow!("relation \"payments\" does not exist"));
        let env = err.envelope();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(env.error.code, "INTERNAL_ERROR");
        assert!(!env.error.message.contains("relation"));
    }

    #[test]
    fn no_longer_valid_surfaces_status() {
        let err = PaymentError::CodeNoLongerValid {
            status: PaymentStatus::Completed,
        };
        let env = err.envelope();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(env.error.details.unwrap()["status"], "completed");
    }

    #[test]
    fn kinds_map_to_distinct_codes() {
        let errors = [
            PaymentError::NotFound("payment"),
            PaymentError::InvalidInput(ValidationErrors::single("amount", "bad")),
            PaymentError::InvalidTransition {
                from: PaymentStatus::Completed,
                to: PaymentStatus::Pending,
            },
            PaymentError::InvalidState {
                status: PaymentStatus::Failed,
            },
            PaymentError::InvalidCode,
            PaymentError::Expired,
            PaymentError::CodeNoLongerValid {
                status: PaymentStatus::Expired,
            },
            PaymentError::Conflict { attempts: 10 },
        ];
        let mut codes: Vec<&str> = errors.iter().map(PaymentError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert_eq!(errors[0].status_code(), StatusCode::NOT_FOUND);
        assert_eq!(errors[7].status_code(), StatusCode::CONFLICT);
    }
}
