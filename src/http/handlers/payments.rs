use crate::domain::payment::{
    CreatePaymentRequest, Page, PaymentFilter, PaymentStatus, ServiceType, UpdateStatusRequest,
};
use crate::domain::validation::{parse_optional, FieldError, ValidationErrors};
use crate::error::PaymentError;
use crate::http::caller::{json_body, path_uuid, Caller};
use crate::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub municipality_id: Option<String>,
    pub user_id: Option<String>,
    pub service_type: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl PageQuery {
    fn page(&self) -> Page {
        Page::from_query(self.limit.as_deref(), self.offset.as_deref())
    }
}

fn parse_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn collect<T>(errors: &mut ValidationErrors, parsed: Result<Option<T>, FieldError>) -> Option<T> {
    parsed.unwrap_or_else(|e| {
        errors.0.push(e);
        None
    })
}

impl HistoryQuery {
    pub fn filter(&self) -> Result<PaymentFilter, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let filter = PaymentFilter {
            municipality_id: collect(
                &mut errors,
                parse_optional("municipalityId", self.municipality_id.as_deref()),
            ),
            user_id: collect(&mut errors, parse_optional("userId", self.user_id.as_deref())),
            service_type: collect(
                &mut errors,
                parse_optional::<ServiceType>("serviceType", self.service_type.as_deref()),
            ),
            status: collect(
                &mut errors,
                parse_optional::<PaymentStatus>("status", self.status.as_deref()),
            ),
            date_from: parse_date(self.date_from.as_deref()),
            date_to: parse_date(self.date_to.as_deref()),
        };
        errors.into_result().map(|_| filter)
    }
}

pub async fn create_payment(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<Response, PaymentError> {
    let user_id = caller.require()?;
    let req = json_body(body)?;
    let payment = state.payment_service.create_payment(user_id, req).await?;
    Ok((StatusCode::CREATED, Json(payment)).into_response())
}

pub async fn get_payment(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, PaymentError> {
    let id = path_uuid(id, "id")?;
    let payment = state.payment_service.get_payment(id, caller.0).await?;
    Ok(Json(payment).into_response())
}

pub async fn get_payment_status(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, PaymentError> {
    let id = path_uuid(id, "id")?;
    let view = state.payment_service.get_status(id, caller.0).await?;
    Ok(Json(view).into_response())
}

pub async fn update_payment_status(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Response, PaymentError> {
    let id = path_uuid(id, "id")?;
    let req = json_body(body)?;
    let payment = state
        .payment_service
        .update_status(id, req.status, req.transaction_data)
        .await?;
    Ok(Json(payment).into_response())
}

/// A resident caller only ever sees their own payments, whatever `userId`
/// the query names.
pub async fn payment_history(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, PaymentError> {
    let mut filter = query.filter()?;
    if let Some(user_id) = caller.0 {
        filter.user_id = Some(user_id);
    }
    let page = Page::from_query(query.limit.as_deref(), query.offset.as_deref());
    let result = state.payment_service.history(&filter, page).await?;
    Ok(Json(result).into_response())
}

pub async fn user_payments(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<PageQuery>,
) -> Result<Response, PaymentError> {
    let user_id = caller.require()?;
    let result = state
        .payment_service
        .payments_for_user(user_id, query.page())
        .await?;
    Ok(Json(result).into_response())
}

pub async fn municipality_payments(
    State(state): State<AppState>,
    municipality_id: Result<Path<Uuid>, PathRejection>,
    Query(query): Query<PageQuery>,
) -> Result<Response, PaymentError> {
    let municipality_id = path_uuid(municipality_id, "municipalityId")?;
    let result = state
        .payment_service
        .payments_for_municipality(municipality_id, query.page())
        .await?;
    Ok(Json(result).into_response())
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_filter_rejects_unknown_enums_but_ignores_bad_dates() {
        let q = HistoryQuery {
            status: Some("refunded".to_string()),
            service_type: Some("parking".to_string()),
            ..HistoryQuery::default()
        };
        let err = q.filter().unwrap_err();
        let fields: Vec<&str> = err.0.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["serviceType", "status"]);

        let q = HistoryQuery {
            status: Some("pending".to_string()),
            date_from: Some("last tuesday".to_string()),
            date_to: Some("2024-03-01".to_string()),
            ..HistoryQuery::default()
        };
        let f = q.filter().unwrap();
        assert_eq!(f.status, Some(PaymentStatus::Pending));
        assert!(f.date_from.is_none());
        assert_eq!(f.date_to.unwrap().to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }
}
