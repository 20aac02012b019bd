use crate::domain::municipality::MAX_QR_EXPIRATION_MINUTES;
use crate::domain::payment::CreatePaymentRequest;
use crate::domain::qrcode::{MAX_IMAGE_SIZE, MIN_IMAGE_SIZE};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(field, message)])
    }

    pub fn push(&mut self, result: Result<(), FieldError>) {
        if let Err(e) = result {
            self.0.push(e);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

pub fn max_amount() -> Decimal {
    Decimal::new(99_999_999, 2)
}

pub fn validate_amount(amount: &Decimal) -> Result<(), FieldError> {
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(FieldError::new("amount", "must be greater than 0"));
    }
    if *amount > max_amount() {
        return Err(FieldError::new("amount", "cannot exceed 999,999.99"));
    }
    if amount.normalize().scale() > 2 {
        return Err(FieldError::new("amount", "at most two decimal places"));
    }
    Ok(())
}

pub fn validate_create_payment(req: &CreatePaymentRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.push(validate_amount(&req.amount));
    if req.municipality_id.is_nil() {
        errors.push(Err(FieldError::new("municipalityId", "is required")));
    }
    errors.into_result()
}

pub fn validate_expiration_minutes(minutes: Option<i64>) -> Result<(), FieldError> {
    match minutes {
        Some(m) if m > MAX_QR_EXPIRATION_MINUTES => Err(FieldError::new(
            "expirationMins",
            format!("cannot exceed {MAX_QR_EXPIRATION_MINUTES} minutes"),
        )),
        _ => Ok(()),
    }
}

pub fn validate_image_size(size: Option<u32>) -> Result<(), FieldError> {
    match size {
        Some(s) if s != 0 && !(MIN_IMAGE_SIZE..=MAX_IMAGE_SIZE).contains(&s) => Err(FieldError::new(
            "size",
            format!("must be between {MIN_IMAGE_SIZE} and {MAX_IMAGE_SIZE} pixels"),
        )),
        _ => Ok(()),
    }
}

pub fn validate_code(code: &str) -> Result<(), FieldError> {
    if code.trim().is_empty() {
        return Err(FieldError::new("code", "is required"));
    }
    Ok(())
}

pub fn parse_optional<T>(field: &str, raw: Option<&str>) -> Result<Option<T>, FieldError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|e| FieldError::new(field, e.to_string())),
    }
}
