use crate::domain::payment::{Currency, Payment, ServiceType};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_IMAGE_SIZE: u32 = 256;
pub const MIN_IMAGE_SIZE: u32 = 32;
pub const MAX_IMAGE_SIZE: u32 = 2048;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeData {
    pub payment_id: Uuid,
    pub municipality_id: Uuid,
    pub amount: Decimal,
    pub currency: Currency,
    pub service_type: ServiceType,
    pub expires_at: DateTime<Utc>,
}

impl QrCodeData {
    pub fn for_payment(payment: &Payment, expires_at: DateTime<Utc>) -> Self {
        Self {
            payment_id: payment.id,
            municipality_id: payment.municipality_id,
            amount: payment.amount,
            currency: payment.currency,
            service_type: payment.service_type,
            expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrArtifact {
    pub code: String,
    pub data: QrCodeData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQrRequest {
    #[serde(default)]
    pub payment_id: Option<Uuid>,
    #[serde(default)]
    pub expiration_mins: Option<i64>,
    #[serde(default)]
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateQrRequest {
    #[serde(default)]
    pub code: String,
}

pub fn redemption_deadline(created_at: DateTime<Utc>, window_minutes: i64) -> DateTime<Utc> {
    created_at + Duration::minutes(window_minutes)
}

pub fn is_past_deadline(
    created_at: DateTime<Utc>,
    window_minutes: i64,
    now: DateTime<Utc>,
) -> bool {
    now > redemption_deadline(created_at, window_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_is_exclusive_of_the_boundary() {
        let created = Utc::now();
        let deadline = redemption_deadline(created, 30);
        assert_eq!(deadline - created, Duration::minutes(30));
        assert!(!is_past_deadline(created, 30, deadline));
        assert!(is_past_deadline(created, 30, deadline + Duration::seconds(1)));
    }

    #[test]
    fn payload_serializes_camel_case() {
        let data = QrCodeData {
            payment_id: Uuid::nil(),
            municipality_id: Uuid::nil(),
            amount: Decimal::new(1250, 2),
            currency: Currency::Eur,
            service_type: ServiceType::WaterBill,
            expires_at: Utc::now(),
        };
        let v = serde_json::to_value(&data).unwrap();
        for key in ["paymentId", "municipalityId", "amount", "currency", "serviceType", "expiresAt"] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert_eq!(v["serviceType"], "water_bill");
    }
}
