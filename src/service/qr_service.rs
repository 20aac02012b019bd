use crate::domain::municipality::{Municipality, DEFAULT_QR_EXPIRATION_MINUTES};
use crate::domain::payment::{Payment, PaymentStatus, TransactionData};
use crate::domain::qrcode::{
    is_past_deadline, redemption_deadline, GenerateQrRequest, QrArtifact, QrCodeData,
    DEFAULT_IMAGE_SIZE,
};
use crate::domain::validation::{
    validate_code, validate_expiration_minutes, validate_image_size, ValidationErrors,
};
use crate::error::PaymentError;
use crate::repo::{CodeAssignment, LedgerStore, StatusChange};
use crate::service::qr_render::{code_hint, new_redemption_token, png_data_url};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

pub const MAX_CODE_ATTEMPTS: u32 = 10;

#[derive(Clone)]
pub struct QrCodeService {
    pub store: Arc<dyn LedgerStore>,
    pub max_code_attempts: u32,
}

#[derive(Serialize)]
struct ScanPayload<'a> {
    code: &'a str,
    #[serde(flatten)]
    data: &'a QrCodeData,
}

pub fn resolve_expiration_minutes(explicit: Option<i64>, municipality: Option<&Municipality>) -> i64 {
    explicit
        .filter(|m| *m > 0)
        .unwrap_or_else(|| {
            municipality
                .map(Municipality::qr_expiration_minutes)
                .unwrap_or(DEFAULT_QR_EXPIRATION_MINUTES)
        })
}

impl QrCodeService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            max_code_attempts: MAX_CODE_ATTEMPTS,
        }
    }

    pub async fn generate_code(
        &self,
        payment_id: Uuid,
        req: &GenerateQrRequest,
    ) -> Result<QrArtifact, PaymentError> {
        let mut errors = ValidationErrors::default();
        errors.push(validate_expiration_minutes(req.expiration_mins));
        errors.push(validate_image_size(req.size));
        errors.into_result()?;

        let payment = self
            .store
            .find_payment(payment_id)
            .await?
            .ok_or(PaymentError::NotFound("payment"))?;
        if payment.status != PaymentStatus::Pending {
            return Err(PaymentError::InvalidState {
                status: payment.status,
            });
        }

        let municipality = self.store.find_municipality(payment.municipality_id).await?;
        let minutes = resolve_expiration_minutes(req.expiration_mins, municipality.as_ref());

        // A code never outlives the window validation enforces.
        let now = Utc::now();
        let window = resolve_expiration_minutes(None, municipality.as_ref());
        let deadline = redemption_deadline(payment.created_at, window);
        if is_past_deadline(payment.created_at, window, now) {
            return Err(PaymentError::Expired);
        }

        let code = self.bind_unique_code(payment.id, now).await?;
        let data = QrCodeData::for_payment(&payment, (now + Duration::minutes(minutes)).min(deadline));

        let size = req.size.filter(|s| *s > 0).unwrap_or(DEFAULT_IMAGE_SIZE);
        let payload = serde_json::to_vec(&ScanPayload {
            code: &code,
            data: &data,
        })
        .map_err(anyhow::Error::from)?;
        let image_url = png_data_url(&payload, size)?;

        tracing::info!(
            "issued QR code {}.. for payment {} valid until {}",
            code_hint(&code),
            payment.id,
            data.expires_at
        );
        Ok(QrArtifact {
            code,
            data,
            image_url: Some(image_url),
        })
    }

    pub async fn regenerate_code(
        &self,
        payment_id: Uuid,
        req: &GenerateQrRequest,
    ) -> Result<QrArtifact, PaymentError> {
        self.generate_code(payment_id, req).await
    }

    pub async fn validate_code(&self, code: &str) -> Result<Payment, PaymentError> {
        let (payment, _) = self.validate_with_window(code, Utc::now()).await?;
        Ok(payment)
    }

    pub async fn code_details(&self, code: &str) -> Result<QrArtifact, PaymentError> {
        let (payment, minutes) = self.validate_with_window(code, Utc::now()).await?;
        let data = QrCodeData::for_payment(&payment, redemption_deadline(payment.created_at, minutes));
        Ok(QrArtifact {
            code: code.to_string(),
            data,
            image_url: None,
        })
    }

    async fn validate_with_window(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(Payment, i64), PaymentError> {
        validate_code(code)?;

        let payment = self
            .store
            .find_payment_by_code(code)
            .await?
            .ok_or(PaymentError::InvalidCode)?;
        if payment.status != PaymentStatus::Pending {
            return Err(PaymentError::CodeNoLongerValid {
                status: payment.status,
            });
        }

        let municipality = self.store.find_municipality(payment.municipality_id).await?;
        let minutes = resolve_expiration_minutes(None, municipality.as_ref());
        if is_past_deadline(payment.created_at, minutes, now) {
            self.flag_expired(&payment, now).await;
            return Err(PaymentError::Expired);
        }

        Ok((payment, minutes))
    }

    async fn flag_expired(&self, payment: &Payment, now: DateTime<Utc>) {
        let mut data = TransactionData::new();
        data.insert("reason".to_string(), "qr_code_expired".into());
        let change = StatusChange::new(
            payment.id,
            PaymentStatus::Pending,
            PaymentStatus::Expired,
            Some(data),
            now,
        );

        match self.store.transition_status(&change).await {
            Ok(true) => tracing::info!("payment {} expired at redemption", payment.id),
            Ok(false) => {}
            Err(e) => tracing::warn!("could not flag payment {} as expired: {:#}", payment.id, e),
        }
    }

    async fn bind_unique_code(&self, payment_id: Uuid, now: DateTime<Utc>) -> Result<String, PaymentError> {
        for _ in 0..self.max_code_attempts {
            let code = new_redemption_token()?;
            if self.store.code_exists(&code).await? {
                continue;
            }

            match self.store.assign_code(payment_id, &code, now).await? {
                CodeAssignment::Assigned => return Ok(code),
                CodeAssignment::Collision => continue,
                CodeAssignment::NotPending(status) => return Err(PaymentError::InvalidState { status }),
                CodeAssignment::Missing => return Err(PaymentError::NotFound("payment")),
            }
        }

        tracing::error!(
            "no unique QR code for payment {} after {} attempts",
            payment_id,
            self.max_code_attempts
        );
        Err(PaymentError::Conflict {
            attempts: self.max_code_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::municipality::PaymentConfig;

    fn muni(minutes: Option<i64>) -> Municipality {
        Municipality {
            id: Uuid::new_v4(),
            name: "Riverside".to_string(),
            code: "RVS".to_string(),
            payment_config: Some(PaymentConfig {
                qr_code_expiration_minutes: minutes,
                ..PaymentConfig::default()
            }),
        }
    }

    #[test]
    fn expiration_resolution_order() {
        let m = muni(Some(30));
        assert_eq!(resolve_expiration_minutes(Some(15), Some(&m)), 15);
        assert_eq!(resolve_expiration_minutes(Some(0), Some(&m)), 30);
        assert_eq!(resolve_expiration_minutes(None, Some(&m)), 30);
        assert_eq!(resolve_expiration_minutes(None, Some(&muni(None))), 60);
        assert_eq!(resolve_expiration_minutes(Some(-5), None), 60);
    }

    #[test]
    fn scan_payload_carries_code_and_data() {
        let data = QrCodeData {
            payment_id: Uuid::nil(),
            municipality_id: Uuid::nil(),
            amount: rust_decimal::Decimal::new(500, 2),
            currency: crate::domain::payment::Currency::Usd,
            service_type: crate::domain::payment::ServiceType::WasteManagement,
            expires_at: Utc::now(),
        };
        let v = serde_json::to_value(ScanPayload { code: "abc", data: &data }).unwrap();
        assert_eq!(v["code"], "abc");
        assert_eq!(v["serviceType"], "waste_management");
        assert!(v.get("expiresAt").is_some());
    }
}
