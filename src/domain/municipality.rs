use crate::domain::payment::Currency;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_QR_EXPIRATION_MINUTES: i64 = 60;
pub const MIN_QR_EXPIRATION_MINUTES: i64 = 1;
pub const MAX_QR_EXPIRATION_MINUTES: i64 = 1440;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    BankTransfer,
    Cash,
    MobilePayment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfig {
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethod>,
    #[serde(default)]
    pub qr_code_expiration_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waste_management_fee: Option<rust_decimal::Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_bill_enabled: Option<bool>,
}

impl PaymentConfig {
    pub fn qr_expiration_minutes(&self) -> Option<i64> {
        self.qr_code_expiration_minutes
            .filter(|m| (MIN_QR_EXPIRATION_MINUTES..=MAX_QR_EXPIRATION_MINUTES).contains(m))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Municipality {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub payment_config: Option<PaymentConfig>,
}

impl Municipality {
    pub fn qr_expiration_minutes(&self) -> i64 {
        self.payment_config
            .as_ref()
            .and_then(PaymentConfig::qr_expiration_minutes)
            .unwrap_or(DEFAULT_QR_EXPIRATION_MINUTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn muni(config: Option<PaymentConfig>) -> Municipality {
        Municipality {
            id: Uuid::new_v4(),
            name: "Springfield".to_string(),
            code: "SPR".to_string(),
            payment_config: config,
        }
    }

    #[test]
    fn qr_window_falls_back_to_default() {
        assert_eq!(muni(None).qr_expiration_minutes(), 60);
        let cfg = PaymentConfig {
            qr_code_expiration_minutes: Some(30),
            ..PaymentConfig::default()
        };
        assert_eq!(muni(Some(cfg)).qr_expiration_minutes(), 30);
        let out_of_range = PaymentConfig {
            qr_code_expiration_minutes: Some(5000),
            ..PaymentConfig::default()
        };
        assert_eq!(muni(Some(out_of_range)).qr_expiration_minutes(), 60);
    }

    #[test]
    fn config_parses_stored_json() {
        let cfg: PaymentConfig = serde_json::from_value(serde_json::json!({
            "currency": "EUR",
            "paymentMethods": ["cash", "mobile_payment"],
            "qrCodeExpirationMinutes": 45
        }))
        .unwrap();
        assert_eq!(cfg.currency, Some(Currency::Eur));
        assert_eq!(cfg.payment_methods, vec![PaymentMethod::Cash, PaymentMethod::MobilePayment]);
        assert_eq!(cfg.qr_expiration_minutes(), Some(45));
    }
}
