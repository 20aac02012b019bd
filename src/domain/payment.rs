use crate::domain::municipality::PaymentConfig;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type TransactionData = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    WasteManagement,
    WaterBill,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::WasteManagement => "waste_management",
            ServiceType::WaterBill => "water_bill",
        }
    }
}

impl FromStr for ServiceType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waste_management" => Ok(ServiceType::WasteManagement),
            "water_bill" => Ok(ServiceType::WaterBill),
            other => Err(UnknownVariant {
                kind: "service type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Expired,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
        PaymentStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "expired" => Ok(PaymentStatus::Expired),
            other => Err(UnknownVariant {
                kind: "payment status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "GBP")]
    Gbp,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }
}

impl FromStr for Currency {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            other => Err(UnknownVariant {
                kind: "currency",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub municipality_id: Uuid,
    pub user_id: Uuid,
    pub service_type: ServiceType,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_data: Option<TransactionData>,
    pub created_at: DateTime<Utc>,
}

impl PaymentTransaction {
    pub fn record(
        payment_id: Uuid,
        status: PaymentStatus,
        transaction_data: Option<TransactionData>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            payment_id,
            status,
            transaction_data,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub municipality_id: Uuid,
    pub service_type: ServiceType,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_details: Option<TransactionData>,
}

pub fn resolve_currency(explicit: Option<Currency>, config: Option<&PaymentConfig>) -> Currency {
    explicit
        .or_else(|| config.and_then(|c| c.currency))
        .unwrap_or_default()
}

impl Payment {
    pub fn pending(
        user_id: Uuid,
        req: &CreatePaymentRequest,
        config: Option<&PaymentConfig>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            municipality_id: req.municipality_id,
            user_id,
            service_type: req.service_type,
            amount: req.amount,
            currency: resolve_currency(req.currency, config),
            status: PaymentStatus::Pending,
            qr_code: None,
            due_date: req.due_date,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentWithHistory {
    #[serde(flatten)]
    pub payment: Payment,
    pub transactions: Vec<PaymentTransaction>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusView {
    pub id: Uuid,
    pub status: PaymentStatus,
    pub amount: Decimal,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<&Payment> for PaymentStatusView {
    fn from(p: &Payment) -> Self {
        Self {
            id: p.id,
            status: p.status,
            amount: p.amount,
            currency: p.currency,
            created_at: p.created_at,
            paid_at: p.paid_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: PaymentStatus,
    #[serde(default)]
    pub transaction_data: Option<TransactionData>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentFilter {
    pub municipality_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub service_type: Option<ServiceType>,
    pub status: Option<PaymentStatus>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl PaymentFilter {
    pub fn matches(&self, p: &Payment) -> bool {
        self.municipality_id.map_or(true, |id| p.municipality_id == id)
            && self.user_id.map_or(true, |id| p.user_id == id)
            && self.service_type.map_or(true, |s| p.service_type == s)
            && self.status.map_or(true, |s| p.status == s)
            && self.date_from.map_or(true, |from| p.created_at >= from)
            && self.date_to.map_or(true, |to| p.created_at <= to)
    }
}

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    pub fn from_query(limit: Option<&str>, offset: Option<&str>) -> Self {
        let limit = limit
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|l| *l > 0)
            .map(|l| l.min(MAX_PAGE_LIMIT))
            .unwrap_or(DEFAULT_PAGE_LIMIT);
        let offset = offset
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|o| *o >= 0)
            .unwrap_or(0);
        Self { limit, offset }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentPage {
    pub payments: Vec<Payment>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
