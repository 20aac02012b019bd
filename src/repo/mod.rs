use crate::domain::municipality::Municipality;
use crate::domain::payment::{
    Page, Payment, PaymentFilter, PaymentStatus, PaymentTransaction, TransactionData,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod memory;
pub mod municipalities_repo;
pub mod payment_transactions_repo;
pub mod payments_repo;
pub mod pg_ledger;
pub mod users_repo;

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub payment_id: Uuid,
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub entry: PaymentTransaction,
    pub at: DateTime<Utc>,
}

impl StatusChange {
    pub fn new(
        payment_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
        transaction_data: Option<TransactionData>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            payment_id,
            from,
            to,
            paid_at: (to == PaymentStatus::Completed).then_some(at),
            entry: PaymentTransaction::record(payment_id, to, transaction_data, at),
            at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeAssignment {
    Assigned,
    Collision,
    NotPending(PaymentStatus),
    Missing,
}

/// System of record for payments and their audit trail.
///
/// Multi-row writes (`insert_payment`, `transition_status`, `expire_stale`)
/// are atomic. Status writes only apply while the row still holds
/// `StatusChange::from`.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_municipality(&self, id: Uuid) -> Result<Option<Municipality>>;

    async fn user_exists(&self, id: Uuid) -> Result<bool>;

    async fn insert_payment(&self, payment: &Payment, entry: &PaymentTransaction) -> Result<()>;

    async fn find_payment(&self, id: Uuid) -> Result<Option<Payment>>;

    async fn find_payment_by_code(&self, code: &str) -> Result<Option<Payment>>;

    async fn list_transactions(&self, payment_id: Uuid) -> Result<Vec<PaymentTransaction>>;

    async fn list_payments(&self, filter: &PaymentFilter, page: Page) -> Result<(Vec<Payment>, i64)>;

    /// Returns `false` when the payment no longer holds `change.from`.
    async fn transition_status(&self, change: &StatusChange) -> Result<bool>;

    async fn code_exists(&self, code: &str) -> Result<bool>;

    async fn assign_code(
        &self,
        payment_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<CodeAssignment>;

    async fn expire_stale(
        &self,
        cutoff: DateTime<Utc>,
        transaction_data: &TransactionData,
        now: DateTime<Utc>,
    ) -> Result<u64>;

    async fn ping(&self) -> Result<()>;
}
