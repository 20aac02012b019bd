#![allow(dead_code)]

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use municollect_payments::domain::municipality::{Municipality, PaymentConfig};
use municollect_payments::domain::payment::{
    CreatePaymentRequest, Currency, Page, Payment, PaymentFilter, PaymentStatus,
    PaymentTransaction, ServiceType, TransactionData,
};
use municollect_payments::repo::memory::MemoryLedgerStore;
use municollect_payments::repo::{CodeAssignment, LedgerStore, StatusChange};
use municollect_payments::service::payment_service::PaymentService;
use municollect_payments::service::qr_service::QrCodeService;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub struct Fixture {
    pub store: Arc<MemoryLedgerStore>,
    pub payments: PaymentService,
    pub qr: QrCodeService,
    pub municipality: Municipality,
    pub user: Uuid,
}

pub fn municipality(config: Option<PaymentConfig>) -> Municipality {
    Municipality {
        id: Uuid::new_v4(),
        name: "Port Alder".to_string(),
        code: "PALD".to_string(),
        payment_config: config,
    }
}

pub fn config(currency: Option<Currency>, qr_minutes: Option<i64>) -> PaymentConfig {
    PaymentConfig {
        currency,
        qr_code_expiration_minutes: qr_minutes,
        ..PaymentConfig::default()
    }
}

pub async fn fixture(config: Option<PaymentConfig>) -> Fixture {
    let store = Arc::new(MemoryLedgerStore::new());
    let municipality = municipality(config);
    let user = Uuid::new_v4();
    store.add_municipality(municipality.clone()).await;
    store.add_user(user).await;

    let dyn_store: Arc<dyn LedgerStore> = store.clone();
    Fixture {
        payments: PaymentService::new(dyn_store.clone()),
        qr: QrCodeService::new(dyn_store),
        store,
        municipality,
        user,
    }
}

pub fn request(municipality_id: Uuid, cents: i64) -> CreatePaymentRequest {
    CreatePaymentRequest {
        municipality_id,
        service_type: ServiceType::WasteManagement,
        amount: Decimal::new(cents, 2),
        currency: None,
        due_date: None,
        user_details: None,
    }
}

impl Fixture {
    pub async fn create(&self, cents: i64) -> Payment {
        self.payments
            .create_payment(self.user, request(self.municipality.id, cents))
            .await
            .unwrap()
    }

    /// Inserts a payment straight into the store as if it were created
    /// `age` ago and currently sits in `status`.
    pub async fn seed(&self, age: Duration, status: PaymentStatus) -> Payment {
        let created = Utc::now() - age;
        let mut payment = Payment::pending(
            self.user,
            &request(self.municipality.id, 2_500),
            self.municipality.payment_config.as_ref(),
            created,
        );
        payment.status = status;
        let entry = PaymentTransaction::record(payment.id, status, None, created);
        self.store.insert_payment(&payment, &entry).await.unwrap();
        payment
    }

    /// Binds a known code straight through the store, skipping issuance.
    pub async fn bind_code(&self, payment_id: Uuid, code: &str) {
        let bound = self.store.assign_code(payment_id, code, Utc::now()).await.unwrap();
        assert_eq!(bound, CodeAssignment::Assigned);
    }

    pub async fn history_len(&self, payment_id: Uuid) -> usize {
        self.store.list_transactions(payment_id).await.unwrap().len()
    }
}

/// Wraps the in-memory ledger and injects failures into selected calls.
pub struct FlakyStore {
    pub inner: Arc<MemoryLedgerStore>,
    pub fail_transitions: bool,
    pub codes_always_taken: bool,
    /// `assign_code` reports a unique-index clash this many more times.
    pub write_collisions: AtomicU32,
    pub assign_calls: AtomicU32,
}

impl FlakyStore {
    pub fn over(inner: Arc<MemoryLedgerStore>) -> Self {
        Self {
            inner,
            fail_transitions: false,
            codes_always_taken: false,
            write_collisions: AtomicU32::new(0),
            assign_calls: AtomicU32::new(0),
        }
    }

    pub fn assign_calls(&self) -> u32 {
        self.assign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LedgerStore for FlakyStore {
    async fn find_municipality(&self, id: Uuid) -> Result<Option<Municipality>> {
        self.inner.find_municipality(id).await
    }

    async fn user_exists(&self, id: Uuid) -> Result<bool> {
        self.inner.user_exists(id).await
    }

    async fn insert_payment(&self, payment: &Payment, entry: &PaymentTransaction) -> Result<()> {
        self.inner.insert_payment(payment, entry).await
    }

    async fn find_payment(&self, id: Uuid) -> Result<Option<Payment>> {
        self.inner.find_payment(id).await
    }

    async fn find_payment_by_code(&self, code: &str) -> Result<Option<Payment>> {
        self.inner.find_payment_by_code(code).await
    }

    async fn list_transactions(&self, payment_id: Uuid) -> Result<Vec<PaymentTransaction>> {
        self.inner.list_transactions(payment_id).await
    }

    async fn list_payments(&self, filter: &PaymentFilter, page: Page) -> Result<(Vec<Payment>, i64)> {
        self.inner.list_payments(filter, page).await
    }

    async fn transition_status(&self, change: &StatusChange) -> Result<bool> {
        if self.fail_transitions {
            bail!("connection reset by peer");
        }
        self.inner.transition_status(change).await
    }

    async fn code_exists(&self, code: &str) -> Result<bool> {
        if self.codes_always_taken {
            return Ok(true);
        }
        self.inner.code_exists(code).await
    }

    async fn assign_code(
        &self,
        payment_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<CodeAssignment> {
        self.assign_calls.fetch_add(1, Ordering::SeqCst);
        let pending_clash = self
            .write_collisions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if pending_clash {
            return Ok(CodeAssignment::Collision);
        }
        self.inner.assign_code(payment_id, code, now).await
    }

    async fn expire_stale(
        &self,
        cutoff: DateTime<Utc>,
        transaction_data: &TransactionData,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        self.inner.expire_stale(cutoff, transaction_data, now).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}
