use crate::domain::payment::{
    CreatePaymentRequest, Page, Payment, PaymentFilter, PaymentPage, PaymentStatus,
    PaymentStatusView, PaymentTransaction, PaymentWithHistory, TransactionData,
};
use crate::domain::transitions::can_transition;
use crate::domain::validation::{validate_create_payment, FieldError};
use crate::error::PaymentError;
use crate::repo::{LedgerStore, StatusChange};
use std::sync::Arc;
use uuid::Uuid;

// Retries for guarded writes lost to a concurrent writer.
const STATUS_WRITE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct PaymentService {
    pub store: Arc<dyn LedgerStore>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn create_payment(
        &self,
        user_id: Uuid,
        req: CreatePaymentRequest,
    ) -> Result<Payment, PaymentError> {
        let mut errors = validate_create_payment(&req).err().unwrap_or_default();
        if user_id.is_nil() {
            errors.0.push(FieldError::new("userId", "is required"));
        }
        errors.into_result()?;

        let municipality = self
            .store
            .find_municipality(req.municipality_id)
            .await?
            .ok_or(PaymentError::NotFound("municipality"))?;
        if !self.store.user_exists(user_id).await? {
            return Err(PaymentError::NotFound("user"));
        }

        let now = chrono::Utc::now();
        let payment = Payment::pending(user_id, &req, municipality.payment_config.as_ref(), now);
        let entry = PaymentTransaction::record(
            payment.id,
            PaymentStatus::Pending,
            req.user_details,
            now,
        );
        self.store.insert_payment(&payment, &entry).await?;

        tracing::info!(
            "payment {} created for municipality {} ({} {} {})",
            payment.id,
            payment.municipality_id,
            payment.service_type.as_str(),
            payment.amount,
            payment.currency.as_str()
        );
        Ok(payment)
    }

    pub async fn get_payment(
        &self,
        payment_id: Uuid,
        owner: Option<Uuid>,
    ) -> Result<PaymentWithHistory, PaymentError> {
        let payment = self.load(payment_id, owner).await?;
        self.with_history(payment).await
    }

    pub async fn get_status(
        &self,
        payment_id: Uuid,
        owner: Option<Uuid>,
    ) -> Result<PaymentStatusView, PaymentError> {
        let payment = self.load(payment_id, owner).await?;
        Ok(PaymentStatusView::from(&payment))
    }

    pub async fn history(
        &self,
        filter: &PaymentFilter,
        page: Page,
    ) -> Result<PaymentPage, PaymentError> {
        let (payments, total) = self.store.list_payments(filter, page).await?;
        Ok(PaymentPage {
            payments,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    pub async fn payments_for_user(&self, user_id: Uuid, page: Page) -> Result<PaymentPage, PaymentError> {
        let filter = PaymentFilter {
            user_id: Some(user_id),
            ..PaymentFilter::default()
        };
        self.history(&filter, page).await
    }

    pub async fn payments_for_municipality(
        &self,
        municipality_id: Uuid,
        page: Page,
    ) -> Result<PaymentPage, PaymentError> {
        let filter = PaymentFilter {
            municipality_id: Some(municipality_id),
            ..PaymentFilter::default()
        };
        self.history(&filter, page).await
    }

    pub async fn update_status(
        &self,
        payment_id: Uuid,
        to: PaymentStatus,
        transaction_data: Option<TransactionData>,
    ) -> Result<PaymentWithHistory, PaymentError> {
        let mut from = self.load(payment_id, None).await?.status;

        for _ in 0..STATUS_WRITE_ATTEMPTS {
            if !can_transition(from, to) {
                return Err(PaymentError::InvalidTransition { from, to });
            }

            let change = StatusChange::new(payment_id, from, to, transaction_data.clone(), chrono::Utc::now());
            if self.store.transition_status(&change).await? {
                tracing::info!("payment {} moved {} -> {}", payment_id, from, to);
                let payment = self.load(payment_id, None).await?;
                return self.with_history(payment).await;
            }

            let latest = self.load(payment_id, None).await?.status;
            tracing::warn!(
                "payment {} changed to {} while moving {} -> {}",
                payment_id,
                latest,
                from,
                to
            );
            from = latest;
        }

        Err(PaymentError::InvalidTransition { from, to })
    }

    async fn load(&self, payment_id: Uuid, owner: Option<Uuid>) -> Result<Payment, PaymentError> {
        self.store
            .find_payment(payment_id)
            .await?
            .filter(|p| owner.map_or(true, |o| p.user_id == o))
            .ok_or(PaymentError::NotFound("payment"))
    }

    async fn with_history(&self, payment: Payment) -> Result<PaymentWithHistory, PaymentError> {
        let transactions = self.store.list_transactions(payment.id).await?;
        Ok(PaymentWithHistory {
            payment,
            transactions,
        })
    }
}

