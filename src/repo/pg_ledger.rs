use crate::domain::municipality::Municipality;
use crate::domain::payment::{Page, Payment, PaymentFilter, PaymentTransaction, TransactionData};
use crate::repo::municipalities_repo::MunicipalitiesRepo;
use crate::repo::payment_transactions_repo::PaymentTransactionsRepo;
use crate::repo::payments_repo::{CodeWrite, PaymentsRepo};
use crate::repo::users_repo::UsersRepo;
use crate::repo::{CodeAssignment, LedgerStore, StatusChange};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgLedgerStore {
    pub pool: PgPool,
    pub payments_repo: PaymentsRepo,
    pub transactions_repo: PaymentTransactionsRepo,
    pub municipalities_repo: MunicipalitiesRepo,
    pub users_repo: UsersRepo,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            payments_repo: PaymentsRepo { pool: pool.clone() },
            transactions_repo: PaymentTransactionsRepo { pool: pool.clone() },
            municipalities_repo: MunicipalitiesRepo { pool: pool.clone() },
            users_repo: UsersRepo { pool: pool.clone() },
            pool,
        }
    }
}

#[async_trait::async_trait]
impl LedgerStore for PgLedgerStore {
    async fn find_municipality(&self, id: Uuid) -> Result<Option<Municipality>> {
        self.municipalities_repo
            .find_by_id(id)
            .await
            .context("failed to load municipality")
    }

    async fn user_exists(&self, id: Uuid) -> Result<bool> {
        self.users_repo.exists(id).await.context("failed to look up user")
    }

    async fn insert_payment(&self, payment: &Payment, entry: &PaymentTransaction) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        PaymentsRepo::insert_tx(&mut tx, payment)
            .await
            .context("failed to create payment")?;
        PaymentTransactionsRepo::insert_tx(&mut tx, entry)
            .await
            .context("failed to create payment transaction")?;
        tx.commit().await.context("failed to commit payment creation")?;
        Ok(())
    }

    async fn find_payment(&self, id: Uuid) -> Result<Option<Payment>> {
        self.payments_repo.find_by_id(id).await.context("failed to get payment")
    }

    async fn find_payment_by_code(&self, code: &str) -> Result<Option<Payment>> {
        self.payments_repo
            .find_by_code(code)
            .await
            .context("failed to look up QR code")
    }

    async fn list_transactions(&self, payment_id: Uuid) -> Result<Vec<PaymentTransaction>> {
        self.transactions_repo
            .list_by_payment_id(payment_id)
            .await
            .context("failed to load payment transactions")
    }

    async fn list_payments(&self, filter: &PaymentFilter, page: Page) -> Result<(Vec<Payment>, i64)> {
        self.payments_repo
            .list(filter, page)
            .await
            .context("failed to get payment history")
    }

    async fn transition_status(&self, change: &StatusChange) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let moved = PaymentsRepo::update_status_tx(
            &mut tx,
            change.payment_id,
            change.from,
            change.to,
            change.paid_at,
            change.at,
        )
        .await
        .context("failed to update payment status")?;

        if moved == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        PaymentTransactionsRepo::insert_tx(&mut tx, &change.entry)
            .await
            .context("failed to create payment transaction")?;
        tx.commit()
            .await
            .context("failed to commit payment status update")?;
        Ok(true)
    }

    async fn code_exists(&self, code: &str) -> Result<bool> {
        self.payments_repo
            .code_exists(code)
            .await
            .context("failed to check QR code uniqueness")
    }

    async fn assign_code(
        &self,
        payment_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<CodeAssignment> {
        match self.payments_repo.write_code(payment_id, code, now).await? {
            CodeWrite::Written => Ok(CodeAssignment::Assigned),
            CodeWrite::Duplicate => Ok(CodeAssignment::Collision),
            CodeWrite::NoPendingRow => Ok(match self.find_payment(payment_id).await? {
                Some(p) => CodeAssignment::NotPending(p.status),
                None => CodeAssignment::Missing,
            }),
        }
    }

    async fn expire_stale(
        &self,
        cutoff: DateTime<Utc>,
        transaction_data: &TransactionData,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        self.payments_repo
            .expire_stale(cutoff, transaction_data, now)
            .await
            .context("failed to expire old payments")
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
