use crate::domain::municipality::Municipality;
use crate::domain::payment::{
    Page, Payment, PaymentFilter, PaymentStatus, PaymentTransaction, TransactionData,
};
use crate::repo::{CodeAssignment, LedgerStore, StatusChange};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Ledger {
    municipalities: HashMap<Uuid, Municipality>,
    users: HashSet<Uuid>,
    payments: HashMap<Uuid, Payment>,
    transactions: Vec<PaymentTransaction>,
}

impl Ledger {
    fn code_taken(&self, code: &str, except: Option<Uuid>) -> bool {
        self.payments
            .values()
            .any(|p| p.qr_code.as_deref() == Some(code) && Some(p.id) != except)
    }
}

#[derive(Default)]
pub struct MemoryLedgerStore {
    inner: RwLock<Ledger>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_municipality(&self, municipality: Municipality) {
        self.inner
            .write()
            .await
            .municipalities
            .insert(municipality.id, municipality);
    }

    pub async fn add_user(&self, id: Uuid) {
        self.inner.write().await.users.insert(id);
    }

    pub async fn transaction_count(&self) -> usize {
        self.inner.read().await.transactions.len()
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn find_municipality(&self, id: Uuid) -> Result<Option<Municipality>> {
        Ok(self.inner.read().await.municipalities.get(&id).cloned())
    }

    async fn user_exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.inner.read().await.users.contains(&id))
    }

    async fn insert_payment(&self, payment: &Payment, entry: &PaymentTransaction) -> Result<()> {
        let mut ledger = self.inner.write().await;
        if ledger.payments.contains_key(&payment.id) {
            bail!("duplicate payment id {}", payment.id);
        }
        if let Some(code) = payment.qr_code.as_deref() {
            if ledger.code_taken(code, None) {
                bail!("duplicate qr_code");
            }
        }
        ledger.payments.insert(payment.id, payment.clone());
        ledger.transactions.push(entry.clone());
        Ok(())
    }

    async fn find_payment(&self, id: Uuid) -> Result<Option<Payment>> {
        Ok(self.inner.read().await.payments.get(&id).cloned())
    }

    async fn find_payment_by_code(&self, code: &str) -> Result<Option<Payment>> {
        Ok(self
            .inner
            .read()
            .await
            .payments
            .values()
            .find(|p| p.qr_code.as_deref() == Some(code))
            .cloned())
    }

    async fn list_transactions(&self, payment_id: Uuid) -> Result<Vec<PaymentTransaction>> {
        Ok(self
            .inner
            .read()
            .await
            .transactions
            .iter()
            .filter(|t| t.payment_id == payment_id)
            .cloned()
            .collect())
    }

    async fn list_payments(&self, filter: &PaymentFilter, page: Page) -> Result<(Vec<Payment>, i64)> {
        let ledger = self.inner.read().await;
        let mut matched: Vec<&Payment> = ledger.payments.values().filter(|p| filter.matches(p)).collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matched.len() as i64;
        let items = matched
            .into_iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }

    async fn transition_status(&self, change: &StatusChange) -> Result<bool> {
        let mut ledger = self.inner.write().await;
        let Some(payment) = ledger.payments.get_mut(&change.payment_id) else {
            return Ok(false);
        };
        if payment.status != change.from {
            return Ok(false);
        }

        payment.status = change.to;
        if change.paid_at.is_some() {
            payment.paid_at = change.paid_at;
        }
        payment.updated_at = change.at;
        ledger.transactions.push(change.entry.clone());
        Ok(true)
    }

    async fn code_exists(&self, code: &str) -> Result<bool> {
        Ok(self.inner.read().await.code_taken(code, None))
    }

    async fn assign_code(
        &self,
        payment_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<CodeAssignment> {
        let mut ledger = self.inner.write().await;
        if ledger.code_taken(code, Some(payment_id)) {
            return Ok(CodeAssignment::Collision);
        }
        let Some(payment) = ledger.payments.get_mut(&payment_id) else {
            return Ok(CodeAssignment::Missing);
        };
        if payment.status != PaymentStatus::Pending {
            return Ok(CodeAssignment::NotPending(payment.status));
        }
        payment.qr_code = Some(code.to_string());
        payment.updated_at = now;
        Ok(CodeAssignment::Assigned)
    }

    async fn expire_stale(
        &self,
        cutoff: DateTime<Utc>,
        transaction_data: &TransactionData,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut ledger = self.inner.write().await;
        let mut entries = Vec::new();
        for payment in ledger.payments.values_mut() {
            if payment.status == PaymentStatus::Pending && payment.created_at < cutoff {
                payment.status = PaymentStatus::Expired;
                payment.updated_at = now;
                entries.push(PaymentTransaction::record(
                    payment.id,
                    PaymentStatus::Expired,
                    Some(transaction_data.clone()),
                    now,
                ));
            }
        }
        let moved = entries.len() as u64;
        ledger.transactions.extend(entries);
        Ok(moved)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
