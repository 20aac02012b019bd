use crate::domain::payment::{PaymentTransaction, TransactionData};
use anyhow::Result;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct PaymentTransactionsRepo {
    pub pool: PgPool,
}

impl PaymentTransactionsRepo {
    pub async fn insert_tx(
        tx: &mut Transaction<'_, Postgres>,
        entry: &PaymentTransaction,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payment_transactions (id, payment_id, status, transaction_data, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id)
        .bind(entry.payment_id)
        .bind(entry.status.as_str())
        .bind(entry.transaction_data.clone().map(serde_json::Value::Object))
        .bind(entry.created_at)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    pub async fn list_by_payment_id(&self, payment_id: Uuid) -> Result<Vec<PaymentTransaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, payment_id, status, transaction_data, created_at
            FROM payment_transactions
            WHERE payment_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(payment_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let data: Option<serde_json::Value> = row.get("transaction_data");
                Ok(PaymentTransaction {
                    id: row.get("id"),
                    payment_id: row.get("payment_id"),
                    status: row.get::<String, _>("status").parse()?,
                    transaction_data: data.and_then(as_object),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }
}

fn as_object(v: serde_json::Value) -> Option<TransactionData> {
    match v {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    }
}
