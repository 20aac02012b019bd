use crate::domain::payment::{Page, Payment, PaymentFilter, PaymentStatus, TransactionData};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

const PAYMENT_COLUMNS: &str = "id, municipality_id, user_id, service_type, amount, currency, status, \
     qr_code, due_date, paid_at, created_at, updated_at";

#[derive(Clone)]
pub struct PaymentsRepo {
    pub pool: PgPool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeWrite {
    Written,
    Duplicate,
    NoPendingRow,
}

pub(crate) fn payment_from_row(r: &PgRow) -> Result<Payment> {
    Ok(Payment {
        id: r.get("id"),
        municipality_id: r.get("municipality_id"),
        user_id: r.get("user_id"),
        service_type: r.get::<String, _>("service_type").parse()?,
        amount: r.get("amount"),
        currency: r.get::<String, _>("currency").parse()?,
        status: r.get::<String, _>("status").parse()?,
        qr_code: r.get("qr_code"),
        due_date: r.get("due_date"),
        paid_at: r.get("paid_at"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

impl PaymentsRepo {
    pub async fn insert_tx(tx: &mut Transaction<'_, Postgres>, p: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, municipality_id, user_id, service_type, amount, currency, status,
                qr_code, due_date, paid_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(p.id)
        .bind(p.municipality_id)
        .bind(p.user_id)
        .bind(p.service_type.as_str())
        .bind(p.amount)
        .bind(p.currency.as_str())
        .bind(p.status.as_str())
        .bind(p.qr_code.as_deref())
        .bind(p.due_date)
        .bind(p.paid_at)
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(payment_from_row).transpose()
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE qr_code = $1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(payment_from_row).transpose()
    }

    pub async fn code_exists(&self, code: &str) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM payments WHERE qr_code = $1) AS taken")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("taken"))
    }

    pub async fn list(&self, filter: &PaymentFilter, page: Page) -> Result<(Vec<Payment>, i64)> {
        const WHERE: &str = r#"
            WHERE ($1::uuid IS NULL OR municipality_id = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
              AND ($3::text IS NULL OR service_type = $3)
              AND ($4::text IS NULL OR status = $4)
              AND ($5::timestamptz IS NULL OR created_at >= $5)
              AND ($6::timestamptz IS NULL OR created_at <= $6)
        "#;

        let total_row = sqlx::query(&format!("SELECT COUNT(*) AS total FROM payments {WHERE}"))
            .bind(filter.municipality_id)
            .bind(filter.user_id)
            .bind(filter.service_type.map(|s| s.as_str()))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.date_from)
            .bind(filter.date_to)
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = total_row.get("total");

        let rows = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments {WHERE} ORDER BY created_at DESC, id ASC LIMIT $7 OFFSET $8"
        ))
        .bind(filter.municipality_id)
        .bind(filter.user_id)
        .bind(filter.service_type.map(|s| s.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        let payments = rows.iter().map(payment_from_row).collect::<Result<Vec<_>>>()?;
        Ok((payments, total))
    }

    pub async fn update_status_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE payments
            SET status = $3, paid_at = COALESCE($4, paid_at), updated_at = $5
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(paid_at)
        .bind(now)
        .execute(tx.as_mut())
        .await?;

        Ok(res.rows_affected())
    }

    pub async fn write_code(&self, id: Uuid, code: &str, now: DateTime<Utc>) -> Result<CodeWrite> {
        let res = sqlx::query(
            "UPDATE payments SET qr_code = $2, updated_at = $3 WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(code)
        .bind(now)
        .execute(&self.pool)
        .await;

        match res {
            Ok(done) if done.rows_affected() == 0 => Ok(CodeWrite::NoPendingRow),
            Ok(_) => Ok(CodeWrite::Written),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(CodeWrite::Duplicate),
            Err(e) => Err(e).context("failed to bind QR code to payment"),
        }
    }

    pub async fn expire_stale(
        &self,
        cutoff: DateTime<Utc>,
        transaction_data: &TransactionData,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let res = sqlx::query(
            r#"
            WITH expired AS (
                UPDATE payments
                SET status = 'expired', updated_at = $2
                WHERE status = 'pending' AND created_at < $1
                RETURNING id
            )
            INSERT INTO payment_transactions (id, payment_id, status, transaction_data, created_at)
            SELECT gen_random_uuid(), expired.id, 'expired', $3, $2
            FROM expired
            "#,
        )
        .bind(cutoff)
        .bind(now)
        .bind(serde_json::Value::Object(transaction_data.clone()))
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected())
    }
}
