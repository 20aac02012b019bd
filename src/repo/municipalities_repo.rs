use crate::domain::municipality::{Municipality, PaymentConfig};
use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct MunicipalitiesRepo {
    pub pool: PgPool,
}

impl MunicipalitiesRepo {
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Municipality>> {
        let row = sqlx::query("SELECT id, name, code, payment_config FROM municipalities WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| {
            let raw: Option<serde_json::Value> = r.get("payment_config");
            Municipality {
                id: r.get("id"),
                name: r.get("name"),
                code: r.get("code"),
                payment_config: raw.and_then(|v| parse_config(id, v)),
            }
        }))
    }
}

/// A malformed stored config degrades to system defaults instead of failing
/// every payment for that municipality.
fn parse_config(id: Uuid, raw: serde_json::Value) -> Option<PaymentConfig> {
    match serde_json::from_value(raw) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            tracing::warn!("ignoring unreadable payment_config for municipality {}: {}", id, e);
            None
        }
    }
}
