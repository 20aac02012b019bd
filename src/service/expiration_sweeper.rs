use crate::domain::payment::TransactionData;
use crate::repo::LedgerStore;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_STALENESS_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub expired: u64,
    pub cutoff: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ExpirationSweeper {
    pub store: Arc<dyn LedgerStore>,
    pub staleness: Duration,
    pub interval: std::time::Duration,
}

impl ExpirationSweeper {
    pub async fn run(self) {
        tracing::info!(
            "expiration sweeper started (staleness {}h, every {}s)",
            self.staleness.num_hours(),
            self.interval.as_secs()
        );
        loop {
            if let Err(err) = self.sweep_once(Utc::now()).await {
                tracing::error!("expiration sweep error: {:#}", err);
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let cutoff = now - self.staleness;
        let mut data = TransactionData::new();
        data.insert("reason".to_string(), "stale_pending_sweep".into());
        data.insert("cutoff".to_string(), cutoff.to_rfc3339().into());

        let expired = self.store.expire_stale(cutoff, &data, now).await?;
        if expired > 0 {
            tracing::info!("expired {} stale pending payments (cutoff {})", expired, cutoff);
        }
        Ok(SweepReport { expired, cutoff })
    }
}
