mod common;

use chrono::{Duration, Utc};
use common::fixture;
use municollect_payments::domain::payment::PaymentStatus;
use municollect_payments::repo::LedgerStore;
use municollect_payments::service::expiration_sweeper::ExpirationSweeper;
use std::sync::Arc;

fn sweeper(store: Arc<dyn LedgerStore>) -> ExpirationSweeper {
    ExpirationSweeper {
        store,
        staleness: Duration::hours(24),
        interval: std::time::Duration::from_secs(60),
    }
}

async fn status_of(fx: &common::Fixture, id: uuid::Uuid) -> PaymentStatus {
    fx.store.find_payment(id).await.unwrap().unwrap().status
}

#[tokio::test]
async fn only_stale_pending_payments_expire() {
    let fx = fixture(None).await;
    let stale = fx.seed(Duration::hours(25), PaymentStatus::Pending).await;
    let fresh = fx.seed(Duration::hours(2), PaymentStatus::Pending).await;
    let paid = fx.seed(Duration::hours(48), PaymentStatus::Completed).await;
    let failed = fx.seed(Duration::hours(48), PaymentStatus::Failed).await;

    let report = sweeper(fx.store.clone()).sweep_once(Utc::now()).await.unwrap();
    assert_eq!(report.expired, 1);

    assert_eq!(status_of(&fx, stale.id).await, PaymentStatus::Expired);
    assert_eq!(status_of(&fx, fresh.id).await, PaymentStatus::Pending);
    assert_eq!(status_of(&fx, paid.id).await, PaymentStatus::Completed);
    assert_eq!(status_of(&fx, failed.id).await, PaymentStatus::Failed);

    let trail = fx.store.list_transactions(stale.id).await.unwrap();
    assert_eq!(trail.len(), 2);
    let entry = trail.last().unwrap();
    assert_eq!(entry.status, PaymentStatus::Expired);
    assert_eq!(
        entry.transaction_data.as_ref().unwrap()["reason"],
        "stale_pending_sweep"
    );
}

#[tokio::test]
async fn sweeping_twice_changes_nothing() {
    let fx = fixture(None).await;
    fx.seed(Duration::hours(30), PaymentStatus::Pending).await;
    fx.seed(Duration::hours(40), PaymentStatus::Pending).await;
    let sweeper = sweeper(fx.store.clone());

    let now = Utc::now();
    assert_eq!(sweeper.sweep_once(now).await.unwrap().expired, 2);
    let entries = fx.store.transaction_count().await;

    let again = sweeper.sweep_once(now + Duration::minutes(5)).await.unwrap();
    assert_eq!(again.expired, 0);
    assert_eq!(fx.store.transaction_count().await, entries);
}

#[tokio::test]
async fn swept_payment_can_be_reopened() {
    let fx = fixture(None).await;
    let stale = fx.seed(Duration::hours(26), PaymentStatus::Pending).await;
    sweeper(fx.store.clone()).sweep_once(Utc::now()).await.unwrap();

    let reopened = fx
        .payments
        .update_status(stale.id, PaymentStatus::Pending, None)
        .await
        .unwrap();
    assert_eq!(reopened.payment.status, PaymentStatus::Pending);
    assert_eq!(reopened.transactions.len(), 3);
}
