pub mod config;
pub mod domain {
    pub mod municipality;
    pub mod payment;
    pub mod qrcode;
    pub mod transitions;
    pub mod validation;
}
pub mod error;
pub mod http;
pub mod repo;
pub mod service {
    pub mod expiration_sweeper;
    pub mod payment_service;
    pub mod qr_render;
    pub mod qr_service;
}

use repo::LedgerStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub payment_service: service::payment_service::PaymentService,
    pub qr_service: service::qr_service::QrCodeService,
    pub sweeper: service::expiration_sweeper::ExpirationSweeper,
    pub store: Arc<dyn LedgerStore>,
    pub redis_client: redis::Client,
}

impl AppState {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        sweeper: service::expiration_sweeper::ExpirationSweeper,
        redis_client: redis::Client,
    ) -> Self {
        Self {
            payment_service: service::payment_service::PaymentService::new(store.clone()),
            qr_service: service::qr_service::QrCodeService::new(store.clone()),
            sweeper,
            store,
            redis_client,
        }
    }
}
