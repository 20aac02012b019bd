pub mod caller;
pub mod handlers {
    pub mod ops;
    pub mod payments;
    pub mod qr;
}
pub mod middleware {
    pub mod operator_key;
    pub mod rate_limit;
}

use crate::AppState;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;
use handlers::{ops, payments, qr};
use middleware::operator_key::require_operator_key;
use middleware::rate_limit::{self, RateLimitState};

pub fn router(state: AppState, operator_key: String, limits: RateLimitState) -> Router {
    let operator_routes = Router::new()
        .route("/payments/:id/status", put(payments::update_payment_status))
        .route(
            "/payments/municipality/:municipality_id",
            get(payments::municipality_payments),
        )
        .route("/ops/sweep", post(ops::run_sweep))
        .layer(from_fn_with_state(operator_key, require_operator_key));

    // Both QR paths share one parameter name at the same depth.
    let lookup_routes = Router::new()
        .route("/qr/validate", post(qr::validate_qr))
        .route("/qr/:key/details", get(qr::qr_details))
        .layer(from_fn_with_state(limits, rate_limit::enforce));

    Router::new()
        .route("/health", get(payments::health))
        .route("/ops/liveness", get(ops::liveness))
        .route("/ops/readiness", get(ops::readiness))
        .route("/payments/initiate", post(payments::create_payment))
        .route("/payments/user", get(payments::user_payments))
        .route("/payments/history", get(payments::payment_history))
        .route("/payments/:id", get(payments::get_payment))
        .route("/payments/:id/status", get(payments::get_payment_status))
        .route("/qr/generate", post(qr::generate_qr))
        .route("/qr/:key/regenerate", post(qr::regenerate_qr))
        .merge(operator_routes)
        .merge(lookup_routes)
        .with_state(state)
}
