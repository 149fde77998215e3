pub mod admin;
pub mod events;
pub mod health;
pub mod wallets;

use crate::error::AppError;
use crate::ledger::Ledger;
use axum::extract::rejection::JsonRejection;
use axum::{
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

impl AppState {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}

/// Unwrap a JSON body, reporting malformed input in the service's error shape.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/wallets/platform", get(wallets::get_platform_wallet))
        .route(
            "/v1/wallets/platform/transactions",
            get(wallets::get_platform_transactions),
        )
        .route("/v1/wallets/pharmacies/:id", get(wallets::get_pharmacy_wallet))
        .route(
            "/v1/wallets/pharmacies/:id/transactions",
            get(wallets::get_pharmacy_transactions),
        )
        .route(
            "/v1/wallets/pharmacies/:id/payout",
            post(wallets::post_payout),
        )
        .route(
            "/v1/wallets/orders/:order_code/transactions",
            get(wallets::get_order_transactions),
        )
        .route(
            "/v1/wallets/events/customer-card-captured",
            post(events::customer_card_captured),
        )
        .route(
            "/v1/wallets/events/customer-cash-collected",
            post(events::customer_cash_collected),
        )
        .route(
            "/v1/wallets/events/pharmacy-commission-card-captured",
            post(events::commission_card_captured),
        )
        .route("/v1/wallets/events/refund-full", post(events::refund_full))
        .route(
            "/v1/admin/wallet/settings",
            get(admin::get_settings).put(admin::put_settings),
        )
        .route(
            "/v1/admin/wallet/commission/pharmacies/:id",
            get(admin::get_commission_rule)
                .put(admin::put_commission_rule)
                .delete(admin::delete_commission_rule),
        )
        .route(
            "/v1/admin/wallet/pharmacies/:id/status",
            put(admin::put_pharmacy_status),
        )
        .route(
            "/v1/admin/wallet/reconcile/platform",
            get(admin::reconcile_platform),
        )
        .route(
            "/v1/admin/wallet/reconcile/pharmacies/:id",
            get(admin::reconcile_pharmacy),
        )
        .layer(cors)
        .with_state(state)
}
