//! Event ingestion. Each endpoint accepts a loose JSON payload, validates it
//! into a [`LedgerEvent`](crate::domain::LedgerEvent) and hands it to the poster.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::wallets::PostingResponse;
use crate::api::{json_body, AppState};
use crate::domain::event::{
    CommissionCardCapturedPayload, CustomerCardCapturedPayload, CustomerCashCollectedPayload,
    RefundFullPayload,
};
use crate::domain::LedgerEvent;
use crate::error::AppError;

async fn post_event(state: &AppState, event: LedgerEvent) -> Result<Json<PostingResponse>, AppError> {
    let outcome = state.ledger.poster.post(&event).await?;
    Ok(Json(outcome.into()))
}

pub async fn customer_card_captured(
    State(state): State<AppState>,
    body: Result<Json<CustomerCardCapturedPayload>, JsonRejection>,
) -> Result<Json<PostingResponse>, AppError> {
    let event = json_body(body)?.validate()?;
    post_event(&state, event).await
}

pub async fn customer_cash_collected(
    State(state): State<AppState>,
    body: Result<Json<CustomerCashCollectedPayload>, JsonRejection>,
) -> Result<Json<PostingResponse>, AppError> {
    let event = json_body(body)?.validate()?;
    post_event(&state, event).await
}

pub async fn commission_card_captured(
    State(state): State<AppState>,
    body: Result<Json<CommissionCardCapturedPayload>, JsonRejection>,
) -> Result<Json<PostingResponse>, AppError> {
    let event = json_body(body)?.validate()?;
    post_event(&state, event).await
}

pub async fn refund_full(
    State(state): State<AppState>,
    body: Result<Json<RefundFullPayload>, JsonRejection>,
) -> Result<Json<PostingResponse>, AppError> {
    let event = json_body(body)?.validate()?;
    post_event(&state, event).await
}
