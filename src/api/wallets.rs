use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{json_body, AppState};
use crate::domain::event::PayoutPayload;
use crate::domain::{AccountOwner, PharmacyId, Transaction, ValidationError};
use crate::error::AppError;
use crate::ledger::{AccountSummary, PostOutcome, TransactionPage};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub page_size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub sub_order_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: i64,
    pub account_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: String,
    pub balance_after: String,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_order_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescription_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_key: Option<String>,
    pub note: String,
    pub created_at: String,
}

impl From<Transaction> for TransactionDto {
    fn from(t: Transaction) -> Self {
        TransactionDto {
            id: t.id,
            account_id: t.account_id.0,
            kind: t.kind.as_str().to_string(),
            amount: t.amount.to_canonical_string(),
            balance_after: t.balance_after.to_canonical_string(),
            currency: t.currency,
            order_code: t.correlation.order_code,
            sub_order_id: t.correlation.sub_order_id,
            prescription_id: t.correlation.prescription_id,
            payment_id: t.correlation.payment_id,
            external_key: t.external_key.map(|k| k.as_str().to_string()),
            note: t.note,
            created_at: t.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pharmacy_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<i64>,
    pub currency: String,
    pub balance: String,
    pub status: String,
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    pub transactions: Vec<TransactionDto>,
}

impl From<AccountSummary> for WalletResponse {
    fn from(s: AccountSummary) -> Self {
        WalletResponse {
            owner: s.owner.kind().as_str().to_string(),
            pharmacy_id: s.owner.owner_id(),
            account_id: s.account_id.map(|id| id.0),
            currency: s.currency,
            balance: s.balance.to_canonical_string(),
            status: s.status.as_str().to_string(),
            version: s.version,
            updated_at: s.updated_at.map(|t| t.to_rfc3339()),
            transactions: s.transactions.into_iter().map(TransactionDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPageResponse {
    pub page: u32,
    pub size: u32,
    pub total: i64,
    pub transactions: Vec<TransactionDto>,
}

impl From<TransactionPage> for TransactionPageResponse {
    fn from(p: TransactionPage) -> Self {
        TransactionPageResponse {
            page: p.page,
            size: p.size,
            total: p.total,
            transactions: p.transactions.into_iter().map(TransactionDto::from).collect(),
        }
    }
}

/// Result of posting an event or payout. Duplicates are a success with no rows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingResponse {
    pub status: &'static str,
    pub transactions: Vec<TransactionDto>,
}

impl From<PostOutcome> for PostingResponse {
    fn from(outcome: PostOutcome) -> Self {
        match outcome {
            PostOutcome::Posted(rows) => PostingResponse {
                status: "posted",
                transactions: rows.into_iter().map(TransactionDto::from).collect(),
            },
            PostOutcome::Duplicate => PostingResponse {
                status: "duplicate",
                transactions: Vec::new(),
            },
        }
    }
}

pub(crate) fn pharmacy_owner(raw: i64) -> Result<AccountOwner, AppError> {
    PharmacyId::new(raw)
        .map(AccountOwner::Pharmacy)
        .ok_or_else(|| {
            ValidationError::Invalid {
                field: "pharmacyId",
                reason: format!("must be positive, got {}", raw),
            }
            .into()
        })
}

pub async fn get_platform_wallet(
    Query(params): Query<SummaryQuery>,
    State(state): State<AppState>,
) -> Result<Json<WalletResponse>, AppError> {
    let summary = state
        .ledger
        .query
        .summary(AccountOwner::Platform, params.page_size)
        .await?;
    Ok(Json(summary.into()))
}

pub async fn get_platform_transactions(
    Query(params): Query<PageQuery>,
    State(state): State<AppState>,
) -> Result<Json<TransactionPageResponse>, AppError> {
    let page = state
        .ledger
        .query
        .page(AccountOwner::Platform, params.page, params.size)
        .await?;
    Ok(Json(page.into()))
}

pub async fn get_pharmacy_wallet(
    Path(pharmacy_id): Path<i64>,
    Query(params): Query<SummaryQuery>,
    State(state): State<AppState>,
) -> Result<Json<WalletResponse>, AppError> {
    let owner = pharmacy_owner(pharmacy_id)?;
    let summary = state.ledger.query.summary(owner, params.page_size).await?;
    Ok(Json(summary.into()))
}

pub async fn get_pharmacy_transactions(
    Path(pharmacy_id): Path<i64>,
    Query(params): Query<PageQuery>,
    State(state): State<AppState>,
) -> Result<Json<TransactionPageResponse>, AppError> {
    let owner = pharmacy_owner(pharmacy_id)?;
    let page = state
        .ledger
        .query
        .page(owner, params.page, params.size)
        .await?;
    Ok(Json(page.into()))
}

pub async fn post_payout(
    Path(pharmacy_id): Path<i64>,
    State(state): State<AppState>,
    body: Result<Json<PayoutPayload>, JsonRejection>,
) -> Result<Json<PostingResponse>, AppError> {
    let event = json_body(body)?.validate(pharmacy_id)?;
    let outcome = state.ledger.poster.post(&event).await?;
    Ok(Json(outcome.into()))
}

pub async fn get_order_transactions(
    Path(order_code): Path<String>,
    Query(params): Query<OrderQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<TransactionDto>>, AppError> {
    if order_code.trim().is_empty() {
        return Err(ValidationError::Missing("orderCode").into());
    }
    let rows = state
        .ledger
        .query
        .for_order(&order_code, params.sub_order_id)
        .await?;
    Ok(Json(rows.into_iter().map(TransactionDto::from).collect()))
}
