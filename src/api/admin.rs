use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::wallets::pharmacy_owner;
use crate::api::{json_body, AppState};
use crate::domain::{
    Account, AccountOwner, AccountStatus, CommissionRule, Money, Percent, PlatformSettings,
    SettingsUpdate,
};
use crate::error::AppError;
use crate::ledger::ReconciliationReport;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub currency: String,
    pub commission_percent: String,
    pub convenience_fee: String,
    pub version: i64,
    pub updated_at: String,
}

impl From<PlatformSettings> for SettingsResponse {
    fn from(s: PlatformSettings) -> Self {
        SettingsResponse {
            currency: s.currency,
            commission_percent: s.commission_percent.to_canonical_string(),
            convenience_fee: s.convenience_fee.to_canonical_string(),
            version: s.version,
            updated_at: s.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub currency: Option<String>,
    pub commission_percent: Option<Percent>,
    pub convenience_fee: Option<Money>,
    pub expected_version: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionRuleResponse {
    pub pharmacy_id: i64,
    pub commission_percent: String,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CommissionRule> for CommissionRuleResponse {
    fn from(r: CommissionRule) -> Self {
        CommissionRuleResponse {
            pharmacy_id: r.pharmacy_id.as_i64(),
            commission_percent: r.commission_percent.to_canonical_string(),
            version: r.version,
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionRuleRequest {
    pub commission_percent: Option<Percent>,
    pub expected_version: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: AccountStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub account_id: i64,
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pharmacy_id: Option<i64>,
    pub currency: String,
    pub balance: String,
    pub status: String,
    pub version: i64,
    pub updated_at: String,
}

impl From<Account> for AccountResponse {
    fn from(a: Account) -> Self {
        AccountResponse {
            account_id: a.id.0,
            owner: a.owner.kind().as_str().to_string(),
            pharmacy_id: a.owner.owner_id(),
            currency: a.currency,
            balance: a.balance.to_canonical_string(),
            status: a.status.as_str().to_string(),
            version: a.version,
            updated_at: a.updated_at.to_rfc3339(),
        }
    }
}

pub async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<SettingsResponse>, AppError> {
    let settings = state.ledger.settings.platform_settings().await?;
    Ok(Json(settings.into()))
}

pub async fn put_settings(
    State(state): State<AppState>,
    body: Result<Json<SettingsRequest>, JsonRejection>,
) -> Result<Json<SettingsResponse>, AppError> {
    let req = json_body(body)?;
    let updated = state
        .ledger
        .settings
        .update_platform_settings(SettingsUpdate {
            currency: req.currency,
            commission_percent: req.commission_percent,
            convenience_fee: req.convenience_fee,
            expected_version: req.expected_version,
        })
        .await?;
    Ok(Json(updated.into()))
}

pub async fn get_commission_rule(
    Path(pharmacy_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<CommissionRuleResponse>, AppError> {
    let rule = state.ledger.settings.commission_rule(pharmacy_id).await?;
    Ok(Json(rule.into()))
}

pub async fn put_commission_rule(
    Path(pharmacy_id): Path<i64>,
    State(state): State<AppState>,
    body: Result<Json<CommissionRuleRequest>, JsonRejection>,
) -> Result<Json<CommissionRuleResponse>, AppError> {
    let req = json_body(body)?;
    let rule = state
        .ledger
        .settings
        .upsert_commission_rule(pharmacy_id, req.commission_percent, req.expected_version)
        .await?;
    Ok(Json(rule.into()))
}

pub async fn delete_commission_rule(
    Path(pharmacy_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state
        .ledger
        .settings
        .delete_commission_rule(pharmacy_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn put_pharmacy_status(
    Path(pharmacy_id): Path<i64>,
    State(state): State<AppState>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<AccountResponse>, AppError> {
    let req = json_body(body)?;
    let account = state
        .ledger
        .settings
        .set_pharmacy_status(pharmacy_id, req.status)
        .await?;
    Ok(Json(account.into()))
}

pub async fn reconcile_platform(
    State(state): State<AppState>,
) -> Result<Json<ReconciliationReport>, AppError> {
    let report = state.ledger.reconciler.reconcile(AccountOwner::Platform).await?;
    Ok(Json(report))
}

pub async fn reconcile_pharmacy(
    Path(pharmacy_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ReconciliationReport>, AppError> {
    let owner = pharmacy_owner(pharmacy_id)?;
    let report = state.ledger.reconciler.reconcile(owner).await?;
    Ok(Json(report))
}
