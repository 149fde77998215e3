use crate::domain::ValidationError;
use crate::ledger::{LedgerError, StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// Reload and retry: a stale admin version or exhausted posting retries.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Well-formed request refused by a business rule.
    #[error("Unprocessable: {message}")]
    Unprocessable { code: &'static str, message: String },
}

impl AppError {
    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Internal(_) => "internal",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "validation",
            AppError::Conflict(_) => "conflict",
            AppError::Unprocessable { code, .. } => *code,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        LedgerError::from(err).into()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::Validation(_) => AppError::BadRequest(message),
            LedgerError::Conflict { .. } | LedgerError::StaleVersion { .. } => {
                AppError::Conflict(message)
            }
            LedgerError::InsufficientFunds { .. } => AppError::Unprocessable {
                code: "insufficient_funds",
                message,
            },
            LedgerError::AccountFrozen(_) => AppError::Unprocessable {
                code: "account_frozen",
                message,
            },
            LedgerError::NotFound(_) => AppError::NotFound(message),
            LedgerError::Store(_) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let message = match &self {
            AppError::Internal(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Unprocessable { message, .. } => message.clone(),
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, AccountOwner, Money, PharmacyId};

    #[test]
    fn test_ledger_errors_map_to_statuses() {
        let cases: Vec<(LedgerError, StatusCode, &str)> = vec![
            (
                ValidationError::Missing("amount").into(),
                StatusCode::BAD_REQUEST,
                "validation",
            ),
            (
                LedgerError::Conflict {
                    account_id: AccountId(1),
                    attempts: 2,
                },
                StatusCode::CONFLICT,
                "conflict",
            ),
            (
                LedgerError::StaleVersion {
                    entity: "platform settings",
                    expected: 1,
                },
                StatusCode::CONFLICT,
                "conflict",
            ),
            (
                LedgerError::InsufficientFunds {
                    owner: AccountOwner::Pharmacy(PharmacyId(1)),
                    available: Money::zero(),
                    requested: Money::parse("1").unwrap(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_funds",
            ),
            (
                LedgerError::AccountFrozen(AccountOwner::Pharmacy(PharmacyId(1))),
                StatusCode::UNPROCESSABLE_ENTITY,
                "account_frozen",
            ),
            (
                LedgerError::NotFound("x".to_string()),
                StatusCode::NOT_FOUND,
                "not_found",
            ),
            (
                LedgerError::Store(StoreError::Corrupt("balance".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
            ),
        ];

        for (err, status, code) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status(), status);
            assert_eq!(app.code(), code);
        }
    }

    #[test]
    fn test_unprocessable_displays_message() {
        let app: AppError = LedgerError::AccountFrozen(AccountOwner::Pharmacy(PharmacyId(4))).into();
        let rendered = app.to_string();
        assert!(rendered.starts_with("Unprocessable: "), "{}", rendered);
        assert!(rendered.contains("frozen"), "{}", rendered);
    }
}
