//! The wallet ledger: posting, queries, administration and reconciliation.
//!
//! Everything here talks to storage through the [`store`] traits so the same
//! services run against SQLite in production and wrapped stores in tests.

pub mod commission;
pub mod idempotency;
pub mod payout;
pub mod poster;
pub mod query;
pub mod reconcile;
pub mod settings;
pub mod store;

pub use commission::{split_gross, CommissionResolver};
pub use poster::{LedgerPoster, PostOutcome, MAX_POSTING_ATTEMPTS};
pub use query::{AccountSummary, Paging, TransactionPage, TransactionQuery};
pub use reconcile::{ReconciliationReport, Reconciler};
pub use settings::SettingsService;
pub use store::{AccountStore, SettingsStore, StoreError};

use crate::domain::{AccountId, AccountOwner, Money, ValidationError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The account kept changing underneath the posting; re-deliver the event.
    #[error("account {account_id} changed concurrently; gave up after {attempts} attempts")]
    Conflict { account_id: AccountId, attempts: u32 },
    #[error("stale {entity} version: expected {expected}")]
    StaleVersion { entity: &'static str, expected: i64 },
    #[error("insufficient funds on {owner}: available {available}, requested {requested}")]
    InsufficientFunds {
        owner: AccountOwner,
        available: Money,
        requested: Money,
    },
    #[error("account {0} is frozen")]
    AccountFrozen(AccountOwner),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::StaleVersion { entity, expected } => {
                LedgerError::StaleVersion { entity, expected }
            }
            StoreError::NotFound(what) => LedgerError::NotFound(what),
            other => LedgerError::Store(other),
        }
    }
}

/// All ledger services over one pair of stores.
#[derive(Clone)]
pub struct Ledger {
    pub poster: LedgerPoster,
    pub query: TransactionQuery,
    pub settings: SettingsService,
    pub reconciler: Reconciler,
}

impl Ledger {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        settings: Arc<dyn SettingsStore>,
        paging: Paging,
    ) -> Self {
        Self {
            poster: LedgerPoster::new(accounts.clone(), settings.clone()),
            query: TransactionQuery::new(accounts.clone(), settings.clone(), paging),
            settings: SettingsService::new(accounts.clone(), settings),
            reconciler: Reconciler::new(accounts),
        }
    }
}
