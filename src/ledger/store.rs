//! Storage seams for the ledger.
//!
//! The poster and its collaborators only see these traits; the SQLite
//! [`Repository`](crate::db::Repository) is one implementation and tests wrap it
//! to inject conflicts.

use crate::domain::{
    Account, AccountId, AccountOwner, AccountStatus, CommissionRule, Money, NewTransaction,
    Percent, PharmacyId, PlatformSettings, SettingsUpdate, Transaction,
};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// An account row changed since it was read; the posting must be re-planned.
    #[error("version conflict on account {account_id}")]
    VersionConflict { account_id: AccountId },
    /// An administrative update carried an expected version that no longer matches.
    #[error("stale {entity} version: expected {expected}")]
    StaleVersion { entity: &'static str, expected: i64 },
    #[error("{0} not found")]
    NotFound(String),
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Guarded balance write for one account within a posting plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountUpdate {
    pub account_id: AccountId,
    /// Version the plan was computed against; the write is rejected otherwise.
    pub expected_version: i64,
    pub new_balance: Money,
}

/// Everything one logical event writes, applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingPlan {
    pub updates: Vec<AccountUpdate>,
    pub entries: Vec<NewTransaction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(Vec<Transaction>),
    /// A row carrying the plan's external key already exists; nothing was written.
    Duplicate,
}

/// An account and its full posting history as of one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub account: Account,
    /// Amounts oldest first.
    pub amounts: Vec<Money>,
    pub latest_balance_after: Option<Money>,
}

/// Zero-based page request. Sizes are clamped by the query layer before they get here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }
}

/// Account and posting persistence.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Load the owner's account, creating it with a zero balance on first use.
    async fn get_or_create_account(
        &self,
        owner: AccountOwner,
        currency: &str,
    ) -> Result<Account, StoreError>;

    /// Load the owner's account without creating it.
    async fn find_account(&self, owner: AccountOwner) -> Result<Option<Account>, StoreError>;

    /// Change an account's status. Bumps the version so in-flight plans re-read it.
    async fn set_account_status(
        &self,
        owner: AccountOwner,
        status: AccountStatus,
    ) -> Result<Account, StoreError>;

    async fn external_key_exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Apply a plan atomically: every guarded update and every row, or nothing.
    ///
    /// # Errors
    /// `VersionConflict` when any account moved past its expected version or
    /// is no longer active.
    async fn apply_postings(&self, plan: &PostingPlan) -> Result<ApplyOutcome, StoreError>;

    /// Transactions for one account, most recent first.
    async fn list_transactions(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<Vec<Transaction>, StoreError>;

    async fn count_transactions(&self, account_id: AccountId) -> Result<i64, StoreError>;

    /// All transactions for an order, optionally narrowed to one sub-order, oldest first.
    async fn list_order_transactions(
        &self,
        order_code: &str,
        sub_order_id: Option<i64>,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// The account row together with every amount posted to it, read from one
    /// consistent snapshot. `None` when the owner has no account yet.
    async fn ledger_snapshot(&self, owner: AccountOwner)
        -> Result<Option<LedgerSnapshot>, StoreError>;
}

/// Platform settings and commission override persistence.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// The settings singleton, seeded from defaults on first read.
    async fn platform_settings(&self) -> Result<PlatformSettings, StoreError>;

    /// # Errors
    /// `StaleVersion` when `update.expected_version` does not match.
    async fn update_platform_settings(
        &self,
        update: &SettingsUpdate,
    ) -> Result<PlatformSettings, StoreError>;

    async fn commission_rule(
        &self,
        pharmacy_id: PharmacyId,
    ) -> Result<Option<CommissionRule>, StoreError>;

    /// Create or replace a pharmacy override.
    ///
    /// # Errors
    /// `StaleVersion` when an existing rule does not match `expected_version`.
    async fn upsert_commission_rule(
        &self,
        pharmacy_id: PharmacyId,
        percent: Percent,
        expected_version: Option<i64>,
    ) -> Result<CommissionRule, StoreError>;

    /// Returns whether a rule existed.
    async fn delete_commission_rule(&self, pharmacy_id: PharmacyId) -> Result<bool, StoreError>;
}
