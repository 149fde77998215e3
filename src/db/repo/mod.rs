//! Repository layer for database operations.
//!
//! `Repository` is the SQLite implementation of the ledger's storage traits.
//! Methods are organized across submodules by domain:
//! - `accounts.rs` - Lazy account creation, lookup, and status changes
//! - `transactions.rs` - Atomic posting and transaction history
//! - `settings.rs` - Platform settings and commission overrides
//!
//! Money and percentages are stored as canonical decimal TEXT.

mod accounts;
mod settings;
mod transactions;

use crate::domain::{
    Account, AccountId, AccountOwner, AccountStatus, Correlation, ExternalKey, Money, Percent,
    PlatformDefaults, TimeMs, Transaction, TransactionType,
};
use crate::ledger::store::{
    AccountStore, ApplyOutcome, LedgerSnapshot, PageRequest, PostingPlan, StoreError,
};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool, seeding the
    /// settings row with built-in platform defaults if it is missing.
    pub async fn new(pool: SqlitePool) -> Result<Self, StoreError> {
        Self::with_defaults(pool, PlatformDefaults::default()).await
    }

    /// Create a repository, seeding the settings row from `defaults` if it is
    /// missing. An existing row is never overwritten.
    pub async fn with_defaults(
        pool: SqlitePool,
        defaults: PlatformDefaults,
    ) -> Result<Self, StoreError> {
        let repo = Repository { pool };
        repo.seed_platform_settings(&defaults).await?;
        Ok(repo)
    }
}

#[async_trait]
impl AccountStore for Repository {
    async fn get_or_create_account(
        &self,
        owner: AccountOwner,
        currency: &str,
    ) -> Result<Account, StoreError> {
        self.insert_account_if_absent(owner, currency).await?;
        self.load_account(owner)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("account {}", owner)))
    }

    async fn find_account(&self, owner: AccountOwner) -> Result<Option<Account>, StoreError> {
        self.load_account(owner).await
    }

    async fn set_account_status(
        &self,
        owner: AccountOwner,
        status: AccountStatus,
    ) -> Result<Account, StoreError> {
        self.update_account_status(owner, status).await
    }

    async fn external_key_exists(&self, key: &str) -> Result<bool, StoreError> {
        self.has_external_key(key).await
    }

    async fn apply_postings(&self, plan: &PostingPlan) -> Result<ApplyOutcome, StoreError> {
        self.apply_plan(plan).await
    }

    async fn list_transactions(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.query_transactions(account_id, page).await
    }

    async fn count_transactions(&self, account_id: AccountId) -> Result<i64, StoreError> {
        self.query_transaction_count(account_id).await
    }

    async fn list_order_transactions(
        &self,
        order_code: &str,
        sub_order_id: Option<i64>,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.query_order_transactions(order_code, sub_order_id).await
    }

    async fn ledger_snapshot(
        &self,
        owner: AccountOwner,
    ) -> Result<Option<LedgerSnapshot>, StoreError> {
        self.read_snapshot(owner).await
    }
}

// =========================================================================
// Row decoding
// =========================================================================

pub(crate) fn parse_money(raw: &str, column: &str) -> Result<Money, StoreError> {
    Money::parse(raw).map_err(|e| StoreError::Corrupt(format!("{} '{}': {}", column, raw, e)))
}

pub(crate) fn parse_percent(raw: &str, column: &str) -> Result<Percent, StoreError> {
    Percent::parse(raw).ok_or_else(|| StoreError::Corrupt(format!("{} '{}'", column, raw)))
}

pub(crate) fn account_from_row(row: &SqliteRow) -> Result<Account, StoreError> {
    let kind: String = row.try_get("owner_kind")?;
    let owner_id: Option<i64> = row.try_get("owner_id")?;
    let owner = AccountOwner::from_columns(&kind, owner_id)
        .ok_or_else(|| StoreError::Corrupt(format!("owner {} {:?}", kind, owner_id)))?;
    let status: String = row.try_get("status")?;
    let balance: String = row.try_get("balance")?;

    Ok(Account {
        id: AccountId(row.try_get("id")?),
        owner,
        currency: row.try_get("currency")?,
        balance: parse_money(&balance, "balance")?,
        status: AccountStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("status '{}'", status)))?,
        version: row.try_get("version")?,
        created_at: TimeMs::new(row.try_get("created_at")?),
        updated_at: TimeMs::new(row.try_get("updated_at")?),
    })
}

pub(crate) fn transaction_from_row(row: &SqliteRow) -> Result<Transaction, StoreError> {
    let kind: String = row.try_get("type")?;
    let amount: String = row.try_get("amount")?;
    let balance_after: String = row.try_get("balance_after")?;
    let external_key: Option<String> = row.try_get("external_key")?;

    Ok(Transaction {
        id: row.try_get("id")?,
        account_id: AccountId(row.try_get("account_id")?),
        kind: TransactionType::parse(&kind)
            .ok_or_else(|| StoreError::Corrupt(format!("transaction type '{}'", kind)))?,
        amount: parse_money(&amount, "amount")?,
        balance_after: parse_money(&balance_after, "balance_after")?,
        currency: row.try_get("currency")?,
        correlation: Correlation {
            order_code: row.try_get("order_code")?,
            sub_order_id: row.try_get("sub_order_id")?,
            prescription_id: row.try_get("prescription_id")?,
            payment_id: row.try_get("payment_id")?,
        },
        external_key: external_key.map(ExternalKey::from_stored),
        note: row.try_get("note")?,
        created_at: TimeMs::new(row.try_get("created_at")?),
    })
}

pub(crate) const TRANSACTION_COLUMNS: &str = "id, account_id, type, amount, balance_after, \
    currency, order_code, sub_order_id, prescription_id, payment_id, external_key, note, created_at";

pub(crate) const ACCOUNT_COLUMNS: &str =
    "id, owner_kind, owner_id, currency, balance, status, version, created_at, updated_at";
