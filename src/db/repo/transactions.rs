//! Posting and transaction history operations for the repository.

use crate::domain::{AccountId, AccountOwner, TimeMs, Transaction};
use crate::ledger::store::{ApplyOutcome, LedgerSnapshot, PageRequest, PostingPlan, StoreError};
use sqlx::Row;
use tracing::debug;

use super::accounts::load_account_on;
use super::{parse_money, transaction_from_row, Repository, TRANSACTION_COLUMNS};

impl Repository {
    /// Apply a posting plan in one database transaction.
    ///
    /// Account updates run first so the write lock is taken before anything
    /// is read. Each update is guarded by the expected version and an active
    /// status; a miss rolls everything back with `VersionConflict`. A row
    /// whose external key already exists is suppressed by the unique column,
    /// which rolls back the plan as a duplicate.
    pub(super) async fn apply_plan(&self, plan: &PostingPlan) -> Result<ApplyOutcome, StoreError> {
        if plan.entries.is_empty() {
            return Ok(ApplyOutcome::Applied(Vec::new()));
        }

        let now = TimeMs::now();
        let mut tx = self.pool.begin().await?;

        for update in &plan.updates {
            let result = sqlx::query(
                r#"
                UPDATE accounts
                SET balance = ?, version = version + 1, updated_at = ?
                WHERE id = ? AND version = ? AND status = 'ACTIVE'
                "#,
            )
            .bind(update.new_balance.to_canonical_string())
            .bind(now.as_ms())
            .bind(update.account_id.0)
            .bind(update.expected_version)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(StoreError::VersionConflict {
                    account_id: update.account_id,
                });
            }
        }

        let mut written = Vec::with_capacity(plan.entries.len());
        for entry in &plan.entries {
            let result = sqlx::query(
                r#"
                INSERT INTO transactions (
                    account_id, type, amount, balance_after, currency,
                    order_code, sub_order_id, prescription_id, payment_id,
                    external_key, note, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(external_key) DO NOTHING
                "#,
            )
            .bind(entry.account_id.0)
            .bind(entry.kind.as_str())
            .bind(entry.amount.to_canonical_string())
            .bind(entry.balance_after.to_canonical_string())
            .bind(entry.currency.as_str())
            .bind(entry.correlation.order_code.as_deref())
            .bind(entry.correlation.sub_order_id)
            .bind(entry.correlation.prescription_id)
            .bind(entry.correlation.payment_id.as_deref())
            .bind(entry.external_key.as_ref().map(|k| k.as_str()))
            .bind(entry.note.as_str())
            .bind(now.as_ms())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                debug!(
                    external_key = ?entry.external_key.as_ref().map(|k| k.as_str()),
                    "External key already posted, plan rolled back"
                );
                return Ok(ApplyOutcome::Duplicate);
            }

            written.push(Transaction::from_new(
                result.last_insert_rowid(),
                now,
                entry.clone(),
            ));
        }

        tx.commit().await?;
        Ok(ApplyOutcome::Applied(written))
    }

    pub(super) async fn has_external_key(&self, key: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM transactions WHERE external_key = ? LIMIT 1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Transactions for one account, newest first.
    pub(super) async fn query_transactions(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<Vec<Transaction>, StoreError> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE account_id = ? ORDER BY id DESC LIMIT ? OFFSET ?",
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(account_id.0)
            .bind(i64::from(page.size))
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(transaction_from_row).collect()
    }

    pub(super) async fn query_transaction_count(
        &self,
        account_id: AccountId,
    ) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM transactions WHERE account_id = ?")
            .bind(account_id.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    /// Every transaction for an order across both accounts, oldest first.
    pub(super) async fn query_order_transactions(
        &self,
        order_code: &str,
        sub_order_id: Option<i64>,
    ) -> Result<Vec<Transaction>, StoreError> {
        let sql = format!(
            "SELECT {} FROM transactions \
             WHERE order_code = ? AND (? IS NULL OR sub_order_id = ?) \
             ORDER BY id ASC",
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(order_code)
            .bind(sub_order_id)
            .bind(sub_order_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(transaction_from_row).collect()
    }

    /// Read the account and all of its amounts inside one read transaction so
    /// a concurrent posting cannot land between the two reads.
    pub(super) async fn read_snapshot(
        &self,
        owner: AccountOwner,
    ) -> Result<Option<LedgerSnapshot>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(account) = load_account_on(&mut tx, owner).await? else {
            tx.commit().await?;
            return Ok(None);
        };

        let rows = sqlx::query(
            "SELECT amount, balance_after FROM transactions WHERE account_id = ? ORDER BY id ASC",
        )
        .bind(account.id.0)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let mut amounts = Vec::with_capacity(rows.len());
        let mut latest_balance_after = None;
        for row in &rows {
            let amount: String = row.try_get("amount")?;
            let after: String = row.try_get("balance_after")?;
            amounts.push(parse_money(&amount, "amount")?);
            latest_balance_after = Some(parse_money(&after, "balance_after")?);
        }

        Ok(Some(LedgerSnapshot {
            account,
            amounts,
            latest_balance_after,
        }))
    }
}
