//! Account operations for the repository.

use crate::domain::{Account, AccountOwner, AccountStatus, TimeMs};
use crate::ledger::store::StoreError;
use sqlx::sqlite::SqliteConnection;

use super::{account_from_row, Repository, ACCOUNT_COLUMNS};

/// Owner lookup key matching the `idx_accounts_owner` expression index.
fn owner_key(owner: AccountOwner) -> i64 {
    owner.owner_id().unwrap_or(-1)
}

impl Repository {
    /// Create the owner's account with a zero balance unless it already exists.
    ///
    /// Returns whether a row was inserted.
    pub(super) async fn insert_account_if_absent(
        &self,
        owner: AccountOwner,
        currency: &str,
    ) -> Result<bool, StoreError> {
        let now = TimeMs::now().as_ms();
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (owner_kind, owner_id, currency, balance, status, version, created_at, updated_at)
            VALUES (?, ?, ?, '0.00', 'ACTIVE', 0, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(owner.kind().as_str())
        .bind(owner.owner_id())
        .bind(currency)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn load_account(
        &self,
        owner: AccountOwner,
    ) -> Result<Option<Account>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        load_account_on(&mut conn, owner).await
    }

    /// Set the status and bump the version so plans computed before the change
    /// fail their guard.
    pub(super) async fn update_account_status(
        &self,
        owner: AccountOwner,
        status: AccountStatus,
    ) -> Result<Account, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET status = ?, version = version + 1, updated_at = ?
            WHERE owner_kind = ? AND COALESCE(owner_id, -1) = ?
            "#,
        )
        .bind(status.as_str())
        .bind(TimeMs::now().as_ms())
        .bind(owner.kind().as_str())
        .bind(owner_key(owner))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("account {}", owner)));
        }

        self.load_account(owner)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("account {}", owner)))
    }
}

/// Load an account on an existing connection or transaction.
pub(super) async fn load_account_on(
    conn: &mut SqliteConnection,
    owner: AccountOwner,
) -> Result<Option<Account>, StoreError> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE owner_kind = ? AND COALESCE(owner_id, -1) = ?",
        ACCOUNT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(owner.kind().as_str())
        .bind(owner_key(owner))
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(account_from_row).transpose()
}

#[cfg(test)]
mod tests {
    use crate::db::migrations::init_db;
    use crate::db::Repository;
    use crate::domain::{AccountOwner, AccountStatus, Money, PharmacyId};
    use crate::ledger::store::{AccountStore, StoreError};
    use tempfile::TempDir;

    async fn setup() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool).await.unwrap(), temp_dir)
    }

    #[tokio::test]
    async fn test_get_or_create_is_lazy_and_stable() {
        let (repo, _temp) = setup().await;
        let owner = AccountOwner::Pharmacy(PharmacyId(12));

        assert!(repo.find_account(owner).await.unwrap().is_none());

        let first = repo.get_or_create_account(owner, "LKR").await.unwrap();
        let second = repo.get_or_create_account(owner, "USD").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.currency, "LKR");
        assert_eq!(second.balance, Money::zero());
        assert_eq!(second.version, 0);
        assert_eq!(second.status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn test_platform_account_is_singleton() {
        let (repo, _temp) = setup().await;
        let a = repo
            .get_or_create_account(AccountOwner::Platform, "LKR")
            .await
            .unwrap();
        let b = repo
            .get_or_create_account(AccountOwner::Platform, "LKR")
            .await
            .unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.owner, AccountOwner::Platform);
    }

    #[tokio::test]
    async fn test_status_change_bumps_version() {
        let (repo, _temp) = setup().await;
        let owner = AccountOwner::Pharmacy(PharmacyId(3));
        let created = repo.get_or_create_account(owner, "LKR").await.unwrap();

        let frozen = repo
            .set_account_status(owner, AccountStatus::Frozen)
            .await
            .unwrap();
        assert!(frozen.is_frozen());
        assert_eq!(frozen.version, created.version + 1);
    }

    #[tokio::test]
    async fn test_status_change_on_missing_account() {
        let (repo, _temp) = setup().await;
        let err = repo
            .set_account_status(AccountOwner::Pharmacy(PharmacyId(99)), AccountStatus::Frozen)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
