//! Platform settings and commission override operations for the repository.

use crate::domain::{
    CommissionRule, Percent, PharmacyId, PlatformDefaults, PlatformSettings, SettingsUpdate,
    TimeMs,
};
use crate::ledger::store::{SettingsStore, StoreError};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{parse_money, parse_percent, Repository};

fn settings_from_row(row: &SqliteRow) -> Result<PlatformSettings, StoreError> {
    let percent: String = row.try_get("commission_percent")?;
    let fee: String = row.try_get("convenience_fee")?;
    Ok(PlatformSettings {
        currency: row.try_get("currency")?,
        commission_percent: parse_percent(&percent, "commission_percent")?,
        convenience_fee: parse_money(&fee, "convenience_fee")?,
        version: row.try_get("version")?,
        updated_at: TimeMs::new(row.try_get("updated_at")?),
    })
}

fn rule_from_row(row: &SqliteRow) -> Result<CommissionRule, StoreError> {
    let percent: String = row.try_get("commission_percent")?;
    let pharmacy_id: i64 = row.try_get("pharmacy_id")?;
    Ok(CommissionRule {
        pharmacy_id: PharmacyId::new(pharmacy_id)
            .ok_or_else(|| StoreError::Corrupt(format!("pharmacy_id {}", pharmacy_id)))?,
        commission_percent: parse_percent(&percent, "commission_percent")?,
        version: row.try_get("version")?,
        created_at: TimeMs::new(row.try_get("created_at")?),
        updated_at: TimeMs::new(row.try_get("updated_at")?),
    })
}

impl Repository {
    /// Insert the settings singleton from the configured defaults if it is missing.
    pub(super) async fn seed_platform_settings(
        &self,
        defaults: &PlatformDefaults,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO platform_settings (id, currency, commission_percent, convenience_fee, version, updated_at)
            VALUES (1, ?, ?, ?, 0, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(defaults.currency.as_str())
        .bind(defaults.commission_percent.to_canonical_string())
        .bind(defaults.convenience_fee.to_canonical_string())
        .bind(TimeMs::now().as_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for Repository {
    async fn platform_settings(&self) -> Result<PlatformSettings, StoreError> {
        let row = sqlx::query(
            "SELECT currency, commission_percent, convenience_fee, version, updated_at \
             FROM platform_settings WHERE id = 1",
        )
        .fetch_one(&self.pool)
        .await?;
        settings_from_row(&row)
    }

    async fn update_platform_settings(
        &self,
        update: &SettingsUpdate,
    ) -> Result<PlatformSettings, StoreError> {
        let current = self.platform_settings().await?;
        let expected = update.expected_version.unwrap_or(current.version);

        let result = sqlx::query(
            r#"
            UPDATE platform_settings
            SET currency = ?, commission_percent = ?, convenience_fee = ?,
                version = version + 1, updated_at = ?
            WHERE id = 1 AND version = ?
            "#,
        )
        .bind(update.currency.as_deref().unwrap_or(&current.currency))
        .bind(
            update
                .commission_percent
                .unwrap_or(current.commission_percent)
                .to_canonical_string(),
        )
        .bind(
            update
                .convenience_fee
                .unwrap_or(current.convenience_fee)
                .to_canonical_string(),
        )
        .bind(TimeMs::now().as_ms())
        .bind(expected)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::StaleVersion {
                entity: "platform settings",
                expected,
            });
        }
        self.platform_settings().await
    }

    async fn commission_rule(
        &self,
        pharmacy_id: PharmacyId,
    ) -> Result<Option<CommissionRule>, StoreError> {
        let row = sqlx::query(
            "SELECT pharmacy_id, commission_percent, version, created_at, updated_at \
             FROM commission_rules WHERE pharmacy_id = ?",
        )
        .bind(pharmacy_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(rule_from_row).transpose()
    }

    async fn upsert_commission_rule(
        &self,
        pharmacy_id: PharmacyId,
        percent: Percent,
        expected_version: Option<i64>,
    ) -> Result<CommissionRule, StoreError> {
        let now = TimeMs::now().as_ms();

        let affected = match expected_version {
            // Guarded replace of an existing rule.
            Some(expected) => sqlx::query(
                r#"
                UPDATE commission_rules
                SET commission_percent = ?, version = version + 1, updated_at = ?
                WHERE pharmacy_id = ? AND version = ?
                "#,
            )
            .bind(percent.to_canonical_string())
            .bind(now)
            .bind(pharmacy_id.as_i64())
            .bind(expected)
            .execute(&self.pool)
            .await?
            .rows_affected(),
            None => sqlx::query(
                r#"
                INSERT INTO commission_rules (pharmacy_id, commission_percent, version, created_at, updated_at)
                VALUES (?, ?, 0, ?, ?)
                ON CONFLICT(pharmacy_id) DO UPDATE SET
                    commission_percent = excluded.commission_percent,
                    version = commission_rules.version + 1,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(pharmacy_id.as_i64())
            .bind(percent.to_canonical_string())
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected(),
        };

        if affected == 0 {
            return Err(StoreError::StaleVersion {
                entity: "commission rule",
                expected: expected_version.unwrap_or_default(),
            });
        }

        self.commission_rule(pharmacy_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("commission rule for pharmacy {}", pharmacy_id)))
    }

    async fn delete_commission_rule(&self, pharmacy_id: PharmacyId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM commission_rules WHERE pharmacy_id = ?")
            .bind(pharmacy_id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::migrations::init_db;
    use crate::db::Repository;
    use crate::domain::{Money, Percent, PharmacyId, PlatformDefaults, SettingsUpdate};
    use crate::ledger::store::{SettingsStore, StoreError};
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    async fn open_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (pool, temp_dir)
    }

    async fn settings_rows(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM platform_settings")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn setup(defaults: PlatformDefaults) -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Repository::with_defaults(pool, defaults).await.unwrap();
        (repo, temp_dir)
    }

    #[tokio::test]
    async fn test_settings_seeded_from_defaults_once() {
        let defaults = PlatformDefaults {
            currency: "USD".to_string(),
            commission_percent: Percent::parse("7.5").unwrap(),
            convenience_fee: Money::parse("25").unwrap(),
        };
        let (repo, _temp) = setup(defaults).await;

        let first = repo.platform_settings().await.unwrap();
        assert_eq!(first.currency, "USD");
        assert_eq!(first.commission_percent, Percent::parse("7.5").unwrap());
        assert_eq!(first.convenience_fee, Money::parse("25.00").unwrap());
        assert_eq!(first.version, 0);

        let second = repo.platform_settings().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_reopening_keeps_existing_settings() {
        let (pool, _temp) = open_pool().await;
        let repo = Repository::new(pool.clone()).await.unwrap();
        repo.update_platform_settings(&SettingsUpdate {
            currency: Some("USD".to_string()),
            ..SettingsUpdate::default()
        })
        .await
        .unwrap();

        let reopened = Repository::new(pool.clone()).await.unwrap();
        let settings = reopened.platform_settings().await.unwrap();
        assert_eq!(settings.currency, "USD");
        assert_eq!(settings.version, 1);
        assert_eq!(settings_rows(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_reading_settings_never_writes() {
        let (pool, _temp) = open_pool().await;
        let repo = Repository::new(pool.clone()).await.unwrap();
        sqlx::query("DELETE FROM platform_settings")
            .execute(&pool)
            .await
            .unwrap();

        assert!(repo.platform_settings().await.is_err());
        assert_eq!(settings_rows(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let (repo, _temp) = setup(PlatformDefaults::default()).await;
        let updated = repo
            .update_platform_settings(&SettingsUpdate {
                convenience_fee: Some(Money::parse("50").unwrap()),
                ..SettingsUpdate::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.currency, "LKR");
        assert_eq!(updated.commission_percent, Percent::parse("10").unwrap());
        assert_eq!(updated.convenience_fee, Money::parse("50").unwrap());
        assert_eq!(updated.version, 1);
    }

    #[tokio::test]
    async fn test_stale_settings_version_rejected() {
        let (repo, _temp) = setup(PlatformDefaults::default()).await;
        repo.update_platform_settings(&SettingsUpdate {
            expected_version: Some(0),
            currency: Some("USD".to_string()),
            ..SettingsUpdate::default()
        })
        .await
        .unwrap();

        let err = repo
            .update_platform_settings(&SettingsUpdate {
                expected_version: Some(0),
                currency: Some("EUR".to_string()),
                ..SettingsUpdate::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StaleVersion { expected: 0, .. }));
        assert_eq!(repo.platform_settings().await.unwrap().currency, "USD");
    }

    #[tokio::test]
    async fn test_commission_rule_versioning() {
        let (repo, _temp) = setup(PlatformDefaults::default()).await;
        let pharmacy = PharmacyId(8);

        let created = repo
            .upsert_commission_rule(pharmacy, Percent::parse("5").unwrap(), None)
            .await
            .unwrap();
        assert_eq!(created.version, 0);

        let replaced = repo
            .upsert_commission_rule(pharmacy, Percent::parse("6").unwrap(), Some(0))
            .await
            .unwrap();
        assert_eq!(replaced.version, 1);
        assert_eq!(replaced.commission_percent, Percent::parse("6").unwrap());

        let err = repo
            .upsert_commission_rule(pharmacy, Percent::parse("7").unwrap(), Some(0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StaleVersion { .. }));

        assert!(repo.delete_commission_rule(pharmacy).await.unwrap());
        assert!(!repo.delete_commission_rule(pharmacy).await.unwrap());
        assert!(repo.commission_rule(pharmacy).await.unwrap().is_none());
    }
}
