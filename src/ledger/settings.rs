//! Administrative operations: platform settings, commission overrides and
//! account status.

use crate::domain::settings::is_valid_currency;
use crate::domain::{
    Account, AccountOwner, AccountStatus, CommissionRule, Money, Percent, PharmacyId,
    PlatformSettings, SettingsUpdate, ValidationError,
};
use crate::ledger::store::{AccountStore, SettingsStore};
use crate::ledger::LedgerError;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct SettingsService {
    accounts: Arc<dyn AccountStore>,
    settings: Arc<dyn SettingsStore>,
}

impl SettingsService {
    pub fn new(accounts: Arc<dyn AccountStore>, settings: Arc<dyn SettingsStore>) -> Self {
        Self { accounts, settings }
    }

    pub async fn platform_settings(&self) -> Result<PlatformSettings, LedgerError> {
        Ok(self.settings.platform_settings().await?)
    }

    /// Apply a partial update. Currency codes are upper-cased before checking.
    pub async fn update_platform_settings(
        &self,
        mut update: SettingsUpdate,
    ) -> Result<PlatformSettings, LedgerError> {
        if let Some(currency) = update.currency.take() {
            let currency = currency.trim().to_ascii_uppercase();
            if !is_valid_currency(&currency) {
                return Err(ValidationError::Invalid {
                    field: "currency",
                    reason: format!("'{}' is not a currency code", currency),
                }
                .into());
            }
            update.currency = Some(currency);
        }
        if let Some(fee) = update.convenience_fee {
            if fee.is_negative() {
                return Err(ValidationError::Invalid {
                    field: "convenienceFee",
                    reason: "must not be negative".to_string(),
                }
                .into());
            }
            let max = Money::max_amount();
            if fee > max {
                return Err(ValidationError::TooLarge {
                    field: "convenienceFee",
                    max,
                }
                .into());
            }
        }

        let updated = self.settings.update_platform_settings(&update).await?;
        info!(
            currency = %updated.currency,
            commission_percent = %updated.commission_percent,
            convenience_fee = %updated.convenience_fee,
            version = updated.version,
            "Platform settings updated"
        );
        Ok(updated)
    }

    pub async fn commission_rule(&self, pharmacy_id: i64) -> Result<CommissionRule, LedgerError> {
        let pharmacy_id = pharmacy(pharmacy_id)?;
        self.settings
            .commission_rule(pharmacy_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("commission rule for pharmacy {}", pharmacy_id)))
    }

    pub async fn upsert_commission_rule(
        &self,
        pharmacy_id: i64,
        percent: Option<Percent>,
        expected_version: Option<i64>,
    ) -> Result<CommissionRule, LedgerError> {
        let pharmacy_id = pharmacy(pharmacy_id)?;
        let percent = percent.ok_or(ValidationError::Missing("commissionPercent"))?;
        let rule = self
            .settings
            .upsert_commission_rule(pharmacy_id, percent, expected_version)
            .await?;
        info!(
            pharmacy_id = %pharmacy_id,
            commission_percent = %rule.commission_percent,
            version = rule.version,
            "Commission override saved"
        );
        Ok(rule)
    }

    /// Removing an override reverts the pharmacy to the platform default.
    pub async fn delete_commission_rule(&self, pharmacy_id: i64) -> Result<(), LedgerError> {
        let pharmacy_id = pharmacy(pharmacy_id)?;
        if !self.settings.delete_commission_rule(pharmacy_id).await? {
            return Err(LedgerError::NotFound(format!(
                "commission rule for pharmacy {}",
                pharmacy_id
            )));
        }
        info!(pharmacy_id = %pharmacy_id, "Commission override removed");
        Ok(())
    }

    /// Freeze or unfreeze a pharmacy account. The account is created if this
    /// is the first thing that ever touches it.
    pub async fn set_pharmacy_status(
        &self,
        pharmacy_id: i64,
        status: AccountStatus,
    ) -> Result<Account, LedgerError> {
        let owner = AccountOwner::Pharmacy(pharmacy(pharmacy_id)?);
        let currency = self.settings.platform_settings().await?.currency;
        self.accounts.get_or_create_account(owner, &currency).await?;
        let account = self.accounts.set_account_status(owner, status).await?;
        info!(owner = %owner, status = status.as_str(), "Account status changed");
        Ok(account)
    }
}

fn pharmacy(raw: i64) -> Result<PharmacyId, ValidationError> {
    PharmacyId::new(raw).ok_or_else(|| ValidationError::Invalid {
        field: "pharmacyId",
        reason: format!("must be positive, got {}", raw),
    })
}
