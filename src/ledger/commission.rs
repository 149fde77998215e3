use crate::domain::{Money, Percent, PharmacyId, ValidationError};
use crate::ledger::store::{SettingsStore, StoreError};
use std::sync::Arc;

/// Resolves the commission percentage for a pharmacy: its override when one
/// exists, otherwise the platform default.
#[derive(Clone)]
pub struct CommissionResolver {
    settings: Arc<dyn SettingsStore>,
}

impl CommissionResolver {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// The effective rate right now. Returns a pure percentage; callers round
    /// the currency amounts they derive from it.
    pub async fn resolve(&self, pharmacy_id: PharmacyId) -> Result<Percent, StoreError> {
        if let Some(rule) = self.settings.commission_rule(pharmacy_id).await? {
            return Ok(rule.commission_percent);
        }
        Ok(self.settings.platform_settings().await?.commission_percent)
    }
}

/// Split a gross amount into the platform's commission and the pharmacy's net.
///
/// The commission is rounded half-up once; the net is the exact remainder, so
/// `commission + net == gross` always holds.
pub fn split_gross(gross: Money, percent: Percent) -> Result<(Money, Money), ValidationError> {
    let commission = gross
        .checked_percent_of(percent)
        .ok_or(ValidationError::Overflow("amount"))?;
    let net = gross
        .checked_sub(commission)
        .ok_or(ValidationError::Overflow("amount"))?;
    Ok((commission, net))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::db::Repository;
    use tempfile::TempDir;

    async fn setup() -> (Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Arc::new(Repository::new(pool).await.unwrap()), temp_dir)
    }

    fn pct(s: &str) -> Percent {
        Percent::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_falls_back_to_platform_default() {
        let (repo, _temp) = setup().await;
        let resolver = CommissionResolver::new(repo);
        assert_eq!(resolver.resolve(PharmacyId(1)).await.unwrap(), pct("10"));
    }

    #[tokio::test]
    async fn test_override_wins_and_is_read_at_call_time() {
        let (repo, _temp) = setup().await;
        let resolver = CommissionResolver::new(repo.clone());

        repo.upsert_commission_rule(PharmacyId(1), pct("7.5"), None)
            .await
            .unwrap();
        assert_eq!(resolver.resolve(PharmacyId(1)).await.unwrap(), pct("7.5"));
        assert_eq!(resolver.resolve(PharmacyId(2)).await.unwrap(), pct("10"));

        repo.delete_commission_rule(PharmacyId(1)).await.unwrap();
        assert_eq!(resolver.resolve(PharmacyId(1)).await.unwrap(), pct("10"));
    }

    #[test]
    fn test_split_gross_has_no_rounding_leak() {
        let gross = Money::parse("99.99").unwrap();
        let (commission, net) = split_gross(gross, pct("12.345")).unwrap();
        // 99.99 * 12.345% = 12.3437655 -> 12.34
        assert_eq!(commission, Money::parse("12.34").unwrap());
        assert_eq!(net, Money::parse("87.65").unwrap());
        assert_eq!(commission.checked_add(net), Some(gross));
    }

    #[test]
    fn test_split_gross_zero_percent() {
        let gross = Money::parse("50").unwrap();
        let (commission, net) = split_gross(gross, pct("0")).unwrap();
        assert!(commission.is_zero());
        assert_eq!(net, gross);
    }

    #[test]
    fn test_split_gross_out_of_range_is_error() {
        let gross = Money::new(rust_decimal::Decimal::MAX);
        assert_eq!(
            split_gross(gross, pct("50")),
            Err(ValidationError::Overflow("amount"))
        );
    }
}
