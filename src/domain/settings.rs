//! Platform-wide settings and per-pharmacy commission overrides.

use crate::domain::{Money, Percent, PharmacyId, TimeMs};
use serde::{Deserialize, Serialize};

/// The singleton platform settings row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSettings {
    pub currency: String,
    /// Default commission applied when a pharmacy has no override.
    pub commission_percent: Percent,
    pub convenience_fee: Money,
    pub version: i64,
    pub updated_at: TimeMs,
}

/// Values seeded into the settings row the first time it is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDefaults {
    pub currency: String,
    pub commission_percent: Percent,
    pub convenience_fee: Money,
}

impl Default for PlatformDefaults {
    fn default() -> Self {
        Self {
            currency: "LKR".to_string(),
            commission_percent: Percent::new(rust_decimal::Decimal::TEN).unwrap_or_default(),
            convenience_fee: Money::zero(),
        }
    }
}

/// Partial update of platform settings; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub currency: Option<String>,
    pub commission_percent: Option<Percent>,
    pub convenience_fee: Option<Money>,
    /// When present, the update is rejected unless it matches the stored version.
    pub expected_version: Option<i64>,
}

/// A pharmacy-specific commission override. At most one per pharmacy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionRule {
    pub pharmacy_id: PharmacyId,
    pub commission_percent: Percent,
    pub version: i64,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

/// Currency codes are 3 to 8 ASCII uppercase letters (e.g. "LKR").
pub fn is_valid_currency(code: &str) -> bool {
    (3..=8).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = PlatformDefaults::default();
        assert_eq!(defaults.currency, "LKR");
        assert_eq!(defaults.commission_percent, Percent::parse("10").unwrap());
        assert!(defaults.convenience_fee.is_zero());
    }

    #[test]
    fn test_currency_validation() {
        assert!(is_valid_currency("LKR"));
        assert!(is_valid_currency("USDC"));
        assert!(!is_valid_currency("lkr"));
        assert!(!is_valid_currency("LK"));
        assert!(!is_valid_currency("L K R"));
        assert!(!is_valid_currency(""));
    }
}
