//! Balance-holding accounts (wallets) for the platform and each pharmacy.

use crate::domain::{AccountId, AccountOwner, Money, TimeMs};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an account. Frozen accounts reject postings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    #[default]
    Active,
    Frozen,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Frozen => "FROZEN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(AccountStatus::Active),
            "FROZEN" => Some(AccountStatus::Frozen),
            _ => None,
        }
    }
}

/// A persisted account row.
///
/// `balance` always equals the sum of the amounts of every transaction posted to
/// this account. It may be negative for a pharmacy that owes the platform
/// commission on cash sales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub owner: AccountOwner,
    pub currency: String,
    pub balance: Money,
    pub status: AccountStatus,
    /// Optimistic-concurrency counter; every write bumps it by one.
    pub version: i64,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

impl Account {
    pub fn is_frozen(&self) -> bool {
        self.status == AccountStatus::Frozen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_roundtrip() {
        for status in [AccountStatus::Active, AccountStatus::Frozen] {
            assert_eq!(AccountStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AccountStatus::parse("closed"), None);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&AccountStatus::Frozen).unwrap();
        assert_eq!(json, "\"FROZEN\"");
    }
}
