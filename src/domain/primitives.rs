//! Domain primitives: TimeMs, PharmacyId, AccountId, AccountOwner, ExternalKey.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// RFC 3339 rendering for API responses.
    pub fn to_rfc3339(&self) -> String {
        chrono::DateTime::<chrono::Utc>::from_timestamp_millis(self.0)
            .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            .unwrap_or_default()
    }
}

/// Pharmacy identifier assigned by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PharmacyId(pub i64);

impl PharmacyId {
    /// Accepts strictly positive identifiers only.
    pub fn new(id: i64) -> Option<Self> {
        (id > 0).then_some(PharmacyId(id))
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for PharmacyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row identifier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owner kind tag as persisted in `accounts.owner_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OwnerKind {
    Platform,
    Pharmacy,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Platform => "PLATFORM",
            OwnerKind::Pharmacy => "PHARMACY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PLATFORM" => Some(OwnerKind::Platform),
            "PHARMACY" => Some(OwnerKind::Pharmacy),
            _ => None,
        }
    }
}

/// Who an account belongs to: the singleton platform or one pharmacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountOwner {
    Platform,
    Pharmacy(PharmacyId),
}

impl AccountOwner {
    pub fn kind(&self) -> OwnerKind {
        match self {
            AccountOwner::Platform => OwnerKind::Platform,
            AccountOwner::Pharmacy(_) => OwnerKind::Pharmacy,
        }
    }

    /// Owner id column value; `None` for the platform.
    pub fn owner_id(&self) -> Option<i64> {
        match self {
            AccountOwner::Platform => None,
            AccountOwner::Pharmacy(id) => Some(id.as_i64()),
        }
    }

    /// Rebuild an owner from its persisted columns.
    pub fn from_columns(kind: &str, owner_id: Option<i64>) -> Option<Self> {
        match (OwnerKind::parse(kind)?, owner_id) {
            (OwnerKind::Platform, None) => Some(AccountOwner::Platform),
            (OwnerKind::Pharmacy, Some(id)) => PharmacyId::new(id).map(AccountOwner::Pharmacy),
            _ => None,
        }
    }
}

impl fmt::Display for AccountOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountOwner::Platform => write!(f, "platform"),
            AccountOwner::Pharmacy(id) => write!(f, "pharmacy:{}", id),
        }
    }
}

/// Maximum stored length of an external idempotency key.
pub const EXTERNAL_KEY_MAX_LEN: usize = 128;

/// Caller-supplied idempotency token for one real-world event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalKey(String);

impl ExternalKey {
    /// Normalize a raw key: surrounding whitespace is dropped and a blank key
    /// counts as absent.
    ///
    /// Returns `Err` with the offending length when the key is too long.
    pub fn normalize(raw: Option<String>) -> Result<Option<Self>, usize> {
        let Some(key) = raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        if key.chars().count() > EXTERNAL_KEY_MAX_LEN {
            return Err(key.chars().count());
        }
        Ok(Some(ExternalKey(key)))
    }

    /// Wrap a key read back from storage, where it was normalized on the way in.
    pub(crate) fn from_stored(key: String) -> Self {
        ExternalKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pharmacy_id_must_be_positive() {
        assert!(PharmacyId::new(1).is_some());
        assert!(PharmacyId::new(0).is_none());
        assert!(PharmacyId::new(-7).is_none());
    }

    #[test]
    fn test_owner_columns_roundtrip() {
        let pharmacy = AccountOwner::Pharmacy(PharmacyId(42));
        assert_eq!(
            AccountOwner::from_columns(pharmacy.kind().as_str(), pharmacy.owner_id()),
            Some(pharmacy)
        );
        assert_eq!(
            AccountOwner::from_columns("PLATFORM", None),
            Some(AccountOwner::Platform)
        );
        assert_eq!(AccountOwner::from_columns("PLATFORM", Some(3)), None);
        assert_eq!(AccountOwner::from_columns("PHARMACY", None), None);
    }

    #[test]
    fn test_external_key_normalization() {
        assert_eq!(ExternalKey::normalize(None), Ok(None));
        assert_eq!(ExternalKey::normalize(Some("   ".to_string())), Ok(None));
        let key = ExternalKey::normalize(Some("  evt-1 ".to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(key.as_str(), "evt-1");
        assert_eq!(
            ExternalKey::normalize(Some("k".repeat(129))),
            Err(129)
        );
    }

    #[test]
    fn test_timems_ordering() {
        let t1 = TimeMs::new(1000);
        let t2 = TimeMs::new(2000);
        assert!(t1 < t2);
    }

    #[test]
    fn test_timems_rfc3339() {
        assert_eq!(TimeMs::new(0).to_rfc3339(), "1970-01-01T00:00:00.000Z");
    }
}
