//! Upstream ledger events.
//!
//! Each event arrives as a loosely-typed wire payload (every field optional) and
//! is validated into a closed [`LedgerEvent`] variant with its required fields
//! present before it reaches the poster.

use crate::domain::{Correlation, ExternalKey, Money, PharmacyId, EXTERNAL_KEY_MAX_LEN};
use serde::Deserialize;
use thiserror::Error;

/// Rejected event input. Nothing is persisted and the same input must not be retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} must be greater than zero")]
    NonPositive(&'static str),
    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("{field} must not exceed {max}")]
    TooLarge { field: &'static str, max: Money },
    /// Applying the amount would leave the decimal range of a balance.
    #[error("{0} is out of range")]
    Overflow(&'static str),
    #[error("externalKey exceeds {max} characters (got {len})")]
    ExternalKeyTooLong { len: usize, max: usize },
}

fn require_pharmacy(raw: Option<i64>) -> Result<PharmacyId, ValidationError> {
    let raw = raw.ok_or(ValidationError::Missing("pharmacyId"))?;
    PharmacyId::new(raw).ok_or_else(|| ValidationError::Invalid {
        field: "pharmacyId",
        reason: format!("must be positive, got {}", raw),
    })
}

fn require_positive(raw: Option<Money>, field: &'static str) -> Result<Money, ValidationError> {
    check_amount(raw.ok_or(ValidationError::Missing(field))?, field)
}

/// Money inputs must be strictly positive after rounding to 2 decimals and
/// no larger than [`Money::max_amount`].
pub fn check_amount(amount: Money, field: &'static str) -> Result<Money, ValidationError> {
    if !amount.is_positive() {
        return Err(ValidationError::NonPositive(field));
    }
    let max = Money::max_amount();
    if amount > max {
        return Err(ValidationError::TooLarge { field, max });
    }
    Ok(amount)
}

fn require_order_code(raw: Option<String>) -> Result<String, ValidationError> {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::Missing("orderCode"))
}

fn external_key(raw: Option<String>) -> Result<Option<ExternalKey>, ValidationError> {
    ExternalKey::normalize(raw).map_err(|len| ValidationError::ExternalKeyTooLong {
        len,
        max: EXTERNAL_KEY_MAX_LEN,
    })
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// =========================================================================
// Wire payloads
// =========================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCardCapturedPayload {
    pub order_code: Option<String>,
    #[serde(alias = "pharmacyOrderId")]
    pub sub_order_id: Option<i64>,
    pub prescription_id: Option<i64>,
    pub pharmacy_id: Option<i64>,
    pub amount: Option<Money>,
    pub payment_id: Option<String>,
    pub external_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCashCollectedPayload {
    pub order_code: Option<String>,
    #[serde(alias = "pharmacyOrderId")]
    pub sub_order_id: Option<i64>,
    pub prescription_id: Option<i64>,
    pub pharmacy_id: Option<i64>,
    pub amount: Option<Money>,
    pub external_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionCardCapturedPayload {
    pub pharmacy_id: Option<i64>,
    pub order_code: Option<String>,
    pub commission_amount: Option<Money>,
    pub payment_id: Option<String>,
    pub external_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundFullPayload {
    pub order_code: Option<String>,
    #[serde(alias = "pharmacyOrderId")]
    pub sub_order_id: Option<i64>,
    pub pharmacy_id: Option<i64>,
    pub amount: Option<Money>,
    pub external_key: Option<String>,
}

/// Payout request body; the pharmacy comes from the request path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutPayload {
    pub amount: Option<Money>,
    pub reference: Option<String>,
    pub external_key: Option<String>,
}

// =========================================================================
// Validated events
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerCardCaptured {
    pub pharmacy_id: PharmacyId,
    pub amount: Money,
    pub correlation: Correlation,
    pub external_key: Option<ExternalKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerCashCollected {
    pub pharmacy_id: PharmacyId,
    pub amount: Money,
    pub correlation: Correlation,
    pub external_key: Option<ExternalKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionCardCaptured {
    pub pharmacy_id: PharmacyId,
    pub commission_amount: Money,
    pub correlation: Correlation,
    pub external_key: Option<ExternalKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundFull {
    pub pharmacy_id: PharmacyId,
    pub amount: Money,
    pub correlation: Correlation,
    pub external_key: Option<ExternalKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub pharmacy_id: PharmacyId,
    pub amount: Money,
    pub reference: Option<String>,
    pub external_key: Option<ExternalKey>,
}

/// The closed set of facts the ledger accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    CustomerCardCaptured(CustomerCardCaptured),
    CustomerCashCollected(CustomerCashCollected),
    CommissionCardCaptured(CommissionCardCaptured),
    RefundFull(RefundFull),
    Payout(Payout),
}

impl CustomerCardCapturedPayload {
    pub fn validate(self) -> Result<LedgerEvent, ValidationError> {
        Ok(LedgerEvent::CustomerCardCaptured(CustomerCardCaptured {
            pharmacy_id: require_pharmacy(self.pharmacy_id)?,
            amount: require_positive(self.amount, "amount")?,
            correlation: Correlation {
                order_code: Some(require_order_code(self.order_code)?),
                sub_order_id: self.sub_order_id,
                prescription_id: self.prescription_id,
                payment_id: non_blank(self.payment_id),
            },
            external_key: external_key(self.external_key)?,
        }))
    }
}

impl CustomerCashCollectedPayload {
    pub fn validate(self) -> Result<LedgerEvent, ValidationError> {
        Ok(LedgerEvent::CustomerCashCollected(CustomerCashCollected {
            pharmacy_id: require_pharmacy(self.pharmacy_id)?,
            amount: require_positive(self.amount, "amount")?,
            correlation: Correlation {
                order_code: Some(require_order_code(self.order_code)?),
                sub_order_id: self.sub_order_id,
                prescription_id: self.prescription_id,
                payment_id: None,
            },
            external_key: external_key(self.external_key)?,
        }))
    }
}

impl CommissionCardCapturedPayload {
    pub fn validate(self) -> Result<LedgerEvent, ValidationError> {
        Ok(LedgerEvent::CommissionCardCaptured(CommissionCardCaptured {
            pharmacy_id: require_pharmacy(self.pharmacy_id)?,
            commission_amount: require_positive(self.commission_amount, "commissionAmount")?,
            correlation: Correlation {
                order_code: Some(require_order_code(self.order_code)?),
                payment_id: non_blank(self.payment_id),
                ..Correlation::default()
            },
            external_key: external_key(self.external_key)?,
        }))
    }
}

impl RefundFullPayload {
    pub fn validate(self) -> Result<LedgerEvent, ValidationError> {
        Ok(LedgerEvent::RefundFull(RefundFull {
            pharmacy_id: require_pharmacy(self.pharmacy_id)?,
            amount: require_positive(self.amount, "amount")?,
            correlation: Correlation {
                order_code: Some(require_order_code(self.order_code)?),
                sub_order_id: self.sub_order_id,
                ..Correlation::default()
            },
            external_key: external_key(self.external_key)?,
        }))
    }
}

impl PayoutPayload {
    pub fn validate(self, pharmacy_id: i64) -> Result<LedgerEvent, ValidationError> {
        Ok(LedgerEvent::Payout(Payout {
            pharmacy_id: require_pharmacy(Some(pharmacy_id))?,
            amount: require_positive(self.amount, "amount")?,
            reference: non_blank(self.reference),
            external_key: external_key(self.external_key)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Option<Money> {
        Some(Money::parse(s).unwrap())
    }

    fn card_payload() -> CustomerCardCapturedPayload {
        CustomerCardCapturedPayload {
            order_code: Some("ORD-1".to_string()),
            sub_order_id: Some(11),
            prescription_id: Some(5),
            pharmacy_id: Some(7),
            amount: money("1000.00"),
            payment_id: Some("pay_1".to_string()),
            external_key: Some("evt-1".to_string()),
        }
    }

    #[test]
    fn test_card_payload_validates() {
        let event = card_payload().validate().unwrap();
        match event {
            LedgerEvent::CustomerCardCaptured(e) => {
                assert_eq!(e.pharmacy_id, PharmacyId(7));
                assert_eq!(e.amount, Money::parse("1000").unwrap());
                assert_eq!(e.correlation.order_code.as_deref(), Some("ORD-1"));
                assert_eq!(e.correlation.sub_order_id, Some(11));
                assert_eq!(e.external_key.unwrap().as_str(), "evt-1");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_missing_pharmacy_rejected() {
        let mut payload = card_payload();
        payload.pharmacy_id = None;
        assert_eq!(
            payload.validate(),
            Err(ValidationError::Missing("pharmacyId"))
        );
    }

    #[test]
    fn test_zero_and_negative_amounts_rejected() {
        for raw in ["0", "-5", "0.004"] {
            let mut payload = card_payload();
            payload.amount = money(raw);
            assert_eq!(
                payload.validate(),
                Err(ValidationError::NonPositive("amount")),
                "amount {} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_amount_above_ceiling_rejected() {
        let mut payload = card_payload();
        payload.amount = money("10000000000000000000000000000");
        assert!(matches!(
            payload.validate(),
            Err(ValidationError::TooLarge { field: "amount", .. })
        ));

        let mut at_ceiling = card_payload();
        at_ceiling.amount = Some(Money::max_amount());
        assert!(at_ceiling.validate().is_ok());
    }

    #[test]
    fn test_blank_order_code_rejected() {
        let payload = RefundFullPayload {
            order_code: Some("  ".to_string()),
            pharmacy_id: Some(1),
            amount: money("10"),
            ..RefundFullPayload::default()
        };
        assert_eq!(payload.validate(), Err(ValidationError::Missing("orderCode")));
    }

    #[test]
    fn test_commission_requires_commission_amount() {
        let payload = CommissionCardCapturedPayload {
            pharmacy_id: Some(1),
            order_code: Some("ORD-9".to_string()),
            ..CommissionCardCapturedPayload::default()
        };
        assert_eq!(
            payload.validate(),
            Err(ValidationError::Missing("commissionAmount"))
        );
    }

    #[test]
    fn test_payout_path_pharmacy_must_be_positive() {
        let payload = PayoutPayload {
            amount: money("1"),
            ..PayoutPayload::default()
        };
        assert!(matches!(
            payload.validate(0),
            Err(ValidationError::Invalid { field: "pharmacyId", .. })
        ));
    }

    #[test]
    fn test_payload_accepts_legacy_sub_order_alias() {
        let payload: CustomerCashCollectedPayload = serde_json::from_value(serde_json::json!({
            "orderCode": "ORD-2",
            "pharmacyOrderId": 44,
            "pharmacyId": 3,
            "amount": 500
        }))
        .unwrap();
        assert_eq!(payload.sub_order_id, Some(44));
        assert!(payload.validate().is_ok());
    }
}
