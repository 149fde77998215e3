//! Immutable postings recorded against exactly one account.

use crate::domain::{AccountId, ExternalKey, Money, TimeMs};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a posting represents. Persisted as the SCREAMING_SNAKE tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Platform receives the full gross of a customer card payment.
    CustomerCardCapture,
    /// Pharmacy is owed the gross net of commission.
    PharmacyLiabilityAccrual,
    /// Pharmacy owes commission on a cash sale it collected itself.
    CashCommissionAccrual,
    /// Commission owed by a pharmacy was paid by card.
    CommissionCardCapture,
    ConvenienceFeeIncome,
    PharmacyPayout,
    RefundFull,
}

impl TransactionType {
    pub const ALL: [TransactionType; 7] = [
        TransactionType::CustomerCardCapture,
        TransactionType::PharmacyLiabilityAccrual,
        TransactionType::CashCommissionAccrual,
        TransactionType::CommissionCardCapture,
        TransactionType::ConvenienceFeeIncome,
        TransactionType::PharmacyPayout,
        TransactionType::RefundFull,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::CustomerCardCapture => "CUSTOMER_CARD_CAPTURE",
            TransactionType::PharmacyLiabilityAccrual => "PHARMACY_LIABILITY_ACCRUAL",
            TransactionType::CashCommissionAccrual => "CASH_COMMISSION_ACCRUAL",
            TransactionType::CommissionCardCapture => "COMMISSION_CARD_CAPTURE",
            TransactionType::ConvenienceFeeIncome => "CONVENIENCE_FEE_INCOME",
            TransactionType::PharmacyPayout => "PHARMACY_PAYOUT",
            TransactionType::RefundFull => "REFUND_FULL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional identifiers tying a posting back to the order workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correlation {
    pub order_code: Option<String>,
    pub sub_order_id: Option<i64>,
    pub prescription_id: Option<i64>,
    pub payment_id: Option<String>,
}

/// A posting that has been planned but not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub kind: TransactionType,
    pub amount: Money,
    /// Balance of the account immediately after this posting.
    pub balance_after: Money,
    pub currency: String,
    pub correlation: Correlation,
    pub external_key: Option<ExternalKey>,
    pub note: String,
}

/// A persisted posting. Never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: i64,
    pub account_id: AccountId,
    pub kind: TransactionType,
    pub amount: Money,
    pub balance_after: Money,
    pub currency: String,
    pub correlation: Correlation,
    pub external_key: Option<ExternalKey>,
    pub note: String,
    pub created_at: TimeMs,
}

impl Transaction {
    /// Materialize a written row from its plan and storage-assigned fields.
    pub fn from_new(id: i64, created_at: TimeMs, new: NewTransaction) -> Self {
        Transaction {
            id,
            account_id: new.account_id,
            kind: new.kind,
            amount: new.amount,
            balance_after: new.balance_after,
            currency: new.currency,
            correlation: new.correlation,
            external_key: new.external_key,
            note: new.note,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tags_roundtrip() {
        for kind in TransactionType::ALL {
            assert_eq!(TransactionType::parse(kind.as_str()), Some(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert_eq!(TransactionType::parse("DEPOSIT"), None);
    }
}
