use crate::domain::{Account, Money};
use crate::ledger::LedgerError;

/// Guards manual withdrawals against overdrawing a pharmacy account.
pub struct PayoutValidator;

impl PayoutValidator {
    /// Reject a payout unless the account's current balance covers all of
    /// it. There are no partial payouts.
    pub fn ensure_covered(pharmacy: &Account, amount: Money) -> Result<(), LedgerError> {
        if pharmacy.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                owner: pharmacy.owner,
                available: pharmacy.balance,
                requested: amount,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, AccountOwner, AccountStatus, PharmacyId, TimeMs};

    fn account(balance: &str) -> Account {
        Account {
            id: AccountId(1),
            owner: AccountOwner::Pharmacy(PharmacyId(9)),
            currency: "LKR".to_string(),
            balance: Money::parse(balance).unwrap(),
            status: AccountStatus::Active,
            version: 3,
            created_at: TimeMs::new(0),
            updated_at: TimeMs::new(0),
        }
    }

    #[test]
    fn test_exact_balance_is_covered() {
        let acct = account("900.00");
        assert!(PayoutValidator::ensure_covered(&acct, Money::parse("900.00").unwrap()).is_ok());
    }

    #[test]
    fn test_one_cent_over_is_rejected() {
        let acct = account("900.00");
        let err = PayoutValidator::ensure_covered(&acct, Money::parse("900.01").unwrap())
            .unwrap_err();
        match err {
            LedgerError::InsufficientFunds {
                available,
                requested,
                ..
            } => {
                assert_eq!(available.to_canonical_string(), "900.00");
                assert_eq!(requested.to_canonical_string(), "900.01");
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_balance_never_covers() {
        let acct = account("-50.00");
        assert!(matches!(
            PayoutValidator::ensure_covered(&acct, Money::parse("0.01").unwrap()),
            Err(LedgerError::InsufficientFunds { .. })
        ));
    }
}
