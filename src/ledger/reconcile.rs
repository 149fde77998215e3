use crate::domain::{AccountOwner, Money};
use crate::ledger::store::{AccountStore, StoreError};
use crate::ledger::LedgerError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Replay check of one account: the stored balance must equal the sum of its
/// transaction amounts, and the newest `balance_after` must equal the balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub owner: String,
    pub balance: Money,
    pub replayed_balance: Money,
    pub latest_balance_after: Option<Money>,
    pub transaction_count: usize,
    pub consistent: bool,
}

#[derive(Clone)]
pub struct Reconciler {
    accounts: Arc<dyn AccountStore>,
}

impl Reconciler {
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    pub async fn reconcile(&self, owner: AccountOwner) -> Result<ReconciliationReport, LedgerError> {
        let snapshot = self
            .accounts
            .ledger_snapshot(owner)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("account {}", owner)))?;

        let replayed = snapshot
            .amounts
            .iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(*amount))
            .ok_or_else(|| {
                StoreError::Corrupt(format!("transaction amounts of {} overflow", owner))
            })?;
        let balance = snapshot.account.balance;
        let tail_matches = match snapshot.latest_balance_after {
            Some(after) => after == balance,
            None => balance.is_zero(),
        };
        let consistent = replayed == balance && tail_matches;

        if consistent {
            info!(owner = %owner, balance = %balance, "Account reconciled");
        } else {
            warn!(
                owner = %owner,
                balance = %balance,
                replayed = %replayed,
                latest_balance_after = ?snapshot.latest_balance_after.map(|m| m.to_canonical_string()),
                "Account does not reconcile"
            );
        }

        Ok(ReconciliationReport {
            owner: owner.to_string(),
            balance,
            replayed_balance: replayed,
            latest_balance_after: snapshot.latest_balance_after,
            transaction_count: snapshot.amounts.len(),
            consistent,
        })
    }
}
