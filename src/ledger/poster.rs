//! Posting of upstream events to the platform and pharmacy accounts.
//!
//! Every event becomes a list of signed legs. The legs are planned against
//! freshly loaded accounts and applied as one atomic batch guarded by each
//! account's version. A version conflict re-plans and retries once; a second
//! conflict is returned to the caller, who re-delivers the whole event.

use crate::domain::event::check_amount;
use crate::domain::{
    Account, AccountOwner, CommissionCardCaptured, Correlation, CustomerCardCaptured,
    CustomerCashCollected, ExternalKey, LedgerEvent, Money, NewTransaction, Payout, PharmacyId,
    RefundFull, Transaction, TransactionType, ValidationError,
};
use crate::ledger::commission::{split_gross, CommissionResolver};
use crate::ledger::idempotency::IdempotencyGuard;
use crate::ledger::payout::PayoutValidator;
use crate::ledger::store::{
    AccountStore, AccountUpdate, ApplyOutcome, PostingPlan, SettingsStore, StoreError,
};
use crate::ledger::LedgerError;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Total attempts for one event: the first try plus a single retry.
pub const MAX_POSTING_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Posted(Vec<Transaction>),
    /// The external key was already posted; nothing changed.
    Duplicate,
}

impl PostOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, PostOutcome::Duplicate)
    }

    pub fn transactions(&self) -> &[Transaction] {
        match self {
            PostOutcome::Posted(rows) => rows,
            PostOutcome::Duplicate => &[],
        }
    }
}

/// One signed movement against one account.
#[derive(Debug, Clone)]
struct Leg {
    owner: AccountOwner,
    kind: TransactionType,
    amount: Money,
    correlation: Correlation,
    note: String,
}

#[derive(Clone)]
pub struct LedgerPoster {
    accounts: Arc<dyn AccountStore>,
    settings: Arc<dyn SettingsStore>,
    commission: CommissionResolver,
    idempotency: IdempotencyGuard,
}

impl LedgerPoster {
    pub fn new(accounts: Arc<dyn AccountStore>, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            commission: CommissionResolver::new(settings.clone()),
            idempotency: IdempotencyGuard::new(accounts.clone()),
            accounts,
            settings,
        }
    }

    /// Post any validated event.
    ///
    /// For a card-settled commission the convenience fee is read from the
    /// current platform settings.
    pub async fn post(&self, event: &LedgerEvent) -> Result<PostOutcome, LedgerError> {
        match event {
            LedgerEvent::CustomerCardCaptured(e) => self.post_customer_card_captured(e).await,
            LedgerEvent::CustomerCashCollected(e) => self.post_customer_cash_collected(e).await,
            LedgerEvent::CommissionCardCaptured(e) => {
                let fee = self.settings.platform_settings().await?.convenience_fee;
                self.post_commission_card_captured(e, fee).await
            }
            LedgerEvent::RefundFull(e) => self.post_refund_full(e).await,
            LedgerEvent::Payout(e) => self.payout(e).await,
        }
    }

    /// Platform `+gross`, pharmacy `+(gross - commission)`.
    pub async fn post_customer_card_captured(
        &self,
        event: &CustomerCardCaptured,
    ) -> Result<PostOutcome, LedgerError> {
        let amount = positive(event.amount, "amount")?;
        let key = event.external_key.as_ref();
        if self.is_duplicate("customer_card_captured", key).await? {
            return Ok(PostOutcome::Duplicate);
        }
        let percent = self.commission.resolve(event.pharmacy_id).await?;
        let (commission, net) = split_gross(amount, percent)?;
        let order = order_label(&event.correlation);

        let legs = [
            Leg {
                owner: AccountOwner::Platform,
                kind: TransactionType::CustomerCardCapture,
                amount,
                correlation: event.correlation.clone(),
                note: format!("Customer card capture for order {}", order),
            },
            Leg {
                owner: AccountOwner::Pharmacy(event.pharmacy_id),
                kind: TransactionType::PharmacyLiabilityAccrual,
                amount: net,
                correlation: event.correlation.clone(),
                note: format!(
                    "Accrual for order {} net of {}% commission ({})",
                    order, percent, commission
                ),
            },
        ];
        self.run("customer_card_captured", &legs, key, None).await
    }

    /// Pharmacy `-commission`; the platform holds no cash for this sale.
    pub async fn post_customer_cash_collected(
        &self,
        event: &CustomerCashCollected,
    ) -> Result<PostOutcome, LedgerError> {
        let amount = positive(event.amount, "amount")?;
        let key = event.external_key.as_ref();
        if self.is_duplicate("customer_cash_collected", key).await? {
            return Ok(PostOutcome::Duplicate);
        }
        let percent = self.commission.resolve(event.pharmacy_id).await?;
        let (commission, _) = split_gross(amount, percent)?;

        // A 0% rate owes nothing; there is no zero-amount posting to make.
        if commission.is_zero() {
            info!(
                pharmacy_id = %event.pharmacy_id,
                amount = %amount,
                "Cash sale carries no commission, nothing to post"
            );
            return Ok(PostOutcome::Posted(Vec::new()));
        }

        let legs = [Leg {
            owner: AccountOwner::Pharmacy(event.pharmacy_id),
            kind: TransactionType::CashCommissionAccrual,
            amount: -commission,
            correlation: event.correlation.clone(),
            note: format!(
                "Commission owed on cash order {} at {}%",
                order_label(&event.correlation),
                percent
            ),
        }];
        self.run("customer_cash_collected", &legs, key, None).await
    }

    /// Platform `+commission` and `+fee` as separate rows, pharmacy `+commission`.
    pub async fn post_commission_card_captured(
        &self,
        event: &CommissionCardCaptured,
        convenience_fee: Money,
    ) -> Result<PostOutcome, LedgerError> {
        let commission = positive(event.commission_amount, "commissionAmount")?;
        let key = event.external_key.as_ref();
        if self.is_duplicate("commission_card_captured", key).await? {
            return Ok(PostOutcome::Duplicate);
        }
        let order = order_label(&event.correlation);

        let mut legs = vec![Leg {
            owner: AccountOwner::Platform,
            kind: TransactionType::CommissionCardCapture,
            amount: commission,
            correlation: event.correlation.clone(),
            note: format!("Commission for order {} settled by card", order),
        }];
        if convenience_fee.is_positive() {
            legs.push(Leg {
                owner: AccountOwner::Platform,
                kind: TransactionType::ConvenienceFeeIncome,
                amount: convenience_fee,
                correlation: event.correlation.clone(),
                note: format!("Convenience fee on commission settlement for order {}", order),
            });
        }
        legs.push(Leg {
            owner: AccountOwner::Pharmacy(event.pharmacy_id),
            kind: TransactionType::CommissionCardCapture,
            amount: commission,
            correlation: event.correlation.clone(),
            note: format!("Commission owed for order {} paid by card", order),
        });
        self.run("commission_card_captured", &legs, key, None).await
    }

    /// Platform `-amount`, pharmacy `-amount`.
    pub async fn post_refund_full(&self, event: &RefundFull) -> Result<PostOutcome, LedgerError> {
        let amount = positive(event.amount, "amount")?;
        let key = event.external_key.as_ref();
        if self.is_duplicate("refund_full", key).await? {
            return Ok(PostOutcome::Duplicate);
        }
        let note = format!("Full refund for order {}", order_label(&event.correlation));

        let legs = [
            Leg {
                owner: AccountOwner::Platform,
                kind: TransactionType::RefundFull,
                amount: -amount,
                correlation: event.correlation.clone(),
                note: note.clone(),
            },
            Leg {
                owner: AccountOwner::Pharmacy(event.pharmacy_id),
                kind: TransactionType::RefundFull,
                amount: -amount,
                correlation: event.correlation.clone(),
                note,
            },
        ];
        self.run("refund_full", &legs, key, None).await
    }

    /// Manual payout: platform `-amount`, pharmacy `-amount`, only when the
    /// pharmacy balance covers the full amount.
    pub async fn payout(&self, request: &Payout) -> Result<PostOutcome, LedgerError> {
        let amount = positive(request.amount, "amount")?;
        let key = request.external_key.as_ref();
        if self.is_duplicate("payout", key).await? {
            return Ok(PostOutcome::Duplicate);
        }
        let owner = AccountOwner::Pharmacy(request.pharmacy_id);

        // Never create an account just to reject a payout against it.
        if self.accounts.find_account(owner).await?.is_none() {
            return Err(LedgerError::InsufficientFunds {
                owner,
                available: Money::zero(),
                requested: amount,
            });
        }

        let note = match request.reference.as_deref() {
            Some(reference) => format!("Manual payout: {}", reference),
            None => "Manual payout".to_string(),
        };
        let legs = [
            Leg {
                owner: AccountOwner::Platform,
                kind: TransactionType::PharmacyPayout,
                amount: -amount,
                correlation: Correlation::default(),
                note: note.clone(),
            },
            Leg {
                owner,
                kind: TransactionType::PharmacyPayout,
                amount: -amount,
                correlation: Correlation::default(),
                note,
            },
        ];
        self.run("payout", &legs, key, Some((request.pharmacy_id, amount)))
            .await
    }

    async fn is_duplicate(
        &self,
        event: &'static str,
        key: Option<&ExternalKey>,
    ) -> Result<bool, LedgerError> {
        let seen = self.idempotency.already_posted(key).await?;
        if seen {
            info!(event, external_key = ?key.map(|k| k.as_str()), "Duplicate ledger event ignored");
        }
        Ok(seen)
    }

    async fn run(
        &self,
        event: &'static str,
        legs: &[Leg],
        key: Option<&ExternalKey>,
        payout: Option<(PharmacyId, Money)>,
    ) -> Result<PostOutcome, LedgerError> {
        let currency = self.settings.platform_settings().await?.currency;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let plan = self.plan(legs, key, &currency, payout).await?;

            match self.accounts.apply_postings(&plan).await {
                Ok(ApplyOutcome::Applied(rows)) => {
                    for row in &rows {
                        info!(
                            event,
                            account_id = %row.account_id,
                            kind = %row.kind,
                            amount = %row.amount,
                            balance_after = %row.balance_after,
                            "Posted ledger transaction"
                        );
                    }
                    return Ok(PostOutcome::Posted(rows));
                }
                Ok(ApplyOutcome::Duplicate) => {
                    info!(
                        event,
                        external_key = ?key.map(|k| k.as_str()),
                        "Duplicate ledger event rejected by unique external key"
                    );
                    return Ok(PostOutcome::Duplicate);
                }
                Err(StoreError::VersionConflict { account_id }) if attempt < MAX_POSTING_ATTEMPTS => {
                    warn!(event, account_id = %account_id, attempt, "Account version conflict, reloading and retrying");
                }
                Err(StoreError::VersionConflict { account_id }) => {
                    error!(event, account_id = %account_id, attempt, "Account version conflict, retries exhausted");
                    return Err(LedgerError::Conflict {
                        account_id,
                        attempts: attempt,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Compute the guarded writes and rows for `legs` against current account state.
    async fn plan(
        &self,
        legs: &[Leg],
        key: Option<&ExternalKey>,
        currency: &str,
        payout: Option<(PharmacyId, Money)>,
    ) -> Result<PostingPlan, LedgerError> {
        let mut accounts: Vec<Account> = Vec::with_capacity(2);
        for leg in legs {
            if accounts.iter().any(|a| a.owner == leg.owner) {
                continue;
            }
            let account = self
                .accounts
                .get_or_create_account(leg.owner, currency)
                .await?;
            if account.is_frozen() {
                return Err(LedgerError::AccountFrozen(account.owner));
            }
            accounts.push(account);
        }

        if let Some((pharmacy_id, amount)) = payout {
            let owner = AccountOwner::Pharmacy(pharmacy_id);
            if let Some(pharmacy) = accounts.iter().find(|a| a.owner == owner) {
                PayoutValidator::ensure_covered(pharmacy, amount)?;
            }
        }

        let mut balances: Vec<Money> = accounts.iter().map(|a| a.balance).collect();
        let mut entries = Vec::with_capacity(legs.len());
        for (i, leg) in legs.iter().enumerate() {
            let Some(idx) = accounts.iter().position(|a| a.owner == leg.owner) else {
                continue;
            };
            balances[idx] = balances[idx]
                .checked_add(leg.amount)
                .ok_or(ValidationError::Overflow("balance"))?;
            entries.push(NewTransaction {
                account_id: accounts[idx].id,
                kind: leg.kind,
                amount: leg.amount,
                balance_after: balances[idx],
                currency: accounts[idx].currency.clone(),
                correlation: leg.correlation.clone(),
                // The key rides on the first row only; the column is unique.
                external_key: if i == 0 { key.cloned() } else { None },
                note: leg.note.clone(),
            });
        }

        let updates = accounts
            .iter()
            .zip(balances)
            .map(|(account, new_balance)| AccountUpdate {
                account_id: account.id,
                expected_version: account.version,
                new_balance,
            })
            .collect();

        Ok(PostingPlan { updates, entries })
    }
}

fn positive(amount: Money, field: &'static str) -> Result<Money, LedgerError> {
    Ok(check_amount(amount, field)?)
}

fn order_label(correlation: &Correlation) -> &str {
    correlation.order_code.as_deref().unwrap_or("-")
}
