use crate::domain::{
    AccountId, AccountOwner, AccountStatus, Money, TimeMs, Transaction,
};
use crate::ledger::store::{AccountStore, PageRequest, SettingsStore, StoreError};
use std::sync::Arc;

/// Page-size policy shared by every history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            default_size: 20,
            max_size: 200,
        }
    }
}

impl Paging {
    /// Clamp a requested size into `[1, max_size]`, falling back to the default.
    pub fn size(&self, requested: Option<i64>) -> u32 {
        let max = self.max_size.max(1);
        match requested {
            None => self.default_size.clamp(1, max),
            Some(n) if n < 1 => 1,
            Some(n) => u32::try_from(n).unwrap_or(max).min(max),
        }
    }

    /// Negative page indexes read as the first page.
    pub fn page(&self, requested: Option<i64>) -> u32 {
        requested
            .map(|p| u32::try_from(p.max(0)).unwrap_or(u32::MAX))
            .unwrap_or(0)
    }
}

/// Balance view of one owner plus its most recent transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub owner: AccountOwner,
    /// `None` until the first posting creates the account.
    pub account_id: Option<AccountId>,
    pub currency: String,
    pub balance: Money,
    pub status: AccountStatus,
    pub version: i64,
    pub updated_at: Option<TimeMs>,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPage {
    pub owner: AccountOwner,
    pub page: u32,
    pub size: u32,
    pub total: i64,
    pub transactions: Vec<Transaction>,
}

/// Read-only access to posting history, most recent first.
///
/// Queries never create accounts; an owner nobody has posted to reads as an
/// empty active account in the platform currency.
#[derive(Clone)]
pub struct TransactionQuery {
    accounts: Arc<dyn AccountStore>,
    settings: Arc<dyn SettingsStore>,
    paging: Paging,
}

impl TransactionQuery {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        settings: Arc<dyn SettingsStore>,
        paging: Paging,
    ) -> Self {
        Self {
            accounts,
            settings,
            paging,
        }
    }

    pub async fn summary(
        &self,
        owner: AccountOwner,
        page_size: Option<i64>,
    ) -> Result<AccountSummary, StoreError> {
        let Some(account) = self.accounts.find_account(owner).await? else {
            let currency = self.settings.platform_settings().await?.currency;
            return Ok(AccountSummary {
                owner,
                account_id: None,
                currency,
                balance: Money::zero(),
                status: AccountStatus::Active,
                version: 0,
                updated_at: None,
                transactions: Vec::new(),
            });
        };

        let request = PageRequest {
            page: 0,
            size: self.paging.size(page_size),
        };
        let transactions = self.accounts.list_transactions(account.id, request).await?;

        Ok(AccountSummary {
            owner,
            account_id: Some(account.id),
            currency: account.currency,
            balance: account.balance,
            status: account.status,
            version: account.version,
            updated_at: Some(account.updated_at),
            transactions,
        })
    }

    /// The newest `page_size` transactions for an owner.
    pub async fn list_recent(
        &self,
        owner: AccountOwner,
        page_size: Option<i64>,
    ) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.page(owner, Some(0), page_size).await?.transactions)
    }

    /// Page-indexed history (zero-based) with the total row count.
    pub async fn page(
        &self,
        owner: AccountOwner,
        page: Option<i64>,
        size: Option<i64>,
    ) -> Result<TransactionPage, StoreError> {
        let request = PageRequest {
            page: self.paging.page(page),
            size: self.paging.size(size),
        };

        let Some(account) = self.accounts.find_account(owner).await? else {
            return Ok(TransactionPage {
                owner,
                page: request.page,
                size: request.size,
                total: 0,
                transactions: Vec::new(),
            });
        };

        let (transactions, total) = futures::try_join!(
            self.accounts.list_transactions(account.id, request),
            self.accounts.count_transactions(account.id),
        )?;

        Ok(TransactionPage {
            owner,
            page: request.page,
            size: request.size,
            total,
            transactions,
        })
    }

    /// Every posting that carries an order code, optionally for one sub-order.
    pub async fn for_order(
        &self,
        order_code: &str,
        sub_order_id: Option<i64>,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.accounts
            .list_order_transactions(order_code.trim(), sub_order_id)
            .await
    }
}
