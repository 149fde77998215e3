//! Domain types for the pharmacy wallet ledger.
//!
//! This module provides:
//! - Fixed-point money and percentages via `Money` / `Percent`
//! - Domain primitives: TimeMs, PharmacyId, AccountId, AccountOwner, ExternalKey
//! - Accounts, immutable transactions, and settings rows
//! - The closed set of upstream ledger events and their validation

pub mod account;
pub mod event;
pub mod money;
pub mod primitives;
pub mod settings;
pub mod transaction;

pub use account::{Account, AccountStatus};
pub use event::{
    CommissionCardCaptured, CustomerCardCaptured, CustomerCashCollected, LedgerEvent, Payout,
    RefundFull, ValidationError,
};
pub use money::{Money, Percent, MONEY_SCALE};
pub use primitives::{
    AccountId, AccountOwner, ExternalKey, OwnerKind, PharmacyId, TimeMs, EXTERNAL_KEY_MAX_LEN,
};
pub use settings::{CommissionRule, PlatformDefaults, PlatformSettings, SettingsUpdate};
pub use transaction::{Correlation, NewTransaction, Transaction, TransactionType};
