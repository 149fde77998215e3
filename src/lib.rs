pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod ledger;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Account, AccountOwner, AccountStatus, LedgerEvent, Money, Percent, PharmacyId, TimeMs,
    Transaction, TransactionType,
};
pub use error::AppError;
pub use ledger::{Ledger, LedgerError, PostOutcome};
