use crate::domain::ExternalKey;
use crate::ledger::store::{AccountStore, StoreError};
use std::sync::Arc;

/// Short-circuits events whose external key has already been posted.
///
/// This lookup is only the fast path. Two concurrent deliveries can both pass
/// it; the unique `external_key` column makes the second insert a no-op and the
/// store reports [`ApplyOutcome::Duplicate`](crate::ledger::store::ApplyOutcome).
#[derive(Clone)]
pub struct IdempotencyGuard {
    store: Arc<dyn AccountStore>,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Without a key no dedup is attempted and this is always false.
    pub async fn already_posted(&self, key: Option<&ExternalKey>) -> Result<bool, StoreError> {
        match key {
            Some(key) => self.store.external_key_exists(key.as_str()).await,
            None => Ok(false),
        }
    }
}
