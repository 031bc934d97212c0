//! IronView Transaction - per-call write contexts

use ironview_common::Result;
use std::sync::atomic::{AtomicU64, Ordering};

mod transaction;

pub use transaction::{Transaction, TransactionId, TransactionScope, TransactionState};

/// Hands out transactions with unique ids
pub struct TransactionManager {
    next_txn_id: AtomicU64,
}

impl TransactionManager {
    pub fn new() -> Self {
        TransactionManager {
            next_txn_id: AtomicU64::new(1),
        }
    }

    /// Begin a new transaction
    pub fn begin(&self) -> Transaction {
        let id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        Transaction::new(id)
    }

    /// Commit a transaction
    pub fn commit(&self, txn: &Transaction) -> Result<()> {
        txn.commit()
    }

    /// Abort a transaction
    pub fn abort(&self, txn: &Transaction) {
        txn.abort()
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
