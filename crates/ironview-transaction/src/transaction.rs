//! Transaction handles passed to every write call

use ironview_common::{Error, Result};
use parking_lot::Mutex;

pub type TransactionId = u64;

/// State of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

/// How a writable resource associates writes with a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionScope {
    /// The transaction is an argument of each write call
    PerCall,
    /// The transaction is bound to the resource instance and shared by
    /// everything that holds it
    Bound,
}

/// A write context. Writes made through a resource are attributed to the
/// transaction passed with the call.
#[derive(Debug)]
pub struct Transaction {
    /// Unique transaction ID
    pub id: TransactionId,
    state: Mutex<TransactionState>,
}

impl Transaction {
    pub fn new(id: TransactionId) -> Self {
        Transaction {
            id,
            state: Mutex::new(TransactionState::Active),
        }
    }

    pub fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    /// Check if transaction is active
    pub fn is_active(&self) -> bool {
        self.state() == TransactionState::Active
    }

    /// Fail unless the transaction still accepts writes
    pub fn ensure_active(&self) -> Result<()> {
        match self.state() {
            TransactionState::Active => Ok(()),
            state => Err(Error::TransactionAborted(format!(
                "transaction {} is {:?}",
                self.id, state
            ))),
        }
    }

    /// Commit this transaction
    pub fn commit(&self) -> Result<()> {
        let mut state = self.state.lock();
        if *state != TransactionState::Active {
            return Err(Error::TransactionAborted(
                "Cannot commit non-active transaction".to_string(),
            ));
        }
        *state = TransactionState::Committed;
        Ok(())
    }

    /// Abort this transaction
    pub fn abort(&self) {
        *self.state.lock() = TransactionState::Aborted;
    }
}
