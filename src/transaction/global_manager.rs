use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::collections::HashSet;
use crate::core::DatabaseError;

pub type TransactionId = u64;

/// Global transaction manager shared across all sessions
///
/// Provides:
/// - Atomic transaction ID generation
/// - Active transaction tracking
///
/// Staged writes themselves live in the row store keyed by the id handed
/// out here.
#[derive(Debug, Clone)]
pub struct GlobalTransactionManager {
    /// Atomic counter for generating unique transaction IDs
    next_tx_id: Arc<AtomicU64>,

    /// Active (uncommitted) transactions
    active_transactions: Arc<RwLock<HashSet<TransactionId>>>,
}

impl GlobalTransactionManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            // Start from 1 (0 is never handed out)
            next_tx_id: Arc::new(AtomicU64::new(1)),
            active_transactions: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Allocates a new transaction ID and registers it as active
    pub fn begin_transaction(&self) -> Result<TransactionId, DatabaseError> {
        let tx_id = self.next_tx_id.fetch_add(1, Ordering::SeqCst);
        self.active_transactions.write()?.insert(tx_id);
        Ok(tx_id)
    }

    /// Removes the transaction from the active set.
    /// Returns false when it was not active.
    pub fn commit_transaction(&self, tx_id: TransactionId) -> Result<bool, DatabaseError> {
        Ok(self.active_transactions.write()?.remove(&tx_id))
    }

    /// Removes the transaction from the active set. The staged changes are
    /// discarded by the caller.
    pub fn rollback_transaction(&self, tx_id: TransactionId) -> Result<bool, DatabaseError> {
        Ok(self.active_transactions.write()?.remove(&tx_id))
    }

    pub fn is_active(&self, tx_id: TransactionId) -> Result<bool, DatabaseError> {
        Ok(self.active_transactions.read()?.contains(&tx_id))
    }

    pub fn active_count(&self) -> Result<usize, DatabaseError> {
        Ok(self.active_transactions.read()?.len())
    }

    /// The next ID that will be assigned to a transaction
    #[must_use]
    pub fn current_tx_id(&self) -> TransactionId {
        self.next_tx_id.load(Ordering::SeqCst)
    }
}

impl Default for GlobalTransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_global_transaction_manager() {
        let gtm = GlobalTransactionManager::new();
        assert_eq!(gtm.current_tx_id(), 1);
        assert_eq!(gtm.active_count().unwrap(), 0);
    }

    #[test]
    fn test_begin_transaction_increments() {
        let gtm = GlobalTransactionManager::new();

        let tx1 = gtm.begin_transaction().unwrap();
        let tx2 = gtm.begin_transaction().unwrap();
        let tx3 = gtm.begin_transaction().unwrap();

        assert_eq!(tx1, 1);
        assert_eq!(tx2, 2);
        assert_eq!(tx3, 3);
        assert_eq!(gtm.current_tx_id(), 4);
        assert_eq!(gtm.active_count().unwrap(), 3);
    }

    #[test]
    fn test_clone_shares_state() {
        let gtm1 = GlobalTransactionManager::new();
        let gtm2 = gtm1.clone();

        let tx1 = gtm1.begin_transaction().unwrap();
        let tx2 = gtm2.begin_transaction().unwrap();

        assert_eq!(tx1, 1);
        assert_eq!(tx2, 2);
        assert!(gtm2.is_active(tx1).unwrap());
        assert_eq!(gtm1.current_tx_id(), 3);
    }

    #[test]
    fn test_commit_removes_from_active() {
        let gtm = GlobalTransactionManager::new();

        let tx1 = gtm.begin_transaction().unwrap();
        assert!(gtm.is_active(tx1).unwrap());

        assert!(gtm.commit_transaction(tx1).unwrap());
        assert!(!gtm.is_active(tx1).unwrap());

        // Second commit finds nothing to remove
        assert!(!gtm.commit_transaction(tx1).unwrap());
    }

    #[test]
    fn test_rollback_removes_from_active() {
        let gtm = GlobalTransactionManager::new();

        let tx1 = gtm.begin_transaction().unwrap();
        let tx2 = gtm.begin_transaction().unwrap();

        assert!(gtm.rollback_transaction(tx1).unwrap());
        assert!(!gtm.is_active(tx1).unwrap());
        assert!(gtm.is_active(tx2).unwrap());
    }
}
