use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use crate::core::DatabaseError;
use crate::routine::RoutineBinding;
use crate::storage::RowStore;
use crate::transaction::TransactionId;

/// Cooperative cancellation flag, checked at window partition and fixpoint
/// iteration boundaries. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Err(Cancelled) once `cancel` has been called
    pub fn check(&self) -> Result<(), DatabaseError> {
        if self.is_cancelled() {
            Err(DatabaseError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Everything one statement execution needs from its caller
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub store: &'a dyn RowStore,
    pub transaction: Option<TransactionId>,
    pub variables: Option<&'a RoutineBinding>,
    pub cancel: &'a CancelFlag,
    pub max_recursion_iterations: usize,
}

impl<'a> ExecutionContext<'a> {
    #[must_use]
    pub fn new(store: &'a dyn RowStore, cancel: &'a CancelFlag, max_recursion_iterations: usize) -> Self {
        Self {
            store,
            transaction: None,
            variables: None,
            cancel,
            max_recursion_iterations,
        }
    }

    #[must_use]
    pub const fn in_transaction(mut self, transaction: Option<TransactionId>) -> Self {
        self.transaction = transaction;
        self
    }

    #[must_use]
    pub const fn with_variables(mut self, variables: Option<&'a RoutineBinding>) -> Self {
        self.variables = variables;
        self
    }
}
