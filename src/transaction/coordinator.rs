use std::sync::Arc;
use crate::config::EngineConfig;
use crate::core::{DatabaseError, RowSet};
use crate::executor::{CancelFlag, ExecutionContext, Plan, PlanExecutor, QueryResult, Statement};
use crate::routine::RoutineBinding;
use crate::storage::RowStore;
use super::global_manager::{GlobalTransactionManager, TransactionId};

/// Opaque handle to the coordinator's open transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHandle {
    id: TransactionId,
}

impl TransactionHandle {
    #[must_use]
    pub const fn id(&self) -> TransactionId {
        self.id
    }
}

/// Per-session transaction state
///
/// At most one transaction is open at a time. Writes under it are staged
/// in the row store until commit; rollback discards them.
pub struct TransactionCoordinator {
    store: Arc<dyn RowStore>,
    manager: GlobalTransactionManager,
    /// Current transaction ID (None if no active transaction)
    tx_id: Option<TransactionId>,
    auto_rollback_on_error: bool,
    max_recursion_iterations: usize,
    cancel: CancelFlag,
}

impl TransactionCoordinator {
    #[must_use]
    pub fn new(store: Arc<dyn RowStore>, manager: GlobalTransactionManager, config: &EngineConfig) -> Self {
        Self {
            store,
            manager,
            tx_id: None,
            auto_rollback_on_error: config.auto_rollback_on_error,
            max_recursion_iterations: config.max_recursion_iterations,
            cancel: CancelFlag::new(),
        }
    }

    /// Begins a new transaction
    pub fn begin(&mut self) -> Result<TransactionHandle, DatabaseError> {
        if let Some(open) = self.tx_id {
            return Err(DatabaseError::TransactionAlreadyOpen(open));
        }
        let id = self.manager.begin_transaction()?;
        self.tx_id = Some(id);
        log::info!("BEGIN (tx {id})");
        Ok(TransactionHandle { id })
    }

    /// Runs a statement inside the open transaction
    pub fn execute(&mut self, handle: TransactionHandle, statement: &Statement) -> Result<QueryResult, DatabaseError> {
        self.execute_with(Some(handle), statement, None)
    }

    /// Runs a statement under `handle`, or in autocommit mode when None.
    ///
    /// Inside a transaction a failure comes back as `ExecutionError`; staged
    /// effects of earlier statements stay until the caller rolls back
    /// unless `auto_rollback_on_error` is set.
    pub fn execute_with(
        &mut self,
        handle: Option<TransactionHandle>,
        statement: &Statement,
        variables: Option<&RoutineBinding>,
    ) -> Result<QueryResult, DatabaseError> {
        self.run_in(handle, variables, |ctx| PlanExecutor::execute(statement, ctx))
    }

    /// Runs a query plan, under `handle` when given
    pub fn query_with(
        &mut self,
        handle: Option<TransactionHandle>,
        plan: &Plan,
        variables: Option<&RoutineBinding>,
    ) -> Result<RowSet, DatabaseError> {
        self.run_in(handle, variables, |ctx| PlanExecutor::execute_plan(plan, ctx))
    }

    fn run_in<T, F>(
        &mut self,
        handle: Option<TransactionHandle>,
        variables: Option<&RoutineBinding>,
        run: F,
    ) -> Result<T, DatabaseError>
    where
        F: FnOnce(&ExecutionContext<'_>) -> Result<T, DatabaseError>,
    {
        let Some(handle) = handle else {
            return run(&self.context(None, variables));
        };

        let id = self.check_handle(handle)?;
        let outcome = run(&self.context(Some(id), variables));
        outcome.or_else(|error| {
            log::debug!("tx {id}: statement failed: {error}");
            if self.auto_rollback_on_error {
                log::warn!("tx {id}: rolling back after failed statement");
                self.rollback(handle)?;
            }
            Err(DatabaseError::ExecutionError {
                transaction: id,
                source: Box::new(error),
            })
        })
    }

    /// Commits the transaction, making all staged writes visible at once
    pub fn commit(&mut self, handle: TransactionHandle) -> Result<(), DatabaseError> {
        let id = self.check_handle(handle)?;
        self.tx_id = None;
        let applied = self.store.commit(id);
        self.manager.commit_transaction(id)?;
        applied?;
        log::info!("COMMIT (tx {id})");
        Ok(())
    }

    /// Rolls back the transaction, discarding all staged writes
    pub fn rollback(&mut self, handle: TransactionHandle) -> Result<(), DatabaseError> {
        let id = self.check_handle(handle)?;
        self.tx_id = None;
        let discarded = self.store.rollback(id);
        self.manager.rollback_transaction(id)?;
        discarded?;
        log::info!("ROLLBACK (tx {id})");
        Ok(())
    }

    /// Checks if there's an active transaction
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.tx_id.is_some()
    }

    #[must_use]
    pub const fn tx_id(&self) -> Option<TransactionId> {
        self.tx_id
    }

    #[must_use]
    pub const fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    fn check_handle(&self, handle: TransactionHandle) -> Result<TransactionId, DatabaseError> {
        match self.tx_id {
            Some(open) if open == handle.id => Ok(open),
            _ => Err(DatabaseError::UnknownTransaction(handle.id)),
        }
    }

    fn context<'a>(
        &'a self,
        transaction: Option<TransactionId>,
        variables: Option<&'a RoutineBinding>,
    ) -> ExecutionContext<'a> {
        ExecutionContext::new(self.store.as_ref(), &self.cancel, self.max_recursion_iterations)
            .in_transaction(transaction)
            .with_variables(variables)
    }
}

impl Drop for TransactionCoordinator {
    fn drop(&mut self) {
        if let Some(id) = self.tx_id.take() {
            log::warn!("tx {id}: session closed with open transaction, rolling back");
            if let Err(error) = self.store.rollback(id) {
                log::warn!("tx {id}: rollback failed: {error}");
            }
            if let Err(error) = self.manager.rollback_transaction(id) {
                log::warn!("tx {id}: could not unregister: {error}");
            }
        }
    }
}
