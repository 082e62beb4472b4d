use crate::core::{DatabaseError, RowSet, Value};
use crate::executor::{CancelFlag, Plan, QueryResult, Statement};
use crate::routine::{RoutineDefinition, RoutineInvoker, RoutineResult};
use crate::transaction::{TransactionCoordinator, TransactionHandle};

/// One caller's connection to the engine
///
/// Owns the caller's transaction state; sessions are independent of each
/// other and may run on different threads against the same store.
pub struct Session {
    coordinator: TransactionCoordinator,
}

impl Session {
    pub(crate) const fn new(coordinator: TransactionCoordinator) -> Self {
        Self { coordinator }
    }

    pub fn execute_plan(&mut self, plan: &Plan, handle: Option<TransactionHandle>) -> Result<RowSet, DatabaseError> {
        self.coordinator.query_with(handle, plan, None)
    }

    pub fn execute(&mut self, statement: &Statement, handle: Option<TransactionHandle>) -> Result<QueryResult, DatabaseError> {
        self.coordinator.execute_with(handle, statement, None)
    }

    pub fn begin(&mut self) -> Result<TransactionHandle, DatabaseError> {
        self.coordinator.begin()
    }

    pub fn commit(&mut self, handle: TransactionHandle) -> Result<(), DatabaseError> {
        self.coordinator.commit(handle)
    }

    pub fn rollback(&mut self, handle: TransactionHandle) -> Result<(), DatabaseError> {
        self.coordinator.rollback(handle)
    }

    pub fn invoke_routine(
        &mut self,
        routine: &RoutineDefinition,
        args: &[Value],
        handle: Option<TransactionHandle>,
    ) -> Result<RoutineResult, DatabaseError> {
        RoutineInvoker::invoke(&mut self.coordinator, routine, args, handle)
    }

    /// Whether a transaction is open on this session
    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        self.coordinator.is_active()
    }

    /// Flag another thread can use to cancel this session's running work.
    /// Stays set until `reset_cancel`.
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.coordinator.cancel_flag().clone()
    }

    pub fn reset_cancel(&self) {
        self.coordinator.cancel_flag().reset();
    }
}
