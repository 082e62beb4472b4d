/// Stored routine invocation
///
/// Binds actual parameters, runs the body statement by statement against a
/// transaction coordinator and produces a result set (procedures) or a
/// scalar (functions). Routine variables travel with every statement so
/// plans and DML inside the body can read them.

use crate::core::{DatabaseError, RowSet, Value};
use crate::executor::{ExpressionEvaluator, QueryResult, RowBinding};
use crate::transaction::{TransactionCoordinator, TransactionHandle};
use super::binding::RoutineBinding;
use super::definition::{RoutineDefinition, RoutineKind, RoutineStatement};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutineResult {
    ResultSet(RowSet),
    Scalar(Value),
    Empty,
}

/// Whether a block ran to its end or hit RETURN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Return,
}

pub struct RoutineInvoker;

impl RoutineInvoker {
    /// Invokes `definition` with `args`.
    ///
    /// With a handle the routine's writes are staged in that transaction.
    /// Without one the invocation gets its own transaction, committed on
    /// success and rolled back on any failure.
    pub fn invoke(
        coordinator: &mut TransactionCoordinator,
        definition: &RoutineDefinition,
        args: &[Value],
        handle: Option<TransactionHandle>,
    ) -> Result<RoutineResult, DatabaseError> {
        if let Some(handle) = handle {
            return Self::run(coordinator, definition, args, handle);
        }

        let implicit = coordinator.begin()?;
        log::debug!("routine {}: implicit transaction {}", definition.name, implicit.id());
        match Self::run(coordinator, definition, args, implicit) {
            Ok(result) => {
                coordinator.commit(implicit)?;
                Ok(result)
            }
            Err(error) => {
                // auto-rollback may already have closed it
                if coordinator.tx_id() == Some(implicit.id()) {
                    log::warn!("routine {}: rolling back implicit transaction", definition.name);
                    coordinator.rollback(implicit)?;
                }
                Err(error)
            }
        }
    }

    fn run(
        coordinator: &mut TransactionCoordinator,
        definition: &RoutineDefinition,
        args: &[Value],
        handle: TransactionHandle,
    ) -> Result<RoutineResult, DatabaseError> {
        let mut binding = RoutineBinding::bind(definition, args)?;
        let mut last_result = None;
        let flow = Self::execute_block(coordinator, &definition.body, &mut binding, handle, &mut last_result)?;

        match &definition.kind {
            RoutineKind::Procedure => Ok(last_result.map_or(RoutineResult::Empty, RoutineResult::ResultSet)),
            RoutineKind::Function {
                return_variable,
                return_type,
            } => {
                if flow != Flow::Return {
                    return Err(DatabaseError::MissingReturnValue(definition.name.clone()));
                }
                let value = binding
                    .get(return_variable)
                    .ok_or_else(|| DatabaseError::UnboundReference(return_variable.clone()))?;
                Ok(RoutineResult::Scalar(value.coerce_to(return_type)?))
            }
        }
    }

    fn execute_block(
        coordinator: &mut TransactionCoordinator,
        body: &[RoutineStatement],
        binding: &mut RoutineBinding,
        handle: TransactionHandle,
        last_result: &mut Option<RowSet>,
    ) -> Result<Flow, DatabaseError> {
        for statement in body {
            if Self::execute_statement(coordinator, statement, binding, handle, last_result)? == Flow::Return {
                return Ok(Flow::Return);
            }
        }
        Ok(Flow::Continue)
    }

    fn execute_statement(
        coordinator: &mut TransactionCoordinator,
        statement: &RoutineStatement,
        binding: &mut RoutineBinding,
        handle: TransactionHandle,
        last_result: &mut Option<RowSet>,
    ) -> Result<Flow, DatabaseError> {
        match statement {
            RoutineStatement::Declare {
                name,
                data_type,
                default,
            } => {
                let value = match default {
                    Some(expr) => ExpressionEvaluator::evaluate(expr, &RowBinding::variables_only(binding))?,
                    None => Value::Null,
                };
                binding.declare(name, *data_type, &value)?;
            }
            RoutineStatement::Set { variable, expr } => {
                let value = ExpressionEvaluator::evaluate(expr, &RowBinding::variables_only(binding))?;
                binding.assign(variable, &value)?;
            }
            RoutineStatement::SelectInto { variable, query } => {
                let rows = coordinator.query_with(Some(handle), query, Some(&*binding))?;
                binding.assign(variable, &rows.scalar())?;
            }
            RoutineStatement::Execute(statement) => {
                if let QueryResult::Rows(rows) = coordinator.execute_with(Some(handle), statement, Some(&*binding))? {
                    *last_result = Some(rows);
                }
            }
            RoutineStatement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let taken = ExpressionEvaluator::evaluate_predicate(condition, &RowBinding::variables_only(binding))?;
                let branch = if taken { then_branch } else { else_branch };
                return Self::execute_block(coordinator, branch, binding, handle, last_result);
            }
            RoutineStatement::Return => return Ok(Flow::Return),
        }
        Ok(Flow::Continue)
    }
}
