/// Executor module - evaluates logical plans against a row store
///
/// Structure:
/// - expression: scalar expressions, three-valued logic
/// - aggregate: COUNT/SUM/AVG/MIN/MAX accumulators
/// - window: partitioned, ordered window functions over ROWS/RANGE frames
/// - cte: WITH binding and materialization
/// - recursive: fixpoint loop for recursive CTEs
/// - plan: operator trees and statements
/// - queries: plan/statement execution
/// - context: per-statement execution context, cancellation

pub mod expression;
pub mod aggregate;
pub mod window;
pub mod cte;
pub mod recursive;
pub mod plan;
pub mod queries;
pub mod context;

pub use expression::{BinaryOp, Expr, ExpressionEvaluator, RowBinding, UnaryOp};
pub use aggregate::{Accumulator, AggregateCall, AggregateFunction};
pub use window::{FrameBound, FrameUnits, SortKey, SortOrder, WindowFrame, WindowFunction, WindowFunctionExecutor, WindowSpec};
pub use cte::{CteBinder, CteBody, CteDefinition, CteScope, MaterializedView};
pub use recursive::{FixpointEvaluator, FixpointResult, FixpointState, SetCombinator};
pub use plan::{JoinKind, Plan, ProjectItem, Statement};
pub use queries::{PlanExecutor, QueryResult};
pub use context::{CancelFlag, ExecutionContext};
