// postgrust-eval - query evaluation core extracted from PostgrustSQL
// Window aggregates, CTEs, recursive fixpoints, transactions, stored routines

// Clippy configuration - allow non-critical warnings for pet project
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::module_name_repetitions)]

// Core data model (values, schemas, rows, errors)
pub mod core;

// Plan execution (expressions, aggregates, windows, CTEs, fixpoints)
pub mod executor;

// Transaction management (id allocation, per-session coordinator)
pub mod transaction;

// Row store interface and in-memory store
pub mod storage;

// Stored procedures and functions
pub mod routine;

pub mod config;
pub mod session;
pub mod engine;

// Sample schema and queries for the demo driver
pub mod sample;

// Re-export commonly used types for convenience
pub use crate::core::{Column, ColumnRef, DataType, DatabaseError, Row, RowSet, Schema, Table, Value};
pub use crate::executor::{CancelFlag, Expr, Plan, QueryResult, Statement};
pub use crate::transaction::{GlobalTransactionManager, TransactionCoordinator, TransactionHandle};
pub use crate::storage::{Catalog, MemoryStore, Mutation, RowStore};
pub use crate::routine::{RoutineDefinition, RoutineResult, RoutineStatement};
pub use crate::config::EngineConfig;
pub use crate::session::Session;
pub use crate::engine::Engine;
