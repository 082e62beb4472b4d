// Transaction module - id allocation and per-session transaction brackets

mod global_manager;
mod coordinator;

pub use global_manager::{GlobalTransactionManager, TransactionId};
pub use coordinator::{TransactionCoordinator, TransactionHandle};
