// Routine module - stored procedures and functions

pub mod definition;
pub mod binding;
pub mod invoker;

pub use definition::{Parameter, RoutineDefinition, RoutineKind, RoutineStatement};
pub use binding::{BoundVariable, RoutineBinding};
pub use invoker::{RoutineInvoker, RoutineResult};
