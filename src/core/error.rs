use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Table '{0}' not found")]
    TableNotFound(String),
    #[error("Table '{0}' already exists")]
    TableAlreadyExists(String),
    #[error("Column count mismatch: expected {expected}, got {found}")]
    ColumnCountMismatch { expected: usize, found: usize },
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    #[error("Unbound reference: '{0}'")]
    UnboundReference(String),
    #[error("Ambiguous reference: '{0}'")]
    AmbiguousReference(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Numeric overflow: {0}")]
    NumericOverflow(String),
    #[error("Invalid window frame: {0}")]
    InvalidFrame(String),
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("CTE '{0}' not found")]
    CteNotFound(String),
    #[error("Recursive query \"{cte}\" exceeded {limit} iterations")]
    RecursionLimitExceeded { cte: String, limit: usize },
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Transaction {0} is already open")]
    TransactionAlreadyOpen(u64),
    #[error("Transaction {0} is not open on this session")]
    UnknownTransaction(u64),
    #[error("Statement failed inside transaction {transaction}: {source}")]
    ExecutionError {
        transaction: u64,
        #[source]
        source: Box<DatabaseError>,
    },
    #[error("Routine '{routine}': parameter {parameter}: {message}")]
    ParameterTypeError {
        routine: String,
        parameter: String,
        message: String,
    },
    #[error("Function '{0}' finished without reaching RETURN")]
    MissingReturnValue(String),
    #[error("Evaluation cancelled")]
    Cancelled,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl DatabaseError {
    /// Cancellation is a terminal outcome, not a fault in the plan.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Unwraps `ExecutionError` layers down to the statement's own failure.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::ExecutionError { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<config::ConfigError> for DatabaseError {
    fn from(error: config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for DatabaseError {
    fn from(error: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned(error.to_string())
    }
}
