/// Row store adapter - the interface the evaluation core reads and writes
/// through
///
/// Physical layout, indexing and durability stay behind this trait. The
/// core only ever hands it fully bound expressions (no routine variables).

use crate::core::{DatabaseError, Row, Schema};
use crate::executor::expression::Expr;
use crate::transaction::TransactionId;

/// Table schema lookup
pub trait Catalog {
    fn schema_of(&self, table: &str) -> Result<Schema, DatabaseError>;
}

/// A single write statement, applied atomically
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Insert(Vec<Row>),
    Update {
        filter: Option<Expr>,
        assignments: Vec<(String, Expr)>,
    },
    Delete {
        filter: Option<Expr>,
    },
}

impl Mutation {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Insert(_) => "INSERT",
            Self::Update { .. } => "UPDATE",
            Self::Delete { .. } => "DELETE",
        }
    }
}

/// Trait for row storage operations
///
/// With `tx = Some(id)` reads see the transaction's staged writes and
/// writes are staged until `commit(id)`. With `tx = None` reads see only
/// committed state and writes apply immediately.
pub trait RowStore: Catalog + Send + Sync {
    /// Rows of `table` that satisfy `filter` (all rows when None)
    fn fetch(&self, table: &str, filter: Option<&Expr>, tx: Option<TransactionId>) -> Result<Vec<Row>, DatabaseError>;

    /// Applies one mutation, returning the number of affected rows.
    /// On error nothing of the mutation is applied.
    fn apply_mutation(&self, table: &str, mutation: &Mutation, tx: Option<TransactionId>) -> Result<usize, DatabaseError>;

    /// Makes every staged write of `tx` visible at once
    fn commit(&self, tx: TransactionId) -> Result<(), DatabaseError>;

    /// Discards every staged write of `tx`
    fn rollback(&self, tx: TransactionId) -> Result<(), DatabaseError>;
}
