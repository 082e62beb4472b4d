/// In-memory row store with per-transaction staging
///
/// Committed tables sit behind an `RwLock`. A transaction's writes go to
/// private copies of the tables it touched plus an ordered mutation log;
/// commit replays the log onto the latest committed tables and swaps the
/// results in under one write lock, so other readers see all of it or none.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use crate::core::{DatabaseError, Row, Schema, Table};
use crate::executor::expression::{Expr, ExpressionEvaluator, RowBinding};
use crate::transaction::TransactionId;
use super::adapter::{Catalog, Mutation, RowStore};

#[derive(Debug, Default)]
struct StagedWrites {
    /// Tables as the transaction currently sees them
    tables: HashMap<String, Table>,
    /// Mutations in application order, replayed on commit
    log: Vec<(String, Mutation)>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    committed: RwLock<HashMap<String, Table>>,
    staged: Mutex<HashMap<TransactionId, StagedWrites>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&self, name: &str, schema: Schema) -> Result<(), DatabaseError> {
        let mut tables = self.committed.write()?;
        let key = Self::key(name);
        if tables.contains_key(&key) {
            return Err(DatabaseError::TableAlreadyExists(name.to_string()));
        }
        tables.insert(key, Table::new(name.to_string(), schema));
        Ok(())
    }

    /// Bulk load outside any transaction
    pub fn load_rows(&self, name: &str, rows: Vec<Row>) -> Result<usize, DatabaseError> {
        self.apply_mutation(name, &Mutation::Insert(rows), None)
    }

    pub fn table_names(&self) -> Result<Vec<String>, DatabaseError> {
        let tables = self.committed.read()?;
        let mut names: Vec<String> = tables.values().map(|t| t.name.clone()).collect();
        names.sort();
        Ok(names)
    }

    /// Whether `tx` has writes waiting for commit
    pub fn has_staged_writes(&self, tx: TransactionId) -> Result<bool, DatabaseError> {
        Ok(self
            .staged
            .lock()?
            .get(&tx)
            .is_some_and(|staged| !staged.log.is_empty()))
    }

    fn key(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    fn committed_table(&self, name: &str) -> Result<Table, DatabaseError> {
        self.committed
            .read()?
            .get(&Self::key(name))
            .cloned()
            .ok_or_else(|| DatabaseError::TableNotFound(name.to_string()))
    }

    /// Applies a mutation to `table` in place. Callers pass a scratch copy
    /// so a failure part way through leaves the original untouched.
    fn apply_to(table: &mut Table, mutation: &Mutation) -> Result<usize, DatabaseError> {
        match mutation {
            Mutation::Insert(rows) => {
                for row in rows {
                    table.insert(row.clone())?;
                }
                Ok(rows.len())
            }
            Mutation::Update { filter, assignments } => {
                let schema = table.schema.qualified(&table.name);
                let targets = assignments
                    .iter()
                    .map(|(column, expr)| {
                        table
                            .get_column_index(column)
                            .map(|idx| (idx, expr))
                            .ok_or_else(|| DatabaseError::UnboundReference(column.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                let mut updated = Vec::with_capacity(table.rows.len());
                let mut count = 0;
                for row in &table.rows {
                    if !Self::matches(filter.as_ref(), &schema, row)? {
                        updated.push(row.clone());
                        continue;
                    }
                    let binding = RowBinding::new(&schema, row);
                    let mut values = row.values.clone();
                    for (idx, expr) in &targets {
                        values[*idx] = ExpressionEvaluator::evaluate(expr, &binding)?;
                    }
                    updated.push(table.conform(Row::new(values))?);
                    count += 1;
                }
                table.rows = updated;
                Ok(count)
            }
            Mutation::Delete { filter } => {
                let schema = table.schema.qualified(&table.name);
                let mut kept = Vec::with_capacity(table.rows.len());
                for row in &table.rows {
                    if !Self::matches(filter.as_ref(), &schema, row)? {
                        kept.push(row.clone());
                    }
                }
                let count = table.rows.len() - kept.len();
                table.rows = kept;
                Ok(count)
            }
        }
    }

    fn matches(filter: Option<&Expr>, schema: &Schema, row: &Row) -> Result<bool, DatabaseError> {
        filter.map_or(Ok(true), |expr| {
            ExpressionEvaluator::evaluate_predicate(expr, &RowBinding::new(schema, row))
        })
    }
}

impl Catalog for MemoryStore {
    fn schema_of(&self, table: &str) -> Result<Schema, DatabaseError> {
        self.committed
            .read()?
            .get(&Self::key(table))
            .map(|t| t.schema.clone())
            .ok_or_else(|| DatabaseError::TableNotFound(table.to_string()))
    }
}

impl RowStore for MemoryStore {
    fn fetch(&self, table: &str, filter: Option<&Expr>, tx: Option<TransactionId>) -> Result<Vec<Row>, DatabaseError> {
        let staged_copy = match tx {
            Some(tx) => self
                .staged
                .lock()?
                .get(&tx)
                .and_then(|staged| staged.tables.get(&Self::key(table)).cloned()),
            None => None,
        };
        let source = match staged_copy {
            Some(table) => table,
            None => self.committed_table(table)?,
        };

        let schema = source.schema.qualified(&source.name);
        let mut rows = Vec::new();
        for row in source.rows {
            if Self::matches(filter, &schema, &row)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn apply_mutation(&self, table: &str, mutation: &Mutation, tx: Option<TransactionId>) -> Result<usize, DatabaseError> {
        let key = Self::key(table);
        match tx {
            None => {
                let mut tables = self.committed.write()?;
                let current = tables
                    .get(&key)
                    .ok_or_else(|| DatabaseError::TableNotFound(table.to_string()))?;
                let mut scratch = current.clone();
                let count = Self::apply_to(&mut scratch, mutation)?;
                tables.insert(key, scratch);
                Ok(count)
            }
            Some(tx) => {
                let mut staged = self.staged.lock()?;
                let writes = staged.entry(tx).or_default();
                let mut scratch = match writes.tables.get(&key) {
                    Some(table) => table.clone(),
                    None => self.committed_table(table)?,
                };
                let count = Self::apply_to(&mut scratch, mutation)?;
                writes.tables.insert(key.clone(), scratch);
                writes.log.push((key, mutation.clone()));
                log::debug!("tx {tx}: staged {} on {table} ({count} rows)", mutation.kind());
                Ok(count)
            }
        }
    }

    fn commit(&self, tx: TransactionId) -> Result<(), DatabaseError> {
        let Some(writes) = self.staged.lock()?.remove(&tx) else {
            return Ok(());
        };

        let mut tables = self.committed.write()?;
        let mut replayed: HashMap<String, Table> = HashMap::new();
        for (key, mutation) in &writes.log {
            if !replayed.contains_key(key) {
                let base = tables
                    .get(key)
                    .cloned()
                    .ok_or_else(|| DatabaseError::TableNotFound(key.clone()))?;
                replayed.insert(key.clone(), base);
            }
            if let Some(table) = replayed.get_mut(key) {
                Self::apply_to(table, mutation)?;
            }
        }
        let touched = replayed.len();
        tables.extend(replayed);
        log::debug!("tx {tx}: committed {} mutation(s) across {touched} table(s)", writes.log.len());
        Ok(())
    }

    fn rollback(&self, tx: TransactionId) -> Result<(), DatabaseError> {
        if let Some(writes) = self.staged.lock()?.remove(&tx) {
            log::debug!("tx {tx}: discarded {} staged mutation(s)", writes.log.len());
        }
        Ok(())
    }
}
