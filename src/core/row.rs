use serde::{Deserialize, Serialize};
use super::column::{ColumnRef, Schema};
use super::error::DatabaseError;
use super::value::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self { values: Vec::new() }
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Copy of this row with one more trailing value (window output)
    #[must_use]
    pub fn extended(&self, value: Value) -> Self {
        let mut values = Vec::with_capacity(self.values.len() + 1);
        values.extend(self.values.iter().cloned());
        values.push(value);
        Self { values }
    }

    /// Left row followed by right row (join output)
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let mut values = self.values.clone();
        values.extend(other.values.iter().cloned());
        Self { values }
    }
}

/// Rows together with the schema they conform to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    pub schema: Schema,
    pub rows: Vec<Row>,
}

impl RowSet {
    #[must_use]
    pub const fn new(schema: Schema, rows: Vec<Row>) -> Self {
        Self { schema, rows }
    }

    #[must_use]
    pub const fn empty(schema: Schema) -> Self {
        Self { schema, rows: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of one column, in row order
    pub fn column(&self, name: &str) -> Result<Vec<Value>, DatabaseError> {
        let idx = self.schema.resolve(&ColumnRef::parse(name))?;
        Ok(self.rows.iter().map(|row| row.values[idx].clone()).collect())
    }

    /// First column of the first row, NULL when there is none
    #[must_use]
    pub fn scalar(&self) -> Value {
        self.rows
            .first()
            .and_then(|row| row.values.first())
            .cloned()
            .unwrap_or(Value::Null)
    }
}
