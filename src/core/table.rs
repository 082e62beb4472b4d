use serde::{Deserialize, Serialize};
use super::column::Schema;
use super::error::DatabaseError;
use super::row::Row;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub schema: Schema,
    pub rows: Vec<Row>,
}

impl Table {
    #[must_use]
    pub const fn new(name: String, schema: Schema) -> Self {
        Self {
            name,
            schema,
            rows: Vec::new(),
        }
    }

    /// Checks width, NOT NULL and column types, coercing values in place
    pub fn conform(&self, row: Row) -> Result<Row, DatabaseError> {
        if row.values.len() != self.schema.len() {
            return Err(DatabaseError::ColumnCountMismatch {
                expected: self.schema.len(),
                found: row.values.len(),
            });
        }

        let values = row
            .values
            .iter()
            .zip(&self.schema.columns)
            .map(|(value, column)| {
                if value.is_null() && !column.nullable {
                    return Err(DatabaseError::ConstraintViolation(format!(
                        "null value in column \"{}\" of relation \"{}\" violates not-null constraint",
                        column.name, self.name
                    )));
                }
                value.coerce_to(&column.data_type)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Row::new(values))
    }

    pub fn insert(&mut self, row: Row) -> Result<(), DatabaseError> {
        let row = self.conform(row)?;
        self.rows.push(row);
        Ok(())
    }

    #[must_use]
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.schema.index_of(name)
    }
}
