use serde::{Deserialize, Serialize};
use super::data_type::DataType;
use super::error::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    /// Table or alias the column was read through (`d` in `d.ParentID`)
    pub relation: Option<String>,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            relation: None,
        }
    }

    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    fn matches(&self, reference: &ColumnRef) -> bool {
        self.name.eq_ignore_ascii_case(&reference.name)
            && reference.relation.as_ref().is_none_or(|rel| {
                self.relation
                    .as_ref()
                    .is_some_and(|own| own.eq_ignore_ascii_case(rel))
            })
    }
}

/// Possibly qualified column reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub relation: Option<String>,
    pub name: String,
}

impl ColumnRef {
    /// Parses `name` or `relation.name`
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        match reference.split_once('.') {
            Some((relation, name)) => Self {
                relation: Some(relation.to_string()),
                name: name.to_string(),
            },
            None => Self {
                relation: None,
                name: reference.to_string(),
            },
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.relation {
            Some(relation) => write!(f, "{relation}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Ordered column list describing every row an operator produces
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    #[must_use]
    pub const fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self { columns: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of an unqualified column name
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Resolves a reference to exactly one column position
    pub fn resolve(&self, reference: &ColumnRef) -> Result<usize, DatabaseError> {
        let mut matches = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.matches(reference))
            .map(|(idx, _)| idx);

        match (matches.next(), matches.next()) {
            (Some(idx), None) => Ok(idx),
            (Some(_), Some(_)) => Err(DatabaseError::AmbiguousReference(reference.to_string())),
            (None, _) => Err(DatabaseError::UnboundReference(reference.to_string())),
        }
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Same columns re-qualified under a new relation name
    #[must_use]
    pub fn qualified(&self, relation: &str) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    relation: Some(relation.to_string()),
                    ..c.clone()
                })
                .collect(),
        }
    }

    /// Columns of `self` followed by columns of `other` (join output)
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        Self { columns }
    }

    #[must_use]
    pub fn appended(&self, column: Column) -> Self {
        let mut columns = self.columns.clone();
        columns.push(column);
        Self { columns }
    }

    /// Checks that rows of `other` can be read as rows of `self`
    pub fn check_compatible(&self, other: &Self, context: &str) -> Result<(), DatabaseError> {
        if self.len() != other.len() {
            return Err(DatabaseError::SchemaMismatch(format!(
                "{context}: expected {} columns, got {}",
                self.len(),
                other.len()
            )));
        }
        for (ours, theirs) in self.columns.iter().zip(&other.columns) {
            if !ours.data_type.accepts(theirs.data_type) {
                return Err(DatabaseError::SchemaMismatch(format!(
                    "{context}: column '{}' is {} but got {}",
                    ours.name, ours.data_type, theirs.data_type
                )));
            }
        }
        Ok(())
    }
}
