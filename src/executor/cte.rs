/// WITH clause binding
///
/// Each CTE is evaluated once per statement and materialized behind an
/// `Arc`; every reference in the statement reads that same snapshot.
/// Recursive CTEs go through the fixpoint evaluator with the self
/// reference bound to the previous iteration's rows.

use std::collections::HashMap;
use std::sync::Arc;
use crate::core::{Column, DatabaseError, RowSet, Schema};
use super::context::CancelFlag;
use super::plan::Plan;
use super::recursive::{FixpointEvaluator, SetCombinator};

#[derive(Debug, Clone, PartialEq)]
pub enum CteBody {
    Plain(Plan),
    Recursive {
        base: Plan,
        recursive: Plan,
        combinator: SetCombinator,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CteDefinition {
    pub name: String,
    /// Optional column alias list, `WITH t(a, b) AS ...`
    pub columns: Option<Vec<String>>,
    pub body: CteBody,
}

impl CteDefinition {
    #[must_use]
    pub fn plain(name: &str, plan: Plan) -> Self {
        Self {
            name: name.to_string(),
            columns: None,
            body: CteBody::Plain(plan),
        }
    }

    #[must_use]
    pub fn recursive(name: &str, base: Plan, recursive: Plan, combinator: SetCombinator) -> Self {
        Self {
            name: name.to_string(),
            columns: None,
            body: CteBody::Recursive {
                base,
                recursive,
                combinator,
            },
        }
    }

    #[must_use]
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(ToString::to_string).collect());
        self
    }
}

/// Materialized result of one CTE
#[derive(Debug, Clone)]
pub struct MaterializedView {
    pub name: String,
    rows: Arc<RowSet>,
}

impl MaterializedView {
    #[must_use]
    pub fn new(name: &str, rows: RowSet) -> Self {
        Self {
            name: name.to_string(),
            rows: Arc::new(rows),
        }
    }

    #[must_use]
    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    /// Rows as seen through a reference, columns qualified by the alias
    /// (or the CTE name)
    #[must_use]
    pub fn scan(&self, alias: Option<&str>) -> RowSet {
        RowSet::new(
            self.rows.schema.qualified(alias.unwrap_or(&self.name)),
            self.rows.rows.clone(),
        )
    }

    /// Whether two views share one materialization
    #[must_use]
    pub fn same_snapshot(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.rows, &other.rows)
    }
}

/// CTE names visible to a plan; inner WITH clauses shadow outer names
#[derive(Debug, Clone, Default)]
pub struct CteScope {
    views: HashMap<String, MaterializedView>,
}

impl CteScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Result<&MaterializedView, DatabaseError> {
        self.views
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| DatabaseError::CteNotFound(name.to_string()))
    }

    pub fn insert(&mut self, view: MaterializedView) {
        self.views.insert(view.name.to_ascii_lowercase(), view);
    }

    /// Copy of this scope with one more view
    #[must_use]
    pub fn with_view(&self, view: MaterializedView) -> Self {
        let mut scope = self.clone();
        scope.insert(view);
        scope
    }
}

pub struct CteBinder;

impl CteBinder {
    /// Evaluates a CTE definition and materializes it.
    ///
    /// `eval` runs a plan against a scope; the binder supplies the scope the
    /// CTE body sees (for recursive bodies, one that binds the CTE's own
    /// name to the working set).
    pub fn bind<F>(
        definition: &CteDefinition,
        scope: &CteScope,
        fixpoint: FixpointEvaluator,
        cancel: &CancelFlag,
        mut eval: F,
    ) -> Result<MaterializedView, DatabaseError>
    where
        F: FnMut(&Plan, &CteScope) -> Result<RowSet, DatabaseError>,
    {
        let rows = match &definition.body {
            CteBody::Plain(plan) => Self::rename(eval(plan, scope)?, definition)?,
            CteBody::Recursive {
                base,
                recursive,
                combinator,
            } => {
                let seed = Self::rename(eval(base, scope)?, definition)?;
                let result = fixpoint.evaluate(&definition.name, seed, *combinator, cancel, |working| {
                    let inner = scope.with_view(MaterializedView::new(&definition.name, working.clone()));
                    eval(recursive, &inner)
                })?;
                result.rows
            }
        };

        log::debug!("materialized CTE {} ({} rows)", definition.name, rows.len());
        Ok(MaterializedView::new(&definition.name, rows))
    }

    /// Applies the alias list and drops relation qualifiers from the body
    fn rename(rows: RowSet, definition: &CteDefinition) -> Result<RowSet, DatabaseError> {
        let RowSet { schema, rows } = rows;
        let names: Vec<String> = match &definition.columns {
            Some(names) if names.len() != schema.len() => {
                return Err(DatabaseError::SchemaMismatch(format!(
                    "CTE \"{}\" has {} columns available but {} columns specified",
                    definition.name,
                    schema.len(),
                    names.len()
                )));
            }
            Some(names) => names.clone(),
            None => schema.names(),
        };

        let columns = schema
            .columns
            .into_iter()
            .zip(names)
            .map(|(column, name)| Column {
                name,
                relation: None,
                ..column
            })
            .collect();
        Ok(RowSet::new(Schema::new(columns), rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, Row, Value};

    fn numbers() -> RowSet {
        RowSet::new(
            Schema::new(vec![Column::new("n", DataType::Integer)]).qualified("src"),
            vec![Row::new(vec![Value::Integer(1)]), Row::new(vec![Value::Integer(2)])],
        )
    }

    #[test]
    fn test_bind_plain_applies_alias_list() {
        let definition = CteDefinition::plain("t", Plan::scan("ignored")).with_columns(&["value"]);
        let view = CteBinder::bind(&definition, &CteScope::new(), FixpointEvaluator::new(10), &CancelFlag::new(), |_, _| {
            Ok(numbers())
        })
        .unwrap();

        let scanned = view.scan(Some("x"));
        assert_eq!(scanned.schema.columns[0].name, "value");
        assert_eq!(scanned.schema.columns[0].relation.as_deref(), Some("x"));
        assert_eq!(scanned.len(), 2);
    }

    #[test]
    fn test_alias_list_width_mismatch() {
        let definition = CteDefinition::plain("t", Plan::scan("ignored")).with_columns(&["a", "b"]);
        let err = CteBinder::bind(&definition, &CteScope::new(), FixpointEvaluator::new(10), &CancelFlag::new(), |_, _| {
            Ok(numbers())
        })
        .unwrap_err();
        assert!(matches!(err, DatabaseError::SchemaMismatch(_)));
    }

    #[test]
    fn test_lookup_and_shadowing() {
        let mut outer = CteScope::new();
        outer.insert(MaterializedView::new("T", numbers()));
        assert_eq!(outer.lookup("t").unwrap().rows().len(), 2);
        assert!(matches!(outer.lookup("missing"), Err(DatabaseError::CteNotFound(_))));

        let inner = outer.with_view(MaterializedView::new("t", RowSet::empty(Schema::empty())));
        assert!(inner.lookup("T").unwrap().rows().is_empty());
        assert_eq!(outer.lookup("T").unwrap().rows().len(), 2);
    }

    #[test]
    fn test_recursive_body_sees_working_set_by_name() {
        let definition = CteDefinition::recursive("c", Plan::scan("seed"), Plan::cte_ref("c"), SetCombinator::UnionAll);
        let mut calls = 0;
        let view = CteBinder::bind(&definition, &CteScope::new(), FixpointEvaluator::new(10), &CancelFlag::new(), |plan, scope| {
            calls += 1;
            match plan {
                Plan::Scan { .. } => Ok(numbers()),
                // stop after the first recursive step
                _ => {
                    let working = scope.lookup("c")?.rows().clone();
                    let next = working
                        .rows
                        .iter()
                        .filter_map(|r| r.values[0].as_int())
                        .filter(|n| *n < 3)
                        .map(|n| Row::new(vec![Value::Integer(n + 10)]))
                        .collect();
                    Ok(RowSet::new(working.schema, next))
                }
            }
        })
        .unwrap();

        let values: Vec<Value> = view.rows().rows.iter().map(|r| r.values[0].clone()).collect();
        assert_eq!(values, vec![Value::Integer(1), Value::Integer(2), Value::Integer(11), Value::Integer(12)]);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_views_share_snapshot() {
        let view = MaterializedView::new("t", numbers());
        let copy = view.clone();
        assert!(view.same_snapshot(&copy));
        assert!(!view.same_snapshot(&MaterializedView::new("t", numbers())));
    }
}
