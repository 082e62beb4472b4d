/// Recursive CTE evaluation as a bounded fixpoint
///
/// The working set is seeded with the base term's rows. Each iteration
/// hands the step function only the rows the previous iteration produced;
/// whatever is new gets appended. Evaluation stops when an iteration adds
/// nothing or the iteration cap is hit.

use std::collections::HashSet;
use crate::core::{DatabaseError, Row, RowSet, Schema, Value};
use super::context::CancelFlag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCombinator {
    /// Drops rows equal to any row produced so far
    Union,
    /// Keeps duplicates
    UnionAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixpointState {
    Seeding,
    Expanding { iteration: usize },
    Converged { iterations: usize },
    LimitExceeded { iterations: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixpointResult {
    pub rows: RowSet,
    /// Number of recursive-term evaluations, including the final empty one
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct FixpointEvaluator {
    pub max_iterations: usize,
}

impl FixpointEvaluator {
    #[must_use]
    pub const fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    /// Runs `step` to a fixpoint starting from `seed`.
    ///
    /// `step` receives the rows of the previous iteration (the seed on the
    /// first call) and returns the recursive term's output for them.
    pub fn evaluate<F>(
        &self,
        name: &str,
        seed: RowSet,
        combinator: SetCombinator,
        cancel: &CancelFlag,
        mut step: F,
    ) -> Result<FixpointResult, DatabaseError>
    where
        F: FnMut(&RowSet) -> Result<RowSet, DatabaseError>,
    {
        let RowSet { mut schema, rows: mut seed_rows } = seed;
        let mut seen: HashSet<Row> = HashSet::new();
        let mut produced: Vec<Row> = Vec::new();
        let mut working: Vec<Row> = Vec::new();
        let context = format!("recursive term of \"{name}\"");

        let mut state = FixpointState::Seeding;
        loop {
            log::debug!("fixpoint {name}: {state:?}");
            state = match state {
                FixpointState::Seeding => {
                    working = Self::admit(std::mem::take(&mut seed_rows), combinator, &mut seen, &mut produced);
                    FixpointState::Expanding { iteration: 1 }
                }
                FixpointState::Expanding { iteration } => {
                    cancel.check()?;
                    if iteration > self.max_iterations {
                        FixpointState::LimitExceeded { iterations: iteration - 1 }
                    } else {
                        let input = RowSet::new(schema.clone(), std::mem::take(&mut working));
                        let output = step(&input)?;
                        schema.check_compatible(&output.schema, &context)?;
                        let rows = output
                            .rows
                            .into_iter()
                            .map(|row| Self::conform(&schema, row))
                            .collect::<Result<Vec<_>, _>>()?;
                        working = Self::admit(rows, combinator, &mut seen, &mut produced);

                        if working.is_empty() {
                            FixpointState::Converged { iterations: iteration }
                        } else {
                            FixpointState::Expanding { iteration: iteration + 1 }
                        }
                    }
                }
                FixpointState::Converged { iterations } => {
                    log::debug!("fixpoint {name}: {} row(s) after {iterations} iteration(s)", produced.len());
                    return Ok(FixpointResult {
                        rows: RowSet::new(std::mem::take(&mut schema), std::mem::take(&mut produced)),
                        iterations,
                    });
                }
                FixpointState::LimitExceeded { .. } => {
                    return Err(DatabaseError::RecursionLimitExceeded {
                        cte: name.to_string(),
                        limit: self.max_iterations,
                    });
                }
            };
        }
    }

    /// Appends the rows that count as new under `combinator` and returns
    /// them as the next working set
    fn admit(
        rows: Vec<Row>,
        combinator: SetCombinator,
        seen: &mut HashSet<Row>,
        produced: &mut Vec<Row>,
    ) -> Vec<Row> {
        let fresh: Vec<Row> = match combinator {
            SetCombinator::UnionAll => rows,
            SetCombinator::Union => rows.into_iter().filter(|row| seen.insert(row.clone())).collect(),
        };
        produced.extend(fresh.iter().cloned());
        fresh
    }

    /// Recursive rows take the base term's column types
    fn conform(schema: &Schema, row: Row) -> Result<Row, DatabaseError> {
        let values = row
            .values
            .iter()
            .zip(&schema.columns)
            .map(|(value, column)| value.coerce_to(&column.data_type))
            .collect::<Result<Vec<Value>, _>>()?;
        Ok(Row::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType};

    fn numbers(values: &[i64]) -> RowSet {
        RowSet::new(
            Schema::new(vec![Column::new("n", DataType::Integer)]),
            values.iter().map(|v| Row::new(vec![Value::Integer(*v)])).collect(),
        )
    }

    fn firsts(set: &RowSet) -> Vec<i64> {
        set.rows.iter().filter_map(|r| r.values[0].as_int()).collect()
    }

    /// n -> n + 1 while n < limit
    fn counter(limit: i64) -> impl FnMut(&RowSet) -> Result<RowSet, DatabaseError> {
        move |working| {
            let next: Vec<i64> = firsts(working).into_iter().filter(|n| *n < limit).map(|n| n + 1).collect();
            Ok(numbers(&next))
        }
    }

    #[test]
    fn test_chain_of_depth_d_takes_d_plus_one_iterations() {
        let result = FixpointEvaluator::new(100)
            .evaluate("c", numbers(&[0]), SetCombinator::UnionAll, &CancelFlag::new(), counter(4))
            .unwrap();
        assert_eq!(firsts(&result.rows), vec![0, 1, 2, 3, 4]);
        assert_eq!(result.iterations, 5);
    }

    #[test]
    fn test_step_only_sees_previous_iteration() {
        let mut sizes = Vec::new();
        let step = |working: &RowSet| {
            sizes.push(working.len());
            counter(3)(working)
        };
        FixpointEvaluator::new(10)
            .evaluate("c", numbers(&[0, 10]), SetCombinator::UnionAll, &CancelFlag::new(), step)
            .unwrap();
        assert_eq!(sizes, vec![2, 1, 1, 1]);
    }

    #[test]
    fn test_union_dedups_and_union_all_keeps_duplicates() {
        // every row maps to 1; the seed already holds a 1
        let step = |working: &RowSet| Ok(numbers(&vec![1; working.len().min(2)]));

        let union = FixpointEvaluator::new(10)
            .evaluate("u", numbers(&[1, 2]), SetCombinator::Union, &CancelFlag::new(), step)
            .unwrap();
        assert_eq!(firsts(&union.rows), vec![1, 2]);
        assert_eq!(union.iterations, 1);

        let err = FixpointEvaluator::new(10)
            .evaluate("u", numbers(&[1, 2]), SetCombinator::UnionAll, &CancelFlag::new(), step)
            .unwrap_err();
        assert!(matches!(err, DatabaseError::RecursionLimitExceeded { limit: 10, .. }));
    }

    #[test]
    fn test_union_all_keeps_cross_iteration_duplicates() {
        // 2 -> 1 -> 0, and 1 again from the seed
        let step = |working: &RowSet| {
            let next: Vec<i64> = firsts(working).into_iter().filter(|n| *n > 0).map(|n| n - 1).collect();
            Ok(numbers(&next))
        };
        let result = FixpointEvaluator::new(10)
            .evaluate("d", numbers(&[2, 1]), SetCombinator::UnionAll, &CancelFlag::new(), step)
            .unwrap();
        assert_eq!(firsts(&result.rows), vec![2, 1, 1, 0, 0]);
    }

    #[test]
    fn test_limit_exceeded() {
        let err = FixpointEvaluator::new(3)
            .evaluate("loop", numbers(&[0]), SetCombinator::UnionAll, &CancelFlag::new(), counter(i64::MAX))
            .unwrap_err();
        match err {
            DatabaseError::RecursionLimitExceeded { cte, limit } => {
                assert_eq!(cte, "loop");
                assert_eq!(limit, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_exactly_at_limit_converges() {
        // depth 2 needs 3 evaluations
        let result = FixpointEvaluator::new(3)
            .evaluate("c", numbers(&[0]), SetCombinator::UnionAll, &CancelFlag::new(), counter(2))
            .unwrap();
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn test_schema_mismatch() {
        let step = |_: &RowSet| {
            Ok(RowSet::new(
                Schema::new(vec![Column::new("n", DataType::Text)]),
                vec![Row::new(vec![Value::Text("x".to_string())])],
            ))
        };
        let err = FixpointEvaluator::new(10)
            .evaluate("c", numbers(&[0]), SetCombinator::Union, &CancelFlag::new(), step)
            .unwrap_err();
        assert!(matches!(err, DatabaseError::SchemaMismatch(_)));
    }

    #[test]
    fn test_cancelled() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = FixpointEvaluator::new(10)
            .evaluate("c", numbers(&[0]), SetCombinator::Union, &cancel, counter(5))
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_empty_seed_converges_after_one_iteration() {
        let result = FixpointEvaluator::new(10)
            .evaluate("c", numbers(&[]), SetCombinator::Union, &CancelFlag::new(), counter(5))
            .unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.iterations, 1);
    }
}
