/// Aggregate engine: COUNT, COUNT(*), SUM, AVG, MIN, MAX
///
/// Every function follows the same init / accumulate / merge / finalize
/// contract so GROUP BY and window frames can share one implementation.
/// Decimal inputs accumulate exactly; SUM and AVG over no non-null input
/// finalize to NULL.

use std::cmp::Ordering;
use rust_decimal::Decimal;
use crate::core::{DataType, DatabaseError, Value};
use super::expression::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    /// COUNT(*): counts rows, NULL or not
    CountStar,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    /// Fresh accumulator state
    #[must_use]
    pub const fn init(self) -> Accumulator {
        match self {
            Self::Count => Accumulator::Count { count: 0, count_nulls: false },
            Self::CountStar => Accumulator::Count { count: 0, count_nulls: true },
            Self::Sum => Accumulator::Sum(SumState::Empty),
            Self::Avg => Accumulator::Avg { sum: Decimal::ZERO, count: 0 },
            Self::Min => Accumulator::Min(None),
            Self::Max => Accumulator::Max(None),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Count | Self::CountStar => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Output type for an argument of type `input`
    pub fn result_type(self, input: DataType) -> Result<DataType, DatabaseError> {
        match self {
            Self::Count | Self::CountStar => Ok(DataType::Integer),
            Self::Sum => match input {
                DataType::Integer | DataType::Unknown => Ok(DataType::Integer),
                DataType::Numeric => Ok(DataType::Numeric),
                other => Err(DatabaseError::TypeMismatch(format!("sum({other}) is not defined"))),
            },
            Self::Avg => match input {
                DataType::Integer | DataType::Numeric | DataType::Unknown => Ok(DataType::Numeric),
                other => Err(DatabaseError::TypeMismatch(format!("avg({other}) is not defined"))),
            },
            Self::Min | Self::Max => Ok(input),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SumState {
    Empty,
    Integer(i64),
    Numeric(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accumulator {
    Count { count: i64, count_nulls: bool },
    Sum(SumState),
    Avg { sum: Decimal, count: i64 },
    Min(Option<Value>),
    Max(Option<Value>),
}

impl Accumulator {
    /// Fold one input value into the state
    pub fn accumulate(&mut self, value: &Value) -> Result<(), DatabaseError> {
        if let Self::Count { count, count_nulls } = self {
            if *count_nulls || !value.is_null() {
                *count += 1;
            }
            return Ok(());
        }
        if value.is_null() {
            return Ok(());
        }

        match self {
            Self::Count { .. } => {}
            Self::Sum(state) => Self::add_to_sum(state, value)?,
            Self::Avg { sum, count } => {
                let decimal = value.to_decimal().ok_or_else(|| {
                    DatabaseError::TypeMismatch(format!("avg({}) is not defined", value.data_type()))
                })?;
                *sum = sum
                    .checked_add(decimal)
                    .ok_or_else(|| DatabaseError::NumericOverflow("avg".to_string()))?;
                *count += 1;
            }
            Self::Min(current) => Self::keep_extreme(current, value, Ordering::Less)?,
            Self::Max(current) => Self::keep_extreme(current, value, Ordering::Greater)?,
        }
        Ok(())
    }

    /// Combine a partial state of the same function into this one
    pub fn merge(&mut self, other: &Self) -> Result<(), DatabaseError> {
        match (self, other) {
            (Self::Count { count, .. }, Self::Count { count: other, .. }) => *count += other,
            (Self::Sum(state), Self::Sum(other)) => match other {
                SumState::Empty => {}
                SumState::Integer(i) => Self::add_to_sum(state, &Value::Integer(*i))?,
                SumState::Numeric(d) => Self::add_to_sum(state, &Value::Numeric(*d))?,
            },
            (Self::Avg { sum, count }, Self::Avg { sum: other_sum, count: other_count }) => {
                *sum = sum
                    .checked_add(*other_sum)
                    .ok_or_else(|| DatabaseError::NumericOverflow("avg".to_string()))?;
                *count += other_count;
            }
            (Self::Min(current), Self::Min(other)) => {
                if let Some(value) = other {
                    Self::keep_extreme(current, value, Ordering::Less)?;
                }
            }
            (Self::Max(current), Self::Max(other)) => {
                if let Some(value) = other {
                    Self::keep_extreme(current, value, Ordering::Greater)?;
                }
            }
            (this, other) => {
                return Err(DatabaseError::TypeMismatch(format!(
                    "cannot merge {other:?} into {this:?}"
                )));
            }
        }
        Ok(())
    }

    /// Final value of the aggregate
    pub fn finalize(&self) -> Result<Value, DatabaseError> {
        Ok(match self {
            Self::Count { count, .. } => Value::Integer(*count),
            Self::Sum(SumState::Empty) | Self::Avg { count: 0, .. } => Value::Null,
            Self::Sum(SumState::Integer(i)) => Value::Integer(*i),
            Self::Sum(SumState::Numeric(d)) => Value::Numeric(*d),
            Self::Avg { sum, count } => Value::Numeric(
                sum.checked_div(Decimal::from(*count))
                    .ok_or_else(|| DatabaseError::NumericOverflow("avg".to_string()))?
                    .normalize(),
            ),
            Self::Min(value) | Self::Max(value) => value.clone().unwrap_or(Value::Null),
        })
    }

    fn add_to_sum(state: &mut SumState, value: &Value) -> Result<(), DatabaseError> {
        let overflow = || DatabaseError::NumericOverflow("sum".to_string());
        *state = match (&*state, value) {
            (SumState::Empty, Value::Integer(i)) => SumState::Integer(*i),
            (SumState::Integer(acc), Value::Integer(i)) => {
                SumState::Integer(acc.checked_add(*i).ok_or_else(overflow)?)
            }
            (SumState::Empty, Value::Numeric(d)) => SumState::Numeric(*d),
            (SumState::Integer(acc), Value::Numeric(d)) => {
                SumState::Numeric(Decimal::from(*acc).checked_add(*d).ok_or_else(overflow)?)
            }
            (SumState::Numeric(acc), Value::Integer(_) | Value::Numeric(_)) => {
                let decimal = value.to_decimal().ok_or_else(overflow)?;
                SumState::Numeric(acc.checked_add(decimal).ok_or_else(overflow)?)
            }
            (_, other) => {
                return Err(DatabaseError::TypeMismatch(format!(
                    "sum({}) is not defined",
                    other.data_type()
                )));
            }
        };
        Ok(())
    }

    fn keep_extreme(current: &mut Option<Value>, value: &Value, wanted: Ordering) -> Result<(), DatabaseError> {
        let replace = match current {
            None => true,
            Some(existing) => value.compare(existing)? == Some(wanted),
        };
        if replace {
            *current = Some(value.clone());
        }
        Ok(())
    }
}

/// One aggregate in a GROUP BY projection, e.g. `SUM(Amount) AS TotalSales`
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateCall {
    pub function: AggregateFunction,
    /// None only for COUNT(*)
    pub argument: Option<Expr>,
    pub alias: String,
}

impl AggregateCall {
    #[must_use]
    pub fn new(function: AggregateFunction, argument: Expr, alias: &str) -> Self {
        Self {
            function,
            argument: Some(argument),
            alias: alias.to_string(),
        }
    }

    #[must_use]
    pub fn count_star(alias: &str) -> Self {
        Self {
            function: AggregateFunction::CountStar,
            argument: None,
            alias: alias.to_string(),
        }
    }
}

/// Runs one function over a value sequence in order
pub fn aggregate_values<'a, I>(function: AggregateFunction, values: I) -> Result<Value, DatabaseError>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut acc = function.init();
    for value in values {
        acc.accumulate(value)?;
    }
    acc.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[Option<i64>]) -> Vec<Value> {
        values
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Integer))
            .collect()
    }

    #[test]
    fn test_count_skips_nulls_but_count_star_does_not() {
        let values = ints(&[Some(1), None, Some(3)]);
        assert_eq!(aggregate_values(AggregateFunction::Count, &values).unwrap(), Value::Integer(2));
        assert_eq!(aggregate_values(AggregateFunction::CountStar, &values).unwrap(), Value::Integer(3));
    }

    #[test]
    fn test_sum_and_avg_of_empty_input_are_null() {
        let empty: Vec<Value> = Vec::new();
        assert_eq!(aggregate_values(AggregateFunction::Sum, &empty).unwrap(), Value::Null);
        assert_eq!(aggregate_values(AggregateFunction::Avg, &empty).unwrap(), Value::Null);
        assert_eq!(aggregate_values(AggregateFunction::Count, &empty).unwrap(), Value::Integer(0));

        let all_null = ints(&[None, None]);
        assert_eq!(aggregate_values(AggregateFunction::Sum, &all_null).unwrap(), Value::Null);
        assert_eq!(aggregate_values(AggregateFunction::Min, &all_null).unwrap(), Value::Null);
    }

    #[test]
    fn test_sum_integers() {
        let values = ints(&[Some(100), Some(50), None, Some(200)]);
        assert_eq!(aggregate_values(AggregateFunction::Sum, &values).unwrap(), Value::Integer(350));
    }

    #[test]
    fn test_sum_decimals_is_exact() {
        let tenth = Value::Numeric(Decimal::new(1, 1));
        let values = vec![tenth.clone(), tenth.clone(), tenth];
        assert_eq!(
            aggregate_values(AggregateFunction::Sum, &values).unwrap(),
            Value::Numeric(Decimal::new(3, 1))
        );
    }

    #[test]
    fn test_sum_overflow() {
        let values = ints(&[Some(i64::MAX), Some(1)]);
        assert!(matches!(
            aggregate_values(AggregateFunction::Sum, &values),
            Err(DatabaseError::NumericOverflow(_))
        ));
    }

    #[test]
    fn test_avg_is_decimal() {
        let values = ints(&[Some(1), Some(2)]);
        assert_eq!(
            aggregate_values(AggregateFunction::Avg, &values).unwrap(),
            Value::Numeric(Decimal::new(15, 1))
        );
    }

    #[test]
    fn test_min_max() {
        let values = vec![
            Value::Text("pear".to_string()),
            Value::Null,
            Value::Text("apple".to_string()),
        ];
        assert_eq!(aggregate_values(AggregateFunction::Min, &values).unwrap(), Value::Text("apple".to_string()));
        assert_eq!(aggregate_values(AggregateFunction::Max, &values).unwrap(), Value::Text("pear".to_string()));
    }

    #[test]
    fn test_sum_rejects_text() {
        let values = vec![Value::Text("x".to_string())];
        assert!(matches!(
            aggregate_values(AggregateFunction::Sum, &values),
            Err(DatabaseError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_merge_partial_states() {
        for function in [
            AggregateFunction::Count,
            AggregateFunction::Sum,
            AggregateFunction::Avg,
            AggregateFunction::Min,
            AggregateFunction::Max,
        ] {
            let all = ints(&[Some(4), None, Some(9), Some(-2), Some(7)]);
            let (left, right) = all.split_at(2);

            let mut a = function.init();
            left.iter().try_for_each(|v| a.accumulate(v)).unwrap();
            let mut b = function.init();
            right.iter().try_for_each(|v| b.accumulate(v)).unwrap();
            a.merge(&b).unwrap();

            assert_eq!(a.finalize().unwrap(), aggregate_values(function, &all).unwrap(), "{function:?}");
        }
    }

    #[test]
    fn test_merge_mismatched_functions() {
        let mut sum = AggregateFunction::Sum.init();
        assert!(sum.merge(&AggregateFunction::Max.init()).is_err());
    }

    #[test]
    fn test_result_types() {
        assert_eq!(AggregateFunction::Sum.result_type(DataType::Integer).unwrap(), DataType::Integer);
        assert_eq!(AggregateFunction::Avg.result_type(DataType::Integer).unwrap(), DataType::Numeric);
        assert_eq!(AggregateFunction::Max.result_type(DataType::Text).unwrap(), DataType::Text);
        assert!(AggregateFunction::Sum.result_type(DataType::Text).is_err());
    }
}
