/// Window function execution
///
/// Aggregates (SUM, AVG, COUNT, MIN, MAX) over ROWS or RANGE frames plus
/// ROW_NUMBER(), RANK(), DENSE_RANK(), LAG(), LEAD() with PARTITION BY and
/// ORDER BY. Every output row is its input row with one computed column
/// appended; rows come out partition by partition in sort order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Range;
use crate::core::{Column, DataType, DatabaseError, Row, RowSet, Schema, Value};
use crate::routine::RoutineBinding;
use super::aggregate::{aggregate_values, AggregateFunction};
use super::context::CancelFlag;
use super::expression::{Expr, ExpressionEvaluator, RowBinding};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub expr: Expr,
    pub order: SortOrder,
}

impl SortKey {
    #[must_use]
    pub fn asc(expr: Expr) -> Self {
        Self { expr, order: SortOrder::Asc }
    }

    #[must_use]
    pub fn desc(expr: Expr) -> Self {
        Self { expr, order: SortOrder::Desc }
    }

    /// Compares precomputed key tuples. NULLs sort last ascending and
    /// first descending.
    #[must_use]
    pub fn compare_keys(keys: &[Self], a: &[Value], b: &[Value]) -> Ordering {
        for ((key, left), right) in keys.iter().zip(a).zip(b) {
            let cmp = left.sort_cmp(right);
            if cmp != Ordering::Equal {
                return if key.order == SortOrder::Asc { cmp } else { cmp.reverse() };
            }
        }
        Ordering::Equal
    }
}

/// One end of a window frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBound {
    PartitionStart,
    Preceding(usize),
    CurrentRow,
    Following(usize),
    PartitionEnd,
}

impl FrameBound {
    const fn rank(self) -> u8 {
        match self {
            Self::PartitionStart => 0,
            Self::Preceding(_) => 1,
            Self::CurrentRow => 2,
            Self::Following(_) => 3,
            Self::PartitionEnd => 4,
        }
    }

    const fn is_offset(self) -> bool {
        matches!(self, Self::Preceding(_) | Self::Following(_))
    }
}

/// ROWS counts physical rows; RANGE treats rows with equal sort keys
/// (peers) as one position, so CURRENT ROW covers the whole peer group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameUnits {
    Rows,
    #[default]
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFrame {
    pub units: FrameUnits,
    pub start: FrameBound,
    pub end: FrameBound,
}

impl WindowFrame {
    /// RANGE BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW, the frame an
    /// ORDER BY gets when none is given
    pub const RUNNING: Self = Self::range(FrameBound::PartitionStart, FrameBound::CurrentRow);

    /// ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW
    pub const ROWS_RUNNING: Self = Self::rows(FrameBound::PartitionStart, FrameBound::CurrentRow);

    #[must_use]
    pub const fn rows(start: FrameBound, end: FrameBound) -> Self {
        Self { units: FrameUnits::Rows, start, end }
    }

    #[must_use]
    pub const fn range(start: FrameBound, end: FrameBound) -> Self {
        Self { units: FrameUnits::Range, start, end }
    }

    #[must_use]
    pub const fn whole_partition() -> Self {
        Self::rows(FrameBound::PartitionStart, FrameBound::PartitionEnd)
    }

    /// Lower bound fixed at the partition start, upper bound at the
    /// current row (or its last peer)
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.start == FrameBound::PartitionStart && self.end == FrameBound::CurrentRow
    }

    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.start == FrameBound::PartitionEnd {
            return Err(DatabaseError::InvalidFrame(
                "frame start cannot be UNBOUNDED FOLLOWING".to_string(),
            ));
        }
        if self.end == FrameBound::PartitionStart {
            return Err(DatabaseError::InvalidFrame(
                "frame end cannot be UNBOUNDED PRECEDING".to_string(),
            ));
        }
        if self.start.rank() > self.end.rank() {
            return Err(DatabaseError::InvalidFrame(format!(
                "frame starting at {:?} cannot end at {:?}",
                self.start, self.end
            )));
        }
        if self.units == FrameUnits::Range && (self.start.is_offset() || self.end.is_offset()) {
            return Err(DatabaseError::InvalidFrame(
                "RANGE frames take only UNBOUNDED and CURRENT ROW bounds".to_string(),
            ));
        }
        Ok(())
    }

    /// Rows of a partition of `len` rows inside the frame of row `i`,
    /// where `peers` is the peer group holding `i`. Clamped to the
    /// partition; may be empty.
    #[must_use]
    pub fn resolve(&self, i: usize, peers: &Range<usize>, len: usize) -> Range<usize> {
        let by_peers = self.units == FrameUnits::Range;
        let lo = match self.start {
            FrameBound::PartitionStart => 0,
            FrameBound::Preceding(k) => i.saturating_sub(k),
            FrameBound::CurrentRow if by_peers => peers.start,
            FrameBound::CurrentRow => i,
            FrameBound::Following(k) => i.saturating_add(k),
            FrameBound::PartitionEnd => len,
        };
        let hi = match self.end {
            FrameBound::PartitionStart => 0,
            FrameBound::Preceding(k) => (i + 1).saturating_sub(k),
            FrameBound::CurrentRow if by_peers => peers.end,
            FrameBound::CurrentRow => i + 1,
            FrameBound::Following(k) => i.saturating_add(k).saturating_add(1),
            FrameBound::PartitionEnd => len,
        };
        let hi = hi.min(len);
        lo.min(hi)..hi
    }
}

impl Default for WindowFrame {
    fn default() -> Self {
        Self::RUNNING
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowSpec {
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<SortKey>,
    pub frame: WindowFrame,
}

impl WindowSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn partition_by(mut self, exprs: Vec<Expr>) -> Self {
        self.partition_by = exprs;
        self
    }

    #[must_use]
    pub fn order_by(mut self, keys: Vec<SortKey>) -> Self {
        self.order_by = keys;
        self
    }

    #[must_use]
    pub const fn frame(mut self, frame: WindowFrame) -> Self {
        self.frame = frame;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowFunction {
    Aggregate {
        function: AggregateFunction,
        argument: Option<Expr>,
    },
    RowNumber,
    Rank,
    DenseRank,
    Lag { expr: Expr, offset: usize },
    Lead { expr: Expr, offset: usize },
}

impl WindowFunction {
    #[must_use]
    pub const fn aggregate(function: AggregateFunction, argument: Expr) -> Self {
        Self::Aggregate {
            function,
            argument: Some(argument),
        }
    }

    #[must_use]
    pub const fn count_star() -> Self {
        Self::Aggregate {
            function: AggregateFunction::CountStar,
            argument: None,
        }
    }
}

pub struct WindowFunctionExecutor;

impl WindowFunctionExecutor {
    /// Execute window function on a row set, appending the result as
    /// column `alias`
    pub fn execute(
        input: &RowSet,
        function: &WindowFunction,
        spec: &WindowSpec,
        alias: &str,
        cancel: &CancelFlag,
        variables: Option<&RoutineBinding>,
    ) -> Result<RowSet, DatabaseError> {
        spec.frame.validate()?;
        let result_type = Self::output_type(function, &input.schema, variables)?;
        let schema = input.schema.appended(Column::new(alias, result_type));

        let partitions = Self::partition_rows(input, &spec.partition_by, variables)?;
        log::debug!("window {alias}: {} partition(s) over {} row(s)", partitions.len(), input.len());

        let mut rows = Vec::with_capacity(input.len());
        for partition in partitions {
            cancel.check()?;
            let (sorted, keys) = Self::sort_rows(input, partition, &spec.order_by, variables)?;
            let results = Self::compute(input, &sorted, &keys, function, spec, variables)?;
            for (idx, value) in sorted.into_iter().zip(results) {
                rows.push(input.rows[idx].extended(value));
            }
        }

        Ok(RowSet::new(schema, rows))
    }

    /// Type of the appended column
    pub fn output_type(
        function: &WindowFunction,
        schema: &Schema,
        variables: Option<&RoutineBinding>,
    ) -> Result<DataType, DatabaseError> {
        match function {
            WindowFunction::Aggregate { function, argument } => {
                let input = match argument {
                    Some(expr) => ExpressionEvaluator::infer_type(expr, schema, variables)?,
                    None => DataType::Unknown,
                };
                function.result_type(input)
            }
            WindowFunction::RowNumber | WindowFunction::Rank | WindowFunction::DenseRank => Ok(DataType::Integer),
            WindowFunction::Lag { expr, .. } | WindowFunction::Lead { expr, .. } => {
                ExpressionEvaluator::infer_type(expr, schema, variables)
            }
        }
    }

    /// Running aggregate with one accumulator. Each group in `groups`
    /// (consecutive, covering `values`) is fed whole before finalizing,
    /// and every row of the group gets that value.
    pub fn aggregate_incremental(
        function: AggregateFunction,
        values: &[Value],
        groups: &[Range<usize>],
    ) -> Result<Vec<Value>, DatabaseError> {
        let mut acc = function.init();
        let mut results = Vec::with_capacity(values.len());
        for group in groups {
            for value in &values[group.clone()] {
                acc.accumulate(value)?;
            }
            let total = acc.finalize()?;
            results.extend(std::iter::repeat_n(total, group.len()));
        }
        Ok(results)
    }

    /// Fresh accumulation over each row's frame
    pub fn aggregate_naive(
        function: AggregateFunction,
        values: &[Value],
        frame: &WindowFrame,
        groups: &[Range<usize>],
    ) -> Result<Vec<Value>, DatabaseError> {
        let mut results = Vec::with_capacity(values.len());
        for peers in groups {
            for i in peers.clone() {
                results.push(aggregate_values(function, &values[frame.resolve(i, peers, values.len())])?);
            }
        }
        Ok(results)
    }

    /// Splits sorted key tuples into runs of peers. Without ORDER BY every
    /// row is a peer of every other.
    #[must_use]
    pub fn peer_groups(keys: &[Vec<Value>], order_by: &[SortKey]) -> Vec<Range<usize>> {
        let mut groups = Vec::new();
        let mut start = 0;
        for i in 1..=keys.len() {
            if i == keys.len() || SortKey::compare_keys(order_by, &keys[i - 1], &keys[i]) != Ordering::Equal {
                groups.push(start..i);
                start = i;
            }
        }
        groups
    }

    /// Groups row indices by PARTITION BY values, partitions in order of
    /// first appearance, input order kept inside each
    fn partition_rows(
        input: &RowSet,
        partition_by: &[Expr],
        variables: Option<&RoutineBinding>,
    ) -> Result<Vec<Vec<usize>>, DatabaseError> {
        if partition_by.is_empty() {
            // No PARTITION BY = all rows in one partition
            return Ok(if input.is_empty() { Vec::new() } else { vec![(0..input.len()).collect()] });
        }

        let mut positions: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut partitions: Vec<Vec<usize>> = Vec::new();
        for (idx, row) in input.rows.iter().enumerate() {
            let key = Self::eval_all(partition_by, &input.schema, row, variables)?
                .iter()
                .map(Value::key_form)
                .collect();
            let slot = *positions.entry(key).or_insert_with(|| {
                partitions.push(Vec::new());
                partitions.len() - 1
            });
            partitions[slot].push(idx);
        }
        Ok(partitions)
    }

    /// Stable sort of one partition by ORDER BY; returns the sorted row
    /// indices with their sort keys
    fn sort_rows(
        input: &RowSet,
        partition: Vec<usize>,
        order_by: &[SortKey],
        variables: Option<&RoutineBinding>,
    ) -> Result<(Vec<usize>, Vec<Vec<Value>>), DatabaseError> {
        let exprs: Vec<Expr> = order_by.iter().map(|k| k.expr.clone()).collect();
        let mut keyed = partition
            .into_iter()
            .map(|idx| Ok((idx, Self::eval_all(&exprs, &input.schema, &input.rows[idx], variables)?)))
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        keyed.sort_by(|(_, a), (_, b)| SortKey::compare_keys(order_by, a, b));
        Ok(keyed.into_iter().unzip())
    }

    fn compute(
        input: &RowSet,
        sorted: &[usize],
        keys: &[Vec<Value>],
        function: &WindowFunction,
        spec: &WindowSpec,
        variables: Option<&RoutineBinding>,
    ) -> Result<Vec<Value>, DatabaseError> {
        let eval_column = |expr: &Expr| {
            sorted
                .iter()
                .map(|&idx| {
                    let binding = RowBinding::new(&input.schema, &input.rows[idx]).with_variables(variables);
                    ExpressionEvaluator::evaluate(expr, &binding)
                })
                .collect::<Result<Vec<_>, _>>()
        };

        match function {
            WindowFunction::Aggregate { function, argument } => {
                let values = match argument {
                    Some(expr) => eval_column(expr)?,
                    None => vec![Value::Null; sorted.len()],
                };
                let groups = match spec.frame.units {
                    FrameUnits::Range => Self::peer_groups(keys, &spec.order_by),
                    FrameUnits::Rows => (0..values.len()).map(|i| i..i + 1).collect(),
                };
                if spec.frame.is_running() {
                    Self::aggregate_incremental(*function, &values, &groups)
                } else {
                    Self::aggregate_naive(*function, &values, &spec.frame, &groups)
                }
            }
            WindowFunction::RowNumber => Ok(Self::compute_row_number(sorted.len())),
            WindowFunction::Rank => Ok(Self::compute_rank(keys, &spec.order_by, false)),
            WindowFunction::DenseRank => Ok(Self::compute_rank(keys, &spec.order_by, true)),
            WindowFunction::Lag { expr, offset } => {
                let values = eval_column(expr)?;
                Ok((0..values.len())
                    .map(|i| i.checked_sub(*offset).map_or(Value::Null, |j| values[j].clone()))
                    .collect())
            }
            WindowFunction::Lead { expr, offset } => {
                let values = eval_column(expr)?;
                Ok((0..values.len())
                    .map(|i| i.checked_add(*offset).and_then(|j| values.get(j)).cloned().unwrap_or(Value::Null))
                    .collect())
            }
        }
    }

    /// ROW_NUMBER() - sequential number within partition
    fn compute_row_number(len: usize) -> Vec<Value> {
        (1..=len).map(|n| Value::Integer(n as i64)).collect()
    }

    /// RANK() leaves gaps after ties, DENSE_RANK() does not
    fn compute_rank(keys: &[Vec<Value>], order_by: &[SortKey], dense: bool) -> Vec<Value> {
        let mut results = Vec::with_capacity(keys.len());
        let mut current_rank = 1;
        for (i, key) in keys.iter().enumerate() {
            if i > 0 && SortKey::compare_keys(order_by, &keys[i - 1], key) != Ordering::Equal {
                current_rank = if dense { current_rank + 1 } else { i as i64 + 1 };
            }
            results.push(Value::Integer(current_rank));
        }
        results
    }

    fn eval_all(
        exprs: &[Expr],
        schema: &Schema,
        row: &Row,
        variables: Option<&RoutineBinding>,
    ) -> Result<Vec<Value>, DatabaseError> {
        let binding = RowBinding::new(schema, row).with_variables(variables);
        exprs
            .iter()
            .map(|expr| ExpressionEvaluator::evaluate(expr, &binding))
            .collect()
    }
}
