/// Plan and statement execution
///
/// Walks a logical plan bottom-up, producing one fully materialized
/// `RowSet` per operator. Every operator fixes its output schema before any
/// row is produced.

use std::collections::HashMap;
use crate::core::{Column, DataType, DatabaseError, Row, RowSet, Schema, Value};
use crate::storage::Mutation;
use super::aggregate::{Accumulator, AggregateCall};
use super::context::ExecutionContext;
use super::cte::{CteBinder, CteScope};
use super::expression::{Expr, ExpressionEvaluator, RowBinding};
use super::plan::{JoinKind, Plan, ProjectItem, Statement};
use super::recursive::FixpointEvaluator;
use super::window::{SortKey, WindowFunctionExecutor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    Rows(RowSet),
    RowsAffected(usize),
}

impl QueryResult {
    /// Result rows; a write yields an empty set
    #[must_use]
    pub fn into_rows(self) -> RowSet {
        match self {
            Self::Rows(rows) => rows,
            Self::RowsAffected(_) => RowSet::default(),
        }
    }

    #[must_use]
    pub const fn rows_affected(&self) -> Option<usize> {
        match self {
            Self::Rows(_) => None,
            Self::RowsAffected(count) => Some(*count),
        }
    }
}

pub struct PlanExecutor;

impl PlanExecutor {
    /// Runs a query plan to completion
    pub fn execute_plan(plan: &Plan, ctx: &ExecutionContext<'_>) -> Result<RowSet, DatabaseError> {
        Self::run(plan, ctx, &CteScope::new())
    }

    /// Runs one statement. Writes are staged in `ctx.transaction` when set.
    pub fn execute(statement: &Statement, ctx: &ExecutionContext<'_>) -> Result<QueryResult, DatabaseError> {
        match statement {
            Statement::Query(plan) => Self::execute_plan(plan, ctx).map(QueryResult::Rows),
            Statement::Insert { table, source } => {
                let rows = Self::execute_plan(source, ctx)?;
                let count = ctx
                    .store
                    .apply_mutation(table, &Mutation::Insert(rows.rows), ctx.transaction)?;
                Ok(QueryResult::RowsAffected(count))
            }
            Statement::Update {
                table,
                assignments,
                filter,
            } => {
                let mutation = Mutation::Update {
                    filter: Self::bind_filter(filter.as_ref(), ctx)?,
                    assignments: assignments
                        .iter()
                        .map(|(column, expr)| Ok((column.clone(), expr.bind_variables(ctx.variables)?)))
                        .collect::<Result<_, DatabaseError>>()?,
                };
                let count = ctx.store.apply_mutation(table, &mutation, ctx.transaction)?;
                Ok(QueryResult::RowsAffected(count))
            }
            Statement::Delete { table, filter } => {
                let mutation = Mutation::Delete {
                    filter: Self::bind_filter(filter.as_ref(), ctx)?,
                };
                let count = ctx.store.apply_mutation(table, &mutation, ctx.transaction)?;
                Ok(QueryResult::RowsAffected(count))
            }
        }
    }

    fn bind_filter(filter: Option<&Expr>, ctx: &ExecutionContext<'_>) -> Result<Option<Expr>, DatabaseError> {
        filter.map(|expr| expr.bind_variables(ctx.variables)).transpose()
    }

    fn run(plan: &Plan, ctx: &ExecutionContext<'_>, scope: &CteScope) -> Result<RowSet, DatabaseError> {
        match plan {
            Plan::Scan { table, alias } => {
                let schema = ctx.store.schema_of(table)?.qualified(alias.as_deref().unwrap_or(table));
                let rows = ctx.store.fetch(table, None, ctx.transaction)?;
                Ok(RowSet::new(schema, rows))
            }
            Plan::Values { columns, rows } => Self::values(columns, rows, ctx),
            Plan::CteRef { name, alias } => Ok(scope.lookup(name)?.scan(alias.as_deref())),
            Plan::Filter { input, predicate } => {
                let input = Self::run(input, ctx, scope)?;
                let mut rows = Vec::new();
                for row in input.rows {
                    let binding = RowBinding::new(&input.schema, &row).with_variables(ctx.variables);
                    if ExpressionEvaluator::evaluate_predicate(predicate, &binding)? {
                        rows.push(row);
                    }
                }
                Ok(RowSet::new(input.schema, rows))
            }
            Plan::Project { input, items } => {
                let input = Self::run(input, ctx, scope)?;
                Self::project(&input, items, ctx)
            }
            Plan::Join { left, right, kind, on } => {
                let left = Self::run(left, ctx, scope)?;
                let right = Self::run(right, ctx, scope)?;
                Self::nested_loop_join(&left, &right, *kind, on, ctx)
            }
            Plan::Aggregate {
                input,
                group_by,
                aggregates,
            } => {
                let input = Self::run(input, ctx, scope)?;
                Self::aggregate(&input, group_by, aggregates, ctx)
            }
            Plan::Window {
                input,
                function,
                spec,
                alias,
            } => {
                let input = Self::run(input, ctx, scope)?;
                WindowFunctionExecutor::execute(&input, function, spec, alias, ctx.cancel, ctx.variables)
            }
            Plan::Sort { input, keys } => {
                let input = Self::run(input, ctx, scope)?;
                Self::sort(input, keys, ctx)
            }
            Plan::Limit { input, count } => {
                let mut input = Self::run(input, ctx, scope)?;
                input.rows.truncate(*count);
                Ok(input)
            }
            Plan::With { ctes, body } => {
                let mut inner = scope.clone();
                let fixpoint = FixpointEvaluator::new(ctx.max_recursion_iterations);
                for definition in ctes {
                    let view = CteBinder::bind(definition, &inner, fixpoint, ctx.cancel, |plan, s| {
                        Self::run(plan, ctx, s)
                    })?;
                    inner.insert(view);
                }
                Self::run(body, ctx, &inner)
            }
        }
    }

    fn values(columns: &[String], rows: &[Vec<Expr>], ctx: &ExecutionContext<'_>) -> Result<RowSet, DatabaseError> {
        let empty_schema = Schema::empty();
        let empty_row = Row::empty();
        let binding = RowBinding::new(&empty_schema, &empty_row).with_variables(ctx.variables);

        let mut types = vec![DataType::Unknown; columns.len()];
        let mut out = Vec::with_capacity(rows.len());
        for exprs in rows {
            if exprs.len() != columns.len() {
                return Err(DatabaseError::ColumnCountMismatch {
                    expected: columns.len(),
                    found: exprs.len(),
                });
            }
            let values = exprs
                .iter()
                .map(|expr| ExpressionEvaluator::evaluate(expr, &binding))
                .collect::<Result<Vec<_>, _>>()?;
            for (ty, value) in types.iter_mut().zip(&values) {
                let current = *ty;
                *ty = current.unify(value.data_type()).ok_or_else(|| {
                    DatabaseError::TypeMismatch(format!("VALUES column mixes {current} and {}", value.data_type()))
                })?;
            }
            out.push(Row::new(values));
        }

        let schema = Schema::new(
            columns
                .iter()
                .zip(types)
                .map(|(name, ty)| Column::new(name.as_str(), ty))
                .collect(),
        );
        Ok(RowSet::new(schema, out))
    }

    fn project(input: &RowSet, items: &[ProjectItem], ctx: &ExecutionContext<'_>) -> Result<RowSet, DatabaseError> {
        let columns = items
            .iter()
            .map(|item| {
                let ty = ExpressionEvaluator::infer_type(&item.expr, &input.schema, ctx.variables)?;
                Ok(Column::new(item.output_name(), ty))
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        let rows = input
            .rows
            .iter()
            .map(|row| {
                let binding = RowBinding::new(&input.schema, row).with_variables(ctx.variables);
                items
                    .iter()
                    .map(|item| ExpressionEvaluator::evaluate(&item.expr, &binding))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Row::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RowSet::new(Schema::new(columns), rows))
    }

    fn nested_loop_join(
        left: &RowSet,
        right: &RowSet,
        kind: JoinKind,
        on: &Expr,
        ctx: &ExecutionContext<'_>,
    ) -> Result<RowSet, DatabaseError> {
        let right_schema = match kind {
            JoinKind::Inner => right.schema.clone(),
            // right side may be padded with NULLs
            JoinKind::Left => Schema::new(
                right
                    .schema
                    .columns
                    .iter()
                    .map(|c| Column { nullable: true, ..c.clone() })
                    .collect(),
            ),
        };
        let schema = left.schema.join(&right_schema);
        let null_right = Row::new(vec![Value::Null; right.schema.len()]);

        let mut rows = Vec::new();
        for l in &left.rows {
            let mut matched = false;
            for r in &right.rows {
                let joined = l.concat(r);
                let binding = RowBinding::new(&schema, &joined).with_variables(ctx.variables);
                if ExpressionEvaluator::evaluate_predicate(on, &binding)? {
                    rows.push(joined);
                    matched = true;
                }
            }
            if !matched && kind == JoinKind::Left {
                rows.push(l.concat(&null_right));
            }
        }
        Ok(RowSet::new(schema, rows))
    }

    /// GROUP BY; groups come out in order of first appearance
    fn aggregate(
        input: &RowSet,
        group_by: &[Expr],
        aggregates: &[AggregateCall],
        ctx: &ExecutionContext<'_>,
    ) -> Result<RowSet, DatabaseError> {
        let mut columns = Vec::with_capacity(group_by.len() + aggregates.len());
        for expr in group_by {
            let ty = ExpressionEvaluator::infer_type(expr, &input.schema, ctx.variables)?;
            let mut column = Column::new(expr.output_name(), ty);
            if let Expr::Column(reference) = expr {
                column.relation.clone_from(&reference.relation);
            }
            columns.push(column);
        }
        for call in aggregates {
            let arg_type = match &call.argument {
                Some(expr) => ExpressionEvaluator::infer_type(expr, &input.schema, ctx.variables)?,
                None => DataType::Unknown,
            };
            columns.push(Column::new(call.alias.as_str(), call.function.result_type(arg_type)?));
        }

        let mut positions: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<Value>, Vec<Accumulator>)> = Vec::new();
        for row in &input.rows {
            let binding = RowBinding::new(&input.schema, row).with_variables(ctx.variables);
            let key = group_by
                .iter()
                .map(|expr| ExpressionEvaluator::evaluate(expr, &binding))
                .collect::<Result<Vec<_>, _>>()?;
            let hashed = key.iter().map(Value::key_form).collect();
            let slot = *positions.entry(hashed).or_insert_with(|| {
                groups.push((key, aggregates.iter().map(|call| call.function.init()).collect()));
                groups.len() - 1
            });
            for (call, acc) in aggregates.iter().zip(groups[slot].1.iter_mut()) {
                let value = match &call.argument {
                    Some(expr) => ExpressionEvaluator::evaluate(expr, &binding)?,
                    None => Value::Null,
                };
                acc.accumulate(&value)?;
            }
        }

        // Without GROUP BY an empty input still yields one row
        if groups.is_empty() && group_by.is_empty() {
            groups.push((Vec::new(), aggregates.iter().map(|call| call.function.init()).collect()));
        }

        let rows = groups
            .into_iter()
            .map(|(mut values, accs)| {
                for acc in &accs {
                    values.push(acc.finalize()?);
                }
                Ok(Row::new(values))
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        Ok(RowSet::new(Schema::new(columns), rows))
    }

    /// Stable sort by the given keys
    fn sort(input: RowSet, keys: &[SortKey], ctx: &ExecutionContext<'_>) -> Result<RowSet, DatabaseError> {
        let RowSet { schema, rows } = input;
        let mut keyed = rows
            .into_iter()
            .map(|row| {
                let binding = RowBinding::new(&schema, &row).with_variables(ctx.variables);
                let key = keys
                    .iter()
                    .map(|k| ExpressionEvaluator::evaluate(&k.expr, &binding))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((key, row))
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        keyed.sort_by(|(a, _), (b, _)| SortKey::compare_keys(keys, a, b));
        Ok(RowSet::new(schema, keyed.into_iter().map(|(_, row)| row).collect()))
    }
}
