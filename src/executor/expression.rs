/// Scalar expression evaluation
///
/// Evaluates expression trees (column references, literals, routine
/// variables, arithmetic, comparisons, LIKE, three-valued AND/OR/NOT and a
/// small set of scalar functions) against a row binding.

use std::cmp::Ordering;
use rust_decimal::RoundingStrategy;
use crate::core::{ColumnRef, DataType, DatabaseError, Row, Schema, Value};
use crate::routine::RoutineBinding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Concat,
    Like,
}

impl BinaryOp {
    const fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulo)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Value),
    /// Routine variable or parameter (`@TotalSales`)
    Variable(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Function {
        name: String,
        args: Vec<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
}

impl Expr {
    #[must_use]
    pub fn col(reference: &str) -> Self {
        Self::Column(ColumnRef::parse(reference))
    }

    #[must_use]
    pub fn lit(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    #[must_use]
    pub const fn int(value: i64) -> Self {
        Self::Literal(Value::Integer(value))
    }

    #[must_use]
    pub fn text(value: &str) -> Self {
        Self::Literal(Value::Text(value.to_string()))
    }

    #[must_use]
    pub const fn null() -> Self {
        Self::Literal(Value::Null)
    }

    #[must_use]
    pub fn var(name: &str) -> Self {
        Self::Variable(name.to_string())
    }

    #[must_use]
    pub fn func(name: &str, args: Vec<Self>) -> Self {
        Self::Function {
            name: name.to_string(),
            args,
        }
    }

    #[must_use]
    pub fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn unary(op: UnaryOp, expr: Self) -> Self {
        Self::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    #[must_use]
    pub fn equals(self, other: Self) -> Self {
        Self::binary(BinaryOp::Eq, self, other)
    }

    #[must_use]
    pub fn not_equals(self, other: Self) -> Self {
        Self::binary(BinaryOp::NotEq, self, other)
    }

    #[must_use]
    pub fn gt(self, other: Self) -> Self {
        Self::binary(BinaryOp::Gt, self, other)
    }

    #[must_use]
    pub fn gt_eq(self, other: Self) -> Self {
        Self::binary(BinaryOp::GtEq, self, other)
    }

    #[must_use]
    pub fn lt(self, other: Self) -> Self {
        Self::binary(BinaryOp::Lt, self, other)
    }

    #[must_use]
    pub fn lt_eq(self, other: Self) -> Self {
        Self::binary(BinaryOp::LtEq, self, other)
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::binary(BinaryOp::And, self, other)
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::binary(BinaryOp::Or, self, other)
    }

    #[must_use]
    pub fn plus(self, other: Self) -> Self {
        Self::binary(BinaryOp::Add, self, other)
    }

    #[must_use]
    pub fn minus(self, other: Self) -> Self {
        Self::binary(BinaryOp::Subtract, self, other)
    }

    #[must_use]
    pub fn times(self, other: Self) -> Self {
        Self::binary(BinaryOp::Multiply, self, other)
    }

    #[must_use]
    pub fn like(self, pattern: &str) -> Self {
        Self::binary(BinaryOp::Like, self, Self::text(pattern))
    }

    #[must_use]
    pub fn is_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    #[must_use]
    pub fn is_not_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    /// Output column name when this expression is projected without alias
    #[must_use]
    pub fn output_name(&self) -> String {
        match self {
            Self::Column(reference) => reference.name.clone(),
            Self::Variable(name) => name.trim_start_matches('@').to_string(),
            Self::Function { name, .. } => name.to_ascii_lowercase(),
            _ => "?column?".to_string(),
        }
    }

    /// Replaces routine variables with their current values so the
    /// expression can be evaluated where no routine scope exists
    pub fn bind_variables(&self, variables: Option<&RoutineBinding>) -> Result<Self, DatabaseError> {
        Ok(match self {
            Self::Variable(name) => {
                let value = variables
                    .and_then(|vars| vars.get(name))
                    .ok_or_else(|| DatabaseError::UnboundReference(name.clone()))?;
                Self::Literal(value.clone())
            }
            Self::Column(_) | Self::Literal(_) => self.clone(),
            Self::Binary { op, left, right } => Self::Binary {
                op: *op,
                left: Box::new(left.bind_variables(variables)?),
                right: Box::new(right.bind_variables(variables)?),
            },
            Self::Unary { op, expr } => Self::Unary {
                op: *op,
                expr: Box::new(expr.bind_variables(variables)?),
            },
            Self::Function { name, args } => Self::Function {
                name: name.clone(),
                args: args
                    .iter()
                    .map(|arg| arg.bind_variables(variables))
                    .collect::<Result<_, _>>()?,
            },
            Self::IsNull { expr, negated } => Self::IsNull {
                expr: Box::new(expr.bind_variables(variables)?),
                negated: *negated,
            },
        })
    }
}

static EMPTY_SCHEMA: Schema = Schema::empty();
static EMPTY_ROW: Row = Row::empty();

/// In-scope data for one evaluation: the current row and, inside a
/// routine body, the routine's variables
#[derive(Clone, Copy)]
pub struct RowBinding<'a> {
    pub schema: &'a Schema,
    pub row: &'a Row,
    pub variables: Option<&'a RoutineBinding>,
}

impl<'a> RowBinding<'a> {
    #[must_use]
    pub const fn new(schema: &'a Schema, row: &'a Row) -> Self {
        Self {
            schema,
            row,
            variables: None,
        }
    }

    #[must_use]
    pub const fn with_variables(mut self, variables: Option<&'a RoutineBinding>) -> Self {
        self.variables = variables;
        self
    }

    /// Binding with no current row (`SET @x = ...`)
    #[must_use]
    pub fn variables_only(variables: &'a RoutineBinding) -> Self {
        Self {
            schema: &EMPTY_SCHEMA,
            row: &EMPTY_ROW,
            variables: Some(variables),
        }
    }
}

pub struct ExpressionEvaluator;

impl ExpressionEvaluator {
    /// Evaluate expression against a row binding
    pub fn evaluate(expr: &Expr, binding: &RowBinding<'_>) -> Result<Value, DatabaseError> {
        match expr {
            Expr::Column(reference) => {
                let idx = binding.schema.resolve(reference)?;
                binding
                    .row
                    .get(idx)
                    .cloned()
                    .ok_or_else(|| DatabaseError::UnboundReference(reference.to_string()))
            }
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => binding
                .variables
                .and_then(|vars| vars.get(name))
                .cloned()
                .ok_or_else(|| DatabaseError::UnboundReference(name.clone())),
            Expr::Binary { op: BinaryOp::And, left, right } => {
                let left = Self::truth(&Self::evaluate(left, binding)?)?;
                if left == Some(false) {
                    return Ok(Value::Boolean(false));
                }
                let right = Self::truth(&Self::evaluate(right, binding)?)?;
                Ok(match (left, right) {
                    (_, Some(false)) => Value::Boolean(false),
                    (Some(true), Some(true)) => Value::Boolean(true),
                    _ => Value::Null,
                })
            }
            Expr::Binary { op: BinaryOp::Or, left, right } => {
                let left = Self::truth(&Self::evaluate(left, binding)?)?;
                if left == Some(true) {
                    return Ok(Value::Boolean(true));
                }
                let right = Self::truth(&Self::evaluate(right, binding)?)?;
                Ok(match (left, right) {
                    (_, Some(true)) => Value::Boolean(true),
                    (Some(false), Some(false)) => Value::Boolean(false),
                    _ => Value::Null,
                })
            }
            Expr::Binary { op, left, right } => {
                let left = Self::evaluate(left, binding)?;
                let right = Self::evaluate(right, binding)?;
                Self::apply_binary(*op, &left, &right)
            }
            Expr::Unary { op, expr } => {
                let value = Self::evaluate(expr, binding)?;
                Self::apply_unary(*op, &value)
            }
            Expr::Function { name, args } => Self::call_function(name, args, binding),
            Expr::IsNull { expr, negated } => {
                let value = Self::evaluate(expr, binding)?;
                Ok(Value::Boolean(value.is_null() != *negated))
            }
        }
    }

    /// WHERE/ON semantics: only TRUE passes, NULL behaves as false
    pub fn evaluate_predicate(expr: &Expr, binding: &RowBinding<'_>) -> Result<bool, DatabaseError> {
        let value = Self::evaluate(expr, binding)?;
        Ok(Self::truth(&value)? == Some(true))
    }

    /// Static result type of an expression over `schema`
    pub fn infer_type(
        expr: &Expr,
        schema: &Schema,
        variables: Option<&RoutineBinding>,
    ) -> Result<DataType, DatabaseError> {
        match expr {
            Expr::Column(reference) => Ok(schema.columns[schema.resolve(reference)?].data_type),
            Expr::Literal(value) => Ok(value.data_type()),
            Expr::Variable(name) => variables
                .and_then(|vars| vars.data_type(name))
                .ok_or_else(|| DatabaseError::UnboundReference(name.clone())),
            Expr::Binary { op, left, right } if op.is_arithmetic() => {
                let left = Self::infer_type(left, schema, variables)?;
                let right = Self::infer_type(right, schema, variables)?;
                match (left, right) {
                    (DataType::Integer | DataType::Unknown, DataType::Integer | DataType::Unknown) => {
                        Ok(DataType::Integer)
                    }
                    (l, r) if (l.is_numeric() || l == DataType::Unknown)
                        && (r.is_numeric() || r == DataType::Unknown) =>
                    {
                        Ok(DataType::Numeric)
                    }
                    (l, r) => Err(DatabaseError::TypeMismatch(format!(
                        "operator {op:?} is not defined for {l} and {r}"
                    ))),
                }
            }
            Expr::Binary { op: BinaryOp::Concat, .. } => Ok(DataType::Text),
            Expr::Binary { .. } | Expr::IsNull { .. } => Ok(DataType::Boolean),
            Expr::Unary { op: UnaryOp::Not, .. } => Ok(DataType::Boolean),
            Expr::Unary { op: UnaryOp::Negate, expr } => Self::infer_type(expr, schema, variables),
            Expr::Function { name, args } => {
                let arg_types = args
                    .iter()
                    .map(|arg| Self::infer_type(arg, schema, variables))
                    .collect::<Result<Vec<_>, _>>()?;
                match name.to_ascii_uppercase().as_str() {
                    "COALESCE" => arg_types
                        .iter()
                        .try_fold(DataType::Unknown, |acc, ty| acc.unify(*ty))
                        .ok_or_else(|| {
                            DatabaseError::TypeMismatch("COALESCE arguments have no common type".to_string())
                        }),
                    "NULLIF" | "ABS" | "ROUND" => Ok(arg_types.first().copied().unwrap_or(DataType::Unknown)),
                    "UPPER" | "LOWER" => Ok(DataType::Text),
                    "LENGTH" => Ok(DataType::Integer),
                    _ => Err(DatabaseError::UnknownFunction(name.clone())),
                }
            }
        }
    }

    /// Three-valued truth of a value: TRUE, FALSE or unknown
    fn truth(value: &Value) -> Result<Option<bool>, DatabaseError> {
        match value {
            Value::Boolean(b) => Ok(Some(*b)),
            Value::Null => Ok(None),
            other => Err(DatabaseError::TypeMismatch(format!(
                "expected BOOLEAN, got {} '{other}'",
                other.data_type()
            ))),
        }
    }

    fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, DatabaseError> {
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }

        match op {
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => {
                Self::arithmetic(op, left, right)
            }
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let Some(ordering) = left.compare(right)? else {
                    return Ok(Value::Null);
                };
                let result = match op {
                    BinaryOp::Eq => ordering == Ordering::Equal,
                    BinaryOp::NotEq => ordering != Ordering::Equal,
                    BinaryOp::Lt => ordering == Ordering::Less,
                    BinaryOp::LtEq => ordering != Ordering::Greater,
                    BinaryOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                };
                Ok(Value::Boolean(result))
            }
            BinaryOp::Concat => Ok(Value::Text(format!("{left}{right}"))),
            BinaryOp::Like => match (left, right) {
                (Value::Text(text), Value::Text(pattern)) => {
                    Ok(Value::Boolean(Self::like_pattern_match(text, pattern)))
                }
                _ => Err(DatabaseError::TypeMismatch(format!(
                    "LIKE expects TEXT operands, got {} and {}",
                    left.data_type(),
                    right.data_type()
                ))),
            },
            // Handled with short-circuiting in evaluate()
            BinaryOp::And | BinaryOp::Or => {
                let (l, r) = (Self::truth(left)?, Self::truth(right)?);
                Ok(Value::Boolean(if op == BinaryOp::And {
                    l == Some(true) && r == Some(true)
                } else {
                    l == Some(true) || r == Some(true)
                }))
            }
        }
    }

    fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, DatabaseError> {
        if let (Value::Integer(a), Value::Integer(b)) = (left, right) {
            let (a, b) = (*a, *b);
            if matches!(op, BinaryOp::Divide | BinaryOp::Modulo) && b == 0 {
                return Err(DatabaseError::DivisionByZero);
            }
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Subtract => a.checked_sub(b),
                BinaryOp::Multiply => a.checked_mul(b),
                BinaryOp::Divide => a.checked_div(b),
                _ => a.checked_rem(b),
            };
            return result
                .map(Value::Integer)
                .ok_or_else(|| DatabaseError::NumericOverflow(format!("{a} {op:?} {b}")));
        }

        let (Some(a), Some(b)) = (left.to_decimal(), right.to_decimal()) else {
            return Err(DatabaseError::TypeMismatch(format!(
                "operator {op:?} is not defined for {} and {}",
                left.data_type(),
                right.data_type()
            )));
        };
        if matches!(op, BinaryOp::Divide | BinaryOp::Modulo) && b.is_zero() {
            return Err(DatabaseError::DivisionByZero);
        }
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Subtract => a.checked_sub(b),
            BinaryOp::Multiply => a.checked_mul(b),
            BinaryOp::Divide => a.checked_div(b),
            _ => a.checked_rem(b),
        };
        result
            .map(Value::Numeric)
            .ok_or_else(|| DatabaseError::NumericOverflow(format!("{a} {op:?} {b}")))
    }

    fn apply_unary(op: UnaryOp, value: &Value) -> Result<Value, DatabaseError> {
        match (op, value) {
            (_, Value::Null) => Ok(Value::Null),
            (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
            (UnaryOp::Negate, Value::Integer(i)) => i
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| DatabaseError::NumericOverflow(format!("-({i})"))),
            (UnaryOp::Negate, Value::Numeric(d)) => Ok(Value::Numeric(-*d)),
            (op, other) => Err(DatabaseError::TypeMismatch(format!(
                "operator {op:?} is not defined for {}",
                other.data_type()
            ))),
        }
    }

    fn call_function(name: &str, args: &[Expr], binding: &RowBinding<'_>) -> Result<Value, DatabaseError> {
        let upper = name.to_ascii_uppercase();

        // COALESCE evaluates lazily; everything else takes evaluated arguments
        if upper == "COALESCE" {
            if args.is_empty() {
                return Err(Self::arity(name, "at least 1"));
            }
            for arg in args {
                let value = Self::evaluate(arg, binding)?;
                if !value.is_null() {
                    return Ok(value);
                }
            }
            return Ok(Value::Null);
        }

        let values = args
            .iter()
            .map(|arg| Self::evaluate(arg, binding))
            .collect::<Result<Vec<_>, _>>()?;

        match (upper.as_str(), values.as_slice()) {
            ("NULLIF", [a, b]) => Ok(if a.compare(b)? == Some(Ordering::Equal) {
                Value::Null
            } else {
                a.clone()
            }),
            ("UPPER" | "LOWER" | "LENGTH" | "ABS", [Value::Null])
            | ("ROUND", [Value::Null] | [Value::Null, _] | [_, Value::Null]) => Ok(Value::Null),
            ("UPPER", [Value::Text(s)]) => Ok(Value::Text(s.to_uppercase())),
            ("LOWER", [Value::Text(s)]) => Ok(Value::Text(s.to_lowercase())),
            ("LENGTH", [Value::Text(s)]) => Ok(Value::Integer(s.chars().count() as i64)),
            ("ABS", [Value::Integer(i)]) => i
                .checked_abs()
                .map(Value::Integer)
                .ok_or_else(|| DatabaseError::NumericOverflow(format!("abs({i})"))),
            ("ABS", [Value::Numeric(d)]) => Ok(Value::Numeric(d.abs())),
            ("ROUND", [Value::Integer(i)] | [Value::Integer(i), Value::Integer(_)]) => Ok(Value::Integer(*i)),
            ("ROUND", [Value::Numeric(d)]) => Ok(Value::Numeric(
                d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
            )),
            ("ROUND", [Value::Numeric(d), Value::Integer(scale)]) => {
                let scale = u32::try_from(*scale).map_err(|_| {
                    DatabaseError::TypeMismatch(format!("ROUND scale must be non-negative, got {scale}"))
                })?;
                Ok(Value::Numeric(d.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)))
            }
            ("NULLIF", _) => Err(Self::arity(name, "2")),
            ("UPPER" | "LOWER" | "LENGTH" | "ABS" | "ROUND", [..]) if values.is_empty() || values.len() > 2 => {
                Err(Self::arity(name, "1"))
            }
            ("UPPER" | "LOWER" | "LENGTH" | "ABS" | "ROUND", _) => Err(DatabaseError::TypeMismatch(format!(
                "function {upper} is not defined for ({})",
                values.iter().map(|v| v.data_type().to_string()).collect::<Vec<_>>().join(", ")
            ))),
            _ => Err(DatabaseError::UnknownFunction(name.to_string())),
        }
    }

    fn arity(name: &str, expected: &str) -> DatabaseError {
        DatabaseError::TypeMismatch(format!("function {name} expects {expected} argument(s)"))
    }

    /// LIKE pattern matching
    /// % matches zero or more characters
    /// _ matches exactly one character
    ///
    /// Greedy two-pointer walk: on a mismatch, fall back to the last `%`
    /// and let it swallow one more character. Linear space, no recursion.
    fn like_pattern_match(text: &str, pattern: &str) -> bool {
        let text: Vec<char> = text.chars().collect();
        let pattern: Vec<char> = pattern.chars().collect();

        let (mut t, mut p) = (0, 0);
        // (pattern index after the last %, text index it is retried from)
        let mut backtrack: Option<(usize, usize)> = None;
        while t < text.len() {
            match pattern.get(p) {
                Some('%') => {
                    p += 1;
                    backtrack = Some((p, t));
                }
                Some(&c) if c == '_' || c == text[t] => {
                    p += 1;
                    t += 1;
                }
                _ => match backtrack {
                    Some((star_p, star_t)) => {
                        p = star_p;
                        t = star_t + 1;
                        backtrack = Some((star_p, t));
                    }
                    None => return false,
                },
            }
        }
        pattern[p..].iter().all(|&c| c == '%')
    }
}
