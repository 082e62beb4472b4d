use crate::core::DataType;
use crate::executor::{Expr, Plan, Statement};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutineKind {
    /// Yields the result set of its last query
    Procedure,
    /// Yields the value of `return_variable` when RETURN executes
    Function {
        return_variable: String,
        return_type: DataType,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutineStatement {
    Declare {
        name: String,
        data_type: DataType,
        default: Option<Expr>,
    },
    Set {
        variable: String,
        expr: Expr,
    },
    /// First column of the first row; NULL when the query returns nothing
    SelectInto {
        variable: String,
        query: Plan,
    },
    Execute(Statement),
    If {
        condition: Expr,
        then_branch: Vec<RoutineStatement>,
        else_branch: Vec<RoutineStatement>,
    },
    Return,
}

impl RoutineStatement {
    #[must_use]
    pub fn declare(name: &str, data_type: DataType, default: Option<Expr>) -> Self {
        Self::Declare {
            name: name.to_string(),
            data_type,
            default,
        }
    }

    #[must_use]
    pub fn set(variable: &str, expr: Expr) -> Self {
        Self::Set {
            variable: variable.to_string(),
            expr,
        }
    }

    #[must_use]
    pub fn select_into(variable: &str, query: Plan) -> Self {
        Self::SelectInto {
            variable: variable.to_string(),
            query,
        }
    }

    #[must_use]
    pub const fn query(plan: Plan) -> Self {
        Self::Execute(Statement::Query(plan))
    }

    #[must_use]
    pub fn if_then(condition: Expr, then_branch: Vec<Self>, else_branch: Vec<Self>) -> Self {
        Self::If {
            condition,
            then_branch,
            else_branch,
        }
    }
}

/// Stored procedure or function
#[derive(Debug, Clone, PartialEq)]
pub struct RoutineDefinition {
    pub name: String,
    pub kind: RoutineKind,
    pub parameters: Vec<Parameter>,
    pub body: Vec<RoutineStatement>,
}

impl RoutineDefinition {
    #[must_use]
    pub fn procedure(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: RoutineKind::Procedure,
            parameters: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn function(name: &str, return_variable: &str, return_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            kind: RoutineKind::Function {
                return_variable: return_variable.to_string(),
                return_type,
            },
            parameters: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, name: &str, data_type: DataType) -> Self {
        self.parameters.push(Parameter {
            name: name.to_string(),
            data_type,
        });
        self
    }

    #[must_use]
    pub fn body(mut self, body: Vec<RoutineStatement>) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub const fn is_function(&self) -> bool {
        matches!(self.kind, RoutineKind::Function { .. })
    }
}
