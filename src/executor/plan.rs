/// Logical operator trees and statements handed to the executor
///
/// SQL text never reaches this crate; a front end (or test) builds these
/// nodes directly.

use super::aggregate::AggregateCall;
use super::cte::CteDefinition;
use super::expression::Expr;
use super::window::{SortKey, WindowFunction, WindowSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

/// One output column of a projection
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl ProjectItem {
    #[must_use]
    pub fn aliased(expr: Expr, alias: &str) -> Self {
        Self {
            expr,
            alias: Some(alias.to_string()),
        }
    }

    #[must_use]
    pub fn output_name(&self) -> String {
        self.alias.clone().unwrap_or_else(|| self.expr.output_name())
    }
}

impl From<Expr> for ProjectItem {
    fn from(expr: Expr) -> Self {
        Self { expr, alias: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Scan {
        table: String,
        alias: Option<String>,
    },
    /// Literal rows; column types are inferred from the expressions
    Values {
        columns: Vec<String>,
        rows: Vec<Vec<Expr>>,
    },
    CteRef {
        name: String,
        alias: Option<String>,
    },
    Filter {
        input: Box<Plan>,
        predicate: Expr,
    },
    Project {
        input: Box<Plan>,
        items: Vec<ProjectItem>,
    },
    Join {
        left: Box<Plan>,
        right: Box<Plan>,
        kind: JoinKind,
        on: Expr,
    },
    /// GROUP BY; with no grouping expressions the whole input is one group,
    /// even when empty
    Aggregate {
        input: Box<Plan>,
        group_by: Vec<Expr>,
        aggregates: Vec<AggregateCall>,
    },
    Window {
        input: Box<Plan>,
        function: WindowFunction,
        spec: WindowSpec,
        alias: String,
    },
    Sort {
        input: Box<Plan>,
        keys: Vec<SortKey>,
    },
    Limit {
        input: Box<Plan>,
        count: usize,
    },
    With {
        ctes: Vec<CteDefinition>,
        body: Box<Plan>,
    },
}

impl Plan {
    #[must_use]
    pub fn scan(table: &str) -> Self {
        Self::Scan {
            table: table.to_string(),
            alias: None,
        }
    }

    #[must_use]
    pub fn scan_as(table: &str, alias: &str) -> Self {
        Self::Scan {
            table: table.to_string(),
            alias: Some(alias.to_string()),
        }
    }

    #[must_use]
    pub fn values(columns: &[&str], rows: Vec<Vec<Expr>>) -> Self {
        Self::Values {
            columns: columns.iter().map(ToString::to_string).collect(),
            rows,
        }
    }

    #[must_use]
    pub fn cte_ref(name: &str) -> Self {
        Self::CteRef {
            name: name.to_string(),
            alias: None,
        }
    }

    #[must_use]
    pub fn cte_ref_as(name: &str, alias: &str) -> Self {
        Self::CteRef {
            name: name.to_string(),
            alias: Some(alias.to_string()),
        }
    }

    #[must_use]
    pub fn with(ctes: Vec<CteDefinition>, body: Self) -> Self {
        Self::With {
            ctes,
            body: Box::new(body),
        }
    }

    #[must_use]
    pub fn filter(self, predicate: Expr) -> Self {
        Self::Filter {
            input: Box::new(self),
            predicate,
        }
    }

    #[must_use]
    pub fn project(self, items: Vec<ProjectItem>) -> Self {
        Self::Project {
            input: Box::new(self),
            items,
        }
    }

    /// Projection of plain column references
    #[must_use]
    pub fn select(self, columns: &[&str]) -> Self {
        self.project(columns.iter().map(|c| ProjectItem::from(Expr::col(c))).collect())
    }

    #[must_use]
    pub fn join(self, right: Self, on: Expr) -> Self {
        Self::Join {
            left: Box::new(self),
            right: Box::new(right),
            kind: JoinKind::Inner,
            on,
        }
    }

    #[must_use]
    pub fn left_join(self, right: Self, on: Expr) -> Self {
        Self::Join {
            left: Box::new(self),
            right: Box::new(right),
            kind: JoinKind::Left,
            on,
        }
    }

    #[must_use]
    pub fn aggregate(self, group_by: Vec<Expr>, aggregates: Vec<AggregateCall>) -> Self {
        Self::Aggregate {
            input: Box::new(self),
            group_by,
            aggregates,
        }
    }

    #[must_use]
    pub fn window(self, function: WindowFunction, spec: WindowSpec, alias: &str) -> Self {
        Self::Window {
            input: Box::new(self),
            function,
            spec,
            alias: alias.to_string(),
        }
    }

    #[must_use]
    pub fn sort(self, keys: Vec<SortKey>) -> Self {
        Self::Sort {
            input: Box::new(self),
            keys,
        }
    }

    #[must_use]
    pub fn limit(self, count: usize) -> Self {
        Self::Limit {
            input: Box::new(self),
            count,
        }
    }
}

/// A single query or write
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Query(Plan),
    Insert {
        table: String,
        source: Plan,
    },
    Update {
        table: String,
        assignments: Vec<(String, Expr)>,
        filter: Option<Expr>,
    },
    Delete {
        table: String,
        filter: Option<Expr>,
    },
}

impl Statement {
    #[must_use]
    pub fn insert_values(table: &str, rows: Vec<Vec<Expr>>) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let columns: Vec<String> = (1..=width).map(|i| format!("column{i}")).collect();
        Self::Insert {
            table: table.to_string(),
            source: Plan::Values { columns, rows },
        }
    }

    #[must_use]
    pub fn update(table: &str, assignments: Vec<(&str, Expr)>, filter: Option<Expr>) -> Self {
        Self::Update {
            table: table.to_string(),
            assignments: assignments
                .into_iter()
                .map(|(column, expr)| (column.to_string(), expr))
                .collect(),
            filter,
        }
    }

    #[must_use]
    pub fn delete(table: &str, filter: Option<Expr>) -> Self {
        Self::Delete {
            table: table.to_string(),
            filter,
        }
    }

    /// Target table of a write, None for queries
    #[must_use]
    pub fn target_table(&self) -> Option<&str> {
        match self {
            Self::Query(_) => None,
            Self::Insert { table, .. } | Self::Update { table, .. } | Self::Delete { table, .. } => Some(table),
        }
    }
}
