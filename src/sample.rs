/// Sample schema and queries used by the `pgr_eval` driver and the
/// end-to-end tests
///
/// DEPARTMENT is a parent/child hierarchy, SALES holds monthly amounts per
/// PRODUCT, CUSTOMER and CUSTOMER_AUDIT back the transaction scenario.

use crate::core::{Column, DataType, DatabaseError, Row, Schema, Value};
use crate::executor::{
    AggregateCall, AggregateFunction, CteDefinition, Expr, Plan, ProjectItem, SetCombinator, SortKey, Statement,
    WindowFunction, WindowSpec,
};
use crate::routine::{RoutineDefinition, RoutineStatement};
use crate::storage::MemoryStore;

fn row(values: Vec<Value>) -> Row {
    Row::new(values)
}

/// Creates the sample tables and loads their rows
pub fn sample_store() -> Result<MemoryStore, DatabaseError> {
    let store = MemoryStore::new();

    store.create_table(
        "DEPARTMENT",
        Schema::new(vec![
            Column::new("ID", DataType::Integer).not_null(),
            Column::new("Name", DataType::Text).not_null(),
            Column::new("ParentID", DataType::Integer),
        ]),
    )?;
    store.load_rows(
        "DEPARTMENT",
        vec![
            row(vec![Value::Integer(1), "Exec".into(), Value::Null]),
            row(vec![Value::Integer(2), "Sales".into(), Value::Integer(1)]),
            row(vec![Value::Integer(3), "Sales-East".into(), Value::Integer(2)]),
        ],
    )?;

    store.create_table(
        "PRODUCT",
        Schema::new(vec![
            Column::new("ProductID", DataType::Integer).not_null(),
            Column::new("Name", DataType::Text).not_null(),
        ]),
    )?;
    store.load_rows(
        "PRODUCT",
        vec![
            row(vec![Value::Integer(1), "Widget".into()]),
            row(vec![Value::Integer(2), "Gadget".into()]),
            row(vec![Value::Integer(3), "Gizmo".into()]),
        ],
    )?;

    store.create_table(
        "SALES",
        Schema::new(vec![
            Column::new("SaleID", DataType::Integer).not_null(),
            Column::new("ProductID", DataType::Integer).not_null(),
            Column::new("SaleMonth", DataType::Integer).not_null(),
            Column::new("Amount", DataType::Numeric).not_null(),
        ]),
    )?;
    // loaded out of month order on purpose; windows sort by SaleMonth
    store.load_rows(
        "SALES",
        [(1, 1, 1, 100), (2, 2, 1, 75), (3, 1, 3, 200), (4, 1, 2, 50), (5, 2, 2, 25)]
            .into_iter()
            .map(|(id, product, month, amount)| {
                row(vec![
                    Value::Integer(id),
                    Value::Integer(product),
                    Value::Integer(month),
                    Value::Integer(amount),
                ])
            })
            .collect(),
    )?;

    store.create_table(
        "CUSTOMER",
        Schema::new(vec![
            Column::new("CustomerID", DataType::Integer).not_null(),
            Column::new("Name", DataType::Text).not_null(),
            Column::new("Email", DataType::Text),
        ]),
    )?;
    store.load_rows(
        "CUSTOMER",
        vec![
            row(vec![Value::Integer(1), "Alice".into(), "alice@example.com".into()]),
            row(vec![Value::Integer(2), "Bob".into(), Value::Null]),
        ],
    )?;

    store.create_table(
        "CUSTOMER_AUDIT",
        Schema::new(vec![
            Column::new("AuditID", DataType::Integer).not_null(),
            Column::new("CustomerID", DataType::Integer).not_null(),
            Column::new("Action", DataType::Text).not_null(),
        ]),
    )?;

    Ok(store)
}

/// WITH RECURSIVE Hierarchy over DEPARTMENT, ordered by (Level, Name)
#[must_use]
pub fn department_hierarchy() -> Plan {
    let base = Plan::scan("DEPARTMENT")
        .filter(Expr::col("ParentID").is_null())
        .project(vec![
            Expr::col("ID").into(),
            Expr::col("Name").into(),
            Expr::col("ParentID").into(),
            ProjectItem::aliased(Expr::int(0), "Level"),
        ]);
    let step = Plan::scan_as("DEPARTMENT", "d")
        .join(
            Plan::cte_ref_as("Hierarchy", "h"),
            Expr::col("d.ParentID").equals(Expr::col("h.ID")),
        )
        .project(vec![
            Expr::col("d.ID").into(),
            Expr::col("d.Name").into(),
            Expr::col("d.ParentID").into(),
            ProjectItem::aliased(Expr::col("h.Level").plus(Expr::int(1)), "Level"),
        ]);

    Plan::with(
        vec![CteDefinition::recursive("Hierarchy", base, step, SetCombinator::UnionAll)],
        Plan::cte_ref("Hierarchy").sort(vec![SortKey::asc(Expr::col("Level")), SortKey::asc(Expr::col("Name"))]),
    )
}

/// Running SUM(Amount) per product in month order
#[must_use]
pub fn running_totals() -> Plan {
    Plan::scan("SALES")
        .window(
            WindowFunction::aggregate(AggregateFunction::Sum, Expr::col("Amount")),
            WindowSpec::new()
                .partition_by(vec![Expr::col("ProductID")])
                .order_by(vec![SortKey::asc(Expr::col("SaleMonth"))]),
            "RunningTotal",
        )
        .select(&["ProductID", "SaleMonth", "Amount", "RunningTotal"])
        .sort(vec![SortKey::asc(Expr::col("ProductID")), SortKey::asc(Expr::col("SaleMonth"))])
}

/// Every product with its total sales; NULL for products never sold
#[must_use]
pub fn product_totals() -> Plan {
    let totals = CteDefinition::plain(
        "Totals",
        Plan::scan("SALES").aggregate(
            vec![Expr::col("ProductID")],
            vec![AggregateCall::new(AggregateFunction::Sum, Expr::col("Amount"), "Total")],
        ),
    );
    Plan::with(
        vec![totals],
        Plan::scan_as("PRODUCT", "p")
            .left_join(
                Plan::cte_ref_as("Totals", "t"),
                Expr::col("p.ProductID").equals(Expr::col("t.ProductID")),
            )
            .project(vec![
                Expr::col("p.ProductID").into(),
                Expr::col("p.Name").into(),
                ProjectItem::aliased(Expr::col("t.Total"), "TotalSales"),
            ]),
    )
}

/// GetProductTotalSales(@ProductID) RETURNS NUMERIC
#[must_use]
pub fn product_total_sales() -> RoutineDefinition {
    RoutineDefinition::function("GetProductTotalSales", "@TotalSales", DataType::Numeric)
        .param("@ProductID", DataType::Integer)
        .body(vec![
            RoutineStatement::declare("@TotalSales", DataType::Numeric, None),
            RoutineStatement::select_into(
                "@TotalSales",
                Plan::scan("SALES")
                    .filter(Expr::col("ProductID").equals(Expr::var("@ProductID")))
                    .aggregate(
                        Vec::new(),
                        vec![AggregateCall::new(AggregateFunction::Sum, Expr::col("Amount"), "Total")],
                    ),
            ),
            RoutineStatement::Return,
        ])
}

/// UpdateCustomerEmail(@AuditID, @CustomerID, @Email): updates the
/// customer, writes an audit row and returns the customer row
#[must_use]
pub fn update_customer_email() -> RoutineDefinition {
    RoutineDefinition::procedure("UpdateCustomerEmail")
        .param("@AuditID", DataType::Integer)
        .param("@CustomerID", DataType::Integer)
        .param("@Email", DataType::Text)
        .body(vec![
            RoutineStatement::Execute(update_email(Expr::var("@CustomerID"), Expr::var("@Email"))),
            RoutineStatement::Execute(audit_insert(
                Expr::var("@AuditID"),
                Expr::var("@CustomerID"),
                Expr::text("UPDATE"),
            )),
            RoutineStatement::query(
                Plan::scan("CUSTOMER").filter(Expr::col("CustomerID").equals(Expr::var("@CustomerID"))),
            ),
        ])
}

/// UPDATE CUSTOMER SET Email = email WHERE CustomerID = customer
#[must_use]
pub fn update_email(customer: Expr, email: Expr) -> Statement {
    Statement::update(
        "CUSTOMER",
        vec![("Email", email)],
        Some(Expr::col("CustomerID").equals(customer)),
    )
}

/// INSERT INTO CUSTOMER_AUDIT VALUES (audit_id, customer, action)
#[must_use]
pub fn audit_insert(audit_id: Expr, customer: Expr, action: Expr) -> Statement {
    Statement::insert_values("CUSTOMER_AUDIT", vec![vec![audit_id, customer, action]])
}
