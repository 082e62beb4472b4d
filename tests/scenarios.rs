// End-to-end runs over the sample schema

mod common;

use common::{ints, numeric, sample_engine, texts};
use postgrust_eval::sample::{
    audit_insert, department_hierarchy, product_total_sales, product_totals, running_totals, update_email,
};
use postgrust_eval::{DatabaseError, EngineConfig, Expr, Plan, RoutineResult, Value};

#[test]
fn test_department_hierarchy_levels() {
    let (_, engine) = sample_engine(EngineConfig::default());
    let rows = engine.session().execute_plan(&department_hierarchy(), None).unwrap();

    assert_eq!(rows.schema.names(), vec!["ID", "Name", "ParentID", "Level"]);
    assert_eq!(texts(&rows, "Name"), vec!["Exec", "Sales", "Sales-East"]);
    assert_eq!(ints(&rows, "Level"), vec![0, 1, 2]);
    assert_eq!(rows.column("ParentID").unwrap(), vec![Value::Null, Value::Integer(1), Value::Integer(2)]);
}

#[test]
fn test_running_total_per_product() {
    let (_, engine) = sample_engine(EngineConfig::default());
    let rows = engine.session().execute_plan(&running_totals(), None).unwrap();

    assert_eq!(ints(&rows, "ProductID"), vec![1, 1, 1, 2, 2]);
    assert_eq!(ints(&rows, "SaleMonth"), vec![1, 2, 3, 1, 2]);
    assert_eq!(
        rows.column("RunningTotal").unwrap(),
        vec![numeric(100), numeric(150), numeric(350), numeric(75), numeric(100)]
    );
}

#[test]
fn test_unsold_product_total_is_null() {
    let (_, engine) = sample_engine(EngineConfig::default());
    let mut session = engine.session();

    let rows = session.execute_plan(&product_totals(), None).unwrap();
    assert_eq!(texts(&rows, "Name"), vec!["Widget", "Gadget", "Gizmo"]);
    assert_eq!(
        rows.column("TotalSales").unwrap(),
        vec![numeric(350), numeric(100), Value::Null]
    );

    let function = product_total_sales();
    assert_eq!(
        session.invoke_routine(&function, &[Value::Integer(3)], None).unwrap(),
        RoutineResult::Scalar(Value::Null)
    );
    assert_eq!(
        session.invoke_routine(&function, &[Value::Integer(1)], None).unwrap(),
        RoutineResult::Scalar(numeric(350))
    );
}

#[test]
fn test_failed_audit_insert_keeps_update_staged() {
    let (store, engine) = sample_engine(EngineConfig::default());
    let mut session = engine.session();
    let emails = Plan::scan("CUSTOMER").filter(Expr::col("CustomerID").equals(Expr::int(1))).select(&["Email"]);

    let handle = session.begin().unwrap();
    let updated = session
        .execute(&update_email(Expr::int(1), Expr::text("alice@new.example.com")), Some(handle))
        .unwrap();
    assert_eq!(updated.rows_affected(), Some(1));

    let err = session
        .execute(&audit_insert(Expr::int(1), Expr::int(1), Expr::null()), Some(handle))
        .unwrap_err();
    assert!(matches!(err, DatabaseError::ExecutionError { transaction, .. } if transaction == handle.id()));
    assert!(matches!(err.root_cause(), DatabaseError::ConstraintViolation(_)));

    // still open, update still visible to its own transaction only
    assert!(session.in_transaction());
    assert!(store.has_staged_writes(handle.id()).unwrap());
    assert_eq!(
        session.execute_plan(&emails, Some(handle)).unwrap().scalar(),
        Value::from("alice@new.example.com")
    );
    assert_eq!(
        engine.session().execute_plan(&emails, None).unwrap().scalar(),
        Value::from("alice@example.com")
    );

    session.rollback(handle).unwrap();
    assert!(!session.in_transaction());
    assert_eq!(
        session.execute_plan(&emails, None).unwrap().scalar(),
        Value::from("alice@example.com")
    );
    assert!(session.execute_plan(&Plan::scan("CUSTOMER_AUDIT"), None).unwrap().is_empty());
}

#[test]
fn test_auto_rollback_discards_staged_update() {
    let config = EngineConfig {
        auto_rollback_on_error: true,
        ..EngineConfig::default()
    };
    let (store, engine) = sample_engine(config);
    let mut session = engine.session();

    let handle = session.begin().unwrap();
    session
        .execute(&update_email(Expr::int(1), Expr::text("alice@new.example.com")), Some(handle))
        .unwrap();
    session
        .execute(&audit_insert(Expr::int(1), Expr::int(1), Expr::null()), Some(handle))
        .unwrap_err();

    assert!(!session.in_transaction());
    assert!(!store.has_staged_writes(handle.id()).unwrap());
    assert!(matches!(session.commit(handle), Err(DatabaseError::UnknownTransaction(_))));
}
