mod common;

use common::{numeric, sample_engine};
use postgrust_eval::sample::{audit_insert, product_total_sales, update_customer_email, update_email};
use postgrust_eval::{
    DataType, DatabaseError, EngineConfig, Expr, Plan, RoutineDefinition, RoutineResult, RoutineStatement, Value,
};

fn customer_email(session: &mut postgrust_eval::Session, id: i64) -> Value {
    session
        .execute_plan(
            &Plan::scan("CUSTOMER")
                .filter(Expr::col("CustomerID").equals(Expr::int(id)))
                .select(&["Email"]),
            None,
        )
        .unwrap()
        .scalar()
}

/// Classify(@n) RETURNS TEXT with an IF/ELSE body
fn classify() -> RoutineDefinition {
    RoutineDefinition::function("Classify", "@label", DataType::Text)
        .param("@n", DataType::Integer)
        .body(vec![
            RoutineStatement::declare("@label", DataType::Text, None),
            RoutineStatement::if_then(
                Expr::var("@n").gt(Expr::int(100)),
                vec![RoutineStatement::set("@label", Expr::text("big")), RoutineStatement::Return],
                vec![RoutineStatement::set("@label", Expr::text("small"))],
            ),
            RoutineStatement::Return,
        ])
}

#[test]
fn test_function_returns_aggregate_or_null() {
    let (_, engine) = sample_engine(EngineConfig::default());
    let mut session = engine.session();
    let function = product_total_sales();

    let totals: Vec<RoutineResult> = (1..=3)
        .map(|id| session.invoke_routine(&function, &[Value::Integer(id)], None).unwrap())
        .collect();
    assert_eq!(
        totals,
        vec![
            RoutineResult::Scalar(numeric(350)),
            RoutineResult::Scalar(numeric(100)),
            RoutineResult::Scalar(Value::Null),
        ]
    );
    assert!(!session.in_transaction());
}

#[test]
fn test_if_branches_and_early_return() {
    let (_, engine) = sample_engine(EngineConfig::default());
    let mut session = engine.session();

    assert_eq!(
        session.invoke_routine(&classify(), &[Value::Integer(500)], None).unwrap(),
        RoutineResult::Scalar("big".into())
    );
    assert_eq!(
        session.invoke_routine(&classify(), &[Value::Integer(5)], None).unwrap(),
        RoutineResult::Scalar("small".into())
    );
}

#[test]
fn test_declare_default_and_return_coercion() {
    let (_, engine) = sample_engine(EngineConfig::default());
    let double = RoutineDefinition::function("Double", "@result", DataType::Numeric)
        .param("@n", DataType::Integer)
        .body(vec![
            RoutineStatement::declare("@result", DataType::Integer, Some(Expr::var("@n").times(Expr::int(2)))),
            RoutineStatement::Return,
        ]);

    assert_eq!(
        engine.session().invoke_routine(&double, &[Value::Integer(21)], None).unwrap(),
        RoutineResult::Scalar(numeric(42))
    );
}

#[test]
fn test_function_without_return() {
    let (_, engine) = sample_engine(EngineConfig::default());
    let broken = RoutineDefinition::function("NoReturn", "@x", DataType::Integer)
        .body(vec![RoutineStatement::declare("@x", DataType::Integer, Some(Expr::int(1)))]);

    let err = engine.session().invoke_routine(&broken, &[], None).unwrap_err();
    assert!(matches!(err, DatabaseError::MissingReturnValue(name) if name == "NoReturn"));
}

#[test]
fn test_parameter_errors() {
    let (_, engine) = sample_engine(EngineConfig::default());
    let mut session = engine.session();
    let function = product_total_sales();

    let err = session.invoke_routine(&function, &[], None).unwrap_err();
    assert!(matches!(
        err,
        DatabaseError::ParameterTypeError { ref parameter, .. } if parameter == "@ProductID"
    ));

    let err = session.invoke_routine(&function, &["abc".into()], None).unwrap_err();
    assert!(matches!(err, DatabaseError::ParameterTypeError { .. }));
    assert!(!session.in_transaction());
}

#[test]
fn test_procedure_commits_its_implicit_transaction() {
    let (_, engine) = sample_engine(EngineConfig::default());
    let mut session = engine.session();
    let args = [Value::Integer(10), Value::Integer(2), "bob@example.com".into()];

    let RoutineResult::ResultSet(rows) = session.invoke_routine(&update_customer_email(), &args, None).unwrap() else {
        panic!("procedure should return its last query");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.column("Email").unwrap(), vec![Value::from("bob@example.com")]);

    assert!(!session.in_transaction());
    assert_eq!(customer_email(&mut session, 2), Value::from("bob@example.com"));
    let audit = session.execute_plan(&Plan::scan("CUSTOMER_AUDIT"), None).unwrap();
    assert_eq!(audit.column("AuditID").unwrap(), vec![Value::Integer(10)]);
}

#[test]
fn test_failing_procedure_rolls_back_implicit_transaction() {
    let (_, engine) = sample_engine(EngineConfig::default());
    let mut session = engine.session();
    let failing = RoutineDefinition::procedure("BrokenAudit")
        .param("@CustomerID", DataType::Integer)
        .body(vec![
            RoutineStatement::Execute(update_email(Expr::var("@CustomerID"), Expr::text("changed@example.com"))),
            RoutineStatement::Execute(audit_insert(Expr::int(1), Expr::var("@CustomerID"), Expr::null())),
        ]);

    let err = session.invoke_routine(&failing, &[Value::Integer(1)], None).unwrap_err();
    assert!(matches!(err.root_cause(), DatabaseError::ConstraintViolation(_)));
    assert!(!session.in_transaction());
    assert_eq!(customer_email(&mut session, 1), Value::from("alice@example.com"));
    assert_eq!(engine.transaction_manager().active_count().unwrap(), 0);
}

#[test]
fn test_procedure_inside_caller_transaction() {
    let (_, engine) = sample_engine(EngineConfig::default());
    let mut session = engine.session();
    let args = [Value::Integer(10), Value::Integer(1), "a@b.c".into()];

    let handle = session.begin().unwrap();
    session.invoke_routine(&update_customer_email(), &args, Some(handle)).unwrap();

    // still the caller's transaction; nothing visible outside yet
    assert!(session.in_transaction());
    assert_eq!(customer_email(&mut engine.session(), 1), Value::from("alice@example.com"));

    session.rollback(handle).unwrap();
    assert_eq!(customer_email(&mut session, 1), Value::from("alice@example.com"));
}
