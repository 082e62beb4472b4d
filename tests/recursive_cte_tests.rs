mod common;

use common::{config_with_limit, edges_engine, ints, sample_engine};
use postgrust_eval::executor::{CteDefinition, ProjectItem, SetCombinator, SortKey};
use postgrust_eval::sample::department_hierarchy;
use postgrust_eval::{DatabaseError, EngineConfig, Expr, Plan};

/// WITH RECURSIVE walk AS (roots; children of walk) over EDGES, optionally
/// carrying a Level column
fn walk(root: Expr, combinator: SetCombinator, with_level: bool) -> Plan {
    let mut base_items: Vec<ProjectItem> = vec![Expr::col("ID").into()];
    let mut step_items: Vec<ProjectItem> = vec![Expr::col("e.ID").into()];
    if with_level {
        base_items.push(ProjectItem::aliased(Expr::int(0), "Level"));
        step_items.push(ProjectItem::aliased(Expr::col("w.Level").plus(Expr::int(1)), "Level"));
    }

    let base = Plan::scan("EDGES").filter(root).project(base_items);
    let step = Plan::scan_as("EDGES", "e")
        .join(Plan::cte_ref_as("walk", "w"), Expr::col("e.ParentID").equals(Expr::col("w.ID")))
        .project(step_items);

    Plan::with(
        vec![CteDefinition::recursive("walk", base, step, combinator)],
        Plan::cte_ref("walk"),
    )
}

#[test]
fn test_cycle_with_level_hits_iteration_cap() {
    // 1's parent is 2, 2's parent is 1
    let engine = edges_engine(&[(1, Some(2)), (2, Some(1))], config_with_limit(50));
    let plan = walk(Expr::col("ID").equals(Expr::int(1)), SetCombinator::Union, true);

    let err = engine.session().execute_plan(&plan, None).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        DatabaseError::RecursionLimitExceeded { cte, limit: 50 } if cte == "walk"
    ));
}

#[test]
fn test_cycle_without_level_converges_under_union() {
    let engine = edges_engine(&[(1, Some(2)), (2, Some(1))], config_with_limit(50));
    let plan = walk(Expr::col("ID").equals(Expr::int(1)), SetCombinator::Union, false);

    let rows = engine.session().execute_plan(&plan, None).unwrap();
    assert_eq!(ints(&rows, "ID"), vec![1, 2]);
}

#[test]
fn test_union_all_keeps_diamond_duplicates() {
    // 4 is reachable through both 2 and 3
    let edges = [(1, None), (2, Some(1)), (3, Some(1)), (4, Some(2)), (4, Some(3))];
    let engine = edges_engine(&edges, EngineConfig::default());
    let root = Expr::col("ParentID").is_null();

    let all = engine
        .session()
        .execute_plan(&walk(root.clone(), SetCombinator::UnionAll, false), None)
        .unwrap();
    let mut ids = ints(&all, "ID");
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4, 4]);

    let distinct = engine
        .session()
        .execute_plan(&walk(root, SetCombinator::Union, false), None)
        .unwrap();
    let mut ids = ints(&distinct, "ID");
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[test]
fn test_deep_chain_levels() {
    let edges: Vec<(i64, Option<i64>)> = (0..=20).map(|id| (id, (id > 0).then(|| id - 1))).collect();
    let engine = edges_engine(&edges, EngineConfig::default());
    let plan = walk(Expr::col("ParentID").is_null(), SetCombinator::UnionAll, true);

    let rows = engine.session().execute_plan(&plan, None).unwrap();
    assert_eq!(ints(&rows, "ID"), (0..=20).collect::<Vec<_>>());
    assert_eq!(ints(&rows, "Level"), (0..=20).collect::<Vec<_>>());
}

#[test]
fn test_iteration_cap_counts_final_empty_step() {
    // levels 0..=2 take three evaluations of the recursive term
    let (_, engine) = sample_engine(config_with_limit(3));
    assert_eq!(engine.session().execute_plan(&department_hierarchy(), None).unwrap().len(), 3);

    let (_, engine) = sample_engine(config_with_limit(2));
    let err = engine.session().execute_plan(&department_hierarchy(), None).unwrap_err();
    assert!(matches!(err, DatabaseError::RecursionLimitExceeded { limit: 2, .. }));
}

#[test]
fn test_alias_list_renames_columns() {
    let engine = edges_engine(&[(1, None), (2, Some(1))], EngineConfig::default());
    let base = Plan::scan("EDGES").filter(Expr::col("ParentID").is_null()).select(&["ID"]);
    let step = Plan::scan_as("EDGES", "e")
        .join(Plan::cte_ref_as("chain", "c"), Expr::col("e.ParentID").equals(Expr::col("c.Node")))
        .select(&["e.ID"]);
    let plan = Plan::with(
        vec![CteDefinition::recursive("chain", base, step, SetCombinator::UnionAll).with_columns(&["Node"])],
        Plan::cte_ref("chain").sort(vec![SortKey::desc(Expr::col("Node"))]),
    );

    let rows = engine.session().execute_plan(&plan, None).unwrap();
    assert_eq!(rows.schema.names(), vec!["Node"]);
    assert_eq!(ints(&rows, "Node"), vec![2, 1]);
}

#[test]
fn test_step_type_mismatch_is_schema_error() {
    let engine = edges_engine(&[(1, None), (2, Some(1))], EngineConfig::default());
    let base = Plan::scan("EDGES").filter(Expr::col("ParentID").is_null()).select(&["ID"]);
    let step = Plan::scan_as("EDGES", "e")
        .join(Plan::cte_ref_as("bad", "b"), Expr::col("e.ParentID").equals(Expr::col("b.ID")))
        .project(vec![ProjectItem::aliased(Expr::text("x"), "ID")]);
    let plan = Plan::with(
        vec![CteDefinition::recursive("bad", base, step, SetCombinator::UnionAll)],
        Plan::cte_ref("bad"),
    );

    let err = engine.session().execute_plan(&plan, None).unwrap_err();
    assert!(matches!(err, DatabaseError::SchemaMismatch(_)));
}

#[test]
fn test_plain_cte_joined_with_itself() {
    let engine = edges_engine(&[(1, None), (2, Some(1)), (3, Some(1))], EngineConfig::default());
    let children = CteDefinition::plain(
        "children",
        Plan::scan("EDGES").filter(Expr::col("ParentID").is_not_null()),
    );
    let plan = Plan::with(
        vec![children],
        Plan::cte_ref_as("children", "a")
            .join(Plan::cte_ref_as("children", "b"), Expr::col("a.ParentID").equals(Expr::col("b.ParentID")))
            .filter(Expr::col("a.ID").lt(Expr::col("b.ID")))
            .project(vec![
                ProjectItem::aliased(Expr::col("a.ID"), "Left"),
                ProjectItem::aliased(Expr::col("b.ID"), "Right"),
            ]),
    );

    let rows = engine.session().execute_plan(&plan, None).unwrap();
    assert_eq!(ints(&rows, "Left"), vec![2]);
    assert_eq!(ints(&rows, "Right"), vec![3]);
}

#[test]
fn test_unknown_cte_reference() {
    let engine = edges_engine(&[(1, None)], EngineConfig::default());
    let err = engine.session().execute_plan(&Plan::cte_ref("missing"), None).unwrap_err();
    assert!(matches!(err, DatabaseError::CteNotFound(name) if name == "missing"));
}
