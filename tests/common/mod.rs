#![allow(dead_code)]

use std::sync::Arc;
use postgrust_eval::sample::sample_store;
use postgrust_eval::{Column, DataType, Engine, EngineConfig, MemoryStore, Row, RowSet, Schema, Value};

/// Engine over the sample schema; the store is returned for direct reads
pub fn sample_engine(config: EngineConfig) -> (Arc<MemoryStore>, Engine) {
    let store = Arc::new(sample_store().unwrap());
    let engine = Engine::new(store.clone(), config);
    (store, engine)
}

/// Engine over a single `EDGES(ID, ParentID)` table
pub fn edges_engine(edges: &[(i64, Option<i64>)], config: EngineConfig) -> Engine {
    let store = MemoryStore::new();
    store
        .create_table(
            "EDGES",
            Schema::new(vec![
                Column::new("ID", DataType::Integer).not_null(),
                Column::new("ParentID", DataType::Integer),
            ]),
        )
        .unwrap();
    store
        .load_rows(
            "EDGES",
            edges
                .iter()
                .map(|(id, parent)| Row::new(vec![Value::Integer(*id), parent.map_or(Value::Null, Value::Integer)]))
                .collect(),
        )
        .unwrap();
    Engine::new(Arc::new(store), config)
}

pub fn config_with_limit(max_recursion_iterations: usize) -> EngineConfig {
    EngineConfig {
        max_recursion_iterations,
        ..EngineConfig::default()
    }
}

pub fn ints(rows: &RowSet, column: &str) -> Vec<i64> {
    rows.column(column).unwrap().iter().map(|v| v.as_int().unwrap()).collect()
}

pub fn texts(rows: &RowSet, column: &str) -> Vec<String> {
    rows.column(column).unwrap().iter().map(|v| v.to_string()).collect()
}

pub fn numeric(value: i64) -> Value {
    Value::Numeric(value.into())
}
