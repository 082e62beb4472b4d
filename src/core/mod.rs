// Module declarations
pub mod error;
pub mod value;
pub mod data_type;
pub mod column;
pub mod row;
pub mod table;

// Re-exports for convenience
pub use error::DatabaseError;
pub use value::Value;
pub use data_type::DataType;
pub use column::{Column, ColumnRef, Schema};
pub use row::{Row, RowSet};
pub use table::Table;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::cmp::Ordering;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(Value::Numeric(Decimal::new(314, 2)).to_string(), "3.14");
        assert_eq!(Value::Text("hello".to_string()).to_string(), "hello");
        assert_eq!(Value::Boolean(true).to_string(), "true");
    }

    #[test]
    fn test_value_as_int() {
        assert_eq!(Value::Integer(42).as_int(), Some(42));
        assert_eq!(Value::Text("hello".to_string()).as_int(), None);
        assert_eq!(Value::Null.as_int(), None);
    }

    #[test]
    fn test_value_compare_cross_numeric() {
        let int = Value::Integer(2);
        let dec = Value::Numeric(Decimal::new(25, 1));
        assert_eq!(int.compare(&dec).unwrap(), Some(Ordering::Less));
        assert_eq!(Value::Integer(3).compare(&Value::Numeric(Decimal::new(30, 1))).unwrap(), Some(Ordering::Equal));
    }

    #[test]
    fn test_value_compare_null_is_unknown() {
        assert_eq!(Value::Null.compare(&Value::Integer(1)).unwrap(), None);
        assert_eq!(Value::Integer(1).compare(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_value_compare_type_mismatch() {
        let err = Value::Text("1000".to_string())
            .compare(&Value::Numeric(Decimal::new(1000, 0)))
            .unwrap_err();
        assert!(matches!(err, DatabaseError::TypeMismatch(_)));
    }

    #[test]
    fn test_sort_cmp_nulls_last() {
        let mut values = vec![Value::Null, Value::Integer(3), Value::Integer(1)];
        values.sort_by(Value::sort_cmp);
        assert_eq!(values, vec![Value::Integer(1), Value::Integer(3), Value::Null]);
    }

    #[test]
    fn test_coerce_to() {
        assert_eq!(
            Value::Integer(7).coerce_to(&DataType::Numeric).unwrap(),
            Value::Numeric(Decimal::from(7))
        );
        assert_eq!(Value::Null.coerce_to(&DataType::Text).unwrap(), Value::Null);
        assert!(Value::Text("x".to_string()).coerce_to(&DataType::Integer).is_err());
        assert!(Value::Numeric(Decimal::from(7)).coerce_to(&DataType::Integer).is_err());
    }

    #[test]
    fn test_data_type_unify() {
        assert_eq!(DataType::Integer.unify(DataType::Numeric), Some(DataType::Numeric));
        assert_eq!(DataType::Unknown.unify(DataType::Text), Some(DataType::Text));
        assert_eq!(DataType::Text.unify(DataType::Integer), None);
    }

    #[test]
    fn test_row_set_column_and_scalar() {
        let set = RowSet::new(
            Schema::new(vec![Column::new("Total", DataType::Integer)]),
            vec![Row::new(vec![Value::Integer(10)]), Row::new(vec![Value::Integer(20)])],
        );
        assert_eq!(set.column("total").unwrap(), vec![Value::Integer(10), Value::Integer(20)]);
        assert_eq!(set.scalar(), Value::Integer(10));
        assert_eq!(RowSet::empty(Schema::empty()).scalar(), Value::Null);
    }
}
