use serde::{Deserialize, Serialize};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use super::data_type::DataType;
use super::error::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Integer(i64),
    Numeric(Decimal),  // NUMERIC/DECIMAL, exact
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer and Numeric values as an exact decimal
    #[must_use]
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Integer(i) => Some(Decimal::from(*i)),
            Self::Numeric(d) => Some(*d),
            _ => None,
        }
    }

    /// Representative used for GROUP BY and PARTITION BY hashing, so values
    /// that compare equal (`1` and `1.0`, a date and its midnight) land in
    /// the same bucket
    #[must_use]
    pub fn key_form(&self) -> Self {
        match self {
            Self::Integer(i) => Self::Numeric(Decimal::from(*i)),
            Self::Numeric(d) => Self::Numeric(d.normalize()),
            Self::Date(d) => midnight(*d).map_or_else(|_| self.clone(), Self::Timestamp),
            other => other.clone(),
        }
    }

    /// Type of the value; NULL carries no type of its own
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Null => DataType::Unknown,
            Self::Integer(_) => DataType::Integer,
            Self::Numeric(_) => DataType::Numeric,
            Self::Text(_) => DataType::Text,
            Self::Boolean(_) => DataType::Boolean,
            Self::Date(_) => DataType::Date,
            Self::Timestamp(_) => DataType::Timestamp,
        }
    }

    /// SQL comparison. `Ok(None)` when either side is NULL.
    pub fn compare(&self, other: &Self) -> Result<Option<Ordering>, DatabaseError> {
        let ordering = match (self, other) {
            (Self::Null, _) | (_, Self::Null) => return Ok(None),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Integer(_) | Self::Numeric(_), Self::Integer(_) | Self::Numeric(_)) => {
                match (self.to_decimal(), other.to_decimal()) {
                    (Some(a), Some(b)) => a.cmp(&b),
                    _ => return Err(self.incomparable(other)),
                }
            }
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Date(a), Self::Timestamp(b)) => midnight(*a)?.cmp(b),
            (Self::Timestamp(a), Self::Date(b)) => a.cmp(&midnight(*b)?),
            _ => return Err(self.incomparable(other)),
        };
        Ok(Some(ordering))
    }

    /// Total order used for sorting: NULL sorts after everything,
    /// values of unrelated types are ordered by type.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Greater,
            (_, Self::Null) => Ordering::Less,
            _ => match self.compare(other) {
                Ok(Some(ordering)) => ordering,
                _ => self.type_rank().cmp(&other.type_rank()),
            },
        }
    }

    /// Coerce into a column/parameter type. Integer widens to Numeric and
    /// Date widens to Timestamp; everything else must already match.
    pub fn coerce_to(&self, target: &DataType) -> Result<Self, DatabaseError> {
        match (self, target) {
            (Self::Null, _) | (_, DataType::Unknown) => Ok(self.clone()),
            (Self::Integer(i), DataType::Numeric) => Ok(Self::Numeric(Decimal::from(*i))),
            (Self::Date(d), DataType::Timestamp) => Ok(Self::Timestamp(midnight(*d)?)),
            (value, target) if value.data_type() == *target => Ok(value.clone()),
            (value, target) => Err(DatabaseError::TypeMismatch(format!(
                "cannot coerce {} value '{value}' to {target}",
                value.data_type()
            ))),
        }
    }

    /// JSON rendering; numerics are emitted as strings to stay exact
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            other => serde_json::Value::String(other.to_string()),
        }
    }

    const fn type_rank(&self) -> u8 {
        match self {
            Self::Boolean(_) => 0,
            Self::Integer(_) | Self::Numeric(_) => 1,
            Self::Text(_) => 2,
            Self::Date(_) | Self::Timestamp(_) => 3,
            Self::Null => 4,
        }
    }

    fn incomparable(&self, other: &Self) -> DatabaseError {
        DatabaseError::TypeMismatch(format!(
            "cannot compare {} with {}",
            self.data_type(),
            other.data_type()
        ))
    }
}

fn midnight(date: NaiveDate) -> Result<NaiveDateTime, DatabaseError> {
    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| DatabaseError::TypeMismatch(format!("invalid date {date}")))
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Numeric(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Numeric(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}
