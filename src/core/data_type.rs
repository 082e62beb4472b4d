use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Numeric,
    Text,
    Boolean,
    Date,
    Timestamp,
    /// Type of an untyped NULL literal; compatible with every type
    Unknown,
}

impl DataType {
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Numeric)
    }

    /// Whether values of `other` may flow into a column of this type
    #[must_use]
    pub fn accepts(self, other: Self) -> bool {
        self == other
            || matches!(self, Self::Unknown)
            || matches!(other, Self::Unknown)
            || matches!((self, other), (Self::Numeric, Self::Integer) | (Self::Timestamp, Self::Date))
    }

    /// Common type of two union/coalesce branches
    #[must_use]
    pub fn unify(self, other: Self) -> Option<Self> {
        if self.accepts(other) {
            Some(if matches!(self, Self::Unknown) { other } else { self })
        } else if other.accepts(self) {
            Some(other)
        } else {
            None
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Integer => "INTEGER",
            Self::Numeric => "NUMERIC",
            Self::Text => "TEXT",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{name}")
    }
}
