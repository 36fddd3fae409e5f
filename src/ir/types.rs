use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Scalar type of an expression.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Deserialize, Serialize)]
pub enum Type {
    Unsigned,
    Integer,
    Double,
    Numeric,
    Text,
    Boolean,
    Datetime,
    Uuid,
    // Type of NULL literal.
    Unknown,
}

impl Type {
    pub fn as_str(&self) -> &'static str {
        match self {
            Type::Unsigned => "unsigned",
            Type::Integer => "int",
            Type::Double => "double",
            Type::Numeric => "numeric",
            Type::Text => "text",
            Type::Boolean => "bool",
            Type::Datetime => "datetime",
            Type::Uuid => "uuid",
            Type::Unknown => "unknown",
        }
    }

    /// Result type of an arithmetic operation over two operands.
    #[must_use]
    pub fn arithmetic_result(self, other: Type) -> Type {
        use Type::{Double, Integer, Numeric, Unknown, Unsigned};
        match (self, other) {
            (Unknown, t) | (t, Unknown) => t,
            (Double, _) | (_, Double) => Double,
            (Numeric, _) | (_, Numeric) => Numeric,
            (Unsigned, Unsigned) => Unsigned,
            (Integer | Unsigned, Integer | Unsigned) => Integer,
            (t, _) => t,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
