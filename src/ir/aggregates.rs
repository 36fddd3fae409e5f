use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use smol_str::format_smolstr;

use crate::errors::Error;

use super::expression::Expression;
use super::types::Type;

/// The kind of aggregate function.
///
/// Examples: avg, sum, count.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Copy, Deserialize, Serialize)]
pub enum AggregateKind {
    COUNT,
    SUM,
    AVG,
    TOTAL,
    MIN,
    MAX,
    GRCONCAT,
}

impl Display for AggregateKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AggregateKind::COUNT => "count",
            AggregateKind::SUM => "sum",
            AggregateKind::AVG => "avg",
            AggregateKind::TOTAL => "total",
            AggregateKind::MIN => "min",
            AggregateKind::MAX => "max",
            AggregateKind::GRCONCAT => "group_concat",
        };
        write!(f, "{name}")
    }
}

impl AggregateKind {
    /// Returns None in case passed function name is not aggregate.
    #[must_use]
    pub fn from_name(func_name: &str) -> Option<AggregateKind> {
        let normalized = func_name.to_lowercase();
        let kind = match normalized.as_str() {
            "count" => AggregateKind::COUNT,
            "sum" => AggregateKind::SUM,
            "avg" => AggregateKind::AVG,
            "total" => AggregateKind::TOTAL,
            "min" => AggregateKind::MIN,
            "max" => AggregateKind::MAX,
            "group_concat" | "string_agg" => AggregateKind::GRCONCAT,
            _ => return None,
        };
        Some(kind)
    }

    /// Get type of the corresponding aggregate function.
    ///
    /// # Errors
    /// - `min`/`max` without arguments
    pub fn get_type(self, args: &[Expression]) -> Result<Type, Error> {
        let ty = match self {
            AggregateKind::COUNT => Type::Integer,
            AggregateKind::TOTAL => Type::Double,
            AggregateKind::GRCONCAT => Type::Text,
            AggregateKind::SUM | AggregateKind::AVG => Type::Numeric,
            AggregateKind::MIN | AggregateKind::MAX => {
                let arg = args.first().ok_or_else(|| {
                    Error::UnexpectedNumberOfValues(format_smolstr!(
                        "expected at least 1 argument for {self}, got 0"
                    ))
                })?;
                arg.calculate_type()
            }
        };
        Ok(ty)
    }

    /// Whether the aggregate may return NULL. Only `count` and `total`
    /// produce a value for an empty or all-NULL group.
    #[must_use]
    pub fn is_nullable(self) -> bool {
        !matches!(self, AggregateKind::COUNT | AggregateKind::TOTAL)
    }
}
