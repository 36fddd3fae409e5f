use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Functions computed from the grouping id of a row rather than
/// evaluated over the row values.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Copy, Deserialize, Serialize)]
pub enum GroupingKind {
    /// `grouping(expr)`: 1 if `expr` is not a part of the active grouping set.
    Grouping,
    /// `grouping_id(expr, ...)`: bit mask of `grouping()` over the arguments,
    /// the first argument being the most significant bit.
    GroupingId,
}

impl GroupingKind {
    #[must_use]
    pub fn from_name(func_name: &str) -> Option<GroupingKind> {
        match func_name.to_lowercase().as_str() {
            "grouping" => Some(GroupingKind::Grouping),
            "grouping_id" => Some(GroupingKind::GroupingId),
            _ => None,
        }
    }

    /// Prefix of the virtual column name that replaces the function call.
    #[must_use]
    pub fn virtual_column_prefix(self) -> &'static str {
        match self {
            GroupingKind::Grouping => "GROUPING_PREFIX_",
            GroupingKind::GroupingId => "GROUPING_ID_PREFIX_",
        }
    }
}

impl Display for GroupingKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GroupingKind::Grouping => "grouping",
            GroupingKind::GroupingId => "grouping_id",
        };
        write!(f, "{name}")
    }
}
