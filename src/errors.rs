use smol_str::SmolStr;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Kind of the IR object an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Aggregate,
    Alias,
    Column,
    Expression,
    GroupingSet,
    Node,
    Option,
    Projection,
    Relational,
    Repeat,
    VirtualColumn,
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let p = match self {
            Entity::Aggregate => "aggregate",
            Entity::Alias => "alias",
            Entity::Column => "column",
            Entity::Expression => "expression",
            Entity::GroupingSet => "grouping set",
            Entity::Node => "node",
            Entity::Option => "option",
            Entity::Projection => "projection",
            Entity::Relational => "relational node",
            Entity::Repeat => "repeat",
            Entity::VirtualColumn => "virtual column",
        };
        write!(f, "{p}")
    }
}

// None -> "", Some("kek") -> ": kek"
fn format_details(details: &Option<SmolStr>) -> String {
    match details {
        Some(details) => format!(": {details}"),
        None => String::new(),
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Flattened grouping sets contain more distinct expressions than allowed.
    /// This is the only error a well-formed repeat node can produce.
    #[error(
        "too many sets in GROUP BY clause: {actual} grouping set items, \
        the max grouping sets item is {limit}"
    )]
    TooManyGroupingSets { limit: usize, actual: usize },

    /// The IR object breaks one of the invariants the rewrite relies on.
    #[error("invalid {}{}", .0, format_details(.1))]
    Invalid(Entity, Option<SmolStr>),

    #[error("{0} not found: {1}")]
    NotFound(Entity, SmolStr),

    #[error("unexpected number of values: {0}")]
    UnexpectedNumberOfValues(SmolStr),
}

impl Error {
    /// Whether the error is caused by the query itself rather than
    /// by a broken plan.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, Error::TooManyGroupingSets { .. })
    }
}
