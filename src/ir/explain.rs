//! Textual rendering of a plan tree.
//!
//! Every node takes one line, children are indented by four spaces:
//!
//! ```text
//! aggregate group by (a, GROUPING_ID) output (a, sum(a') -> "sum(a)")
//!     repeat sets [(a)] output (a, a', GROUPING_ID)
//!         projection (a, a -> "a'")
//!             scan "t"
//! ```

use std::fmt::{Display, Formatter};

use itertools::Itertools;

use super::expression::Expression;
use super::relation::{Aggregate, Projection, Relational, Repeat, ScanRelation};

const INDENT: &str = "    ";

fn list(exprs: &[Expression]) -> String {
    format!("({})", exprs.iter().join(", "))
}

impl Relational {
    #[must_use]
    pub fn explain(&self) -> String {
        let mut lines = Vec::new();
        self.explain_lines(0, &mut lines);
        lines.join("\n")
    }

    fn explain_lines(&self, level: usize, lines: &mut Vec<String>) {
        lines.push(format!("{}{}", INDENT.repeat(level), self.explain_node()));
        for child in self.children() {
            child.explain_lines(level + 1, lines);
        }
    }

    fn explain_node(&self) -> String {
        match self {
            Relational::ScanRelation(ScanRelation { relation, .. }) => {
                format!("scan \"{relation}\"")
            }
            Relational::Projection(Projection { list: exprs, .. }) => {
                format!("projection {}", list(exprs))
            }
            Relational::Repeat(Repeat {
                grouping_sets,
                output,
                ..
            }) => format!(
                "repeat sets [{}] output {}",
                grouping_sets.iter().map(|set| list(set)).join(", "),
                list(output)
            ),
            Relational::Aggregate(Aggregate {
                group_by, output, ..
            }) => format!(
                "aggregate group by {} output {}",
                list(group_by),
                list(output)
            ),
        }
    }
}

impl Display for Relational {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.explain())
    }
}
