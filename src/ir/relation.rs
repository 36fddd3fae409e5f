//! Relational nodes of the plan tree.
//!
//! Like expressions, relational nodes are values: a transformation
//! consumes a subtree and returns a new one.

use smol_str::{format_smolstr, SmolStr};

use crate::errors::{Entity, Error};
use crate::utils::OrderedSet;

use super::expression::{Column, Expression, GroupingFunction, VirtualColumn, VirtualSource};
use super::helpers::RepeatableState;

/// Ordered list of grouping expressions active for a subset of rows.
/// The order matters: it defines the bits of the grouping id.
pub type GroupingSet = Vec<Expression>;

/// Leaf node producing the columns of a stored relation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanRelation {
    pub relation: SmolStr,
    pub columns: Vec<Column>,
}

impl ScanRelation {
    pub fn new(relation: impl Into<SmolStr>, columns: Vec<Column>) -> Self {
        ScanRelation {
            relation: relation.into(),
            columns,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Projection {
    /// Named expressions, names are unique.
    pub list: Vec<Expression>,
    pub child: Box<Relational>,
}

impl Projection {
    #[must_use]
    pub fn new(list: Vec<Expression>, child: Relational) -> Self {
        Projection {
            list,
            child: Box::new(child),
        }
    }
}

/// Generalized `GROUP BY GROUPING SETS / ROLLUP / CUBE`: every input row is
/// repeated once per grouping set with the columns missing from the set
/// replaced by NULL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Repeat {
    pub grouping_sets: Vec<GroupingSet>,
    pub output: Vec<Expression>,
    pub child: Box<Relational>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Aggregate {
    pub group_by: Vec<Expression>,
    pub output: Vec<Expression>,
    pub child: Box<Relational>,
}

impl Aggregate {
    #[must_use]
    pub fn new(group_by: Vec<Expression>, output: Vec<Expression>, child: Relational) -> Self {
        Aggregate {
            group_by,
            output,
            child: Box::new(child),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Relational {
    ScanRelation(ScanRelation),
    Projection(Projection),
    Repeat(Repeat),
    Aggregate(Aggregate),
}

impl From<ScanRelation> for Relational {
    fn from(scan: ScanRelation) -> Self {
        Relational::ScanRelation(scan)
    }
}

impl From<Projection> for Relational {
    fn from(projection: Projection) -> Self {
        Relational::Projection(projection)
    }
}

impl From<Repeat> for Relational {
    fn from(repeat: Repeat) -> Self {
        Relational::Repeat(repeat)
    }
}

impl From<Aggregate> for Relational {
    fn from(aggregate: Aggregate) -> Self {
        Relational::Aggregate(aggregate)
    }
}

fn named_output(list: &[Expression], entity: Entity) -> Result<Vec<Column>, Error> {
    list.iter()
        .map(|expr| {
            expr.to_column().ok_or_else(|| {
                Error::Invalid(
                    entity,
                    Some(format_smolstr!("output expression {expr} has no name")),
                )
            })
        })
        .collect()
}

impl Relational {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Relational::ScanRelation(_) => "scan",
            Relational::Projection(_) => "projection",
            Relational::Repeat(_) => "repeat",
            Relational::Aggregate(_) => "aggregate",
        }
    }

    pub fn children(&self) -> Vec<&Relational> {
        match self {
            Relational::ScanRelation(_) => Vec::new(),
            Relational::Projection(Projection { child, .. })
            | Relational::Repeat(Repeat { child, .. })
            | Relational::Aggregate(Aggregate { child, .. }) => vec![child.as_ref()],
        }
    }

    /// Ordered list of the columns exposed by the node.
    ///
    /// # Errors
    /// - an output expression is not named
    pub fn output(&self) -> Result<Vec<Column>, Error> {
        match self {
            Relational::ScanRelation(ScanRelation { columns, .. }) => Ok(columns.clone()),
            Relational::Projection(Projection { list, .. }) => {
                named_output(list, Entity::Projection)
            }
            Relational::Repeat(Repeat { output, .. }) => named_output(output, Entity::Repeat),
            Relational::Aggregate(Aggregate { output, .. }) => {
                named_output(output, Entity::Aggregate)
            }
        }
    }

    /// Post-order rewrite: children are transformed first, then the rule
    /// is applied to the rebuilt node. Every node of the original tree is
    /// passed to the rule exactly once.
    ///
    /// # Errors
    /// - the rule fails
    pub fn transform_up<F>(self, rule: &mut F) -> Result<Relational, Error>
    where
        F: FnMut(Relational) -> Result<Relational, Error>,
    {
        let node = match self {
            Relational::ScanRelation(_) => self,
            Relational::Projection(Projection { list, child }) => {
                Relational::Projection(Projection::new(list, child.transform_up(rule)?))
            }
            Relational::Repeat(Repeat {
                grouping_sets,
                output,
                child,
            }) => Relational::Repeat(Repeat::new(
                grouping_sets,
                output,
                child.transform_up(rule)?,
            )),
            Relational::Aggregate(Aggregate {
                group_by,
                output,
                child,
            }) => Relational::Aggregate(Aggregate::new(
                group_by,
                output,
                child.transform_up(rule)?,
            )),
        };
        rule(node)
    }
}

/// Bit mask with a bit set for every expression missing from the set.
/// The first expression is the most significant bit.
fn absent_mask<'e>(set: &[Expression], exprs: impl ExactSizeIterator<Item = &'e Expression>) -> u64 {
    let len = exprs.len();
    exprs.enumerate().fold(0, |mask, (pos, expr)| {
        if set.contains(expr) {
            return mask;
        }
        let shift = u32::try_from(len - 1 - pos).unwrap_or(u32::MAX);
        mask | 1_u64.checked_shl(shift).unwrap_or(0)
    })
}

impl Repeat {
    #[must_use]
    pub fn new(grouping_sets: Vec<GroupingSet>, output: Vec<Expression>, child: Relational) -> Self {
        Repeat {
            grouping_sets,
            output,
            child: Box::new(child),
        }
    }

    /// Distinct expressions of all grouping sets in the order of
    /// their first appearance.
    #[must_use]
    pub fn flattened_grouping_exprs(&self) -> OrderedSet<Expression> {
        self.grouping_sets.iter().flatten().cloned().collect()
    }

    /// Plain columns referenced by the grouping sets.
    #[must_use]
    pub fn grouping_columns(&self) -> OrderedSet<Column> {
        let mut columns = OrderedSet::with_hasher(RepeatableState);
        for expr in self.grouping_sets.iter().flatten() {
            columns.extend(expr.columns().into_iter().cloned());
        }
        columns
    }

    /// Value of the grouping id for every grouping set.
    #[must_use]
    pub fn grouping_id_values(&self) -> Vec<u64> {
        let exprs = self.flattened_grouping_exprs();
        self.grouping_sets
            .iter()
            .map(|set| absent_mask(set, exprs.iter()))
            .collect()
    }

    /// Value of a grouping function for every grouping set.
    #[must_use]
    pub fn grouping_function_values(&self, function: &GroupingFunction) -> Vec<u64> {
        self.grouping_sets
            .iter()
            .map(|set| absent_mask(set, function.args.iter()))
            .collect()
    }

    /// Value of a virtual column for every grouping set.
    #[must_use]
    pub fn virtual_column_values(&self, column: &VirtualColumn) -> Vec<u64> {
        match &column.source {
            VirtualSource::GroupingId => self.grouping_id_values(),
            VirtualSource::Function(function) => self.grouping_function_values(function),
        }
    }
}

#[cfg(test)]
mod tests;
