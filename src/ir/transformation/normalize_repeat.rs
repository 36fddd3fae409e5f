//! Normalization of repeat nodes (`GROUPING SETS`, `ROLLUP`, `CUBE`).
//!
//! A repeat node produced by the query builder holds arbitrary
//! expressions: the grouping sets may contain `b + 1`, the output may call
//! `grouping(b + 1)` and `sum(b + 1)`. Neither the repeat nor the aggregate
//! executor can evaluate them, so the node is rewritten into
//!
//! ```text
//! Aggregate (group by grouping columns and virtual columns)
//!     Repeat (grouping sets over columns only)
//!         Projection (evaluates the pushed-down expressions)
//!             child
//! ```
//!
//! The rewrite runs in five steps:
//! 1. the number of distinct grouping expressions is checked against the limit;
//! 2. grouping expressions, grouping function arguments and arguments of
//!    ordinary aggregates are collected for the push-down;
//! 3. every collected expression is mapped to a column (see [`context`]);
//! 4. the repeat and aggregate nodes are rebuilt over those columns, grouping
//!    functions become virtual columns;
//! 5. grouping columns that are also read by ordinary aggregates are
//!    duplicated below the repeat (see [`dual_reference`]).
//!
//! ```text
//! select sum(b + 1), grouping(a + 1) from t group by grouping sets ((a + 1))
//!
//! aggregate group by ((a + 1), GROUPING_ID, GROUPING_PREFIX_(a + 1)) output (...)
//!     repeat sets [((a + 1))] output ((a + 1), (b + 1), GROUPING_ID, GROUPING_PREFIX_(a + 1))
//!         projection ((a + 1) -> "(a + 1)", (b + 1) -> "(b + 1)")
//!             scan "t"
//! ```

pub mod context;
pub mod dual_reference;

use smol_str::format_smolstr;

use crate::errors::{Entity, Error};
use crate::ir::expression::{Column, ColumnId, Expression, GroupingFunction, VirtualColumn};
use crate::ir::helpers::RepeatableState;
use crate::ir::options::Options;
use crate::ir::relation::{Aggregate, GroupingSet, Projection, Relational, Repeat};
use crate::tlog;
use crate::utils::{OrderedMap, OrderedSet};

use self::context::NormalizationContext;

impl Repeat {
    /// Rewrites the repeat node into an aggregate over a normalized repeat.
    ///
    /// # Errors
    /// - options are invalid
    /// - the grouping sets contain more distinct expressions than allowed
    /// - the node is malformed
    pub fn normalize(&self, options: &Options) -> Result<Aggregate, Error> {
        options.validate()?;
        self.check_grouping_sets_size(options.max_grouping_set_items)?;
        self.normalize_to_aggregate()?.resolve_dual_references()
    }

    /// # Errors
    /// - the flattened grouping sets contain more than `limit` distinct expressions
    pub fn check_grouping_sets_size(&self, limit: usize) -> Result<(), Error> {
        let actual = self.flattened_grouping_exprs().len();
        if actual > limit {
            tlog!(Warning, "too many grouping set items"; "limit" => limit, "actual" => actual);
            return Err(Error::TooManyGroupingSets { limit, actual });
        }
        Ok(())
    }

    /// Expressions that have to be evaluated below the repeat node:
    /// grouping expressions, then grouping function arguments, then
    /// arguments of non-window aggregates (ordered arguments without
    /// their direction). Each expression appears once.
    #[must_use]
    pub fn push_down_expressions(&self) -> OrderedSet<Expression> {
        let mut exprs = self.flattened_grouping_exprs();
        for expr in &self.output {
            expr.walk(&mut |node| {
                if let Expression::GroupingFunction(function) = node {
                    exprs.extend(function.args.iter().cloned());
                }
            });
        }
        for expr in &self.output {
            for aggregate in expr.non_window_aggregates() {
                exprs.extend(aggregate.args.iter().map(|arg| arg.unwrap_ordered().clone()));
            }
        }
        exprs
    }

    fn normalize_to_aggregate(&self) -> Result<Aggregate, Error> {
        let push_down = self.push_down_expressions();
        let context = NormalizationContext::build(self, &push_down);

        let grouping_sets = self
            .grouping_sets
            .iter()
            .map(|set| normalize_grouping_set(&context, set))
            .collect::<Result<Vec<_>, _>>()?;

        let mut functions: OrderedMap<GroupingFunction, VirtualColumn> =
            OrderedMap::with_hasher(RepeatableState);
        let output = self
            .output
            .iter()
            .map(|expr| {
                context.substitute_with(expr, &mut |context, node| {
                    normalize_grouping_function(context, node, &mut functions)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let grouping_columns: OrderedSet<Column> = grouping_sets
            .iter()
            .flatten()
            .filter_map(Expression::to_column)
            .collect();

        let mut grouping_id = None;
        let mut function_columns: OrderedSet<VirtualColumn> =
            OrderedSet::with_hasher(RepeatableState);
        let mut aggregate_only: OrderedSet<Column> = OrderedSet::with_hasher(RepeatableState);
        for expr in &output {
            expr.walk(&mut |node| match node {
                Expression::VirtualColumn(column) if column.is_grouping_id() => {
                    if grouping_id.is_none() {
                        grouping_id = Some(column.clone());
                    }
                }
                Expression::VirtualColumn(column) => {
                    function_columns.insert(column.clone());
                }
                Expression::Column(column) if !grouping_columns.contains(column) => {
                    aggregate_only.insert(column.clone());
                }
                _ => {}
            });
        }

        let mut virtual_columns = Vec::with_capacity(function_columns.len() + 1);
        virtual_columns.push(grouping_id.unwrap_or_else(VirtualColumn::grouping_id));
        virtual_columns.extend(function_columns);

        let repeat_output = grouping_columns
            .iter()
            .chain(aggregate_only.iter())
            .cloned()
            .map(Expression::Column)
            .chain(virtual_columns.iter().cloned().map(Expression::VirtualColumn))
            .collect();
        let child = push_down_projection(
            context.materialized_projections(),
            &aggregate_only,
            &self.child,
        )?;
        tlog!(Debug, "normalized repeat node";
            "grouping_sets" => grouping_sets.len(),
            "pushed_down" => context.len(),
            "virtual_columns" => virtual_columns.len());

        let group_by = grouping_columns
            .into_iter()
            .map(Expression::Column)
            .chain(virtual_columns.into_iter().map(Expression::VirtualColumn))
            .collect();
        let repeat = Repeat::new(grouping_sets, repeat_output, child);
        Ok(Aggregate::new(group_by, output, Relational::Repeat(repeat)))
    }
}

fn normalize_grouping_set(
    context: &NormalizationContext,
    set: &GroupingSet,
) -> Result<GroupingSet, Error> {
    set.iter()
        .map(|expr| match context.substitute(expr)? {
            normalized @ Expression::Column(_) => Ok(normalized),
            other => Err(Error::Invalid(
                Entity::GroupingSet,
                Some(format_smolstr!(
                    "grouping expression {expr} was normalized to {other} instead of a column"
                )),
            )),
        })
        .collect()
}

/// Replaces a grouping function call with a virtual column. Calls equal
/// after the substitution of their arguments share the column.
fn normalize_grouping_function(
    context: &NormalizationContext,
    expr: &Expression,
    functions: &mut OrderedMap<GroupingFunction, VirtualColumn>,
) -> Result<Option<Expression>, Error> {
    let Expression::GroupingFunction(function) = expr else {
        return Ok(None);
    };
    let args = function
        .args
        .iter()
        .map(|arg| context.substitute(arg))
        .collect::<Result<Vec<_>, _>>()?;
    let function = GroupingFunction {
        kind: function.kind,
        args,
    };
    if let Some(column) = functions.get(&function) {
        return Ok(Some(Expression::VirtualColumn(column.clone())));
    }
    let column = VirtualColumn::from_function(function.clone());
    functions.insert(function, column.clone());
    Ok(Some(Expression::VirtualColumn(column)))
}

/// Wraps the child into a projection producing the pushed-down expressions.
/// Columns read only by the aggregate pass through when the child exposes
/// them. The child is kept as is when it already exposes exactly the
/// required columns.
fn push_down_projection(
    pushed: Vec<Expression>,
    pass_through: &OrderedSet<Column>,
    child: &Relational,
) -> Result<Relational, Error> {
    let child_output = child.output()?;
    let mut list = pushed;
    let mut produced: OrderedSet<ColumnId> = list
        .iter()
        .filter_map(Expression::to_column)
        .map(|column| column.id)
        .collect();
    for column in pass_through {
        if produced.contains(&column.id) {
            continue;
        }
        if let Some(source) = child_output.iter().find(|source| *source == column) {
            produced.insert(source.id);
            list.push(Expression::Column(source.clone()));
        }
    }

    if list.is_empty() || exposes_exactly(&list, &child_output) {
        return Ok(child.clone());
    }
    Ok(Relational::Projection(Projection::new(list, child.clone())))
}

fn exposes_exactly(list: &[Expression], columns: &[Column]) -> bool {
    list.len() == columns.len()
        && list
            .iter()
            .all(|expr| matches!(expr, Expression::Column(column) if columns.contains(column)))
}
