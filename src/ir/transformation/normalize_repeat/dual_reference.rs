//! Columns used both as grouping keys and as aggregate arguments.
//!
//! In `select sum(a) from t group by grouping sets ((a), ())` the repeat
//! node sets `a` to NULL in the rows of the empty grouping set, while
//! `sum(a)` must still see the original values. Such columns are
//! duplicated below the repeat node (`a -> "a'"`), the duplicate is
//! passed through the repeat untouched and the aggregate reads it instead.
//! Window functions are evaluated above the aggregate over the grouped
//! rows, so they keep reading the grouping column.

use itertools::Itertools;
use smol_str::{format_smolstr, SmolStr};

use crate::errors::{Entity, Error};
use crate::ir::expression::{Alias, Column, Expression, WindowExpr};
use crate::ir::helpers::RepeatableState;
use crate::ir::relation::{Aggregate, Projection, Relational, Repeat};
use crate::tlog;
use crate::utils::{OrderedMap, OrderedSet};

type ColumnMapping = OrderedMap<Column, Column>;

impl Aggregate {
    /// Makes ordinary aggregates read duplicates of the grouping columns
    /// instead of the columns nulled by the repeat node below.
    ///
    /// # Errors
    /// - the child is not a repeat node
    /// - a conflicting column is not produced by the repeat child
    pub fn resolve_dual_references(self) -> Result<Aggregate, Error> {
        let Relational::Repeat(repeat) = self.child.as_ref() else {
            return Err(Error::Invalid(
                Entity::Aggregate,
                Some(format_smolstr!(
                    "expected repeat child, got {}",
                    self.child.name()
                )),
            ));
        };

        let mut aggregate_columns: OrderedSet<Column> = OrderedSet::with_hasher(RepeatableState);
        for expr in &self.output {
            for function in expr.non_window_aggregates() {
                for arg in &function.args {
                    aggregate_columns.extend(arg.columns().into_iter().cloned());
                }
            }
        }
        let conflicts: Vec<Column> = repeat
            .grouping_columns()
            .into_iter()
            .filter(|column| aggregate_columns.contains(column))
            .collect();
        if conflicts.is_empty() {
            return Ok(self);
        }

        let taken: OrderedSet<SmolStr> = repeat
            .output
            .iter()
            .filter_map(Expression::to_column)
            .map(|column| column.name)
            .collect();
        let (child, duplicates) = duplicate_columns(&repeat.child, &conflicts, taken)?;
        let (virtual_columns, plain): (Vec<Expression>, Vec<Expression>) = repeat
            .output
            .iter()
            .cloned()
            .partition(|expr| matches!(expr, Expression::VirtualColumn(_)));
        let repeat_output = plain
            .into_iter()
            .chain(
                duplicates
                    .values()
                    .map(|alias| Expression::Column(alias.to_column())),
            )
            .chain(virtual_columns)
            .collect();
        let repeat = Repeat::new(repeat.grouping_sets.clone(), repeat_output, child);

        let mut mapping: ColumnMapping =
            OrderedMap::with_capacity_and_hasher(duplicates.len(), RepeatableState);
        for (column, alias) in duplicates.iter() {
            mapping.insert(column.clone(), alias.to_column());
        }
        let output = self
            .output
            .iter()
            .map(|expr| rewrite_outside_aggregates(expr, &mapping))
            .collect::<Result<Vec<_>, _>>()?;

        let names = conflicts.iter().map(|column| &column.name).join(", ");
        tlog!(Debug, "duplicated grouping columns read by aggregates"; "columns" => names);
        Ok(Aggregate::new(
            self.group_by,
            output,
            Relational::Repeat(repeat),
        ))
    }
}

/// `a'`, or `a''` and so on when the name is already exposed.
fn duplicate_name(column: &Column, taken: &mut OrderedSet<SmolStr>) -> SmolStr {
    let mut name = format_smolstr!("{}'", column.name);
    while !taken.insert(name.clone()) {
        name = format_smolstr!("{name}'");
    }
    name
}

/// Expression a projection evaluates to produce the column.
fn defining_expr(list: &[Expression], column: &Column) -> Option<Expression> {
    list.iter().find_map(|expr| match expr {
        Expression::Column(produced) if produced == column => Some(expr.clone()),
        Expression::Alias(alias) if alias.id == column.id => Some(alias.child.as_ref().clone()),
        _ => None,
    })
}

/// Adds an alias for every conflicting column to the repeat child. A child
/// projection defining all of them is extended in place, any other child
/// is wrapped into a new projection.
///
/// `taken` holds the names already exposed above the child.
fn duplicate_columns(
    child: &Relational,
    conflicts: &[Column],
    mut taken: OrderedSet<SmolStr>,
) -> Result<(Relational, OrderedMap<Column, Alias>), Error> {
    let mut duplicates = OrderedMap::with_capacity_and_hasher(conflicts.len(), RepeatableState);

    if let Relational::Projection(Projection { list, child: input }) = child {
        let sources: Option<Vec<Expression>> = conflicts
            .iter()
            .map(|column| defining_expr(list, column))
            .collect();
        if let Some(sources) = sources {
            taken.extend(
                list.iter()
                    .filter_map(Expression::to_column)
                    .map(|column| column.name),
            );
            let mut list = list.clone();
            for (column, source) in conflicts.iter().zip(sources) {
                let alias = Alias::new(duplicate_name(column, &mut taken), source);
                list.push(Expression::Alias(alias.clone()));
                duplicates.insert(column.clone(), alias);
            }
            return Ok((
                Relational::Projection(Projection::new(list, input.as_ref().clone())),
                duplicates,
            ));
        }
    }

    let output = child.output()?;
    taken.extend(output.iter().map(|column| column.name.clone()));
    let mut list: Vec<Expression> = output.iter().cloned().map(Expression::Column).collect();
    for column in conflicts {
        let source = output
            .iter()
            .find(|produced| *produced == column)
            .ok_or_else(|| {
                Error::NotFound(
                    Entity::Column,
                    format_smolstr!("{} in the output of the repeat child", column.name),
                )
            })?;
        let alias = Alias::new(
            duplicate_name(column, &mut taken),
            Expression::Column(source.clone()),
        );
        list.push(Expression::Alias(alias.clone()));
        duplicates.insert(column.clone(), alias);
    }
    Ok((
        Relational::Projection(Projection::new(list, child.clone())),
        duplicates,
    ))
}

fn rewrite_outside_aggregates(
    expr: &Expression,
    mapping: &ColumnMapping,
) -> Result<Expression, Error> {
    match expr {
        Expression::AggregateFunction(_) => rewrite_aggregate(expr, mapping),
        Expression::Window(window) => rewrite_window(window, mapping),
        _ => {
            let children = expr.children();
            if children.is_empty() {
                return Ok(expr.clone());
            }
            let children = children
                .into_iter()
                .map(|child| rewrite_outside_aggregates(child, mapping))
                .collect::<Result<Vec<_>, _>>()?;
            expr.with_children(children)
        }
    }
}

fn rewrite_aggregate(expr: &Expression, mapping: &ColumnMapping) -> Result<Expression, Error> {
    expr.transform_down(&mut |node| match node {
        Expression::Column(column) => Ok(mapping.get(column).cloned().map(Expression::Column)),
        _ => Ok(None),
    })
}

/// The window function keeps reading the grouping columns. Ordinary
/// aggregates nested in its arguments, partition keys or order keys
/// (`sum(sum(a)) over ()`) are rewritten.
fn rewrite_window(window: &WindowExpr, mapping: &ColumnMapping) -> Result<Expression, Error> {
    let args = window
        .function
        .children()
        .into_iter()
        .map(|arg| rewrite_outside_aggregates(arg, mapping))
        .collect::<Result<Vec<_>, _>>()?;
    let function = window.function.with_children(args)?;
    let partition_by = window
        .partition_by
        .iter()
        .map(|expr| rewrite_outside_aggregates(expr, mapping))
        .collect::<Result<Vec<_>, _>>()?;
    let order_by = window
        .order_by
        .iter()
        .map(|expr| rewrite_outside_aggregates(expr, mapping))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Expression::Window(WindowExpr {
        function: Box::new(function),
        partition_by,
        order_by,
        frame: window.frame,
    }))
}
