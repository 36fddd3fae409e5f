//! Builders shared by the IR tests.

use super::aggregates::AggregateKind;
use super::expression::{
    AggregateFunction, Alias, Arithmetic, ArithmeticExpr, Column, Expression, GroupingFunction,
    OrderType, OrderedExpr, WindowExpr,
};
use super::function::GroupingKind;
use super::relation::{Relational, ScanRelation};
use super::types::Type;
use super::value::Value;

pub(crate) fn int_column(name: &str, is_nullable: bool) -> Column {
    Column::new(name, Type::Integer, is_nullable)
}

pub(crate) fn col(column: &Column) -> Expression {
    Expression::Column(column.clone())
}

pub(crate) fn int(value: i64) -> Expression {
    Expression::Constant(Value::from(value))
}

pub(crate) fn add(left: Expression, right: Expression) -> Expression {
    Expression::Arithmetic(ArithmeticExpr {
        op: Arithmetic::Add,
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub(crate) fn aggregate(kind: AggregateKind, args: Vec<Expression>) -> Expression {
    Expression::AggregateFunction(AggregateFunction {
        kind,
        args,
        is_distinct: false,
    })
}

pub(crate) fn sum(arg: Expression) -> Expression {
    aggregate(AggregateKind::SUM, vec![arg])
}

pub(crate) fn grouping(arg: Expression) -> Expression {
    Expression::GroupingFunction(GroupingFunction {
        kind: GroupingKind::Grouping,
        args: vec![arg],
    })
}

pub(crate) fn grouping_id(args: Vec<Expression>) -> Expression {
    Expression::GroupingFunction(GroupingFunction {
        kind: GroupingKind::GroupingId,
        args,
    })
}

pub(crate) fn desc(child: Expression) -> Expression {
    Expression::Ordered(OrderedExpr {
        child: Box::new(child),
        order: OrderType::Desc,
    })
}

pub(crate) fn over(function: Expression, partition_by: Vec<Expression>) -> Expression {
    Expression::Window(WindowExpr {
        function: Box::new(function),
        partition_by,
        order_by: Vec::new(),
        frame: None,
    })
}

/// Alias named after the expression text, like an unnamed output column.
pub(crate) fn named(expr: Expression) -> Expression {
    Expression::Alias(Alias::from_expr(expr))
}

pub(crate) fn alias(name: &str, expr: Expression) -> Expression {
    Expression::Alias(Alias::new(name, expr))
}

pub(crate) fn scan(relation: &str, columns: &[&Column]) -> Relational {
    Relational::ScanRelation(ScanRelation::new(
        relation,
        columns.iter().map(|column| (*column).clone()).collect(),
    ))
}
