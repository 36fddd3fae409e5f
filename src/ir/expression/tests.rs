use pretty_assertions::assert_eq;

use super::*;
use crate::ir::tests::{add, col, desc, grouping, int, int_column, named, over, sum};

#[test]
fn columns_compare_by_identity() {
    let a = int_column("a", true);
    let other_a = int_column("a", true);
    assert_ne!(a, other_a);
    assert_eq!(a, a.clone().with_nullable(false));
    assert_eq!(add(col(&a), int(1)), add(col(&a), int(1)));
    assert_ne!(add(col(&a), int(1)), add(col(&other_a), int(1)));
}

#[test]
fn display() {
    let a = int_column("a", true);
    let b = int_column("b", true);
    let window = Expression::Window(WindowExpr {
        function: Box::new(sum(col(&a))),
        partition_by: vec![col(&b)],
        order_by: vec![desc(col(&a))],
        frame: Some(WindowFrame {
            kind: FrameKind::Rows,
            start: BoundType::UnboundedPreceding,
            end: Some(BoundType::CurrentRow),
        }),
    });
    assert_eq!(
        window.to_string(),
        "sum(a) over (partition by b order by a desc rows between unbounded preceding and current row)"
    );
    assert_eq!(named(add(col(&b), int(1))).to_string(), "(b + 1) -> \"(b + 1)\"");
    assert_eq!(
        Expression::AggregateFunction(AggregateFunction {
            kind: AggregateKind::COUNT,
            args: vec![],
            is_distinct: false,
        })
        .to_string(),
        "count(*)"
    );
    assert_eq!(grouping(col(&a)).to_string(), "grouping(a)");
}

#[test]
fn with_children_checks_arity() {
    let a = int_column("a", true);
    let expr = add(col(&a), int(1));
    let err = expr.with_children(vec![int(2)]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "unexpected number of values: expression (a + 1) expects 2 children, got 1"
    );

    let rebuilt = expr.with_children(vec![int(2), col(&a)]).unwrap();
    assert_eq!(rebuilt.to_string(), "(2 + a)");
}

#[test]
fn window_children_keep_their_places() {
    let a = int_column("a", true);
    let b = int_column("b", true);
    let c = int_column("c", true);
    let window = over(sum(col(&a)), vec![col(&b), col(&c)]);
    let children: Vec<Expression> = window.children().into_iter().cloned().rev().collect();
    let err = window.with_children(children[..2].to_vec()).unwrap_err();
    assert!(matches!(err, Error::UnexpectedNumberOfValues(_)));

    let swapped = window
        .with_children(vec![sum(col(&a)), col(&c), col(&b)])
        .unwrap();
    assert_eq!(swapped.to_string(), "sum(a) over (partition by c, b)");
}

#[test]
fn transform_down_short_circuits() {
    let a = int_column("a", true);
    let b = int_column("b", true);
    let inner = add(col(&a), int(1));
    let expr = sum(add(inner.clone(), col(&a)));

    let mut visited = 0;
    let rewritten = expr
        .transform_down(&mut |node| {
            visited += 1;
            if *node == inner {
                return Ok(Some(col(&b)));
            }
            Ok(None)
        })
        .unwrap();
    assert_eq!(rewritten.to_string(), "sum((b + a))");
    // sum, (inner + a), inner, a: the children of the replaced node are skipped.
    assert_eq!(visited, 4);
}

#[test]
fn non_window_aggregates_skip_window_functions() {
    let a = int_column("a", true);
    let b = int_column("b", true);
    let window = over(
        sum(sum(col(&a))),
        vec![Expression::AggregateFunction(AggregateFunction {
            kind: AggregateKind::MAX,
            args: vec![col(&b)],
            is_distinct: false,
        })],
    );
    let found: Vec<String> = add(window, sum(col(&b)))
        .non_window_aggregates()
        .into_iter()
        .map(|function| Expression::AggregateFunction(function.clone()).to_string())
        .collect();
    assert_eq!(found, vec!["sum(a)", "max(b)", "sum(b)"]);
}

#[test]
fn alias_column_follows_child() {
    let a = int_column("a", false);
    let b = int_column("b", true);
    let Expression::Alias(alias) = named(add(col(&a), int(1))) else {
        panic!("expected alias");
    };
    let column = alias.to_column();
    assert_eq!(column.id, alias.id);
    assert_eq!(column.name, "(a + 1)");
    assert_eq!(column.ty, Type::Integer);
    assert!(!column.is_nullable);

    let count = Expression::AggregateFunction(AggregateFunction {
        kind: AggregateKind::COUNT,
        args: vec![col(&b)],
        is_distinct: false,
    });
    assert!(!count.is_nullable());
    assert!(sum(col(&b)).is_nullable());
}

#[test]
fn grouping_virtual_column_name() {
    let a = int_column("a", true);
    let column = VirtualColumn::from_function(GroupingFunction {
        kind: GroupingKind::GroupingId,
        args: vec![col(&a), add(col(&a), int(1))],
    });
    assert_eq!(column.column.name, "GROUPING_ID_PREFIX_a_(a + 1)");
    assert!(!column.column.is_nullable);
    assert!(!column.is_grouping_id());
    assert!(VirtualColumn::grouping_id().is_grouping_id());
}

#[test]
fn function_names() {
    assert_eq!(AggregateKind::from_name("STRING_AGG"), Some(AggregateKind::GRCONCAT));
    assert_eq!(AggregateKind::from_name("grouping"), None);
    assert_eq!(GroupingKind::from_name("Grouping_Id"), Some(GroupingKind::GroupingId));
    assert_eq!(GroupingKind::from_name("sum"), None);
    assert_eq!(Type::Numeric.to_string(), "numeric");
    assert_eq!(
        AggregateKind::MIN.get_type(&[]).unwrap_err().to_string(),
        "unexpected number of values: expected at least 1 argument for min, got 0"
    );
    assert_eq!(Expression::from(Value::from("x")).to_string(), "'x'");
    assert_eq!(Expression::from(Value::Null).calculate_type(), Type::Unknown);
}
