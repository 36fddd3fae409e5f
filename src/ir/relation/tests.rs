use pretty_assertions::assert_eq;

use super::*;
use crate::ir::expression::GroupingFunction;
use crate::ir::function::GroupingKind;
use crate::ir::tests::{add, col, int, int_column, named, scan, sum};

fn rollup_ab() -> (Column, Column, Repeat) {
    let a = int_column("a", true);
    let b = int_column("b", true);
    let repeat = Repeat::new(
        vec![vec![col(&a), col(&b)], vec![col(&a)], vec![]],
        vec![col(&a), col(&b)],
        scan("t", &[&a, &b]),
    );
    (a, b, repeat)
}

#[test]
fn grouping_id_bits() {
    let (_, _, repeat) = rollup_ab();
    assert_eq!(repeat.grouping_id_values(), vec![0, 1, 3]);
}

#[test]
fn grouping_function_bits() {
    let (a, b, repeat) = rollup_ab();
    let grouping_b = GroupingFunction {
        kind: GroupingKind::Grouping,
        args: vec![col(&b)],
    };
    assert_eq!(repeat.grouping_function_values(&grouping_b), vec![0, 1, 1]);

    let grouping_id_ba = GroupingFunction {
        kind: GroupingKind::GroupingId,
        args: vec![col(&b), col(&a)],
    };
    assert_eq!(
        repeat.grouping_function_values(&grouping_id_ba),
        vec![0, 2, 3]
    );

    let column = VirtualColumn::from_function(grouping_b);
    assert_eq!(repeat.virtual_column_values(&column), vec![0, 1, 1]);
    assert_eq!(
        repeat.virtual_column_values(&VirtualColumn::grouping_id()),
        vec![0, 1, 3]
    );
}

#[test]
fn flattened_grouping_exprs_are_distinct() {
    let a = int_column("a", true);
    let b = int_column("b", true);
    let repeat = Repeat::new(
        vec![
            vec![add(col(&a), int(1)), col(&b)],
            vec![col(&b), add(col(&a), int(1))],
        ],
        vec![],
        scan("t", &[&a, &b]),
    );
    let exprs: Vec<String> = repeat
        .flattened_grouping_exprs()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(exprs, vec!["(a + 1)", "b"]);
    assert_eq!(repeat.grouping_columns().into_vec(), vec![a, b]);
}

#[test]
fn output_requires_names() {
    let a = int_column("a", true);
    let projection = Relational::Projection(Projection::new(
        vec![col(&a), named(add(col(&a), int(1)))],
        scan("t", &[&a]),
    ));
    let output = projection.output().unwrap();
    assert_eq!(output.len(), 2);
    assert_eq!(output[0], a);
    assert_eq!(output[1].name, "(a + 1)");

    let aggregate = Relational::Aggregate(Aggregate::new(
        vec![],
        vec![sum(col(&a))],
        scan("t", &[&a]),
    ));
    assert_eq!(
        aggregate.output().unwrap_err().to_string(),
        "invalid aggregate: output expression sum(a) has no name"
    );
}

#[test]
fn transform_up_visits_children_first() {
    let a = int_column("a", true);
    let plan = Relational::Projection(Projection::new(
        vec![col(&a)],
        Relational::Projection(Projection::new(vec![col(&a)], scan("t", &[&a]))),
    ));
    let mut visited = Vec::new();
    let rebuilt = plan
        .clone()
        .transform_up(&mut |node| {
            visited.push(node.name());
            Ok(node)
        })
        .unwrap();
    assert_eq!(visited, vec!["scan", "projection", "projection"]);
    assert_eq!(rebuilt, plan);
}
