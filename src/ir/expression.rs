//! Expression module.
//!
//! Expressions are immutable trees: a rewrite never changes a node in place,
//! it builds a new tree with [`Expression::with_children`] or
//! [`Expression::transform_down`]. Two expressions are equal when their
//! trees are equal. Columns are the only leaves with identity: they are
//! compared by [`ColumnId`].

use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::iter;
use std::sync::atomic::{AtomicU64, Ordering};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smol_str::{format_smolstr, SmolStr, ToSmolStr};

use crate::errors::{Entity, Error};

use super::aggregates::AggregateKind;
use super::function::GroupingKind;
use super::types::Type;
use super::value::Value;

/// Name of the virtual column holding the grouping id of a row.
pub const GROUPING_ID_NAME: &str = "GROUPING_ID";

static NEXT_COLUMN_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a column. Every column and every alias gets its own id,
/// even when the names are the same.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnId(u64);

impl ColumnId {
    /// Takes the next identifier from the process-wide counter.
    #[must_use]
    pub fn next() -> Self {
        ColumnId(NEXT_COLUMN_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for ColumnId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to a column produced by a relational node.
#[derive(Clone, Debug)]
pub struct Column {
    pub id: ColumnId,
    pub name: SmolStr,
    pub ty: Type,
    pub is_nullable: bool,
}

impl Column {
    /// Creates a column with a fresh identity.
    pub fn new(name: impl Into<SmolStr>, ty: Type, is_nullable: bool) -> Self {
        Column {
            id: ColumnId::next(),
            name: name.into(),
            ty,
            is_nullable,
        }
    }

    /// The same column (same identity) with another nullability.
    #[must_use]
    pub fn with_nullable(mut self, is_nullable: bool) -> Self {
        self.is_nullable = is_nullable;
        self
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Column {}

impl Hash for Column {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The construct a virtual column was generated for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VirtualSource {
    GroupingId,
    Function(GroupingFunction),
}

/// Synthetic column computed by the repeat node from the grouping id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VirtualColumn {
    pub column: Column,
    pub source: VirtualSource,
}

impl VirtualColumn {
    #[must_use]
    pub fn grouping_id() -> Self {
        VirtualColumn {
            column: Column::new(GROUPING_ID_NAME, Type::Integer, false),
            source: VirtualSource::GroupingId,
        }
    }

    /// Virtual column replacing a grouping function call. The arguments
    /// are expected to be already normalized.
    #[must_use]
    pub fn from_function(function: GroupingFunction) -> Self {
        let name = format_smolstr!(
            "{}{}",
            function.kind.virtual_column_prefix(),
            function.args.iter().join("_")
        );
        VirtualColumn {
            column: Column::new(name, Type::Integer, false),
            source: VirtualSource::Function(function),
        }
    }

    #[must_use]
    pub fn is_grouping_id(&self) -> bool {
        matches!(self.source, VirtualSource::GroupingId)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Alias {
    pub id: ColumnId,
    pub name: SmolStr,
    pub child: Box<Expression>,
}

impl Alias {
    pub fn new(name: impl Into<SmolStr>, child: Expression) -> Self {
        Alias {
            id: ColumnId::next(),
            name: name.into(),
            child: Box::new(child),
        }
    }

    /// Alias named after the text of the expression it wraps.
    #[must_use]
    pub fn from_expr(child: Expression) -> Self {
        let name = child.to_smolstr();
        Alias::new(name, child)
    }

    /// The column this alias produces.
    #[must_use]
    pub fn to_column(&self) -> Column {
        Column {
            id: self.id,
            name: self.name.clone(),
            ty: self.child.calculate_type(),
            is_nullable: self.child.is_nullable(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Arithmetic {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Arithmetic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arithmetic::Add => "+",
            Arithmetic::Subtract => "-",
            Arithmetic::Multiply => "*",
            Arithmetic::Divide => "/",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArithmeticExpr {
    pub op: Arithmetic,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScalarFunction {
    pub name: SmolStr,
    pub args: Vec<Expression>,
    pub ty: Type,
}

/// Ordinary aggregate function call. Inside a [`WindowExpr`] the same
/// call is a window aggregate.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AggregateFunction {
    pub kind: AggregateKind,
    pub args: Vec<Expression>,
    pub is_distinct: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupingFunction {
    pub kind: GroupingKind,
    pub args: Vec<Expression>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum OrderType {
    Asc,
    Desc,
}

/// Argument with a sort direction, e.g. `group_concat(a order by a desc)`
/// or a window order key. Its value is the value of the child.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OrderedExpr {
    pub child: Box<Expression>,
    pub order: OrderType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum FrameKind {
    Rows,
    Range,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum BoundType {
    UnboundedPreceding,
    Preceding(u64),
    CurrentRow,
    Following(u64),
    UnboundedFollowing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct WindowFrame {
    pub kind: FrameKind,
    pub start: BoundType,
    pub end: Option<BoundType>,
}

/// Function evaluated over a window, e.g. `sum(a) over (partition by b)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WindowExpr {
    pub function: Box<Expression>,
    pub partition_by: Vec<Expression>,
    pub order_by: Vec<Expression>,
    pub frame: Option<WindowFrame>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expression {
    Column(Column),
    VirtualColumn(VirtualColumn),
    Alias(Alias),
    Constant(Value),
    Arithmetic(ArithmeticExpr),
    ScalarFunction(ScalarFunction),
    AggregateFunction(AggregateFunction),
    GroupingFunction(GroupingFunction),
    Window(WindowExpr),
    Ordered(OrderedExpr),
}

impl From<Column> for Expression {
    fn from(column: Column) -> Self {
        Expression::Column(column)
    }
}

impl From<VirtualColumn> for Expression {
    fn from(column: VirtualColumn) -> Self {
        Expression::VirtualColumn(column)
    }
}

impl From<Alias> for Expression {
    fn from(alias: Alias) -> Self {
        Expression::Alias(alias)
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Constant(value)
    }
}

impl From<ArithmeticExpr> for Expression {
    fn from(expr: ArithmeticExpr) -> Self {
        Expression::Arithmetic(expr)
    }
}

impl From<ScalarFunction> for Expression {
    fn from(function: ScalarFunction) -> Self {
        Expression::ScalarFunction(function)
    }
}

impl From<AggregateFunction> for Expression {
    fn from(function: AggregateFunction) -> Self {
        Expression::AggregateFunction(function)
    }
}

impl From<GroupingFunction> for Expression {
    fn from(function: GroupingFunction) -> Self {
        Expression::GroupingFunction(function)
    }
}

impl From<WindowExpr> for Expression {
    fn from(window: WindowExpr) -> Self {
        Expression::Window(window)
    }
}

impl From<OrderedExpr> for Expression {
    fn from(expr: OrderedExpr) -> Self {
        Expression::Ordered(expr)
    }
}

fn next_child(children: &mut impl Iterator<Item = Expression>) -> Result<Expression, Error> {
    children.next().ok_or_else(|| {
        Error::NotFound(
            Entity::Expression,
            "children list is shorter than expected".to_smolstr(),
        )
    })
}

impl Expression {
    /// Direct children in a fixed order. For a window these are the
    /// function, the partition keys and the order keys.
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Column(_) | Expression::VirtualColumn(_) | Expression::Constant(_) => {
                Vec::new()
            }
            Expression::Alias(Alias { child, .. }) | Expression::Ordered(OrderedExpr { child, .. }) => {
                vec![child.as_ref()]
            }
            Expression::Arithmetic(ArithmeticExpr { left, right, .. }) => {
                vec![left.as_ref(), right.as_ref()]
            }
            Expression::ScalarFunction(ScalarFunction { args, .. })
            | Expression::AggregateFunction(AggregateFunction { args, .. })
            | Expression::GroupingFunction(GroupingFunction { args, .. }) => args.iter().collect(),
            Expression::Window(WindowExpr {
                function,
                partition_by,
                order_by,
                ..
            }) => iter::once(function.as_ref())
                .chain(partition_by.iter())
                .chain(order_by.iter())
                .collect(),
        }
    }

    /// Rebuilds the node over new children (in the order of [`Self::children`]).
    ///
    /// # Errors
    /// - the number of children differs from the current one
    pub fn with_children(&self, children: Vec<Expression>) -> Result<Expression, Error> {
        let expected = self.children().len();
        if children.len() != expected {
            return Err(Error::UnexpectedNumberOfValues(format_smolstr!(
                "expression {self} expects {expected} children, got {}",
                children.len()
            )));
        }
        let mut children = children.into_iter();
        let expr = match self {
            Expression::Column(_) | Expression::VirtualColumn(_) | Expression::Constant(_) => {
                self.clone()
            }
            Expression::Alias(Alias { id, name, .. }) => Expression::Alias(Alias {
                id: *id,
                name: name.clone(),
                child: Box::new(next_child(&mut children)?),
            }),
            Expression::Ordered(OrderedExpr { order, .. }) => Expression::Ordered(OrderedExpr {
                child: Box::new(next_child(&mut children)?),
                order: *order,
            }),
            Expression::Arithmetic(ArithmeticExpr { op, .. }) => {
                let left = next_child(&mut children)?;
                let right = next_child(&mut children)?;
                Expression::Arithmetic(ArithmeticExpr {
                    op: *op,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            Expression::ScalarFunction(ScalarFunction { name, ty, .. }) => {
                Expression::ScalarFunction(ScalarFunction {
                    name: name.clone(),
                    args: children.collect(),
                    ty: *ty,
                })
            }
            Expression::AggregateFunction(AggregateFunction {
                kind, is_distinct, ..
            }) => Expression::AggregateFunction(AggregateFunction {
                kind: *kind,
                args: children.collect(),
                is_distinct: *is_distinct,
            }),
            Expression::GroupingFunction(GroupingFunction { kind, .. }) => {
                Expression::GroupingFunction(GroupingFunction {
                    kind: *kind,
                    args: children.collect(),
                })
            }
            Expression::Window(WindowExpr {
                partition_by,
                frame,
                ..
            }) => {
                let function = next_child(&mut children)?;
                let partition_by = children.by_ref().take(partition_by.len()).collect();
                let order_by = children.collect();
                Expression::Window(WindowExpr {
                    function: Box::new(function),
                    partition_by,
                    order_by,
                    frame: *frame,
                })
            }
        };
        Ok(expr)
    }

    /// Top-down rewrite. The rule is applied to a node before its children:
    /// when it returns a replacement, the replacement is used as is and the
    /// original subtree is not visited any further.
    ///
    /// # Errors
    /// - the rule fails
    pub fn transform_down<F>(&self, rule: &mut F) -> Result<Expression, Error>
    where
        F: FnMut(&Expression) -> Result<Option<Expression>, Error>,
    {
        if let Some(replacement) = rule(self)? {
            return Ok(replacement);
        }
        let children = self.children();
        if children.is_empty() {
            return Ok(self.clone());
        }
        let new_children = children
            .into_iter()
            .map(|child| child.transform_down(rule))
            .collect::<Result<Vec<_>, _>>()?;
        self.with_children(new_children)
    }

    /// Pre-order traversal of the whole tree.
    pub fn walk<'e, F>(&'e self, visitor: &mut F)
    where
        F: FnMut(&'e Expression),
    {
        visitor(self);
        for child in self.children() {
            child.walk(visitor);
        }
    }

    /// Plain (non-virtual) columns referenced by the tree, in pre-order.
    /// The same column may be returned more than once.
    pub fn columns(&self) -> Vec<&Column> {
        let mut columns = Vec::new();
        self.walk(&mut |expr| {
            if let Expression::Column(column) = expr {
                columns.push(column);
            }
        });
        columns
    }

    /// Aggregate calls that are not window functions themselves.
    ///
    /// For `sum(sum(a)) over (partition by b)` only the inner `sum(a)`
    /// is returned. Nested aggregates are not returned separately
    /// from the aggregate containing them.
    pub fn non_window_aggregates(&self) -> Vec<&AggregateFunction> {
        let mut aggregates = Vec::new();
        self.collect_non_window_aggregates(&mut aggregates);
        aggregates
    }

    fn collect_non_window_aggregates<'e>(&'e self, acc: &mut Vec<&'e AggregateFunction>) {
        match self {
            Expression::AggregateFunction(function) => acc.push(function),
            Expression::Window(WindowExpr {
                function,
                partition_by,
                order_by,
                ..
            }) => {
                for child in function
                    .children()
                    .into_iter()
                    .chain(partition_by.iter())
                    .chain(order_by.iter())
                {
                    child.collect_non_window_aggregates(acc);
                }
            }
            _ => {
                for child in self.children() {
                    child.collect_non_window_aggregates(acc);
                }
            }
        }
    }

    /// Strips the sort direction from an ordered argument.
    #[must_use]
    pub fn unwrap_ordered(&self) -> &Expression {
        match self {
            Expression::Ordered(OrderedExpr { child, .. }) => child,
            _ => self,
        }
    }

    /// The column produced by a named expression (column, virtual column
    /// or alias). Other expressions have no name.
    #[must_use]
    pub fn to_column(&self) -> Option<Column> {
        match self {
            Expression::Column(column) => Some(column.clone()),
            Expression::VirtualColumn(VirtualColumn { column, .. }) => Some(column.clone()),
            Expression::Alias(alias) => Some(alias.to_column()),
            _ => None,
        }
    }

    #[must_use]
    pub fn calculate_type(&self) -> Type {
        match self {
            Expression::Column(Column { ty, .. })
            | Expression::VirtualColumn(VirtualColumn {
                column: Column { ty, .. },
                ..
            })
            | Expression::ScalarFunction(ScalarFunction { ty, .. }) => *ty,
            Expression::Alias(Alias { child, .. })
            | Expression::Ordered(OrderedExpr { child, .. })
            | Expression::Window(WindowExpr {
                function: child, ..
            }) => child.calculate_type(),
            Expression::Constant(value) => value.get_type(),
            Expression::Arithmetic(ArithmeticExpr { left, right, .. }) => left
                .calculate_type()
                .arithmetic_result(right.calculate_type()),
            Expression::AggregateFunction(AggregateFunction { kind, args, .. }) => {
                kind.get_type(args).unwrap_or(Type::Unknown)
            }
            Expression::GroupingFunction(_) => Type::Integer,
        }
    }

    /// Scalar functions are considered nullable when any argument is.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        match self {
            Expression::Column(Column { is_nullable, .. })
            | Expression::VirtualColumn(VirtualColumn {
                column: Column { is_nullable, .. },
                ..
            }) => *is_nullable,
            Expression::Alias(Alias { child, .. })
            | Expression::Ordered(OrderedExpr { child, .. })
            | Expression::Window(WindowExpr {
                function: child, ..
            }) => child.is_nullable(),
            Expression::Constant(value) => value.is_null(),
            Expression::Arithmetic(ArithmeticExpr { left, right, .. }) => {
                left.is_nullable() || right.is_nullable()
            }
            Expression::ScalarFunction(ScalarFunction { args, .. }) => {
                args.iter().any(Expression::is_nullable)
            }
            Expression::AggregateFunction(AggregateFunction { kind, .. }) => kind.is_nullable(),
            Expression::GroupingFunction(_) => false,
        }
    }
}

impl Display for BoundType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BoundType::UnboundedPreceding => write!(f, "unbounded preceding"),
            BoundType::Preceding(offset) => write!(f, "{offset} preceding"),
            BoundType::CurrentRow => write!(f, "current row"),
            BoundType::Following(offset) => write!(f, "{offset} following"),
            BoundType::UnboundedFollowing => write!(f, "unbounded following"),
        }
    }
}

impl Display for WindowFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FrameKind::Rows => "rows",
            FrameKind::Range => "range",
        };
        match &self.end {
            Some(end) => write!(f, "{kind} between {} and {end}", self.start),
            None => write!(f, "{kind} {}", self.start),
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Column(Column { name, .. })
            | Expression::VirtualColumn(VirtualColumn {
                column: Column { name, .. },
                ..
            }) => write!(f, "{name}"),
            Expression::Alias(Alias { name, child, .. }) => write!(f, "{child} -> \"{name}\""),
            Expression::Constant(value) => write!(f, "{value}"),
            Expression::Arithmetic(ArithmeticExpr { op, left, right }) => {
                write!(f, "({left} {} {right})", op.as_str())
            }
            Expression::ScalarFunction(ScalarFunction { name, args, .. }) => {
                write!(f, "{name}({})", args.iter().join(", "))
            }
            Expression::AggregateFunction(AggregateFunction {
                kind,
                args,
                is_distinct,
            }) => {
                if args.is_empty() {
                    return write!(f, "{kind}(*)");
                }
                let distinct = if *is_distinct { "distinct " } else { "" };
                write!(f, "{kind}({distinct}{})", args.iter().join(", "))
            }
            Expression::GroupingFunction(GroupingFunction { kind, args }) => {
                write!(f, "{kind}({})", args.iter().join(", "))
            }
            Expression::Window(WindowExpr {
                function,
                partition_by,
                order_by,
                frame,
            }) => {
                let mut parts = Vec::with_capacity(3);
                if !partition_by.is_empty() {
                    parts.push(format!("partition by {}", partition_by.iter().join(", ")));
                }
                if !order_by.is_empty() {
                    parts.push(format!("order by {}", order_by.iter().join(", ")));
                }
                if let Some(frame) = frame {
                    parts.push(frame.to_string());
                }
                write!(f, "{function} over ({})", parts.join(" "))
            }
            Expression::Ordered(OrderedExpr { child, order }) => {
                let order = match order {
                    OrderType::Asc => "asc",
                    OrderType::Desc => "desc",
                };
                write!(f, "{child} {order}")
            }
        }
    }
}

#[cfg(test)]
mod tests;
