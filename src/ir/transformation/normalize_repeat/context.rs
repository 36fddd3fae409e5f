//! Substitution of pushed-down expressions with columns.

use crate::errors::Error;
use crate::ir::expression::{Alias, Column, ColumnId, Expression};
use crate::ir::helpers::RepeatableState;
use crate::ir::relation::Repeat;
use crate::utils::{OrderedMap, OrderedSet};

/// How a single pushed-down expression is replaced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Triplet {
    /// Expression of the original repeat node.
    pub original: Expression,
    /// Column read by the repeat and aggregate nodes instead of `original`.
    pub replacement: Column,
    /// Named expression the child projection evaluates to produce `replacement`.
    pub pushed: Expression,
}

impl Triplet {
    fn new(original: &Expression, existing: Option<&Alias>) -> Self {
        let (replacement, pushed) = match (original, existing) {
            (Expression::Column(column), _) => (column.clone(), original.clone()),
            (_, Some(alias)) => (alias.to_column(), Expression::Alias(alias.clone())),
            (Expression::Alias(alias), None) => (alias.to_column(), original.clone()),
            (_, None) => {
                let alias = Alias::from_expr(original.clone());
                (alias.to_column(), Expression::Alias(alias))
            }
        };
        Triplet {
            original: original.clone(),
            replacement,
            pushed,
        }
    }

    /// Rows of the grouping sets that do not contain the expression get NULL.
    fn with_nullable_replacement(mut self) -> Self {
        self.replacement.is_nullable = true;
        self
    }
}

/// Mapping from every pushed-down expression to its [`Triplet`],
/// in the order the expressions were collected.
#[derive(Clone, Debug)]
pub struct NormalizationContext {
    triplets: OrderedMap<Expression, Triplet>,
}

impl NormalizationContext {
    /// Builds triplets for the pushed-down expressions of the repeat node.
    /// Aliases already present in the repeat output are reused, so the
    /// same expression is not evaluated twice under different names.
    /// Virtual columns are not pushed down.
    #[must_use]
    pub fn build(repeat: &Repeat, sources: &OrderedSet<Expression>) -> Self {
        let mut existing: OrderedMap<Expression, Alias> = OrderedMap::with_hasher(RepeatableState);
        for expr in &repeat.output {
            expr.walk(&mut |node| {
                if let Expression::Alias(alias) = node {
                    if !existing.contains_key(alias.child.as_ref()) {
                        existing.insert((*alias.child).clone(), alias.clone());
                    }
                }
            });
        }

        let grouping_exprs = repeat.flattened_grouping_exprs();
        let mut triplets = OrderedMap::with_capacity_and_hasher(sources.len(), RepeatableState);
        for source in sources {
            if matches!(source, Expression::VirtualColumn(_)) {
                continue;
            }
            let triplet = Triplet::new(source, existing.get(source));
            let triplet = if grouping_exprs.contains(source) {
                triplet.with_nullable_replacement()
            } else {
                triplet
            };
            triplets.insert(source.clone(), triplet);
        }
        NormalizationContext { triplets }
    }

    #[must_use]
    pub fn get(&self, expr: &Expression) -> Option<&Triplet> {
        self.triplets.get(expr)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.triplets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triplets.is_empty()
    }

    /// Replaces every outermost subtree that is a key of the context
    /// with its replacement column.
    ///
    /// # Errors
    /// - the expression tree is malformed
    pub fn substitute(&self, expr: &Expression) -> Result<Expression, Error> {
        self.substitute_with(expr, &mut |_, _| Ok(None))
    }

    /// Same as [`Self::substitute`], but the hook is consulted first at
    /// every node. A node replaced by the hook is not descended into.
    ///
    /// # Errors
    /// - the hook fails
    /// - the expression tree is malformed
    pub fn substitute_with<H>(&self, expr: &Expression, hook: &mut H) -> Result<Expression, Error>
    where
        H: FnMut(&NormalizationContext, &Expression) -> Result<Option<Expression>, Error>,
    {
        expr.transform_down(&mut |node| {
            if let Some(replacement) = hook(self, node)? {
                return Ok(Some(replacement));
            }
            Ok(self
                .triplets
                .get(node)
                .map(|triplet| Expression::Column(triplet.replacement.clone())))
        })
    }

    /// Named expressions the child projection has to produce.
    /// Each produced column appears once.
    #[must_use]
    pub fn materialized_projections(&self) -> Vec<Expression> {
        let mut produced: OrderedSet<ColumnId> =
            OrderedSet::with_capacity_and_hasher(self.triplets.len(), RepeatableState);
        self.triplets
            .values()
            .filter(|triplet| {
                triplet
                    .pushed
                    .to_column()
                    .map_or(true, |column| produced.insert(column.id))
            })
            .map(|triplet| triplet.pushed.clone())
            .collect()
    }
}
