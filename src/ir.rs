//! Intermediate representation (IR) module.
//!
//! Contains the logical plan tree and helpers.

use crate::errors::Error;

use self::options::Options;
use self::relation::Relational;

pub mod aggregates;
pub mod explain;
pub mod expression;
pub mod function;
pub mod helpers;
pub mod options;
pub mod relation;
pub mod transformation;
pub mod types;
pub mod value;

/// Logical plan: the top relational node and the options
/// the transformations run with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    top: Relational,
    pub options: Options,
}

impl Plan {
    #[must_use]
    pub fn new(top: Relational) -> Self {
        Plan::with_options(top, Options::default())
    }

    #[must_use]
    pub fn with_options(top: Relational, options: Options) -> Self {
        Plan { top, options }
    }

    #[must_use]
    pub fn top(&self) -> &Relational {
        &self.top
    }

    #[must_use]
    pub fn into_top(self) -> Relational {
        self.top
    }

    /// Applies the rewrite rules to the whole plan.
    ///
    /// # Errors
    /// - options are invalid
    /// - a rule fails
    pub fn optimize(self) -> Result<Self, Error> {
        self.options.validate()?;
        self.normalize_repeats()
    }

    #[must_use]
    pub fn explain(&self) -> String {
        self.top.explain()
    }
}

#[cfg(test)]
pub(crate) mod tests;
