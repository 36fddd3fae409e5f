//! Plan tree transformation module.
//!
//! Contains rule-based transformations.

pub mod normalize_repeat;

use crate::errors::Error;
use crate::tlog;

use super::relation::Relational;
use super::Plan;

impl Plan {
    /// Replaces every repeat node of the plan with the normalized
    /// `Aggregate -> Repeat -> Projection` stack. Each repeat node of the
    /// original plan is normalized exactly once, nested ones first.
    ///
    /// # Errors
    /// - a repeat node has too many grouping set items
    /// - the plan is malformed
    pub fn normalize_repeats(self) -> Result<Plan, Error> {
        let Plan { top, options } = self;
        let mut normalized: usize = 0;
        let top = top.transform_up(&mut |node| match node {
            Relational::Repeat(repeat) => {
                let aggregate = repeat.normalize(&options)?;
                normalized += 1;
                Ok(Relational::Aggregate(aggregate))
            }
            other => Ok(other),
        })?;
        if normalized > 0 {
            tlog!(Debug, "normalized repeat nodes"; "count" => normalized);
        }
        Ok(Plan { top, options })
    }
}
