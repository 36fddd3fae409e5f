//! Normalization of grouping sets for a SQL planner.
//!
//! A `GROUP BY GROUPING SETS / ROLLUP / CUBE` query is represented by a
//! repeat node. [`ir::Plan::optimize`] rewrites every repeat node into an
//! aggregate over a repeat whose grouping sets reference plain columns,
//! with the expressions evaluated by a projection below them.

pub mod errors;
pub mod ir;
pub mod log;
pub mod utils;
