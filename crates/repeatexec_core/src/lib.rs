//! Row expansion operator for GROUPING SETS, ROLLUP and CUBE, along with the
//! row batch and runtime pieces needed to drive it.

pub mod arrays;
pub mod buffer;
pub mod config;
pub mod execution;
pub mod explain;
pub mod expr;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testutil;
