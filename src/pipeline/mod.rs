//! Filter, aggregate and chart stages.
//!
//! Every stage is a pure function of its input table: callers rebuild the
//! whole chain from the raw dataset whenever a selection changes.

pub mod aggregate;
pub mod chart;
pub mod filter;
pub mod types;
pub mod utility;
