//! Report writers.
//!
//! - [`report`]: The numbered plain-text report printed to stdout
//! - [`json`]: An optional JSON copy of the same report

pub mod json;
pub mod report;
