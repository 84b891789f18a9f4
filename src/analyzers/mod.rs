//! Result aggregation and grade classification.
//!
//! This module classifies result codes against the grade table, groups
//! records by programme, subject, ethnicity and grade, and computes the
//! pass, excellence and failure rates and EFTS totals for a filtered record
//! set. It also lists the programmes and subjects available for filtering.

pub mod aggregate;
pub mod catalog;
pub mod grade;
pub mod types;
pub mod utility;
