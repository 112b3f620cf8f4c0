//! Delimiter pattern matching
//!
//! # Overview
//!
//! A `Pattern` is a pair of literal text fragments that bracket a target
//! value inside a larger text blob. Patterns are generated once from a
//! known (haystack, needle) pair and later re-applied to similar but not
//! identical text to re-locate the value's next occurrence, the workhorse
//! behind opaque-cursor extraction.

mod matcher;

pub use matcher::{Pattern, MAX_DELIMITER_LEN};
