//! Pagination inference and replay
//!
//! # Overview
//!
//! Everything between "we captured one data request" and "we can fetch an
//! arbitrary `(limit, offset)` window of the same dataset":
//!
//! - `classifier` infers which request fields drive pagination (and which
//!   are business knobs) from a single candidate request plus an LLM
//!   judgment.
//! - `cursor` reverse-engineers opaque cursor tokens into delimiter
//!   patterns so the next page's token can be re-extracted from each
//!   response.
//! - `tracker` maintains the global read position and slices raw page
//!   batches into the caller's requested window.
//! - `translator` picks one of four generation strategies from the
//!   inferred parameter set and drives repeated requests to satisfy the
//!   window.

mod classifier;
mod cursor;
mod tracker;
mod translator;
mod types;

pub use classifier::{
    candidate_parameters, detect_pagination_keys, infer_pagination, ClassifiedKeys, InferredPagination,
};
pub use cursor::{is_potential_cursor, start_cursor_candidates, StartCursor};
pub use tracker::LimitOffsetTracker;
pub use translator::{build_strategy, PageGenerator, ReplayContext, Window};
pub use types::{CursorParameter, NumberParameter, PaginationInfo, SelectedStrategy, Strategy};

#[cfg(test)]
mod tests;
