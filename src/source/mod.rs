//! Replayable sources
//!
//! # Overview
//!
//! A `Source` is the one long-lived artifact of an analysis: the captured
//! request template, the inferred pagination parameters, the generated
//! extraction/parameter code, and enough metadata to re-fetch the same
//! logical dataset at any `(limit, offset)` window without a browser.
//! Its persisted form is plain JSON; the two code strings are the only
//! executable state.

mod replay;
mod types;

pub use replay::DataStream;
pub use types::{RequestDetail, ResponseDetail, Source};
