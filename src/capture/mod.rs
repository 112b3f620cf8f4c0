//! Captured network traffic
//!
//! # Overview
//!
//! Types for requests and responses observed while the browser drives the
//! target page, plus the buffer the step loop drains. A `CapturedRequest`
//! is immutable once captured; replays operate on parameterized copies.

mod buffer;
mod types;

pub use buffer::{response_channel, ResponseBuffer, ResponseSink};
pub use types::{CapturedRequest, CapturedResponse, PostData, Preprocessor};
