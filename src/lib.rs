//! # apiscout
//!
//! Discover the hidden backend data API behind a web page using
//! vision-capable LLM guidance, then replay it with pagination-aware
//! windowing: the same logical dataset, fetched later at arbitrary
//! offsets/limits, without re-running the browser.
//!
//! ## How it works
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         analyze(url, query)                      │
//! │  screenshot → vision LLM → browser action, until a captured      │
//! │  response matches the data the page shows                        │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────────────┴──────────┬───────────────────────┐
//! │ Classify │ Cursor patterns              │ Extraction codegen    │
//! │ page /   │ sub-cursors bracketed by     │ LLM-written extract() │
//! │ limit /  │ before/after delimiters,     │ validated by running  │
//! │ offset / │ re-extracted from each       │ it in a QuickJS       │
//! │ cursor   │ response                     │ sandbox               │
//! └──────────┴──────────────────┬───────────┴───────────────────────┘
//!                               │
//! ┌─────────────────────────────┴────────────────────────────────────┐
//! │                        Source (persisted JSON)                   │
//! │  generate_data(limit, offset) → strategy generator → tracker →   │
//! │  lazy stream of record batches                                   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use apiscout::{analyze, AnalyzeRequest, ReplayClient, Source};
//!
//! # async fn example(driver: &mut dyn apiscout::BrowserDriver,
//! #                  llm: &dyn apiscout::LlmClient,
//! #                  buffer: apiscout::ResponseBuffer) {
//! let source = analyze(driver, llm, buffer, AnalyzeRequest {
//!     url: "https://example.com/companies".into(),
//!     query: "company listings".into(),
//!     output_schema: Default::default(),
//!     max_steps: 20,
//!     timeout: std::time::Duration::from_secs(30),
//! })
//! .await
//! .expect("no matching data API found");
//!
//! let client = ReplayClient::new();
//! let mut stream = source
//!     .generate_data(&client, 50, 100, Default::default())
//!     .unwrap();
//! while let Some(batch) = stream.next_batch().await {
//!     for record in batch.unwrap() {
//!         println!("{record}");
//!     }
//! }
//! # }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Captured requests, responses, and the response buffer
pub mod capture;

/// Delimiter pattern matching
pub mod pattern;

/// LLM client interface
pub mod llm;

/// Browser driver interface
pub mod browser;

/// HTTP replay client
pub mod http;

/// Sandboxed code generation
pub mod codegen;

/// Pagination inference and replay
pub mod pagination;

/// Replayable sources
pub mod source;

/// Page analysis
pub mod analyzer;

/// Runtime configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use analyzer::{analyze, AnalyzeRequest};
pub use browser::BrowserDriver;
pub use capture::{CapturedRequest, CapturedResponse, ResponseBuffer, ResponseSink};
pub use error::{Error, Result};
pub use http::ReplayClient;
pub use llm::LlmClient;
pub use source::{DataStream, Source};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
