//! LLM-driven code generation with execution-based validation
//!
//! # Overview
//!
//! The analyzer asks the LLM for small JavaScript functions (one that
//! extracts records from a response body, one that applies named
//! parameter values to a request) and only accepts code that actually
//! runs and validates inside the QuickJS sandbox. Generated code is a
//! pure function: no filesystem, no network, no host bindings.

mod builder;
mod runtime;

pub use builder::{
    build_applier, build_extractor, parse_code_block, GeneratedApplier, GeneratedExtractor,
    APPLY_PARAMS_ENTRY, CODE_ATTEMPTS, EXTRACT_ENTRY,
};
pub use runtime::{run_function, MAX_EXECUTION_MS, MAX_MEMORY_BYTES};
