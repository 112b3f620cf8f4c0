//! Error types for apiscout
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! The variants follow the failure taxonomy of the replay engine:
//! transport failures (typed HTTP status), inference failures (LLM output
//! that does not validate), extraction/pattern failures, browser action
//! failures, and contract violations raised before any I/O.

use thiserror::Error;

/// The main error type for apiscout
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Inference Errors
    // ============================================================================
    #[error("Inference failed: {message}")]
    Inference { message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // ============================================================================
    // Extraction / Pattern Errors
    // ============================================================================
    #[error("Extraction failed: {message}")]
    Extraction { message: String },

    #[error("Cursor pattern failed: {message}")]
    CursorPattern { message: String },

    #[error("Generated code rejected: {message}")]
    CodeValidation { message: String },

    #[error("Sandbox execution failed: {message}")]
    Sandbox { message: String },

    // ============================================================================
    // Browser Errors
    // ============================================================================
    #[error("Browser action failed: {message}")]
    Browser { message: String },

    // ============================================================================
    // Pagination Errors
    // ============================================================================
    #[error("Invalid pagination info: {message}")]
    InvalidPagination { message: String },

    // ============================================================================
    // Contract Violations
    // ============================================================================
    #[error("Unknown dynamic parameter: {name}")]
    UnknownParameter { name: String },

    #[error("Negative {field}: {value}")]
    NegativeWindow { field: &'static str, value: i64 },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create an inference error
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference {
            message: message.into(),
        }
    }

    /// Create an extraction error
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }

    /// Create a cursor pattern error
    pub fn cursor_pattern(message: impl Into<String>) -> Self {
        Self::CursorPattern {
            message: message.into(),
        }
    }

    /// Create a code validation error
    pub fn code_validation(message: impl Into<String>) -> Self {
        Self::CodeValidation {
            message: message.into(),
        }
    }

    /// Create a sandbox error
    pub fn sandbox(message: impl Into<String>) -> Self {
        Self::Sandbox {
            message: message.into(),
        }
    }

    /// Create a browser error
    pub fn browser(message: impl Into<String>) -> Self {
        Self::Browser {
            message: message.into(),
        }
    }

    /// Create an invalid pagination error
    pub fn invalid_pagination(message: impl Into<String>) -> Self {
        Self::InvalidPagination {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// The HTTP status carried by this error, if it is a status error
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// A `400` response means the API rejected a parameter value; the
    /// translator interprets this as "try the fallback limit once".
    pub fn is_parameter_rejected(&self) -> bool {
        self.status() == Some(400)
    }

    /// Check if this error is a contract violation (caller programming
    /// error raised before any I/O)
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::UnknownParameter { .. } | Error::NegativeWindow { .. }
        )
    }

    /// Check if this error is retryable at the transport level
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for apiscout
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
