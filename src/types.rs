//! Common types used throughout apiscout
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

/// Generic key-value map with string keys and JSON values
pub type ValueMap = HashMap<String, JsonValue>;

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::PATCH => reqwest::Method::PATCH,
            Method::DELETE => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
            Method::DELETE => "DELETE",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Request Type
// ============================================================================

/// How a captured request was produced by the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// Background data request issued by page scripts
    #[default]
    Ajax,
    /// Server-side rendered document request
    Ssr,
}

impl RequestType {
    /// Whether responses of this type carry an HTML document body
    pub fn is_html(&self) -> bool {
        matches!(self, Self::Ssr)
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Backoff strategy for transport-level retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Same delay every attempt
    Constant,
    /// Delay grows linearly with attempt number
    Linear,
    /// Delay doubles with each attempt
    #[default]
    Exponential,
}

// ============================================================================
// Record Schema
// ============================================================================

/// Field type for the output record schema handed to the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Int,
    Float,
    String,
    Bool,
    /// Any JSON value accepted
    Any,
}

impl FieldType {
    /// Check a JSON value against this field type
    pub fn accepts(&self, value: &JsonValue) -> bool {
        match self {
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_number(),
            FieldType::String => value.is_string(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Any => true,
        }
    }
}

/// Schema of one output record: field name → expected type.
///
/// Records produced by generated extraction code are validated against
/// this before a `Source` is accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Expected fields and their types
    pub fields: Vec<(String, FieldType)>,
}

impl RecordSchema {
    /// Create an empty schema (accepts any record shape)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field to the schema
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push((name.into(), ty));
        self
    }

    /// Validate a single record against the schema
    pub fn validate_record(&self, record: &JsonValue) -> bool {
        let Some(obj) = record.as_object() else {
            return self.fields.is_empty();
        };
        self.fields
            .iter()
            .all(|(name, ty)| obj.get(name).is_some_and(|v| ty.accepts(v)))
    }

    /// Validate a batch of records; all must conform
    pub fn validate_batch(&self, records: &[JsonValue]) -> bool {
        records.iter().all(|r| self.validate_record(r))
    }
}
