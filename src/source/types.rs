//! Source data model

use crate::capture::{CapturedRequest, Preprocessor};
use crate::codegen::{run_function, APPLY_PARAMS_ENTRY, EXTRACT_ENTRY};
use crate::error::{Error, Result};
use crate::pagination::PaginationInfo;
use crate::types::{JsonValue, ValueMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

// ============================================================================
// Request Detail
// ============================================================================

/// The request half of a source: template, pagination parameters, and
/// how to apply named values to the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDetail {
    /// The captured request template
    pub request: CapturedRequest,
    /// Inferred pagination parameters, absent for single-page sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
    /// Declared business knobs (sort, filter) with their captured values
    #[serde(default)]
    pub dynamic_parameters: ValueMap,
    /// Generated `apply_parameters(request, params)` source; absent ⇒
    /// built-in key substitution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_code: Option<String>,
}

impl RequestDetail {
    /// Create a request detail with no pagination and no knobs
    pub fn new(request: CapturedRequest) -> Self {
        Self {
            request,
            pagination: None,
            dynamic_parameters: ValueMap::new(),
            parameter_code: None,
        }
    }

    /// Produce the parameterized request for one replay attempt.
    ///
    /// Uses the generated applier when present; a failure of previously
    /// validated code falls back to built-in substitution rather than
    /// aborting the replay.
    pub async fn apply_parameters(&self, params: &[(String, JsonValue)]) -> Result<CapturedRequest> {
        if let Some(code) = &self.parameter_code {
            let request_json = serde_json::to_value(&self.request)?;
            let params_json: JsonValue = params
                .iter()
                .cloned()
                .collect::<serde_json::Map<_, _>>()
                .into();

            match run_function(code, APPLY_PARAMS_ENTRY, vec![request_json, params_json]).await {
                Ok(value) => match serde_json::from_value::<CapturedRequest>(value) {
                    Ok(request) => return Ok(request),
                    Err(e) => warn!("parameter code returned a bad request ({e}), using built-in"),
                },
                Err(e) => warn!("parameter code failed ({e}), using built-in"),
            }
        }
        Ok(self.request.parameterized(params))
    }
}

// ============================================================================
// Response Detail
// ============================================================================

/// The response half of a source: how to turn a body into records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDetail {
    /// Transform narrowing the body before extraction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessor: Option<Preprocessor>,
    /// Generated `extract(text)` source; absent ⇒ whole-batch passthrough
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_code: Option<String>,
    /// Page size observed on the sample response, used as the
    /// pagination-size fallback
    #[serde(default)]
    pub default_entity_count: usize,
}

impl ResponseDetail {
    /// An empty detail: no preprocessor, no code, unknown page size
    pub fn empty() -> Self {
        Self {
            preprocessor: None,
            extraction_code: None,
            default_entity_count: 0,
        }
    }

    /// Extract the record batch from a response body.
    ///
    /// Without generated code the whole batch passes through: a JSON
    /// array becomes its elements, any other JSON value a single-element
    /// batch. A body that is not JSON fails extraction.
    pub async fn extract_data(&self, body: &str) -> Result<Vec<JsonValue>> {
        let text = match &self.preprocessor {
            Some(pre) => pre.apply(body).unwrap_or_else(|| body.to_string()),
            None => body.to_string(),
        };

        match &self.extraction_code {
            Some(code) => {
                let result =
                    run_function(code, EXTRACT_ENTRY, vec![JsonValue::String(text)]).await?;
                result
                    .as_array()
                    .cloned()
                    .ok_or_else(|| Error::extraction("extraction code did not return a list"))
            }
            None => match serde_json::from_str::<JsonValue>(&text) {
                Ok(JsonValue::Array(records)) => Ok(records),
                Ok(other) => Ok(vec![other]),
                Err(e) => Err(Error::extraction(format!("body is not JSON: {e}"))),
            },
        }
    }
}

// ============================================================================
// Source
// ============================================================================

/// A discovered, replayable data API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Page the API was discovered behind
    pub target_url: String,
    /// The query that drove discovery
    pub query: String,
    /// When the analysis completed
    pub created_at: DateTime<Utc>,
    /// Request template and parameter application
    pub request_detail: RequestDetail,
    /// Response extraction
    pub response_detail: ResponseDetail,
}

impl Source {
    /// Assemble a source
    pub fn new(
        target_url: impl Into<String>,
        query: impl Into<String>,
        request_detail: RequestDetail,
        response_detail: ResponseDetail,
    ) -> Self {
        Self {
            target_url: target_url.into(),
            query: query.into(),
            created_at: Utc::now(),
            request_detail,
            response_detail,
        }
    }

    /// Serialize to the persisted JSON form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse the persisted JSON form (re-validating invariants)
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the persisted form to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load a source from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}
