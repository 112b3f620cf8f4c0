//! Captured request/response types

use crate::types::{JsonValue, Method, RequestType, StringMap};
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// Post Data
// ============================================================================

/// Body of a captured non-GET request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostData {
    /// Parsed JSON body
    Structured(JsonValue),
    /// Anything that did not parse as JSON
    Raw(String),
}

impl PostData {
    /// Parse a raw body string, keeping it raw if it is not JSON
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str::<JsonValue>(body) {
            Ok(value) if value.is_object() || value.is_array() => Self::Structured(value),
            _ => Self::Raw(body.to_string()),
        }
    }

    /// Serialized body to send over the wire
    pub fn to_body_string(&self) -> String {
        match self {
            Self::Structured(value) => value.to_string(),
            Self::Raw(raw) => raw.clone(),
        }
    }

    /// Flat view of top-level structured fields as strings
    pub fn flat_fields(&self) -> Vec<(String, String)> {
        match self {
            Self::Structured(JsonValue::Object(map)) => map
                .iter()
                .map(|(k, v)| (k.clone(), json_to_plain_string(v)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

// ============================================================================
// Captured Request
// ============================================================================

/// A network request observed during page analysis.
///
/// Immutable once captured: replay attempts call [`CapturedRequest::parameterized`]
/// to obtain a copy with pagination/dynamic values applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL without the query string
    pub url: String,
    /// How the page produced this request
    pub request_type: RequestType,
    /// Query parameters in capture order, keys unique
    pub queries: Vec<(String, String)>,
    /// Request headers
    pub headers: StringMap,
    /// Request body, if any
    pub post_data: Option<PostData>,
}

impl CapturedRequest {
    /// Create a captured request with no parameters
    pub fn new(method: Method, url: impl Into<String>, request_type: RequestType) -> Self {
        Self {
            method,
            url: url.into(),
            request_type,
            queries: Vec::new(),
            headers: StringMap::new(),
            post_data: None,
        }
    }

    /// Add a query parameter, replacing an existing key in place
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_query_in_place(&key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the body
    #[must_use]
    pub fn with_post_data(mut self, data: PostData) -> Self {
        self.post_data = Some(data);
        self
    }

    /// Look up a query value by key
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.queries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All candidate parameter fields: queries plus flat structured body
    /// fields, in capture order
    pub fn all_parameters(&self) -> Vec<(String, String)> {
        let mut params = self.queries.clone();
        if let Some(data) = &self.post_data {
            params.extend(data.flat_fields());
        }
        params
    }

    /// Produce a copy with the named parameter values applied.
    ///
    /// A `null` value removes the parameter. Keys already present in the
    /// query string or the structured body are updated in place; unknown
    /// keys are appended to the query string.
    pub fn parameterized(&self, params: &[(String, JsonValue)]) -> Self {
        let mut copy = self.clone();
        for (key, value) in params {
            if value.is_null() {
                copy.remove_param(key);
            } else {
                copy.set_param(key, value);
            }
        }
        copy
    }

    fn set_query_in_place(&mut self, key: &str, value: String) {
        if let Some(entry) = self.queries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value;
        } else {
            self.queries.push((key.to_string(), value));
        }
    }

    fn set_param(&mut self, key: &str, value: &JsonValue) {
        if self.queries.iter().any(|(k, _)| k == key) {
            self.set_query_in_place(key, json_to_plain_string(value));
            return;
        }
        if let Some(PostData::Structured(body)) = &mut self.post_data {
            if set_json_field(body, key, value) {
                return;
            }
        }
        self.set_query_in_place(key, json_to_plain_string(value));
    }

    fn remove_param(&mut self, key: &str) {
        self.queries.retain(|(k, _)| k != key);
        if let Some(PostData::Structured(body)) = &mut self.post_data {
            remove_json_field(body, key);
        }
    }
}

/// Set `key` anywhere in a JSON tree, searching top level first, then
/// nested objects. Returns true if an existing field was updated.
fn set_json_field(value: &mut JsonValue, key: &str, new_value: &JsonValue) -> bool {
    let JsonValue::Object(map) = value else {
        return false;
    };
    if let Some(field) = map.get_mut(key) {
        *field = new_value.clone();
        return true;
    }
    for nested in map.values_mut() {
        if set_json_field(nested, key, new_value) {
            return true;
        }
    }
    false
}

/// Remove `key` anywhere in a JSON tree. Returns true if removed.
fn remove_json_field(value: &mut JsonValue, key: &str) -> bool {
    let JsonValue::Object(map) = value else {
        return false;
    };
    if map.remove(key).is_some() {
        return true;
    }
    for nested in map.values_mut() {
        if remove_json_field(nested, key) {
            return true;
        }
    }
    false
}

/// Plain string form of a JSON value for use in a query string
fn json_to_plain_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Preprocessor
// ============================================================================

/// A transform narrowing a raw response body to the sub-region relevant
/// for extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Preprocessor {
    /// Select one container from an HTML body by CSS selector
    CssSelect {
        /// CSS selector of the container element
        selector: String,
    },
}

impl Preprocessor {
    /// Create a CSS container preprocessor
    pub fn css(selector: impl Into<String>) -> Self {
        Self::CssSelect {
            selector: selector.into(),
        }
    }

    /// Apply the transform. Returns `None` when the selector does not
    /// parse or matches nothing, so callers can fall back to the raw body.
    pub fn apply(&self, body: &str) -> Option<String> {
        match self {
            Self::CssSelect { selector } => {
                let parsed = Selector::parse(selector).ok()?;
                let document = Html::parse_document(body);
                let element = document.select(&parsed).next()?;
                Some(element.html())
            }
        }
    }
}

// ============================================================================
// Captured Response
// ============================================================================

/// A response captured for one network event.
///
/// Captured once; the only post-capture mutation is attaching a
/// preprocessor discovered later in the step loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedResponse {
    /// The request that produced this response
    pub request: CapturedRequest,
    /// Raw response body text
    pub body: String,
    /// Optional transform narrowing the body for extraction
    pub preprocessor: Option<Preprocessor>,
    /// When the response arrived
    pub captured_at: DateTime<Utc>,
}

impl CapturedResponse {
    /// Create a captured response
    pub fn new(request: CapturedRequest, body: impl Into<String>) -> Self {
        Self {
            request,
            body: body.into(),
            preprocessor: None,
            captured_at: Utc::now(),
        }
    }

    /// Attach a later-discovered preprocessor
    pub fn attach_preprocessor(&mut self, preprocessor: Preprocessor) {
        self.preprocessor = Some(preprocessor);
    }

    /// Body text for extraction: preprocessed when a preprocessor is
    /// attached and matches, raw otherwise
    pub fn text(&self) -> String {
        if let Some(pre) = &self.preprocessor {
            if let Some(narrowed) = pre.apply(&self.body) {
                return narrowed;
            }
            debug!("preprocessor matched nothing, using raw body");
        }
        self.body.clone()
    }
}
