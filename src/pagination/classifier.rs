//! Pagination-key and dynamic-parameter inference
//!
//! One sampled request plus one LLM judgment. The request's fields are
//! pre-filtered down to plausible pagination carriers (numeric values or
//! cursor-shaped content) so the model classifies instead of searching;
//! business knobs (sort, filter) are offered separately as dynamic
//! parameter candidates.

use super::cursor::{is_potential_cursor, quoted_candidates};
use super::types::{CursorParameter, NumberParameter, PaginationInfo};
use crate::capture::CapturedRequest;
use crate::llm::{complete_json, CompletionRequest, LlmClient};
use serde::Deserialize;
use tracing::{debug, warn};

/// Typed result of the key classification call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifiedKeys {
    /// Field carrying the page number
    pub page_number_key: Option<String>,
    /// Field carrying the page size
    pub limit_key: Option<String>,
    /// Field carrying the item offset
    pub offset_key: Option<String>,
    /// Field carrying an opaque cursor
    pub cursor_key: Option<String>,
    /// Business-logic knobs (sort, filter) worth exposing on replay
    #[serde(default)]
    pub dynamic_parameter_keys: Vec<String>,
}

/// The classifier's overall result: a validated parameter set plus the
/// dynamic parameter keys
#[derive(Debug, Clone)]
pub struct InferredPagination {
    /// Validated pagination parameters
    pub info: PaginationInfo,
    /// Keys the caller may override per replay
    pub dynamic_keys: Vec<String>,
}

/// Fields of a request that could plausibly carry pagination: purely
/// numeric values, or values containing a potential cursor.
pub fn candidate_parameters(request: &CapturedRequest) -> Vec<(String, String)> {
    request
        .all_parameters()
        .into_iter()
        .filter(|(_, value)| is_numeric(value) || contains_potential_cursor(value))
        .collect()
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

fn contains_potential_cursor(value: &str) -> bool {
    is_potential_cursor(value)
        || quoted_candidates(value)
            .iter()
            .any(|c| is_potential_cursor(c))
}

/// Classify the request's parameters with a single LLM call.
///
/// A failed or non-validating call yields the all-absent result, so
/// pagination detection for this round fails gracefully; the caller owns
/// any retry loop.
pub async fn detect_pagination_keys(
    llm: &dyn LlmClient,
    request: &CapturedRequest,
) -> ClassifiedKeys {
    let candidates = candidate_parameters(request);
    if candidates.is_empty() {
        debug!("no pagination parameter candidates in request");
        return ClassifiedKeys::default();
    }

    let prompt = classification_prompt(request, &candidates);
    let completion_request = CompletionRequest::new(prompt).json_mode();

    let mut keys = match complete_json::<ClassifiedKeys>(llm, &completion_request, 1).await {
        Ok(keys) => keys,
        Err(e) => {
            warn!("pagination key classification failed: {e}");
            return ClassifiedKeys::default();
        }
    };

    // A key the model invented is worse than no key.
    let candidate_keys: Vec<&str> = candidates.iter().map(|(k, _)| k.as_str()).collect();
    let all_keys: Vec<String> = request
        .all_parameters()
        .into_iter()
        .map(|(k, _)| k)
        .collect();

    keys.page_number_key = keys
        .page_number_key
        .filter(|k| candidate_keys.contains(&k.as_str()));
    keys.limit_key = keys
        .limit_key
        .filter(|k| candidate_keys.contains(&k.as_str()));
    keys.offset_key = keys
        .offset_key
        .filter(|k| candidate_keys.contains(&k.as_str()));
    keys.cursor_key = keys
        .cursor_key
        .filter(|k| candidate_keys.contains(&k.as_str()));
    keys.dynamic_parameter_keys.retain(|k| all_keys.contains(k));

    keys
}

/// Run key classification and assemble a validated [`PaginationInfo`].
///
/// Numeric keys whose observed value does not parse are dropped; a
/// cursor key must survive pattern-map construction against the known
/// responses. Returns `None` when the surviving set cannot address pages.
pub async fn infer_pagination(
    llm: &dyn LlmClient,
    request: &CapturedRequest,
    known_responses: &[String],
) -> Option<InferredPagination> {
    let keys = detect_pagination_keys(llm, request).await;

    let lookup = |key: &Option<String>| -> Option<(String, String)> {
        let key = key.as_ref()?;
        let value = request
            .all_parameters()
            .into_iter()
            .find(|(k, _)| k == key)?;
        Some(value)
    };

    let number = |key: &Option<String>| -> Option<NumberParameter> {
        let (key, value) = lookup(key)?;
        match value.parse::<i64>() {
            Ok(parsed) => Some(NumberParameter::new(key, parsed)),
            Err(_) => {
                warn!("classified key `{key}` has non-numeric value `{value}`, dropping");
                None
            }
        }
    };

    let page = number(&keys.page_number_key);
    let limit = number(&keys.limit_key);
    let offset = number(&keys.offset_key);

    let cursor = lookup(&keys.cursor_key)
        .and_then(|(key, value)| CursorParameter::build(key, &value, known_responses));

    match PaginationInfo::new(page, cursor, limit, offset) {
        Ok(info) => Some(InferredPagination {
            info,
            dynamic_keys: keys.dynamic_parameter_keys,
        }),
        Err(e) => {
            debug!("pagination detection round failed: {e}");
            None
        }
    }
}

fn classification_prompt(
    request: &CapturedRequest,
    candidates: &[(String, String)],
) -> String {
    let candidates_json = serde_json::to_string_pretty(
        &candidates
            .iter()
            .cloned()
            .collect::<std::collections::BTreeMap<_, _>>(),
    )
    .unwrap_or_default();

    let other_fields: Vec<String> = request
        .all_parameters()
        .into_iter()
        .filter(|(k, _)| !candidates.iter().any(|(ck, _)| ck == k))
        .map(|(k, v)| format!("{k}={v}"))
        .collect();

    format!(
        "These query/body fields were captured from a data API request and \
         filtered to potential pagination parameters:\n{candidates_json}\n\n\
         Other request fields: {}\n\n\
         Identify the pagination roles. Reply with JSON matching this schema \
         exactly (null for absent roles):\n\
         {{\"page_number_key\": string|null, \"limit_key\": string|null, \
         \"offset_key\": string|null, \"cursor_key\": string|null, \
         \"dynamic_parameter_keys\": [string]}}\n\n\
         `dynamic_parameter_keys` lists fields that change business results \
         (sort order, filters) rather than pagination position.",
        if other_fields.is_empty() {
            "(none)".to_string()
        } else {
            other_fields.join(", ")
        }
    )
}
