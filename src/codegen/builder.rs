//! Generation and validation of extraction/parameter code

use super::runtime::run_function;
use crate::capture::CapturedRequest;
use crate::error::{Error, Result};
use crate::llm::{CompletionRequest, LlmClient};
use crate::types::{JsonValue, RecordSchema};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Independent attempts before giving up on a code-generation task
pub const CODE_ATTEMPTS: u32 = 3;

/// Entry point the extraction function must define
pub const EXTRACT_ENTRY: &str = "extract";

/// Entry point the parameter applier must define
pub const APPLY_PARAMS_ENTRY: &str = "apply_parameters";

/// Sample bodies are truncated before prompting
const SAMPLE_BODY_LIMIT: usize = 6_000;

static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:[a-zA-Z]+)?\n(.*?)```").unwrap());

/// A validated extraction function
#[derive(Debug, Clone)]
pub struct GeneratedExtractor {
    /// The accepted source
    pub code: String,
    /// Records the function produced from the sample body; used as the
    /// pagination-size fallback
    pub entity_count: usize,
}

/// A validated parameter-application function
#[derive(Debug, Clone)]
pub struct GeneratedApplier {
    /// The accepted source
    pub code: String,
}

/// Parse the first fenced code block out of a completion
pub fn parse_code_block(text: &str) -> Option<String> {
    CODE_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Ask the LLM for an extraction function and validate it by execution.
///
/// Up to [`CODE_ATTEMPTS`] independent attempts, strictly sequential;
/// any attempt's parse/exec/validate failure is swallowed and retried.
/// Returns `None` after exhaustion; the caller degrades to a
/// whole-batch passthrough.
pub async fn build_extractor(
    llm: &dyn LlmClient,
    schema: &RecordSchema,
    sample_body: &str,
) -> Option<GeneratedExtractor> {
    let prompt = extraction_prompt(schema, sample_body);

    for attempt in 1..=CODE_ATTEMPTS {
        match try_build_extractor(llm, &prompt, schema, sample_body).await {
            Ok(extractor) => {
                debug!(
                    "extraction code accepted on attempt {attempt} ({} records from sample)",
                    extractor.entity_count
                );
                return Some(extractor);
            }
            Err(e) => {
                warn!("extraction code attempt {attempt}/{CODE_ATTEMPTS} rejected: {e}");
            }
        }
    }
    None
}

async fn try_build_extractor(
    llm: &dyn LlmClient,
    prompt: &str,
    schema: &RecordSchema,
    sample_body: &str,
) -> Result<GeneratedExtractor> {
    let completion = llm.complete(CompletionRequest::new(prompt)).await?;
    let code = parse_code_block(&completion.text)
        .ok_or_else(|| Error::code_validation("no fenced code block in completion"))?;

    let result = run_function(
        &code,
        EXTRACT_ENTRY,
        vec![JsonValue::String(sample_body.to_string())],
    )
    .await?;

    let Some(records) = result.as_array() else {
        return Err(Error::code_validation("extraction result is not a list"));
    };
    if records.is_empty() {
        return Err(Error::code_validation(
            "extraction produced no records from the sample",
        ));
    }
    if !schema.validate_batch(records) {
        return Err(Error::code_validation(
            "extracted records do not match the output schema",
        ));
    }

    Ok(GeneratedExtractor {
        code,
        entity_count: records.len(),
    })
}

/// Ask the LLM for a parameter-application function and validate it by
/// applying the request's own current values. Returns `None` after
/// exhaustion; the caller falls back to built-in key substitution.
pub async fn build_applier(
    llm: &dyn LlmClient,
    request: &CapturedRequest,
    parameter_names: &[String],
) -> Option<GeneratedApplier> {
    if parameter_names.is_empty() {
        return None;
    }
    let prompt = applier_prompt(request, parameter_names);
    let request_json = match serde_json::to_value(request) {
        Ok(value) => value,
        Err(_) => return None,
    };
    let sample_params: JsonValue = parameter_names
        .iter()
        .map(|name| (name.clone(), JsonValue::String("1".to_string())))
        .collect::<serde_json::Map<_, _>>()
        .into();

    for attempt in 1..=CODE_ATTEMPTS {
        match try_build_applier(llm, &prompt, &request_json, &sample_params).await {
            Ok(applier) => {
                debug!("parameter code accepted on attempt {attempt}");
                return Some(applier);
            }
            Err(e) => {
                warn!("parameter code attempt {attempt}/{CODE_ATTEMPTS} rejected: {e}");
            }
        }
    }
    None
}

async fn try_build_applier(
    llm: &dyn LlmClient,
    prompt: &str,
    request_json: &JsonValue,
    sample_params: &JsonValue,
) -> Result<GeneratedApplier> {
    let completion = llm.complete(CompletionRequest::new(prompt)).await?;
    let code = parse_code_block(&completion.text)
        .ok_or_else(|| Error::code_validation("no fenced code block in completion"))?;

    let result = run_function(
        &code,
        APPLY_PARAMS_ENTRY,
        vec![request_json.clone(), sample_params.clone()],
    )
    .await?;

    // The applier must hand back a request of the same shape.
    let reparsed: std::result::Result<CapturedRequest, _> = serde_json::from_value(result);
    match reparsed {
        Ok(_) => Ok(GeneratedApplier { code }),
        Err(e) => Err(Error::code_validation(format!(
            "applied request does not round-trip: {e}"
        ))),
    }
}

fn extraction_prompt(schema: &RecordSchema, sample_body: &str) -> String {
    let fields = if schema.fields.is_empty() {
        "any consistent record shape".to_string()
    } else {
        schema
            .fields
            .iter()
            .map(|(name, ty)| format!("{name} ({ty:?})"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let sample = truncate_chars(sample_body, SAMPLE_BODY_LIMIT);

    format!(
        "Write a JavaScript function `{EXTRACT_ENTRY}(text)` that parses the \
         response body below and returns the list of data records it contains.\n\
         Each record is an object with fields: {fields}.\n\
         Return only the records, in document order. Use no imports and no I/O; \
         the function must be pure. Reply with a single fenced code block.\n\n\
         Response body sample:\n```\n{sample}\n```"
    )
}

fn applier_prompt(request: &CapturedRequest, parameter_names: &[String]) -> String {
    let names = parameter_names.join(", ");
    let request_json = serde_json::to_string_pretty(request).unwrap_or_default();
    let sample = truncate_chars(&request_json, SAMPLE_BODY_LIMIT);

    format!(
        "Write a JavaScript function `{APPLY_PARAMS_ENTRY}(request, params)` that \
         returns a copy of `request` with each named parameter in `params` applied \
         where the request currently carries it (query string or body). Parameters: \
         {names}. A null parameter value removes the field. Do not mutate the \
         input. Use no imports and no I/O. Reply with a single fenced code block.\n\n\
         Request:\n```\n{sample}\n```"
    )
}

fn truncate_chars(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(limit).collect();
        format!("{truncated}…")
    }
}
