//! LLM client interface
//!
//! # Overview
//!
//! The analyzer only needs one operation from a language model: a
//! completion call that may carry a screenshot and may request JSON
//! output. Concrete provider clients live outside this crate and
//! implement [`LlmClient`]; everything here is the trait seam plus the
//! bounded-retry helper that turns free-form completions into typed
//! values.

mod types;

pub use types::{Completion, CompletionRequest, ImageData, TokenUsage};

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use tracing::warn;

/// Number of sequential attempts for schema-validated completions
pub const JSON_RETRY_ATTEMPTS: u32 = 3;

/// Vision-capable completion client
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one completion
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;
}

/// Run a JSON-mode completion and deserialize the reply into `T`.
///
/// Attempts run strictly sequentially, each fully resolving before the
/// next begins. Parse failures are swallowed and retried; exhausting all
/// attempts yields an inference error the caller degrades on.
pub async fn complete_json<T: DeserializeOwned>(
    client: &dyn LlmClient,
    request: &CompletionRequest,
    max_attempts: u32,
) -> Result<T> {
    let mut last_error = String::new();
    for attempt in 1..=max_attempts {
        let completion = match client.complete(request.clone()).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!("completion attempt {attempt}/{max_attempts} failed: {e}");
                last_error = e.to_string();
                continue;
            }
        };

        let text = strip_json_markup(&completion.text);
        match serde_json::from_str::<T>(text) {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("completion attempt {attempt}/{max_attempts} did not validate: {e}");
                last_error = e.to_string();
            }
        }
    }
    Err(Error::inference(format!(
        "no validating completion after {max_attempts} attempts: {last_error}"
    )))
}

/// Strip a markdown code fence wrapping a JSON reply, if present
fn strip_json_markup(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

#[cfg(test)]
pub mod testing;
