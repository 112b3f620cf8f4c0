//! Page analysis
//!
//! # Overview
//!
//! The step loop that turns a URL plus a natural-language query into a
//! replayable [`Source`]: screenshot → vision LLM guidance → browser
//! action, repeated until a captured response matches the data the page
//! shows, then pagination inference and extraction code generation over
//! the captured traffic.

mod matching;
mod step;


pub use matching::{find_matching_response, score_response, MATCH_THRESHOLD};
pub use step::{run_step, Point, StepContext, StepGuidance, StepOutcome};

use crate::browser::BrowserDriver;
use crate::capture::{Preprocessor, ResponseBuffer};
use crate::codegen::{build_applier, build_extractor};
use crate::llm::LlmClient;
use crate::pagination::{infer_pagination, InferredPagination};
use crate::source::{RequestDetail, ResponseDetail, Source};
use crate::types::{JsonValue, RecordSchema, ValueMap};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Rounds of pagination detection before giving up
const PAGINATION_ROUNDS: u32 = 3;

/// Sleep after a step that produced no response (soft backoff)
const STEP_BACKOFF: Duration = Duration::from_millis(2_500);

/// Parameters of one analysis job
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    /// Page to analyze
    pub url: String,
    /// What data the caller is after, in natural language
    pub query: String,
    /// Expected record shape
    pub output_schema: RecordSchema,
    /// Step-loop bound
    pub max_steps: usize,
    /// Page-load timeout
    pub timeout: Duration,
}

/// Analyze a page and build a replayable source.
///
/// Never raises for discovery-level failures: browser trouble, LLM
/// non-answers, and missing pagination all degrade to `None`.
pub async fn analyze(
    driver: &mut dyn BrowserDriver,
    llm: &dyn LlmClient,
    mut buffer: ResponseBuffer,
    request: AnalyzeRequest,
) -> Option<Source> {
    match analyze_inner(driver, llm, &mut buffer, request).await {
        Ok(source) => source,
        Err(e) => {
            warn!("analysis failed: {e}");
            None
        }
    }
}

async fn analyze_inner(
    driver: &mut dyn BrowserDriver,
    llm: &dyn LlmClient,
    buffer: &mut ResponseBuffer,
    request: AnalyzeRequest,
) -> crate::error::Result<Option<Source>> {
    if let Err(e) = driver.navigate(&request.url, request.timeout).await {
        warn!("navigation to {} failed: {e}", request.url);
        return Ok(None);
    }

    let mut ctx = StepContext::default();

    let Some(matched_index) =
        discover_relevant_response(driver, llm, buffer, &mut ctx, &request).await?
    else {
        info!("no matching response within {} steps", request.max_steps);
        return Ok(None);
    };

    // HTML responses narrowed to the discovered list container.
    if let Some(selector) = &ctx.container_selector {
        let is_html = buffer.responses()[matched_index].request.request_type.is_html();
        if is_html {
            buffer.attach_preprocessor(matched_index, Preprocessor::css(selector.clone()));
        }
    }

    let pagination = detect_pagination(driver, llm, buffer, &mut ctx, &request, matched_index).await;

    if ctx.requires_listed_data && pagination.is_none() {
        info!("page shows listed data but no pagination was inferred, failing analysis");
        return Ok(None);
    }

    let matched = &buffer.responses()[matched_index];
    let sample_text = matched.text();

    let response_detail = match build_extractor(llm, &request.output_schema, &sample_text).await {
        Some(extractor) => ResponseDetail {
            preprocessor: matched.preprocessor.clone(),
            extraction_code: Some(extractor.code),
            default_entity_count: extractor.entity_count,
        },
        None => {
            debug!("no extraction code accepted, falling back to whole-batch");
            ResponseDetail {
                preprocessor: matched.preprocessor.clone(),
                ..ResponseDetail::empty()
            }
        }
    };

    let (pagination_info, dynamic_keys) = match pagination {
        Some(InferredPagination { info, dynamic_keys }) => (Some(info), dynamic_keys),
        None => (None, Vec::new()),
    };

    let dynamic_parameters: ValueMap = dynamic_keys
        .iter()
        .filter_map(|key| {
            matched
                .request
                .all_parameters()
                .into_iter()
                .find(|(k, _)| k == key)
                .map(|(k, v)| (k, JsonValue::String(v)))
        })
        .collect();

    let mut applier_keys: Vec<String> = dynamic_keys.clone();
    if let Some(info) = &pagination_info {
        applier_keys.extend(
            [
                info.page().map(|p| p.key.clone()),
                info.limit().map(|l| l.key.clone()),
                info.offset().map(|o| o.key.clone()),
                info.cursor().map(|c| c.key.clone()),
            ]
            .into_iter()
            .flatten(),
        );
    }
    let parameter_code = build_applier(llm, &matched.request, &applier_keys)
        .await
        .map(|applier| applier.code);

    let request_detail = RequestDetail {
        request: matched.request.clone(),
        pagination: pagination_info,
        dynamic_parameters,
        parameter_code,
    };

    info!(
        "analysis complete: {} {} ({} responses captured)",
        request_detail.request.method,
        request_detail.request.url,
        buffer.len()
    );

    Ok(Some(Source::new(
        request.url,
        request.query,
        request_detail,
        response_detail,
    )))
}

/// The outer step loop: run steps until one matches a response or the
/// step budget runs out. Sleeps after every step that produced nothing;
/// step-level failures are logged and the loop proceeds.
async fn discover_relevant_response(
    driver: &mut dyn BrowserDriver,
    llm: &dyn LlmClient,
    buffer: &mut ResponseBuffer,
    ctx: &mut StepContext,
    request: &AnalyzeRequest,
) -> crate::error::Result<Option<usize>> {
    for step_number in 1..=request.max_steps {
        ctx.steps_taken = step_number;
        match run_step(driver, llm, buffer, ctx, &request.query).await {
            Ok(StepOutcome::Matched(index)) => {
                info!("step {step_number}: matched response {index}");
                return Ok(Some(index));
            }
            Ok(outcome) => {
                debug!("step {step_number}: {outcome:?}");
            }
            Err(e) => {
                warn!("step {step_number} failed: {e}");
            }
        }
        tokio::time::sleep(STEP_BACKOFF).await;
    }
    Ok(None)
}

/// Bounded pagination detection. Later rounds run one more step first to
/// provoke fresh traffic (a next-page request the first round missed).
async fn detect_pagination(
    driver: &mut dyn BrowserDriver,
    llm: &dyn LlmClient,
    buffer: &mut ResponseBuffer,
    ctx: &mut StepContext,
    request: &AnalyzeRequest,
    matched_index: usize,
) -> Option<InferredPagination> {
    for round in 1..=PAGINATION_ROUNDS {
        if round > 1 {
            if let Err(e) = run_step(driver, llm, buffer, ctx, &request.query).await {
                debug!("pagination round {round}: step failed: {e}");
            }
        }

        let bodies: Vec<String> = buffer.responses().iter().map(|r| r.body.clone()).collect();
        let candidate = &buffer.responses()[matched_index].request;

        if let Some(inferred) = infer_pagination(llm, candidate, &bodies).await {
            info!(
                "pagination inferred on round {round}: {:?}",
                inferred.info.strategy()
            );
            return Some(inferred);
        }
    }
    None
}
