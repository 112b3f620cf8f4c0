//! One step of the analysis loop

use super::matching::find_matching_response;
use crate::browser::{scripts, BrowserDriver};
use crate::capture::ResponseBuffer;
use crate::error::Result;
use crate::llm::{complete_json, CompletionRequest, ImageData, LlmClient, JSON_RETRY_ATTEMPTS};
use crate::types::JsonValue;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Settle time between a click and its effect census
const CLICK_SETTLE: Duration = Duration::from_millis(300);

/// Viewport coordinates returned by the vision model
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Point {
    /// Horizontal viewport pixel
    pub x: f64,
    /// Vertical viewport pixel
    pub y: f64,
}

/// What the vision model saw in the screenshot
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepGuidance {
    /// Close button of an overlay/popup hiding the content
    #[serde(default)]
    pub close_overlay_popup_coords: Option<Point>,
    /// Link/button jumping past navigation chrome to the content
    #[serde(default)]
    pub skip_to_content_coords: Option<Point>,
    /// Button loading more list entries
    #[serde(default)]
    pub load_more_content_coords: Option<Point>,
    /// Visible text fragments of the data region
    #[serde(default)]
    pub text_sections: Option<Vec<String>>,
}

/// Per-job analysis state threaded through the steps
#[derive(Debug, Default)]
pub struct StepContext {
    /// Steps executed so far
    pub steps_taken: usize,
    /// The page shows listed data, so pagination is required for the
    /// job to count as successful
    pub requires_listed_data: bool,
    /// CSS selector of the discovered list container
    pub container_selector: Option<String>,
}

/// How a step ended
#[derive(Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// A captured response matched the visible data
    Matched(usize),
    /// Scrolled past similar content; no response this step
    Scrolled,
    /// A candidate action (click or fallback scroll) took effect
    Acted,
    /// Nothing applied and nothing had an effect
    NoProgress,
}

/// Execute one step: screenshot, guidance, match attempt, then the
/// action ladder.
pub async fn run_step(
    driver: &mut dyn BrowserDriver,
    llm: &dyn LlmClient,
    buffer: &mut ResponseBuffer,
    ctx: &mut StepContext,
    query: &str,
) -> Result<StepOutcome> {
    let screenshot = driver.screenshot().await?;
    let guidance = request_guidance(llm, query, screenshot).await;

    buffer.drain_new();

    let sections: Vec<String> = guidance
        .text_sections
        .clone()
        .unwrap_or_default()
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect();

    let matched = if sections.is_empty() {
        None
    } else {
        find_matching_response(buffer.responses(), &sections)
    };

    // Container lookup is independent of response matching: it informs
    // the preprocessor and the listed-data requirement either way.
    let mut scrolled = false;
    if !sections.is_empty() {
        scrolled = locate_container(driver, ctx, &sections).await;
    }

    // A popup close point is honored this step no matter how the step
    // ends.
    let mut popup_attempted = false;
    if let Some(point) = guidance.close_overlay_popup_coords {
        popup_attempted = true;
        let effective = click_verified(driver, point).await;
        debug!("popup close click at ({}, {}): effect={effective}", point.x, point.y);
    }

    if let Some(index) = matched {
        return Ok(StepOutcome::Matched(index));
    }
    if scrolled {
        return Ok(StepOutcome::Scrolled);
    }

    // Action ladder: close overlay, load more, skip to content, then the
    // fallback scroll.
    if !popup_attempted {
        if let Some(point) = guidance.close_overlay_popup_coords {
            if click_verified(driver, point).await {
                return Ok(StepOutcome::Acted);
            }
        }
    }
    if let Some(point) = guidance.load_more_content_coords {
        if click_verified(driver, point).await {
            return Ok(StepOutcome::Acted);
        }
    }
    if let Some(point) = guidance.skip_to_content_coords {
        if click_verified(driver, point).await {
            return Ok(StepOutcome::Acted);
        }
    }

    if scroll_next_view(driver).await {
        return Ok(StepOutcome::Acted);
    }
    Ok(StepOutcome::NoProgress)
}

/// Vision call for one step; a non-validating reply degrades to empty
/// guidance so the step falls through to the scroll fallback.
async fn request_guidance(llm: &dyn LlmClient, query: &str, screenshot: Vec<u8>) -> StepGuidance {
    let prompt = guidance_prompt(query);
    let request = CompletionRequest::new(prompt)
        .with_image(ImageData::png(screenshot))
        .json_mode();

    match complete_json::<StepGuidance>(llm, &request, JSON_RETRY_ATTEMPTS).await {
        Ok(guidance) => guidance,
        Err(e) => {
            warn!("step guidance failed: {e}");
            StepGuidance::default()
        }
    }
}

/// Find the common ancestor container of the visible sections; remember
/// it as a preprocessor candidate and scroll its last sibling into view
/// when one exists. Returns whether a scroll happened.
async fn locate_container(
    driver: &mut dyn BrowserDriver,
    ctx: &mut StepContext,
    sections: &[String],
) -> bool {
    let args = json!({ "sections": sections });
    let found = match driver.evaluate(scripts::FIND_LIST_CONTAINER, args).await {
        Ok(value) => value,
        Err(e) => {
            debug!("container lookup failed: {e}");
            return false;
        }
    };

    let Some(selector) = found.get("selector").and_then(JsonValue::as_str) else {
        return false;
    };
    ctx.requires_listed_data = true;
    ctx.container_selector = Some(selector.to_string());
    debug!("list container: {selector}");

    if found.get("hasNextSibling").and_then(JsonValue::as_bool) != Some(true) {
        return false;
    }

    let args = json!({ "selector": selector });
    match driver.evaluate(scripts::SCROLL_TO_LAST_SIBLING, args).await {
        Ok(JsonValue::Bool(true)) => true,
        Ok(_) => false,
        Err(e) => {
            debug!("sibling scroll failed: {e}");
            false
        }
    }
}

/// Click and verify by comparing the visible-selector census before and
/// after; an unchanged census means the click had no effect.
async fn click_verified(driver: &mut dyn BrowserDriver, point: Point) -> bool {
    let before = visible_census(driver).await;

    let reported = match driver.click(point.x, point.y).await {
        Ok(effect) => effect,
        Err(e) => {
            debug!("click at ({}, {}) failed: {e}", point.x, point.y);
            return false;
        }
    };

    tokio::time::sleep(CLICK_SETTLE).await;

    let after = visible_census(driver).await;
    match (before, after) {
        (Some(before), Some(after)) => before != after,
        // Census unavailable: fall back to the driver's own report.
        _ => reported,
    }
}

async fn visible_census(driver: &mut dyn BrowserDriver) -> Option<Vec<String>> {
    match driver
        .evaluate(scripts::VISIBLE_SELECTORS, JsonValue::Null)
        .await
    {
        Ok(JsonValue::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        ),
        Ok(_) => None,
        Err(e) => {
            debug!("selector census failed: {e}");
            None
        }
    }
}

/// Fallback action: scroll one viewport down
async fn scroll_next_view(driver: &mut dyn BrowserDriver) -> bool {
    let height = match driver
        .evaluate(scripts::VIEWPORT_HEIGHT, JsonValue::Null)
        .await
    {
        Ok(value) => value.as_f64().unwrap_or(800.0),
        Err(_) => 800.0,
    };
    match driver.scroll_by(0.0, height).await {
        Ok(()) => true,
        Err(e) => {
            debug!("fallback scroll failed: {e}");
            false
        }
    }
}

fn guidance_prompt(query: &str) -> String {
    format!(
        "You are looking at a screenshot of a web page analyzed for this data \
         query: \"{query}\".\n\
         Reply with JSON matching this schema (omit or null anything not \
         visible):\n\
         {{\"close_overlay_popup_coords\": {{\"x\": number, \"y\": number}}|null, \
         \"skip_to_content_coords\": {{\"x\": number, \"y\": number}}|null, \
         \"load_more_content_coords\": {{\"x\": number, \"y\": number}}|null, \
         \"text_sections\": [string]|null}}\n\n\
         `text_sections` lists exact text fragments you can read inside the \
         data region (list entries, table rows), not navigation or ads. \
         Coordinates are viewport pixels of the element's center."
    )
}
