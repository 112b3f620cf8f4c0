//! Pagination translation and replay
//!
//! Turns an inferred parameter set plus a requested `(limit, offset)`
//! window into a sequence of concrete HTTP requests. Each strategy is a
//! pull generator: it builds a parameter map, replays the request,
//! extracts the batch, and advances its own state; the caller feeds
//! batches through the [`LimitOffsetTracker`](super::LimitOffsetTracker)
//! and stops when the window is satisfied.
//!
//! Requests are strictly sequential: every request's parameters depend
//! on the prior response (cursor, page counter, or accumulated offset).

use super::cursor::{start_cursor_candidates, StartCursor};
use super::types::{CursorParameter, NumberParameter, PaginationInfo, SelectedStrategy};
use crate::error::Result;
use crate::http::ReplayClient;
use crate::source::{RequestDetail, ResponseDetail};
use crate::types::JsonValue;
use serde_json::json;
use std::collections::HashSet;
use tracing::{debug, warn};

// ============================================================================
// Window & Context
// ============================================================================

/// The caller's requested slice of the logical dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Number of records wanted
    pub limit: usize,
    /// Records to skip from the start of the dataset
    pub offset: usize,
}

/// Shared state one replay call threads through its generator
pub struct ReplayContext<'a> {
    /// HTTP client issuing the replays
    pub client: &'a ReplayClient,
    /// Request template and parameter-application code
    pub request_detail: &'a RequestDetail,
    /// Extraction code and preprocessor
    pub response_detail: &'a ResponseDetail,
    /// Caller-supplied dynamic parameter overrides
    pub dynamic: Vec<(String, JsonValue)>,
}

impl ReplayContext<'_> {
    /// Replay the source request with pagination parameters applied on
    /// top of the dynamic overrides. Returns the response body text.
    pub async fn fetch(&self, pagination_params: &[(String, JsonValue)]) -> Result<String> {
        let mut params = self.dynamic.clone();
        params.extend(pagination_params.iter().cloned());
        let request = self.request_detail.apply_parameters(&params).await?;
        Ok(self.client.send(&request).await?.text)
    }

    /// Extract records from a body; an extraction failure during replay
    /// means "no more data", not an error.
    pub async fn extract_or_end(&self, body: &str) -> Option<Vec<JsonValue>> {
        match self.response_detail.extract_data(body).await {
            Ok(data) => Some(data),
            Err(e) => {
                debug!("extraction failed, treating as end of data: {e}");
                None
            }
        }
    }
}

// ============================================================================
// Generator Trait
// ============================================================================

/// One pagination strategy driving repeated replays.
///
/// `next_batch` returns `Ok(Some(batch))` per fetched page, `Ok(None)`
/// once the strategy's termination condition fires, and `Err` only for
/// transport failures that survived the one-shot 400 fallback.
#[async_trait::async_trait]
pub trait PageGenerator: Send {
    /// Items the strategy skips by jumping straight toward the window
    /// start; pre-seeds the tracker's global position.
    fn start_position(&self) -> usize {
        0
    }

    /// Fetch the next raw batch
    async fn next_batch(&mut self, cx: &mut ReplayContext<'_>) -> Result<Option<Vec<JsonValue>>>;
}

/// Build the generator for an inferred parameter set.
///
/// Strategy priority: `limit & offset` > `page & limit` > `page &
/// offset` > `cursor` > fallback `page & limit`.
pub fn build_strategy(
    info: &PaginationInfo,
    window: Window,
    default_entity_count: usize,
) -> Box<dyn PageGenerator> {
    match info.select() {
        SelectedStrategy::LimitOffset { limit, offset } => Box::new(LimitOffsetGenerator::new(
            offset,
            limit,
            window,
            default_entity_count,
        )),
        SelectedStrategy::PageLimit { page, limit } => Box::new(PageLimitGenerator::new(
            page,
            limit,
            window,
            default_entity_count,
        )),
        SelectedStrategy::PageOffset { page, offset } => Box::new(PageOffsetGenerator::new(
            page,
            offset,
            window,
            default_entity_count,
        )),
        SelectedStrategy::Cursor {
            cursor,
            limit,
            page,
        } => Box::new(CursorGenerator::new(
            cursor,
            limit,
            page,
            window,
            default_entity_count,
        )),
    }
}

/// Page size for strategies that can honor the caller's limit directly
fn requested_page_size(window: Window, default_entity_count: usize) -> usize {
    if window.limit > 0 {
        window.limit
    } else {
        default_entity_count.max(1)
    }
}

// ============================================================================
// Limit / Offset
// ============================================================================

/// Direct offset addressing. The offset parameter tracks the cumulative
/// item position from zero; the tracker discards everything before the
/// window start.
struct LimitOffsetGenerator {
    offset_key: String,
    limit_key: Option<String>,
    page_size: usize,
    fallback_size: usize,
    api_offset: usize,
    used_fallback: bool,
    first: bool,
    done: bool,
}

impl LimitOffsetGenerator {
    fn new(
        offset: &NumberParameter,
        limit: Option<&NumberParameter>,
        window: Window,
        default_entity_count: usize,
    ) -> Self {
        Self {
            offset_key: offset.key.clone(),
            limit_key: limit.map(|l| l.key.clone()),
            page_size: requested_page_size(window, default_entity_count),
            fallback_size: default_entity_count.max(1),
            api_offset: 0,
            used_fallback: false,
            first: true,
            done: false,
        }
    }
}

#[async_trait::async_trait]
impl PageGenerator for LimitOffsetGenerator {
    async fn next_batch(&mut self, cx: &mut ReplayContext<'_>) -> Result<Option<Vec<JsonValue>>> {
        if self.done {
            return Ok(None);
        }

        loop {
            let mut params = vec![(self.offset_key.clone(), json!(self.api_offset))];
            if let Some(key) = &self.limit_key {
                params.push((key.clone(), json!(self.page_size)));
            }

            match cx.fetch(&params).await {
                Ok(body) => {
                    let Some(data) = cx.extract_or_end(&body).await else {
                        self.done = true;
                        return Ok(None);
                    };
                    if data.is_empty() {
                        if self.first {
                            debug!("empty first page, offset scheme unsupported");
                        }
                        self.done = true;
                        return Ok(None);
                    }
                    if data.len() < self.page_size {
                        // API-imposed cap: shrink subsequent requests to
                        // what the API actually serves.
                        self.page_size = data.len();
                    }
                    self.first = false;
                    self.api_offset += data.len();
                    return Ok(Some(data));
                }
                Err(e)
                    if e.is_parameter_rejected()
                        && self.first
                        && !self.used_fallback
                        && self.limit_key.is_some() =>
                {
                    warn!(
                        "limit {} rejected (400), retrying once with {}",
                        self.page_size, self.fallback_size
                    );
                    self.used_fallback = true;
                    self.page_size = self.fallback_size;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ============================================================================
// Page / Limit
// ============================================================================

/// Page-counter walking with an unknown page base (0 or 1), detected
/// once via a probe for page "0".
struct PageLimitGenerator {
    page_key: String,
    limit_key: Option<String>,
    page_size: usize,
    page_index: usize,
    base: Option<i64>,
    current_page: i64,
    last_body: Option<String>,
    collision_handled: bool,
    done: bool,
}

impl PageLimitGenerator {
    fn new(
        page: &NumberParameter,
        limit: Option<&NumberParameter>,
        window: Window,
        default_entity_count: usize,
    ) -> Self {
        let page_size = if limit.is_some() {
            requested_page_size(window, default_entity_count)
        } else {
            // No limit parameter to steer: the API serves its own page
            // size, estimated from the observed first page.
            default_entity_count.max(1)
        };
        Self {
            page_key: page.key.clone(),
            limit_key: limit.map(|l| l.key.clone()),
            page_size,
            page_index: window.offset / page_size,
            base: None,
            current_page: 0,
            last_body: None,
            collision_handled: false,
            done: false,
        }
    }

    fn params_for(&self, page: i64) -> Vec<(String, JsonValue)> {
        let mut params = vec![(self.page_key.clone(), json!(page))];
        if let Some(key) = &self.limit_key {
            params.push((key.clone(), json!(self.page_size)));
        }
        params
    }
}

#[async_trait::async_trait]
impl PageGenerator for PageLimitGenerator {
    fn start_position(&self) -> usize {
        self.page_index * self.page_size
    }

    async fn next_batch(&mut self, cx: &mut ReplayContext<'_>) -> Result<Option<Vec<JsonValue>>> {
        if self.done {
            return Ok(None);
        }

        loop {
            if self.base.is_none() {
                match cx.fetch(&self.params_for(0)).await {
                    Ok(body) => {
                        let data = cx.extract_or_end(&body).await.unwrap_or_default();
                        if data.is_empty() {
                            self.base = Some(1);
                            self.current_page = 1 + self.page_index as i64;
                        } else {
                            self.base = Some(0);
                            self.current_page = self.page_index as i64;
                            if self.page_index == 0 {
                                // The probe fetched our start page; use it.
                                self.last_body = Some(body);
                                self.current_page = 1;
                                return Ok(Some(data));
                            }
                        }
                    }
                    Err(e) => {
                        debug!("page-0 probe failed ({e}), assuming base 1");
                        self.base = Some(1);
                        self.current_page = 1 + self.page_index as i64;
                    }
                }
                continue;
            }

            let body = cx.fetch(&self.params_for(self.current_page)).await?;

            if self.last_body.as_deref() == Some(body.as_str()) {
                if self.current_page == 1 && !self.collision_handled {
                    // Base-detection artifact: an API that clamps page 0
                    // to its first page makes pages 0 and 1 identical.
                    self.collision_handled = true;
                    self.current_page += 1;
                    continue;
                }
                self.done = true;
                return Ok(None);
            }

            let Some(data) = cx.extract_or_end(&body).await else {
                self.done = true;
                return Ok(None);
            };
            if data.is_empty() {
                self.done = true;
                return Ok(None);
            }

            self.last_body = Some(body);
            self.current_page += 1;
            return Ok(Some(data));
        }
    }
}

// ============================================================================
// Page / Offset
// ============================================================================

/// Page counter plus a page-relative offset. The offset is assumed to be
/// "offset within page": it applies to the first fetched page only and
/// resets to zero afterwards. Documented heuristic, not a verified
/// contract.
struct PageOffsetGenerator {
    page_key: String,
    offset_key: String,
    current_page: i64,
    within_offset: usize,
    start: usize,
    first: bool,
    done: bool,
}

impl PageOffsetGenerator {
    fn new(
        page: &NumberParameter,
        offset: &NumberParameter,
        window: Window,
        default_entity_count: usize,
    ) -> Self {
        let estimated_page_size = default_entity_count.max(1);
        let page_index = window.offset / estimated_page_size;
        let base = if page.default_value <= 0 { 0 } else { 1 };
        Self {
            page_key: page.key.clone(),
            offset_key: offset.key.clone(),
            current_page: base + page_index as i64,
            within_offset: window.offset % estimated_page_size,
            start: window.offset,
            first: true,
            done: false,
        }
    }
}

#[async_trait::async_trait]
impl PageGenerator for PageOffsetGenerator {
    fn start_position(&self) -> usize {
        self.start
    }

    async fn next_batch(&mut self, cx: &mut ReplayContext<'_>) -> Result<Option<Vec<JsonValue>>> {
        if self.done {
            return Ok(None);
        }

        let offset = if self.first { self.within_offset } else { 0 };
        let params = vec![
            (self.page_key.clone(), json!(self.current_page)),
            (self.offset_key.clone(), json!(offset)),
        ];

        let body = cx.fetch(&params).await?;
        let Some(data) = cx.extract_or_end(&body).await else {
            self.done = true;
            return Ok(None);
        };
        if data.is_empty() {
            self.done = true;
            return Ok(None);
        }

        self.first = false;
        self.current_page += 1;
        Ok(Some(data))
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// Opaque cursor chain. Cursors cannot jump, so generation always starts
/// at the first page and the tracker discards until the window begins.
struct CursorGenerator {
    param: CursorParameter,
    limit_key: Option<String>,
    page_key: Option<String>,
    page_size: usize,
    fallback_size: usize,
    current_page: i64,
    seen: HashSet<String>,
    last_body: Option<String>,
    used_fallback: bool,
    started: bool,
    done: bool,
}

impl CursorGenerator {
    fn new(
        cursor: &CursorParameter,
        limit: Option<&NumberParameter>,
        page: Option<&NumberParameter>,
        window: Window,
        default_entity_count: usize,
    ) -> Self {
        Self {
            param: cursor.clone(),
            limit_key: limit.map(|l| l.key.clone()),
            page_key: page.map(|p| p.key.clone()),
            page_size: requested_page_size(window, default_entity_count),
            fallback_size: default_entity_count.max(1),
            current_page: page.map_or(1, |p| p.default_value),
            seen: HashSet::new(),
            last_body: None,
            used_fallback: false,
            started: false,
            done: false,
        }
    }

    /// Replay with one cursor value, applying the one-shot 400 limit
    /// fallback when allowed (first request only).
    async fn fetch_page(
        &mut self,
        cx: &mut ReplayContext<'_>,
        cursor_value: JsonValue,
        allow_fallback: bool,
    ) -> Result<String> {
        loop {
            let mut params = vec![(self.param.key.clone(), cursor_value.clone())];
            if let Some(key) = &self.limit_key {
                params.push((key.clone(), json!(self.page_size)));
            }
            if let Some(key) = &self.page_key {
                // Secondary disambiguator: some APIs want the page
                // counter advancing alongside the cursor.
                params.push((key.clone(), json!(self.current_page)));
            }

            match cx.fetch(&params).await {
                Ok(body) => return Ok(body),
                Err(e)
                    if allow_fallback
                        && e.is_parameter_rejected()
                        && self.limit_key.is_some()
                        && !self.used_fallback =>
                {
                    warn!(
                        "limit {} rejected (400), retrying once with {}",
                        self.page_size, self.fallback_size
                    );
                    self.used_fallback = true;
                    self.page_size = self.fallback_size;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Try the start-cursor candidates in order; the success of a
    /// speculative replay, not its content, decides the starting point.
    async fn start(&mut self, cx: &mut ReplayContext<'_>) -> Result<Option<String>> {
        let candidates = start_cursor_candidates(&self.param);
        let last = candidates.len() - 1;

        for (index, candidate) in candidates.into_iter().enumerate() {
            let (cursor_value, seen_key) = match &candidate {
                StartCursor::Omitted => (JsonValue::Null, String::new()),
                StartCursor::Value(v) => (json!(v), v.clone()),
            };

            match self.fetch_page(cx, cursor_value, true).await {
                Ok(body) => {
                    self.seen.insert(seen_key);
                    self.started = true;
                    return Ok(Some(body));
                }
                Err(e) if index < last => {
                    debug!("speculative start cursor failed ({e}), trying next");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

#[async_trait::async_trait]
impl PageGenerator for CursorGenerator {
    async fn next_batch(&mut self, cx: &mut ReplayContext<'_>) -> Result<Option<Vec<JsonValue>>> {
        if self.done {
            return Ok(None);
        }

        let body = if self.started {
            let Some(last_body) = &self.last_body else {
                self.done = true;
                return Ok(None);
            };
            let Some(next_cursor) = self.param.extract_cursor(last_body) else {
                debug!("cursor extraction failed, ending");
                self.done = true;
                return Ok(None);
            };
            if !self.seen.insert(next_cursor.clone()) {
                debug!("cursor cycle detected, ending");
                self.done = true;
                return Ok(None);
            }
            self.fetch_page(cx, json!(next_cursor), false).await?
        } else {
            match self.start(cx).await? {
                Some(body) => body,
                None => {
                    self.done = true;
                    return Ok(None);
                }
            }
        };

        let Some(data) = cx.extract_or_end(&body).await else {
            self.done = true;
            return Ok(None);
        };
        if data.is_empty() {
            self.done = true;
            return Ok(None);
        }

        self.last_body = Some(body);
        self.current_page += 1;
        Ok(Some(data))
    }
}
