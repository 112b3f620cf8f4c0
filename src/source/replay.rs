//! Windowed replay of a source

use super::types::Source;
use crate::error::{Error, Result};
use crate::http::ReplayClient;
use crate::pagination::{build_strategy, LimitOffsetTracker, PageGenerator, ReplayContext, Window};
use crate::types::{JsonValue, ValueMap};
use futures::Stream;
use tracing::{debug, info};

impl Source {
    /// Replay this source for the window `[offset, offset + limit)`.
    ///
    /// Contract violations (negative limit/offset, a dynamic parameter
    /// key the source never declared) are rejected here, before any
    /// network call. The returned [`DataStream`] fetches lazily: each
    /// `next_batch` drives at least one underlying request.
    pub fn generate_data<'a>(
        &'a self,
        client: &'a ReplayClient,
        limit: i64,
        offset: i64,
        dynamic_parameters: ValueMap,
    ) -> Result<DataStream<'a>> {
        if limit < 0 {
            return Err(Error::NegativeWindow {
                field: "limit",
                value: limit,
            });
        }
        if offset < 0 {
            return Err(Error::NegativeWindow {
                field: "offset",
                value: offset,
            });
        }
        for key in dynamic_parameters.keys() {
            if !self.request_detail.dynamic_parameters.contains_key(key) {
                return Err(Error::UnknownParameter { name: key.clone() });
            }
        }

        let window = Window {
            limit: limit as usize,
            offset: offset as usize,
        };

        // Deterministic application order for the overrides.
        let mut dynamic: Vec<(String, JsonValue)> = dynamic_parameters.into_iter().collect();
        dynamic.sort_by(|a, b| a.0.cmp(&b.0));

        let generator: Box<dyn PageGenerator> = match &self.request_detail.pagination {
            Some(info) => build_strategy(info, window, self.response_detail.default_entity_count),
            None => Box::new(SinglePage { done: false }),
        };

        let tracker = LimitOffsetTracker::new(window.limit, window.offset)
            .with_start_position(generator.start_position());

        info!(
            "replaying source for window limit={} offset={} (strategy start position {})",
            window.limit,
            window.offset,
            tracker.global_position()
        );

        Ok(DataStream {
            cx: ReplayContext {
                client,
                request_detail: &self.request_detail,
                response_detail: &self.response_detail,
                dynamic,
            },
            generator,
            tracker,
            finished: false,
        })
    }
}

/// A source with no pagination parameters: one fetch, one batch.
struct SinglePage {
    done: bool,
}

#[async_trait::async_trait]
impl PageGenerator for SinglePage {
    async fn next_batch(&mut self, cx: &mut ReplayContext<'_>) -> Result<Option<Vec<JsonValue>>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let body = cx.fetch(&[]).await?;
        Ok(cx.extract_or_end(&body).await)
    }
}

/// Lazy sequence of record batches for one replay call.
pub struct DataStream<'a> {
    cx: ReplayContext<'a>,
    generator: Box<dyn PageGenerator>,
    tracker: LimitOffsetTracker,
    finished: bool,
}

impl std::fmt::Debug for DataStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStream")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<'a> DataStream<'a> {
    /// Fetch until the next non-empty window slice is available.
    ///
    /// `None` once the window is satisfied or the underlying data ran
    /// out; batches already yielded remain valid when a later fetch
    /// fails.
    pub async fn next_batch(&mut self) -> Option<Result<Vec<JsonValue>>> {
        if self.finished {
            return None;
        }
        loop {
            if self.tracker.is_satisfied() {
                self.finished = true;
                return None;
            }
            match self.generator.next_batch(&mut self.cx).await {
                Ok(Some(raw)) => {
                    let slice = self.tracker.slice(raw);
                    if !slice.is_empty() {
                        return Some(Ok(slice));
                    }
                    debug!("batch fell before the window, continuing");
                }
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }

    /// Drain the stream into one flat record list
    pub async fn collect(mut self) -> Result<Vec<JsonValue>> {
        let mut records = Vec::new();
        while let Some(batch) = self.next_batch().await {
            records.extend(batch?);
        }
        Ok(records)
    }

    /// Adapt into a `futures::Stream` of batches
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<JsonValue>>> + 'a {
        futures::stream::unfold(self, |mut stream| async move {
            stream.next_batch().await.map(|batch| (batch, stream))
        })
    }
}
