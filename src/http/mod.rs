//! HTTP replay client
//!
//! # Overview
//!
//! Re-issues captured requests outside the browser. Transport-level
//! failures (connect errors, timeouts, 5xx, 429) are retried with
//! backoff; 4xx statuses are returned immediately as typed errors because
//! the pagination translator assigns meaning to them (`400` ⇒ parameter
//! rejected, one-shot fallback).

mod client;
mod rate_limit;

pub use client::{ReplayClient, ReplayClientConfig, ReplayResponse};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
