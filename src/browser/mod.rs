//! Browser driver interface
//!
//! # Overview
//!
//! The step loop drives a real browser through this trait; concrete
//! drivers (CDP, WebDriver) live outside the crate. Response capture is
//! wired at driver construction time through a
//! [`crate::capture::ResponseSink`], so the trait itself stays a thin
//! command surface.

pub mod scripts;

use crate::error::Result;
use crate::types::JsonValue;
use std::time::Duration;

/// Commands the analyzer issues against a live browser tab.
///
/// Every method is a suspension point for the job's cooperative flow.
/// Implementations must not retry a command concurrently with itself.
#[async_trait::async_trait]
pub trait BrowserDriver: Send {
    /// Navigate the tab to a URL and wait for the load event
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Capture a viewport screenshot as PNG bytes
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// Evaluate a script in the page, passing `args` as its single
    /// argument, and return its JSON result
    async fn evaluate(&mut self, script: &str, args: JsonValue) -> Result<JsonValue>;

    /// Click at viewport coordinates. Returns whether the driver observed
    /// any effect; the analyzer additionally verifies via the
    /// visible-selector census.
    async fn click(&mut self, x: f64, y: f64) -> Result<bool>;

    /// Scroll the viewport by a pixel delta
    async fn scroll_by(&mut self, dx: f64, dy: f64) -> Result<()>;
}

#[cfg(test)]
pub mod testing;
