//! Scripted browser driver for unit tests

use super::BrowserDriver;
use crate::error::{Error, Result};
use crate::types::JsonValue;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Log of driver calls, shared with the test body
#[derive(Debug, Default)]
pub struct DriverLog {
    /// URLs navigated to
    pub navigations: Vec<String>,
    /// Click coordinates
    pub clicks: Vec<(f64, f64)>,
    /// Scroll deltas
    pub scrolls: Vec<(f64, f64)>,
    /// Scripts evaluated (first 40 chars)
    pub evaluations: Vec<String>,
    /// Screenshots taken
    pub screenshots: usize,
}

/// A [`BrowserDriver`] that replays scripted evaluate results and records
/// every call.
pub struct MockDriver {
    /// Shared call log
    pub log: Arc<Mutex<DriverLog>>,
    evaluate_results: Mutex<VecDeque<JsonValue>>,
    click_effect: bool,
}

impl MockDriver {
    /// Driver whose `evaluate` answers with the given results in order
    pub fn new(evaluate_results: Vec<JsonValue>) -> Self {
        Self {
            log: Arc::new(Mutex::new(DriverLog::default())),
            evaluate_results: Mutex::new(evaluate_results.into()),
            click_effect: true,
        }
    }

    /// Make every click report no effect
    #[must_use]
    pub fn without_click_effect(mut self) -> Self {
        self.click_effect = false;
        self
    }
}

#[async_trait::async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        self.log.lock().unwrap().navigations.push(url.to_string());
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.log.lock().unwrap().screenshots += 1;
        Ok(vec![0u8; 4])
    }

    async fn evaluate(&mut self, script: &str, _args: JsonValue) -> Result<JsonValue> {
        let head: String = script.trim().chars().take(40).collect();
        self.log.lock().unwrap().evaluations.push(head);
        self.evaluate_results
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::browser("mock driver ran out of evaluate results"))
    }

    async fn click(&mut self, x: f64, y: f64) -> Result<bool> {
        self.log.lock().unwrap().clicks.push((x, y));
        Ok(self.click_effect)
    }

    async fn scroll_by(&mut self, dx: f64, dy: f64) -> Result<()> {
        self.log.lock().unwrap().scrolls.push((dx, dy));
        Ok(())
    }
}
