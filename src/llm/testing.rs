//! Scripted LLM client for unit tests

use super::{Completion, CompletionRequest, LlmClient};
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

/// An [`LlmClient`] that replays a fixed sequence of replies and records
/// every request it receives.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    /// Client that answers each call with the next reply in order
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a failing reply
    pub fn push_error(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(Error::inference(message.to_string())));
    }

    /// Requests seen so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of calls made
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(Completion::text_only(text)),
            Some(Err(e)) => Err(e),
            None => Err(Error::inference("scripted client ran out of replies")),
        }
    }
}
