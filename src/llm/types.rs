//! Completion request/response types

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Screenshot payload attached to a vision completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw image bytes
    pub data: Vec<u8>,
    /// MIME type, e.g. `image/png`
    pub media_type: String,
}

impl ImageData {
    /// Create a PNG image payload
    pub fn png(data: Vec<u8>) -> Self {
        Self {
            data,
            media_type: "image/png".to_string(),
        }
    }

    /// Base64 form for provider wire formats
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

/// One completion call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Prompt text
    pub prompt: String,
    /// Optional screenshot for vision models
    pub image: Option<ImageData>,
    /// Ask the provider for a JSON-only reply
    pub json_mode: bool,
}

impl CompletionRequest {
    /// Create a plain text completion request
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
            json_mode: false,
        }
    }

    /// Attach a screenshot
    #[must_use]
    pub fn with_image(mut self, image: ImageData) -> Self {
        self.image = Some(image);
        self
    }

    /// Request a JSON-only reply
    #[must_use]
    pub fn json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Completion result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Reply text
    pub text: String,
    /// Token accounting for this call
    pub usage: TokenUsage,
}

impl Completion {
    /// Create a completion with zeroed usage (tests, cached replies)
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: TokenUsage::default(),
        }
    }
}

/// Token accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt (and image)
    pub input_tokens: u64,
    /// Tokens produced in the reply
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Accumulate another call's usage
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}
