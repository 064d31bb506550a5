//! Anthropic Messages API client implementing [`Generator`].
//!
//! One [`AnthropicGenerator`] serves one model tier. Calls are blocking and
//! never retried here; failures are mapped onto [`GenerationError`] so the
//! pipeline can record them per unit.
//!
//! ```no_run
//! use docgate_core::{Generator, ModelConfig, PromptTemplate, TemplateVars};
//! use docgate_llm::AnthropicGenerator;
//!
//! let models = ModelConfig::default();
//! let classifier =
//!     AnthropicGenerator::new(&models.api_base, "sk-ant-...", models.classifier.clone())?;
//! let template = PromptTemplate::new("assess", "Reply GOOD or IMPROVE for {doc}");
//! let completion = classifier.call(&template, &TemplateVars::new().with("doc", "/** Runs. */"))?;
//! println!("{} (${:.5})", completion.text, completion.usage.cost_usd);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::time::Duration;

use docgate_core::{
    Completion, GenerationError, Generator, ModelSpec, PromptTemplate, TemplateVars, Usage,
};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Value sent in the `anthropic-version` header.
pub const API_VERSION: &str = "2023-06-01";

const MESSAGES_PATH: &str = "/v1/messages";

/// Longest error body quoted in a transport error.
const MAX_ERROR_BODY: usize = 300;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured (set ANTHROPIC_API_KEY or pass --api-key)")]
    MissingApiKey,

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<TokenCounts>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct TokenCounts {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// Blocking generator bound to one model.
#[derive(Debug, Clone)]
pub struct AnthropicGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    spec: ModelSpec,
}

impl AnthropicGenerator {
    /// Builds a generator for `spec` against `api_base`.
    ///
    /// The HTTP timeout is the model's `timeout_secs`.
    pub fn new(
        api_base: &str,
        api_key: impl Into<String>,
        spec: ModelSpec,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(spec.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}{MESSAGES_PATH}", api_base.trim_end_matches('/')),
            api_key,
            spec,
        })
    }

    pub fn model(&self) -> &str {
        &self.spec.model
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }
}

impl Generator for AnthropicGenerator {
    fn call(
        &self,
        template: &PromptTemplate,
        vars: &TemplateVars,
    ) -> Result<Completion, GenerationError> {
        let prompt = template.render(vars);
        let request = MessagesRequest {
            model: &self.spec.model,
            max_tokens: self.spec.max_tokens,
            temperature: self.spec.temperature,
            messages: [Message {
                role: "user",
                content: &prompt,
            }],
        };

        debug!(model = %self.spec.model, template = %template.name, "sending messages request");
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().map_err(transport_error)?;
        if !status.is_success() {
            warn!(model = %self.spec.model, %status, "messages request rejected");
            return Err(status_error(status, &body));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(model = %self.spec.model, "undecodable response body, usage unknown");
            GenerationError::MalformedResponse(format!("invalid response body: {e}"))
        })?;

        let tokens = parsed.usage.unwrap_or_default();
        let usage = Usage {
            calls: 1,
            input_tokens: tokens.input_tokens,
            output_tokens: tokens.output_tokens,
            cost_usd: self.spec.cost(tokens.input_tokens, tokens.output_tokens),
        };

        // Empty text is returned, not raised, so its billed usage still counts.
        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();
        if text.trim().is_empty() {
            warn!(
                model = %self.spec.model,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                cost_usd = usage.cost_usd,
                "response contained no text"
            );
        } else {
            debug!(
                model = %self.spec.model,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "messages request complete"
            );
        }

        Ok(Completion::new(text, usage))
    }
}

fn transport_error(err: reqwest::Error) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Transport(err.to_string())
    }
}

/// Maps a non-success HTTP status onto a generation failure.
///
/// 429 and the provider's 529 "overloaded" are rate limits; every other
/// status is a transport failure quoting the start of the body.
fn status_error(status: StatusCode, body: &str) -> GenerationError {
    match status.as_u16() {
        429 | 529 => GenerationError::RateLimited,
        _ => {
            let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
            GenerationError::Transport(format!("HTTP {status}: {}", excerpt.trim()))
        }
    }
}
