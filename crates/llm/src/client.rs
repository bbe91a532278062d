//! Azure OpenAI chat-completion translator.

use std::thread;

use deck_core::Translator;
use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::AzureConfig;
use crate::error::{Result, TranslateError};
use crate::prompt::translation_prompt;
use crate::retry::{RetryError, RetryPolicy};

/// Longest error body kept in error messages.
const MAX_ERROR_BODY: usize = 500;

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body of a chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// Translates text into Traditional Chinese through an Azure OpenAI
/// deployment, retrying rate-limited calls with randomized backoff.
pub struct AzureTranslator {
    http: Client,
    config: AzureConfig,
    policy: RetryPolicy,
    rng: StdRng,
}

impl AzureTranslator {
    /// Create a translator with the default retry policy.
    pub fn new(config: AzureConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("deck-translate/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(config, http))
    }

    fn with_client(config: AzureConfig, http: Client) -> Self {
        Self {
            http,
            config,
            policy: RetryPolicy::default(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &AzureConfig {
        &self.config
    }

    /// The request sent for `text`.
    pub fn build_request(&self, text: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: translation_prompt(text),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

impl Translator for AzureTranslator {
    type Error = TranslateError;

    fn translate(&mut self, text: &str) -> Result<String> {
        let request = self.build_request(text);
        let Self {
            http,
            config,
            policy,
            rng,
        } = self;

        let outcome = policy.run(rng, thread::sleep, |attempt| {
            log::trace!("Completion request, attempt {}", attempt);
            send_completion(http, config, &request)
        });

        match outcome {
            Ok(translated) => Ok(translated),
            Err(RetryError::Permanent(e)) => Err(e),
            Err(RetryError::Exhausted { attempts, last }) => Err(TranslateError::RetriesExhausted {
                attempts,
                source: Box::new(last),
            }),
        }
    }
}

/// Send one request and read the translation out of the response.
fn send_completion(http: &Client, config: &AzureConfig, request: &ChatRequest) -> Result<String> {
    let response = http
        .post(config.completions_url())
        .header("api-key", &config.api_key)
        .json(request)
        .send()?;

    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(classify_failure(status.as_u16(), &body));
    }
    parse_completion(&body)
}

/// Map a non-success response to an error. 429 and 503 mean "slow down".
pub fn classify_failure(status: u16, body: &str) -> TranslateError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.code {
            Some(code) => format!("{} ({})", envelope.error.message, code),
            None => envelope.error.message,
        },
        Err(_) => truncate(body, MAX_ERROR_BODY),
    };

    match status {
        429 | 503 => TranslateError::RateLimited { status, message },
        _ => TranslateError::Api { status, message },
    }
}

/// The first choice's message content, verbatim.
pub fn parse_completion(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| TranslateError::InvalidResponse(format!("{}: {}", e, truncate(body, MAX_ERROR_BODY))))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| TranslateError::InvalidResponse("no choices in response".to_string()))?;

    choice
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| {
            TranslateError::InvalidResponse(format!(
                "choice has no content (finish reason: {})",
                choice.finish_reason.as_deref().unwrap_or("unknown")
            ))
        })
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
