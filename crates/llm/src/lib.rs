//! Azure OpenAI translation client.
//!
//! Sends one chat-completion request per piece of text and retries rate
//! limited requests with randomized exponential backoff.

pub mod client;
pub mod config;
pub mod error;
pub mod prompt;
pub mod retry;

pub use client::{AzureTranslator, ChatMessage, ChatRequest};
pub use config::{AzureConfig, AzureSettings, DEFAULT_API_VERSION};
pub use error::{ConfigError, Result, TranslateError};
pub use prompt::translation_prompt;
pub use retry::{RetryError, RetryPolicy, Retryable};
