//! Error types for the translation client.

use thiserror::Error;

/// Result type alias using the translation error.
pub type Result<T> = std::result::Result<T, TranslateError>;

/// Invalid or missing connection settings. Fatal before any input is read.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Lack of Azure OpenAI Service API key (set OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("Lack of Azure OpenAI service endpoint (set OPENAI_API_BASE)")]
    MissingEndpoint,

    #[error(
        "The endpoint format of Azure OpenAI Service API is \
         <Your Azure OpenAI Resource Name>.openai.azure.com, got '{0}'"
    )]
    NotAzureEndpoint(String),

    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Lack of Azure OpenAI deployment name (set DEPLOYMENT_NAME)")]
    MissingDeployment,

    #[error("Temperature must be between 0.0 and 2.0, got {0}")]
    InvalidTemperature(f32),

    #[error("Max tokens must be greater than zero")]
    InvalidMaxTokens,
}

/// Errors from a translation request.
#[derive(Error, Debug)]
pub enum TranslateError {
    /// The service is rate limiting or throttling us. Retried.
    #[error("Rate limited by the translation service (HTTP {status}): {message}")]
    RateLimited { status: u16, message: String },

    /// Any other non-success response. Not retried.
    #[error("Translation service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A success response we could not read a translation from.
    #[error("Unexpected response from translation service: {0}")]
    InvalidResponse(String),

    /// Every attempt failed with a retryable error.
    #[error("Translation failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<TranslateError>,
    },
}

impl TranslateError {
    /// Rate limits, throttling and transient transport failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
