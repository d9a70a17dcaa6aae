/// OpenAI chat completions HTTP client implementation.
///
/// This module provides `OpenAiClient` for making synchronous HTTP requests to the
/// chat completions endpoint, along with the error type and builder used to configure it.
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use super::types::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};

/// Longest response excerpt kept in `OpenAiError::Http`, in characters.
const BODY_SNIPPET_CHARS: usize = 200;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Errors that can occur when requesting tag suggestions.
#[derive(Debug, Error)]
pub enum OpenAiError {
    /// No API key was supplied
    #[error("OpenAI API key is not configured")]
    MissingApiKey,

    /// The text to tag is empty or otherwise unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout errors
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// Non-success HTTP status without a recognizable error body.
    /// `body` holds the start of the response text, possibly empty.
    #[error("HTTP error: status {status}{}", body_suffix(.body))]
    Http { status: u16, body: String },

    /// The API answered with a structured error payload
    #[error("OpenAI API error ({code}): {message}")]
    Upstream { code: String, message: String },

    /// The API answered 200 but not in the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

/// Trims `body` and cuts it to `BODY_SNIPPET_CHARS` characters.
fn body_snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

impl OpenAiError {
    /// Whether the failure happened while moving bytes rather than in the API itself.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_) | Self::Http { .. })
    }

    /// Whether the failure is caused by the caller's input or configuration.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::MissingApiKey | Self::InvalidInput(_))
    }
}

/// Builder for constructing `OpenAiClient` instances.
///
/// # Examples
///
/// ```
/// use autotag::openai::OpenAiClientBuilder;
///
/// let client = OpenAiClientBuilder::new()
///     .base_url("https://api.openai.com/v1")
///     .build()
///     .expect("Failed to create client");
/// assert_eq!(client.base_url(), "https://api.openai.com/v1");
/// ```
#[derive(Debug, Default)]
pub struct OpenAiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl OpenAiClientBuilder {
    /// Creates a new `OpenAiClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL of the API (everything before `/chat/completions`).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the overall request timeout. Defaults to 60 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the `OpenAiClient` with the configured settings.
    ///
    /// # Environment Variables
    ///
    /// If `base_url()` was not called, this method will check the `OPENAI_BASE_URL`
    /// environment variable. If not set, it defaults to `https://api.openai.com/v1`.
    ///
    /// # Errors
    ///
    /// Returns `OpenAiError::InvalidUrl` if the base URL does not parse, or
    /// `OpenAiError::Network` if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<OpenAiClient, OpenAiError> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => std::env::var("OPENAI_BASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        };
        let base_url = base_url.trim_end_matches('/').to_string();

        reqwest::Url::parse(&base_url)
            .map_err(|e| OpenAiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(60)))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(OpenAiError::Network)?;

        Ok(OpenAiClient { client, base_url })
    }
}

/// Synchronous HTTP client for the OpenAI chat completions API.
///
/// It should be constructed using `OpenAiClientBuilder`.
pub struct OpenAiClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

/// Trait for chat completion transport.
///
/// This trait enables mocking in unit tests; `TagSuggester` only talks to
/// the API through it.
pub trait OpenAiClientTrait: Send + Sync {
    /// Sends a chat completion request authenticated with `api_key`.
    ///
    /// Returns the decoded response body, or an error classified as transport,
    /// upstream or malformed.
    fn chat_completion(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiError>;
}

impl OpenAiClient {
    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl OpenAiClientTrait for OpenAiClient {
    fn chat_completion(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiError> {
        let url = self.completions_url();
        debug!(url = %url, model = %request.model, "sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .map_err(classify_transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().map_err(classify_transport_error)?;

        parse_completion_body(status, &body)
    }
}

fn classify_transport_error(error: reqwest::Error) -> OpenAiError {
    if error.is_timeout() {
        OpenAiError::Timeout(error)
    } else {
        OpenAiError::Network(error)
    }
}

/// Interprets a raw response body.
///
/// An error envelope wins regardless of status; otherwise anything but 200 is
/// an HTTP error, and a 200 body must decode as a chat completion.
pub(crate) fn parse_completion_body(
    status: u16,
    body: &str,
) -> Result<ChatCompletionResponse, OpenAiError> {
    if let Ok(envelope) = serde_json::from_str::<ApiErrorResponse>(body) {
        return Err(OpenAiError::Upstream {
            code: envelope.error.code_or_type(),
            message: envelope.error.message,
        });
    }

    if status != 200 {
        return Err(OpenAiError::Http {
            status,
            body: body_snippet(body),
        });
    }

    serde_json::from_str(body).map_err(|e| {
        OpenAiError::MalformedResponse(format!("response is not a chat completion: {e}"))
    })
}
