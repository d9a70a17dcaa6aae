/// OpenAI HTTP client module.
///
/// This module provides a blocking HTTP client for the chat completions API,
/// the request/response bodies used for function calling, and error handling.
mod client;
mod types;

pub use client::{DEFAULT_BASE_URL, OpenAiClient, OpenAiClientBuilder, OpenAiClientTrait, OpenAiError};
pub use types::{
    ApiErrorBody, ApiErrorResponse, ChatChoice, ChatCompletionRequest, ChatCompletionResponse,
    ChatMessage, FunctionCall, FunctionCallTarget, FunctionDefinition, ResponseMessage,
};
