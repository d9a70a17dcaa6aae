//! Chat completion request and response bodies used for function calling.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for the chat completions endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
    pub functions: Vec<FunctionDefinition>,
    pub function_call: FunctionCallTarget,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A function the model is allowed (here: forced) to call.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the function's parameters.
    pub parameters: Value,
}

/// Names the function the model must call.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionCallTarget {
    pub name: String,
}

/// Response from the chat completions endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl ChatCompletionResponse {
    /// Returns the function call of the first choice, if the model made one.
    pub fn function_call(&self) -> Option<&FunctionCall> {
        self.choices
            .first()
            .and_then(|choice| choice.message.function_call.as_ref())
    }
}

/// Single chat completion choice.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: usize,
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message; `content` is null when the model called a function.
#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub function_call: Option<FunctionCall>,
}

/// Function call emitted by the model. `arguments` is itself a JSON string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// Error envelope returned by the API.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// Error details reported by the API.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
}

impl ApiErrorBody {
    /// Best available machine-readable code: `code`, then `type`, then "unknown".
    pub fn code_or_type(&self) -> String {
        match &self.code {
            Some(Value::String(code)) => code.clone(),
            Some(Value::Number(code)) => code.to_string(),
            _ => self
                .error_type
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_call_is_read_from_first_choice() {
        let body = serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "function_call": {
                        "name": "suggest_tags",
                        "arguments": "{\"tags\":[\"rust\"]}"
                    }
                },
                "finish_reason": "stop"
            }]
        });

        let response: ChatCompletionResponse = serde_json::from_value(body).unwrap();
        let call = response.function_call().unwrap();
        assert_eq!(call.name, "suggest_tags");
        assert_eq!(call.arguments, r#"{"tags":["rust"]}"#);
    }

    #[test]
    fn missing_function_call_is_none() {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "rust, async"}}]
        });
        let response: ChatCompletionResponse = serde_json::from_value(body).unwrap();
        assert!(response.function_call().is_none());

        let empty: ChatCompletionResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.function_call().is_none());
    }

    #[test]
    fn error_code_prefers_code_then_type() {
        let with_code: ApiErrorResponse = serde_json::from_value(serde_json::json!({
            "error": {"message": "bad key", "type": "invalid_request_error", "param": null, "code": "invalid_api_key"}
        }))
        .unwrap();
        assert_eq!(with_code.error.code_or_type(), "invalid_api_key");

        let type_only: ApiErrorResponse = serde_json::from_value(serde_json::json!({
            "error": {"message": "slow down", "type": "rate_limit_error", "code": null}
        }))
        .unwrap();
        assert_eq!(type_only.error.code_or_type(), "rate_limit_error");
    }
}
