//! Minimal chat-completions wire client for an Azure OpenAI deployment.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const API_VERSION: &str = "2024-06-01";
const MAX_TOKENS: u32 = 1500;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat provider returned status {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("chat response contained no choices")]
    EmptyResponse,
}

/// One entry in the conversation transcript sent to the provider.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text("assistant", content)
    }

    /// Echoes the assistant turn that requested tool invocations.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: "assistant",
            content: None,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// The reply to a single tool call, keyed by the provider-assigned id.
    pub fn tool(tool_call_id: String, content: String) -> Self {
        Self {
            role: "tool",
            content: Some(content),
            tool_calls: None,
            tool_call_id: Some(tool_call_id),
        }
    }

    fn text(role: &'static str, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
struct FunctionDefinition {
    name: &'static str,
    description: String,
    parameters: Value,
}

impl ToolDefinition {
    pub fn function(name: &'static str, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            kind: "function",
            function: FunctionDefinition {
                name,
                description: description.into(),
                parameters,
            },
        }
    }
}

/// A model-issued tool invocation. Serializable so it can be echoed back
/// verbatim in the follow-up request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: Completion,
}

#[derive(Debug, Deserialize)]
pub struct Completion {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

pub struct ChatClient {
    http: Client,
    endpoint: String,
    deployment: String,
    api_key: Option<String>,
}

impl ChatClient {
    pub fn new(endpoint: String, deployment: String, api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint,
            deployment,
            api_key,
        }
    }

    pub async fn complete(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<Completion, ChatError> {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            API_VERSION,
        );

        let mut request = self.http.post(&url).json(&ChatCompletionRequest {
            messages,
            tools,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        });
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Provider {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let mut parsed: ChatCompletionResponse = response.json().await?;
        if parsed.choices.is_empty() {
            return Err(ChatError::EmptyResponse);
        }
        Ok(parsed.choices.remove(0).message)
    }
}
