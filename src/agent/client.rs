//! Chat transport against the Ollama API.
//!
//! Both agent roles (planner and executor) talk through the same
//! client; only their message histories and tool sets differ.

use crate::agent::tools::ToolDefinition;
use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Message in a chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallMessage>>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain("assistant", content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::plain("tool", content)
    }

    fn plain(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallMessage {
    pub function: ToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

/// The model's turn: free text plus zero or more tool calls.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallMessage>>,
}

/// Thin client over `POST /api/chat`.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    timeout_seconds: u64,
}

impl OllamaClient {
    pub fn new(
        base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
    ) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(AgentError::Response)?;

        Ok(Self {
            http,
            base_url,
            model,
            temperature,
            timeout_seconds,
        })
    }

    /// Sends the history plus tool definitions, returning the model's
    /// next turn. The caller owns the history; this method does not
    /// append to it.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ResponseMessage, AgentError> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));

        let tools_json: Vec<Value> = tools
            .iter()
            .map(|t| serde_json::to_value(t).expect("tool definitions are serializable"))
            .collect();

        let request = ChatRequest {
            model: &self.model,
            messages,
            tools: tools_json,
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        debug!("chat request with {} messages", messages.len());

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout(self.timeout_seconds)
                } else if e.is_connect() {
                    AgentError::Connect(self.base_url.clone())
                } else {
                    AgentError::Response(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api { status, body });
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(AgentError::Response)?;

        Ok(chat_response.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_constructors() {
        let msg = ChatMessage::system("hola");
        assert_eq!(msg.role, "system");
        assert_eq!(msg.content, "hola");
        assert!(msg.tool_calls.is_none());
    }

    #[test]
    fn test_plain_message_omits_tool_calls_field() {
        let json = serde_json::to_value(ChatMessage::user("x")).unwrap();
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn test_response_message_tolerates_missing_fields() {
        let msg: ResponseMessage = serde_json::from_str("{}").unwrap();
        assert!(msg.content.is_empty());
        assert!(msg.tool_calls.is_none());
    }
}
