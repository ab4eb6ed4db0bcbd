//! Tag proposer backed by a language model
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint (OpenAI,
//! Ollama, vLLM, ...). The proposer only returns the model's free-text
//! reply; extracting and checking the annotation happens downstream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::prompt::PromptBuilder;

const USER_AGENT: &str = concat!("hed-bot/", env!("CARGO_PKG_VERSION"));

/// Proposer errors
#[derive(Debug, Error)]
pub enum ProposerError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Free-text reply to a tagging request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub reply: String,
}

/// Source of candidate tags for an event description
#[async_trait]
pub trait TagProposer: Send + Sync {
    /// Model identifier reported in diagnostics
    fn model(&self) -> &str;

    async fn propose(&self, description: &str) -> Result<Proposal, ProposerError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Connection settings for [`OpenAiProposer`]
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub temperature: f32,
}

/// OpenAI-compatible chat completion client
pub struct OpenAiProposer {
    http_client: reqwest::Client,
    settings: OpenAiSettings,
    prompts: PromptBuilder,
}

impl OpenAiProposer {
    pub fn new(settings: OpenAiSettings, prompts: PromptBuilder) -> Result<Self, ProposerError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProposerError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            settings,
            prompts,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TagProposer for OpenAiProposer {
    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn propose(&self, description: &str) -> Result<Proposal, ProposerError> {
        let user_prompt = self.prompts.user_prompt(description);
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: self.prompts.system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: self.settings.temperature,
        };

        tracing::debug!(model = %self.settings.model, endpoint = %self.endpoint(), "Requesting tag proposal");

        let mut request = self.http_client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProposerError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProposerError::ApiError(status.as_u16(), error_text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProposerError::ParseError(e.to_string()))?;

        let reply = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProposerError::ParseError("response has no message content".to_string()))?;

        tracing::info!(model = %self.settings.model, chars = reply.len(), "Received tag proposal");

        Ok(Proposal { reply })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Json, http::HeaderMap, http::StatusCode, routing::post, Router};
    use hed_common::config::PromptContext;
    use hed_common::SchemaBuilder;
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    fn proposer(base_url: String, api_key: Option<&str>) -> OpenAiProposer {
        let mut builder = SchemaBuilder::new();
        builder.add_path(&["Item", "Square"]).unwrap();
        let schema = builder.build();

        OpenAiProposer::new(
            OpenAiSettings {
                base_url,
                model: "test-model".to_string(),
                api_key: api_key.map(str::to_string),
                timeout: Duration::from_secs(5),
                temperature: 0.0,
            },
            PromptBuilder::new(&schema, PromptContext::Outline, ""),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_propose_sends_prompts_and_returns_reply() {
        async fn handler(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
            assert_eq!(body["model"], "test-model");
            assert_eq!(body["messages"][0]["role"], "system");
            assert!(body["messages"][1]["content"]
                .as_str()
                .unwrap()
                .contains("A square flashes"));
            assert_eq!(headers["authorization"], "Bearer sk-test");

            Json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Annotation: Square" } }]
            }))
        }

        let base = serve(Router::new().route("/v1/chat/completions", post(handler))).await;
        let proposal = proposer(base, Some("sk-test"))
            .propose("A square flashes")
            .await
            .unwrap();

        assert_eq!(proposal.reply, "Annotation: Square");
    }

    #[tokio::test]
    async fn test_api_error_status_is_reported() {
        let base = serve(Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, "invalid key") }),
        ))
        .await;

        match proposer(base, None).propose("anything").await {
            Err(ProposerError::ApiError(401, body)) => assert_eq!(body, "invalid key"),
            other => panic!("expected ApiError(401), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_content_is_parse_error() {
        let base = serve(Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({ "choices": [] })) }),
        ))
        .await;

        assert!(matches!(
            proposer(base, None).propose("anything").await,
            Err(ProposerError::ParseError(_))
        ));
    }
}
