use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::prompt::LlmMessage;
use crate::config::LlmSettings;

const TEMPERATURE: f32 = 0.3;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("URL parsing failed: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("LLM API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("LLM response contained no message content")]
    EmptyCompletion,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [LlmMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completions endpoint. One attempt per call.
#[derive(Clone)]
pub struct LlmClient {
    http_client: HttpClient,
    endpoint: Url,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        let http_client = HttpClient::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            http_client,
            endpoint: completions_endpoint(&settings.base_url)?,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(
        &self,
        messages: &[LlmMessage],
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens,
        };

        log::debug!(
            "LLM request to {} ({} messages, max_tokens {})",
            self.endpoint,
            messages.len(),
            max_tokens
        );

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            log::error!("LLM API error {}: {}", status, body);
            return Err(LlmError::Status { status, body });
        }

        let completion: CompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyCompletion)
    }
}

fn completions_endpoint(base_url: &Url) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}/chat/completions",
        base_url.as_str().trim_end_matches('/')
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Role;

    #[test]
    fn endpoint_appends_completions_path() {
        let base = Url::parse("https://api.groq.com/openai/v1").unwrap();
        assert_eq!(
            completions_endpoint(&base).unwrap().as_str(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        let slashed = Url::parse("http://localhost:8080/v1/").unwrap();
        assert_eq!(
            completions_endpoint(&slashed).unwrap().as_str(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn request_body_matches_chat_completions_schema() {
        let messages = vec![LlmMessage::new(Role::User, "hi")];
        let body = serde_json::to_value(CompletionRequest {
            model: "llama-3.3-70b-versatile",
            messages: &messages,
            temperature: TEMPERATURE,
            max_tokens: 600,
        })
        .unwrap();
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hi");
        assert_eq!(body["max_tokens"], 600);
    }

    #[test]
    fn completion_content_is_read_from_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{\"a\":1}"}}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("{\"a\":1}"));
    }
}
