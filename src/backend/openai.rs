#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;

use crate::backend::{Backend, render_prompt};
use crate::config::constants::{DEFAULT_ENDPOINT, SQL_PROMPT_TEMPLATE};
use crate::config::user_agent;
use crate::models::{BackendPrompt, BackendUsage, Message, Role};
use async_trait::async_trait;
use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, time};
use thiserror::Error;

pub struct OpenAI {
    endpoint: String,
    api_key: Option<String>,
    timeout: Option<time::Duration>,
    prompt_template: String,
    max_output_tokens: Option<usize>,
}

#[async_trait]
impl Backend for OpenAI {
    async fn get_completion(&self, prompt: BackendPrompt) -> Result<String> {
        if prompt.model().is_empty() {
            bail!("no model is set");
        }

        let mut messages = prompt
            .context()
            .iter()
            .map(MessageRequest::from)
            .collect::<Vec<_>>();
        messages.push(MessageRequest {
            role: "user".to_string(),
            content: render_prompt(&self.prompt_template, prompt.text()),
        });

        self.chat_completion(prompt.model(), messages).await
    }
}

impl OpenAI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_prompt_template(mut self, template: &str) -> Self {
        self.prompt_template = template.to_string();
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: usize) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn timeout(&self) -> Option<time::Duration> {
        self.timeout
    }

    async fn chat_completion(&self, model: &str, messages: Vec<MessageRequest>) -> Result<String> {
        let completion_req = CompletionRequest {
            model: model.to_string(),
            messages,
            stream: false,
            max_completion_tokens: self.max_output_tokens,
        };

        let mut req = reqwest::Client::new()
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .header("Content-Type", "application/json")
            .header("User-Agent", user_agent());

        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        if let Some(token) = &self.api_key {
            req = req.bearer_auth(token);
        }

        log::trace!("Sending completion request: {:?}", completion_req);

        let res = req
            .json(&completion_req)
            .send()
            .await
            .wrap_err("sending completion request")?;

        if !res.status().is_success() {
            let http_code = res.status().as_u16();
            let resp = res.text().await.wrap_err("parsing error response")?;
            log::error!("Error response: {}", resp);
            let err = serde_json::from_str::<ErrorResponse>(&resp)
                .wrap_err(format!("parsing error response: {}", resp))?;
            let mut err = err.error;
            err.http_code = http_code;
            return Err(err.into());
        }

        let data = res
            .json::<CompletionResponse>()
            .await
            .wrap_err("parsing completion response")?;

        if let Some(usage) = data.usage {
            let usage = BackendUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            };
            log::debug!("Completion {} usage: {}", data.id, usage);
        }

        let choice = match data.choices.into_iter().next() {
            Some(choice) => choice,
            None => bail!("completion {} has no choices", data.id),
        };

        Ok(choice.message.content.unwrap_or_default())
    }
}

impl Default for OpenAI {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            timeout: None,
            prompt_template: SQL_PROMPT_TEMPLATE.to_string(),
            max_output_tokens: None,
        }
    }
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
struct MessageRequest {
    role: String,
    content: String,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<MessageRequest>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<usize>,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct CompletionMessageResponse {
    role: String,
    content: Option<String>,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct CompletionChoiceResponse {
    message: CompletionMessageResponse,
    finish_reason: Option<String>,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct CompletionResponse {
    id: String,
    choices: Vec<CompletionChoiceResponse>,
    usage: Option<CompletionUsageResponse>,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct CompletionUsageResponse {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: OpenAIError,
}

#[derive(Default, Error, Debug, Serialize, Deserialize)]
pub struct OpenAIError {
    #[serde(skip)]
    pub http_code: u16,
    pub message: String,
    #[serde(rename = "type", default)]
    pub err_type: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl Display for OpenAIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpenAI error ({}): {}", self.http_code, self.message)
    }
}

impl From<&Message> for MessageRequest {
    fn from(msg: &Message) -> Self {
        Self {
            role: match msg.role() {
                Role::User => "user".to_string(),
                Role::Bot => "assistant".to_string(),
            },
            content: msg.content().to_string(),
        }
    }
}
