#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

pub mod openai;

pub use openai::OpenAI;

#[cfg(test)]
use mockall::automock;

use crate::{config::BackendConfig, models::BackendPrompt};
use async_trait::async_trait;
use eyre::Result;
use std::{sync::Arc, time::Duration};

/// Placeholder the prompt template substitutes with the user text.
pub const PROMPT_SLOT: &str = "{text}";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Backend {
    /// Send the prompt with its conversation context and return the text of
    /// the completion.
    async fn get_completion(&self, prompt: BackendPrompt) -> Result<String>;
}

pub type ArcBackend = Arc<dyn Backend + Send + Sync>;

pub fn render_prompt(template: &str, text: &str) -> String {
    template.replace(PROMPT_SLOT, text)
}

pub fn new_backend(config: &BackendConfig) -> Result<ArcBackend> {
    let api_key = match config.api_key.as_deref() {
        Some(key) if !key.is_empty() => key,
        _ => eyre::bail!("No API key configured, set OPENAI_API_KEY or backend.api_key"),
    };

    if !config.prompt_template.contains(PROMPT_SLOT) {
        eyre::bail!("backend.prompt_template must contain {}", PROMPT_SLOT);
    }

    let mut openai = OpenAI::default()
        .with_endpoint(&config.endpoint)
        .with_api_key(api_key)
        .with_prompt_template(&config.prompt_template);

    if let Some(timeout) = config.timeout_secs {
        openai = openai.with_timeout(Duration::from_secs(timeout as u64));
    }

    if let Some(max_output_tokens) = config.max_output_tokens {
        openai = openai.with_max_output_tokens(max_output_tokens);
    }

    log::debug!("Using OpenAI backend at {}", openai.endpoint());
    Ok(Arc::new(openai))
}
