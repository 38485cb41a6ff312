use crate::models::Message;

#[derive(Debug, Default, Clone)]
pub struct BackendUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// A single completion request: the user text plus the running
/// conversation of the session it belongs to.
#[derive(Debug, Clone)]
pub struct BackendPrompt {
    model: String,
    text: String,
    context: Vec<Message>,
}

impl BackendPrompt {
    pub fn new(text: impl Into<String>) -> BackendPrompt {
        BackendPrompt {
            model: String::new(),
            text: text.into(),
            context: vec![],
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_context(mut self, ctx: Vec<Message>) -> Self {
        self.context = ctx;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn context(&self) -> &[Message] {
        &self.context
    }
}

impl std::fmt::Display for BackendUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Prompt Tokens: {}, Completion Token: {}, Total: {}",
            self.prompt_tokens, self.completion_tokens, self.total_tokens
        )
    }
}
