#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use crate::{
    config::constants::DEFAULT_SESSION_NAME,
    models::{Message, Role},
};

/// Marker the model output must contain to be merged into the schema.
pub const TABLE_DEFINITION_MARKER: &str = "CREATE TABLE";

#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    name: String,
    schema: String,
    messages: Vec<Message>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl Session {
    pub fn new(name: impl Into<String>) -> Self {
        Self::default().with_name(name)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_created_at(mut self, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        self.created_at = timestamp;
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn has_schema(&self) -> bool {
        !self.schema.is_empty()
    }

    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.created_at
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the schema, as an explicit upload does.
    pub fn set_schema(&mut self, schema: impl Into<String>) {
        self.schema = schema.into();
    }

    /// Grow the schema with a model response. Only responses carrying a
    /// table definition are merged. Returns whether the schema changed.
    pub fn absorb_schema(&mut self, response: &str) -> bool {
        if !response.contains(TABLE_DEFINITION_MARKER) {
            return false;
        }
        self.schema.push('\n');
        self.schema.push_str(response);
        true
    }

    /// Build the text sent to the model: the user text, prefixed with the
    /// current schema when there is one.
    pub fn combine_prompt(&self, text: &str) -> String {
        if self.has_schema() {
            format!("Schema: {} {}", self.schema, text)
        } else {
            text.to_string()
        }
    }

    pub fn last_message_by(&self, role: Role) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role() == role)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: DEFAULT_SESSION_NAME.to_string(),
            schema: String::new(),
            messages: vec![],
            created_at: chrono::Utc::now(),
        }
    }
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (ID: {})", self.name, self.id)
    }
}
