#[cfg(test)]
#[path = "context_test.rs"]
mod tests;

use std::collections::HashMap;

use eyre::{Context, Result, bail};

use crate::{
    backend::ArcBackend,
    diagram::{SchemaGraph, build_schema_graph},
    models::{BackendPrompt, Message, Session},
    storage::ArcStorage,
};

/// Interaction state of one user: the current session with its message
/// buffer, plus every session loaded so far in this process.
///
/// Writes of individual chat turns are best effort: a failed write is
/// logged and the turn still completes. Listing, loading and deletion
/// report storage failures to the caller.
pub struct SessionContext {
    storage: ArcStorage,
    backend: ArcBackend,
    model: String,
    current: Session,
    loaded: HashMap<String, Session>,
}

impl SessionContext {
    pub fn new(storage: ArcStorage, backend: ArcBackend, model: impl Into<String>) -> Self {
        Self {
            storage,
            backend,
            model: model.into(),
            current: Session::default(),
            loaded: HashMap::new(),
        }
    }

    pub fn current(&self) -> &Session {
        &self.current
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sessions loaded in this process, the current one excluded.
    pub fn loaded(&self) -> impl Iterator<Item = &Session> {
        self.loaded.values()
    }

    /// Start a new, empty session and make it current.
    pub fn create(&mut self, name: &str) -> Result<&Session> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Please enter a session name.");
        }

        let session = Session::new(name);
        log::info!("Created session {}", session);
        self.replace_current(session);
        Ok(&self.current)
    }

    /// Known sessions, one per session with stored messages.
    pub async fn sessions(&self) -> Result<Vec<Session>> {
        let sessions = self
            .storage
            .list_sessions()
            .await
            .wrap_err("Error loading sessions")?;
        Ok(sessions)
    }

    /// Make `session_id` the current session. Sessions already loaded in
    /// this process keep their in-memory buffer, others are read from
    /// storage.
    pub async fn switch(&mut self, session_id: &str) -> Result<&Session> {
        if self.current.id() == session_id {
            return Ok(&self.current);
        }

        let session = match self.loaded.remove(session_id) {
            Some(session) => session,
            None => self
                .storage
                .get_session(session_id)
                .await
                .wrap_err(format!("loading session {}", session_id))?
                .ok_or_else(|| eyre::eyre!("session {} not found", session_id))?,
        };

        log::info!("Loaded session {}", session);
        self.replace_current(session);
        Ok(&self.current)
    }

    /// Delete the current session with all of its messages and start over
    /// with a fresh session. Returns the deleted session.
    pub async fn destroy_current(&mut self) -> Result<Session> {
        let id = self.current.id().to_string();
        self.storage
            .delete_session(&id)
            .await
            .wrap_err(format!("deleting session {}", id))?;
        self.loaded.remove(&id);

        log::info!("Deleted session {}", self.current);
        Ok(std::mem::take(&mut self.current))
    }

    /// Delete every stored session and drop every loaded buffer.
    pub async fn destroy_all(&mut self) -> Result<()> {
        self.storage
            .delete_all()
            .await
            .wrap_err("deleting all sessions")?;
        self.loaded.clear();
        self.current = Session::default();
        log::info!("Deleted all sessions");
        Ok(())
    }

    /// Replace the schema of the current session with uploaded text.
    pub async fn upload_schema(&mut self, schema: impl Into<String>) {
        self.current.set_schema(schema);
        self.save_session().await;
    }

    /// Turn `text` into SQL with the language model.
    ///
    /// The user turn and the model turn are appended to the session and
    /// stored. A response containing a table definition is merged into the
    /// session schema.
    pub async fn generate_sql(&mut self, text: &str) -> Result<String> {
        let combined = self.current.combine_prompt(text);
        let context = self.current.messages().to_vec();

        self.record(Message::new_user(combined.as_str())).await;

        let prompt = BackendPrompt::new(combined)
            .with_model(&self.model)
            .with_context(context);
        let response = self
            .backend
            .get_completion(prompt)
            .await
            .wrap_err("generating SQL")?;

        self.record(Message::new_bot(response.as_str())).await;

        if self.current.absorb_schema(&response) {
            log::debug!("Schema of session {} extended", self.current.id());
            self.save_session().await;
        }

        Ok(response)
    }

    /// Stored conversation of the current session.
    pub async fn history(&self) -> Result<Vec<Message>> {
        let messages = self
            .storage
            .get_messages(self.current.id())
            .await
            .wrap_err("retrieving messages")?;
        Ok(messages)
    }

    /// Diagram of the current schema, `None` when there is no schema yet.
    pub fn diagram(&self) -> Result<Option<SchemaGraph>> {
        if !self.current.has_schema() {
            return Ok(None);
        }
        let graph = build_schema_graph(self.current.schema())
            .wrap_err("generating ER diagram")?;
        Ok(Some(graph))
    }

    fn replace_current(&mut self, session: Session) {
        let previous = std::mem::replace(&mut self.current, session);
        // untouched sessions have nothing worth switching back to
        if !previous.is_empty() || previous.has_schema() {
            self.loaded.insert(previous.id().to_string(), previous);
        }
    }

    async fn record(&mut self, message: Message) {
        if let Err(err) = self
            .storage
            .append_message(self.current.id(), self.current.name(), &message)
            .await
        {
            log::error!("Error storing message: {}", err);
        }
        self.current.append_message(message);
    }

    async fn save_session(&self) {
        if let Err(err) = self.storage.upsert_session(&self.current).await {
            log::error!("Error storing session {}: {}", self.current.id(), err);
        }
    }
}
