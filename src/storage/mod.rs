pub mod sqlite;

use std::sync::Arc;

use crate::{
    config::{StorageConfig, resolve_path},
    models::{Message, Session},
};
use async_trait::async_trait;
use eyre::{Context, Result};
#[cfg(test)]
use mockall::automock;
use sqlite::Sqlite;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("opening database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: tokio_rusqlite::Error,
    },

    #[error("running migration: {0}")]
    Migration(#[source] tokio_rusqlite::Error),

    #[error("{op}: {source}")]
    Query {
        op: &'static str,
        #[source]
        source: tokio_rusqlite::Error,
    },
}

impl StorageError {
    pub(crate) fn query(op: &'static str) -> impl FnOnce(tokio_rusqlite::Error) -> Self {
        move |source| Self::Query { op, source }
    }
}

/// Durable message log plus the session directory derived from it.
///
/// Every operation reports failures through [`StorageError`], so an empty
/// result always means "no data".
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Storage {
    /// Append one immutable message to the log of `session_id`, recording
    /// the session if it is not known yet.
    async fn append_message(
        &self,
        session_id: &str,
        session_name: &str,
        message: &Message,
    ) -> Result<(), StorageError>;

    /// Messages of a session in insertion order.
    async fn get_messages(&self, session_id: &str) -> Result<Vec<Message>, StorageError>;

    /// Remove a session and all of its messages. Unknown ids are not an error.
    async fn delete_session(&self, session_id: &str) -> Result<(), StorageError>;

    async fn delete_all(&self) -> Result<(), StorageError>;

    /// One entry per session that has at least one stored message.
    async fn list_sessions(&self) -> Result<Vec<Session>, StorageError>;

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StorageError>;

    /// Store session metadata. The name of an existing session is kept,
    /// its schema is replaced.
    async fn upsert_session(&self, session: &Session) -> Result<(), StorageError>;
}

pub type ArcStorage = Arc<dyn Storage + Send + Sync>;

pub async fn new_storage(config: &StorageConfig) -> Result<ArcStorage> {
    let storage = match config {
        StorageConfig::Sqlite(sqlite_config) => {
            let path = match sqlite_config.path() {
                Some(path) => Some(resolve_path(path).wrap_err("resolving database path")?),
                None => None,
            };
            log::debug!("Opening sqlite storage at {:?}", path);
            Arc::new(Sqlite::new(path.as_deref()).await?)
        }
    };
    Ok(storage)
}
