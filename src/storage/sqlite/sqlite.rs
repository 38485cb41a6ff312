#[cfg(test)]
#[path = "sqlite_test.rs"]
mod tests;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, OpenFlags, named_params, params};

use crate::{
    models::{Message, Role, Session},
    storage::{Storage, StorageError},
};

use super::migration::MIGRATION;

pub struct Sqlite {
    conn: Connection,
}

impl Sqlite {
    pub async fn new(path: Option<&str>) -> Result<Self, StorageError> {
        let conn = match path {
            Some(path) => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
            )
            .await
            .map_err(|source| StorageError::Open {
                path: path.to_string(),
                source,
            })?,
            None => Connection::open_in_memory()
                .await
                .map_err(|source| StorageError::Open {
                    path: ":memory:".to_string(),
                    source,
                })?,
        };

        let ret = Self { conn };
        ret.run_migration().await?;
        Ok(ret)
    }

    async fn run_migration(&self) -> Result<(), StorageError> {
        self.conn
            .call(|conn| Ok(conn.execute_batch(MIGRATION)?))
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }
}

#[async_trait]
impl Storage for Sqlite {
    async fn append_message(
        &self,
        session_id: &str,
        session_name: &str,
        message: &Message,
    ) -> Result<(), StorageError> {
        let session_id = session_id.to_string();
        let session_name = session_name.to_string();
        let role = message.role().as_str();
        let content = message.content().to_string();
        let now = chrono::Utc::now().timestamp_millis();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    r#"INSERT INTO sessions (id, name, schema_text, created_at)
                VALUES (:id, :name, '', :created_at)
                ON CONFLICT(id) DO NOTHING
                "#,
                    named_params! {
                        ":id": session_id,
                        ":name": session_name,
                        ":created_at": now,
                    },
                )?;
                tx.execute(
                    r#"INSERT INTO conversations (session_id, session_name, role, content)
                VALUES (:session_id, :session_name, :role, :content)
                "#,
                    named_params! {
                        ":session_id": session_id,
                        ":session_name": session_name,
                        ":role": role,
                        ":content": content,
                    },
                )?;
                Ok(tx.commit()?)
            })
            .await
            .map_err(StorageError::query("storing message"))?;
        Ok(())
    }

    async fn get_messages(&self, session_id: &str) -> Result<Vec<Message>, StorageError> {
        let session_id = session_id.to_string();
        let messages = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT role, content FROM conversations WHERE session_id = ? ORDER BY rowid",
                )?;

                let mut rows = stmt.query(params![session_id])?;
                let mut messages = vec![];
                while let Some(row) = rows.next()? {
                    let role: String = row.get(0)?;
                    let content: Option<String> = row.get(1)?;
                    let role = role
                        .parse::<Role>()
                        .map_err(|err| tokio_rusqlite::Error::Other(err.into()))?;
                    messages.push(Message::new(role, content.unwrap_or_default()));
                }
                Ok(messages)
            })
            .await
            .map_err(StorageError::query("retrieving messages"))?;
        Ok(messages)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), StorageError> {
        let session_id = session_id.to_string();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM conversations WHERE session_id = ?",
                    params![session_id],
                )?;
                tx.execute("DELETE FROM sessions WHERE id = ?", params![session_id])?;
                Ok(tx.commit()?)
            })
            .await
            .map_err(StorageError::query("deleting session"))?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StorageError> {
        self.conn
            .call(|conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM conversations", [])?;
                tx.execute("DELETE FROM sessions", [])?;
                Ok(tx.commit()?)
            })
            .await
            .map_err(StorageError::query("deleting all sessions"))?;
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, StorageError> {
        let sessions = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT s.id, s.name, s.schema_text, s.created_at FROM sessions s
                WHERE EXISTS (SELECT 1 FROM conversations c WHERE c.session_id = s.id)
                ORDER BY s.created_at, s.rowid"#,
                )?;
                let mut rows = stmt.query([])?;
                let mut sessions = vec![];
                while let Some(row) = rows.next()? {
                    sessions.push(session_from_row(row)?);
                }
                Ok(sessions)
            })
            .await
            .map_err(StorageError::query("retrieving session names"))?;
        Ok(sessions)
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StorageError> {
        let id = session_id.to_string();
        let session = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, schema_text, created_at FROM sessions WHERE id = ?",
                )?;
                let mut rows = stmt.query(params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(session_from_row(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(StorageError::query("retrieving session"))?;

        let session = match session {
            Some(session) => session,
            None => return Ok(None),
        };
        let messages = self.get_messages(session.id()).await?;
        Ok(Some(session.with_messages(messages)))
    }

    async fn upsert_session(&self, session: &Session) -> Result<(), StorageError> {
        let id = session.id().to_string();
        let name = session.name().to_string();
        let schema = session.schema().to_string();
        let created_at = session.created_at().timestamp_millis();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO sessions (id, name, schema_text, created_at)
                VALUES (:id, :name, :schema_text, :created_at)
                ON CONFLICT(id) DO UPDATE SET
                    schema_text = excluded.schema_text
                "#,
                    named_params! {
                        ":id": id,
                        ":name": name,
                        ":schema_text": schema,
                        ":created_at": created_at,
                    },
                )?;
                Ok(())
            })
            .await
            .map_err(StorageError::query("storing session"))?;
        Ok(())
    }
}

fn session_from_row(row: &tokio_rusqlite::Row<'_>) -> Result<Session, tokio_rusqlite::Error> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let schema: String = row.get(2)?;
    let created_at: i64 = row.get(3)?;
    let created_at = chrono::DateTime::from_timestamp_millis(created_at).ok_or_else(|| {
        tokio_rusqlite::Error::Other(eyre::eyre!("invalid created_at {}", created_at).into())
    })?;

    Ok(Session::default()
        .with_id(id)
        .with_name(name)
        .with_schema(schema)
        .with_created_at(created_at))
}
