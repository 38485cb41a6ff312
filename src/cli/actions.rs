#[cfg(test)]
#[path = "actions_test.rs"]
mod tests;

use eyre::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::repl::write_line;
use crate::{diagram::build_schema_graph, storage::ArcStorage};

pub async fn list_sessions<W>(storage: &ArcStorage, output: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let sessions = storage
        .list_sessions()
        .await
        .wrap_err("Error loading sessions")?;
    if sessions.is_empty() {
        write_line(output, "No sessions found.").await?;
    }
    for (i, session) in sessions.iter().enumerate() {
        write_line(output, &format!("{}. {}", i + 1, session)).await?;
    }
    output.flush().await?;
    Ok(())
}

pub async fn print_history<W>(storage: &ArcStorage, session_id: &str, output: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let messages = storage
        .get_messages(session_id)
        .await
        .wrap_err("retrieving messages")?;
    if messages.is_empty() {
        write_line(output, "No conversation history found.").await?;
    }
    for message in messages {
        write_line(output, &message.to_string()).await?;
    }
    output.flush().await?;
    Ok(())
}

pub async fn delete_session<W>(storage: &ArcStorage, session_id: &str, output: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    storage
        .delete_session(session_id)
        .await
        .wrap_err(format!("deleting session {}", session_id))?;
    log::info!("Deleted session {}", session_id);
    write_line(output, &format!("Deleted session: {}", session_id)).await?;
    output.flush().await?;
    Ok(())
}

pub async fn purge<W>(storage: &ArcStorage, output: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    storage
        .delete_all()
        .await
        .wrap_err("deleting all sessions")?;
    log::info!("Deleted all sessions");
    write_line(output, "All sessions deleted.").await?;
    output.flush().await?;
    Ok(())
}

/// Render the schema in `schema_file` as DOT, into `target` when given or
/// onto `output` otherwise.
pub async fn render_diagram<W>(schema_file: &str, target: Option<&str>, output: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let schema = tokio::fs::read_to_string(schema_file)
        .await
        .wrap_err(format!("reading schema file {}", schema_file))?;
    if schema.trim().is_empty() {
        write_line(output, "No schema available to generate ER diagram.").await?;
        output.flush().await?;
        return Ok(());
    }

    let dot = build_schema_graph(&schema)
        .wrap_err("generating ER diagram")?
        .to_dot();

    match target {
        Some(path) => {
            tokio::fs::write(path, dot)
                .await
                .wrap_err(format!("writing diagram to {}", path))?;
            write_line(output, &format!("ER diagram written to {}", path)).await?;
        }
        None => output.write_all(dot.as_bytes()).await?,
    }
    output.flush().await?;
    Ok(())
}
