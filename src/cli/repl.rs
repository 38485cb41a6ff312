#[cfg(test)]
#[path = "repl_test.rs"]
mod tests;

use eyre::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{models::Session, session::SessionContext};

const HELP: &str = r#"Type any text to turn it into SQL. Commands:
  /new NAME        start a new session
  /sessions        list stored sessions
  /load ID|N       switch to a session by id or by its number in /sessions
  /delete          delete the current session
  /delete-all      delete every session
  /schema FILE     upload a schema file into the current session
  /history         show the stored conversation of the current session
  /diagram [FILE]  render the schema as Graphviz DOT (to FILE or the screen)
  /help            show this help
  /quit            leave
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Empty,
    Prompt(String),
    New(String),
    Sessions,
    Load(String),
    Delete,
    DeleteAll,
    Schema(String),
    History,
    Diagram(Option<String>),
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }

    let Some(command) = line.strip_prefix('/') else {
        return ReplCommand::Prompt(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match (name, arg) {
        ("new", name) => ReplCommand::New(name.to_string()),
        ("sessions", _) => ReplCommand::Sessions,
        ("load", id) if !id.is_empty() => ReplCommand::Load(id.to_string()),
        ("delete", _) => ReplCommand::Delete,
        ("delete-all", _) => ReplCommand::DeleteAll,
        ("schema", path) if !path.is_empty() => ReplCommand::Schema(path.to_string()),
        ("history", _) => ReplCommand::History,
        ("diagram", "") => ReplCommand::Diagram(None),
        ("diagram", path) => ReplCommand::Diagram(Some(path.to_string())),
        ("help", _) => ReplCommand::Help,
        ("quit" | "exit", _) => ReplCommand::Quit,
        _ => ReplCommand::Unknown(line.to_string()),
    }
}

/// Line oriented front-end over a [`SessionContext`]. Every line runs to
/// completion before the next one is read; a failing line is reported and
/// the loop goes on.
pub struct Repl {
    ctx: SessionContext,
    listing: Vec<Session>,
}

impl Repl {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            listing: vec![],
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        write_line(output, &format!("Current Session: {}", self.ctx.current().name())).await?;

        loop {
            output
                .write_all(format!("{}> ", self.ctx.current().name()).as_bytes())
                .await?;
            output.flush().await?;

            let line = match lines.next_line().await.wrap_err("reading input")? {
                Some(line) => line,
                None => break,
            };

            let command = parse_line(&line);
            if command == ReplCommand::Quit {
                break;
            }

            if let Err(err) = self.execute(command, output).await {
                log::error!("Command failed: {:?}", err);
                write_line(output, &format!("Error: {:#}", err)).await?;
            }
        }
        output.flush().await?;
        Ok(())
    }

    pub async fn execute<W>(&mut self, command: ReplCommand, output: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match command {
            ReplCommand::Empty | ReplCommand::Quit => {}

            ReplCommand::Prompt(text) => {
                let response = self.ctx.generate_sql(&text).await?;
                write_line(output, "Generated SQL query:").await?;
                write_line(output, &response).await?;
            }

            ReplCommand::New(name) => {
                let session = self.ctx.create(&name)?;
                write_line(output, &format!("New session created: {}", session.name())).await?;
            }

            ReplCommand::Sessions => {
                self.listing = self.ctx.sessions().await?;
                if self.listing.is_empty() {
                    write_line(output, "No sessions found.").await?;
                }
                let current = self.ctx.current().id();
                for (i, session) in self.listing.iter().enumerate() {
                    let marker = if session.id() == current { '*' } else { ' ' };
                    write_line(output, &format!("{} {}. {}", marker, i + 1, session)).await?;
                }
            }

            ReplCommand::Load(selector) => {
                let id = self.resolve_selector(&selector);
                let session = self.ctx.switch(&id).await?;
                write_line(output, &format!("Loaded session: {}", session.name())).await?;
            }

            ReplCommand::Delete => {
                let deleted = self.ctx.destroy_current().await?;
                write_line(output, &format!("Deleted session: {}", deleted.name())).await?;
            }

            ReplCommand::DeleteAll => {
                self.ctx.destroy_all().await?;
                self.listing.clear();
                write_line(output, "All sessions deleted.").await?;
            }

            ReplCommand::Schema(path) => {
                let schema = tokio::fs::read_to_string(&path)
                    .await
                    .wrap_err(format!("reading schema file {}", path))?;
                self.ctx.upload_schema(schema).await;
                write_line(output, "Schema uploaded successfully!").await?;
            }

            ReplCommand::History => {
                let messages = self.ctx.history().await?;
                if messages.is_empty() {
                    write_line(output, "No conversation history found.").await?;
                }
                for message in messages {
                    write_line(output, &message.to_string()).await?;
                }
            }

            ReplCommand::Diagram(path) => match self.ctx.diagram()? {
                None => write_line(output, "No schema available to generate ER diagram.").await?,
                Some(graph) => match path {
                    Some(path) => {
                        tokio::fs::write(&path, graph.to_dot())
                            .await
                            .wrap_err(format!("writing diagram to {}", path))?;
                        write_line(output, &format!("ER diagram written to {}", path)).await?;
                    }
                    None => output.write_all(graph.to_dot().as_bytes()).await?,
                },
            },

            ReplCommand::Help => output.write_all(HELP.as_bytes()).await?,

            ReplCommand::Unknown(line) => {
                write_line(output, &format!("Unknown command {}, type /help", line)).await?;
            }
        }
        Ok(())
    }

    /// `N` picks the N-th entry of the last `/sessions` listing, anything
    /// else is taken as a session id.
    fn resolve_selector(&self, selector: &str) -> String {
        match selector.parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.listing.len() => self.listing[n - 1].id().to_string(),
            _ => selector.to_string(),
        }
    }
}

pub(crate) async fn write_line<W>(output: &mut W, line: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    Ok(())
}
