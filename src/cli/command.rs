#[cfg(test)]
#[path = "command_test.rs"]
mod tests;

use clap::{Parser, Subcommand};
use eyre::{Context, Result};

use crate::config::{self, Configuration, apply_env_overrides, load_configuration, lookup_config_path};

#[derive(Debug, Parser)]
#[command(
    version,
    about,
    long_about = r#"Turn natural-language text into SQL statements with an OpenAI model

Default configuration file location looks up in the following order:
    * $XDG_CONFIG_HOME/typesql/config.toml
    * $HOME/.config/typesql/config.toml
    * $HOME/.typesql.toml

OPENAI_API_KEY and DB_FILE (also read from a .env file) override the
configured API key and database file.
"#,
    disable_version_flag = true
)]
pub struct Command {
    /// Configuration file path
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Print startup progress
    #[arg(long)]
    verbose: bool,

    /// Show the version
    #[arg(short, long)]
    version: bool,

    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Action {
    /// Start an interactive chat (default)
    Chat {
        /// Resume a stored session
        #[arg(long, value_name = "ID")]
        session: Option<String>,

        /// Start a new session with this name
        #[arg(long, value_name = "NAME", conflicts_with = "session")]
        name: Option<String>,

        /// Upload a schema file into the session
        #[arg(long, value_name = "FILE")]
        schema: Option<String>,
    },

    /// List stored sessions
    Sessions,

    /// Print the stored conversation of a session
    History {
        #[arg(value_name = "ID")]
        session_id: String,
    },

    /// Delete a session and its messages
    Delete {
        #[arg(value_name = "ID")]
        session_id: String,
    },

    /// Delete every stored session
    Purge,

    /// Render the ER diagram of a schema file as Graphviz DOT
    Diagram {
        #[arg(value_name = "FILE")]
        schema_file: String,

        /// Write the diagram to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<String>,
    },
}

impl Command {
    pub fn new() -> Command {
        Self::parse()
    }

    pub fn get_config(&self) -> Result<Configuration> {
        let config_path = self
            .config
            .clone()
            .unwrap_or_else(|| lookup_config_path().unwrap_or_default());

        let mut config = if config_path.is_empty() {
            // No config path is specified just use the default config
            Configuration::default()
        } else {
            load_configuration(config_path.as_str()).wrap_err("loading configuration")?
        };

        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err).wrap_err("loading .env"),
        }
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());

        if self.verbose {
            config.general.verbose = true;
        }
        Ok(config)
    }

    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    pub fn version(&self) -> bool {
        self.version
    }

    pub fn print_version(&self) {
        println!("{}", config::version())
    }
}

impl Default for Action {
    fn default() -> Self {
        Action::Chat {
            session: None,
            name: None,
            schema: None,
        }
    }
}
