/// Storage file used when neither the config file nor `DB_FILE` names one
pub const DB_FILE: &str = "conversation_history.db";

pub const LOG_FILE_PATH: &str = "/tmp/typesql.log";

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com";

pub const DEFAULT_MODEL: &str = "gpt-4";

pub const DEFAULT_SESSION_NAME: &str = "Session 1";

/// Environment variable holding the OpenAI API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding the storage file
pub const DB_FILE_ENV: &str = "DB_FILE";

pub const SQL_PROMPT_TEMPLATE: &str = "You are a bot that converts user text into SQL statements. \
The given text may or may not contain the schema. If there is a schema, consider it strictly \
and proceed with the query; otherwise, based on the user input, create your own schema. \
Here is the user text: {text}";
