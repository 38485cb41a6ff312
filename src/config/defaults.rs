use super::constants::*;

pub(crate) fn log_level() -> Option<String> {
    Some("info".to_string())
}

pub(crate) fn log_file_path() -> String {
    LOG_FILE_PATH.to_string()
}

pub(crate) fn endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

pub(crate) fn model() -> String {
    DEFAULT_MODEL.to_string()
}

pub(crate) fn prompt_template() -> String {
    SQL_PROMPT_TEMPLATE.to_string()
}

pub(crate) fn db_file() -> Option<String> {
    Some(DB_FILE.to_string())
}
