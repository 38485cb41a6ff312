use std::collections::HashMap;

use crate::config::constants::{DB_FILE, DEFAULT_ENDPOINT, DEFAULT_MODEL, LOG_FILE_PATH};

use super::*;

#[test]
fn test_load_configuration() {
    let config = load_configuration("./testdata/config.toml").expect("failed to load config");

    assert_eq!(config.general.verbose, true);

    let log = &config.log;
    assert_eq!(log.level.as_deref(), Some("debug"));
    let log_filters = log.filters.as_deref().unwrap_or_default();
    assert_eq!(log_filters.len(), 1);
    assert_eq!(log_filters[0].module.as_deref(), Some("typesql::backend"));
    assert_eq!(log_filters[0].level.as_deref(), Some("trace"));
    assert_eq!(log.file.path, "/var/log/typesql.log");
    assert_eq!(log.file.append, true);

    let backend = &config.backend;
    assert_eq!(backend.endpoint, "https://api.example.com");
    assert_eq!(backend.api_key.as_deref(), Some("sk-from-file"));
    assert_eq!(backend.model, "gpt-4o-mini");
    assert_eq!(backend.timeout_secs, Some(30));
    assert_eq!(backend.max_output_tokens, Some(2048));
    assert!(backend.prompt_template.contains("{text}"));

    match &config.storage {
        StorageConfig::Sqlite(sqlite) => {
            assert_eq!(sqlite.path(), Some("/var/lib/typesql/history.db"));
        }
    }
}

#[test]
fn test_load_configuration_with_some_default_fields() {
    let config =
        load_configuration("./testdata/config_with_default.toml").expect("failed to load config");

    assert_eq!(config.general.verbose, false);
    assert_eq!(config.log.level.as_deref(), Some("info"));
    assert_eq!(config.log.file.path, LOG_FILE_PATH);

    assert_eq!(config.backend.api_key.as_deref(), Some("sk-only-key"));
    assert_eq!(config.backend.endpoint, DEFAULT_ENDPOINT);
    assert_eq!(config.backend.model, DEFAULT_MODEL);

    match &config.storage {
        StorageConfig::Sqlite(sqlite) => assert_eq!(sqlite.path(), Some(DB_FILE)),
    }
}

#[test]
fn test_load_configuration_missing_file() {
    let err = load_configuration("./testdata/does-not-exist.toml").unwrap_err();
    assert!(err.to_string().contains("does-not-exist.toml"));
}

#[test]
fn test_apply_env_overrides() {
    let env = HashMap::from([
        ("OPENAI_API_KEY", "sk-from-env"),
        ("DB_FILE", "override.db"),
    ]);

    let mut config = Configuration::default();
    apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

    assert_eq!(config.backend.api_key.as_deref(), Some("sk-from-env"));
    match &config.storage {
        StorageConfig::Sqlite(sqlite) => assert_eq!(sqlite.path(), Some("override.db")),
    }
}

#[test]
fn test_apply_env_overrides_ignores_empty_values() {
    let mut config = load_configuration("./testdata/config.toml").expect("failed to load config");
    apply_env_overrides(&mut config, |key| match key {
        "OPENAI_API_KEY" => Some(String::new()),
        _ => None,
    });

    assert_eq!(config.backend.api_key.as_deref(), Some("sk-from-file"));
    match &config.storage {
        StorageConfig::Sqlite(sqlite) => {
            assert_eq!(sqlite.path(), Some("/var/lib/typesql/history.db"))
        }
    }
}

#[test]
fn test_basename() {
    assert_eq!(basename("src/config/utils.rs"), "utils.rs");
    assert_eq!(basename("main.rs"), "main.rs");
}

#[test]
fn test_resolve_path() {
    let dir = "/tmp/typesql-test";
    let user_path = "user_path";
    unsafe {
        std::env::set_var("TYPESQL_TEST_DIR", dir);
        std::env::set_var("TYPESQL_USER_PATH", user_path);
    }
    let ret = resolve_path("$TYPESQL_TEST_DIR/${TYPESQL_USER_PATH}/config.toml")
        .expect("failed to resolve path");
    assert_eq!(ret, format!("{dir}/{user_path}/config.toml"));

    let ret = resolve_path("/var/lib/typesql/history.db").expect("failed to resolve path");
    assert_eq!(ret, "/var/lib/typesql/history.db");
}
