use std::sync::Arc;

use crate::{
    backend::MockBackend,
    storage::{ArcStorage, Storage, sqlite::Sqlite},
};

use super::*;

#[test]
fn test_parse_line() {
    assert_eq!(parse_line("   "), ReplCommand::Empty);
    assert_eq!(
        parse_line(" list all users "),
        ReplCommand::Prompt("list all users".to_string())
    );
    assert_eq!(
        parse_line("/new  Sales report"),
        ReplCommand::New("Sales report".to_string())
    );
    assert_eq!(parse_line("/new"), ReplCommand::New(String::new()));
    assert_eq!(parse_line("/sessions"), ReplCommand::Sessions);
    assert_eq!(parse_line("/load 2"), ReplCommand::Load("2".to_string()));
    assert_eq!(parse_line("/delete"), ReplCommand::Delete);
    assert_eq!(parse_line("/delete-all"), ReplCommand::DeleteAll);
    assert_eq!(
        parse_line("/schema ./schema.sql"),
        ReplCommand::Schema("./schema.sql".to_string())
    );
    assert_eq!(parse_line("/history"), ReplCommand::History);
    assert_eq!(parse_line("/diagram"), ReplCommand::Diagram(None));
    assert_eq!(
        parse_line("/diagram er.dot"),
        ReplCommand::Diagram(Some("er.dot".to_string()))
    );
    assert_eq!(parse_line("/help"), ReplCommand::Help);
    assert_eq!(parse_line("/quit"), ReplCommand::Quit);
    assert_eq!(parse_line("/exit"), ReplCommand::Quit);
}

#[test]
fn test_parse_line_incomplete_commands() {
    assert_eq!(parse_line("/load"), ReplCommand::Unknown("/load".to_string()));
    assert_eq!(
        parse_line("/schema"),
        ReplCommand::Unknown("/schema".to_string())
    );
    assert_eq!(
        parse_line("/rename x"),
        ReplCommand::Unknown("/rename x".to_string())
    );
}

async fn setup_repl(reply: &'static str) -> (Repl, ArcStorage) {
    let storage: ArcStorage = Arc::new(Sqlite::new(None).await.expect("failed to open database"));
    let mut backend = MockBackend::new();
    backend
        .expect_get_completion()
        .returning(move |_| Ok(reply.to_string()));
    let ctx = SessionContext::new(storage.clone(), Arc::new(backend), "gpt-4");
    (Repl::new(ctx), storage)
}

async fn run_script(repl: &mut Repl, script: &str) -> String {
    let mut output: Vec<u8> = vec![];
    repl.run(script.as_bytes(), &mut output)
        .await
        .expect("repl failed");
    String::from_utf8(output).expect("output is utf-8")
}

#[tokio::test]
async fn test_run_generates_sql_and_shows_history() {
    let (mut repl, _) = setup_repl("SELECT * FROM users;").await;

    let output = run_script(&mut repl, "list all users\n/history\n/quit\nnot reached\n").await;

    assert!(output.starts_with("Current Session: Session 1\n"));
    assert!(output.contains("Generated SQL query:\nSELECT * FROM users;\n"));
    assert!(output.contains("User: list all users\nBot: SELECT * FROM users;\n"));
    assert!(!output.contains("not reached"));
    assert_eq!(repl.context().current().len(), 2);
}

#[tokio::test]
async fn test_run_reports_errors_and_continues() {
    let (mut repl, _) = setup_repl("SELECT 1;").await;

    let output = run_script(
        &mut repl,
        "/new\n/load missing\n/schema /definitely/not/here.sql\n/history\n",
    )
    .await;

    assert!(output.contains("Error: Please enter a session name."));
    assert!(output.contains("Error: session missing not found"));
    assert!(output.contains("Error: reading schema file /definitely/not/here.sql"));
    assert!(output.contains("No conversation history found."));
}

#[tokio::test]
async fn test_run_session_lifecycle() {
    let (mut repl, storage) = setup_repl("SELECT 1;").await;

    let output = run_script(
        &mut repl,
        "/sessions\n/new Orders\nq1\n/new Billing\nq2\n/sessions\n/load 1\n/delete\n/sessions\n",
    )
    .await;

    assert!(output.contains("No sessions found."));
    assert!(output.contains("New session created: Orders"));
    assert!(output.contains("New session created: Billing"));
    assert!(output.contains("  1. Orders (ID: "));
    assert!(output.contains("* 2. Billing (ID: "));
    assert!(output.contains("Loaded session: Orders"));
    assert!(output.contains("Deleted session: Orders"));

    let remaining = storage.list_sessions().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name(), "Billing");
}

#[tokio::test]
async fn test_run_delete_all() {
    let (mut repl, storage) = setup_repl("SELECT 1;").await;

    let output = run_script(&mut repl, "q1\n/new Other\nq2\n/delete-all\n").await;

    assert!(output.contains("All sessions deleted."));
    assert!(storage.list_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_run_diagram() {
    let (mut repl, _) = setup_repl("CREATE TABLE users (id INT);").await;

    let output = run_script(&mut repl, "/diagram\nmake a users table\n/diagram\n").await;

    assert!(output.contains("No schema available to generate ER diagram."));
    assert!(output.contains("digraph {\n"));
    assert!(output.contains(r#""users" -> "users_id INT""#));
}

#[tokio::test]
async fn test_run_unknown_command() {
    let (mut repl, _) = setup_repl("SELECT 1;").await;
    let output = run_script(&mut repl, "/frobnicate\n/help\n").await;

    assert!(output.contains("Unknown command /frobnicate, type /help"));
    assert!(output.contains("/delete-all"));
}
