use std::sync::Arc;

use crate::{
    backend::{ArcBackend, MockBackend},
    models::Role,
    storage::{MockStorage, StorageError, sqlite::Sqlite},
};

use super::*;

async fn memory_storage() -> ArcStorage {
    Arc::new(Sqlite::new(None).await.expect("failed to open database"))
}

fn backend_replying(reply: &'static str) -> ArcBackend {
    let mut backend = MockBackend::new();
    backend
        .expect_get_completion()
        .returning(move |_| Ok(reply.to_string()));
    Arc::new(backend)
}

fn closed_connection(op: &'static str) -> StorageError {
    StorageError::Query {
        op,
        source: tokio_rusqlite::Error::ConnectionClosed,
    }
}

#[tokio::test]
async fn test_generate_sql_stores_both_turns() {
    let storage = memory_storage().await;
    let mut ctx = SessionContext::new(
        storage.clone(),
        backend_replying("SELECT * FROM users;"),
        "gpt-4",
    );

    let response = ctx.generate_sql("list all users").await.unwrap();
    assert_eq!(response, "SELECT * FROM users;");

    let stored = storage.get_messages(ctx.current().id()).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0], Message::new_user("list all users"));
    assert_eq!(stored[1], Message::new_bot("SELECT * FROM users;"));
    assert_eq!(ctx.current().messages(), stored.as_slice());
    assert_eq!(ctx.history().await.unwrap(), stored);

    let sessions = ctx.sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id(), ctx.current().id());
    assert_eq!(sessions[0].name(), "Session 1");
}

#[tokio::test]
async fn test_generate_sql_sends_schema_and_context() {
    let mut backend = MockBackend::new();
    let mut seq = mockall::Sequence::new();
    backend
        .expect_get_completion()
        .withf(|p| p.model() == "gpt-4" && p.text() == "Schema: CREATE TABLE a (id INT) first" && p.context().is_empty())
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok("SELECT id FROM a;".to_string()));
    backend
        .expect_get_completion()
        .withf(|p| {
            p.text() == "Schema: CREATE TABLE a (id INT) second"
                && p.context().len() == 2
                && p.context()[1].role() == Role::Bot
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok("SELECT COUNT(*) FROM a;".to_string()));

    let mut ctx = SessionContext::new(memory_storage().await, Arc::new(backend), "gpt-4");
    ctx.upload_schema("CREATE TABLE a (id INT)").await;

    ctx.generate_sql("first").await.unwrap();
    ctx.generate_sql("second").await.unwrap();
    assert_eq!(ctx.current().len(), 4);
}

#[tokio::test]
async fn test_generate_sql_extends_schema_with_table_definitions() {
    let storage = memory_storage().await;
    let mut ctx = SessionContext::new(
        storage.clone(),
        backend_replying("CREATE TABLE users (id INT, name TEXT);"),
        "gpt-4",
    );

    ctx.generate_sql("a table for users").await.unwrap();
    assert_eq!(
        ctx.current().schema(),
        "\nCREATE TABLE users (id INT, name TEXT);"
    );

    let stored = storage
        .get_session(ctx.current().id())
        .await
        .unwrap()
        .expect("stored session");
    assert_eq!(stored.schema(), ctx.current().schema());

    let graph = ctx.diagram().unwrap().expect("schema graph");
    assert!(graph.node("users").is_some());
    assert!(graph.node("users_name TEXT").is_some());
}

#[tokio::test]
async fn test_generate_sql_survives_storage_failures() {
    let mut storage = MockStorage::new();
    storage
        .expect_append_message()
        .times(2)
        .returning(|_, _, _| Err(closed_connection("storing message")));
    storage.expect_upsert_session().never();

    let mut ctx = SessionContext::new(
        Arc::new(storage),
        backend_replying("SELECT 1;"),
        "gpt-4",
    );

    let response = ctx.generate_sql("anything").await.unwrap();
    assert_eq!(response, "SELECT 1;");
    assert_eq!(ctx.current().len(), 2);
}

#[tokio::test]
async fn test_generate_sql_propagates_backend_errors() {
    let mut backend = MockBackend::new();
    backend
        .expect_get_completion()
        .returning(|_| Err(eyre::eyre!("quota exceeded")));

    let storage = memory_storage().await;
    let mut ctx = SessionContext::new(storage.clone(), Arc::new(backend), "gpt-4");

    let err = ctx.generate_sql("hello").await.unwrap_err();
    assert_eq!(err.to_string(), "generating SQL");
    assert_eq!(err.root_cause().to_string(), "quota exceeded");

    // the user turn was already recorded
    let stored = storage.get_messages(ctx.current().id()).await.unwrap();
    assert_eq!(stored, vec![Message::new_user("hello")]);
}

#[tokio::test]
async fn test_create_and_switch_sessions() {
    let storage = memory_storage().await;
    let mut ctx = SessionContext::new(storage.clone(), backend_replying("SELECT 1;"), "gpt-4");

    assert!(ctx.create("   ").is_err());

    let first = ctx.create("First").unwrap().id().to_string();
    ctx.generate_sql("q1").await.unwrap();

    let second = ctx.create("Second").unwrap().id().to_string();
    assert_ne!(first, second);
    assert!(ctx.current().is_empty());
    assert_eq!(ctx.current().name(), "Second");

    let session = ctx.switch(&first).await.unwrap();
    assert_eq!(session.name(), "First");
    assert_eq!(session.len(), 2);

    // switching to the current session is a no-op
    assert_eq!(ctx.switch(&first).await.unwrap().id(), first);

    assert!(ctx.switch("missing").await.is_err());
    assert_eq!(ctx.current().id(), first);
}

#[tokio::test]
async fn test_switch_loads_stored_session() {
    let storage = memory_storage().await;
    storage
        .upsert_session(
            &Session::new("Stored")
                .with_id("stored")
                .with_schema("CREATE TABLE t (id INT)"),
        )
        .await
        .unwrap();
    storage
        .append_message("stored", "Stored", &Message::new_user("old question"))
        .await
        .unwrap();

    let mut ctx = SessionContext::new(storage, backend_replying("SELECT 1;"), "gpt-4");
    let session = ctx.switch("stored").await.unwrap();

    assert_eq!(session.name(), "Stored");
    assert_eq!(session.schema(), "CREATE TABLE t (id INT)");
    assert_eq!(session.messages(), &[Message::new_user("old question")]);
}

#[tokio::test]
async fn test_destroy_current() {
    let storage = memory_storage().await;
    let mut ctx = SessionContext::new(storage.clone(), backend_replying("SELECT 1;"), "gpt-4");

    ctx.create("Doomed").unwrap();
    ctx.generate_sql("q").await.unwrap();
    let doomed = ctx.current().id().to_string();

    let deleted = ctx.destroy_current().await.unwrap();
    assert_eq!(deleted.id(), doomed);
    assert_ne!(ctx.current().id(), doomed);
    assert!(storage.get_messages(&doomed).await.unwrap().is_empty());
    assert!(ctx.sessions().await.unwrap().is_empty());
    assert!(ctx.switch(&doomed).await.is_err());
}

#[tokio::test]
async fn test_destroy_all() {
    let storage = memory_storage().await;
    let mut ctx = SessionContext::new(storage.clone(), backend_replying("SELECT 1;"), "gpt-4");

    ctx.create("One").unwrap();
    ctx.generate_sql("q").await.unwrap();
    ctx.create("Two").unwrap();
    ctx.generate_sql("q").await.unwrap();
    assert_eq!(ctx.sessions().await.unwrap().len(), 2);

    ctx.destroy_all().await.unwrap();
    assert!(ctx.sessions().await.unwrap().is_empty());
    assert_eq!(ctx.loaded().count(), 0);
    assert!(ctx.current().is_empty());
}

#[tokio::test]
async fn test_sessions_reports_storage_failure() {
    let mut storage = MockStorage::new();
    storage
        .expect_list_sessions()
        .returning(|| Err(closed_connection("retrieving session names")));

    let ctx = SessionContext::new(Arc::new(storage), backend_replying("SELECT 1;"), "gpt-4");
    let err = ctx.sessions().await.unwrap_err();
    assert_eq!(err.to_string(), "Error loading sessions");
    assert!(err.downcast_ref::<StorageError>().is_some());
}

#[tokio::test]
async fn test_diagram() {
    let mut ctx = SessionContext::new(memory_storage().await, backend_replying("SELECT 1;"), "gpt-4");
    assert!(ctx.diagram().unwrap().is_none());

    ctx.upload_schema("CREATE TABLE a (id INT); CREATE TABLE broken").await;
    let err = ctx.diagram().unwrap_err();
    assert_eq!(err.to_string(), "generating ER diagram");

    ctx.upload_schema("CREATE TABLE a (id INT);").await;
    let graph = ctx.diagram().unwrap().expect("graph");
    assert_eq!(graph.nodes().len(), 2);
}
