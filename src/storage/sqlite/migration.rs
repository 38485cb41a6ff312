/// `conversations` keeps the original four-column layout so existing
/// history files open unchanged. `sessions` holds the canonical session
/// record and is backfilled from any message rows that predate it.
pub(crate) const MIGRATION: &str = r#"
    CREATE TABLE IF NOT EXISTS conversations (
        session_id TEXT,
        session_name TEXT,
        role TEXT,
        content TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_conversations_session_id
        ON conversations (session_id);

    CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        schema_text TEXT NOT NULL DEFAULT '',
        created_at INTEGER NOT NULL
    );

    INSERT OR IGNORE INTO sessions (id, name, schema_text, created_at)
        SELECT c.session_id,
               COALESCE(
                   (SELECT earliest.session_name FROM conversations earliest
                     WHERE earliest.session_id = c.session_id
                     ORDER BY earliest.rowid LIMIT 1),
                   c.session_id
               ),
               '',
               0
          FROM conversations c
         WHERE c.session_id IS NOT NULL
         GROUP BY c.session_id;
"#;
