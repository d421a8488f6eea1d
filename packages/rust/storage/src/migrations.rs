//! SQL migration definitions for the mermagen database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as a batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: diagrams",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per diagram generation run
CREATE TABLE IF NOT EXISTS diagrams (
    id            TEXT PRIMARY KEY,
    trace_id      TEXT NOT NULL,
    prompt        TEXT NOT NULL,
    language      TEXT NOT NULL,
    diagram_type  TEXT NOT NULL,
    status        TEXT NOT NULL,
    mermaid_code  TEXT,
    error_message TEXT,
    model         TEXT,
    latency_ms    INTEGER,
    attempts      INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_diagrams_trace_id ON diagrams(trace_id);
CREATE INDEX IF NOT EXISTS idx_diagrams_created_at ON diagrams(created_at);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
