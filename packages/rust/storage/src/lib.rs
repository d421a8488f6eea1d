//! libSQL storage layer for diagram run history.
//!
//! The [`Storage`] struct wraps a local libSQL database holding one row per
//! pipeline run. The run coordinator writes best-effort; read endpoints use
//! the query methods.

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use uuid::Uuid;

use mermagen_shared::{
    DiagramStatus, DiagramType, Language, MermagenError, Result, RunRecord,
};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

/// Parameters for inserting a new run record.
#[derive(Debug, Clone)]
pub struct NewRun<'a> {
    pub trace_id: &'a str,
    pub prompt: &'a str,
    pub language: Language,
    pub diagram_type: DiagramType,
    pub status: DiagramStatus,
    pub mermaid_code: Option<&'a str>,
    pub error_message: Option<&'a str>,
    pub model: Option<&'a str>,
    pub latency_ms: Option<u64>,
    pub attempts: u32,
}

impl Storage {
    /// Open or create a database at `path`, applying pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MermagenError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| MermagenError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| MermagenError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    MermagenError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Run operations
    // -----------------------------------------------------------------------

    /// Insert a completed run. Returns the stored record.
    pub async fn insert_run(&self, new_run: NewRun<'_>) -> Result<RunRecord> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        self.conn
            .execute(
                "INSERT INTO diagrams (id, trace_id, prompt, language, diagram_type, status,
                                       mermaid_code, error_message, model, latency_ms, attempts,
                                       created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    id.to_string(),
                    new_run.trace_id,
                    new_run.prompt,
                    new_run.language.as_str(),
                    new_run.diagram_type.as_str(),
                    new_run.status.as_str(),
                    new_run.mermaid_code,
                    new_run.error_message,
                    new_run.model,
                    new_run.latency_ms.map(|l| l as i64),
                    i64::from(new_run.attempts),
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| MermagenError::Storage(e.to_string()))?;

        Ok(RunRecord {
            id,
            trace_id: new_run.trace_id.to_string(),
            prompt: new_run.prompt.to_string(),
            language: new_run.language,
            diagram_type: new_run.diagram_type,
            mermaid_code: new_run.mermaid_code.map(str::to_string),
            status: new_run.status,
            error_message: new_run.error_message.map(str::to_string),
            model: new_run.model.map(str::to_string),
            latency_ms: new_run.latency_ms,
            attempts: new_run.attempts,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get the most recent run for a trace id.
    pub async fn get_run_by_trace(&self, trace_id: &str) -> Result<Option<RunRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, trace_id, prompt, language, diagram_type, status, mermaid_code,
                        error_message, model, latency_ms, attempts, created_at, updated_at
                 FROM diagrams WHERE trace_id = ?1
                 ORDER BY created_at DESC LIMIT 1",
                params![trace_id],
            )
            .await
            .map_err(|e| MermagenError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_run_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(MermagenError::Storage(e.to_string())),
        }
    }

    /// List the most recent runs, newest first.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<RunRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, trace_id, prompt, language, diagram_type, status, mermaid_code,
                        error_message, model, latency_ms, attempts, created_at, updated_at
                 FROM diagrams ORDER BY created_at DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(|e| MermagenError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_run_record(&row)?);
        }
        Ok(results)
    }

    /// Update a run's status (out-of-band corrections).
    pub async fn update_status(&self, id: Uuid, status: DiagramStatus) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE diagrams SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now.as_str(), id.to_string()],
            )
            .await
            .map_err(|e| MermagenError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// Convert a database row to a [`RunRecord`].
fn row_to_run_record(row: &libsql::Row) -> Result<RunRecord> {
    let get_str = |idx: i32| -> Result<String> {
        row.get::<String>(idx)
            .map_err(|e| MermagenError::Storage(e.to_string()))
    };
    let parse_time = |s: String| -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| MermagenError::Storage(format!("invalid date: {e}")))
    };

    Ok(RunRecord {
        id: Uuid::parse_str(&get_str(0)?)
            .map_err(|e| MermagenError::Storage(format!("invalid id: {e}")))?,
        trace_id: get_str(1)?,
        prompt: get_str(2)?,
        language: get_str(3)?
            .parse()
            .map_err(MermagenError::Storage)?,
        diagram_type: get_str(4)?
            .parse()
            .map_err(MermagenError::Storage)?,
        status: get_str(5)?
            .parse()
            .map_err(MermagenError::Storage)?,
        mermaid_code: row.get::<String>(6).ok(),
        error_message: row.get::<String>(7).ok(),
        model: row.get::<String>(8).ok(),
        latency_ms: row.get::<i64>(9).ok().map(|v| v as u64),
        attempts: row
            .get::<i64>(10)
            .map_err(|e| MermagenError::Storage(e.to_string()))? as u32,
        created_at: parse_time(get_str(11)?)?,
        updated_at: parse_time(get_str(12)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("mermagen_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn sample_run<'a>(trace_id: &'a str, prompt: &'a str) -> NewRun<'a> {
        NewRun {
            trace_id,
            prompt,
            language: Language::En,
            diagram_type: DiagramType::Flowchart,
            status: DiagramStatus::Completed,
            mermaid_code: Some("flowchart TD\n    A --> B"),
            error_message: None,
            model: Some("mock"),
            latency_ms: Some(5),
            attempts: 1,
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("mermagen_test_{}.db", Uuid::now_v7()));
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn insert_and_fetch_by_trace() {
        let storage = test_storage().await;
        let trace_id = Uuid::new_v4().to_string();

        let record = storage
            .insert_run(sample_run(&trace_id, "Create a flowchart"))
            .await
            .expect("insert run");
        assert_eq!(record.trace_id, trace_id);
        assert_eq!(record.status, DiagramStatus::Completed);

        let found = storage
            .get_run_by_trace(&trace_id)
            .await
            .expect("get run")
            .expect("record exists");
        assert_eq!(found.id, record.id);
        assert_eq!(found.prompt, "Create a flowchart");
        assert_eq!(found.diagram_type, DiagramType::Flowchart);
        assert_eq!(found.mermaid_code.as_deref(), Some("flowchart TD\n    A --> B"));
        assert_eq!(found.attempts, 1);
    }

    #[tokio::test]
    async fn unknown_trace_returns_none() {
        let storage = test_storage().await;
        let found = storage
            .get_run_by_trace("no-such-trace")
            .await
            .expect("query ok");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn failed_run_with_error_message() {
        let storage = test_storage().await;
        let trace_id = Uuid::new_v4().to_string();

        storage
            .insert_run(NewRun {
                status: DiagramStatus::Failed,
                mermaid_code: None,
                error_message: Some("No Mermaid code generated"),
                attempts: 2,
                ..sample_run(&trace_id, "broken prompt")
            })
            .await
            .expect("insert run");

        let found = storage
            .get_run_by_trace(&trace_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status, DiagramStatus::Failed);
        assert!(found.mermaid_code.is_none());
        assert_eq!(
            found.error_message.as_deref(),
            Some("No Mermaid code generated")
        );
        assert_eq!(found.attempts, 2);
    }

    #[tokio::test]
    async fn list_recent_newest_first() {
        let storage = test_storage().await;
        for i in 0..3 {
            let trace_id = Uuid::new_v4().to_string();
            let prompt = format!("prompt {i}");
            storage
                .insert_run(sample_run(&trace_id, &prompt))
                .await
                .expect("insert run");
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let recent = storage.list_recent(2).await.expect("list recent");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].prompt, "prompt 2");
    }

    #[tokio::test]
    async fn status_update() {
        let storage = test_storage().await;
        let trace_id = Uuid::new_v4().to_string();
        let record = storage
            .insert_run(sample_run(&trace_id, "p"))
            .await
            .unwrap();

        storage
            .update_status(record.id, DiagramStatus::Cancelled)
            .await
            .expect("update status");

        let found = storage
            .get_run_by_trace(&trace_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status, DiagramStatus::Cancelled);
    }
}
