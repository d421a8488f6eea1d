//! Core domain types for mermagen diagram runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Detected prompt language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ja,
    En,
    Other,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ja => "ja",
            Self::En => "en",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ja" => Ok(Self::Ja),
            "en" => Ok(Self::En),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// DiagramType
// ---------------------------------------------------------------------------

/// The seven supported Mermaid diagram types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramType {
    Flowchart,
    Sequence,
    Gantt,
    Class,
    Er,
    State,
    Journey,
}

impl DiagramType {
    /// All known diagram types, in declaration order.
    pub const ALL: [DiagramType; 7] = [
        Self::Flowchart,
        Self::Sequence,
        Self::Gantt,
        Self::Class,
        Self::Er,
        Self::State,
        Self::Journey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart",
            Self::Sequence => "sequence",
            Self::Gantt => "gantt",
            Self::Class => "class",
            Self::Er => "er",
            Self::State => "state",
            Self::Journey => "journey",
        }
    }
}

impl std::fmt::Display for DiagramType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiagramType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "flowchart" => Ok(Self::Flowchart),
            "sequence" => Ok(Self::Sequence),
            "gantt" => Ok(Self::Gantt),
            "class" => Ok(Self::Class),
            "er" => Ok(Self::Er),
            "state" => Ok(Self::State),
            "journey" => Ok(Self::Journey),
            other => Err(format!("unknown diagram type: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// DiagramStatus
// ---------------------------------------------------------------------------

/// Terminal status of a diagram generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl DiagramStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for DiagramStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// RunRecord
// ---------------------------------------------------------------------------

/// A persisted diagram generation run, stored in the `diagrams` table.
///
/// Created once per completed pipeline run; the core never mutates a record
/// after insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique record identifier (UUID v7, time-sortable).
    pub id: Uuid,
    /// Per-request correlation identifier.
    pub trace_id: String,
    /// The user's input prompt.
    pub prompt: String,
    /// Detected language of the prompt.
    pub language: Language,
    /// Detected diagram type.
    pub diagram_type: DiagramType,
    /// Generated Mermaid markup, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mermaid_code: Option<String>,
    /// Terminal run status.
    pub status: DiagramStatus,
    /// Joined error messages from the pipeline, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Model used for generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Wall-clock latency of the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// Count of generate + autofix executions.
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
