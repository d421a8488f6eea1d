//! Request and response schemas for the diagram API.

use serde::{Deserialize, Serialize};

use mermagen_core::{RunRequest, RunSummary};
use mermagen_shared::{DiagramType, Language};

/// Body of `POST /api/diagram` and `POST /api/diagram/stream`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DiagramRequest {
    /// Prompt describing the diagram.
    pub prompt: String,

    /// Language hint: `auto`, `ja`, or `en`.
    #[serde(default = "default_auto")]
    pub language_hint: String,

    /// Diagram type hint: `auto` or one of the seven known types.
    #[serde(default = "default_auto")]
    pub diagram_type_hint: String,
}

fn default_auto() -> String {
    "auto".into()
}

impl From<DiagramRequest> for RunRequest {
    fn from(request: DiagramRequest) -> Self {
        Self {
            prompt: request.prompt,
            diagram_type_hint: Some(request.diagram_type_hint),
            language_hint: Some(request.language_hint),
        }
    }
}

/// Metadata block of a diagram response.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct DiagramMeta {
    pub model: String,
    pub latency_ms: u64,
    pub attempts: u32,
    pub trace_id: String,
}

/// Body of a non-streaming response and of the streaming `done` event.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct DiagramResponse {
    /// Generated markup; empty string when generation produced nothing.
    pub mermaid_code: String,
    pub diagram_type: DiagramType,
    pub language: Language,
    pub errors: Vec<String>,
    pub meta: DiagramMeta,
}

impl From<RunSummary> for DiagramResponse {
    fn from(summary: RunSummary) -> Self {
        Self {
            mermaid_code: summary.mermaid_code.unwrap_or_default(),
            diagram_type: summary.diagram_type,
            language: summary.language,
            errors: summary.errors,
            meta: DiagramMeta {
                model: summary.meta.model,
                latency_ms: summary.meta.latency_ms,
                attempts: summary.meta.attempts,
                trace_id: summary.meta.trace_id,
            },
        }
    }
}
