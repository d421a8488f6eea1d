//! Pipeline orchestration and the outward-facing run coordinator.
//!
//! The orchestrator is a hand-rolled state machine:
//! `Detect → Generate → Validate → {Autofix | Terminal}`, with `Autofix`
//! always looping back to `Validate`. The branch after each validation:
//! valid code terminates, exhausted attempts terminate, anything else gets
//! one repair pass.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use mermagen_llm::{PromptTemplates, TextGenerator};
use mermagen_shared::{
    DiagramStatus, DiagramType, ErrorCategory, ErrorCode, ExecutionMode, Language, MermagenError,
    Result,
};
use mermagen_storage::{NewRun, Storage};

use crate::stages;
use crate::state::{PipelineState, StageUpdate};
use crate::validator::Validator;

/// Cap on generate + autofix executions per run: one generation and at most
/// one repair pass.
pub const MAX_GENERATION_ATTEMPTS: u32 = 2;

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

/// Everything a pipeline run needs, constructed once at startup and shared
/// read-only across requests.
pub struct PipelineDeps {
    pub mode: ExecutionMode,
    /// Live-mode text generator. `None` is valid for mock mode; a live-mode
    /// stage reaching for a missing generator degrades like any failed call.
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub templates: PromptTemplates,
    pub validator: Validator,
    /// Model name surfaced in responses and persisted records.
    pub model_name: String,
    /// Run-history store. `None` disables persistence entirely.
    pub storage: Option<Arc<Storage>>,
}

impl PipelineDeps {
    pub(crate) fn generator(&self) -> Result<&dyn TextGenerator> {
        self.generator
            .as_deref()
            .ok_or_else(|| MermagenError::config("no text generator configured"))
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// The pipeline's non-terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Detect,
    Generate,
    Validate,
    Autofix,
}

/// Drive `state` from `Detect` to Terminal, invoking `observe` with every
/// stage's partial update before it is merged.
///
/// No stage can abort the run; the loop always terminates because the
/// Validate branch caps attempts at [`MAX_GENERATION_ATTEMPTS`].
pub async fn run_to_terminal<F>(deps: &PipelineDeps, state: &mut PipelineState, mut observe: F)
where
    F: FnMut(StageKind, &StageUpdate),
{
    let mut stage = StageKind::Detect;
    loop {
        let update = match stage {
            StageKind::Detect => stages::detect::run(state, deps).await,
            StageKind::Generate => stages::generate::run(state, deps).await,
            StageKind::Validate => stages::validate::run(state, deps),
            StageKind::Autofix => stages::autofix::run(state, deps).await,
        };
        observe(stage, &update);
        state.apply(update);

        stage = match stage {
            StageKind::Detect => StageKind::Generate,
            StageKind::Generate | StageKind::Autofix => StageKind::Validate,
            StageKind::Validate => {
                if state.is_valid || state.attempts >= MAX_GENERATION_ATTEMPTS {
                    return;
                }
                StageKind::Autofix
            }
        };
    }
}

// ---------------------------------------------------------------------------
// Run coordinator
// ---------------------------------------------------------------------------

/// One incoming generation request.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub prompt: String,
    pub diagram_type_hint: Option<String>,
    pub language_hint: Option<String>,
}

/// Response metadata shared by the plain and streaming surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub model: String,
    pub latency_ms: u64,
    pub attempts: u32,
    pub trace_id: String,
}

/// The final payload of a run: terminal state plus metadata.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mermaid_code: Option<String>,
    pub diagram_type: DiagramType,
    pub language: Language,
    pub errors: Vec<String>,
    pub meta: RunMeta,
}

/// First streaming event, sent before any stage runs. Language and diagram
/// type are placeholders until detection completes.
#[derive(Debug, Clone, Serialize)]
pub struct MetaEvent {
    pub trace_id: String,
    pub model: String,
    pub diagram_type: DiagramType,
    pub language: Language,
}

/// Streaming event carrying freshly generated markup.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkEvent {
    pub mermaid_code: String,
}

/// Terminal streaming event for an escaped defect.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEvent {
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    pub trace_id: String,
    pub retryable: bool,
}

impl ErrorEvent {
    /// Build an event from a code, with the code's Japanese display message
    /// and derived category/retryability.
    pub fn from_code(code: ErrorCode, trace_id: impl Into<String>) -> Self {
        Self {
            code,
            category: code.category(),
            message: code.message(Language::Ja).to_string(),
            details: None,
            trace_id: trace_id.into(),
            retryable: code.is_retryable(),
        }
    }
}

/// Ordered events of a streaming run: `Meta` first, `Chunk` per generated
/// code update, then exactly one `Done` or `Error`.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Meta(MetaEvent),
    Chunk(ChunkEvent),
    Done(RunSummary),
    Error(ErrorEvent),
}

/// Execute one request to completion and return the final payload.
#[instrument(skip_all, fields(prompt_len = request.prompt.len()))]
pub async fn run(deps: &PipelineDeps, request: RunRequest) -> RunSummary {
    let trace_id = Uuid::new_v4().to_string();
    let start = Instant::now();

    let mut state = PipelineState::new(
        request.prompt,
        request.diagram_type_hint.as_deref(),
        request.language_hint.as_deref(),
    );
    run_to_terminal(deps, &mut state, |_, _| {}).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    info!(
        trace_id = %trace_id,
        diagram_type = %state.diagram_type,
        is_valid = state.is_valid,
        attempts = state.attempts,
        latency_ms,
        "run complete"
    );

    persist_outcome(deps, &trace_id, &state, latency_ms).await;
    summarize(deps, trace_id, state, latency_ms)
}

/// Execute one request, emitting [`RunEvent`]s on `tx` as it progresses.
///
/// The pipeline runs in a spawned task so a panicking stage (a programming
/// defect) surfaces as a single terminal `Error` event instead of killing
/// the caller. Nothing is persisted on that path.
#[instrument(skip_all, fields(prompt_len = request.prompt.len()))]
pub async fn run_streaming(
    deps: Arc<PipelineDeps>,
    request: RunRequest,
    tx: UnboundedSender<RunEvent>,
) {
    let trace_id = Uuid::new_v4().to_string();
    let start = Instant::now();

    let _ = tx.send(RunEvent::Meta(MetaEvent {
        trace_id: trace_id.clone(),
        model: deps.model_name.clone(),
        diagram_type: DiagramType::Flowchart,
        language: Language::En,
    }));

    let task = tokio::spawn({
        let deps = Arc::clone(&deps);
        let tx = tx.clone();
        async move {
            let mut state = PipelineState::new(
                request.prompt,
                request.diagram_type_hint.as_deref(),
                request.language_hint.as_deref(),
            );
            run_to_terminal(&deps, &mut state, |_, update| {
                if let Some(code) = update.emitted_code() {
                    let _ = tx.send(RunEvent::Chunk(ChunkEvent {
                        mermaid_code: code.to_string(),
                    }));
                }
            })
            .await;
            state
        }
    });

    match task.await {
        Ok(state) => {
            let latency_ms = start.elapsed().as_millis() as u64;
            persist_outcome(&deps, &trace_id, &state, latency_ms).await;
            let _ = tx.send(RunEvent::Done(summarize(&deps, trace_id, state, latency_ms)));
        }
        Err(join_error) => {
            warn!(trace_id = %trace_id, error = %join_error, "pipeline task failed");
            let mut event = ErrorEvent::from_code(ErrorCode::GenerationFailed, trace_id);
            event.details = Some(vec![join_error.to_string()]);
            let _ = tx.send(RunEvent::Error(event));
        }
    }
}

fn summarize(
    deps: &PipelineDeps,
    trace_id: String,
    state: PipelineState,
    latency_ms: u64,
) -> RunSummary {
    RunSummary {
        mermaid_code: state.mermaid_code,
        diagram_type: state.diagram_type,
        language: state.language,
        errors: state.errors,
        meta: RunMeta {
            model: deps.model_name.clone(),
            latency_ms,
            attempts: state.attempts,
            trace_id,
        },
    }
}

/// Best-effort persistence of a terminal state. Mock runs are not recorded;
/// a storage failure is logged and swallowed.
async fn persist_outcome(
    deps: &PipelineDeps,
    trace_id: &str,
    state: &PipelineState,
    latency_ms: u64,
) {
    if deps.mode == ExecutionMode::Mock {
        return;
    }
    let Some(storage) = deps.storage.as_deref() else {
        return;
    };

    let status = if state.mermaid_code.is_some() && state.is_valid {
        DiagramStatus::Completed
    } else if !state.errors.is_empty() {
        DiagramStatus::Failed
    } else {
        DiagramStatus::Completed
    };
    let error_message = if state.errors.is_empty() {
        None
    } else {
        Some(state.errors.join("; "))
    };

    let result = storage
        .insert_run(NewRun {
            trace_id,
            prompt: &state.prompt,
            language: state.language,
            diagram_type: state.diagram_type,
            status,
            mermaid_code: state.mermaid_code.as_deref(),
            error_message: error_message.as_deref(),
            model: Some(&deps.model_name),
            latency_ms: Some(latency_ms),
            attempts: state.attempts,
        })
        .await;

    if let Err(err) = result {
        warn!(trace_id = %trace_id, error = %err, "failed to persist run");
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests_support {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Generator that replays a fixed response script, in order.
    pub(crate) struct ScriptedGenerator {
        responses: Mutex<VecDeque<String>>,
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn invoke(&self, _system: &str, _user: &str, _temperature: f32) -> Result<String> {
            self.responses
                .lock()
                .expect("script lock")
                .pop_front()
                .ok_or_else(|| MermagenError::Generation("script exhausted".into()))
        }
    }

    /// Generator that always fails with a network error.
    pub(crate) struct FailingGenerator {
        message: String,
    }

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn invoke(&self, _system: &str, _user: &str, _temperature: f32) -> Result<String> {
            Err(MermagenError::Network(self.message.clone()))
        }
    }

    fn deps_with(mode: ExecutionMode, generator: Option<Arc<dyn TextGenerator>>) -> PipelineDeps {
        PipelineDeps {
            mode,
            generator,
            templates: PromptTemplates::new(),
            validator: Validator::new(),
            model_name: "mock".into(),
            storage: None,
        }
    }

    pub(crate) fn mock_deps() -> PipelineDeps {
        deps_with(ExecutionMode::Mock, None)
    }

    pub(crate) fn scripted_deps(responses: Vec<String>) -> PipelineDeps {
        deps_with(
            ExecutionMode::Live,
            Some(Arc::new(ScriptedGenerator {
                responses: Mutex::new(responses.into()),
            })),
        )
    }

    pub(crate) fn failing_deps(message: &str) -> PipelineDeps {
        deps_with(
            ExecutionMode::Live,
            Some(Arc::new(FailingGenerator {
                message: message.to_string(),
            })),
        )
    }
}
