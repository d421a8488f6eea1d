//! Diagram generation pipeline: detect → generate → validate → (autofix → validate).
//!
//! The pipeline is an explicit state machine over a single
//! [`PipelineState`] record. Each stage returns a narrow [`StageUpdate`]
//! that is merged into the accumulated state; no stage can abort a run —
//! internal failures degrade to safe partial updates and surface as state
//! data.

pub mod detector;
pub mod pipeline;
pub mod stages;
pub mod state;
pub mod validator;

pub use pipeline::{
    ChunkEvent, ErrorEvent, MAX_GENERATION_ATTEMPTS, MetaEvent, PipelineDeps, RunEvent, RunMeta,
    RunRequest, RunSummary, StageKind, run, run_streaming, run_to_terminal,
};
pub use state::{PipelineState, StageUpdate};
pub use validator::Validator;
