//! Autofix stage: one model-driven repair of invalid markup.

use tracing::{error, info};

use mermagen_llm::prompts::AUTOFIX_TEMPERATURE;
use mermagen_shared::{ExecutionMode, Result};

use crate::pipeline::PipelineDeps;
use crate::stages::clean_mermaid_code;
use crate::state::{PipelineState, StageUpdate};

/// Attempt one repair of the current markup.
///
/// Every path counts the attempt. Mock mode and the no-code/no-errors cases
/// return the code unchanged. A successful repair clears the error list so
/// re-validation judges the new code on its own; a failed repair call keeps
/// both code and errors as they were.
pub(crate) async fn run(state: &PipelineState, deps: &PipelineDeps) -> StageUpdate {
    let unchanged = StageUpdate {
        mermaid_code: Some(state.mermaid_code.clone()),
        attempts: Some(state.attempts + 1),
        ..Default::default()
    };

    if deps.mode == ExecutionMode::Mock {
        return unchanged;
    }

    let Some(code) = state.mermaid_code.as_deref().filter(|c| !c.is_empty()) else {
        return unchanged;
    };
    if state.errors.is_empty() {
        return unchanged;
    }

    match ask_model(code, &state.errors, deps).await {
        Ok(content) => {
            info!(length = content.len(), "autofix response received");
            StageUpdate {
                mermaid_code: Some(Some(clean_mermaid_code(&content))),
                attempts: Some(state.attempts + 1),
                errors: Some(Vec::new()),
                ..Default::default()
            }
        }
        Err(err) => {
            error!(error = %err, "autofix failed, keeping original code");
            unchanged
        }
    }
}

async fn ask_model(code: &str, errors: &[String], deps: &PipelineDeps) -> Result<String> {
    let generator = deps.generator()?;
    let system = deps.templates.autofix_system(errors);
    let user = deps.templates.autofix_user(code);
    generator.invoke(&system, &user, AUTOFIX_TEMPERATURE).await
}
