//! Detect stage: classify the prompt's language and diagram type.

use serde::Deserialize;
use tracing::{debug, warn};

use mermagen_llm::prompts::DETECT_TEMPERATURE;
use mermagen_shared::{DiagramType, ExecutionMode, Language, MermagenError, Result};

use crate::detector::detect_from_keywords;
use crate::pipeline::PipelineDeps;
use crate::state::{PipelineState, StageUpdate};

/// The JSON answer requested from the model.
#[derive(Debug, Deserialize)]
struct DetectAnswer {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    diagram_type: Option<String>,
}

/// Classify language and diagram type. Keyword hits always outrank the
/// model's answer; a failed model call degrades to keyword-or-default.
pub(crate) async fn run(state: &PipelineState, deps: &PipelineDeps) -> StageUpdate {
    let (keyword_lang, keyword_type) = detect_from_keywords(&state.prompt);

    if deps.mode == ExecutionMode::Mock {
        return StageUpdate {
            language: Some(keyword_lang.unwrap_or(Language::Ja)),
            diagram_type: Some(keyword_type.unwrap_or(DiagramType::Flowchart)),
            ..Default::default()
        };
    }

    match ask_model(state, deps).await {
        Ok((model_lang, model_type)) => {
            debug!(
                language = %model_lang,
                diagram_type = %model_type,
                "model detection result"
            );
            StageUpdate {
                language: Some(keyword_lang.unwrap_or(model_lang)),
                diagram_type: Some(keyword_type.unwrap_or(model_type)),
                ..Default::default()
            }
        }
        Err(err) => {
            warn!(error = %err, "model detection failed, using keyword fallback");
            StageUpdate {
                language: Some(keyword_lang.unwrap_or(Language::En)),
                diagram_type: Some(keyword_type.unwrap_or(DiagramType::Flowchart)),
                ..Default::default()
            }
        }
    }
}

/// One model round-trip: ask for JSON, parse it, map unknown values to the
/// `en`/`flowchart` defaults.
async fn ask_model(
    state: &PipelineState,
    deps: &PipelineDeps,
) -> Result<(Language, DiagramType)> {
    let generator = deps.generator()?;
    let content = generator
        .invoke(deps.templates.detect_system(), &state.prompt, DETECT_TEMPERATURE)
        .await?;

    let answer: DetectAnswer = serde_json::from_str(content.trim())
        .map_err(|e| MermagenError::Generation(format!("detect answer parse: {e}")))?;

    let language = answer
        .language
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Language::En);
    let diagram_type = answer
        .diagram_type
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DiagramType::Flowchart);

    Ok((language, diagram_type))
}
