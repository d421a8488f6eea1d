//! Pipeline state and the stage partial-update shape.

use mermagen_shared::{DiagramType, Language};

/// The single state record threaded through one pipeline run.
///
/// Created fresh per incoming request, never shared between runs, and
/// discarded once the coordinator extracts the final snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    /// The user's input prompt. Immutable after creation.
    pub prompt: String,
    /// Detected prompt language.
    pub language: Language,
    /// Detected diagram type.
    pub diagram_type: DiagramType,
    /// User-supplied type hint, normalized (`"auto"` → `None`).
    pub diagram_type_hint: Option<String>,
    /// User-supplied language hint, normalized (`"auto"` → `None`).
    pub language_hint: Option<String>,
    /// Generated markup. `None` before the first generate call or after a
    /// failed generation.
    pub mermaid_code: Option<String>,
    /// Accumulated error messages. Never shrinks except when autofix clears
    /// it after producing new code.
    pub errors: Vec<String>,
    /// Count of generate + autofix executions. Monotonically increasing.
    pub attempts: u32,
    /// Set only by the validate stage.
    pub is_valid: bool,
}

impl PipelineState {
    /// Build the initial state for a prompt. Hints of `None`, `""`, or
    /// `"auto"` normalize to "no hint".
    pub fn new(
        prompt: impl Into<String>,
        diagram_type_hint: Option<&str>,
        language_hint: Option<&str>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            language: Language::En,
            diagram_type: DiagramType::Flowchart,
            diagram_type_hint: normalize_hint(diagram_type_hint),
            language_hint: normalize_hint(language_hint),
            mermaid_code: None,
            errors: Vec::new(),
            attempts: 0,
            is_valid: false,
        }
    }

    /// Merge a stage's partial update into the state. Present fields
    /// override; everything else persists unchanged.
    pub fn apply(&mut self, update: StageUpdate) {
        if let Some(language) = update.language {
            self.language = language;
        }
        if let Some(diagram_type) = update.diagram_type {
            self.diagram_type = diagram_type;
        }
        if let Some(mermaid_code) = update.mermaid_code {
            self.mermaid_code = mermaid_code;
        }
        if let Some(errors) = update.errors {
            self.errors = errors;
        }
        if let Some(attempts) = update.attempts {
            self.attempts = attempts;
        }
        if let Some(is_valid) = update.is_valid {
            self.is_valid = is_valid;
        }
    }
}

/// Normalize a user hint: `None`, empty, or `"auto"` mean auto-detect.
fn normalize_hint(hint: Option<&str>) -> Option<String> {
    match hint {
        Some(h) if !h.is_empty() && h != "auto" => Some(h.to_string()),
        _ => None,
    }
}

/// The subset of state fields a stage returns.
///
/// The outer `Option` marks whether the stage set the field at all. For
/// `mermaid_code` the inner `Option` is the generation result itself, so a
/// failed generation can explicitly set the field back to `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageUpdate {
    pub language: Option<Language>,
    pub diagram_type: Option<DiagramType>,
    pub mermaid_code: Option<Option<String>>,
    pub errors: Option<Vec<String>>,
    pub attempts: Option<u32>,
    pub is_valid: Option<bool>,
}

impl StageUpdate {
    /// The generated code carried by this update, if any and non-empty.
    pub fn emitted_code(&self) -> Option<&str> {
        self.mermaid_code
            .as_ref()
            .and_then(|inner| inner.as_deref())
            .filter(|code| !code.is_empty())
    }
}
