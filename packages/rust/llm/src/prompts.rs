//! Fixed prompt templates for the detect/generate/autofix stages.
//!
//! Templates are explicitly constructed once at startup and injected into
//! the pipeline; there is no ambient template cache.

use mermagen_shared::DiagramType;

/// Sampling temperature for the detect stage (deterministic classification).
pub const DETECT_TEMPERATURE: f32 = 0.0;
/// Sampling temperature for the generate stage.
pub const GENERATE_TEMPERATURE: f32 = 0.7;
/// Sampling temperature for the autofix stage.
pub const AUTOFIX_TEMPERATURE: f32 = 0.3;

const DETECT_SYSTEM: &str = r#"Analyze the user's prompt and determine:
1. Language: "ja" (Japanese), "en" (English), or "other"
2. Diagram type: one of "flowchart", "sequence", "gantt", "class", "er", "state", "journey"

Rules for diagram type detection:
- flowchart: process flows, decision trees, workflows
- sequence: interactions between entities over time
- gantt: project timelines, schedules
- class: class diagrams, object relationships
- er: entity-relationship diagrams, database schemas
- state: state machines, state transitions
- journey: user journeys, experience maps

Respond ONLY with valid JSON: {"language": "...", "diagram_type": "..."}"#;

const GENERATE_SYSTEM_HEAD: &str = "You are a Mermaid diagram expert. \
Generate valid Mermaid code for a ";

const GENERATE_SYSTEM_TAIL: &str = r#" diagram.

Rules:
- Output ONLY the Mermaid code, no markdown fences (no ```)
- Use proper Mermaid syntax for the diagram type
- For Japanese text, use appropriate labels
- Keep node IDs simple (A, B, C or descriptive like login, auth)
- Ensure the diagram is complete and valid
- Do not include any explanations, just the diagram code

Example for flowchart:
flowchart TD
    A[Start] --> B{Decision}
    B -->|Yes| C[Process A]
    B -->|No| D[Process B]
    C --> E[End]
    D --> E"#;

const AUTOFIX_SYSTEM_HEAD: &str = "You are a Mermaid diagram syntax expert. \
Fix the following Mermaid diagram that has syntax errors.

Errors found:
";

const AUTOFIX_SYSTEM_TAIL: &str = r#"

Rules:
- Output ONLY the corrected Mermaid code, no explanations
- Do not include markdown fences (```)
- Preserve the original intent of the diagram
- Fix all syntax errors while keeping the structure intact"#;

/// The fixed stage instructions, rendered per request.
#[derive(Debug, Clone, Default)]
pub struct PromptTemplates {}

impl PromptTemplates {
    pub fn new() -> Self {
        Self {}
    }

    /// System instruction for the detect stage (expects a JSON answer).
    pub fn detect_system(&self) -> &'static str {
        DETECT_SYSTEM
    }

    /// System instruction for the generate stage, fixed per diagram type.
    pub fn generate_system(&self, diagram_type: DiagramType) -> String {
        format!("{GENERATE_SYSTEM_HEAD}{diagram_type}{GENERATE_SYSTEM_TAIL}")
    }

    /// Repair instruction embedding the newline-joined, bullet-prefixed
    /// error messages.
    pub fn autofix_system(&self, errors: &[String]) -> String {
        let bullets = errors
            .iter()
            .map(|e| format!("- {e}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{AUTOFIX_SYSTEM_HEAD}{bullets}{AUTOFIX_SYSTEM_TAIL}")
    }

    /// User turn for the autofix stage, carrying the broken diagram.
    pub fn autofix_user(&self, mermaid_code: &str) -> String {
        format!("Original diagram:\n{mermaid_code}")
    }
}
