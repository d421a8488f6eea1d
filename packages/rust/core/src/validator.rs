//! Rule-based structural validation of Mermaid markup.
//!
//! Heuristic checks only — this is not a Mermaid parser. Every check is
//! independent and runs regardless of earlier findings.

use regex::Regex;

use mermagen_shared::{DiagramType, ErrorCode, StructuredError};

/// Default flowchart arrow heuristic: an identifier, dashes, a run of
/// non-arrow characters, another identifier. Known to false-positive on
/// dense labels containing dashes.
const DEFAULT_ARROW_PATTERN: &str = r"[A-Za-z0-9_]+\s*-+[^->|]+[A-Za-z0-9_]+";

/// ER relationship cardinality tokens (`||--o{`, `}o..||`, ...) use braces
/// and pipes non-structurally; they are stripped before bracket counting.
const ER_CARDINALITY_PATTERN: &str = r"[\|\}o]{2}(--|\.\.)[\|\{o]{2}";

/// Compiled validation patterns, built once and injected into the pipeline.
#[derive(Debug, Clone)]
pub struct Validator {
    declarations: Vec<(DiagramType, Regex)>,
    er_cardinality: Regex,
    empty_node: Regex,
    arrow_heuristic: Regex,
}

impl Validator {
    pub fn new() -> Self {
        let declarations = DiagramType::ALL
            .iter()
            .map(|dtype| (*dtype, Regex::new(declaration_pattern(*dtype)).unwrap()))
            .collect();

        Self {
            declarations,
            er_cardinality: Regex::new(ER_CARDINALITY_PATTERN).unwrap(),
            empty_node: Regex::new(r"\[\s*\]").unwrap(),
            arrow_heuristic: Regex::new(DEFAULT_ARROW_PATTERN).unwrap(),
        }
    }

    /// Replace the flowchart arrow heuristic. The default pattern is
    /// intentionally permissive; deployments that hit false positives can
    /// swap it out.
    pub fn with_arrow_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.arrow_heuristic = Regex::new(pattern)?;
        Ok(self)
    }

    /// Run all structural checks against `code` for the expected type.
    ///
    /// Returns the findings of this call only; the validate stage is
    /// responsible for concatenating prior-stage errors.
    pub fn validate(&self, code: &str, diagram_type: DiagramType) -> Vec<StructuredError> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return vec![StructuredError::with_message(
                ErrorCode::GenerationEmpty,
                "Empty diagram code",
            )];
        }

        let mut errors = Vec::new();

        if let Some(err) = self.check_declaration(trimmed, diagram_type) {
            errors.push(err);
        }
        if let Some(err) = self.check_bracket_balance(trimmed, diagram_type) {
            errors.push(err);
        }
        if let Some(err) = self.check_empty_node(trimmed) {
            errors.push(err);
        }
        if diagram_type == DiagramType::Flowchart {
            if let Some(err) = self.check_arrow_syntax(trimmed) {
                errors.push(err);
            }
        }

        errors
    }

    /// The first line must carry a known diagram declaration. A header that
    /// matches a *different* known type is accepted — only totally
    /// unrecognized headers are flagged.
    fn check_declaration(&self, code: &str, diagram_type: DiagramType) -> Option<StructuredError> {
        let first_line = code.lines().next().unwrap_or("").trim();

        let expected = self
            .declarations
            .iter()
            .find(|(dtype, _)| *dtype == diagram_type)
            .map(|(_, pattern)| pattern)?;

        if expected.is_match(first_line) {
            return None;
        }

        let any_known = self
            .declarations
            .iter()
            .any(|(_, pattern)| pattern.is_match(first_line));
        if any_known {
            return None;
        }

        Some(StructuredError::with_message(
            ErrorCode::ValidationInvalidType,
            format!("Invalid diagram declaration for type '{diagram_type}'"),
        ))
    }

    fn check_bracket_balance(
        &self,
        code: &str,
        diagram_type: DiagramType,
    ) -> Option<StructuredError> {
        let counted: std::borrow::Cow<'_, str> = if diagram_type == DiagramType::Er {
            self.er_cardinality.replace_all(code, "")
        } else {
            code.into()
        };

        let open = counted.matches(['[', '{', '(']).count();
        let close = counted.matches([']', '}', ')']).count();

        (open != close).then(|| {
            StructuredError::with_message(
                ErrorCode::ValidationUnbalancedBrackets,
                "Unbalanced brackets in diagram",
            )
        })
    }

    fn check_empty_node(&self, code: &str) -> Option<StructuredError> {
        self.empty_node.is_match(code).then(|| {
            StructuredError::with_message(
                ErrorCode::ValidationEmptyNode,
                "Empty node label detected",
            )
        })
    }

    fn check_arrow_syntax(&self, code: &str) -> Option<StructuredError> {
        self.arrow_heuristic.is_match(code).then(|| {
            StructuredError::with_message(
                ErrorCode::ValidationSyntaxError,
                "Possible invalid arrow syntax in flowchart",
            )
        })
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Expected header pattern per diagram type, matched case-insensitively
/// against the first line.
fn declaration_pattern(diagram_type: DiagramType) -> &'static str {
    match diagram_type {
        DiagramType::Flowchart => r"(?i)^(flowchart|graph)\s+(TB|TD|BT|RL|LR)",
        DiagramType::Sequence => r"(?i)^sequenceDiagram",
        DiagramType::Gantt => r"(?i)^gantt",
        DiagramType::Class => r"(?i)^classDiagram",
        DiagramType::Er => r"(?i)^erDiagram",
        DiagramType::State => r"(?i)^stateDiagram(-v2)?",
        DiagramType::Journey => r"(?i)^journey",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(errors: &[StructuredError]) -> Vec<ErrorCode> {
        errors.iter().map(|e| e.code).collect()
    }

    #[test]
    fn valid_flowchart_passes() {
        let validator = Validator::new();
        let code = "flowchart TD\n    A[Start] --> B[End]";
        assert!(validator.validate(code, DiagramType::Flowchart).is_empty());
    }

    #[test]
    fn empty_code_is_single_synthetic_error() {
        let validator = Validator::new();
        for code in ["", "   \n  "] {
            let errors = validator.validate(code, DiagramType::Flowchart);
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].message, "Empty diagram code");
        }
    }

    #[test]
    fn empty_node_label_flagged() {
        let validator = Validator::new();
        let errors = validator.validate("flowchart TD\nA[] --> B[End]", DiagramType::Flowchart);
        assert!(codes(&errors).contains(&ErrorCode::ValidationEmptyNode));
    }

    #[test]
    fn unknown_header_flagged() {
        let validator = Validator::new();
        let errors = validator.validate("pie\n    \"a\": 1", DiagramType::Flowchart);
        assert!(codes(&errors).contains(&ErrorCode::ValidationInvalidType));
    }

    #[test]
    fn different_known_header_not_flagged() {
        // Weak check by design: a sequence header under an expected
        // flowchart type passes the declaration check.
        let validator = Validator::new();
        let errors = validator.validate(
            "sequenceDiagram\n    A->>B: hello",
            DiagramType::Flowchart,
        );
        assert!(!codes(&errors).contains(&ErrorCode::ValidationInvalidType));
    }

    #[test]
    fn declaration_is_case_insensitive() {
        let validator = Validator::new();
        let errors = validator.validate("FLOWCHART td\n    A --> B", DiagramType::Flowchart);
        assert!(!codes(&errors).contains(&ErrorCode::ValidationInvalidType));
    }

    #[test]
    fn unbalanced_brackets_flagged() {
        let validator = Validator::new();
        let errors = validator.validate("flowchart TD\n    A[Start --> B", DiagramType::Flowchart);
        assert!(codes(&errors).contains(&ErrorCode::ValidationUnbalancedBrackets));
    }

    #[test]
    fn er_cardinality_tokens_excluded_from_count() {
        let validator = Validator::new();
        let code = "erDiagram\n    USER ||--o{ ORDER : places\n    USER {\n        int id PK\n    }";
        let errors = validator.validate(code, DiagramType::Er);
        assert!(
            !codes(&errors).contains(&ErrorCode::ValidationUnbalancedBrackets),
            "cardinality braces must not count: {errors:?}"
        );
    }

    #[test]
    fn er_exception_does_not_apply_to_other_types() {
        let validator = Validator::new();
        let code = "flowchart TD\n    A ||--o{ B";
        let errors = validator.validate(code, DiagramType::Flowchart);
        assert!(codes(&errors).contains(&ErrorCode::ValidationUnbalancedBrackets));
    }

    #[test]
    fn arrow_heuristic_only_for_flowcharts() {
        let validator = Validator::new();
        let code = "gantt\n    a -- b c";
        let errors = validator.validate(code, DiagramType::Gantt);
        assert!(!codes(&errors).contains(&ErrorCode::ValidationSyntaxError));
    }

    #[test]
    fn malformed_arrow_flagged() {
        let validator = Validator::new();
        let errors = validator.validate("flowchart TD\n    A -- x B", DiagramType::Flowchart);
        assert!(codes(&errors).contains(&ErrorCode::ValidationSyntaxError));
    }

    #[test]
    fn checks_are_independent() {
        // One input triggering several checks reports all of them.
        let validator = Validator::new();
        let errors = validator.validate("pie\n    A[] -- x B[oops", DiagramType::Flowchart);
        let found = codes(&errors);
        assert!(found.contains(&ErrorCode::ValidationInvalidType));
        assert!(found.contains(&ErrorCode::ValidationUnbalancedBrackets));
        assert!(found.contains(&ErrorCode::ValidationEmptyNode));
    }

    #[test]
    fn validation_is_idempotent() {
        let validator = Validator::new();
        let code = "flowchart TD\nA[] --> B";
        let first = validator.validate(code, DiagramType::Flowchart);
        let second = validator.validate(code, DiagramType::Flowchart);
        assert_eq!(first, second);
    }

    #[test]
    fn arrow_pattern_is_replaceable() {
        let validator = Validator::new()
            .with_arrow_pattern(r"never-matches-\d{99}")
            .expect("valid pattern");
        let errors = validator.validate("flowchart TD\n    A -- x B", DiagramType::Flowchart);
        assert!(!codes(&errors).contains(&ErrorCode::ValidationSyntaxError));
    }
}
