//! Validate stage: structural checks over the generated markup.

use tracing::debug;

use crate::pipeline::PipelineDeps;
use crate::state::{PipelineState, StageUpdate};

/// Run the structural checks and fold the findings into the error list.
///
/// `is_valid` reflects only this pass's findings; carried-over errors from
/// earlier stages do not veto a structurally sound diagram.
pub(crate) fn run(state: &PipelineState, deps: &PipelineDeps) -> StageUpdate {
    let Some(code) = state.mermaid_code.as_deref().filter(|c| !c.is_empty()) else {
        let errors = if state.errors.is_empty() {
            vec!["No Mermaid code generated".to_string()]
        } else {
            state.errors.clone()
        };
        return StageUpdate {
            is_valid: Some(false),
            errors: Some(errors),
            ..Default::default()
        };
    };

    let findings = deps.validator.validate(code, state.diagram_type);
    debug!(
        diagram_type = %state.diagram_type,
        findings = findings.len(),
        "validation pass complete"
    );

    let is_valid = findings.is_empty();
    let mut errors = state.errors.clone();
    errors.extend(findings.into_iter().map(|f| f.message));

    StageUpdate {
        is_valid: Some(is_valid),
        errors: Some(errors),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests_support::mock_deps;

    #[test]
    fn valid_code_passes() {
        let deps = mock_deps();
        let mut state = PipelineState::new("p", None, None);
        state.mermaid_code = Some("flowchart TD\n    A[Start] --> B[End]".into());

        let update = run(&state, &deps);
        assert_eq!(update.is_valid, Some(true));
        assert_eq!(update.errors, Some(Vec::new()));
    }

    #[test]
    fn missing_code_gets_synthetic_error() {
        let deps = mock_deps();
        let state = PipelineState::new("p", None, None);

        let update = run(&state, &deps);
        assert_eq!(update.is_valid, Some(false));
        assert_eq!(
            update.errors,
            Some(vec!["No Mermaid code generated".to_string()])
        );
    }

    #[test]
    fn missing_code_preserves_prior_errors() {
        let deps = mock_deps();
        let mut state = PipelineState::new("p", None, None);
        state.errors = vec!["HTTP 500: upstream error".into()];

        let update = run(&state, &deps);
        assert_eq!(update.is_valid, Some(false));
        assert_eq!(
            update.errors,
            Some(vec!["HTTP 500: upstream error".to_string()])
        );
    }

    #[test]
    fn new_findings_appended_to_prior_errors() {
        let deps = mock_deps();
        let mut state = PipelineState::new("p", None, None);
        state.errors = vec!["earlier failure".into()];
        state.mermaid_code = Some("flowchart TD\nA[] --> B".into());

        let update = run(&state, &deps);
        assert_eq!(update.is_valid, Some(false));
        let errors = update.errors.unwrap();
        assert_eq!(errors[0], "earlier failure");
        assert!(errors[1..].iter().any(|e| e.contains("Empty node")));
    }

    #[test]
    fn prior_errors_do_not_veto_sound_code() {
        let deps = mock_deps();
        let mut state = PipelineState::new("p", None, None);
        state.errors = vec!["transient failure from a previous attempt".into()];
        state.mermaid_code = Some("flowchart TD\n    A[Start] --> B[End]".into());

        let update = run(&state, &deps);
        assert_eq!(update.is_valid, Some(true));
        assert_eq!(update.errors.unwrap().len(), 1);
    }
}
