//! The four pipeline stages.
//!
//! Every stage has the same shape: read the accumulated state, do its work,
//! return a partial update. Stages never abort the run; external failures
//! are logged and folded into the update as data.

pub mod autofix;
pub mod detect;
pub mod generate;
pub mod validate;

/// Strip a surrounding markdown fence from model output.
///
/// Models regularly wrap diagrams in ``` fences despite instructions. If the
/// trimmed text starts with a fence, the first line is dropped; the last
/// line is dropped too only when it is exactly ` ``` `.
pub(crate) fn clean_mermaid_code(content: &str) -> String {
    let code = content.trim();
    if !code.starts_with("```") {
        return code.to_string();
    }

    let lines: Vec<&str> = code.split('\n').collect();
    let body = if lines.last() == Some(&"```") {
        &lines[1..lines.len() - 1]
    } else {
        &lines[1..]
    };
    body.join("\n").trim().to_string()
}
