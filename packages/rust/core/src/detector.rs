//! Keyword-based language and diagram-type detection.
//!
//! Pure heuristics over the prompt text: no external calls, no state, never
//! fails. Keyword results outrank the model's answer in the detect stage.

use mermagen_shared::{DiagramType, Language};

/// Keyword → diagram type table, covering English and Japanese terms.
///
/// Scanned in declaration order; the first matching keyword wins, so order
/// is a deliberate tie-break.
const KEYWORD_TABLE: [(&str, DiagramType); 18] = [
    ("flowchart", DiagramType::Flowchart),
    ("フローチャート", DiagramType::Flowchart),
    ("フロー", DiagramType::Flowchart),
    ("flow", DiagramType::Flowchart),
    ("sequence", DiagramType::Sequence),
    ("シーケンス", DiagramType::Sequence),
    ("gantt", DiagramType::Gantt),
    ("ガント", DiagramType::Gantt),
    ("class", DiagramType::Class),
    ("クラス", DiagramType::Class),
    ("er", DiagramType::Er),
    ("entity", DiagramType::Er),
    ("エンティティ", DiagramType::Er),
    ("state", DiagramType::State),
    ("ステート", DiagramType::State),
    ("状態", DiagramType::State),
    ("journey", DiagramType::Journey),
    ("ジャーニー", DiagramType::Journey),
];

/// Detect language and diagram type from keywords in the prompt.
///
/// Either or both results may be `None` when nothing matched; the caller
/// decides the fallback.
pub fn detect_from_keywords(prompt: &str) -> (Option<Language>, Option<DiagramType>) {
    let language = detect_language(prompt);

    let prompt_lower = prompt.to_lowercase();
    let diagram_type = KEYWORD_TABLE
        .iter()
        .find(|(keyword, _)| prompt_lower.contains(keyword))
        .map(|(_, dtype)| *dtype);

    (language, diagram_type)
}

/// Pure-ASCII prompts are English; prompts with Japanese script are `ja`;
/// other non-ASCII text stays undetected.
fn detect_language(prompt: &str) -> Option<Language> {
    if prompt.is_ascii() {
        return Some(Language::En);
    }
    if prompt.chars().any(is_japanese_char) {
        return Some(Language::Ja);
    }
    None
}

/// Hiragana, Katakana, or CJK unified ideograph.
fn is_japanese_char(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{309f}' | '\u{30a0}'..='\u{30ff}' | '\u{4e00}'..='\u{9fff}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_flowchart_prompt() {
        let (lang, dtype) = detect_from_keywords("Create a simple flowchart");
        assert_eq!(lang, Some(Language::En));
        assert_eq!(dtype, Some(DiagramType::Flowchart));
    }

    #[test]
    fn japanese_sequence_prompt() {
        let (lang, dtype) = detect_from_keywords("シーケンス図を作成してください");
        assert_eq!(lang, Some(Language::Ja));
        assert_eq!(dtype, Some(DiagramType::Sequence));
    }

    #[test]
    fn ascii_prompt_is_english_even_without_keywords() {
        let (lang, dtype) = detect_from_keywords("draw something nice");
        assert_eq!(lang, Some(Language::En));
        assert_eq!(dtype, None);
    }

    #[test]
    fn non_japanese_non_ascii_stays_undetected() {
        let (lang, _) = detect_from_keywords("Диаграмма последовательности");
        assert_eq!(lang, None);
    }

    #[test]
    fn first_table_match_wins() {
        // "flow" appears before "state" in the table.
        let (_, dtype) = detect_from_keywords("state of the flow");
        assert_eq!(dtype, Some(DiagramType::Flowchart));
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let (_, dtype) = detect_from_keywords("Gantt Chart for Q3");
        assert_eq!(dtype, Some(DiagramType::Gantt));
    }

    #[test]
    fn er_matches_as_substring() {
        // Substring matching is intentional; "entity" and "er" both map to ER.
        let (_, dtype) = detect_from_keywords("entity relationship for orders");
        assert_eq!(dtype, Some(DiagramType::Er));
    }

    #[test]
    fn japanese_state_keyword() {
        let (lang, dtype) = detect_from_keywords("状態遷移を図にして");
        assert_eq!(lang, Some(Language::Ja));
        assert_eq!(dtype, Some(DiagramType::State));
    }
}
