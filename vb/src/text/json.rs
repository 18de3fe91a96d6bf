//! JSON recovery from free-form completion text

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^```(?:json)?\s*|\s*```$").expect("valid code fence regex"));

static FIRST_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*?\}").expect("valid object regex"));

/// Recover the first flat JSON object embedded in `text`.
///
/// Code fences are stripped, then the shortest `{...}` span is parsed. Anything
/// that is not a JSON object yields `None`. Nested objects are not recovered
/// because the span ends at the first closing brace.
pub fn extract_json(text: &str) -> Option<Map<String, Value>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cleaned = CODE_FENCE.replace_all(trimmed, "");
    let span = FIRST_OBJECT.find(&cleaned)?;
    debug!(span = %span.as_str(), "extract_json: candidate span");

    match serde_json::from_str::<Value>(span.as_str()) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "extract_json: candidate did not parse");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_fenced_json() {
        let map = extract_json("```json\n{\"a\":1}\n```").unwrap();
        assert_eq!(Value::Object(map), json!({"a": 1}));
    }

    #[test]
    fn test_untagged_fence() {
        let map = extract_json("```\n{\"classificacao\": \"indefinido\"}\n```").unwrap();
        assert_eq!(map["classificacao"], "indefinido");
    }

    #[test]
    fn test_json_inside_prose() {
        let text = r#"Claro! Aqui está: {"classificacao": "pergunta_sobre_data", "valor": "melhor época"} Espero ter ajudado."#;
        let map = extract_json(text).unwrap();
        assert_eq!(map["classificacao"], "pergunta_sobre_data");
        assert_eq!(map["valor"], "melhor época");
    }

    #[test]
    fn test_no_braces() {
        assert!(extract_json("no braces here").is_none());
        assert!(extract_json("").is_none());
        assert!(extract_json("   ").is_none());
    }

    #[test]
    fn test_invalid_json() {
        assert!(extract_json("{not json}").is_none());
        assert!(extract_json("{\"a\": }").is_none());
    }

    #[test]
    fn test_nested_object_not_recovered() {
        assert!(extract_json(r#"{"a": {"b": 1}}"#).is_none());
    }

    proptest! {
        #[test]
        fn never_panics(text in "\\PC*") {
            let _ = extract_json(&text);
        }
    }
}
