//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// System prompt shared by every completion
pub const PERSONA: &str = include_str!("../../prompts/persona.pmt");

/// Full itinerary with table and sections
pub const ITINERARY: &str = include_str!("../../prompts/itinerary.pmt");

/// Table-only regeneration when the itinerary came back without one
pub const ITINERARY_TABLE: &str = include_str!("../../prompts/itinerary-table.pmt");

/// JSON classification of a date reply that did not parse
pub const DATE_CLASSIFY: &str = include_str!("../../prompts/date-classify.pmt");

/// Answer to a question about when to travel
pub const DATE_QUESTION: &str = include_str!("../../prompts/date-question.pmt");

/// Grounded answer from guide excerpts
pub const GUIDE_ANSWER: &str = include_str!("../../prompts/guide-answer.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    let found = match name {
        "persona" => Some(PERSONA),
        "itinerary" => Some(ITINERARY),
        "itinerary-table" => Some(ITINERARY_TABLE),
        "date-classify" => Some(DATE_CLASSIFY),
        "date-question" => Some(DATE_QUESTION),
        "guide-answer" => Some(GUIDE_ANSWER),
        _ => None,
    };
    if found.is_none() {
        debug!("get_embedded: no match found");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_itinerary() {
        let itinerary = get_embedded("itinerary").unwrap();
        assert!(itinerary.contains("| DATA | DIA | LOCAL | ATIVIDADE |"));
        assert!(itinerary.contains("ORÇAMENTO DETALHADO"));
        assert!(itinerary.contains("{{destination}}"));
    }

    #[test]
    fn test_get_embedded_date_classify() {
        let prompt = get_embedded("date-classify").unwrap();
        assert!(prompt.contains("data_fornecida"));
        assert!(prompt.contains("pergunta_sobre_data"));
        assert!(prompt.contains("indefinido"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
