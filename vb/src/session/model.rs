//! Session value types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sessionstore::SessionRecord;
use tracing::{debug, warn};

use crate::text::ItineraryTable;

/// Where the user is in the conversation
///
/// `Idle` is persisted as a missing state tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingDestination,
    AwaitingDates,
    AwaitingBudget,
    GeneratingItinerary,
    ItineraryReady,
    AwaitingQuestion,
    AwaitingFinalConfirmation,
    EditingInterests,
}

impl ConversationState {
    /// Persisted tag, `None` for idle
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Self::Idle => None,
            Self::AwaitingDestination => Some("AWAITING_DESTINATION"),
            Self::AwaitingDates => Some("AWAITING_DATES"),
            Self::AwaitingBudget => Some("AWAITING_BUDGET"),
            Self::GeneratingItinerary => Some("GENERATING_ITINERARY"),
            Self::ItineraryReady => Some("ITINERARY_READY"),
            Self::AwaitingQuestion => Some("AWAITING_QUESTION"),
            Self::AwaitingFinalConfirmation => Some("AWAITING_FINAL_CONFIRMATION"),
            Self::EditingInterests => Some("EDITING_INTERESTS"),
        }
    }

    /// Decode a persisted tag; unknown tags yield `None`
    pub fn from_tag(tag: Option<&str>) -> Option<Self> {
        let state = match tag {
            None => Self::Idle,
            Some("AWAITING_DESTINATION") => Self::AwaitingDestination,
            Some("AWAITING_DATES") => Self::AwaitingDates,
            Some("AWAITING_BUDGET") => Self::AwaitingBudget,
            Some("GENERATING_ITINERARY") => Self::GeneratingItinerary,
            Some("ITINERARY_READY") => Self::ItineraryReady,
            Some("AWAITING_QUESTION") => Self::AwaitingQuestion,
            Some("AWAITING_FINAL_CONFIRMATION") => Self::AwaitingFinalConfirmation,
            Some("EDITING_INTERESTS") => Self::EditingInterests,
            Some(_) => return None,
        };
        Some(state)
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag().unwrap_or("IDLE"))
    }
}

/// Sub-flow layered over the state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionMode {
    /// Free text is answered from the travel guide
    Rag,
}

impl SessionMode {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Rag => "RAG",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "RAG" => Some(Self::Rag),
            _ => None,
        }
    }
}

/// Fields collected during the funnel
///
/// Keys keep their persisted Portuguese names. Unknown keys survive a
/// load/save cycle through `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionData {
    #[serde(rename = "destino", skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Canonical `DD/MM a DD/MM`
    #[serde(rename = "datas", skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,

    /// Raw budget reply
    #[serde(rename = "orcamento", skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,

    /// Completion text as received
    #[serde(rename = "roteiro_completo", skip_serializing_if = "Option::is_none")]
    pub itinerary: Option<String>,

    #[serde(rename = "tabela_itinerario", skip_serializing_if = "Option::is_none")]
    pub table: Option<ItineraryTable>,

    /// Completion text without the table lines
    #[serde(rename = "descricao_detalhada", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Interest tags toggled in the selection sub-mode, in toggle order
    #[serde(rename = "selecoes_interesses", skip_serializing_if = "Option::is_none")]
    pub interest_selection: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Destination, dates and budget are all present
    pub fn funnel_complete(&self) -> bool {
        self.destination.is_some() && self.dates.is_some() && self.budget.is_some()
    }
}

/// Per-identity conversation record
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    pub identity: String,
    pub state: ConversationState,
    pub mode: Option<SessionMode>,
    pub data: SessionData,
}

impl Session {
    /// Fresh idle session
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            ..Default::default()
        }
    }

    /// Nothing worth persisting
    pub fn is_blank(&self) -> bool {
        self.state == ConversationState::Idle && self.mode.is_none() && self.data.is_empty()
    }

    /// Move to a new state keeping data
    pub fn goto(&mut self, state: ConversationState) {
        debug!(identity = %self.identity, from = %self.state, to = %state, "Session::goto: called");
        self.state = state;
    }

    /// Move to a new state and replace data
    pub fn reset_to(&mut self, state: ConversationState) {
        debug!(identity = %self.identity, to = %state, "Session::reset_to: called");
        self.state = state;
        self.mode = None;
        self.data = SessionData::default();
    }

    pub fn to_record(&self) -> Result<SessionRecord, serde_json::Error> {
        let data = serde_json::to_string(&self.data)?;
        Ok(SessionRecord::new(
            self.identity.clone(),
            self.state.tag().map(String::from),
            data,
            self.mode.map(|m| m.tag().to_string()),
        ))
    }

    /// Decode a stored row
    ///
    /// A row with an unknown state tag or undecodable data loads as a fresh
    /// idle session.
    pub fn from_record(record: &SessionRecord) -> Self {
        debug!(identity = %record.identity, state = ?record.state, "Session::from_record: called");
        let Some(state) = ConversationState::from_tag(record.state.as_deref()) else {
            warn!(identity = %record.identity, state = ?record.state, "Unknown session state, starting fresh");
            return Self::new(&record.identity);
        };

        let data = match serde_json::from_str::<SessionData>(&record.data) {
            Ok(data) => data,
            Err(e) => {
                warn!(identity = %record.identity, error = %e, "Corrupted session data, starting fresh");
                return Self::new(&record.identity);
            }
        };

        let mode = record.mode.as_deref().and_then(SessionMode::from_tag);

        Self {
            identity: record.identity.clone(),
            state,
            mode,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_tags_round_trip() {
        let all = [
            ConversationState::Idle,
            ConversationState::AwaitingDestination,
            ConversationState::AwaitingDates,
            ConversationState::AwaitingBudget,
            ConversationState::GeneratingItinerary,
            ConversationState::ItineraryReady,
            ConversationState::AwaitingQuestion,
            ConversationState::AwaitingFinalConfirmation,
            ConversationState::EditingInterests,
        ];
        for state in all {
            assert_eq!(ConversationState::from_tag(state.tag()), Some(state));
        }
        assert_eq!(ConversationState::from_tag(Some("AGUARDANDO_NADA")), None);
    }

    #[test]
    fn test_data_uses_persisted_keys() {
        let data = SessionData {
            destination: Some("Lisboa".to_string()),
            dates: Some("10/07 a 18/07".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["destino"], "Lisboa");
        assert_eq!(json["datas"], "10/07 a 18/07");
        assert!(json.get("orcamento").is_none());
    }

    #[test]
    fn test_data_keeps_unknown_keys() {
        let data: SessionData = serde_json::from_str(r#"{"destino":"Roma","origem":"GRU"}"#).unwrap();
        assert_eq!(data.destination.as_deref(), Some("Roma"));
        assert_eq!(data.extra["origem"], "GRU");

        let back = serde_json::to_value(&data).unwrap();
        assert_eq!(back["origem"], "GRU");
    }

    #[test]
    fn test_record_round_trip() {
        let mut session = Session::new("5511999");
        session.goto(ConversationState::AwaitingBudget);
        session.mode = Some(SessionMode::Rag);
        session.data.destination = Some("Paris".to_string());
        session.data.table = Some(ItineraryTable::new(vec![
            vec!["DATA".to_string(), "LOCAL".to_string()],
            vec!["10/07".to_string(), "Louvre".to_string()],
        ]));

        let record = session.to_record().unwrap();
        assert_eq!(record.state.as_deref(), Some("AWAITING_BUDGET"));
        assert_eq!(record.mode.as_deref(), Some("RAG"));
        assert_eq!(Session::from_record(&record), session);
    }

    #[test]
    fn test_idle_has_no_tag() {
        let record = Session::new("1").to_record().unwrap();
        assert!(record.state.is_none());
        assert_eq!(record.data, "{}");
    }

    #[test]
    fn test_corrupted_record_fails_open() {
        let record = SessionRecord::new("1", Some("AWAITING_DATES".into()), "{not json".into(), None);
        let session = Session::from_record(&record);
        assert_eq!(session, Session::new("1"));

        let record = SessionRecord::new("1", Some("BOGUS".into()), "{}".into(), None);
        assert_eq!(Session::from_record(&record).state, ConversationState::Idle);

        // Data that is valid JSON but not an object
        let record = SessionRecord::new("1", Some("AWAITING_DATES".into()), "[1,2]".into(), None);
        assert_eq!(Session::from_record(&record), Session::new("1"));
    }

    #[test]
    fn test_reset_replaces_data() {
        let mut session = Session::new("1");
        session.data.destination = Some("Roma".to_string());
        session.mode = Some(SessionMode::Rag);
        session.reset_to(ConversationState::AwaitingDestination);
        assert!(session.data.is_empty());
        assert!(session.mode.is_none());
        assert!(!session.is_blank());
    }
}
