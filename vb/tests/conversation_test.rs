//! Integration tests for VexusBot
//!
//! Drive the engine end to end through its public API with a file-backed
//! session store, scripted completions and the console transport.

use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use vexusbot::bot::InboundEvent;
use vexusbot::bot::replies::{EDIT_PROFILE, EXPORT_SPREADSHEET, FINISH_INTERESTS, MENU_PLAN, MENU_QUESTIONS};
use vexusbot::engine::Engine;
use vexusbot::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, TokenUsage};
use vexusbot::prompts::PromptLoader;
use vexusbot::qa::{GuideQa, RetrievalError, Retriever};
use vexusbot::render::DocumentRenderer;
use vexusbot::session::{ConversationState, SessionManager};
use vexusbot::transport::ConsoleTransport;

const ITINERARY: &str = "| DATA | DIA | LOCAL | ATIVIDADE |\n|---|---|---|---|\n| 02/11 | Domingo | Trastevere | Jantar típico |\n| 03/11 | Segunda | Vaticano | Museus Vaticanos |\n\nORÇAMENTO DETALHADO\nHospedagem 600 euros.";

const IDENTITY: &str = "5521988887777";

// =============================================================================
// Test doubles
// =============================================================================

/// Completion client that replays canned texts and records every prompt
struct ScriptedLlm {
    texts: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(texts: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            texts: Mutex::new(texts.iter().rev().map(|t| t.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prompt = request.messages.iter().map(|m| m.content.clone()).collect::<Vec<_>>().join("\n");
        self.prompts.lock().unwrap().push(prompt);
        match self.texts.lock().unwrap().pop() {
            Some(text) => Ok(CompletionResponse {
                content: Some(text),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            }),
            None => Err(LlmError::ApiError {
                status: 503,
                message: "no scripted completion left".to_string(),
            }),
        }
    }
}

struct StaticGuide(Vec<String>);

#[async_trait]
impl Retriever for StaticGuide {
    async fn retrieve(&self, _question: &str) -> Result<Vec<String>, RetrievalError> {
        Ok(self.0.clone())
    }
}

/// Writer that keeps console output for assertions
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.lock().unwrap());
        String::from_utf8(bytes).unwrap()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct Harness {
    engine: Engine,
    console: ConsoleTransport,
    output: Captured,
}

impl Harness {
    fn new(store_dir: &TempDir, download_dir: &TempDir, llm: Arc<ScriptedLlm>, guide: &[&str]) -> Self {
        let sessions = SessionManager::spawn(store_dir.path()).expect("Failed to open session store");
        let prompts = Arc::new(PromptLoader::embedded_only());
        let retriever = Arc::new(StaticGuide(guide.iter().map(|s| s.to_string()).collect()));
        let qa = GuideQa::new(retriever, llm.clone(), prompts.clone(), 256);
        let engine = Engine::new(sessions, llm, qa, Arc::new(DocumentRenderer), prompts, 1024);

        let output = Captured::default();
        let console = ConsoleTransport::with_writer(download_dir.path(), Box::new(output.clone()));
        Self { engine, console, output }
    }

    async fn say(&self, body: &str) -> String {
        let event = InboundEvent::text(IDENTITY, body).with_display_name("Bruno");
        self.engine.handle_event(event, &self.console).await;
        self.output.take()
    }

    async fn click(&self, option_id: &str) -> String {
        let event = InboundEvent::selection(IDENTITY, option_id).with_display_name("Bruno");
        self.engine.handle_event(event, &self.console).await;
        self.output.take()
    }

    async fn state(&self) -> ConversationState {
        self.engine.sessions().load(IDENTITY).await.unwrap().state
    }
}

// =============================================================================
// Conversation Tests
// =============================================================================

#[tokio::test]
async fn test_session_survives_restart() {
    let store_dir = TempDir::new().expect("Failed to create temp dir");
    let download_dir = TempDir::new().expect("Failed to create temp dir");

    {
        let harness = Harness::new(&store_dir, &download_dir, ScriptedLlm::new(&[]), &[]);
        let output = harness.say("olá").await;
        assert!(output.contains("Olá, Bruno!"));

        harness.click(MENU_PLAN).await;
        harness.say("roma").await;
        assert_eq!(harness.state().await, ConversationState::AwaitingDates);
        harness.engine.sessions().shutdown().await.unwrap();
    }

    let llm = ScriptedLlm::new(&[ITINERARY]);
    let harness = Harness::new(&store_dir, &download_dir, llm.clone(), &[]);
    assert_eq!(harness.state().await, ConversationState::AwaitingDates);

    harness.say("2/11 a 3/11").await;
    assert_eq!(harness.state().await, ConversationState::AwaitingBudget);

    let output = harness.say("1500 euros").await;
    assert!(output.contains("Seu Roteiro Personalizado"));
    assert_eq!(harness.state().await, ConversationState::ItineraryReady);

    let prompt = &llm.prompts()[0];
    assert!(prompt.contains("Roma"));
    assert!(prompt.contains("02/11 a 03/11"));
    assert!(prompt.contains("1500 euros"));
}

#[tokio::test]
async fn test_interests_flow_into_itinerary_prompt() {
    let store_dir = TempDir::new().expect("Failed to create temp dir");
    let download_dir = TempDir::new().expect("Failed to create temp dir");
    let llm = ScriptedLlm::new(&[ITINERARY]);
    let harness = Harness::new(&store_dir, &download_dir, llm.clone(), &[]);

    harness.click(EDIT_PROFILE).await;
    assert_eq!(harness.state().await, ConversationState::EditingInterests);
    harness.click("interesse_Museus").await;
    harness.click("interesse_Gastronomia").await;
    harness.click("interesse_Museus").await;
    let output = harness.click(FINISH_INTERESTS).await;
    assert!(output.contains("Gastronomia"));
    assert_eq!(harness.state().await, ConversationState::Idle);

    let profile = harness.engine.sessions().get_profile(IDENTITY).await.unwrap();
    assert_eq!(profile.interests.as_deref(), Some("Gastronomia"));
    assert_eq!(profile.name.as_deref(), None);

    harness.click(MENU_PLAN).await;
    harness.say("Roma").await;
    harness.say("02/11 a 03/11").await;
    harness.say("R$ 8 mil").await;

    assert!(llm.prompts()[0].contains("Interesses em Gastronomia"));
}

#[tokio::test]
async fn test_spreadsheet_lands_in_download_dir() {
    let store_dir = TempDir::new().expect("Failed to create temp dir");
    let download_dir = TempDir::new().expect("Failed to create temp dir");
    let harness = Harness::new(&store_dir, &download_dir, ScriptedLlm::new(&[ITINERARY]), &[]);

    harness.click(MENU_PLAN).await;
    harness.say("Roma").await;
    harness.say("02/11 a 03/11").await;
    harness.say("1500 euros").await;
    harness.click(EXPORT_SPREADSHEET).await;

    let path = download_dir.path().join("roteiro_viagem.csv");
    let csv = std::fs::read_to_string(&path).expect("spreadsheet written");
    assert!(csv.contains("Trastevere"));
    assert!(csv.contains("Museus Vaticanos"));
    assert_eq!(harness.state().await, ConversationState::ItineraryReady);
}

#[tokio::test]
async fn test_guide_question_then_restart() {
    let store_dir = TempDir::new().expect("Failed to create temp dir");
    let download_dir = TempDir::new().expect("Failed to create temp dir");
    let llm = ScriptedLlm::new(&["O Coliseu abre às 9h."]);
    let harness = Harness::new(
        &store_dir,
        &download_dir,
        llm.clone(),
        &["Coliseu: aberto das 9h às 19h, compre ingressos online."],
    );

    harness.click(MENU_QUESTIONS).await;
    assert_eq!(harness.state().await, ConversationState::AwaitingQuestion);

    let output = harness.say("Que horas abre o Coliseu?").await;
    assert!(output.contains("O Coliseu abre às 9h."));
    assert_eq!(harness.state().await, ConversationState::Idle);
    assert!(llm.prompts()[0].contains("compre ingressos online"));

    let output = harness.say("/reiniciar").await;
    assert!(output.contains("Vamos recomeçar"));
    assert_eq!(harness.state().await, ConversationState::AwaitingDestination);
}
