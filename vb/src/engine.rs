//! Event pipeline
//!
//! One inbound event runs under its identity lock: load the session, step the
//! state machine, then alternate between committing a transition (profile
//! writes, session persistence, delivery) and executing the effect it asked
//! for until no effect remains.

use std::sync::Arc;

use sessionstore::{ItineraryRecord, Profile};
use tracing::{debug, error, info, warn};

use crate::bot::{self, DateReplyKind, Effect, GenerationError, InboundEvent, ItineraryRequest, Outcome, Transition};
use crate::llm::{self, LlmClient, LlmError};
use crate::prompts::{DateClassifyContext, DateQuestionContext, ItineraryContext, PromptLoader};
use crate::qa::{GuideQa, QaError};
use crate::render::{Document, DocumentFormat, RenderRequest, Renderer};
use crate::session::{IdentityLocks, Session, SessionManager};
use crate::text::{extract_json, extract_table};
use crate::transport::{self, Transport};

/// Effect round trips allowed for one inbound event
const MAX_STEPS: usize = 4;

impl From<LlmError> for GenerationError {
    fn from(e: LlmError) -> Self {
        if e.is_malformed() {
            GenerationError::Malformed(e.to_string())
        } else {
            GenerationError::Unavailable(e.to_string())
        }
    }
}

impl From<QaError> for GenerationError {
    fn from(e: QaError) -> Self {
        match e {
            QaError::Llm(e) => e.into(),
            other => GenerationError::Unavailable(other.to_string()),
        }
    }
}

fn prompt_error(e: eyre::Report) -> GenerationError {
    GenerationError::Malformed(format!("prompt: {e}"))
}

/// Wires the state machine to its collaborators
pub struct Engine {
    sessions: SessionManager,
    llm: Arc<dyn LlmClient>,
    qa: Arc<GuideQa>,
    renderer: Arc<dyn Renderer>,
    prompts: Arc<PromptLoader>,
    locks: IdentityLocks,
    max_tokens: u32,
}

impl Engine {
    pub fn new(
        sessions: SessionManager,
        llm: Arc<dyn LlmClient>,
        qa: GuideQa,
        renderer: Arc<dyn Renderer>,
        prompts: Arc<PromptLoader>,
        max_tokens: u32,
    ) -> Self {
        Self {
            sessions,
            llm,
            qa: Arc::new(qa),
            renderer,
            prompts,
            locks: IdentityLocks::new(),
            max_tokens,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Process one inbound event and deliver every reply it produces
    ///
    /// Never fails: store and delivery errors are logged and the
    /// conversation carries on.
    pub async fn handle_event(&self, event: InboundEvent, transport: &dyn Transport) {
        let identity = event.identity().to_string();
        debug!(%identity, transport = transport.name(), "handle_event: called");
        let _guard = self.locks.acquire(&identity).await;

        let session = match self.sessions.load(&identity).await {
            Ok(session) => session,
            Err(e) => {
                warn!(%identity, error = %e, "Session load failed, starting fresh");
                Session::new(&identity)
            }
        };
        let mut profile = self.load_profile(&identity).await;

        let mut transition = bot::handle(session, &event, &profile);
        for step in 0..MAX_STEPS {
            let effect = transition.effect.take();
            let session = transition.session.clone();
            profile = self.commit(&identity, transition, profile, transport).await;

            let Some(effect) = effect else {
                return;
            };
            info!(%identity, effect = effect.name(), step, "Running effect");
            let outcome = self.run(&identity, effect).await;
            transition = bot::resume(session, outcome, &profile);
        }

        error!(%identity, "Effect chain did not settle, dropping remaining effect");
        self.commit(&identity, transition, profile, transport).await;
    }

    async fn load_profile(&self, identity: &str) -> Profile {
        match self.sessions.get_profile(identity).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(%identity, error = %e, "Profile load failed, using empty profile");
                Profile::default()
            }
        }
    }

    /// Apply profile writes, persist the session and deliver replies
    async fn commit(
        &self,
        identity: &str,
        transition: Transition,
        profile: Profile,
        transport: &dyn Transport,
    ) -> Profile {
        debug!(%identity, state = %transition.session.state, replies = transition.replies.len(), "commit: called");
        let Transition {
            session,
            replies,
            profile_updates,
            ..
        } = transition;

        let profile = if profile_updates.is_empty() {
            profile
        } else {
            for (field, value) in &profile_updates {
                if let Err(e) = self.sessions.set_profile(identity, *field, value).await {
                    warn!(%identity, %field, error = %e, "Profile update failed");
                }
            }
            self.load_profile(identity).await
        };

        let persisted = if session.is_blank() {
            self.sessions.clear(identity).await.map(|_| ())
        } else {
            self.sessions.save(session).await
        };
        if let Err(e) = persisted {
            warn!(%identity, error = %e, "Session persistence failed");
        }

        for reply in replies {
            for message in transport::prepare(transport, reply) {
                if let Err(e) = transport.send(identity, message).await {
                    warn!(%identity, transport = transport.name(), error = %e, "Delivery failed");
                }
            }
        }

        profile
    }

    async fn run(&self, identity: &str, effect: Effect) -> Outcome {
        match effect {
            Effect::ClassifyDateReply { destination, reply } => {
                let kind = self.classify_date_reply(&destination, &reply).await;
                Outcome::DateReplyClassified { kind, reply }
            }
            Effect::AnswerTimingQuestion { destination, question } => {
                Outcome::TimingAnswered(self.answer_timing(&destination, &question).await)
            }
            Effect::GenerateItinerary(request) => {
                let result = self.generate_itinerary(&request).await;
                if let Ok(text) = &result {
                    self.record_itinerary(identity, &request, text).await;
                }
                Outcome::ItineraryGenerated(result)
            }
            Effect::AnswerQuestion { question } => {
                Outcome::QuestionAnswered(self.qa.answer(&question).await.map_err(GenerationError::from))
            }
            Effect::Render { format, request } => Outcome::Rendered(self.render(format, request).await),
        }
    }

    async fn complete(&self, template: &str, context: &impl serde::Serialize) -> Result<String, GenerationError> {
        let prompt = self.prompts.render(template, context).map_err(prompt_error)?;
        let system = self.prompts.persona().map_err(prompt_error)?;
        Ok(llm::complete_text(self.llm.as_ref(), &system, &prompt, self.max_tokens).await?)
    }

    /// Any failure along the way classifies as undefined
    async fn classify_date_reply(&self, destination: &str, reply: &str) -> DateReplyKind {
        debug!(%destination, %reply, "classify_date_reply: called");
        let context = DateClassifyContext {
            destination: destination.to_string(),
            reply: reply.to_string(),
        };
        let text = match self.complete("date-classify", &context).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Date classification failed");
                return DateReplyKind::Undefined;
            }
        };

        let kind = extract_json(&text)
            .and_then(|json| json.get("classificacao").and_then(|v| v.as_str()).map(DateReplyKind::from_label))
            .unwrap_or(DateReplyKind::Undefined);
        debug!(?kind, "classify_date_reply: classified");
        kind
    }

    async fn answer_timing(&self, destination: &str, question: &str) -> Result<String, GenerationError> {
        debug!(%destination, "answer_timing: called");
        let context = DateQuestionContext {
            destination: destination.to_string(),
            question: question.to_string(),
        };
        self.complete("date-question", &context).await
    }

    /// Generate the itinerary, asking once more for the table when it is missing
    async fn generate_itinerary(&self, request: &ItineraryRequest) -> Result<String, GenerationError> {
        debug!(destination = %request.destination, "generate_itinerary: called");
        let context = ItineraryContext {
            destination: request.destination.clone(),
            dates: request.dates.clone(),
            budget: request.budget.clone(),
            interests: request.interests.clone(),
            travel_style: request.travel_style.clone(),
        };
        let text = self.complete("itinerary", &context).await?;
        if !extract_table(&text).is_empty() {
            return Ok(text);
        }

        info!(destination = %request.destination, "Itinerary without table, requesting table only");
        match self.complete("itinerary-table", &context).await {
            Ok(table) if !extract_table(&table).is_empty() => Ok(format!("{table}\n\n{text}")),
            Ok(_) => {
                debug!("generate_itinerary: table regeneration had no table");
                Ok(text)
            }
            Err(e) => {
                warn!(error = %e, "Table regeneration failed");
                Ok(text)
            }
        }
    }

    /// Keep a generated itinerary in the traveller's history
    async fn record_itinerary(&self, identity: &str, request: &ItineraryRequest, text: &str) {
        let non_empty = |s: &str| Some(s.to_string()).filter(|s| !s.is_empty());
        let record = ItineraryRecord::new(
            identity,
            non_empty(&request.destination),
            non_empty(&request.dates),
            non_empty(&request.budget),
            text,
        );
        match self.sessions.record_itinerary(record).await {
            Ok(id) => debug!(%identity, id, "record_itinerary: stored"),
            Err(e) => warn!(%identity, error = %e, "Itinerary history write failed"),
        }
    }

    async fn render(&self, format: DocumentFormat, request: RenderRequest) -> Result<Document, GenerationError> {
        debug!(%format, identity = %request.identity, "render: called");
        let renderer = Arc::clone(&self.renderer);
        tokio::task::spawn_blocking(move || renderer.render(format, &request))
            .await
            .map_err(|e| GenerationError::Render(e.to_string()))?
            .map_err(|e| GenerationError::Render(e.to_string()))
    }
}
