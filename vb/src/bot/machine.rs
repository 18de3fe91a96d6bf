//! Conversation state machine
//!
//! `handle` consumes one inbound event, `resume` consumes the outcome of the
//! effect a previous step requested. Global text commands are checked before
//! the per-state dispatch in this order: restart, thanks, greeting, menu.

use sessionstore::{Profile, ProfileField};
use tracing::{debug, info, warn};

use super::reducer;
use super::replies::{self, *};
use super::{DateReplyKind, Effect, InboundEvent, ItineraryRequest, Outcome, Reply, Transition};
use crate::render::{DocumentFormat, RenderRequest};
use crate::session::{ConversationState, Session, SessionMode};
use crate::text::{
    DATE_FORMAT_HELP, extract_table, format_table_monospace, intent, parse_date_range, strip_table_lines,
};

const ITINERARY_HEADING: &str = "🎉 *Seu Roteiro Personalizado*";

/// Compute the transition for one inbound event
pub fn handle(session: Session, event: &InboundEvent, profile: &Profile) -> Transition {
    debug!(identity = %session.identity, state = %session.state, mode = ?session.mode, "handle: called");
    match event {
        InboundEvent::Text { body, .. } => handle_text(session, body.trim(), event, profile),
        InboundEvent::Selection { option_id, .. } => handle_selection(session, option_id, profile),
    }
}

fn with_known_name(transition: Transition, event: &InboundEvent) -> Transition {
    match event.known_name() {
        Some(name) => transition.update_profile(ProfileField::Name, name),
        None => transition,
    }
}

fn handle_text(mut session: Session, body: &str, event: &InboundEvent, profile: &Profile) -> Transition {
    let name = event.display_name();

    if intent::is_restart(body) {
        info!(identity = %session.identity, "Restart requested");
        session.reset_to(ConversationState::AwaitingDestination);
        return Transition::new(session).say(replies::restart(name));
    }

    let declining = session.state == ConversationState::AwaitingFinalConfirmation && intent::is_negation(body);
    if intent::is_thanks(body) && !declining {
        debug!(identity = %session.identity, "handle_text: thanks");
        session.mode = None;
        session.goto(ConversationState::AwaitingFinalConfirmation);
        return Transition::new(session).say(THANKS_REPLY);
    }

    if intent::is_greeting(body) {
        debug!(identity = %session.identity, "handle_text: greeting");
        session.reset_to(ConversationState::Idle);
        let t = Transition::new(session)
            .say(replies::introduction(name))
            .menu(replies::main_menu());
        return with_known_name(t, event);
    }

    if intent::is_menu_command(body) {
        debug!(identity = %session.identity, "handle_text: menu command");
        session.reset_to(ConversationState::Idle);
        return with_known_name(Transition::new(session).menu(replies::main_menu()), event);
    }

    if session.mode == Some(SessionMode::Rag) {
        debug!(identity = %session.identity, "handle_text: question mode");
        let question = body.to_string();
        return Transition::new(session).effect(Effect::AnswerQuestion { question });
    }

    match session.state {
        ConversationState::Idle => {
            if intent::is_plan_request(body) {
                session.reset_to(ConversationState::AwaitingDestination);
                Transition::new(session).say(ASK_DESTINATION)
            } else {
                Transition::new(session).menu(replies::main_menu())
            }
        }

        ConversationState::AwaitingDestination => {
            if body.is_empty() {
                return Transition::new(session).say(ASK_DESTINATION);
            }
            let destination = intent::title_case(body);
            let reply = replies::destination_chosen(&destination, DATE_FORMAT_HELP);
            session.data.destination = Some(destination);
            session.goto(ConversationState::AwaitingDates);
            Transition::new(session).say(reply)
        }

        ConversationState::AwaitingDates => match parse_date_range(body) {
            Some(range) => {
                session.data.dates = Some(range.canonical());
                session.goto(ConversationState::AwaitingBudget);
                Transition::new(session).say(ASK_BUDGET)
            }
            None => {
                debug!(identity = %session.identity, "handle_text: dates not parsed, classifying");
                let destination = destination_or_default(&session);
                Transition::new(session).effect(Effect::ClassifyDateReply {
                    destination,
                    reply: body.to_string(),
                })
            }
        },

        ConversationState::AwaitingBudget => {
            if body.is_empty() {
                return Transition::new(session).say(ASK_BUDGET);
            }
            session.data.budget = Some(body.to_string());
            start_generation(session, profile)
        }

        ConversationState::GeneratingItinerary => {
            if session.data.funnel_complete() {
                info!(identity = %session.identity, "Resuming interrupted itinerary generation");
                start_generation(session, profile)
            } else {
                warn!(identity = %session.identity, "Generation state without funnel data, restarting funnel");
                session.reset_to(ConversationState::AwaitingDestination);
                Transition::new(session).say(ASK_DESTINATION)
            }
        }

        ConversationState::ItineraryReady => {
            if intent::is_pdf_request(body) {
                request_render(session, DocumentFormat::Pdf)
            } else if intent::is_spreadsheet_request(body) {
                request_render(session, DocumentFormat::Spreadsheet)
            } else {
                Transition::new(session)
                    .say(ITINERARY_ALREADY_READY)
                    .menu(replies::post_itinerary_menu())
            }
        }

        ConversationState::AwaitingQuestion => {
            session.mode = Some(SessionMode::Rag);
            let question = body.to_string();
            Transition::new(session).effect(Effect::AnswerQuestion { question })
        }

        ConversationState::AwaitingFinalConfirmation => {
            let framing = if intent::is_negation(body) { FINAL_DECLINED } else { FINAL_OTHER };
            session.reset_to(ConversationState::Idle);
            Transition::new(session).say(framing).menu(replies::main_menu())
        }

        ConversationState::EditingInterests => {
            let selected = session.data.interest_selection.clone().unwrap_or_default();
            Transition::new(session)
                .say(USE_BUTTONS)
                .menu(reducer::options(&selected))
        }
    }
}

fn handle_selection(mut session: Session, option_id: &str, profile: &Profile) -> Transition {
    debug!(identity = %session.identity, %option_id, "handle_selection: called");
    match option_id {
        MENU_PLAN => {
            session.reset_to(ConversationState::AwaitingDestination);
            Transition::new(session).say(ASK_DESTINATION)
        }
        MENU_QUESTIONS => {
            session.reset_to(ConversationState::AwaitingQuestion);
            session.mode = Some(SessionMode::Rag);
            Transition::new(session).say(ASK_QUESTION)
        }
        MENU_PROFILE => Transition::new(session).menu(replies::profile_menu()),
        MENU_HELP => Transition::new(session).say(HELP),
        VIEW_PROFILE => {
            let text = match profile.get(ProfileField::Interests) {
                Some(_) => replies::profile_summary(profile),
                None => PROFILE_NOT_SET.to_string(),
            };
            Transition::new(session).say(text).menu(replies::profile_menu())
        }
        EDIT_PROFILE => reducer::begin(session, profile),
        FINISH_INTERESTS => reducer::finish(session, profile),
        EXPORT_PDF => request_render(session, DocumentFormat::Pdf),
        EXPORT_SPREADSHEET => request_render(session, DocumentFormat::Spreadsheet),
        BACK_TO_MENU => {
            session.reset_to(ConversationState::Idle);
            Transition::new(session).menu(replies::main_menu())
        }
        id => match id.strip_prefix(INTEREST_PREFIX) {
            Some(tag) if reducer::CATALOG.contains(&tag) => reducer::toggle(session, tag, profile),
            _ => {
                warn!(identity = %session.identity, option_id = %id, "Unknown selection");
                Transition::new(session).menu(replies::main_menu())
            }
        },
    }
}

fn destination_or_default(session: &Session) -> String {
    session
        .data
        .destination
        .clone()
        .unwrap_or_else(|| "esse destino".to_string())
}

fn start_generation(mut session: Session, profile: &Profile) -> Transition {
    let request = ItineraryRequest {
        destination: session.data.destination.clone().unwrap_or_default(),
        dates: session.data.dates.clone().unwrap_or_default(),
        budget: session.data.budget.clone().unwrap_or_default(),
        interests: profile.get(ProfileField::Interests).map(String::from),
        travel_style: profile.get(ProfileField::TravelStyle).map(String::from),
    };
    debug!(identity = %session.identity, destination = %request.destination, "start_generation: called");
    session.goto(ConversationState::GeneratingItinerary);
    Transition::new(session)
        .say(GENERATING)
        .effect(Effect::GenerateItinerary(request))
}

fn request_render(session: Session, format: DocumentFormat) -> Transition {
    let Some(itinerary) = session.data.itinerary.clone() else {
        debug!(identity = %session.identity, %format, "request_render: no itinerary");
        return Transition::new(session).say(NO_ITINERARY).menu(replies::main_menu());
    };

    let data = &session.data;
    let request = RenderRequest {
        identity: session.identity.clone(),
        destination: data.destination.clone().unwrap_or_default(),
        dates: data.dates.clone().unwrap_or_default(),
        budget: data.budget.clone().unwrap_or_default(),
        table: data.table.clone().unwrap_or_default(),
        description: data.description.clone().unwrap_or_default(),
        itinerary,
    };
    Transition::new(session)
        .say(RENDERING)
        .effect(Effect::Render { format, request })
}

/// Apply the outcome of an executed effect
pub fn resume(mut session: Session, outcome: Outcome, _profile: &Profile) -> Transition {
    debug!(identity = %session.identity, state = %session.state, "resume: called");
    match outcome {
        Outcome::DateReplyClassified { kind, reply } => match kind {
            DateReplyKind::TimingQuestion => {
                let destination = destination_or_default(&session);
                Transition::new(session).effect(Effect::AnswerTimingQuestion {
                    destination,
                    question: reply,
                })
            }
            DateReplyKind::DateProvided | DateReplyKind::Undefined => {
                Transition::new(session).say(format!("{DATES_NOT_UNDERSTOOD}\n{DATE_FORMAT_HELP}"))
            }
        },

        Outcome::TimingAnswered(Ok(answer)) => Transition::new(session).say(format!("{answer}\n\n{DATE_FORMAT_HELP}")),
        Outcome::TimingAnswered(Err(e)) => {
            warn!(identity = %session.identity, error = %e, "Timing question failed");
            Transition::new(session).say(format!("{TIMING_FAILED} {DATE_FORMAT_HELP}"))
        }

        Outcome::ItineraryGenerated(Ok(text)) => {
            let table = extract_table(&text);
            let description = strip_table_lines(&text);
            info!(identity = %session.identity, rows = table.body().len(), "Itinerary ready");

            let message = if table.is_empty() {
                format!("{ITINERARY_HEADING}\n\n{NO_TABLE_PLACEHOLDER}\n\n{description}")
            } else {
                format!(
                    "{ITINERARY_HEADING}\n\n```\n{}\n```\n\n{description}",
                    format_table_monospace(&table)
                )
            };

            session.data.itinerary = Some(text);
            session.data.table = (!table.is_empty()).then_some(table);
            session.data.description = Some(description);
            session.goto(ConversationState::ItineraryReady);
            Transition::new(session)
                .say(message.trim_end().to_string())
                .menu(replies::post_itinerary_menu())
        }
        Outcome::ItineraryGenerated(Err(e)) => {
            warn!(identity = %session.identity, error = %e, "Itinerary generation failed, restarting funnel");
            session.reset_to(ConversationState::AwaitingDestination);
            Transition::new(session).say(GENERATION_FAILED)
        }

        Outcome::QuestionAnswered(result) => {
            let text = match result {
                Ok(answer) => answer,
                Err(e) => {
                    warn!(identity = %session.identity, error = %e, "Guide question failed");
                    QUESTION_FAILED.to_string()
                }
            };
            if session.state == ConversationState::AwaitingQuestion {
                session.reset_to(ConversationState::Idle);
            } else {
                session.mode = None;
            }
            Transition::new(session).say(text).menu(replies::ask_another_menu())
        }

        Outcome::Rendered(Ok(document)) => {
            info!(identity = %session.identity, file = %document.file_name, "Document rendered");
            Transition::new(session)
                .reply(Reply::Document(document))
                .menu(replies::post_itinerary_menu())
        }
        Outcome::Rendered(Err(e)) => {
            warn!(identity = %session.identity, error = %e, "Document rendering failed");
            Transition::new(session)
                .say(RENDER_FAILED)
                .menu(replies::post_itinerary_menu())
        }
    }
}
