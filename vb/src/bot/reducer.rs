//! Interest selection reducer
//!
//! A toggle set over `SessionData::interest_selection`. While it runs the
//! session sits in `EditingInterests`; no other data field is read or written.

use sessionstore::{Profile, ProfileField};
use tracing::debug;

use super::replies::{self, FINISH_INTERESTS, INTEREST_PREFIX};
use super::{Menu, MenuOption, Transition};
use crate::session::{ConversationState, Session};

/// Selectable interest tags, in presentation order
pub const CATALOG: [&str; 4] = ["Museus", "Natureza", "Vida Noturna", "Gastronomia"];

const SELECTED_MARKER: &str = "✅ ";

/// Option list with a marker on every selected tag, then the done action
pub fn options(selected: &[String]) -> Menu {
    let mut options: Vec<MenuOption> = CATALOG
        .iter()
        .map(|tag| {
            let marker = if selected.iter().any(|s| s == tag) { SELECTED_MARKER } else { "" };
            MenuOption::new(format!("{INTEREST_PREFIX}{tag}"), format!("{marker}{tag}"))
                .describe("Clique para adicionar/remover")
        })
        .collect();
    options.push(MenuOption::new(FINISH_INTERESTS, "✔️ Concluir Seleção").describe("Salvar e voltar"));

    Menu {
        body: "✏️ *Editar Interesses*\n\nSelecione seus interesses de viagem:".to_string(),
        button: "Selecionar".to_string(),
        options,
    }
}

/// Enter the sub-mode seeded from the stored profile
pub fn begin(mut session: Session, profile: &Profile) -> Transition {
    let selected = profile.interest_list();
    debug!(identity = %session.identity, ?selected, "reducer::begin: called");
    session.goto(ConversationState::EditingInterests);
    session.data.interest_selection = Some(selected.clone());
    Transition::new(session).menu(options(&selected))
}

/// Add `tag` if absent, remove it if present
///
/// The first toggle after a restart seeds from the profile when the session
/// has no selection yet.
pub fn toggle(mut session: Session, tag: &str, profile: &Profile) -> Transition {
    debug!(identity = %session.identity, %tag, "reducer::toggle: called");
    let selection = session
        .data
        .interest_selection
        .get_or_insert_with(|| profile.interest_list());

    if let Some(pos) = selection.iter().position(|s| s == tag) {
        selection.remove(pos);
    } else {
        selection.push(tag.to_string());
    }

    let menu = options(selection);
    session.goto(ConversationState::EditingInterests);
    Transition::new(session).menu(menu)
}

/// Persist the selection to the profile and return to idle
///
/// Only the selection is cleared; funnel fields stay as they were. A done tap
/// outside the sub-mode (an old button further up the chat) writes nothing.
pub fn finish(mut session: Session, profile: &Profile) -> Transition {
    if session.state != ConversationState::EditingInterests {
        debug!(identity = %session.identity, state = %session.state, "reducer::finish: not editing, ignoring");
        return Transition::new(session)
            .say(replies::INTERESTS_NOT_EDITING)
            .menu(replies::profile_menu());
    }

    let joined = session
        .data
        .interest_selection
        .take()
        .unwrap_or_else(|| profile.interest_list())
        .join(", ");
    debug!(identity = %session.identity, interests = %joined, "reducer::finish: called");
    session.goto(ConversationState::Idle);

    Transition::new(session)
        .update_profile(ProfileField::Interests, joined.clone())
        .say(replies::profile_saved(&joined))
        .menu(replies::main_menu())
}
