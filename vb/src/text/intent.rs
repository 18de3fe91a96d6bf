//! Recognition of global commands and short intents in user text

const GREETINGS: &[&str] = &[
    "oi", "olá", "ola", "hey", "bom dia", "boa tarde", "boa noite", "eai", "e ai", "opa",
];

const MENU_COMMANDS: &[&str] = &["menu", "iniciar", "start", "voltar", "/start", "/menu"];

const RESTART_COMMANDS: &[&str] = &["reiniciar", "/reiniciar"];

const THANKS: &[&str] = &["obrigado", "obrigada", "valeu", "grato", "agradeço", "thanks", "obg"];

const NEGATIONS: &[&str] = &["não", "nao", "no", "n", "nope", "nada"];

const PLANNING: &[&str] = &["roteiro", "viagem", "viajar", "planejar"];

const SPREADSHEET: &[&str] = &["excel", "planilha", "csv"];

/// Lower-cased and trimmed
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Greeting on its own or followed by more words ("oi", "bom dia, tudo bem")
pub fn is_greeting(text: &str) -> bool {
    let t = normalize(text);
    GREETINGS.iter().any(|g| {
        t == *g
            || t.strip_prefix(g)
                .is_some_and(|rest| rest.starts_with([' ', ',', '!', '.']))
    })
}

pub fn is_menu_command(text: &str) -> bool {
    MENU_COMMANDS.contains(&normalize(text).as_str())
}

pub fn is_restart(text: &str) -> bool {
    RESTART_COMMANDS.contains(&normalize(text).as_str())
}

/// Any thanks word anywhere in the text
pub fn is_thanks(text: &str) -> bool {
    let t = normalize(text);
    THANKS.iter().any(|w| t.contains(w))
}

/// Any standalone negation token, punctuation ignored
pub fn is_negation(text: &str) -> bool {
    normalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| NEGATIONS.contains(&token))
}

/// Free text that asks to plan a trip
pub fn is_plan_request(text: &str) -> bool {
    let t = normalize(text);
    PLANNING.iter().any(|w| t.contains(w))
}

pub fn is_pdf_request(text: &str) -> bool {
    normalize(text).contains("pdf")
}

pub fn is_spreadsheet_request(text: &str) -> bool {
    let t = normalize(text);
    SPREADSHEET.iter().any(|w| t.contains(w))
}

/// Capitalize the first letter of every word and lower-case the rest
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.trim().chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
