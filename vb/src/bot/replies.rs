//! Menus and user-facing copy

use sessionstore::Profile;

use super::{Menu, MenuOption};

pub const MENU_PLAN: &str = "menu_planejar";
pub const MENU_QUESTIONS: &str = "menu_duvidas";
pub const MENU_PROFILE: &str = "menu_perfil";
pub const MENU_HELP: &str = "menu_ajuda";
pub const VIEW_PROFILE: &str = "ver_perfil";
pub const EDIT_PROFILE: &str = "editar_perfil";
pub const BACK_TO_MENU: &str = "voltar_menu";
pub const EXPORT_PDF: &str = "gerar_pdf";
pub const EXPORT_SPREADSHEET: &str = "gerar_excel";
pub const INTEREST_PREFIX: &str = "interesse_";
pub const FINISH_INTERESTS: &str = "concluir_interesses";

pub const ASK_DESTINATION: &str = "✈️ Ótimo! Para qual cidade ou país você quer um roteiro?";
pub const ASK_BUDGET: &str = "💰 Perfeito! Qual o seu orçamento total para a viagem?";
pub const ASK_QUESTION: &str =
    "❓ Pode perguntar! Respondo com base no meu guia de viagens.\n\nEx.: *Qual a melhor época para visitar Roma?*";
pub const GENERATING: &str = "🎉 Perfeito! Estou preparando seu roteiro personalizado...\nAguarde alguns segundos...";
pub const GENERATION_FAILED: &str =
    "Desculpe, tive um problema ao gerar o roteiro. Tente novamente!\n\nPara qual cidade ou país você quer um roteiro?";
pub const ITINERARY_ALREADY_READY: &str = "Seu roteiro já foi gerado! O que gostaria de fazer?";
pub const RENDERING: &str = "📄 Gerando seu arquivo... Aguarde...";
pub const RENDER_FAILED: &str = "Desculpe, tive um problema ao gerar o arquivo.";
pub const NO_ITINERARY: &str = "❌ Não encontrei um roteiro. Crie um roteiro primeiro!";
pub const DATES_NOT_UNDERSTOOD: &str = "Desculpe, não entendi as datas.";
pub const TIMING_FAILED: &str = "Desculpe, tive um problema.";
pub const QUESTION_FAILED: &str = "Desculpe, não consegui consultar meu guia agora. Tente novamente em instantes.";
pub const INTERESTS_NOT_EDITING: &str =
    "Essa seleção de interesses já foi encerrada. Para alterar, escolha 'Editar Perfil'.";
pub const USE_BUTTONS: &str = "Use os botões acima para selecionar seus interesses.";
pub const THANKS_REPLY: &str = "De nada! 😊 Fico feliz em ajudar. Posso ajudar em algo mais?";
pub const FINAL_DECLINED: &str = "Tudo bem! Voltando ao menu principal.";
pub const FINAL_OTHER: &str = "Certo! Vamos recomeçar pelo menu principal.";
pub const PROFILE_NOT_SET: &str = "Você ainda não configurou seu perfil. Clique em 'Editar Perfil' para começar!";
pub const NO_TABLE_PLACEHOLDER: &str = "📋 Não consegui montar a tabela resumida, mas o roteiro completo está abaixo.";

pub const HELP: &str = "📖 *Como usar o VexusBot*\n\n\
    1️⃣ *Planejar Roteiro*: Crio um roteiro completo personalizado\n\
    2️⃣ *Tirar Dúvidas*: Respondo perguntas com base no meu guia de viagens\n\
    3️⃣ *Meu Perfil*: Configure suas preferências de viagem\n\
    4️⃣ *Menu*: Digite 'menu' para voltar\n\n\
    Estou aqui para ajudar! ✈️";

/// First contact / greeting
pub fn introduction(name: &str) -> String {
    format!(
        "Olá, {name}! Eu sou o VexusBot. ✈️\n\n\
         Sou seu assistente de viagens pessoal e uso inteligência artificial \
         para te ajudar a planejar a viagem dos sonhos!\n\n\
         Posso criar *roteiros completos*, tirar *dúvidas de viagem* ou \
         criar um *perfil de viajante* personalizado.\n\n\
         Veja as opções abaixo:"
    )
}

pub fn restart(name: &str) -> String {
    format!("🔄 Certo, {name}! Vamos recomeçar. Para qual cidade ou país você quer um roteiro?")
}

pub fn destination_chosen(destination: &str, date_help: &str) -> String {
    format!("✈️ *{destination}* é uma ótima escolha!\n\nAgora me conte: *quando* você vai viajar?\n\n{date_help}")
}

pub fn profile_summary(profile: &Profile) -> String {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "Não informado".to_string());
    format!(
        "👤 *Seu Perfil de Viajante*\n\n• *Nome:* {}\n• *Interesses:* {}",
        field(&profile.name),
        field(&profile.interests)
    )
}

pub fn profile_saved(interests: &str) -> String {
    if interests.is_empty() {
        "✅ Perfil salvo!".to_string()
    } else {
        format!("✅ Perfil salvo com sucesso!\n\n*Seus interesses:* {interests}")
    }
}

pub fn main_menu() -> Menu {
    Menu {
        body: "🌟 Olá! Eu sou o VexusBot.\n\nComo posso te ajudar?".to_string(),
        button: "Ver Opções".to_string(),
        options: vec![
            MenuOption::new(MENU_PLAN, "✈️ Planejar Roteiro").describe("Criar roteiro personalizado"),
            MenuOption::new(MENU_QUESTIONS, "❓ Tirar Dúvidas").describe("Perguntas sobre viagens"),
            MenuOption::new(MENU_PROFILE, "👤 Meu Perfil").describe("Ver/editar preferências"),
            MenuOption::new(MENU_HELP, "📖 Ajuda").describe("Como usar o bot"),
        ],
    }
}

pub fn profile_menu() -> Menu {
    Menu {
        body: "👤 *Gerenciar Perfil*\n\nO que você gostaria de fazer?".to_string(),
        button: "Opções".to_string(),
        options: vec![
            MenuOption::new(VIEW_PROFILE, "👁️ Ver Perfil"),
            MenuOption::new(EDIT_PROFILE, "✏️ Editar Perfil"),
            MenuOption::new(BACK_TO_MENU, "⬅️ Voltar"),
        ],
    }
}

pub fn post_itinerary_menu() -> Menu {
    Menu {
        body: "📋 O que você gostaria de fazer agora?".to_string(),
        button: "Opções".to_string(),
        options: vec![
            MenuOption::new(EXPORT_PDF, "📄 Gerar PDF"),
            MenuOption::new(EXPORT_SPREADSHEET, "📊 Gerar Excel"),
            MenuOption::new(BACK_TO_MENU, "⬅️ Voltar ao Menu"),
        ],
    }
}

pub fn ask_another_menu() -> Menu {
    Menu {
        body: "Quer perguntar mais alguma coisa?".to_string(),
        button: "Opções".to_string(),
        options: vec![
            MenuOption::new(MENU_QUESTIONS, "❓ Outra pergunta"),
            MenuOption::new(BACK_TO_MENU, "⬅️ Voltar ao Menu"),
        ],
    }
}
