//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Context for the `itinerary` and `itinerary-table` templates
#[derive(Debug, Clone, Serialize)]
pub struct ItineraryContext {
    pub destination: String,
    pub dates: String,
    pub budget: String,
    pub interests: Option<String>,
    pub travel_style: Option<String>,
}

/// Context for the `date-classify` template
#[derive(Debug, Clone, Serialize)]
pub struct DateClassifyContext {
    pub destination: String,
    pub reply: String,
}

/// Context for the `date-question` template
#[derive(Debug, Clone, Serialize)]
pub struct DateQuestionContext {
    pub destination: String,
    pub question: String,
}

/// Context for the `guide-answer` template
#[derive(Debug, Clone, Serialize)]
pub struct GuideAnswerContext {
    pub question: String,
    pub excerpts: Vec<String>,
    pub not_found: String,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.vexusbot/prompts/`)
    user_dir: Option<PathBuf>,
    /// Repo default directory (e.g., `prompts/`)
    repo_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a new prompt loader rooted at `root`
    ///
    /// Looks for `.vexusbot/prompts/` and `prompts/` under the root.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        debug!(?root, "PromptLoader::new: called");
        let user_dir = root.join(".vexusbot/prompts");
        let repo_dir = root.join("prompts");

        let user_dir_exists = user_dir.exists();
        let repo_dir_exists = repo_dir.exists();
        debug!(
            ?user_dir,
            %user_dir_exists,
            ?repo_dir,
            %repo_dir_exists,
            "PromptLoader::new: checking directories"
        );

        Self {
            hbs: Self::engine(),
            user_dir: user_dir_exists.then_some(user_dir),
            repo_dir: repo_dir_exists.then_some(repo_dir),
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
            repo_dir: None,
        }
    }

    // Prompts are plain text, so HTML escaping would mangle quotes in user replies
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `.vexusbot/prompts/{name}.pmt`
    /// 2. Repo default: `prompts/{name}.pmt`
    /// 3. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        for dir in [&self.user_dir, &self.repo_dir].into_iter().flatten() {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found on disk");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        debug!("PromptLoader::load_template: trying embedded fallback");
        if let Some(content) = embedded::get_embedded(name) {
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// System prompt for every completion
    pub fn persona(&self) -> Result<String> {
        debug!("PromptLoader::persona: called");
        self.load_template("persona")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn itinerary() -> ItineraryContext {
        ItineraryContext {
            destination: "Lisboa".to_string(),
            dates: "10/07 a 18/07".to_string(),
            budget: "R$ 8.000".to_string(),
            interests: Some("Museus, Gastronomia".to_string()),
            travel_style: None,
        }
    }

    #[test]
    fn test_render_itinerary() {
        let loader = PromptLoader::embedded_only();
        let prompt = loader.render("itinerary", &itinerary()).unwrap();

        assert!(prompt.contains("roteiro de viagem detalhado para Lisboa de 10/07 a 18/07"));
        assert!(prompt.contains("orçamento de R$ 8.000"));
        assert!(prompt.contains("Interesses em Museus, Gastronomia"));
        assert!(!prompt.contains("Estilo de viagem"));
    }

    #[test]
    fn test_render_does_not_escape() {
        let loader = PromptLoader::embedded_only();
        let ctx = DateClassifyContext {
            destination: "Paris".to_string(),
            reply: "qual a \"melhor\" época? <sério>".to_string(),
        };
        let prompt = loader.render("date-classify", &ctx).unwrap();
        assert!(prompt.contains("qual a \"melhor\" época? <sério>"));
    }

    #[test]
    fn test_render_guide_answer() {
        let loader = PromptLoader::embedded_only();
        let ctx = GuideAnswerContext {
            question: "Onde comer em Roma?".to_string(),
            excerpts: vec!["Trastevere tem ótimas trattorias.".to_string()],
            not_found: "Não encontrei essa dica no meu guia de viagens.".to_string(),
        };
        let prompt = loader.render("guide-answer", &ctx).unwrap();
        assert!(prompt.contains("Trastevere tem ótimas trattorias."));
        assert!(prompt.contains("PERGUNTA: Onde comer em Roma?"));
        assert!(prompt.contains("Não encontrei essa dica"));
    }

    #[test]
    fn test_user_override_wins() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join(".vexusbot/prompts");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("itinerary.pmt"), "Roteiro curto para {{destination}}").unwrap();

        let loader = PromptLoader::new(root.path());
        let prompt = loader.render("itinerary", &itinerary()).unwrap();
        assert_eq!(prompt, "Roteiro curto para Lisboa");

        // Templates without an override still come from the binary
        assert!(loader.persona().unwrap().contains("VexusBot"));
    }

    #[test]
    fn test_unknown_template() {
        let loader = PromptLoader::embedded_only();
        assert!(loader.load_template("nonexistent-template").is_err());
    }
}
