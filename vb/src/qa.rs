//! Question answering over the travel guide
//!
//! Retrieval ranks guide chunks for the question; the completion service then
//! answers using only those excerpts. When nothing is retrieved the fixed
//! not-found reply is returned without calling the completion service.

use std::sync::Arc;

use async_trait::async_trait;
use guidestore::{GuideStore, SearchOptions};
use thiserror::Error;
use tracing::{debug, info};

use crate::llm::{self, LlmClient, LlmError};
use crate::prompts::{GuideAnswerContext, PromptLoader};

/// Reply when the guide has nothing on the question
pub const NOT_FOUND: &str = "Não encontrei essa dica no meu guia de viagens.";

/// Retrieval failures
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("guide search failed: {0}")]
    Search(String),

    #[error("retrieval task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Question answering failures
#[derive(Debug, Error)]
pub enum QaError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("prompt rendering failed: {0}")]
    Prompt(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Source of guide excerpts for a question
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Most relevant excerpts, best first; empty when nothing matches
    async fn retrieve(&self, question: &str) -> Result<Vec<String>, RetrievalError>;
}

/// Retriever backed by an on-disk guidestore
pub struct GuideRetriever {
    store: Arc<GuideStore>,
    top_k: usize,
}

impl GuideRetriever {
    pub fn new(store: GuideStore, top_k: usize) -> Self {
        debug!(path = ?store.path(), %top_k, "GuideRetriever::new: called");
        if !store.is_loaded() {
            info!(path = ?store.path(), "Guide store is empty, every question will get the not-found reply");
        }
        Self {
            store: Arc::new(store),
            top_k,
        }
    }
}

#[async_trait]
impl Retriever for GuideRetriever {
    async fn retrieve(&self, question: &str) -> Result<Vec<String>, RetrievalError> {
        debug!(%question, "GuideRetriever::retrieve: called");
        let store = Arc::clone(&self.store);
        let query = question.to_string();
        let options = SearchOptions {
            max_results: self.top_k,
        };

        // Search reads chunk files synchronously
        let hits = tokio::task::spawn_blocking(move || store.search(&query, options))
            .await?
            .map_err(|e| RetrievalError::Search(e.to_string()))?;

        debug!(hit_count = hits.len(), "GuideRetriever::retrieve: done");
        Ok(hits.into_iter().map(|hit| hit.text).collect())
    }
}

/// Retrieval-augmented answers to free-form travel questions
pub struct GuideQa {
    retriever: Arc<dyn Retriever>,
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    max_tokens: u32,
}

impl GuideQa {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptLoader>,
        max_tokens: u32,
    ) -> Self {
        Self {
            retriever,
            llm,
            prompts,
            max_tokens,
        }
    }

    pub async fn answer(&self, question: &str) -> Result<String, QaError> {
        debug!(%question, "GuideQa::answer: called");
        let excerpts = self.retriever.retrieve(question).await?;
        if excerpts.is_empty() {
            debug!("GuideQa::answer: no excerpts");
            return Ok(NOT_FOUND.to_string());
        }

        let context = GuideAnswerContext {
            question: question.to_string(),
            excerpts,
            not_found: NOT_FOUND.to_string(),
        };
        let prompt = self
            .prompts
            .render("guide-answer", &context)
            .map_err(|e| QaError::Prompt(e.to_string()))?;
        let system = self.prompts.persona().map_err(|e| QaError::Prompt(e.to_string()))?;

        Ok(llm::complete_text(self.llm.as_ref(), &system, &prompt, self.max_tokens).await?)
    }
}


#[cfg(test)]
mod tests {
    use super::mock::FixedRetriever;
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use guidestore::IngestOptions;
    use std::fs;
    use tempfile::TempDir;

    fn qa(excerpts: &[&str], llm: Arc<MockLlmClient>) -> GuideQa {
        let retriever = FixedRetriever::new(excerpts);
        GuideQa::new(Arc::new(retriever), llm, Arc::new(PromptLoader::embedded_only()), 512)
    }

    #[tokio::test]
    async fn test_no_excerpts_skips_completion() {
        let llm = Arc::new(MockLlmClient::with_texts(&["nunca usado"]));
        let answer = qa(&[], llm.clone()).answer("Onde comer em Roma?").await.unwrap();
        assert_eq!(answer, NOT_FOUND);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_answer_uses_excerpts() {
        let llm = Arc::new(MockLlmClient::with_texts(&["  Em Trastevere.  "]));
        let answer = qa(&["Trastevere tem ótimas cantinas."], llm.clone())
            .answer("Onde comer em Roma?")
            .await
            .unwrap();
        assert_eq!(answer, "Em Trastevere.");

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        let prompt = &requests[0].messages[0].content;
        assert!(prompt.contains("Trastevere tem ótimas cantinas."));
        assert!(prompt.contains("PERGUNTA: Onde comer em Roma?"));
        assert!(prompt.contains(NOT_FOUND));
        assert_eq!(requests[0].max_tokens, 512);
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let llm = Arc::new(MockLlmClient::scripted(vec![Err("overloaded")]));
        let result = qa(&["trecho"], llm).answer("pergunta").await;
        assert!(matches!(result, Err(QaError::Llm(LlmError::ApiError { status: 500, .. }))));
    }

    #[tokio::test]
    async fn test_guide_retriever_ranks_chunks() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("roma.txt"),
            "Em Roma, o bairro de Trastevere concentra as melhores cantinas.",
        )
        .unwrap();
        fs::write(temp.path().join("lisboa.txt"), "Lisboa tem o elétrico 28 e pastéis de nata.").unwrap();

        let store = GuideStore::open(temp.path().join("store")).unwrap();
        let pattern = temp.path().join("*.txt").to_string_lossy().to_string();
        store.ingest(&[pattern], IngestOptions::default()).unwrap();

        let retriever = GuideRetriever::new(store, 1);
        let excerpts = retriever.retrieve("cantinas em Trastevere").await.unwrap();
        assert_eq!(excerpts.len(), 1);
        assert!(excerpts[0].contains("Trastevere"));

        let none = retriever.retrieve("pinguins antárticos").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_guide_retriever_empty_store() {
        let temp = TempDir::new().unwrap();
        let store = GuideStore::open(temp.path()).unwrap();
        let retriever = GuideRetriever::new(store, 3);
        assert!(retriever.retrieve("Roma").await.unwrap().is_empty());
    }
}
