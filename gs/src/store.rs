//! Core GuideStore implementation

use eyre::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Unique identifier for an ingested guide
pub type GuideId = String;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid word regex"));

/// Short function words that would match nearly every chunk
const STOPWORDS: &[&str] = &[
    "que", "para", "com", "uma", "por", "dos", "das", "nos", "nas", "como", "mais", "qual", "quais", "onde", "the",
    "and", "for",
];

/// Metadata for a single chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Chunk number within the guide, zero padded
    pub chunk_id: String,
    /// Source file path
    pub source: String,
    /// Character offset in source file
    pub char_start: u64,
    /// Character end in source file
    pub char_end: u64,
    /// Content hash for staleness detection
    pub content_hash: String,
    /// Creation timestamp (unix ms)
    pub created_at: i64,
}

/// Options for ingesting content
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Size of each chunk in characters
    pub chunk_size: usize,
    /// Overlap between adjacent chunks
    pub overlap: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_size: crate::DEFAULT_CHUNK_SIZE,
            overlap: crate::DEFAULT_OVERLAP,
        }
    }
}

/// Options for searching
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of chunks returned
    pub max_results: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: crate::DEFAULT_TOP_K,
        }
    }
}

/// A ranked chunk
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub guide_id: GuideId,
    pub chunk_id: String,
    pub source: String,
    /// Distinct query terms found in the chunk
    pub matched_terms: usize,
    /// Total occurrences of query terms
    pub occurrences: usize,
    pub text: String,
}

/// Statistics for a guide
#[derive(Debug, Clone)]
pub struct GuideStats {
    pub chunk_count: usize,
    pub total_chars: u64,
    pub source_count: usize,
}

/// Split text into overlapping chunks of at most `chunk_size` characters.
///
/// Returns `(char_start, char_end, text)` triples. Offsets are in characters so
/// multi-byte text never splits inside a code point.
pub fn split_chunks(text: &str, chunk_size: usize, overlap: usize) -> Vec<(usize, usize, String)> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || chunk_size == 0 {
        return Vec::new();
    }
    let step = if overlap < chunk_size { chunk_size - overlap } else { chunk_size };

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + chunk_size).min(chars.len());
        chunks.push((start, end, chars[start..end].iter().collect()));
        if end >= chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Lower-cased search terms of at least three characters, stopwords removed
fn terms(text: &str) -> BTreeSet<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| t.chars().count() >= 3 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// The guide store
pub struct GuideStore {
    base_path: PathBuf,
}

impl GuideStore {
    /// Open or create a guide store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        debug!(?base_path, "Opened guide store");
        Ok(Self { base_path })
    }

    pub fn path(&self) -> &Path {
        &self.base_path
    }

    /// Ingest files matching the given patterns into a new guide
    pub fn ingest(&self, patterns: &[String], options: IngestOptions) -> Result<GuideId> {
        let guide_id = Uuid::now_v7().to_string();
        let guide_path = self.base_path.join(&guide_id);
        let chunks_path = guide_path.join("chunks");
        fs::create_dir_all(&chunks_path)?;

        let index_path = guide_path.join("index.jsonl");
        let mut index_file = fs::File::create(&index_path)?;

        let mut chunk_num = 0u32;

        for pattern in patterns {
            let paths = glob::glob(pattern).context(format!("Invalid glob pattern: {}", pattern))?;

            for entry in paths {
                let path = entry?;
                if path.is_file() {
                    chunk_num = self.ingest_file(&path, &chunks_path, &mut index_file, chunk_num, &options)?;
                }
            }
        }

        info!(guide_id, chunk_count = chunk_num, "Ingestion complete");
        Ok(guide_id)
    }

    fn ingest_file(
        &self,
        path: &Path,
        chunks_path: &Path,
        index_file: &mut fs::File,
        mut chunk_num: u32,
        options: &IngestOptions,
    ) -> Result<u32> {
        debug!(path = %path.display(), "ingest_file: called");
        let content = fs::read_to_string(path).context(format!("Failed to read file: {}", path.display()))?;
        let source = path.to_string_lossy().to_string();

        for (start, end, text) in split_chunks(&content, options.chunk_size, options.overlap) {
            chunk_num += 1;
            let chunk_id = format!("{:04}", chunk_num);
            fs::write(chunks_path.join(format!("{}.txt", chunk_id)), &text)?;

            let meta = ChunkMeta {
                chunk_id,
                source: source.clone(),
                char_start: start as u64,
                char_end: end as u64,
                content_hash: format!("{:x}", content_hash(text.as_bytes())),
                created_at: chrono::Utc::now().timestamp_millis(),
            };
            writeln!(index_file, "{}", serde_json::to_string(&meta)?)?;
        }

        Ok(chunk_num)
    }

    fn read_index(&self, guide_id: &str) -> Result<Vec<ChunkMeta>> {
        let index_path = self.base_path.join(guide_id).join("index.jsonl");
        let file = fs::File::open(&index_path).context(format!("Guide not found: {}", guide_id))?;
        let mut metas = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            metas.push(serde_json::from_str(&line)?);
        }
        Ok(metas)
    }

    /// Rank chunks across every guide by overlap with the query terms
    pub fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<SearchHit>> {
        let query_terms = terms(query);
        debug!(?query_terms, "search: called");
        if query_terms.is_empty() || options.max_results == 0 {
            return Ok(Vec::new());
        }

        let mut hits = Vec::new();
        for guide_id in self.list_guides()? {
            let chunks_path = self.base_path.join(&guide_id).join("chunks");
            for meta in self.read_index(&guide_id)? {
                let text = fs::read_to_string(chunks_path.join(format!("{}.txt", meta.chunk_id)))?;
                let words: Vec<String> = WORD_RE.find_iter(&text).map(|m| m.as_str().to_lowercase()).collect();

                let matched: HashSet<&String> = words.iter().filter(|w| query_terms.contains(*w)).collect();
                if matched.is_empty() {
                    continue;
                }
                let occurrences = words.iter().filter(|w| query_terms.contains(*w)).count();

                hits.push(SearchHit {
                    guide_id: guide_id.clone(),
                    chunk_id: meta.chunk_id,
                    source: meta.source,
                    matched_terms: matched.len(),
                    occurrences,
                    text,
                });
            }
        }

        hits.sort_by(|a, b| {
            b.matched_terms
                .cmp(&a.matched_terms)
                .then(b.occurrences.cmp(&a.occurrences))
                .then(a.guide_id.cmp(&b.guide_id))
                .then(a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(options.max_results);
        debug!(hit_count = hits.len(), "search: ranked");
        Ok(hits)
    }

    /// Get the full content of a chunk, addressed as `guide_id/chunk_num`
    pub fn get_chunk(&self, chunk_ref: &str) -> Result<String> {
        let (guide_id, chunk_num) = chunk_ref
            .split_once('/')
            .ok_or_else(|| eyre::eyre!("Chunk reference must be guide_id/chunk_num"))?;

        let chunk_path = self
            .base_path
            .join(guide_id)
            .join("chunks")
            .join(format!("{}.txt", chunk_num));

        fs::read_to_string(&chunk_path).context(format!("Chunk not found: {}", chunk_ref))
    }

    /// Get statistics for a guide
    pub fn stats(&self, guide_id: &str) -> Result<GuideStats> {
        let metas = self.read_index(guide_id)?;
        let sources: HashSet<&str> = metas.iter().map(|m| m.source.as_str()).collect();
        Ok(GuideStats {
            chunk_count: metas.len(),
            total_chars: metas.iter().map(|m| m.char_end - m.char_start).sum(),
            source_count: sources.len(),
        })
    }

    /// List all guide IDs, oldest first
    pub fn list_guides(&self) -> Result<Vec<GuideId>> {
        let mut guides = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            if entry.path().is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                guides.push(name.to_string());
            }
        }

        guides.sort();
        Ok(guides)
    }

    /// True when at least one guide has been ingested
    pub fn is_loaded(&self) -> bool {
        self.list_guides().map(|g| !g.is_empty()).unwrap_or(false)
    }

    /// Delete a guide and all its data
    pub fn delete(&self, guide_id: &str) -> Result<()> {
        let guide_path = self.base_path.join(guide_id);
        if guide_path.exists() {
            fs::remove_dir_all(&guide_path)?;
            info!(guide_id, "Deleted guide");
        }
        Ok(())
    }
}

/// Simple hash for content (not cryptographic, just for change detection)
fn content_hash(data: &[u8]) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn store_with(temp: &TempDir, files: &[(&str, &str)]) -> (GuideStore, GuideId) {
        let store = GuideStore::open(temp.path().join("store")).unwrap();
        for (name, content) in files {
            fs::write(temp.path().join(name), content).unwrap();
        }
        let pattern = temp.path().join("*.txt").to_string_lossy().to_string();
        let id = store.ingest(&[pattern], IngestOptions::default()).unwrap();
        (store, id)
    }

    #[test]
    fn test_split_chunks_overlap() {
        let text: String = "abcdefghij".into();
        let chunks = split_chunks(&text, 4, 1);
        let texts: Vec<&str> = chunks.iter().map(|c| c.2.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
        assert_eq!(chunks[1].0, 3);
    }

    #[test]
    fn test_split_chunks_multibyte() {
        let text = "ãçé".repeat(5);
        let chunks = split_chunks(&text, 4, 2);
        assert!(chunks.iter().all(|c| c.2.chars().count() <= 4));
        assert_eq!(chunks.last().unwrap().1, 15);
    }

    #[test]
    fn test_split_chunks_empty() {
        assert!(split_chunks("", 10, 2).is_empty());
    }

    #[test]
    fn test_search_ranks_by_matched_terms() {
        let temp = TempDir::new().unwrap();
        let (store, _) = store_with(
            &temp,
            &[
                ("a.txt", "Lisboa tem ótimos museus e miradouros."),
                ("b.txt", "Em Lisboa, prove o pastel de nata."),
            ],
        );

        let hits = store.search("Quais museus visitar em Lisboa?", SearchOptions::default()).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].text.contains("museus"));
        assert_eq!(hits[0].matched_terms, 2);
    }

    #[test]
    fn test_search_no_match() {
        let temp = TempDir::new().unwrap();
        let (store, _) = store_with(&temp, &[("a.txt", "Praias do nordeste.")]);
        assert!(store.search("vulcões islandeses", SearchOptions::default()).unwrap().is_empty());
        assert!(store.search("de o a", SearchOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_stats_and_get_chunk() {
        let temp = TempDir::new().unwrap();
        let (store, id) = store_with(&temp, &[("a.txt", "Roma antiga.")]);

        let stats = store.stats(&id).unwrap();
        assert_eq!(stats.chunk_count, 1);
        assert_eq!(stats.source_count, 1);
        assert_eq!(stats.total_chars, 12);
        assert_eq!(store.get_chunk(&format!("{}/0001", id)).unwrap(), "Roma antiga.");
        assert!(store.get_chunk("0001").is_err());
    }

    #[test]
    fn test_list_and_delete() {
        let temp = TempDir::new().unwrap();
        let (store, id) = store_with(&temp, &[("a.txt", "conteúdo")]);

        assert!(store.list_guides().unwrap().contains(&id));
        assert!(store.is_loaded());

        store.delete(&id).unwrap();
        assert!(!store.list_guides().unwrap().contains(&id));
        assert!(!store.is_loaded());
    }

    proptest! {
        #[test]
        fn chunks_cover_text(text in "[a-zçã ]{0,200}", size in 1usize..50, overlap in 0usize..60) {
            let chunks = split_chunks(&text, size, overlap);
            let total = text.chars().count();
            if total == 0 {
                prop_assert!(chunks.is_empty());
            } else {
                prop_assert_eq!(chunks[0].0, 0);
                prop_assert_eq!(chunks.last().unwrap().1, total);
                for window in chunks.windows(2) {
                    prop_assert!(window[1].0 <= window[0].1);
                }
            }
        }
    }
}
