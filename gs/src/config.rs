//! Configuration for guidestore
//!
//! ```yaml
//! store-path: ~/.local/share/vexusbot/guides
//! ingest:
//!   chunk-size: 1000
//!   overlap: 150
//! search:
//!   top-k: 3
//! ```

use eyre::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{IngestOptions, SearchOptions};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Directory holding the guide files
    pub store_path: PathBuf,

    pub ingest: IngestSection,

    pub search: SearchSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct IngestSection {
    /// Chunk size in characters
    pub chunk_size: usize,

    /// Characters shared by adjacent chunks
    pub overlap: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SearchSection {
    /// Chunks returned per query
    pub top_k: usize,
}

pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vexusbot")
        .join("guides")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            ingest: IngestSection::default(),
            search: SearchSection::default(),
        }
    }
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            chunk_size: crate::DEFAULT_CHUNK_SIZE,
            overlap: crate::DEFAULT_OVERLAP,
        }
    }
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            top_k: crate::DEFAULT_TOP_K,
        }
    }
}

impl Config {
    /// Explicit path, then `./guidestore.yml`, then the user config dir, then defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::read(config_path);
        }

        let candidates = [
            Some(PathBuf::from("guidestore.yml")),
            dirs::config_dir().map(|p| p.join("vexusbot").join("guidestore.yml")),
        ];
        match candidates.into_iter().flatten().find(|p| p.exists()) {
            Some(found) => Self::read(&found),
            None => Ok(Self::default()),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read config {}", path.display()))?;
        serde_yaml::from_str(&content).context(format!("Failed to parse config {}", path.display()))
    }

    /// Ingest options, with command-line overrides applied
    pub fn ingest_options(&self, chunk_size: Option<usize>, overlap: Option<usize>) -> IngestOptions {
        IngestOptions {
            chunk_size: chunk_size.unwrap_or(self.ingest.chunk_size),
            overlap: overlap.unwrap_or(self.ingest.overlap),
        }
    }

    pub fn search_options(&self, max_results: Option<usize>) -> SearchOptions {
        SearchOptions {
            max_results: max_results.unwrap_or(self.search.top_k),
        }
    }
}
