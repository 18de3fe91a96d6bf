//! GuideStore - the travel-guide corpus behind question answering
//!
//! Guide documents are split into overlapping character chunks and stored on
//! disk. Queries are answered by ranking chunks on keyword overlap.
//!
//! # Architecture
//!
//! ```text
//! guides/
//! └── {guide_id}/
//!     ├── index.jsonl      # chunk metadata
//!     └── chunks/
//!         ├── 0001.txt
//!         ├── 0002.txt
//!         └── ...
//! ```
//!
//! # Example
//!
//! ```ignore
//! use guidestore::{GuideStore, IngestOptions, SearchOptions};
//!
//! let store = GuideStore::open("guides")?;
//! store.ingest(&["docs/*.txt".to_string()], IngestOptions::default())?;
//! let hits = store.search("museus em lisboa", SearchOptions::default())?;
//! ```

pub mod cli;
pub mod config;
mod store;

pub use store::{ChunkMeta, GuideId, GuideStats, GuideStore, IngestOptions, SearchHit, SearchOptions, split_chunks};

/// Default chunk size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between chunks in characters
pub const DEFAULT_OVERLAP: usize = 150;

/// Default number of chunks returned by a search
pub const DEFAULT_TOP_K: usize = 3;
