//! CLI argument parsing for guidestore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gs")]
#[command(author, version, about = "Travel-guide corpus for question answering", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest guide files into a new guide
    Ingest {
        /// File paths or glob patterns to ingest
        #[arg(required = true)]
        paths: Vec<String>,

        /// Chunk size in characters (default: 1000)
        #[arg(short = 's', long)]
        chunk_size: Option<usize>,

        /// Overlap between chunks in characters (default: 150)
        #[arg(short, long)]
        overlap: Option<usize>,
    },

    /// Rank guide chunks against a question
    Search {
        /// Free-text query
        #[arg(required = true)]
        query: String,

        /// Maximum chunks to return
        #[arg(short, long)]
        max_results: Option<usize>,
    },

    /// Display a chunk's content
    Cat {
        /// Chunk reference: guide_id/chunk_num
        #[arg(required = true)]
        chunk: String,
    },

    /// List all guides with their statistics
    List,

    /// Delete a guide
    Delete {
        /// Guide ID to delete
        #[arg(required = true)]
        guide_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ingest() {
        let cli = Cli::try_parse_from(["gs", "ingest", "guias/*.txt", "extra.md", "-s", "800"]).unwrap();
        match cli.command {
            Command::Ingest {
                paths,
                chunk_size,
                overlap,
            } => {
                assert_eq!(paths, vec!["guias/*.txt", "extra.md"]);
                assert_eq!(chunk_size, Some(800));
                assert_eq!(overlap, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from(["gs", "search", "melhor época Lisboa", "-m", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Search { ref query, max_results: Some(5) } if query == "melhor época Lisboa"
        ));
    }
}
