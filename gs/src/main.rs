use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use guidestore::cli::{Cli, Command};
use guidestore::config::Config;
use guidestore::GuideStore;

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let store = GuideStore::open(&config.store_path)?;

    info!("guidestore opened at {}", store.path().display());

    match cli.command {
        Command::Ingest {
            paths,
            chunk_size,
            overlap,
        } => {
            let guide_id = store.ingest(&paths, config.ingest_options(chunk_size, overlap))?;
            let stats = store.stats(&guide_id)?;
            println!(
                "{} Ingested {} chunks from {} files to guide: {}",
                "✓".green(),
                stats.chunk_count,
                stats.source_count,
                guide_id.cyan()
            );
        }
        Command::Search { query, max_results } => {
            let hits = store.search(&query, config.search_options(max_results))?;
            if hits.is_empty() {
                println!("{}", "No matching chunks".dimmed());
            }
            for hit in hits {
                let preview: String = hit.text.chars().take(120).collect();
                println!(
                    "{}/{} {} {}",
                    hit.guide_id.yellow(),
                    hit.chunk_id.yellow(),
                    format!("[{}:{}]", hit.matched_terms, hit.occurrences).dimmed(),
                    preview.replace('\n', " ")
                );
            }
        }
        Command::Cat { chunk } => {
            let content = store.get_chunk(&chunk)?;
            println!("{}", content);
        }
        Command::List => {
            for guide_id in store.list_guides()? {
                let stats = store.stats(&guide_id)?;
                println!(
                    "{} {} chunks, {} chars, {} sources",
                    guide_id.cyan(),
                    stats.chunk_count,
                    stats.total_chars,
                    stats.source_count
                );
            }
        }
        Command::Delete { guide_id } => {
            store.delete(&guide_id)?;
            println!("{} Deleted guide: {}", "✓".green(), guide_id);
        }
    }

    Ok(())
}
