//! CLI argument parsing for sessionstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ss")]
#[command(author, version, about = "Inspect and manage stored chat sessions", long_about = None)]
pub struct Cli {
    /// Store directory (default: local data dir)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List all stored sessions
    Sessions,

    /// Show one session with its decoded data
    Show {
        /// User identity (phone number or chat id)
        #[arg(required = true)]
        identity: String,
    },

    /// Delete a session, returning the user to the main menu
    Clear {
        /// User identity
        #[arg(required = true)]
        identity: String,
    },

    /// Show or update a traveller profile
    Profile {
        /// User identity
        #[arg(required = true)]
        identity: String,

        /// Set a field, e.g. --set name=Ana (repeatable)
        #[arg(long, value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },

    /// List travellers with generated itineraries
    Travellers,

    /// Show the itinerary history of a traveller
    Itineraries {
        /// User identity
        #[arg(required = true)]
        identity: String,

        /// Print each itinerary in full
        #[arg(short, long)]
        full: bool,
    },
}

/// Default store directory
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vexusbot")
}
