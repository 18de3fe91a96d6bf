//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// VexusBot - conversational travel planner
#[derive(Parser)]
#[command(
    name = "vb",
    about = "Conversational travel-planning assistant for WhatsApp and Telegram",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the webhook server
    Serve {
        /// Listen address, overrides the config
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Chat with the bot in the terminal
    Chat {
        /// Conversation identity
        #[arg(short, long, default_value = "local")]
        identity: String,

        /// Display name reported with every message
        #[arg(short, long)]
        name: Option<String>,

        /// Where exported documents are written
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Clear the session of an identity
    Reset {
        identity: String,
    },

    /// Show the stored profile of an identity
    Profile {
        identity: String,
    },

    /// Show configuration, guide and session status
    Status,
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
    fn test_parse_chat() {
        let cli = Cli::try_parse_from(["vb", "chat", "--identity", "5511999", "--name", "Ana"]).unwrap();
        match cli.command {
            Some(Command::Chat { identity, name, output }) => {
                assert_eq!(identity, "5511999");
                assert_eq!(name.as_deref(), Some("Ana"));
                assert_eq!(output, PathBuf::from("."));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from(["vb", "serve", "-l", "debug", "-c", "bot.yml", "--bind", "127.0.0.1:8080"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("bot.yml")));
        assert!(matches!(cli.command, Some(Command::Serve { bind: Some(ref b) }) if b == "127.0.0.1:8080"));
    }
}
