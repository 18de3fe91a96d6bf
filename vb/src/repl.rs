//! Local chat REPL
//!
//! Talks to the engine through the console transport. Typing the number of a
//! menu option selects it; anything else is sent as text.

use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::bot::InboundEvent;
use crate::engine::Engine;
use crate::transport::ConsoleTransport;

/// Interactive chat session with the bot
pub struct ChatRepl {
    engine: Arc<Engine>,
    console: Arc<ConsoleTransport>,
    identity: String,
    name: Option<String>,
}

enum SlashResult {
    Continue,
    Quit,
    Forward,
}

impl ChatRepl {
    pub fn new(engine: Arc<Engine>, console: Arc<ConsoleTransport>, identity: String, name: Option<String>) -> Self {
        Self {
            engine,
            console,
            identity,
            name,
        }
    }

    /// Run until `/quit` or end of input
    pub async fn run(&self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", "você>".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    match self.handle_slash_command(input).await {
                        SlashResult::Continue => continue,
                        SlashResult::Quit => break,
                        SlashResult::Forward => {}
                    }

                    let event = self.event_for(input);
                    self.engine.handle_event(event, self.console.as_ref()).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Até a próxima! ✈️");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "VexusBot local chat".bright_cyan().bold());
        println!("Identity: {}", self.identity);
        println!("Documents are saved to {}", self.console.download_dir().display());
        println!(
            "Type {} to start, a number to pick a menu option, {} to quit",
            "oi".yellow(),
            "/quit".yellow()
        );
        println!();
    }

    /// REPL-only commands; bot commands such as `/reiniciar` are forwarded
    async fn handle_slash_command(&self, input: &str) -> SlashResult {
        match input {
            "/quit" | "/q" | "/exit" => SlashResult::Quit,
            "/session" => {
                match self.engine.sessions().load(&self.identity).await {
                    Ok(session) => {
                        println!("{} {}", "state:".dimmed(), session.state);
                        match serde_json::to_string_pretty(&session.data) {
                            Ok(data) => println!("{} {}", "data:".dimmed(), data),
                            Err(e) => println!("{} {}", "!".red(), e),
                        }
                    }
                    Err(e) => println!("{} {}", "!".red(), e),
                }
                SlashResult::Continue
            }
            _ => SlashResult::Forward,
        }
    }

    /// Numbers pick from the last menu shown
    fn event_for(&self, input: &str) -> InboundEvent {
        let event = match self.console.resolve_choice(input) {
            Some(option_id) => {
                debug!(%option_id, "event_for: menu choice");
                InboundEvent::selection(&self.identity, option_id)
            }
            None => InboundEvent::text(&self.identity, input),
        };
        match &self.name {
            Some(name) => event.with_display_name(name.clone()),
            None => event,
        }
    }
}
