//! Terminal transport for the local chat REPL

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use colored::Colorize;
use tracing::debug;

use super::{Outbound, Transport, TransportError};
use crate::bot::Menu;
use crate::text::RichFormat;

const CONSOLE_LIMIT: usize = 4096;

/// Prints replies to a writer and saves documents to a directory
///
/// The options of the last menu shown are numbered so the REPL can turn a
/// typed number back into a selection.
pub struct ConsoleTransport {
    out: Mutex<Box<dyn Write + Send>>,
    download_dir: PathBuf,
    last_menu: Mutex<Vec<String>>,
}

impl ConsoleTransport {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self::with_writer(download_dir, Box::new(std::io::stdout()))
    }

    pub fn with_writer(download_dir: impl Into<PathBuf>, out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            download_dir: download_dir.into(),
            last_menu: Mutex::new(Vec::new()),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Option id for a 1-based number typed by the user
    pub fn resolve_choice(&self, input: &str) -> Option<String> {
        let index: usize = input.trim().parse().ok()?;
        let ids = self.last_menu.lock().ok()?;
        index.checked_sub(1).and_then(|i| ids.get(i)).cloned()
    }

    fn write(&self, text: &str) -> Result<(), TransportError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| TransportError::InvalidResponse("console writer poisoned".to_string()))?;
        writeln!(out, "{text}")?;
        out.flush()?;
        Ok(())
    }

    fn show_menu(&self, menu: Menu) -> Result<(), TransportError> {
        let mut lines = vec![menu.body.clone()];
        for (i, option) in menu.options.iter().enumerate() {
            let mut line = format!("  [{}] {}", i + 1, option.title);
            if let Some(description) = &option.description {
                line.push_str(&format!(" - {}", description.dimmed()));
            }
            lines.push(line);
        }
        if let Ok(mut ids) = self.last_menu.lock() {
            *ids = menu.options.into_iter().map(|o| o.id).collect();
        }
        self.write(&lines.join("\n"))
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn name(&self) -> &'static str {
        "console"
    }

    fn text_limit(&self) -> usize {
        CONSOLE_LIMIT
    }

    fn rich_format(&self) -> RichFormat {
        RichFormat::Markdown
    }

    async fn send(&self, recipient: &str, message: Outbound) -> Result<(), TransportError> {
        debug!(%recipient, "ConsoleTransport::send: called");
        match message {
            Outbound::Text { body, .. } => self.write(&format!("{} {}", "bot>".cyan().bold(), body)),
            Outbound::Menu(menu) => self.show_menu(menu),
            Outbound::Document(document) => {
                std::fs::create_dir_all(&self.download_dir)?;
                let path = self.download_dir.join(&document.file_name);
                std::fs::write(&path, &document.bytes)?;
                self.write(&format!("{} {}", "📎 saved".green(), path.display()))
            }
        }
    }
}
