//! Itinerary documents
//!
//! PDF via lopdf and a `;`-delimited spreadsheet via csv. Both degrade to a
//! text-only layout when the itinerary has no table rows.

mod pdf;
mod sheet;

use thiserror::Error;
use tracing::debug;

use crate::text::ItineraryTable;

/// Errors from document rendering
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Spreadsheet,
}

impl DocumentFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Pdf => "roteiro_viagem.pdf",
            Self::Spreadsheet => "roteiro_viagem.csv",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Spreadsheet => "text/csv",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf => write!(f, "pdf"),
            Self::Spreadsheet => write!(f, "spreadsheet"),
        }
    }
}

/// Itinerary snapshot taken from the session when the export is requested
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderRequest {
    pub identity: String,
    pub destination: String,
    pub dates: String,
    pub budget: String,
    pub table: ItineraryTable,
    /// Itinerary text without the table lines
    pub description: String,
    /// Completion text as received
    pub itinerary: String,
}

/// Rendered file ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
}

/// Document rendering capability
pub trait Renderer: Send + Sync {
    fn render(&self, format: DocumentFormat, request: &RenderRequest) -> Result<Document, RenderError>;
}

/// Default renderer backed by lopdf and csv
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentRenderer;

impl Renderer for DocumentRenderer {
    fn render(&self, format: DocumentFormat, request: &RenderRequest) -> Result<Document, RenderError> {
        debug!(%format, identity = %request.identity, rows = request.table.body().len(), "DocumentRenderer::render: called");
        let bytes = match format {
            DocumentFormat::Pdf => pdf::render(request, chrono::Local::now())?,
            DocumentFormat::Spreadsheet => sheet::render(request)?,
        };
        Ok(Document {
            file_name: format.file_name().to_string(),
            mime_type: format.mime_type().to_string(),
            bytes,
            caption: Some(format!("Roteiro de Viagem: {}", request.destination)),
        })
    }
}
