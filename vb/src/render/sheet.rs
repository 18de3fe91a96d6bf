//! `;`-delimited spreadsheet export

use tracing::debug;

use super::{RenderError, RenderRequest};

/// Table rows with a 1-based index column under an empty header cell
///
/// Without table rows the output is a `Campo;Valor` summary followed by the
/// itinerary text, one line per row.
pub fn render(request: &RenderRequest) -> Result<Vec<u8>, RenderError> {
    debug!(rows = request.table.body().len(), "sheet::render: called");
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(Vec::new());

    match request.table.header() {
        Some(header) if !request.table.body().is_empty() => {
            writer.write_record(std::iter::once("").chain(header.iter().map(String::as_str)))?;
            for (index, row) in request.table.body().iter().enumerate() {
                let index = (index + 1).to_string();
                writer.write_record(std::iter::once(index.as_str()).chain(row.iter().map(String::as_str)))?;
            }
        }
        _ => {
            debug!("sheet::render: no table rows, writing summary");
            let or_na = |s: &str| if s.trim().is_empty() { "N/A".to_string() } else { s.to_string() };
            writer.write_record(["Campo", "Valor"])?;
            writer.write_record(["Destino", or_na(&request.destination).as_str()])?;
            writer.write_record(["Período", or_na(&request.dates).as_str()])?;
            writer.write_record(["Orçamento", or_na(&request.budget).as_str()])?;
            writer.write_record(["Status", "Roteiro Gerado"])?;
            for line in request.itinerary.lines().filter(|l| !l.trim().is_empty()) {
                writer.write_record(["Roteiro", line])?;
            }
        }
    }

    writer.into_inner().map_err(|e| RenderError::Io(e.into_error()))
}
