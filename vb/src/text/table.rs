//! Markdown table extraction and fixed-width rendering

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Rows of an itinerary table; row 0 is the header.
///
/// Every row has exactly as many cells as the header: short rows are padded
/// with empty cells and long rows are truncated on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Vec<String>>", into = "Vec<Vec<String>>")]
pub struct ItineraryTable {
    rows: Vec<Vec<String>>,
}

impl ItineraryTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Rows after the header
    pub fn body(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.header().map(<[String]>::len).unwrap_or(0)
    }
}

impl From<Vec<Vec<String>>> for ItineraryTable {
    fn from(rows: Vec<Vec<String>>) -> Self {
        Self::new(rows)
    }
}

impl From<ItineraryTable> for Vec<Vec<String>> {
    fn from(table: ItineraryTable) -> Self {
        table.rows
    }
}

/// A line that looks like a table row: leading pipe and at least three pipes
fn is_table_line(line: &str) -> bool {
    line.starts_with('|') && line.matches('|').count() >= 3
}

/// A row made only of pipes, colons, hyphens and whitespace
fn is_separator(line: &str) -> bool {
    line.chars().all(|c| matches!(c, '|' | ':' | '-') || c.is_whitespace())
}

fn split_cells(line: &str) -> Vec<String> {
    let mut cells: Vec<String> = line.split('|').map(|c| c.trim().to_string()).collect();
    if cells.first().is_some_and(String::is_empty) {
        cells.remove(0);
    }
    if cells.last().is_some_and(String::is_empty) {
        cells.pop();
    }
    cells
}

/// Extract the first contiguous Markdown table with a header and at least one row.
///
/// Separator rows are dropped. Returns the empty table when no run of two or
/// more qualifying rows exists.
pub fn extract_table(text: &str) -> ItineraryTable {
    let mut run: Vec<Vec<String>> = Vec::new();

    for line in text.lines().map(str::trim) {
        if is_table_line(line) {
            if !is_separator(line) {
                run.push(split_cells(line));
            }
            continue;
        }
        if run.len() >= 2 {
            break;
        }
        run.clear();
    }

    if run.len() < 2 {
        debug!(rows = run.len(), "extract_table: no table found");
        return ItineraryTable::default();
    }

    debug!(rows = run.len(), "extract_table: table found");
    ItineraryTable::new(run)
}

/// Remove every table-looking line, leaving the surrounding prose
pub fn strip_table_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !is_table_line(line.trim()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Render a table as left-justified fixed-width columns with a rule under the header
pub fn format_table_monospace(table: &ItineraryTable) -> String {
    let width = table.width();
    if width == 0 {
        return String::new();
    }

    let mut widths = vec![0usize; width];
    for row in table.rows() {
        for (i, cell) in row.iter().take(width).enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let render_row = |row: &[String]| -> String {
        (0..width)
            .map(|i| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                format!("{:<w$}", cell, w = widths[i])
            })
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(table.rows().len() + 1);
    for (i, row) in table.rows().iter().enumerate() {
        lines.push(render_row(row));
        if i == 0 {
            lines.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITINERARY: &str = "Aqui está seu roteiro:

| DATA | DIA | LOCAL | ATIVIDADE |
|------|-----|-------|-----------|
| 10/07 | Quarta | Centro | Museu |
| 11/07 | Quinta | Belém | Torre |

## ORÇAMENTO DETALHADO
Cerca de R$ 5000.";

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_extract_discards_separator() {
        let table = extract_table(ITINERARY);
        assert_eq!(table.rows().len(), 3);
        assert_eq!(table.header().unwrap(), row(&["DATA", "DIA", "LOCAL", "ATIVIDADE"]).as_slice());
        assert_eq!(table.body().len(), 2);
        assert_eq!(table.body()[1], row(&["11/07", "Quinta", "Belém", "Torre"]));
    }

    #[test]
    fn test_extract_no_table() {
        assert!(extract_table("Sem tabela por aqui.\nApenas texto.").is_empty());
        assert!(extract_table("").is_empty());
    }

    #[test]
    fn test_extract_header_only_is_empty() {
        assert!(extract_table("| DATA | DIA | LOCAL |\n|---|---|---|\ntexto").is_empty());
    }

    #[test]
    fn test_extract_skips_short_runs() {
        let text = "| lone | row |\n\n| A | B |\n| 1 | 2 |";
        let table = extract_table(text);
        assert_eq!(table.header().unwrap(), row(&["A", "B"]).as_slice());
        assert_eq!(table.body().len(), 1);
    }

    #[test]
    fn test_extract_keeps_inner_empty_cells() {
        let table = extract_table("| A | B | C |\n| 1 |  | 3 |");
        assert_eq!(table.body()[0], row(&["1", "", "3"]));
    }

    #[test]
    fn test_ragged_rows_normalized() {
        let table = extract_table("| A | B | C |\n| 1 | 2 |\n| 1 | 2 | 3 | 4 |");
        assert_eq!(table.body()[0], row(&["1", "2", ""]));
        assert_eq!(table.body()[1], row(&["1", "2", "3"]));
    }

    #[test]
    fn test_strip_table_lines() {
        let description = strip_table_lines(ITINERARY);
        assert!(!description.contains('|'));
        assert!(description.starts_with("Aqui está seu roteiro:"));
        assert!(description.contains("ORÇAMENTO DETALHADO"));
    }

    #[test]
    fn test_format_monospace() {
        let table = ItineraryTable::new(vec![row(&["DATA", "LOCAL"]), row(&["10/07", "Belém"]), row(&["1", "X"])]);
        let out = format_table_monospace(&table);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "DATA  | LOCAL");
        assert_eq!(lines[1], "------+------");
        assert_eq!(lines[2], "10/07 | Belém");
        assert_eq!(lines[3], "1     | X");
    }

    #[test]
    fn test_format_monospace_empty() {
        assert_eq!(format_table_monospace(&ItineraryTable::default()), "");
    }

    #[test]
    fn test_serde_normalizes() {
        let table: ItineraryTable = serde_json::from_str(r#"[["A","B"],["1"]]"#).unwrap();
        assert_eq!(table.body()[0], row(&["1", ""]));
        assert_eq!(serde_json::to_string(&table).unwrap(), r#"[["A","B"],["1",""]]"#);
    }
}
