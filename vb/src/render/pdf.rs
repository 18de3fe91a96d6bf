//! Paginated A4 PDF in Courier
//!
//! Text is laid out as fixed-width lines so the monospace table keeps its
//! columns. Characters outside Latin-1 (emoji) are replaced with `?`.

use chrono::{DateTime, TimeZone};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};
use tracing::debug;

use super::{RenderError, RenderRequest};
use crate::text::format_table_monospace;

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 40;
const FONT_SIZE: i64 = 9;
const TITLE_SIZE: i64 = 14;
const LEADING: i64 = 12;
/// Courier glyphs are 0.6em wide
const LINE_CHARS: usize = ((PAGE_WIDTH - 2 * MARGIN) * 10 / (FONT_SIZE * 6)) as usize;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

fn pdf_err(e: impl std::fmt::Display) -> RenderError {
    RenderError::Pdf(e.to_string())
}

/// Encode for WinAnsiEncoding
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| *c != '\u{fe0f}')
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Wrap at word boundaries, hard-splitting words longer than `width`
fn wrap(line: &str, width: usize) -> Vec<String> {
    if line.chars().count() <= width {
        return vec![line.to_string()];
    }

    let mut out = Vec::new();
    let mut current = String::new();
    for word in line.split(' ') {
        let mut word: Vec<char> = word.chars().collect();
        loop {
            let used = current.chars().count();
            let sep = usize::from(used > 0);
            if used + sep + word.len() <= width {
                if sep == 1 {
                    current.push(' ');
                }
                current.extend(word.iter());
                break;
            }
            if used > 0 {
                out.push(std::mem::take(&mut current));
                continue;
            }
            let rest = word.split_off(width);
            out.push(word.iter().collect());
            word = rest;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Body lines in reading order
fn body_lines<Tz: TimeZone>(request: &RenderRequest, generated_at: DateTime<Tz>) -> Vec<String>
where
    Tz::Offset: std::fmt::Display,
{
    let mut lines = vec![
        format!("Período: {}", request.dates),
        format!("Orçamento: {}", request.budget),
        format!("Gerado em: {}", generated_at.format("%d/%m/%Y %H:%M")),
        String::new(),
    ];

    if !request.table.body().is_empty() {
        lines.push("ITINERÁRIO".to_string());
        lines.push(String::new());
        lines.extend(format_table_monospace(&request.table).lines().map(String::from));
        lines.push(String::new());
    }

    let description = if request.description.trim().is_empty() {
        &request.itinerary
    } else {
        &request.description
    };
    if !description.trim().is_empty() {
        lines.push("DETALHES E DICAS".to_string());
        lines.push(String::new());
        lines.extend(description.replace("**", "").replace('*', "").lines().map(String::from));
    }

    lines.iter().flat_map(|l| wrap(l.trim_end(), LINE_CHARS)).collect()
}

fn text_op(text: &str) -> Operation {
    Operation::new("Tj", vec![Object::String(latin1(text), StringFormat::Literal)])
}

fn page_content(title: Option<&str>, lines: &[String]) -> Content {
    let mut operations = vec![Operation::new("BT", vec![])];
    let mut y = PAGE_HEIGHT - MARGIN;

    if let Some(title) = title {
        operations.push(Operation::new("Tf", vec!["F1".into(), TITLE_SIZE.into()]));
        operations.push(Operation::new("Td", vec![MARGIN.into(), y.into()]));
        operations.push(text_op(title));
        operations.push(Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]));
        operations.push(Operation::new("Td", vec![0.into(), (-2 * LEADING).into()]));
        y -= 2 * LEADING;
    } else {
        operations.push(Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]));
        operations.push(Operation::new("Td", vec![MARGIN.into(), y.into()]));
    }
    debug!(start_y = y, lines = lines.len(), "page_content: laying out");

    for line in lines {
        operations.push(text_op(line));
        operations.push(Operation::new("Td", vec![0.into(), (-LEADING).into()]));
    }
    operations.push(Operation::new("ET", vec![]));
    Content { operations }
}

/// Render the itinerary as PDF bytes
pub fn render<Tz: TimeZone>(request: &RenderRequest, generated_at: DateTime<Tz>) -> Result<Vec<u8>, RenderError>
where
    Tz::Offset: std::fmt::Display,
{
    debug!(destination = %request.destination, "pdf::render: called");
    let title = format!("Roteiro de Viagem: {}", request.destination);
    let lines = body_lines(request, generated_at);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    // The title takes two lines on the first page
    let first_page = LINES_PER_PAGE - 2;
    let mut chunks: Vec<&[String]> = vec![&lines[..first_page.min(lines.len())]];
    if lines.len() > first_page {
        chunks.extend(lines[first_page..].chunks(LINES_PER_PAGE));
    }

    let mut kids: Vec<Object> = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        let page_title = (index == 0).then_some(title.as_str());
        let content = page_content(page_title, chunk).encode().map_err(pdf_err)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(pdf_err)?;
    debug!(pages = count, size = bytes.len(), "pdf::render: done");
    Ok(bytes)
}
