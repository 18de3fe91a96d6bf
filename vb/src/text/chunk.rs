//! Outbound chunking under per-platform message size limits

use tracing::debug;

/// Markup flavour of an outbound text, which decides what counts as a
/// preformatted block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RichFormat {
    #[default]
    Plain,
    /// `<pre>...</pre>`
    Html,
    /// Triple-backtick fences
    Markdown,
}

impl RichFormat {
    fn markers(&self) -> Option<(&'static str, &'static str)> {
        match self {
            RichFormat::Plain => None,
            RichFormat::Html => Some(("<pre>", "</pre>")),
            RichFormat::Markdown => Some(("```", "```")),
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split into pieces of at most `limit` characters.
///
/// HTML pieces never end inside an entity or a tag, and a cut that leaves
/// every tag of the piece closed wins over one that doesn't.
fn hard_split(text: &str, limit: usize, format: RichFormat) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if format != RichFormat::Html {
        return chars.chunks(limit).map(|c| c.iter().collect()).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + limit).min(chars.len());
        let cut = if end == chars.len() {
            end
        } else {
            html_cut(&chars, start, end)
        };
        pieces.push(chars[start..cut].iter().collect());
        start = cut;
    }
    pieces
}

/// Last position in `(start, end]` where an HTML piece may stop, or `end`
/// when the whole window is one entity or tag
fn html_cut(chars: &[char], start: usize, end: usize) -> usize {
    let mut in_entity = false;
    let mut in_tag = false;
    let mut closing = false;
    let mut depth = 0usize;
    let mut balanced = None;
    let mut outside = None;

    for i in start..end {
        let c = chars[i];
        if in_tag {
            if c == '>' {
                in_tag = false;
                let self_closing = i > 0 && chars[i - 1] == '/';
                if closing {
                    depth = depth.saturating_sub(1);
                } else if !self_closing {
                    depth += 1;
                }
            } else if c == '/' && i > 0 && chars[i - 1] == '<' {
                closing = true;
            }
        } else if in_entity && c == ';' {
            in_entity = false;
        } else if c == '<' {
            in_entity = false;
            in_tag = true;
            closing = false;
        } else if c == '&' {
            in_entity = true;
        } else if in_entity && !(c.is_alphanumeric() || c == '#') {
            in_entity = false;
        }

        if !in_entity && !in_tag {
            outside = Some(i + 1);
            if depth == 0 {
                balanced = Some(i + 1);
            }
        }
    }
    balanced.or(outside).unwrap_or(end)
}

/// Break plain text into units no longer than `limit`: paragraphs when they
/// fit, else lines, else fixed-size slices. Concatenating the units gives the
/// input back.
fn plain_units(text: &str, limit: usize, format: RichFormat, units: &mut Vec<String>) {
    for paragraph in text.split_inclusive("\n\n") {
        if char_len(paragraph) <= limit {
            units.push(paragraph.to_string());
            continue;
        }
        for line in paragraph.split_inclusive('\n') {
            if char_len(line) <= limit {
                units.push(line.to_string());
            } else {
                units.extend(hard_split(line, limit, format));
            }
        }
    }
}

/// Units for one preformatted block. A block that fits stays whole; a larger
/// block is cut on line boundaries and each piece is wrapped in its own markers.
fn block_units(
    open: &str,
    inner: &str,
    close: &str,
    limit: usize,
    format: RichFormat,
    units: &mut Vec<String>,
) {
    let whole = format!("{}{}{}", open, inner, close);
    if char_len(&whole) <= limit {
        units.push(whole);
        return;
    }

    // Markdown fences need the closing marker on its own line
    let needs_newline = close == "```";
    let overhead = char_len(open) + char_len(close) + usize::from(needs_newline);
    let room = limit.saturating_sub(overhead).max(1);

    let wrap = |body: &str| -> String {
        if needs_newline && !body.ends_with('\n') {
            format!("{}{}\n{}", open, body, close)
        } else {
            format!("{}{}{}", open, body, close)
        }
    };

    let mut current = String::new();
    for line in inner.split_inclusive('\n') {
        let pieces = if char_len(line) > room {
            hard_split(line, room, format)
        } else {
            vec![line.to_string()]
        };
        for piece in pieces {
            if !current.is_empty() && char_len(&current) + char_len(&piece) > room {
                units.push(wrap(&current));
                current.clear();
            }
            current.push_str(&piece);
        }
    }
    if !current.trim().is_empty() {
        units.push(wrap(&current));
    }
}

/// Split `text` for a transport that accepts at most `limit` characters per message.
///
/// Paragraph boundaries are preferred over line boundaries, and lines are only
/// cut mid-way when a single line exceeds `limit`. Preformatted blocks in the
/// given markup stay intact when they fit. Whitespace-only pieces are dropped.
pub fn split_for_transport(text: &str, limit: usize, format: RichFormat) -> Vec<String> {
    let limit = limit.max(1);
    if text.trim().is_empty() {
        return Vec::new();
    }
    if char_len(text) <= limit {
        return vec![text.to_string()];
    }
    debug!(len = char_len(text), limit, ?format, "split_for_transport: splitting");

    let mut units = Vec::new();
    let mut rest = text;

    if let Some((open, close)) = format.markers() {
        while let Some(start) = rest.find(open) {
            let after_open = &rest[start + open.len()..];
            // A Markdown fence owns the rest of its opening line (language tag)
            let open_len = if format == RichFormat::Markdown {
                open.len() + after_open.find('\n').map(|i| i + 1).unwrap_or(after_open.len())
            } else {
                open.len()
            };
            let body_start = start + open_len;
            let Some(close_rel) = rest[body_start..].find(close) else {
                break;
            };
            let body_end = body_start + close_rel;

            plain_units(&rest[..start], limit, format, &mut units);
            block_units(
                &rest[start..body_start],
                &rest[body_start..body_end],
                close,
                limit,
                format,
                &mut units,
            );
            rest = &rest[body_end + close.len()..];
        }
    }
    plain_units(rest, limit, format, &mut units);

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    for unit in units {
        let unit_len = char_len(&unit);
        if current_len + unit_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push_str(&unit);
        current_len += unit_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks.retain(|c| !c.trim().is_empty());
    debug!(chunk_count = chunks.len(), "split_for_transport: done");
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(split_for_transport("olá", 10, RichFormat::Plain), vec!["olá"]);
        assert_eq!(split_for_transport("exact", 5, RichFormat::Html), vec!["exact"]);
    }

    #[test]
    fn test_empty_and_blank() {
        assert!(split_for_transport("", 10, RichFormat::Plain).is_empty());
        assert!(split_for_transport("   \n\n  ", 3, RichFormat::Plain).is_empty());
    }

    #[test]
    fn test_prefers_paragraphs() {
        let text = "aaaa\n\nbbbb\n\ncccc";
        let chunks = split_for_transport(text, 12, RichFormat::Plain);
        assert_eq!(chunks, vec!["aaaa\n\nbbbb\n\n", "cccc"]);
    }

    #[test]
    fn test_falls_back_to_lines() {
        let text = "linha um\nlinha dois\nlinha três";
        let chunks = split_for_transport(text, 20, RichFormat::Plain);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
        assert_eq!(chunks[0], "linha um\nlinha dois\n");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_hard_split_long_line() {
        let limit = 10;
        let text = "x".repeat(3 * limit + 10);
        let chunks = split_for_transport(&text, limit, RichFormat::Plain);
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.chars().count() <= limit));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_multibyte_counts_chars() {
        let text = "ã".repeat(25);
        let chunks = split_for_transport(&text, 10, RichFormat::Plain);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_html_block_kept_atomic() {
        let text = "Intro\n<pre>a | b\n1 | 2</pre>\nfim";
        let chunks = split_for_transport(text, 24, RichFormat::Html);
        assert!(chunks.iter().any(|c| c.contains("<pre>a | b\n1 | 2</pre>")));
        assert!(chunks.iter().all(|c| c.chars().count() <= 24));
    }

    #[test]
    fn test_html_block_split_rewrapped() {
        let body: String = (0..10).map(|i| format!("linha {}\n", i)).collect();
        let text = format!("<pre>{}</pre>", body);
        let chunks = split_for_transport(&text, 40, RichFormat::Html);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 40, "{chunk:?}");
            assert_eq!(chunk.matches("<pre>").count(), chunk.matches("</pre>").count());
            assert!(chunk.starts_with("<pre>") && chunk.ends_with("</pre>"));
        }
        let joined: String = chunks
            .iter()
            .map(|c| c.trim_start_matches("<pre>").trim_end_matches("</pre>"))
            .collect();
        assert_eq!(joined, body);
    }

    #[test]
    fn test_markdown_fence_split_rewrapped() {
        let body: String = (0..8).map(|i| format!("dia {} | passeio\n", i)).collect();
        let text = format!("Roteiro:\n```\n{}```\nBoa viagem!", body);
        let chunks = split_for_transport(&text, 50, RichFormat::Markdown);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50, "{chunk:?}");
            assert_eq!(chunk.matches("```").count() % 2, 0, "{chunk:?}");
        }
        assert!(chunks.last().unwrap().contains("Boa viagem!"));
    }

    #[test]
    fn test_unclosed_block_treated_as_text() {
        let text = format!("<pre>{}", "y".repeat(30));
        let chunks = split_for_transport(&text, 10, RichFormat::Html);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_html_cut_skips_entities() {
        let text = "xxxxxxxx&amp;yyyyyyyyyy";
        let chunks = split_for_transport(text, 10, RichFormat::Html);
        assert_eq!(chunks, vec!["xxxxxxxx", "&amp;yyyyy", "yyyyy"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_html_cut_keeps_tags_whole() {
        let text = "abcdef<b>negrito</b>resto do texto";
        let chunks = split_for_transport(text, 10, RichFormat::Html);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10, "{chunk:?}");
            assert_eq!(chunk.matches('<').count(), chunk.matches('>').count(), "{chunk:?}");
        }
        assert_eq!(chunks[0], "abcdef");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_html_cut_prefers_closed_tags() {
        let text = "ab <i>cd</i> efghijklmnop";
        let chunks = split_for_transport(text, 14, RichFormat::Html);
        assert_eq!(chunks[0], "ab <i>cd</i> e");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_plain_cut_ignores_markup() {
        let text = "xxxxxxxx&amp;yyyyyyyyyy";
        let chunks = split_for_transport(text, 10, RichFormat::Plain);
        assert_eq!(chunks[0], "xxxxxxxx&a");
    }

    proptest! {
        #[test]
        fn html_pieces_never_split_entities(words in prop::collection::vec("[a-z]{1,6}|&amp;|&lt;|<b>[a-z]{1,4}</b>", 1..40), limit in 12usize..40) {
            let text = words.concat();
            let chunks = split_for_transport(&text, limit, RichFormat::Html);
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= limit);
                let last_amp = chunk.rfind('&');
                prop_assert!(last_amp.map_or(true, |i| chunk[i..].contains(';')), "{:?}", chunk);
                let last_lt = chunk.rfind('<');
                prop_assert!(last_lt.map_or(true, |i| chunk[i..].contains('>')), "{:?}", chunk);
            }
            prop_assert_eq!(chunks.concat(), text);
        }

        #[test]
        fn short_text_is_single_chunk(text in "[a-z]{1,50}", extra in 0usize..20) {
            let limit = text.chars().count() + extra;
            prop_assert_eq!(split_for_transport(&text, limit, RichFormat::Plain), vec![text.clone()]);
        }

        #[test]
        fn single_line_reconstructs(text in "[a-z]{1,8}( [a-z]{1,8}){0,80}", limit in 5usize..60) {
            let chunks = split_for_transport(&text, limit, RichFormat::Plain);
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= limit);
            }
            prop_assert_eq!(chunks.concat(), text);
        }

        #[test]
        fn multiline_chunks_fit(text in "[a-z]{1,8}([ \n]{1,2}[a-z]{1,8}){0,80}", limit in 5usize..60) {
            let chunks = split_for_transport(&text, limit, RichFormat::Markdown);
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= limit);
                prop_assert!(!chunk.trim().is_empty());
            }
            let squeezed: String = text.split_whitespace().collect();
            let rejoined: String = chunks.concat().split_whitespace().collect();
            prop_assert_eq!(rejoined, squeezed);
        }
    }
}
