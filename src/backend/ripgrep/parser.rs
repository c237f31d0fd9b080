//! Incremental parser for colourised ripgrep output.
//!
//! Chunks arrive with arbitrary boundaries, so the parser keeps the trailing
//! unterminated line and only emits records for complete lines. The colour
//! markers requested by the argument builder delimit the path, line number,
//! column and match spans; they are stripped from the emitted text.
//!
//! Parsing is total: markup that does not fit the expected shape is kept as
//! plain text and still produces a record.

use crate::config::ColorScheme;
use crate::types::MatchLocation;

const SEPARATORS: &[char] = &[':', '-'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Path,
    Line,
    Column,
    Match,
}

#[derive(Debug, Clone, Copy)]
struct CategoryCodes {
    path: u16,
    line: u16,
    column: u16,
    match_color: u16,
}

impl CategoryCodes {
    fn new(colors: &ColorScheme) -> Self {
        Self {
            path: colors.path.sgr_code().into(),
            line: colors.line.sgr_code().into(),
            column: colors.column.sgr_code().into(),
            match_color: colors.match_color.sgr_code().into(),
        }
    }

    fn category(&self, code: u16) -> Option<Category> {
        if code == self.path {
            Some(Category::Path)
        } else if code == self.line {
            Some(Category::Line)
        } else if code == self.column {
            Some(Category::Column)
        } else if code == self.match_color {
            Some(Category::Match)
        } else {
            None
        }
    }
}

/// A marked span of the visible text, as byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    category: Category,
    start: usize,
    end: usize,
}

/// Stateful parser fed with raw output chunks.
#[derive(Debug)]
pub struct ResultParser {
    codes: CategoryCodes,
    carry: Vec<u8>,
}

impl ResultParser {
    pub fn new(colors: &ColorScheme) -> Self {
        Self {
            codes: CategoryCodes::new(colors),
            carry: Vec::new(),
        }
    }

    /// Consume a chunk and return the records of every line it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<MatchLocation> {
        self.carry.extend_from_slice(chunk);

        let mut locations = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.carry[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            parse_line(&self.codes, &self.carry[start..end], &mut locations);
            start = end + 1;
        }
        self.carry.drain(..start);
        locations
    }

    /// Flush a final line that was never terminated.
    pub fn finish(&mut self) -> Vec<MatchLocation> {
        let mut locations = Vec::new();
        if !self.carry.is_empty() {
            let rest = std::mem::take(&mut self.carry);
            parse_line(&self.codes, &rest, &mut locations);
        }
        locations
    }

    /// Bytes of the pending partial line.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}

/// Parse a whole stream at once.
pub fn parse_all(colors: &ColorScheme, output: &[u8]) -> Vec<MatchLocation> {
    let mut parser = ResultParser::new(colors);
    let mut locations = parser.feed(output);
    locations.extend(parser.finish());
    locations
}

fn parse_line(codes: &CategoryCodes, bytes: &[u8], out: &mut Vec<MatchLocation>) {
    let decoded = String::from_utf8_lossy(bytes);
    let raw = decoded.strip_suffix('\r').unwrap_or(&decoded);
    if raw.is_empty() {
        return;
    }

    let (visible, spans) = strip_markers(codes, raw);
    // `--` separates context groups
    if visible.is_empty() || visible == "--" {
        return;
    }

    let path = match spans.first() {
        Some(span) if span.category == Category::Path && span.start == 0 => *span,
        _ => {
            out.push(MatchLocation::file(visible));
            return;
        }
    };
    let filename = visible[..path.end].to_string();

    let mut pos = path.end;
    let mut next = 1;
    let line = match take_number(&visible, &spans, &mut pos, &mut next, Category::Line) {
        Some(line) => line,
        None => {
            out.push(MatchLocation::file(filename));
            return;
        }
    };
    let column = take_number(&visible, &spans, &mut pos, &mut next, Category::Column);
    if visible[pos..].starts_with(SEPARATORS) {
        pos += 1;
    }
    let text = &visible[pos..];

    let mut found = false;
    for span in spans[next..]
        .iter()
        .filter(|s| s.category == Category::Match && s.start >= pos)
    {
        found = true;
        out.push(MatchLocation {
            filename: filename.clone(),
            line: Some(line),
            col: Some(span.start - pos),
            end_col: Some(span.end - pos),
            text: Some(text.to_string()),
        });
    }

    if !found {
        out.push(MatchLocation {
            filename,
            line: Some(line),
            col: column.map(|c| c.saturating_sub(1) as usize),
            end_col: None,
            text: Some(text.to_string()),
        });
    }
}

/// Consume `<sep><number>` where the number carries the `category` marker.
fn take_number(
    visible: &str,
    spans: &[Span],
    pos: &mut usize,
    next: &mut usize,
    category: Category,
) -> Option<u64> {
    if !visible[*pos..].starts_with(SEPARATORS) {
        return None;
    }
    let span = spans.get(*next)?;
    if span.category != category || span.start != *pos + 1 {
        return None;
    }
    let number = visible[span.start..span.end].parse().ok()?;
    *pos = span.end;
    *next += 1;
    Some(number)
}

/// Remove SGR sequences, recording where each category starts and ends in
/// the remaining text.
fn strip_markers(codes: &CategoryCodes, raw: &str) -> (String, Vec<Span>) {
    let mut visible = String::with_capacity(raw.len());
    let mut spans = Vec::new();
    let mut open: Option<(Category, usize)> = None;

    let mut rest = raw;
    while !rest.is_empty() {
        let Some(esc) = rest.find('\x1b') else {
            visible.push_str(rest);
            break;
        };
        visible.push_str(&rest[..esc]);
        rest = &rest[esc..];

        match sgr_params(rest) {
            Some((params, len)) => {
                apply_sgr(codes, params, visible.len(), &mut open, &mut spans);
                rest = &rest[len..];
            }
            None => {
                log::trace!("Unrecognised escape kept as text");
                visible.push('\x1b');
                rest = &rest[1..];
            }
        }
    }
    close_span(&mut open, visible.len(), &mut spans);
    (visible, spans)
}

/// If `s` starts with `ESC [ params m`, return the params and total length.
fn sgr_params(s: &str) -> Option<(&str, usize)> {
    let body = s.strip_prefix("\x1b[")?;
    let end = body.find(|c: char| !(c.is_ascii_digit() || c == ';'))?;
    if body[end..].starts_with('m') {
        Some((&body[..end], 2 + end + 1))
    } else {
        None
    }
}

fn apply_sgr(
    codes: &CategoryCodes,
    params: &str,
    at: usize,
    open: &mut Option<(Category, usize)>,
    spans: &mut Vec<Span>,
) {
    // An empty parameter list means reset
    let mut iter = params.split(';').map(|p| p.parse::<u16>().unwrap_or(0));
    while let Some(code) = iter.next() {
        match code {
            0 => close_span(open, at, spans),
            // Extended colours: 38;5;n or 38;2;r;g;b
            38 | 48 => match iter.next() {
                Some(5) => {
                    iter.next();
                }
                Some(2) => {
                    iter.nth(2);
                }
                _ => {}
            },
            _ => {
                if let Some(category) = codes.category(code) {
                    close_span(open, at, spans);
                    *open = Some((category, at));
                }
            }
        }
    }
}

fn close_span(open: &mut Option<(Category, usize)>, at: usize, spans: &mut Vec<Span>) {
    if let Some((category, start)) = open.take() {
        if at > start {
            spans.push(Span {
                category,
                start,
                end: at,
            });
        }
    }
}
