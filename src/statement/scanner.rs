//! Quoted-span scanning for SQL text
//!
//! A span opens at a `'` or `"` that is not preceded by a backslash and closes at
//! the next occurrence of the same character. There is no doubling or escape
//! handling inside a span. Spans are a lexical aid for statement splitting only.

use crate::{Error, Result};

/// A quoted substring `[start, end)` of the scanned text (byte offsets, quotes included)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotedSpan {
    /// Byte offset of the opening quote
    pub start: usize,
    /// Byte offset one past the closing quote
    pub end: usize,
    /// Quote character delimiting the span
    pub quote: char,
}

impl QuotedSpan {
    /// Slice the span out of the text it was scanned from
    pub fn as_str<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// Whether the byte offset falls inside this span
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Find every quoted span in `text`, left to right
///
/// # Errors
///
/// Returns `Error::MalformedInput` when a quote opens but never closes.
///
/// # Examples
///
/// ```
/// use ysql_creds::statement::scan_quoted;
///
/// let text = r#""Five" little 'monkeys'"#;
/// let spans: Vec<_> = scan_quoted(text)?
///     .iter()
///     .map(|s| s.as_str(text))
///     .collect();
/// assert_eq!(spans, vec![r#""Five""#, "'monkeys'"]);
/// # Ok::<(), ysql_creds::Error>(())
/// ```
pub fn scan_quoted(text: &str) -> Result<Vec<QuotedSpan>> {
    let mut spans = Vec::new();
    let mut chars = text.char_indices();
    let mut prev = None;

    while let Some((start, c)) = chars.next() {
        if !is_quote(c) || prev == Some('\\') {
            prev = Some(c);
            continue;
        }

        let end = chars
            .by_ref()
            .find(|&(_, next)| next == c)
            .map(|(pos, close)| pos + close.len_utf8())
            .ok_or_else(|| {
                Error::MalformedInput(format!(
                    "unterminated {} quote starting at byte {}",
                    c, start
                ))
            })?;

        spans.push(QuotedSpan {
            start,
            end,
            quote: c,
        });
        prev = Some(c);
    }

    Ok(spans)
}

/// Remove every quoted span from `text`
pub fn strip_quoted(text: &str) -> Result<String> {
    let spans = scan_quoted(text)?;
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in &spans {
        out.push_str(&text[cursor..span.start]);
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

/// Split on `;` outside quoted spans, trimming units and dropping empty ones
pub fn split_outside_quotes(text: &str) -> Result<Vec<&str>> {
    let spans = scan_quoted(text)?;
    let mut units = Vec::new();
    let mut spans = spans.iter().peekable();
    let mut unit_start = 0;

    for (pos, c) in text.char_indices() {
        while spans.peek().is_some_and(|s| s.end <= pos) {
            spans.next();
        }
        if c != ';' || spans.peek().is_some_and(|s| s.contains(pos)) {
            continue;
        }
        push_unit(&mut units, &text[unit_start..pos]);
        unit_start = pos + 1;
    }
    push_unit(&mut units, &text[unit_start..]);

    Ok(units)
}

fn push_unit<'a>(units: &mut Vec<&'a str>, raw: &'a str) {
    let unit = raw.trim();
    if !unit.is_empty() {
        units.push(unit);
    }
}

fn is_quote(c: char) -> bool {
    c == '\'' || c == '"'
}
