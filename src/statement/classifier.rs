//! Multi-statement classification
//!
//! Decides whether a statement template must be sent as a single execution unit
//! instead of being split on semicolons. Procedural bodies (`DO $$ ... $$`,
//! `BEGIN ... END`) legitimately contain semicolons that naive splitting would
//! break apart.
//!
//! Quoted spans are removed before looking for block markers, so a marker that
//! only appears inside a string literal or quoted identifier never counts.

use super::scanner::strip_quoted;

/// A recognized block delimiter pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockDelimiter {
    /// Keyword pair matched as whole words, case-insensitively (e.g. `BEGIN` / `END`)
    Keywords {
        /// Opening keyword
        start: String,
        /// Closing keyword
        end: String,
    },
    /// Dollar-quoted body: `$$` or `$tag$` appearing at least twice
    DollarQuote,
}

impl BlockDelimiter {
    /// Keyword pair delimiter
    pub fn keywords(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::Keywords {
            start: start.into(),
            end: end.into(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        match self {
            Self::Keywords { start, end } => {
                let words = words(text);
                match words.iter().position(|w| w.eq_ignore_ascii_case(start)) {
                    Some(open) => words[open + 1..].iter().any(|w| w.eq_ignore_ascii_case(end)),
                    None => false,
                }
            }
            Self::DollarQuote => has_dollar_quote_pair(text),
        }
    }
}

/// Classifier over an extensible allow-list of block delimiters
///
/// Only block markers decide the outcome. The number of semicolons is ignored:
/// `CREATE ROLE a; GRANT r TO a;` is not a block and takes the splitting path,
/// which runs the same statements in the same order.
#[derive(Debug, Clone)]
pub struct Classifier {
    delimiters: Vec<BlockDelimiter>,
}

impl Default for Classifier {
    /// `BEGIN ... END` keywords plus dollar quoting
    fn default() -> Self {
        Self {
            delimiters: vec![
                BlockDelimiter::keywords("BEGIN", "END"),
                BlockDelimiter::DollarQuote,
            ],
        }
    }
}

impl Classifier {
    /// Classifier with an explicit delimiter allow-list
    pub fn new(delimiters: Vec<BlockDelimiter>) -> Self {
        Self { delimiters }
    }

    /// Add a delimiter to the allow-list
    pub fn with_delimiter(mut self, delimiter: BlockDelimiter) -> Self {
        self.delimiters.push(delimiter);
        self
    }

    /// Recognized delimiters
    pub fn delimiters(&self) -> &[BlockDelimiter] {
        &self.delimiters
    }

    /// Whether `text` holds a block that must not be split on semicolons
    ///
    /// Malformed input (unterminated quote) classifies as `false`; the splitting
    /// path then reports it before anything executes.
    pub fn classify(&self, text: &str) -> bool {
        let Ok(unquoted) = strip_quoted(text) else {
            return false;
        };
        self.delimiters.iter().any(|d| d.matches(&unquoted))
    }
}

/// Classify with the default delimiter set
pub fn is_multi_statement(text: &str) -> bool {
    Classifier::default().classify(text)
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .collect()
}

/// Find a `$tag$` opener (tag empty or identifier-like) with a later identical closer
fn has_dollar_quote_pair(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let tag_end = bytes[i + 1..]
            .iter()
            .position(|&b| !(b.is_ascii_alphanumeric() || b == b'_'))
            .map(|p| i + 1 + p);
        match tag_end {
            Some(end) if bytes[end] == b'$' && !bytes[i + 1..end].first().is_some_and(u8::is_ascii_digit) => {
                let tag = &text[i..=end];
                if text[end + 1..].contains(tag) {
                    return true;
                }
                i = end + 1;
            }
            _ => i += 1,
        }
    }
    false
}
