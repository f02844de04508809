//! Placeholder scanning for template text.
//!
//! Two placeholder forms are recognized anywhere in template text:
//! positional `?0`, `?1`, … and expression `?#{ ... }`. Expression bodies may
//! contain quoted strings and nested braces.

use docref_core::{BindingError, BindingErrorKind, Result};
use regex::Regex;
use std::sync::OnceLock;

/// A placeholder found in template text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placeholder<'a> {
    /// `?N`
    Positional(usize),
    /// `?#{expression}`
    Expression(&'a str),
}

/// A run of template text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Literal(&'a str),
    Placeholder(Placeholder<'a>),
}

fn start_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\?(?:#\{|\d)"))
        .as_ref()
        .map_err(|e| {
            BindingError::new(
                BindingErrorKind::Syntax,
                format!("invalid placeholder pattern: {e}"),
            )
            .into()
        })
}

/// Check whether text contains at least one placeholder.
pub(crate) fn contains_placeholder(text: &str) -> Result<bool> {
    Ok(start_pattern()?.is_match(text))
}

/// Check whether text is shaped like a document template.
pub(crate) fn looks_like_document(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with('{') && trimmed.ends_with('}')
}

/// Parse the placeholder starting at byte offset `start`.
///
/// Returns the placeholder and the offset just past it, or `None` when the
/// `?` at `start` does not begin a placeholder.
pub(crate) fn placeholder_at(text: &str, start: usize) -> Result<Option<(Placeholder<'_>, usize)>> {
    let rest = &text[start..];
    if rest.starts_with("?#{") {
        let open = start + 3;
        let close = matching_brace(text, open).ok_or_else(|| {
            BindingError::new(BindingErrorKind::Syntax, "unterminated expression placeholder")
                .at(start)
                .with_template(text)
        })?;
        return Ok(Some((Placeholder::Expression(&text[open..close]), close + 1)));
    }

    let Some(digits) = rest.strip_prefix('?') else {
        return Ok(None);
    };
    let len = digits.bytes().take_while(u8::is_ascii_digit).count();
    if len == 0 {
        return Ok(None);
    }
    let index = digits[..len].parse::<usize>().map_err(|_| {
        BindingError::new(BindingErrorKind::Positional, "positional index is too large")
            .at(start)
            .with_template(text)
    })?;
    Ok(Some((Placeholder::Positional(index), start + 1 + len)))
}

/// Find the `}` closing the expression body that begins at `open`.
pub(crate) fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split text into literal runs and placeholders, left to right.
pub(crate) fn segments(text: &str) -> Result<Vec<Segment<'_>>> {
    let pattern = start_pattern()?;
    let mut segments = Vec::new();
    let mut pos = 0;
    let mut literal_start = 0;

    while let Some(found) = pattern.find_at(text, pos) {
        match placeholder_at(text, found.start())? {
            Some((placeholder, end)) => {
                if found.start() > literal_start {
                    segments.push(Segment::Literal(&text[literal_start..found.start()]));
                }
                segments.push(Segment::Placeholder(placeholder));
                pos = end;
                literal_start = end;
            }
            None => pos = found.end(),
        }
    }

    if literal_start < text.len() {
        segments.push(Segment::Literal(&text[literal_start..]));
    }
    Ok(segments)
}
