//! Signature tokenizer.
//!
//! Splits raw signature text into parameter fragments on top-level commas
//! only. Commas nested inside bracket groups, double-quoted strings, or
//! single-quoted char literals are not split points. When the balanced
//! grammar cannot consume the whole text, the tokenizer falls back to naive
//! comma splitting and emits a warning — that path indicates a defect in
//! the input, not a supported feature.

use super::diag::{Diagnostic, Span, codes};

/// One parameter fragment: trimmed text plus its byte span in the raw input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// The fragment text with surrounding whitespace removed.
    pub text: String,
    /// Byte span of the trimmed text in the raw signature.
    pub span: Span,
}

impl Fragment {
    fn from_range(raw: &str, start: usize, end: usize) -> Self {
        let piece = &raw[start..end];
        let lead = piece.len() - piece.trim_start().len();
        let trimmed = piece.trim();
        Self {
            text: trimmed.to_string(),
            span: Span::new(start + lead, start + lead + trimmed.len()),
        }
    }
}

/// Split raw signature text into parameter fragments.
///
/// Empty input yields no fragments. Empty fragments between adjacent
/// commas are preserved (the parser skips them); a trailing comma does not
/// produce a trailing empty fragment.
pub fn split_parameters(raw: &str, diags: &mut Vec<Diagnostic>) -> Vec<Fragment> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    match try_split(raw) {
        Some(frags) => frags,
        None => {
            diags.push(Diagnostic::warn(
                codes::TOKENIZER_FALLBACK,
                format!("cannot parse parameter list '{}', falling back to comma splitting", raw.trim()),
                Some(Span::new(0, raw.len())),
            ));
            naive_split(raw)
        }
    }
}

/// Attempt the balanced-token grammar over the whole text. Returns `None`
/// if any scan step cannot consume up to a top-level comma or the end of
/// input (unterminated quote or group, stray closer at top level).
fn try_split(raw: &str) -> Option<Vec<Fragment>> {
    let b = raw.as_bytes();
    let len = b.len();
    let mut frags = Vec::new();
    let mut pos = 0usize;

    while pos < len {
        let start = pos;
        let end = scan_arg(raw, pos)?;
        if end == len {
            frags.push(Fragment::from_range(raw, start, end));
            pos = end;
        } else if b[end] == b',' {
            frags.push(Fragment::from_range(raw, start, end));
            pos = end + 1;
        } else {
            // A closer with no matching opener at top level.
            return None;
        }
    }
    Some(frags)
}

/// Scan one argument run starting at `pos`: any mix of plain character
/// runs, bracket groups, and quoted literals. Stops (successfully) at a
/// top-level comma, a top-level closer, or end of input. The run may be
/// empty.
fn scan_arg(raw: &str, mut pos: usize) -> Option<usize> {
    let b = raw.as_bytes();
    while pos < b.len() {
        match b[pos] {
            b',' | b')' | b'}' | b']' => return Some(pos),
            b'(' | b'{' | b'[' => pos = scan_group(raw, pos)?,
            b'"' => pos = scan_quoted(raw, pos, b'"')?,
            b'\'' => pos = scan_quoted(raw, pos, b'\'')?,
            _ => pos += 1,
        }
    }
    Some(pos)
}

/// Scan a bracket group starting at an opener. Matching is deliberately
/// lenient: any closer ends any opener, so `(a]` counts as one balanced
/// group. Inside a group, commas and quotes are plain characters; only
/// nested brackets recurse. This matching behavior is a long-standing
/// quirk that downstream consumers may rely on — do not tighten it.
fn scan_group(raw: &str, open_pos: usize) -> Option<usize> {
    let b = raw.as_bytes();
    let mut pos = open_pos + 1;
    while pos < b.len() {
        match b[pos] {
            b')' | b'}' | b']' => return Some(pos + 1),
            b'(' | b'{' | b'[' => pos = scan_group(raw, pos)?,
            _ => pos += 1,
        }
    }
    // Ran off the end without a closer.
    None
}

/// Scan a quoted literal with backslash escapes. `quote` is `"` or `'`.
fn scan_quoted(raw: &str, open_pos: usize, quote: u8) -> Option<usize> {
    let b = raw.as_bytes();
    let mut pos = open_pos + 1;
    while pos < b.len() {
        if b[pos] == b'\\' {
            pos = (pos + 2).min(b.len());
        } else if b[pos] == quote {
            return Some(pos + 1);
        } else {
            pos += 1;
        }
    }
    None
}

/// Defect-path fallback: split on every comma and trim.
fn naive_split(raw: &str) -> Vec<Fragment> {
    let mut frags = Vec::new();
    let mut start = 0usize;
    for (i, ch) in raw.char_indices() {
        if ch == ',' {
            frags.push(Fragment::from_range(raw, start, i));
            start = i + 1;
        }
    }
    frags.push(Fragment::from_range(raw, start, raw.len()));
    frags
}
