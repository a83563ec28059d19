//! Structured marshalling code templates.
//!
//! Template text is parsed once into literal runs and known placeholders,
//! then rendered against an explicit set of bindings. Rendering never
//! rescans its own output, so a `$var` binding that happens to contain
//! `$type` is spliced verbatim.

use serde::{Deserialize, Serialize};

/// One parsed segment of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    /// A literal run of template text.
    Literal(String),
    /// `$var` — the native variable name.
    Var,
    /// `$type` — the declared C type.
    Type,
    /// `$ntype` — the normalized (hierarchy-flattened) type name, as used
    /// in embedded error messages.
    Ntype,
    /// `$arg` — the caller-argument access expression.
    Arg,
    /// `$num` — the 1-based caller argument slot.
    Num,
    /// The `DO_ARRAY_ELEM` marker: splice point for the per-element
    /// marshalling expression of an array type.
    ArrayElem,
}

/// Bindings supplied when rendering a [`Template`].
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    /// Replacement for `$var`.
    pub var: &'a str,
    /// Replacement for `$type`.
    pub ctype: &'a str,
    /// Replacement for `$ntype`.
    pub ntype: &'a str,
    /// Replacement for `$arg`.
    pub arg: &'a str,
    /// Replacement for `$num`.
    pub num: u32,
    /// Pre-rendered splice for the `DO_ARRAY_ELEM` marker. When `None`,
    /// the marker renders as its own literal text.
    pub array_elem: Option<&'a str>,
}

/// A marshalling code template parsed into segments.
///
/// The raw text is retained alongside the parse: the scope-comment scan
/// runs over it, since a comment may span placeholder boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    raw: String,
    segments: Vec<Segment>,
}

/// Placeholder names recognized after a `$`, longest first so `$ntype`
/// is never read as `$n` + `type`.
const PLACEHOLDERS: [(&str, Segment); 5] = [
    ("ntype", Segment::Ntype),
    ("type", Segment::Type),
    ("var", Segment::Var),
    ("arg", Segment::Arg),
    ("num", Segment::Num),
];

const ARRAY_ELEM_MARKER: &str = "DO_ARRAY_ELEM";

impl Template {
    /// Parse raw template text into segments.
    ///
    /// A `$` that does not introduce a known placeholder is kept as a
    /// literal character.
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        let mut lit = String::new();
        let bytes = text.as_bytes();
        let mut i = 0usize;

        while i < bytes.len() {
            if text[i..].starts_with(ARRAY_ELEM_MARKER) {
                if !lit.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut lit)));
                }
                segments.push(Segment::ArrayElem);
                i += ARRAY_ELEM_MARKER.len();
                continue;
            }
            if bytes[i] == b'$' {
                let rest = &text[i + 1..];
                if let Some((name, seg)) = PLACEHOLDERS
                    .iter()
                    .find(|(name, _)| rest.starts_with(name))
                {
                    if !lit.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut lit)));
                    }
                    segments.push(seg.clone());
                    i += 1 + name.len();
                    continue;
                }
            }
            // Advance one whole character (template text can hold UTF-8
            // in embedded message literals).
            let ch = text[i..].chars().next().unwrap();
            lit.push(ch);
            i += ch.len_utf8();
        }

        if !lit.is_empty() {
            segments.push(Segment::Literal(lit));
        }
        Self {
            raw: text.to_string(),
            segments,
        }
    }

    /// Render the template against the given bindings.
    pub fn render(&self, vars: &TemplateVars<'_>) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Var => out.push_str(vars.var),
                Segment::Type => out.push_str(vars.ctype),
                Segment::Ntype => out.push_str(vars.ntype),
                Segment::Arg => out.push_str(vars.arg),
                Segment::Num => out.push_str(&vars.num.to_string()),
                Segment::ArrayElem => match vars.array_elem {
                    Some(elem) => out.push_str(elem),
                    None => out.push_str(ARRAY_ELEM_MARKER),
                },
            }
        }
        out
    }

    /// Whether the template contains the `DO_ARRAY_ELEM` marker.
    pub fn has_array_elem(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::ArrayElem))
    }

    /// Whether the raw template text contains a C comment mentioning
    /// "scope", case-insensitively. Such templates require deferral of the
    /// whole fragment past the declaration block.
    pub fn has_scope_comment(&self) -> bool {
        let lower = self.raw.to_lowercase();
        let mut from = 0usize;
        while let Some(open_rel) = lower[from..].find("/*") {
            let open = from + open_rel;
            let Some(close_rel) = lower[open + 2..].find("*/") else {
                break;
            };
            let close = open + 2 + close_rel;
            if lower[open + 2..close].contains("scope") {
                return true;
            }
            from = close + 2;
        }
        false
    }

    /// The raw template text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The parsed segments, in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}
