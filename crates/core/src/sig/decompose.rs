//! Parameter fragment decomposition.
//!
//! Splits one trimmed parameter fragment into an optional direction
//! keyword, an optional type prefix, a mandatory name token (a bare
//! identifier or `length(identifier)`), and an optional default expression
//! with its surrounding whitespace captured for usage-message rendering.
//!
//! The decomposition reproduces a lazy-prefix pattern: the name is the
//! leftmost word-boundary token whose suffix parses as an optional
//! `= default` tail, so everything before it becomes the type.

use super::param::Direction;

/// The name token of a decomposed fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameToken {
    /// A bare identifier.
    Ident(String),
    /// `length(name)` — a pseudo-parameter bound to another parameter.
    Length(String),
    /// The literal `SV *` backward-compatibility placeholder.
    Placeholder,
}

/// A default expression with the whitespace captured around its `=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultExpr {
    /// Whitespace between the name and the `=`.
    pub pre_space: String,
    /// Whitespace between the `=` and the expression.
    pub post_space: String,
    /// The expression text, right-trimmed.
    pub expr: String,
}

/// A decomposed parameter fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposed {
    /// Leading direction keyword, if any.
    pub direction: Option<Direction>,
    /// Type prefix with trailing whitespace removed; `None` when empty.
    pub ctype: Option<String>,
    /// The name token.
    pub name: NameToken,
    /// Trailing `= expr` default, if any.
    pub default: Option<DefaultExpr>,
}

/// Decompose one trimmed, non-`...` fragment. Returns `None` when the
/// fragment matches neither the parameter shape nor the `SV *` placeholder.
pub fn decompose(fragment: &str) -> Option<Decomposed> {
    let s = fragment.trim();

    if is_sv_placeholder(s) {
        return Some(Decomposed {
            direction: None,
            ctype: None,
            name: NameToken::Placeholder,
            default: None,
        });
    }

    // Try with a direction keyword consumed first; if the remainder has no
    // name, retry treating the keyword as the name itself (`IN` alone is a
    // parameter named IN).
    if let Some((dir, rest)) = strip_direction(s)
        && let Some(mut d) = decompose_core(rest)
    {
        d.direction = Some(dir);
        return Some(d);
    }
    decompose_core(s)
}

/// The `SV *` placeholder: exactly `SV`, stars aside, nothing else.
fn is_sv_placeholder(s: &str) -> bool {
    let t = s.trim();
    t.strip_prefix("SV")
        .is_some_and(|rest| rest.trim() == "*")
}

/// Strip a leading direction keyword followed by a word boundary.
fn strip_direction(s: &str) -> Option<(Direction, &str)> {
    // Longest keywords first so IN_OUTLIST is not read as IN.
    const KEYWORDS: [(&str, Direction); 5] = [
        ("IN_OUTLIST", Direction::InOutList),
        ("IN_OUT", Direction::InOut),
        ("OUTLIST", Direction::OutList),
        ("OUT", Direction::Out),
        ("IN", Direction::In),
    ];
    for (kw, dir) in KEYWORDS {
        if let Some(rest) = s.strip_prefix(kw) {
            // Word boundary: the next character must not continue the word.
            if rest.chars().next().is_none_or(|c| !is_word(c)) {
                return Some((dir, rest.trim_start()));
            }
        }
    }
    None
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Find the leftmost name token whose suffix parses as an optional default,
/// and split the fragment around it.
fn decompose_core(s: &str) -> Option<Decomposed> {
    let bytes = s.as_bytes();
    let mut prev_is_word = false;

    for (i, ch) in s.char_indices() {
        let word_start = is_word(ch) && !prev_is_word;
        prev_is_word = is_word(ch);
        if !word_start {
            continue;
        }

        // A bare identifier first, then the length(name) form — matching
        // the reference pattern's alternation order.
        let word_end = s[i..]
            .char_indices()
            .find(|&(_, c)| !is_word(c))
            .map_or(s.len(), |(off, _)| i + off);

        if let Some(default) = parse_suffix(&s[word_end..]) {
            return Some(Decomposed {
                direction: None,
                ctype: type_prefix(s, i),
                name: NameToken::Ident(s[i..word_end].to_string()),
                default,
            });
        }

        if s[i..].starts_with("length")
            && bytes.get(i + 6) == Some(&b'(')
            && let Some((inner, close_end)) = parse_length_group(&s[i + 6..])
        {
            let end = i + 6 + close_end;
            if let Some(default) = parse_suffix(&s[end..]) {
                return Some(Decomposed {
                    direction: None,
                    ctype: type_prefix(s, i),
                    name: NameToken::Length(inner),
                    default,
                });
            }
        }
    }
    None
}

/// Parse `( \s* \w+ \s* )` starting just after `length`. Returns the inner
/// identifier and the offset one past the closing paren.
fn parse_length_group(s: &str) -> Option<(String, usize)> {
    let inner = s.strip_prefix('(')?;
    let trimmed = inner.trim_start();
    let lead = inner.len() - trimmed.len();
    let word_len = trimmed
        .char_indices()
        .find(|&(_, c)| !is_word(c))
        .map_or(trimmed.len(), |(off, _)| off);
    if word_len == 0 {
        return None;
    }
    let after = &trimmed[word_len..];
    let after_trim = after.trim_start();
    let mid = after.len() - after_trim.len();
    if !after_trim.starts_with(')') {
        return None;
    }
    let close_end = 1 + lead + word_len + mid + 1;
    Some((trimmed[..word_len].to_string(), close_end))
}

/// Parse the tail after a name: empty (no default), or
/// `(\s*) = (\s*) expr` with the expression right-trimmed. Returns
/// `None` when the tail is neither.
fn parse_suffix(tail: &str) -> Option<Option<DefaultExpr>> {
    if tail.trim().is_empty() {
        return Some(None);
    }
    let after_ws = tail.trim_start();
    let pre_space = &tail[..tail.len() - after_ws.len()];
    let rest = after_ws.strip_prefix('=')?;
    let expr_part = rest.trim_start();
    let post_space = &rest[..rest.len() - expr_part.len()];
    Some(Some(DefaultExpr {
        pre_space: pre_space.to_string(),
        post_space: post_space.to_string(),
        expr: expr_part.trim_end().to_string(),
    }))
}

fn type_prefix(s: &str, name_start: usize) -> Option<String> {
    let t = s[..name_start].trim_end();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> NameToken {
        NameToken::Ident(name.to_string())
    }

    #[test]
    fn bare_name() {
        let d = decompose("foo").unwrap();
        assert_eq!(d.direction, None);
        assert_eq!(d.ctype, None);
        assert_eq!(d.name, ident("foo"));
        assert_eq!(d.default, None);
    }

    #[test]
    fn typed_name() {
        let d = decompose("int foo").unwrap();
        assert_eq!(d.ctype.as_deref(), Some("int"));
        assert_eq!(d.name, ident("foo"));
    }

    #[test]
    fn pointer_type() {
        let d = decompose("char *s").unwrap();
        assert_eq!(d.ctype.as_deref(), Some("char *"));
        assert_eq!(d.name, ident("s"));
    }

    #[test]
    fn glued_pointer_type() {
        let d = decompose("unsigned int*x").unwrap();
        assert_eq!(d.ctype.as_deref(), Some("unsigned int*"));
        assert_eq!(d.name, ident("x"));
    }

    #[test]
    fn multiword_type() {
        let d = decompose("unsigned long n").unwrap();
        assert_eq!(d.ctype.as_deref(), Some("unsigned long"));
        assert_eq!(d.name, ident("n"));
    }

    #[test]
    fn typed_default() {
        let d = decompose("int b = 5").unwrap();
        assert_eq!(d.ctype.as_deref(), Some("int"));
        assert_eq!(d.name, ident("b"));
        let def = d.default.unwrap();
        assert_eq!(def.pre_space, " ");
        assert_eq!(def.post_space, " ");
        assert_eq!(def.expr, "5");
    }

    #[test]
    fn untyped_default_tight_spacing() {
        let d = decompose("b=5").unwrap();
        assert_eq!(d.ctype, None);
        let def = d.default.unwrap();
        assert_eq!(def.pre_space, "");
        assert_eq!(def.post_space, "");
        assert_eq!(def.expr, "5");
    }

    #[test]
    fn default_with_equality_expr() {
        let d = decompose("int x = a == b").unwrap();
        assert_eq!(d.name, ident("x"));
        assert_eq!(d.default.unwrap().expr, "a == b");
    }

    #[test]
    fn default_call_expr() {
        let d = decompose("char *s = default_sep(\",\")").unwrap();
        assert_eq!(d.ctype.as_deref(), Some("char *"));
        assert_eq!(d.default.unwrap().expr, "default_sep(\",\")");
    }

    #[test]
    fn direction_keywords() {
        let d = decompose("OUTLIST int x").unwrap();
        assert_eq!(d.direction, Some(Direction::OutList));
        assert_eq!(d.ctype.as_deref(), Some("int"));
        assert_eq!(d.name, ident("x"));

        let d = decompose("IN_OUT y").unwrap();
        assert_eq!(d.direction, Some(Direction::InOut));
        assert_eq!(d.name, ident("y"));
    }

    #[test]
    fn direction_prefix_requires_word_boundary() {
        // OUTx is a name, not OUT + x.
        let d = decompose("OUTx").unwrap();
        assert_eq!(d.direction, None);
        assert_eq!(d.name, ident("OUTx"));
    }

    #[test]
    fn direction_keyword_alone_is_a_name() {
        let d = decompose("IN").unwrap();
        assert_eq!(d.direction, None);
        assert_eq!(d.name, ident("IN"));
    }

    #[test]
    fn length_pseudo_param() {
        let d = decompose("length(s)").unwrap();
        assert_eq!(d.ctype, None);
        assert_eq!(d.name, NameToken::Length("s".into()));
    }

    #[test]
    fn typed_length_with_inner_spaces() {
        let d = decompose("int length( s )").unwrap();
        assert_eq!(d.ctype.as_deref(), Some("int"));
        assert_eq!(d.name, NameToken::Length("s".into()));
    }

    #[test]
    fn length_as_plain_identifier() {
        // Without parens, `length` is an ordinary name.
        let d = decompose("int length").unwrap();
        assert_eq!(d.name, ident("length"));
    }

    #[test]
    fn sv_placeholder() {
        assert_eq!(decompose("SV *").unwrap().name, NameToken::Placeholder);
        assert_eq!(decompose("  SV*  ").unwrap().name, NameToken::Placeholder);
    }

    #[test]
    fn sv_with_name_is_not_placeholder() {
        let d = decompose("SV *sv").unwrap();
        assert_eq!(d.ctype.as_deref(), Some("SV *"));
        assert_eq!(d.name, ident("sv"));
    }

    #[test]
    fn unparseable_fragments() {
        assert!(decompose("").is_none());
        assert!(decompose("***").is_none());
    }

    #[test]
    fn degenerate_equals_prefix_still_matches() {
        // The lazy type prefix swallows the `=`; the typemap lookup
        // rejects it later.
        let d = decompose("= 5").unwrap();
        assert_eq!(d.ctype.as_deref(), Some("="));
        assert_eq!(d.name, ident("5"));
        assert_eq!(d.default, None);
    }

    #[test]
    fn function_pointer_type() {
        let d = decompose("int (*)(int, char *) cb").unwrap();
        assert_eq!(d.ctype.as_deref(), Some("int (*)(int, char *)"));
        assert_eq!(d.name, ident("cb"));
    }
}
