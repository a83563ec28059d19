//! Signature parser.
//!
//! Orchestrates the tokenizer and decomposer into a [`SigNode`]: prepends
//! the synthetic THIS/CLASS entry for methods, applies the
//! post-decomposition policy to each fragment, tracks the RETVAL
//! lifecycle, and derives the argument counts.

use std::collections::HashSet;

use super::decompose::{NameToken, decompose};
use super::diag::{Diagnostic, codes};
use super::node::SigNode;
use super::param::{Direction, ParamNode};
use super::tokenizer::{Fragment, split_parameters};
use super::unit::{Config, XsubMeta};

/// Result of parsing one XSUB signature.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ParseResult {
    /// The parsed signature node.
    pub sig: SigNode,
    /// Diagnostics (errors and warnings) produced during parsing.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse raw signature text for the given XSUB.
///
/// `raw` must have continuation markers already normalized to spaces.
/// Parsing is deterministic and side-effect free: re-running it on the
/// same inputs produces a structurally identical result.
pub fn parse_signature(raw: &str, meta: &XsubMeta, config: &Config) -> ParseResult {
    SigParser::new(raw, meta, config).parse()
}

struct SigParser<'a> {
    raw: &'a str,
    meta: &'a XsubMeta,
    config: &'a Config,
    diags: Vec<Diagnostic>,
    params: Vec<ParamNode>,
    seen: HashSet<String>,
    /// Fully-synthetic RETVAL, held out of the parameter list until it is
    /// either promoted at its declared position or appended at the end.
    retval_pending: Option<ParamNode>,
    next_slot: u32,
    optional_args: u32,
    saw_ellipsis: bool,
}

impl<'a> SigParser<'a> {
    fn new(raw: &'a str, meta: &'a XsubMeta, config: &'a Config) -> Self {
        Self {
            raw,
            meta,
            config,
            diags: Vec::new(),
            params: Vec::new(),
            seen: HashSet::new(),
            retval_pending: None,
            next_slot: 1,
            optional_args: 0,
            saw_ellipsis: false,
        }
    }

    fn parse(mut self) -> ParseResult {
        // Methods get the object (or class name) as slot 1.
        if let Some(class) = &self.meta.class_name {
            let (name, ctype) = if self.meta.takes_class() {
                ("CLASS", "char *".to_string())
            } else {
                ("THIS", format!("{class} *"))
            };
            let mut p = ParamNode::new(name);
            p.c_type = Some(ctype);
            p.arg_slot = Some(1);
            p.is_synthetic = true;
            self.seen.insert(name.to_string());
            self.params.push(p);
            self.next_slot = 2;
        }

        if self.meta.has_retval() {
            let rt = self.meta.return_type.as_deref().unwrap_or_default();
            self.retval_pending = Some(ParamNode::synthetic_retval(rt));
        }

        let frags = split_parameters(self.raw, &mut self.diags);
        for frag in &frags {
            if frag.text.is_empty() {
                continue;
            }
            if frag.text == "..." {
                if self.saw_ellipsis {
                    self.error_after_ellipsis(frag);
                } else {
                    self.saw_ellipsis = true;
                }
                continue;
            }
            if self.saw_ellipsis {
                self.error_after_ellipsis(frag);
                continue;
            }
            self.process_fragment(frag);
        }

        // A RETVAL never written in the signature stays fully synthetic
        // and goes last, after every declared parameter.
        if let Some(pending) = self.retval_pending.take() {
            self.seen.insert(pending.name.clone());
            self.params.push(pending);
        }

        let total = self.next_slot - 1;
        let sig = SigNode::new(
            self.raw.to_string(),
            self.params,
            self.saw_ellipsis,
            total,
            total - self.optional_args,
        );
        ParseResult {
            sig,
            diagnostics: self.diags,
        }
    }

    fn error_after_ellipsis(&mut self, frag: &Fragment) {
        self.diags.push(Diagnostic::error(
            codes::PARAM_AFTER_ELLIPSIS,
            format!("further parameter '{}' after '...'", frag.text),
            Some(frag.span),
        ));
    }

    fn process_fragment(&mut self, frag: &Fragment) {
        let Some(d) = decompose(&frag.text) else {
            self.diags.push(Diagnostic::error(
                codes::UNPARSEABLE_PARAM,
                format!("unparseable XSUB parameter: '{}'", frag.text),
                Some(frag.span),
            ));
            return;
        };

        // The bare `SV *` placeholder: a parameter literally named "SV *"
        // with no type, consuming the next slot.
        if d.name == NameToken::Placeholder {
            if !self.seen.insert("SV *".to_string()) {
                self.duplicate(frag, "SV *");
                return;
            }
            let mut p = ParamNode::new("SV *");
            p.arg_slot = Some(self.next_slot);
            self.next_slot += 1;
            self.params.push(p);
            return;
        }

        // 1. Direction modifiers need in/out support.
        let direction = d.direction.unwrap_or_default();
        if d.direction.is_some() && !self.config.allow_inout {
            self.diags.push(Diagnostic::error(
                codes::INOUT_DISABLED,
                format!(
                    "parameter direction modifier '{}' not allowed in this context",
                    direction.keyword()
                ),
                Some(frag.span),
            ));
        }

        // 2. Type annotations need argument-type support; the type is
        //    discarded when disabled.
        let mut ctype = d.ctype;
        if ctype.is_some() && !self.config.allow_argtypes {
            self.diags.push(Diagnostic::error(
                codes::ARGTYPE_DISABLED,
                format!(
                    "parameter type annotation not allowed in this context: '{}'",
                    frag.text
                ),
                Some(frag.span),
            ));
            ctype = None;
        }

        // 3. length() needs argument-type support and forbids a default.
        let (name, length_of) = match d.name {
            NameToken::Ident(n) => (n, None),
            NameToken::Length(bound) => {
                if !self.config.allow_argtypes {
                    self.diags.push(Diagnostic::error(
                        codes::LENGTH_DISABLED,
                        format!("length() pseudo-parameter not allowed in this context: 'length({bound})'"),
                        Some(frag.span),
                    ));
                    return;
                }
                if d.default.is_some() {
                    self.diags.push(Diagnostic::error(
                        codes::LENGTH_WITH_DEFAULT,
                        format!("default value not allowed on 'length({bound})'"),
                        Some(frag.span),
                    ));
                    return;
                }
                (format!("length({bound})"), Some(bound))
            }
            NameToken::Placeholder => return,
        };
        let is_length = length_of.is_some();

        // Duplicate names, with the one sanctioned exception: RETVAL
        // promoting its fully-synthetic entry to the declared position.
        if self.seen.contains(&name) {
            self.duplicate(frag, &name);
            return;
        }
        let mut node = if name == "RETVAL" && self.retval_pending.is_some() {
            let mut n = self.retval_pending.take().unwrap();
            n.promote_retval_to_semi_real();
            if let Some(t) = &ctype {
                n.promote_retval_to_real(t.clone());
            }
            n
        } else {
            let mut n = ParamNode::new(name.clone());
            n.c_type = ctype.clone();
            n
        };

        node.direction = direction;
        if is_length {
            node.length_of = length_of;
        }

        // 4. A type or length() marks the entry as signature-typed.
        if ctype.is_some() || is_length {
            node.typed_in_signature = true;
        }
        // 5. OUT-prefixed directions and length() suppress the initializer.
        if is_length || direction.starts_with_out() {
            node.no_init = true;
        }

        // 6. Defaults: count toward the optional-argument total and render
        //    the usage suffix. Spacing around `=` is normalized to single
        //    spaces for typed parameters and preserved as written for
        //    untyped ones.
        if let Some(def) = d.default {
            node.default_usage = Some(if node.typed_in_signature {
                format!(" = {}", def.expr)
            } else {
                format!("{}={}{}", def.pre_space, def.post_space, def.expr)
            });
            node.default = Some(def.expr);
        }

        // 7. Slot assignment: OUTLIST results and length pseudo-parameters
        //    consume no caller slot.
        if direction == Direction::OutList || is_length {
            node.arg_slot = None;
        } else {
            node.arg_slot = Some(self.next_slot);
            self.next_slot += 1;
            if node.default.is_some() {
                self.optional_args += 1;
            }
        }

        self.seen.insert(name);
        self.params.push(node);
    }

    fn duplicate(&mut self, frag: &Fragment, name: &str) {
        self.diags.push(Diagnostic::error(
            codes::DUPLICATE_PARAM,
            format!("duplicate definition of parameter '{name}'"),
            Some(frag.span),
        ));
    }
}
