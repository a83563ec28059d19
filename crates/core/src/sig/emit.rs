//! Glue-code emitter.
//!
//! Generates each parameter's native declaration and initializer from the
//! typemap dictionary. Initializers are emitted inline when the resolved
//! template is a simple `var = ...` assignment, and deferred to the unit's
//! shared buffer otherwise (defaults, scope-sensitive templates, and
//! block-shaped code). The driver flushes the deferred buffer once, after
//! all declarations for the unit.

use std::collections::BTreeMap;
use thiserror::Error;

use super::diag::{Diagnostic, codes};
use super::node::SigNode;
use super::param::ParamNode;
use super::tables::{Template, TemplateVars, TypemapTables, xstype};
use super::unit::{Config, XsubMeta};

/// Fatal internal errors: invariant violations that indicate a bug in the
/// emitter or its driver, not in the binding spec being compiled. They
/// abort the current unit and are not recoverable.
#[derive(Debug, Error)]
pub enum InternalError {
    /// Both an explicit initializer override and `no_init` were set.
    #[error("parameter '{0}': initializer override and no_init are both set")]
    InitOverrideWithNoInit(String),
    /// The simple-assignment shape was chosen but the resolved template
    /// does not begin with `<var> =`.
    #[error("parameter '{0}': initializer template does not begin with '{0} ='")]
    TemplateNotAssignment(String),
    /// A default value was combined with length-aware string marshalling.
    #[error("parameter '{0}': default value combined with length-aware string marshalling")]
    DefaultWithLength(String),
}

/// Mutable emission state for one XSUB unit.
///
/// Threaded explicitly through every emit call; there is no ambient
/// state. The deferred buffer is append-only and flushed in full, in
/// append order, once after all parameter declarations.
#[derive(Debug, Default)]
pub struct EmitContext {
    /// Deferred code: statements that must run after every declaration of
    /// the unit.
    pub deferred: String,
    /// Set when a resolved template carries a scope comment; stays set for
    /// the remainder of the unit and forces deferral of later templates.
    pub scope_enabled: bool,
    /// Diagnostics recorded during emission.
    pub diagnostics: Vec<Diagnostic>,
}

impl EmitContext {
    /// A fresh context for one unit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the deferred buffer for the end-of-unit flush, leaving the
    /// context empty.
    pub fn take_deferred(&mut self) -> String {
        std::mem::take(&mut self.deferred)
    }
}

impl ParamNode {
    /// Generate this parameter's declaration and initializer text.
    ///
    /// Returns `Ok(Some(text))` with the declaration lines (the inline
    /// initializer included when applicable), possibly after appending to
    /// the context's deferred buffer. Returns `Ok(None)` when a typemap or
    /// template lookup failed — the failure is recorded as a diagnostic
    /// and the driver may continue with other parameters. Returns `Err`
    /// only for fatal internal invariant violations.
    pub fn emit(
        &self,
        sig: &SigNode,
        meta: &XsubMeta,
        config: &Config,
        typemaps: &TypemapTables,
        ctx: &mut EmitContext,
    ) -> Result<Option<String>, InternalError> {
        // The `SV *` placeholder reserves its slot but declares nothing;
        // the slot's value is handled manually by the XSUB body.
        if self.name == "SV *" {
            return Ok(Some(String::new()));
        }

        let Some(raw_type) = self.c_type.as_deref() else {
            ctx.diagnostics.push(
                Diagnostic::error(
                    codes::TYPEMAP_MISSING,
                    format!("no type specified for parameter '{}'", self.name),
                    None,
                )
                .with_context(BTreeMap::from([("param".into(), self.name.clone())])),
            );
            return Ok(None);
        };

        let mut out = String::new();

        // 1. A length(name) pseudo-parameter first declares the raw
        //    counter filled by the sibling string's extraction, and queues
        //    the copy into the user-typed variable. Everything below
        //    declares and initializes the synthesized variable, not the
        //    raw counter.
        let var: String = if let Some(bound) = &self.length_of {
            let counter = format!("STRLEN_length_of_{bound}");
            out.push_str(&format!("\tSTRLEN\t{counter};\n"));
            let synth = format!("XSauto_length_of_{bound}");
            ctx.deferred.push_str(&format!("\n\t{synth} = {counter};\n"));
            synth
        } else {
            self.name.clone()
        };

        let num = self.arg_slot.unwrap_or(0);
        let arg = format!("ST({})", num.saturating_sub(1));

        // 2. Declarator emission. CLASS in a class-method context uses its
        //    bare declared type; everything else goes through map_type,
        //    which embeds the name inside function-pointer declarators.
        let decl_core = if self.name == "CLASS" && meta.class_name.is_some() {
            format!("{raw_type}\t{var}")
        } else {
            map_type(config, raw_type, Some(&var))
        };

        let flattened = map_type(config, raw_type, None);
        let ntype = ntype_of(&flattened);
        let vars = TemplateVars {
            var: &var,
            ctype: &flattened,
            ntype: &ntype,
            arg: &arg,
            num,
            array_elem: None,
        };

        // 3. Template selection: explicit override, empty (no_init), or
        //    the typemap chain.
        if let Some(override_tpl) = &self.init_template {
            if self.no_init {
                return Err(InternalError::InitOverrideWithNoInit(self.name.clone()));
            }
            let rendered = Template::parse(override_tpl).render(&vars);
            out.push_str(&format!("\t{decl_core} = {rendered};\n"));
            self.append_deferred_extra(&vars, ctx);
            return Ok(Some(out));
        }

        if self.no_init {
            out.push_str(&format!("\t{decl_core};\n"));
            self.append_deferred_extra(&vars, ctx);
            return Ok(Some(out));
        }

        let Some(entry) = typemaps.lookup_by_ctype(raw_type) else {
            ctx.diagnostics.push(
                Diagnostic::error(
                    codes::TYPEMAP_MISSING,
                    format!("could not find a typemap for C type '{raw_type}'"),
                    None,
                )
                .with_context(BTreeMap::from([
                    ("param".into(), self.name.clone()),
                    ("ctype".into(), raw_type.to_string()),
                ])),
            );
            return Ok(None);
        };

        // 4. Destructor calls skip the class-membership check: the object
        //    xstype downgrades to its reference counterpart.
        let mut tag = entry.xstype.as_str();
        if meta.is_destructor() && tag == xstype::T_OBJECT {
            tag = xstype::T_REF;
        }

        // 5. A plain string parameter with a length(name) sibling bypasses
        //    the template and extracts string and length in one step.
        if tag == xstype::T_PV && sig.has_length_param_for(&self.name) {
            if self.default.is_some() {
                return Err(InternalError::DefaultWithLength(self.name.clone()));
            }
            out.push_str(&format!(
                "\t{decl_core} = ({flattened})SvPV({arg}, STRLEN_length_of_{});\n",
                self.name
            ));
            self.append_deferred_extra(&vars, ctx);
            return Ok(Some(out));
        }

        let Some(input) = typemaps.input_template(tag) else {
            ctx.diagnostics.push(
                Diagnostic::error(
                    codes::INPUT_TEMPLATE_MISSING,
                    format!("no input template registered for xstype '{tag}'"),
                    None,
                )
                .with_context(BTreeMap::from([
                    ("param".into(), self.name.clone()),
                    ("xstype".into(), tag.to_string()),
                ])),
            );
            return Ok(None);
        };
        let template = input.template();

        // 7. Scope comments make the whole remainder of the unit deferral-
        //    shaped, not just this parameter.
        if template.has_scope_comment() {
            ctx.scope_enabled = true;
        }

        // 6. Array templates splice the element type's own input template
        //    over the marker, indexed by element position.
        let rendered = if template.has_array_elem() {
            let subtype = array_subtype(&ntype);
            let elem = match self.resolve_array_elem(typemaps, &subtype, &var, num, ctx) {
                Some(e) => e,
                None => return Ok(None),
            };
            template.render(&TemplateVars {
                array_elem: Some(&elem),
                ..vars
            })
        } else {
            template.render(&vars)
        };

        // 8. Emission shape: defaulted, block-shaped, or simple assignment.
        if self.default.is_some() {
            let default = self.default.as_deref().unwrap();
            out.push_str(&format!("\t{decl_core};\n"));
            if default == "NO_INIT" {
                // Only-if-supplied sentinel: read the argument only when
                // the caller provided it.
                ctx.deferred.push_str(&format!(
                    "\n\tif (items >= {num}) {{\n\t    {}\n\t}}\n",
                    terminate(rendered.trim())
                ));
            } else {
                let mut s = format!("\n\tif (items < {num})\n\t    {var} = {default};\n");
                if !rendered.trim().is_empty() {
                    s.push_str(&format!("\telse {{\n\t    {}\n\t}}\n", terminate(rendered.trim())));
                }
                ctx.deferred.push_str(&s);
            }
        } else if ctx.scope_enabled || !starts_with_assignment(&rendered, &var) {
            out.push_str(&format!("\t{decl_core};\n"));
            ctx.deferred
                .push_str(&format!("\n\t{}\n", terminate(rendered.trim())));
        } else {
            let rest = strip_assignment(&rendered, &var)
                .ok_or_else(|| InternalError::TemplateNotAssignment(self.name.clone()))?;
            out.push_str(&format!("\t{decl_core} = {rest};\n"));
        }

        // 9. Any extra deferred fragment goes last, unconditionally.
        self.append_deferred_extra(&vars, ctx);
        Ok(Some(out))
    }

    /// Resolve and render the element expression for a `DO_ARRAY_ELEM`
    /// splice. Lookup failures are recorded and yield `None`.
    fn resolve_array_elem(
        &self,
        typemaps: &TypemapTables,
        subtype: &str,
        var: &str,
        num: u32,
        ctx: &mut EmitContext,
    ) -> Option<String> {
        let missing = |ctx: &mut EmitContext, what: String| {
            ctx.diagnostics.push(
                Diagnostic::error(codes::ARRAY_SUBTYPE_MISSING, what, None).with_context(
                    BTreeMap::from([
                        ("param".into(), self.name.clone()),
                        ("subtype".into(), subtype.to_string()),
                    ]),
                ),
            );
        };
        let Some(entry) = typemaps.lookup_by_ctype(subtype) else {
            missing(
                ctx,
                format!("could not find a typemap for array element type '{subtype}'"),
            );
            return None;
        };
        let Some(input) = typemaps.input_template(&entry.xstype) else {
            missing(
                ctx,
                format!(
                    "no input template registered for array element xstype '{}'",
                    entry.xstype
                ),
            );
            return None;
        };
        Some(render_array_elem(input.template(), var, subtype, num))
    }

    fn append_deferred_extra(&self, vars: &TemplateVars<'_>, ctx: &mut EmitContext) {
        if let Some(d) = &self.deferred_template {
            let rendered = Template::parse(d).render(vars);
            ctx.deferred
                .push_str(&format!("\n\t{}\n", terminate(rendered.trim())));
        }
    }
}

// ── Declarator helpers ──────────────────────────────────────────────────

/// Turn a parameter type into declaration form, optionally embedding the
/// variable name.
///
/// Hierarchical `:` characters flatten to `_` unless the hiertype flag is
/// set. An `array(elem, dims)` shorthand becomes `elem *`. With a name,
/// function-pointer declarators receive it inside the `(*)` — native
/// declarator syntax puts the identifier at the pointer position — and
/// every other type takes it as a tab-separated second token.
pub fn map_type(config: &Config, ctype: &str, varname: Option<&str>) -> String {
    let mut ty = if config.hiertype {
        ctype.to_string()
    } else {
        ctype.replace(':', "_")
    };

    if let Some(rest) = ty.strip_prefix("array(")
        && let Some(comma) = rest.find(',')
        && rest[comma..].contains(')')
    {
        ty = format!("{} *", &rest[..comma]);
    }

    if let Some(name) = varname {
        if let Some(pos) = fn_ptr_insert_pos(&ty) {
            ty.insert_str(pos, &format!(" {name} "));
        } else {
            ty.push('\t');
            ty.push_str(name);
        }
    }
    ty
}

/// Find the insertion point inside a function-pointer declarator: one past
/// the `*` of the first `( * )` group, if any.
fn fn_ptr_insert_pos(ty: &str) -> Option<usize> {
    let b = ty.as_bytes();
    for i in 0..b.len() {
        if b[i] != b'(' {
            continue;
        }
        let mut j = i + 1;
        while j < b.len() && b[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= b.len() || b[j] != b'*' {
            continue;
        }
        let mut k = j + 1;
        while k < b.len() && b[k].is_ascii_whitespace() {
            k += 1;
        }
        if k < b.len() && b[k] == b')' {
            return Some(j + 1);
        }
    }
    None
}

/// The message-name form of a type: each star becomes `Ptr`, with the
/// whitespace before it dropped.
fn ntype_of(flattened: &str) -> String {
    let mut out = String::with_capacity(flattened.len() + 2);
    for c in flattened.chars() {
        if c == '*' {
            while out.ends_with(|p: char| p.is_whitespace()) {
                out.pop();
            }
            out.push_str("Ptr");
        } else {
            out.push(c);
        }
    }
    out
}

/// The element type of an array ntype: the trailing `Array` and/or `Ptr`
/// naming suffixes stripped. `intArrayPtr` → `int`.
fn array_subtype(ntype: &str) -> String {
    let s = ntype.strip_suffix("Ptr").unwrap_or(ntype);
    let s = s.strip_suffix("Array").unwrap_or(s);
    s.to_string()
}

// ── Array element rendering ─────────────────────────────────────────────

/// Render an element template for a `DO_ARRAY_ELEM` splice.
///
/// Per-occurrence adjustments: the element type replaces `$type`/`$ntype`,
/// the argument access becomes `ST(ix_<var>)`, and embedded "is not of"
/// error messages gain the element position. The assignment target — the
/// first `$var` only — becomes the indexed container reference; later
/// `$var` occurrences stay bare. The body is re-indented one level deeper.
fn render_array_elem(template: &Template, var: &str, subtype: &str, num: u32) -> String {
    use super::tables::Segment;

    let argoff = num.saturating_sub(1);
    let arg_expr = format!("ST(ix_{var})");
    let indexed = format!("{var}[ix_{var} - {argoff}]");

    let mut out = String::new();
    let mut first_var = true;
    for seg in template.segments() {
        match seg {
            Segment::Literal(s) => out.push_str(s),
            Segment::Var => {
                if first_var {
                    out.push_str(&indexed);
                    first_var = false;
                } else {
                    out.push_str(var);
                }
            }
            Segment::Type | Segment::Ntype => out.push_str(subtype),
            Segment::Arg => out.push_str(&arg_expr),
            Segment::Num => out.push_str(&num.to_string()),
            Segment::ArrayElem => out.push_str("DO_ARRAY_ELEM"),
        }
    }

    let out = out.replace("\n\t", "\n\t\t");
    rewrite_not_of_messages(&out, var)
}

/// Rewrite `... is not of <...>"` messages to report the element position:
/// `[arg %d] is not of <...>", ix_<var> + 1`.
fn rewrite_not_of_messages(text: &str, var: &str) -> String {
    const NEEDLE: &str = "is not of ";
    let mut lines: Vec<String> = Vec::new();
    for line in text.lines() {
        let rewritten = match line.find(NEEDLE) {
            Some(p) => {
                let q = line.rfind('"');
                match q {
                    Some(q) if q >= p + NEEDLE.len() => format!(
                        "{}[arg %d] is not of {}, ix_{} + 1{}",
                        &line[..p],
                        &line[p + NEEDLE.len()..=q],
                        var,
                        &line[q + 1..]
                    ),
                    _ => line.to_string(),
                }
            }
            None => line.to_string(),
        };
        lines.push(rewritten);
    }
    let mut joined = lines.join("\n");
    if text.ends_with('\n') {
        joined.push('\n');
    }
    joined
}

// ── Statement helpers ───────────────────────────────────────────────────

/// Whether rendered initializer text begins with `<var> =`.
fn starts_with_assignment(rendered: &str, var: &str) -> bool {
    strip_assignment(rendered, var).is_some()
}

/// Strip the leading `<var> =` from rendered initializer text.
fn strip_assignment<'t>(rendered: &'t str, var: &str) -> Option<&'t str> {
    let s = rendered.trim_start().strip_prefix(var)?;
    let s = s.trim_start().strip_prefix('=')?;
    Some(s.trim_start())
}

/// Terminate a deferred statement unless it already ends in `;` or `}`.
fn terminate(stmt: &str) -> String {
    let t = stmt.trim_end();
    if t.ends_with(';') || t.ends_with('}') {
        t.to_string()
    } else {
        format!("{t};")
    }
}
