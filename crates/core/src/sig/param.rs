//! The per-parameter node.
//!
//! A [`ParamNode`] accumulates everything known about one parameter: the
//! signature text contributes direction/type/name/default at parse time,
//! and the driver's INPUT/OUTPUT pass may refine individual fields before
//! emission.

use serde::Serialize;
use std::collections::BTreeMap;

use super::diag::{Diagnostic, codes};
use super::tables::TypemapTables;

/// Parameter direction, from the signature or an INPUT line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// No modifier written.
    #[default]
    Default,
    /// `IN` — supplied by the caller (the implicit behavior, made explicit).
    In,
    /// `OUT` — written back to the caller's argument; not read.
    Out,
    /// `OUTLIST` — returned to the caller but not supplied; consumes no
    /// argument slot.
    OutList,
    /// `IN_OUT` — supplied by the caller and written back.
    InOut,
    /// `IN_OUTLIST` — supplied by the caller and also returned.
    InOutList,
}

impl Direction {
    /// Whether the keyword contains OUT, i.e. the native call needs the
    /// parameter's address.
    pub fn is_out_bound(self) -> bool {
        !matches!(self, Direction::Default | Direction::In)
    }

    /// Whether the keyword starts with OUT, which suppresses the input
    /// initializer (the native function only writes the value).
    pub fn starts_with_out(self) -> bool {
        matches!(self, Direction::Out | Direction::OutList)
    }

    /// The keyword as written in a signature, empty for [`Direction::Default`].
    pub fn keyword(self) -> &'static str {
        match self {
            Direction::Default => "",
            Direction::In => "IN",
            Direction::Out => "OUT",
            Direction::OutList => "OUTLIST",
            Direction::InOut => "IN_OUT",
            Direction::InOutList => "IN_OUTLIST",
        }
    }
}

/// The lifecycle state of the RETVAL parameter.
///
/// Promotion is one-directional: `Synthetic` → `SemiReal` → `Real`. A
/// fully-synthetic RETVAL was inserted automatically for a non-void return
/// type; writing `RETVAL` in the signature promotes it to semi-real
/// (position and slot become signature-declared, type still deferred), and
/// an explicit type — from the signature or an INPUT line — makes it real.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetvalState {
    /// Inserted automatically; not written in the signature.
    Synthetic,
    /// Written in the signature without an explicit type.
    SemiReal,
    /// Carries an explicit type; behaves like an ordinary parameter.
    Real,
}

/// One parameter's accumulated state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamNode {
    /// Direction modifier.
    pub direction: Direction,
    /// The variable identifier, the synthetic names `THIS`/`CLASS`/`RETVAL`,
    /// the written form `length(name)` of a length pseudo-parameter, or the
    /// literal placeholder `SV *`.
    pub name: String,
    /// 1-based index into the caller-supplied argument list. `None` for
    /// OUTLIST results and length pseudo-parameters.
    pub arg_slot: Option<u32>,
    /// Default expression text, if any.
    pub default: Option<String>,
    /// Pre-rendered usage-message suffix for the default.
    pub default_usage: Option<String>,
    /// Whether the signature carried a type annotation (or `length()`).
    pub typed_in_signature: bool,
    /// Suppress the input initializer; declaration only.
    pub no_init: bool,
    /// For `length(name)` pseudo-parameters, the bound parameter name.
    pub length_of: Option<String>,
    /// Pass the parameter's address to the native call.
    pub is_address_of: bool,
    /// Declared by an INPUT line without appearing in the signature.
    pub is_alien: bool,
    /// Synthetic THIS/CLASS entry, or RETVAL while still fully synthetic.
    pub is_synthetic: bool,
    /// Resolved C type string. May be refined after construction (RETVAL
    /// takes the declared return type until an explicit type arrives).
    pub c_type: Option<String>,
    /// Explicit initializer override from an INPUT line; bypasses the
    /// typemap template. At most one of this and `no_init` may be in
    /// effect at emission time.
    pub init_template: Option<String>,
    /// Extra deferred code fragment, appended after the parameter's own
    /// emission unconditionally.
    pub deferred_template: Option<String>,
    /// The parameter appeared in an INPUT block.
    pub in_input_block: bool,
    /// The parameter appeared in an OUTPUT block.
    pub in_output_block: bool,
    /// Whether output-side stores run container magic.
    pub set_magic: bool,
    /// Output-side code override from an OUTPUT line.
    pub output_code: Option<String>,
    /// Prototype character override cached from the typemap entry by
    /// [`ParamNode::check`].
    pub proto_override: Option<String>,
    /// RETVAL lifecycle state; `None` for every other parameter.
    pub retval: Option<RetvalState>,
}

impl ParamNode {
    /// A blank node with the given name and all flags at rest.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            direction: Direction::Default,
            name: name.into(),
            arg_slot: None,
            default: None,
            default_usage: None,
            typed_in_signature: false,
            no_init: false,
            length_of: None,
            is_address_of: false,
            is_alien: false,
            is_synthetic: false,
            c_type: None,
            init_template: None,
            deferred_template: None,
            in_input_block: false,
            in_output_block: false,
            set_magic: true,
            output_code: None,
            proto_override: None,
            retval: None,
        }
    }

    /// The fully-synthetic RETVAL inserted for a non-void return type.
    /// It consumes no argument slot and is declaration-only until promoted.
    pub(crate) fn synthetic_retval(return_type: &str) -> Self {
        let mut p = Self::new("RETVAL");
        p.retval = Some(RetvalState::Synthetic);
        p.is_synthetic = true;
        p.no_init = true;
        p.c_type = Some(return_type.to_string());
        p
    }

    /// Whether this is a `length(name)` pseudo-parameter bound to `name`.
    pub fn is_length_of(&self, name: &str) -> bool {
        self.length_of.as_deref() == Some(name)
    }

    /// The synthesized counter variable a length pseudo-parameter declares
    /// and passes to the native call.
    pub fn length_var(&self) -> Option<String> {
        self.length_of
            .as_deref()
            .map(|n| format!("XSauto_length_of_{n}"))
    }

    /// Promote a synthetic RETVAL to semi-real: it was written in the
    /// signature, so position and slot are now signature-declared, but the
    /// type stays deferred to the return type (or a later INPUT line).
    pub(crate) fn promote_retval_to_semi_real(&mut self) {
        debug_assert_eq!(self.retval, Some(RetvalState::Synthetic));
        self.retval = Some(RetvalState::SemiReal);
        self.is_synthetic = false;
    }

    /// Promote RETVAL to real: an explicit type arrived. Clears the
    /// synthetic and no-init flags; the parameter now behaves ordinarily.
    pub fn promote_retval_to_real(&mut self, ctype: impl Into<String>) {
        self.retval = Some(RetvalState::Real);
        self.is_synthetic = false;
        self.no_init = false;
        self.c_type = Some(ctype.into());
    }

    /// Apply a type from an INPUT line. For RETVAL this is the
    /// semi-real → real (or synthetic → real) promotion.
    pub fn set_type_from_input(&mut self, ctype: impl Into<String>) {
        self.in_input_block = true;
        if self.retval.is_some() {
            self.promote_retval_to_real(ctype);
        } else {
            self.c_type = Some(ctype.into());
        }
    }

    /// Look up this parameter's typemap entry and cache its prototype
    /// override character. A missing entry is a recoverable error: a
    /// diagnostic is recorded and `false` returned.
    pub fn check(&mut self, typemaps: &TypemapTables, diags: &mut Vec<Diagnostic>) -> bool {
        let Some(ctype) = &self.c_type else {
            return true;
        };
        let Some(entry) = typemaps.lookup_by_ctype(ctype) else {
            diags.push(
                Diagnostic::error(
                    codes::TYPEMAP_MISSING,
                    format!("could not find a typemap for C type '{ctype}'"),
                    None,
                )
                .with_context(BTreeMap::from([
                    ("param".into(), self.name.clone()),
                    ("ctype".into(), ctype.clone()),
                ])),
            );
            return false;
        };
        if let Some(p) = &entry.prototype
            && !p.is_empty()
        {
            self.proto_override = Some(p.clone());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sig::tables::{InputTemplate, TypemapEntry};

    fn tables() -> TypemapTables {
        TypemapTables::new(
            "1.0.0".into(),
            vec![
                TypemapEntry {
                    ctype: "int".into(),
                    xstype: "T_IV".into(),
                    prototype: None,
                },
                TypemapEntry {
                    ctype: "FILE *".into(),
                    xstype: "T_STDIO".into(),
                    prototype: Some("*".into()),
                },
            ],
            vec![InputTemplate::new("T_IV", "$var = ($type)xg_get_int($arg)")],
        )
    }

    #[test]
    fn direction_out_bound() {
        assert!(!Direction::Default.is_out_bound());
        assert!(!Direction::In.is_out_bound());
        assert!(Direction::Out.is_out_bound());
        assert!(Direction::OutList.is_out_bound());
        assert!(Direction::InOut.is_out_bound());
        assert!(Direction::InOutList.is_out_bound());
    }

    #[test]
    fn direction_starts_with_out() {
        assert!(Direction::Out.starts_with_out());
        assert!(Direction::OutList.starts_with_out());
        assert!(!Direction::InOut.starts_with_out());
        assert!(!Direction::InOutList.starts_with_out());
    }

    #[test]
    fn check_caches_prototype_override() {
        let mut p = ParamNode::new("fp");
        p.c_type = Some("FILE*".into());
        let mut diags = Vec::new();
        assert!(p.check(&tables(), &mut diags));
        assert_eq!(p.proto_override.as_deref(), Some("*"));
        assert!(diags.is_empty());
    }

    #[test]
    fn check_without_override_leaves_default() {
        let mut p = ParamNode::new("n");
        p.c_type = Some("int".into());
        let mut diags = Vec::new();
        assert!(p.check(&tables(), &mut diags));
        assert_eq!(p.proto_override, None);
    }

    #[test]
    fn check_missing_typemap_is_recoverable() {
        let mut p = ParamNode::new("x");
        p.c_type = Some("struct opaque *".into());
        let mut diags = Vec::new();
        assert!(!p.check(&tables(), &mut diags));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].id, codes::TYPEMAP_MISSING);
    }

    #[test]
    fn check_untyped_is_fine() {
        let mut p = ParamNode::new("x");
        let mut diags = Vec::new();
        assert!(p.check(&tables(), &mut diags));
        assert!(diags.is_empty());
    }

    #[test]
    fn retval_promotion_chain() {
        let mut p = ParamNode::synthetic_retval("int");
        assert_eq!(p.retval, Some(RetvalState::Synthetic));
        assert!(p.no_init && p.is_synthetic);

        p.promote_retval_to_semi_real();
        assert_eq!(p.retval, Some(RetvalState::SemiReal));
        assert!(!p.is_synthetic);
        assert!(p.no_init, "type still deferred, stays declaration-only");
        assert_eq!(p.c_type.as_deref(), Some("int"));

        p.promote_retval_to_real("long");
        assert_eq!(p.retval, Some(RetvalState::Real));
        assert!(!p.no_init);
        assert_eq!(p.c_type.as_deref(), Some("long"));
    }

    #[test]
    fn input_type_promotes_retval() {
        let mut p = ParamNode::synthetic_retval("int");
        p.set_type_from_input("double");
        assert_eq!(p.retval, Some(RetvalState::Real));
        assert!(p.in_input_block);
        assert_eq!(p.c_type.as_deref(), Some("double"));
    }

    #[test]
    fn length_var_name() {
        let mut p = ParamNode::new("length(s)");
        p.length_of = Some("s".into());
        assert!(p.is_length_of("s"));
        assert_eq!(p.length_var().as_deref(), Some("XSauto_length_of_s"));
    }
}
