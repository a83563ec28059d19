//! The whole-signature node.
//!
//! A [`SigNode`] owns the ordered parameter list for one XSUB (or one
//! CASE-clause re-parse), a name index, and the derived argument counts.
//! It is transient: created once per unit and dropped after that unit's
//! code generation.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::diag::{Diagnostic, codes};
use super::param::{Direction, ParamNode};

/// One XSUB's full parameter set.
#[derive(Debug, Clone, Serialize)]
pub struct SigNode {
    /// Original signature text, continuation markers already normalized
    /// to spaces.
    pub raw_text: String,
    /// Parameters in declaration order: THIS/CLASS first when applicable,
    /// then signature order, with a fully-synthetic RETVAL appended last.
    pub params: Vec<ParamNode>,
    /// Whether the signature ended in `...`.
    pub saw_ellipsis: bool,
    /// Number of caller argument slots.
    pub total_args: u32,
    /// `total_args` minus the number of defaulted slot parameters.
    pub min_required_args: u32,
    /// Explicit override of the native call's argument list.
    pub call_args_override: Option<String>,

    /// Name → index into `params`. Names are unique.
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl SigNode {
    pub(crate) fn new(
        raw_text: String,
        params: Vec<ParamNode>,
        saw_ellipsis: bool,
        total_args: u32,
        min_required_args: u32,
    ) -> Self {
        let by_name = params
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), i))
            .collect();
        Self {
            raw_text,
            params,
            saw_ellipsis,
            total_args,
            min_required_args,
            call_args_override: None,
            by_name,
        }
    }

    /// Look up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&ParamNode> {
        self.by_name.get(name).map(|&i| &self.params[i])
    }

    /// Look up a parameter by name for mutation. This is the interface the
    /// INPUT/OUTPUT directive pass uses to refine parameters after parse.
    pub fn param_mut(&mut self, name: &str) -> Option<&mut ParamNode> {
        self.by_name.get(name).map(|&i| &mut self.params[i])
    }

    /// Append a parameter declared by an INPUT line that never appeared in
    /// the signature. Returns `None` (leaving the node untouched) if the
    /// name is already taken.
    pub fn push_alien_param(&mut self, name: &str) -> Option<&mut ParamNode> {
        if self.by_name.contains_key(name) {
            return None;
        }
        let mut p = ParamNode::new(name);
        p.is_alien = true;
        self.by_name.insert(name.to_string(), self.params.len());
        self.params.push(p);
        self.params.last_mut()
    }

    /// Whether a `length(name)` pseudo-parameter exists for `name`.
    pub fn has_length_param_for(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.is_length_of(name))
    }

    // ── Query operations ────────────────────────────────────────────────

    /// The usage string for diagnostics: each slot-consuming parameter's
    /// name plus its rendered default suffix, comma separated, with a
    /// trailing `...` when the signature was variadic.
    pub fn usage_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for p in &self.params {
            if p.arg_slot.is_none() {
                continue;
            }
            let mut s = p.name.clone();
            if let Some(d) = &p.default_usage {
                s.push_str(d);
            }
            parts.push(s);
        }
        let mut out = parts.join(", ");
        if self.saw_ellipsis {
            if out.is_empty() {
                out.push_str("...");
            } else {
                out.push_str(", ...");
            }
        }
        out
    }

    /// The argument list passed to the underlying native call.
    ///
    /// Skips fully-synthetic THIS/CLASS/RETVAL (a promoted RETVAL is
    /// included), skips parameters bound to no slot unless they are
    /// OUTLIST results or length pseudo-parameters (which contribute their
    /// synthesized counter variable), and prefixes `&` for address-of or
    /// OUT-bound parameters. Using the `SV *` placeholder here is a
    /// recoverable error.
    pub fn native_call_arguments(&self, diags: &mut Vec<Diagnostic>) -> String {
        if let Some(o) = &self.call_args_override {
            return o.clone();
        }
        let mut parts: Vec<String> = Vec::new();
        for p in &self.params {
            if p.is_synthetic {
                continue;
            }
            let name = if let Some(v) = p.length_var() {
                v
            } else if p.arg_slot.is_some() || p.direction == Direction::OutList {
                if p.name == "SV *" {
                    diags.push(
                        Diagnostic::error(
                            codes::PLACEHOLDER_CALL_ARG,
                            "cannot use an 'SV *' placeholder parameter as a native call argument",
                            None,
                        )
                        .with_context(BTreeMap::from([(
                            "slot".into(),
                            p.arg_slot.map_or_else(String::new, |n| n.to_string()),
                        )])),
                    );
                    continue;
                }
                p.name.clone()
            } else {
                continue;
            };
            let prefix = if p.is_address_of || p.direction.is_out_bound() {
                "&"
            } else {
                ""
            };
            parts.push(format!("{prefix}{name}"));
        }
        parts.join(", ")
    }

    /// The short-form runtime prototype: one character per slot-bound
    /// parameter (the typemap override cached by `check`, `$` otherwise),
    /// a `;` before the first optional slot, and a trailing `@` when the
    /// signature was variadic.
    pub fn prototype_string(&self) -> String {
        let mut out = String::new();
        let mut emitted = 0u32;
        for p in &self.params {
            if p.arg_slot.is_none() {
                continue;
            }
            if emitted == self.min_required_args && self.min_required_args < self.total_args {
                out.push(';');
            }
            out.push_str(p.proto_override.as_deref().unwrap_or("$"));
            emitted += 1;
        }
        if self.saw_ellipsis {
            if self.min_required_args == self.total_args {
                out.push(';');
            }
            out.push('@');
        }
        out
    }
}
