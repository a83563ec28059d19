//! Per-XSUB metadata and calling-context feature flags.
//!
//! Both are supplied by the driver and passed explicitly through every
//! parse and emit call — there is no ambient configuration state.

use serde::{Deserialize, Serialize};

/// Feature flags of the calling context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Whether parameter type annotations are accepted in signatures.
    pub allow_argtypes: bool,
    /// Whether IN/OUT/OUTLIST direction modifiers are accepted.
    pub allow_inout: bool,
    /// Whether hierarchical type names (`Some::Class`) are kept as written.
    /// When false, every `:` is flattened to `_` for native declarations.
    pub hiertype: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_argtypes: true,
            allow_inout: true,
            hiertype: false,
        }
    }
}

/// Metadata for the XSUB whose signature is being processed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XsubMeta {
    /// The subroutine's name, as declared in the binding spec.
    pub func_name: String,
    /// Declared native return type. `None` or `"void"` means no RETVAL.
    pub return_type: Option<String>,
    /// Enclosing class name; `Some` makes this a method and prepends the
    /// synthetic THIS (or CLASS) parameter at slot 1.
    pub class_name: Option<String>,
    /// Whether the method is static. Static methods and constructors
    /// receive CLASS (the class name string) instead of THIS.
    pub is_static: bool,
}

impl XsubMeta {
    /// Whether the unit returns a value, i.e. a RETVAL exists.
    pub fn has_retval(&self) -> bool {
        matches!(&self.return_type, Some(t) if t.trim() != "void")
    }

    /// Whether the synthetic first parameter is CLASS rather than THIS.
    /// Constructors (named `new`) and static methods take the class name
    /// string; ordinary methods take the object itself.
    pub fn takes_class(&self) -> bool {
        self.is_static || self.func_name == "new"
    }

    /// Whether this unit is a destructor. Destructor calls skip the
    /// class-membership check when unwrapping their object argument.
    pub fn is_destructor(&self) -> bool {
        self.func_name.ends_with("DESTROY")
    }
}
