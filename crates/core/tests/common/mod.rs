//! Shared test helpers for `xsubgen_core` integration tests.

#![allow(unreachable_pub)]

use std::sync::LazyLock;
use xsubgen_core::sig::parser::ParseResult;
use xsubgen_core::{Config, Diagnostic, SigNode, XsubMeta, parse_signature};
use xsubgen_typemaps::{InputTemplate, TypemapEntry, TypemapTables};

/// Typemap fixture shared by every test binary, built once via LazyLock.
/// Covers the simple-assignment, block, object/reference, string, and
/// array marshalling kinds.
pub static TABLES: LazyLock<TypemapTables> = LazyLock::new(|| {
    let entry = |ctype: &str, xstype: &str| TypemapEntry {
        ctype: ctype.into(),
        xstype: xstype.into(),
        prototype: None,
    };
    TypemapTables::new(
        "1.0.0".into(),
        vec![
            entry("int", "T_IV"),
            entry("long", "T_IV"),
            entry("double", "T_NV"),
            entry("char *", "T_PV"),
            entry("Widget *", "T_OBJECT"),
            entry("tick_fn", "T_SCOPED"),
            entry("intArray *", "T_ARRAY"),
            entry("quuxArray *", "T_ARRAY"),
            entry("int ( * )(int)", "T_FNPTR"),
            TypemapEntry {
                ctype: "FILE *".into(),
                xstype: "T_STDIO".into(),
                prototype: Some("*".into()),
            },
        ],
        vec![
            InputTemplate::new("T_IV", "$var = ($type)SvIV($arg)"),
            InputTemplate::new("T_NV", "$var = ($type)SvNV($arg)"),
            InputTemplate::new("T_PV", "$var = ($type)SvPV_nolen($arg)"),
            InputTemplate::new(
                "T_OBJECT",
                "if (sv_derived_from($arg, \"$ntype\")) {\n\
                 \tIV tmp = SvIV((SV*)SvRV($arg));\n\
                 \t$var = INT2PTR($type,tmp);\n\
                 }\n\
                 else\n\
                 \tcroak(\"$var is not of type $ntype\")",
            ),
            InputTemplate::new(
                "T_REF",
                "if (SvROK($arg)) {\n\
                 \tIV tmp = SvIV((SV*)SvRV($arg));\n\
                 \t$var = INT2PTR($type,tmp);\n\
                 }\n\
                 else\n\
                 \tcroak(\"$var is not a reference\")",
            ),
            InputTemplate::new("T_SCOPED", "$var = ($type)SvIV($arg) /* needs SCOPE */"),
            InputTemplate::new(
                "T_ARRAY",
                "U32 ix_$var;\n\
                 \tfor (ix_$var = $num - 1; ix_$var < items; ix_$var++) {\n\
                 \tDO_ARRAY_ELEM;\n\
                 \t}",
            ),
            InputTemplate::new("T_FNPTR", "$var = ($type)SvIV($arg)"),
            // T_STDIO has no input template on purpose: it exercises the
            // missing-input-template path.
        ],
    )
});

// ─── Parse helpers ───────────────────────────────────────────────────────────

/// Parse a plain function signature (no class, int return type).
pub fn parse(raw: &str) -> ParseResult {
    parse_signature(raw, &meta_returning("int"), &Config::default())
}

/// Parse with explicit metadata and default flags.
#[allow(dead_code)]
pub fn parse_with_meta(raw: &str, meta: &XsubMeta) -> ParseResult {
    parse_signature(raw, meta, &Config::default())
}

/// Metadata for a plain function with the given return type.
pub fn meta_returning(return_type: &str) -> XsubMeta {
    XsubMeta {
        func_name: "frob".into(),
        return_type: Some(return_type.into()),
        class_name: None,
        is_static: false,
    }
}

/// Metadata for an instance method on `Widget`.
#[allow(dead_code)]
pub fn method_meta(func_name: &str) -> XsubMeta {
    XsubMeta {
        func_name: func_name.into(),
        return_type: Some("int".into()),
        class_name: Some("Widget".into()),
        is_static: false,
    }
}

// ─── Result helpers ──────────────────────────────────────────────────────────

/// Collect parameter names in declaration order.
#[allow(dead_code)]
pub fn names(sig: &SigNode) -> Vec<String> {
    sig.params.iter().map(|p| p.name.clone()).collect()
}

/// Collect (name, arg_slot) pairs in declaration order.
#[allow(dead_code)]
pub fn slots(sig: &SigNode) -> Vec<(String, Option<u32>)> {
    sig.params
        .iter()
        .map(|p| (p.name.clone(), p.arg_slot))
        .collect()
}

/// Collect diagnostic codes.
#[allow(dead_code)]
pub fn diag_codes(diags: &[Diagnostic]) -> Vec<String> {
    diags.iter().map(|d| d.id.to_string()).collect()
}

/// Find the first diagnostic with the given code.
#[allow(dead_code)]
pub fn find_diag<'a>(diags: &'a [Diagnostic], code: &str) -> &'a Diagnostic {
    diags
        .iter()
        .find(|d| d.id == code)
        .unwrap_or_else(|| panic!("no diagnostic with code {code} in {diags:?}"))
}
