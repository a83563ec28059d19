//! Typemap dictionary for the xsubgen toolchain.
//!
//! A typemap maps a C-like type string to an *xstype* tag, and each xstype
//! tag to an input-code [`Template`] that marshals one caller argument into
//! a native variable. The tables are deserialized from JSON and consumed by
//! the signature parser and the glue-code emitter.

mod template;

pub use template::{Segment, Template, TemplateVars};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Current format version for the typemap table JSON schema.
pub const TABLE_FORMAT_VERSION: &str = "0.1.0";

/// Well-known xstype tags the emitter special-cases.
pub mod xstype {
    /// Generic string-without-length marshalling.
    pub const T_PV: &str = "T_PV";
    /// Blessed object pointer with a class-membership check.
    pub const T_OBJECT: &str = "T_OBJECT";
    /// Reference-only counterpart of [`T_OBJECT`] (no class check).
    pub const T_REF: &str = "T_REF";
    /// Packed array with per-element marshalling.
    pub const T_ARRAY: &str = "T_ARRAY";
}

/// One typemap row: a C type and the xstype tag it marshals through.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypemapEntry {
    /// The C type string, in [`tidy_type`] normal form (e.g., `"char *"`).
    pub ctype: String,
    /// The xstype tag naming the marshalling strategy (e.g., `"T_IV"`).
    pub xstype: String,
    /// Optional runtime-prototype character override for this type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prototype: Option<String>,
}

/// One input-code template row, keyed by xstype tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputTemplate {
    /// The xstype tag this template is registered for.
    pub xstype: String,
    /// Raw template text with `$var`/`$type`/`$ntype`/`$arg`/`$num`
    /// placeholders and, for array kinds, the `DO_ARRAY_ELEM` marker.
    pub code: String,

    /// Parsed form of `code`, built lazily on first access.
    #[serde(skip)]
    parsed: OnceLock<Template>,
}

impl InputTemplate {
    /// Create a template row from an xstype tag and raw template text.
    pub fn new(xstype: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            xstype: xstype.into(),
            code: code.into(),
            parsed: OnceLock::new(),
        }
    }

    /// The parsed template, built lazily on first access and cached.
    pub fn template(&self) -> &Template {
        self.parsed.get_or_init(|| Template::parse(&self.code))
    }
}

/// Top-level container for the typemap dictionary.
///
/// Read-only shared state for a whole run: it is queried during parsing
/// (prototype characters) and emission (marshalling templates) and never
/// mutated in between.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypemapTables {
    /// Typemap schema version (e.g., `"1.0.0"`).
    pub schema_version: String,
    /// Table format version for compatibility checks.
    #[serde(default = "default_format_version")]
    pub format_version: String,
    /// All typemap rows.
    pub entries: Vec<TypemapEntry>,
    /// All input-code template rows.
    pub input_templates: Vec<InputTemplate>,

    /// Cached map from normalized ctype → index into `entries`.
    #[serde(skip)]
    ctype_map: OnceLock<HashMap<String, usize>>,
    /// Cached map from xstype tag → index into `input_templates`.
    #[serde(skip)]
    input_map: OnceLock<HashMap<String, usize>>,
}

fn default_format_version() -> String {
    TABLE_FORMAT_VERSION.to_string()
}

impl TypemapTables {
    /// Create a new `TypemapTables` with the given rows.
    /// Cache fields are initialized lazily on first access.
    pub fn new(
        schema_version: String,
        entries: Vec<TypemapEntry>,
        input_templates: Vec<InputTemplate>,
    ) -> Self {
        Self {
            schema_version,
            format_version: default_format_version(),
            entries,
            input_templates,
            ctype_map: OnceLock::new(),
            input_map: OnceLock::new(),
        }
    }

    /// Returns the cached ctype → index map, building it lazily.
    /// Keys are stored in [`tidy_type`] normal form; a later duplicate
    /// ctype row overrides an earlier one, matching typemap file semantics.
    fn ctype_map(&self) -> &HashMap<String, usize> {
        self.ctype_map.get_or_init(|| {
            let mut m = HashMap::new();
            for (i, e) in self.entries.iter().enumerate() {
                m.insert(tidy_type(&e.ctype), i);
            }
            m
        })
    }

    fn input_map(&self) -> &HashMap<String, usize> {
        self.input_map.get_or_init(|| {
            let mut m = HashMap::new();
            for (i, t) in self.input_templates.iter().enumerate() {
                m.insert(t.xstype.clone(), i);
            }
            m
        })
    }

    /// Look up the typemap entry for a C type string.
    ///
    /// The type is normalized with [`tidy_type`] before the lookup, so
    /// `"char  *"` and `"char*"` resolve to the same row. Uses a cached
    /// `HashMap` for O(1) lookup.
    pub fn lookup_by_ctype(&self, ctype: &str) -> Option<&TypemapEntry> {
        self.ctype_map()
            .get(&tidy_type(ctype))
            .map(|&i| &self.entries[i])
    }

    /// Look up the input-code template registered for an xstype tag.
    pub fn input_template(&self, xstype: &str) -> Option<&InputTemplate> {
        self.input_map()
            .get(xstype)
            .map(|&i| &self.input_templates[i])
    }
}

/// Normalize a C type string into typemap lookup-key form.
///
/// Star runs are joined (whitespace inside a bunch removed), then spaced as
/// a single token; all other whitespace collapses to single spaces and the
/// ends are trimmed. `"char  *"` → `"char *"`, `"char**"` → `"char **"`,
/// `"unsigned   long"` → `"unsigned long"`.
pub fn tidy_type(raw: &str) -> String {
    // Join star bunches: whitespace before a '*' is dropped.
    let mut joined = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '*' {
            while joined.ends_with(|p: char| p.is_whitespace()) {
                joined.pop();
            }
            joined.push('*');
        } else {
            joined.push(c);
        }
    }

    // Space each star bunch as its own token.
    let mut spaced = String::with_capacity(joined.len() + 2);
    let mut chars = joined.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '*' {
            if !spaced.ends_with(' ') && !spaced.is_empty() {
                spaced.push(' ');
            }
            spaced.push('*');
            while chars.peek() == Some(&'*') {
                spaced.push(chars.next().unwrap());
            }
            spaced.push(' ');
        } else {
            spaced.push(c);
        }
    }

    // Collapse runs of whitespace and trim the ends.
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tables() -> TypemapTables {
        TypemapTables::new(
            "1.0.0".into(),
            vec![
                TypemapEntry {
                    ctype: "int".into(),
                    xstype: "T_IV".into(),
                    prototype: None,
                },
                TypemapEntry {
                    ctype: "char *".into(),
                    xstype: xstype::T_PV.into(),
                    prototype: Some("$".into()),
                },
            ],
            vec![
                InputTemplate::new("T_IV", "$var = ($type)xg_get_int($arg)"),
                InputTemplate::new(xstype::T_PV, "$var = ($type)xg_get_str($arg)"),
            ],
        )
    }

    // ── tidy_type ───────────────────────────────────────────────────────

    #[test]
    fn tidy_collapses_whitespace() {
        assert_eq!(tidy_type("  unsigned   long  "), "unsigned long");
    }

    #[test]
    fn tidy_spaces_single_star() {
        assert_eq!(tidy_type("char  *"), "char *");
        assert_eq!(tidy_type("char*"), "char *");
    }

    #[test]
    fn tidy_joins_star_bunches() {
        assert_eq!(tidy_type("char**"), "char **");
        assert_eq!(tidy_type("char * *"), "char **");
        assert_eq!(tidy_type("char\t*  *"), "char **");
    }

    #[test]
    fn tidy_interior_stars() {
        assert_eq!(tidy_type("int (*)(int, char *)"), "int ( * )(int, char * )");
    }

    #[test]
    fn tidy_empty() {
        assert_eq!(tidy_type(""), "");
        assert_eq!(tidy_type("   "), "");
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    #[test]
    fn lookup_normalizes_key() {
        let t = sample_tables();
        assert_eq!(t.lookup_by_ctype("char*").unwrap().xstype, "T_PV");
        assert_eq!(t.lookup_by_ctype("  char   *").unwrap().xstype, "T_PV");
        assert!(t.lookup_by_ctype("short").is_none());
    }

    #[test]
    fn input_template_lookup() {
        let t = sample_tables();
        assert!(t.input_template("T_IV").is_some());
        assert!(t.input_template("T_NONE").is_none());
    }

    #[test]
    fn later_duplicate_ctype_wins() {
        let mut t = sample_tables();
        t.entries.push(TypemapEntry {
            ctype: "int".into(),
            xstype: "T_UV".into(),
            prototype: None,
        });
        assert_eq!(t.lookup_by_ctype("int").unwrap().xstype, "T_UV");
    }

    // ── Serde ───────────────────────────────────────────────────────────

    #[test]
    fn tables_serde_roundtrip() {
        let t = sample_tables();
        let json = serde_json::to_string(&t).unwrap();
        let t2: TypemapTables = serde_json::from_str(&json).unwrap();
        assert_eq!(t2.entries.len(), 2);
        assert_eq!(t2.input_templates.len(), 2);
        assert_eq!(t2.lookup_by_ctype("int").unwrap().xstype, "T_IV");
    }

    #[test]
    fn format_version_defaults_when_absent() {
        let json = r#"{"schemaVersion":"1.0.0","entries":[],"inputTemplates":[]}"#;
        let t: TypemapTables = serde_json::from_str(json).unwrap();
        assert_eq!(t.format_version, TABLE_FORMAT_VERSION);
    }
}
