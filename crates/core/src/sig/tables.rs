//! Re-exports of typemap dictionary types used by the parser and emitter.

pub use xsubgen_typemaps::{
    InputTemplate, Segment, Template, TemplateVars, TypemapEntry, TypemapTables, tidy_type, xstype,
};
