//! Re-exports from the diagnostics crate, so downstream code can use
//! `xsubgen_core::sig::diag::*` without a separate dependency.

pub use xsubgen_diagnostics::{Diagnostic, Severity, Span, codes, default_severity, explain};
