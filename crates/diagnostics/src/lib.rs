//! Diagnostics for the xsubgen toolchain.
//!
//! Provides [`Diagnostic`], [`Severity`], and [`Span`] types used to report
//! errors and warnings from the signature parser and the glue-code emitter.
//! Diagnostic codes are defined in the [`codes`] module.

#![warn(missing_docs)]

/// Diagnostic ID constants auto-generated from the spec.
pub mod codes;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Severity level for a diagnostic message.
///
/// Fatal internal invariant violations are not diagnostics — those are
/// modeled as hard `Result` errors by the emitting crate and abort the
/// current unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Severity {
    /// Recoverable error — the offending parameter or unit is skipped and
    /// the overall compilation is marked failed.
    Error,
    /// Warning — processing continues unaffected.
    Warn,
    /// Informational note.
    Info,
}

/// Byte span in the raw signature text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the first character (0-based).
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

impl Span {
    /// Create a span covering `[start, end)`.
    ///
    /// Panics if `end < start`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(end >= start, "Span end ({end}) < start ({start})");
        Self { start, end }
    }

    /// Create a zero-width span at the given position.
    pub fn empty(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }
}

/// A diagnostic message produced by the parser or emitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Unique diagnostic code (e.g., `"XSG1103"`).
    pub id: Cow<'static, str>,
    /// Severity level.
    pub severity: Severity,
    /// Human-readable diagnostic message.
    pub message: String,
    /// Optional byte span in the raw signature text that this diagnostic
    /// relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Machine-readable context for tooling. Keys and values are free-form
    /// strings. Absent when no context is applicable.
    ///
    /// Uses `BTreeMap` for deterministic key ordering in serialized output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<BTreeMap<String, String>>,
}

impl Diagnostic {
    /// Create a diagnostic with the given fields.
    pub fn new(
        id: impl Into<Cow<'static, str>>,
        severity: Severity,
        message: impl Into<String>,
        span: Option<Span>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            message: message.into(),
            span,
            context: None,
        }
    }

    /// Shorthand for an `Error` diagnostic.
    pub fn error(
        id: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
        span: Option<Span>,
    ) -> Self {
        Self::new(id, Severity::Error, message, span)
    }

    /// Shorthand for a `Warn` diagnostic.
    pub fn warn(
        id: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
        span: Option<Span>,
    ) -> Self {
        Self::new(id, Severity::Warn, message, span)
    }

    /// Shorthand for an `Info` diagnostic.
    pub fn info(
        id: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
        span: Option<Span>,
    ) -> Self {
        Self::new(id, Severity::Info, message, span)
    }

    /// Attach machine-readable context metadata (builder pattern).
    ///
    /// Context is a set of key-value string pairs providing structured
    /// details about the diagnostic for tooling, filtering, and programmatic
    /// consumption. Keys are short descriptors like `"param"`, `"ctype"`,
    /// `"xstype"`, etc.
    pub fn with_context(mut self, ctx: BTreeMap<String, String>) -> Self {
        self.context = Some(ctx);
        self
    }

    /// Returns the human-readable explanation for this diagnostic's code,
    /// if available.
    pub fn explain(&self) -> Option<&'static str> {
        explain(&self.id)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warn => write!(f, "warn"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.id, self.message)
    }
}

/// Returns the human-readable explanation for a diagnostic code, if known.
///
/// Auto-generated from `spec/diagnostics.json` at build time.
pub fn explain(id: &str) -> Option<&'static str> {
    include!(concat!(env!("OUT_DIR"), "/generated_explain.rs"))
}

/// Returns the default severity for a diagnostic code, if known.
///
/// Auto-generated from `spec/diagnostics.json` at build time.
pub fn default_severity(id: &str) -> Option<Severity> {
    include!(concat!(env!("OUT_DIR"), "/generated_severity.rs"))
}
