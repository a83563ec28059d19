//! xsubgen core library.
//!
//! Parses one extension-subroutine (XSUB) signature into a typed parameter
//! model and emits the per-parameter marshalling glue that moves values
//! between the dynamic host runtime and the native function. The main entry
//! points are [`parse_signature`] for parsing, [`ParamNode::emit`] for code
//! generation, and the [`SigNode`] query operations.

#![warn(missing_docs)]

/// Signature grammar: tokenizer, decomposer, parameter model, parser,
/// emitter, and related utilities.
pub mod sig;

// ── Convenience re-exports ──────────────────────────────────────────────────
// Flat imports for the most common entry points. The full module paths
// remain available for less common types.

// Parser
pub use sig::parser::{ParseResult, parse_signature};

// Model
pub use sig::node::SigNode;
pub use sig::param::{Direction, ParamNode, RetvalState};

// Unit metadata and feature flags
pub use sig::unit::{Config, XsubMeta};

// Emitter
pub use sig::emit::{EmitContext, InternalError};

// Diagnostics (re-exported from the diagnostics crate)
pub use sig::diag::{Diagnostic, Severity, Span, codes};

// Serialization helpers
pub use sig::dump::to_pretty_json;
