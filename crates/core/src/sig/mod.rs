/// Parameter fragment decomposition into direction/type/name/default.
pub mod decompose;
/// Re-exports from the diagnostics crate.
pub mod diag;
/// JSON serialization helpers for the signature model.
pub mod dump;
/// Glue-code emitter — generates per-parameter declarations and
/// initializers from typemap templates.
pub mod emit;
/// The whole-signature node: parameter list, counts, and query operations.
pub mod node;
/// The per-parameter node: accumulated state and typemap checks.
pub mod param;
/// Signature parser — orchestrates tokenizer and decomposer into a
/// [`node::SigNode`].
pub mod parser;
/// Re-exports of typemap dictionary types used by the parser and emitter.
pub mod tables;
/// Signature tokenizer — splits raw signature text into parameter
/// fragments, bracket/quote aware.
pub mod tokenizer;
/// XSUB unit metadata and calling-context feature flags.
pub mod unit;
