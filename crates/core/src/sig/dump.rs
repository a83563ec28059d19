//! JSON serialization helpers for the signature model.

use super::node::SigNode;

/// Serialize a signature node to a pretty-printed JSON string.
pub fn to_pretty_json(sig: &SigNode) -> String {
    serde_json::to_string_pretty(sig).expect("SigNode serialization cannot fail")
}
