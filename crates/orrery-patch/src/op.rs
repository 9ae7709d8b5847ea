//! Structural patch operations.
//!
//! All document changes — local and authority-pushed — are expressed as
//! ordered sequences of these operations. They are:
//! - Serializable for network transmission
//! - Structural: paths name object fields, never sequence positions
//! - Invertible: the engine derives the inverse diff alongside the forward one

use serde::{Deserialize, Serialize};

use crate::path::FieldPath;

/// A single structural operation on the document tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    /// Insert a field that did not exist in the source document.
    Add {
        path: FieldPath,
        value: serde_json::Value,
    },
    /// Remove a field.
    Remove { path: FieldPath },
    /// Overwrite a field's value wholesale. Sequence reorders arrive as a
    /// replace of the entire sequence field.
    Replace {
        path: FieldPath,
        value: serde_json::Value,
    },
}

impl PatchOp {
    /// The path this operation targets.
    pub fn path(&self) -> &FieldPath {
        match self {
            PatchOp::Add { path, .. } => path,
            PatchOp::Remove { path } => path,
            PatchOp::Replace { path, .. } => path,
        }
    }

    /// The carried value, if any.
    pub fn value(&self) -> Option<&serde_json::Value> {
        match self {
            PatchOp::Add { value, .. } | PatchOp::Replace { value, .. } => Some(value),
            PatchOp::Remove { .. } => None,
        }
    }
}

/// An ordered sequence of operations describing one document transition.
pub type Diff = Vec<PatchOp>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let op = PatchOp::Replace {
            path: FieldPath::from(["bonds", "x"]),
            value: serde_json::json!(7),
        };
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, r#"{"op":"replace","path":["bonds","x"],"value":7}"#);
    }

    #[test]
    fn test_remove_carries_no_value() {
        let op = PatchOp::Remove { path: FieldPath::from(["cells", "dead"]) };
        assert!(op.value().is_none());
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, r#"{"op":"remove","path":["cells","dead"]}"#);
        let parsed: PatchOp = serde_json::from_str(&json).unwrap();
        assert_eq!(op, parsed);
    }

    #[test]
    fn test_positional_op_fails_deserialization() {
        let wire = r#"{"op":"replace","path":["cell_order",2],"value":"x"}"#;
        assert!(serde_json::from_str::<PatchOp>(wire).is_err());
    }
}
