//! Diff computation and patch application.
//!
//! The engine works over the serde-JSON form of a document: objects (structs
//! and string-keyed maps) are compared field by field; everything else —
//! scalars and sequences alike — is a leaf, replaced wholesale when it
//! differs. That makes positional edits unrepresentable by construction and
//! keeps a `cell_order` reorder a single `replace` of the whole sequence.
//!
//! # Round-trip law
//!
//! For any document `A` and pure mutation `f` with `B = f(A)`:
//! `apply(forward, A) == B` and `apply(inverse, B) == A`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

use crate::op::{Diff, PatchOp};
use crate::path::FieldPath;

/// Error applying or producing a diff.
#[derive(Error, Debug)]
pub enum PatchError {
    /// A path tried to walk through a sequence. Sequences are leaves; a diff
    /// that addresses into one was built positionally and must never be
    /// applied or transmitted.
    #[error("cannot descend into a sequence at '{0}' — sequences are replaced wholesale")]
    PositionalDescent(FieldPath),
    /// An intermediate path segment does not exist in the target document.
    #[error("path '{0}' not found")]
    PathNotFound(FieldPath),
    /// A path segment landed on a scalar where an object was required.
    #[error("value at '{0}' is not an object")]
    NotAnObject(FieldPath),
    /// `remove` with an empty path.
    #[error("cannot remove the document root")]
    RemoveRoot,
    /// Document (de)serialization failed.
    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Apply a mutation to a copy of `base`, returning the mutated value together
/// with the forward diff (`base` → result) and the inverse diff (result →
/// `base`).
pub fn produce_with_patches<T, F>(base: &T, mutate: F) -> Result<(T, Diff, Diff), PatchError>
where
    T: Clone + Serialize,
    F: FnOnce(&mut T),
{
    let mut next = base.clone();
    mutate(&mut next);
    let a = serde_json::to_value(base)?;
    let b = serde_json::to_value(&next)?;
    let forward = diff_values(&a, &b);
    let inverse = diff_values(&b, &a);
    Ok((next, forward, inverse))
}

/// Compute the structural diff between two JSON values.
pub fn diff_values(a: &Value, b: &Value) -> Diff {
    let mut ops = Vec::new();
    let mut path = Vec::new();
    diff_at(&mut path, a, b, &mut ops);
    ops
}

fn diff_at(path: &mut Vec<String>, a: &Value, b: &Value, out: &mut Diff) {
    if a == b {
        return;
    }
    match (a, b) {
        (Value::Object(ao), Value::Object(bo)) => {
            for (key, av) in ao {
                match bo.get(key) {
                    Some(bv) => {
                        path.push(key.clone());
                        diff_at(path, av, bv, out);
                        path.pop();
                    }
                    None => out.push(PatchOp::Remove {
                        path: child_path(path, key),
                    }),
                }
            }
            for (key, bv) in bo {
                if !ao.contains_key(key) {
                    out.push(PatchOp::Add {
                        path: child_path(path, key),
                        value: bv.clone(),
                    });
                }
            }
        }
        // Scalars, sequences, and type changes: replace the whole value.
        _ => out.push(PatchOp::Replace {
            path: FieldPath::new(path.iter().cloned()),
            value: b.clone(),
        }),
    }
}

fn child_path(path: &[String], key: &str) -> FieldPath {
    let mut p = FieldPath::new(path.iter().cloned());
    p.push(key);
    p
}

/// Apply a diff to a structurally-identical copy of the document it was
/// produced against, yielding the patched document.
pub fn apply_patches<T>(base: &T, diff: &[PatchOp]) -> Result<T, PatchError>
where
    T: Serialize + DeserializeOwned,
{
    let mut root = serde_json::to_value(base)?;
    for op in diff {
        apply_op(&mut root, op)?;
    }
    trace!(ops = diff.len(), "applied diff");
    Ok(serde_json::from_value(root)?)
}

fn apply_op(root: &mut Value, op: &PatchOp) -> Result<(), PatchError> {
    let tokens = op.path().tokens();

    let Some((last, parents)) = tokens.split_last() else {
        // Whole-document operation.
        return match op {
            PatchOp::Remove { .. } => Err(PatchError::RemoveRoot),
            PatchOp::Add { value, .. } | PatchOp::Replace { value, .. } => {
                *root = value.clone();
                Ok(())
            }
        };
    };

    let mut cursor = &mut *root;
    let mut walked: Vec<String> = Vec::with_capacity(tokens.len());
    for token in parents {
        walked.push(token.clone());
        cursor = match cursor {
            Value::Object(map) => map
                .get_mut(token)
                .ok_or_else(|| PatchError::PathNotFound(FieldPath::new(walked.clone())))?,
            Value::Array(_) => {
                return Err(PatchError::PositionalDescent(FieldPath::new(walked)));
            }
            _ => return Err(PatchError::NotAnObject(FieldPath::new(walked))),
        };
    }

    match cursor {
        Value::Object(map) => {
            match op {
                // `add` of an existing field degrades to an overwrite: the
                // authority's copy may have drifted, last write wins.
                PatchOp::Add { value, .. } | PatchOp::Replace { value, .. } => {
                    map.insert(last.clone(), value.clone());
                }
                // Removing an already-absent field is a no-op — the same
                // eventual-consistency stance as unknown run-state entries.
                PatchOp::Remove { .. } => {
                    map.remove(last.as_str());
                }
            }
            Ok(())
        }
        Value::Array(_) => Err(PatchError::PositionalDescent(op.path().clone())),
        _ => Err(PatchError::NotAnObject(op.path().clone())),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_types::{CellData, NotebookDocument, NotebookId};
    use serde_json::json;

    fn doc_with_cells(codes: &[&str]) -> NotebookDocument {
        let mut doc = NotebookDocument::new(NotebookId::new());
        for (i, code) in codes.iter().enumerate() {
            doc.insert_cell_at(CellData::new(*code), i);
        }
        doc
    }

    /// Assert the round-trip law for one mutation of `base`.
    fn assert_roundtrip<F: FnOnce(&mut NotebookDocument)>(base: &NotebookDocument, f: F) {
        let (next, forward, inverse) = produce_with_patches(base, f).unwrap();
        let replayed: NotebookDocument = apply_patches(base, &forward).unwrap();
        assert_eq!(replayed, next, "forward diff must reproduce the mutation");
        let reverted: NotebookDocument = apply_patches(&next, &inverse).unwrap();
        assert_eq!(&reverted, base, "inverse diff must undo the mutation");
    }

    #[test]
    fn test_no_change_produces_empty_diff() {
        let doc = doc_with_cells(&["a = 1"]);
        let (_, forward, inverse) = produce_with_patches(&doc, |_| {}).unwrap();
        assert!(forward.is_empty());
        assert!(inverse.is_empty());
    }

    #[test]
    fn test_scalar_field_replace() {
        let doc = doc_with_cells(&[]);
        let (_, forward, _) = produce_with_patches(&doc, |d| {
            d.path = "/home/amy/nb.jl".into();
            d.in_temp_dir = false;
        })
        .unwrap();
        assert_eq!(forward.len(), 2);
        assert!(forward.iter().all(|op| matches!(op, PatchOp::Replace { .. })));
    }

    #[test]
    fn test_cell_insert_is_add_plus_order_replace() {
        let doc = doc_with_cells(&["a = 1"]);
        let (_, forward, _) = produce_with_patches(&doc, |d| {
            d.insert_cell_at(CellData::new("b = 2"), 1);
        })
        .unwrap();

        // One add under `cells`, one wholesale replace of `cell_order`.
        let adds: Vec<_> = forward
            .iter()
            .filter(|op| matches!(op, PatchOp::Add { .. }))
            .collect();
        assert_eq!(adds.len(), 1);
        assert_eq!(adds[0].path().head(), Some("cells"));

        let order_ops: Vec<_> = forward
            .iter()
            .filter(|op| op.path().head() == Some("cell_order"))
            .collect();
        assert_eq!(order_ops.len(), 1);
        assert!(matches!(order_ops[0], PatchOp::Replace { .. }));
        assert_eq!(order_ops[0].path().len(), 1, "sequence replaced at its field");
    }

    #[test]
    fn test_reorder_never_produces_positional_paths() {
        let doc = doc_with_cells(&["a", "b", "c"]);
        let (_, forward, inverse) = produce_with_patches(&doc, |d| {
            d.cell_order.swap(0, 2);
        })
        .unwrap();
        for op in forward.iter().chain(inverse.iter()) {
            assert_eq!(op.path().tokens(), ["cell_order"]);
            assert!(matches!(op, PatchOp::Replace { .. }));
        }
    }

    #[test]
    fn test_roundtrip_law_across_mutations() {
        let doc = doc_with_cells(&["a = 1", "b = a + 1"]);
        let id = doc.cell_order[0];

        assert_roundtrip(&doc, |d| {
            d.cells.get_mut(&id).unwrap().code = "a = 2".into();
        });
        assert_roundtrip(&doc, |d| {
            d.insert_cell_at(CellData::new("c = 3"), 0);
        });
        assert_roundtrip(&doc, |d| {
            d.remove_cell(&id);
        });
        assert_roundtrip(&doc, |d| {
            d.bonds.insert("slider".into(), json!([1, 2, 3]));
        });
        assert_roundtrip(&doc, |d| {
            d.cell_order.reverse();
            d.cells.get_mut(&id).unwrap().folded = true;
        });
    }

    #[test]
    fn test_inverse_of_add_is_remove() {
        let doc = doc_with_cells(&[]);
        let (next, forward, inverse) = produce_with_patches(&doc, |d| {
            d.bonds.insert("x".into(), json!(1));
        })
        .unwrap();
        assert!(matches!(&forward[0], PatchOp::Add { .. }));
        assert!(matches!(&inverse[0], PatchOp::Remove { .. }));
        let reverted: NotebookDocument = apply_patches(&next, &inverse).unwrap();
        assert!(reverted.bonds.is_empty());
    }

    #[test]
    fn test_remove_of_absent_field_is_noop() {
        let doc = doc_with_cells(&["a = 1"]);
        let diff = vec![PatchOp::Remove {
            path: FieldPath::from(["bonds", "never_existed"]),
        }];
        let patched: NotebookDocument = apply_patches(&doc, &diff).unwrap();
        assert_eq!(patched, doc);
    }

    #[test]
    fn test_descent_into_sequence_is_rejected() {
        let doc = doc_with_cells(&["a = 1"]);
        let diff = vec![PatchOp::Replace {
            path: FieldPath::from(["cell_order", "0"]),
            value: json!("nope"),
        }];
        let err = apply_patches::<NotebookDocument>(&doc, &diff).unwrap_err();
        assert!(matches!(err, PatchError::PositionalDescent(_)));
    }

    #[test]
    fn test_missing_parent_is_path_not_found() {
        let doc = doc_with_cells(&[]);
        let diff = vec![PatchOp::Replace {
            path: FieldPath::from(["cells", "no-such-cell", "code"]),
            value: json!("x"),
        }];
        let err = apply_patches::<NotebookDocument>(&doc, &diff).unwrap_err();
        assert!(matches!(err, PatchError::PathNotFound(_)));
    }

    #[test]
    fn test_remove_root_is_rejected() {
        let doc = doc_with_cells(&[]);
        let diff = vec![PatchOp::Remove { path: FieldPath::root() }];
        let err = apply_patches::<NotebookDocument>(&doc, &diff).unwrap_err();
        assert!(matches!(err, PatchError::RemoveRoot));
    }

    #[test]
    fn test_diff_applies_to_structurally_identical_copy() {
        // The law as stated: the diff applies to any copy of A, not just the
        // instance it was computed from.
        let doc = doc_with_cells(&["a = 1"]);
        let copy: NotebookDocument =
            serde_json::from_str(&serde_json::to_string(&doc).unwrap()).unwrap();
        let (next, forward, _) = produce_with_patches(&doc, |d| {
            d.bonds.insert("k".into(), json!("v"));
        })
        .unwrap();
        let patched: NotebookDocument = apply_patches(&copy, &forward).unwrap();
        assert_eq!(patched, next);
    }
}
