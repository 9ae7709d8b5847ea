//! Structural diff/apply engine for Orrery notebook documents.
//!
//! Given a snapshot `A` and a pure mutation `f`, [`produce_with_patches`]
//! yields `B = f(A)` plus a forward diff `Δ(A→B)` and an inverse diff
//! `Δ(B→A)`; [`apply_patches`] replays a diff onto a structurally-identical
//! copy. Paths are object-field names only — cell identity lives in ids, not
//! positions, so a reorder is a wholesale replacement of `cell_order`, never
//! an element-level array edit.

pub mod engine;
pub mod op;
pub mod path;

pub use engine::{PatchError, apply_patches, diff_values, produce_with_patches};
pub use op::{Diff, PatchOp};
pub use path::FieldPath;
