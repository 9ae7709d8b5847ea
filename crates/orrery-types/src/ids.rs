//! Typed identifiers for notebooks and cells.
//!
//! Both ID types wrap UUIDv4: opaque, globally unique, never reused. Cell
//! identity is tracked by id, not by position — a cell keeps its id across
//! reorders, edits, and runs. The `short()` form (first 8 hex chars) is for
//! human-facing display only, never a lookup key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A notebook identifier (UUIDv4).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotebookId(uuid::Uuid);

/// A cell identifier (UUIDv4). Stable for the lifetime of the cell.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(uuid::Uuid);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Create a fresh, globally unique ID.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// First 8 hex characters — for human display only, not lookup.
            pub fn short(&self) -> String {
                self.0.as_simple().to_string()[..8].to_string()
            }

            /// Parse from a hex string (with or without hyphens).
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                uuid::Uuid::parse_str(s).map(Self)
            }

            /// A nil / zero ID — for sentinel values only.
            pub fn nil() -> Self {
                Self(uuid::Uuid::nil())
            }

            /// Check if this is the nil ID.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $T {
            fn from(u: uuid::Uuid) -> Self {
                Self(u)
            }
        }

        impl From<$T> for uuid::Uuid {
            fn from(id: $T) -> uuid::Uuid {
                id.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // Full UUID with hyphens for log readability
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_typed_id!(NotebookId, "NotebookId");
impl_typed_id!(CellId, "CellId");

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_unique() {
        let a = CellId::new();
        let b = CellId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_is_8_chars() {
        let id = NotebookId::new();
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn test_parse_roundtrip() {
        let id = CellId::new();
        let parsed = CellId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_nil() {
        assert!(NotebookId::nil().is_nil());
        assert!(!NotebookId::new().is_nil());
    }

    #[test]
    fn test_serde_is_plain_uuid_string() {
        let id = CellId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let parsed: CellId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_debug_shows_type_and_short() {
        let id = CellId::new();
        let debug = format!("{:?}", id);
        assert!(debug.starts_with("CellId("));
        assert!(debug.ends_with(')'));
    }

    #[test]
    fn test_usable_as_json_map_key() {
        // The patch engine diffs documents through their JSON form, so cell
        // tables must serialize as string-keyed objects.
        let mut map = std::collections::BTreeMap::new();
        map.insert(CellId::new(), 1u32);
        let json = serde_json::to_value(&map).unwrap();
        assert!(json.is_object());
    }
}
