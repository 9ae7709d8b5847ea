//! The notebook document — a pure value, no behavior beyond bookkeeping.
//!
//! All local mutation flows through the controller's `update_notebook`
//! transaction; remote mutation arrives as structural diffs. This type only
//! provides constructors, lookups, and the order invariant check. Field names
//! here double as the path vocabulary of the patch engine, so renaming a field
//! is a wire protocol change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cell::{CellData, CellRunState};
use crate::ids::{CellId, NotebookId};

/// Local mirror of an authoritative, server-held notebook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotebookDocument {
    /// Opaque identifier, immutable after creation.
    pub notebook_id: NotebookId,
    /// Canonical file path as reported by the authority.
    pub path: String,
    /// Short display form of `path`.
    pub shortpath: String,
    /// Whether the notebook still lives in a scratch directory.
    pub in_temp_dir: bool,
    /// Cell table, keyed by stable cell id.
    pub cells: BTreeMap<CellId, CellData>,
    /// Display order. Invariant: a permutation of `cells`' key set.
    pub cell_order: Vec<CellId>,
    /// Per-cell execution state, owned by the worker. Only eventually
    /// consistent with `cells` — missing entries mean idle/unknown.
    pub run_state: BTreeMap<CellId, CellRunState>,
    /// Reactive input values, keyed by bond name. Last write wins.
    pub bonds: BTreeMap<String, serde_json::Value>,
}

impl NotebookDocument {
    /// An empty document for the given notebook id.
    pub fn new(notebook_id: NotebookId) -> Self {
        Self {
            notebook_id,
            path: String::new(),
            shortpath: String::new(),
            in_temp_dir: true,
            cells: BTreeMap::new(),
            cell_order: Vec::new(),
            run_state: BTreeMap::new(),
            bonds: BTreeMap::new(),
        }
    }

    /// Look up a cell by id.
    pub fn cell(&self, id: &CellId) -> Option<&CellData> {
        self.cells.get(id)
    }

    /// Position of a cell in the display order.
    pub fn index_of(&self, id: &CellId) -> Option<usize> {
        self.cell_order.iter().position(|c| c == id)
    }

    /// Whether any cell is queued or running.
    pub fn has_active_cells(&self) -> bool {
        self.run_state.values().any(|rs| rs.is_active())
    }

    /// Insert a cell at `index` (clamped to the current length).
    pub fn insert_cell_at(&mut self, cell: CellData, index: usize) {
        let index = index.min(self.cell_order.len());
        self.cell_order.insert(index, cell.cell_id);
        self.cells.insert(cell.cell_id, cell);
    }

    /// Remove a cell from both the table and the order.
    pub fn remove_cell(&mut self, id: &CellId) -> Option<CellData> {
        self.cell_order.retain(|c| c != id);
        self.cells.remove(id)
    }

    /// Check that `cell_order` is exactly a permutation of `cells`' keys.
    pub fn order_is_consistent(&self) -> bool {
        if self.cell_order.len() != self.cells.len() {
            return false;
        }
        let mut seen = std::collections::BTreeSet::new();
        self.cell_order
            .iter()
            .all(|id| self.cells.contains_key(id) && seen.insert(*id))
    }
}

/// One entry of the authority's `notebook_list` message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotebookListEntry {
    pub notebook_id: NotebookId,
    pub path: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_cells(codes: &[&str]) -> NotebookDocument {
        let mut doc = NotebookDocument::new(NotebookId::new());
        for (i, code) in codes.iter().enumerate() {
            doc.insert_cell_at(CellData::new(*code), i);
        }
        doc
    }

    #[test]
    fn test_insert_preserves_order_invariant() {
        let doc = doc_with_cells(&["a = 1", "b = 2", "c = 3"]);
        assert!(doc.order_is_consistent());
        assert_eq!(doc.cell_order.len(), 3);
        assert_eq!(doc.cell(&doc.cell_order[1]).unwrap().code, "b = 2");
    }

    #[test]
    fn test_insert_index_is_clamped() {
        let mut doc = doc_with_cells(&["a = 1"]);
        let cell = CellData::new("z = 9");
        let id = cell.cell_id;
        doc.insert_cell_at(cell, 100);
        assert_eq!(doc.cell_order.last(), Some(&id));
        assert!(doc.order_is_consistent());
    }

    #[test]
    fn test_remove_cell() {
        let mut doc = doc_with_cells(&["a = 1", "b = 2"]);
        let id = doc.cell_order[0];
        let removed = doc.remove_cell(&id).unwrap();
        assert_eq!(removed.code, "a = 1");
        assert!(doc.order_is_consistent());
        assert_eq!(doc.cell_order.len(), 1);
        assert!(doc.remove_cell(&id).is_none());
    }

    #[test]
    fn test_order_inconsistency_detected() {
        let mut doc = doc_with_cells(&["a = 1"]);
        // Dangling id in the order
        doc.cell_order.push(CellId::new());
        assert!(!doc.order_is_consistent());

        let mut doc = doc_with_cells(&["a = 1", "b = 2"]);
        // Duplicate id
        doc.cell_order[1] = doc.cell_order[0];
        assert!(!doc.order_is_consistent());
    }

    #[test]
    fn test_active_cells() {
        let mut doc = doc_with_cells(&["a = 1"]);
        assert!(!doc.has_active_cells());
        let id = doc.cell_order[0];
        doc.run_state.insert(
            id,
            CellRunState { running: true, ..Default::default() },
        );
        assert!(doc.has_active_cells());
    }

    #[test]
    fn test_run_state_may_reference_unknown_cells() {
        // Eventual consistency: the worker can report state for a cell the
        // local table doesn't know yet. That must not break the order check.
        let mut doc = doc_with_cells(&["a = 1"]);
        doc.run_state.insert(CellId::new(), CellRunState::default());
        assert!(doc.order_is_consistent());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut doc = doc_with_cells(&["a = 1", "b = a + 1"]);
        doc.bonds.insert("slider".into(), serde_json::json!(42));
        let json = serde_json::to_string(&doc).unwrap();
        let parsed: NotebookDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, parsed);
    }
}
