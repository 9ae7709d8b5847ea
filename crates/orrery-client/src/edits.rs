//! Uncommitted per-cell edits, tracked separately from the authoritative copy.
//!
//! The editor widget writes here on every keystroke; nothing reaches the
//! authority until a submission flow folds the entry into the document via the
//! controller. Remote diffs never touch this buffer, so in-progress typing
//! survives reconciliation.

use std::collections::BTreeMap;

use orrery_types::{CellId, NotebookDocument};

/// Buffer of cell code edits not yet pushed to the authority.
#[derive(Clone, Debug, Default)]
pub struct LocalEditBuffer {
    entries: BTreeMap<CellId, String>,
}

impl LocalEditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the working copy of a cell's code.
    pub fn set(&mut self, id: CellId, code: impl Into<String>) {
        self.entries.insert(id, code.into());
    }

    /// The working copy, if one exists.
    pub fn get(&self, id: &CellId) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    /// Drop an entry, returning its code. Called when the edit is committed
    /// through the controller or when the cell is deleted.
    pub fn remove(&mut self, id: &CellId) -> Option<String> {
        self.entries.remove(id)
    }

    /// Whether the cell's displayed code differs from the authoritative code.
    ///
    /// A cell with no buffer entry is never dirty. An entry whose cell has
    /// vanished from the document counts as dirty — the edit is certainly not
    /// reflected remotely.
    pub fn is_dirty(&self, doc: &NotebookDocument, id: &CellId) -> bool {
        match self.entries.get(id) {
            Some(code) => doc.cell(id).map(|c| c.code != *code).unwrap_or(true),
            None => false,
        }
    }

    /// All dirty cells, in notebook display order. Drives "run all changed".
    pub fn dirty_cells(&self, doc: &NotebookDocument) -> Vec<CellId> {
        doc.cell_order
            .iter()
            .filter(|id| self.is_dirty(doc, id))
            .copied()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_types::{CellData, NotebookId};

    fn doc_with_cell(code: &str) -> (NotebookDocument, CellId) {
        let mut doc = NotebookDocument::new(NotebookId::new());
        let cell = CellData::new(code);
        let id = cell.cell_id;
        doc.insert_cell_at(cell, 0);
        (doc, id)
    }

    #[test]
    fn test_dirty_when_edit_differs() {
        let (doc, id) = doc_with_cell("a=1");
        let mut buf = LocalEditBuffer::new();
        assert!(!buf.is_dirty(&doc, &id));

        buf.set(id, "a=2");
        assert!(buf.is_dirty(&doc, &id));
        assert_eq!(buf.get(&id), Some("a=2"));
    }

    #[test]
    fn test_not_dirty_when_edit_matches() {
        let (doc, id) = doc_with_cell("a=1");
        let mut buf = LocalEditBuffer::new();
        buf.set(id, "a=1");
        assert!(!buf.is_dirty(&doc, &id));
    }

    #[test]
    fn test_clean_after_remove() {
        let (doc, id) = doc_with_cell("a=1");
        let mut buf = LocalEditBuffer::new();
        buf.set(id, "a=2");
        assert_eq!(buf.remove(&id), Some("a=2".to_string()));
        assert!(!buf.is_dirty(&doc, &id));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_entry_for_vanished_cell_is_dirty() {
        let (mut doc, id) = doc_with_cell("a=1");
        let mut buf = LocalEditBuffer::new();
        buf.set(id, "a=2");
        doc.remove_cell(&id);
        assert!(buf.is_dirty(&doc, &id));
        // ...but dirty_cells only reports cells still in the order.
        assert!(buf.dirty_cells(&doc).is_empty());
    }

    #[test]
    fn test_dirty_cells_in_display_order() {
        let mut doc = NotebookDocument::new(NotebookId::new());
        let (a, b, c) = (CellData::new("a"), CellData::new("b"), CellData::new("c"));
        let (ida, idb, idc) = (a.cell_id, b.cell_id, c.cell_id);
        doc.insert_cell_at(a, 0);
        doc.insert_cell_at(b, 1);
        doc.insert_cell_at(c, 2);

        let mut buf = LocalEditBuffer::new();
        buf.set(idc, "c'");
        buf.set(ida, "a'");
        buf.set(idb, "b"); // unchanged, not dirty

        assert_eq!(buf.dirty_cells(&doc), vec![ida, idc]);
    }
}
