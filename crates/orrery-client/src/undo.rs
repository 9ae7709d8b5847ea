//! One-shot restoration of deleted cells.
//!
//! Before a bulk deletion, the controller captures each doomed cell together
//! with its index in the display order. A single record is kept — the next
//! deletion overwrites it. Restoration re-inserts in ascending original-index
//! order so multiple restored cells keep their relative positions.

use orrery_types::{CellData, CellId, NotebookDocument};

/// One deleted cell and where it used to live.
#[derive(Clone, Debug, PartialEq)]
pub struct DeletedCell {
    /// Index in `cell_order` at the moment of deletion.
    pub index: usize,
    /// Full cell content, for restoration.
    pub cell: CellData,
}

/// The most recent bulk deletion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeletionRecord {
    entries: Vec<DeletedCell>,
}

impl DeletionRecord {
    /// Capture the given cells from the document, before they are removed.
    /// Ids not present in the document are skipped. Entries are ordered by
    /// ascending original index regardless of the order of `ids`.
    pub fn capture(doc: &NotebookDocument, ids: &[CellId]) -> Self {
        let mut entries: Vec<DeletedCell> = ids
            .iter()
            .filter_map(|id| {
                let index = doc.index_of(id)?;
                let cell = doc.cell(id)?.clone();
                Some(DeletedCell { index, cell })
            })
            .collect();
        entries.sort_by_key(|e| e.index);
        Self { entries }
    }

    /// Re-insert every captured cell at its recorded index, clamped to the
    /// current order length. Ascending capture order makes earlier insertions
    /// shift later ones into place.
    pub fn restore_into(&self, doc: &mut NotebookDocument) {
        for entry in &self.entries {
            doc.insert_cell_at(entry.cell.clone(), entry.index);
        }
    }

    pub fn entries(&self) -> &[DeletedCell] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
