//! The notebook controller — mutation gateway and incoming-diff reconciler.
//!
//! Every local mutation of the document goes through
//! [`NotebookController::update_notebook`]: snapshot, mutate a copy, diff,
//! commit optimistically, transmit the diff. Every remote mutation arrives
//! through [`NotebookController::handle_server_message`] as a structural diff
//! applied over the committed state. Nothing else writes the document.
//!
//! Bond updates are the one wrinkle: while the worker is busy (or an update
//! is in flight), bond ops are parked in a pending queue instead of being
//! transmitted, and flushed as a single diff on the transition back to idle.
//! Spamming a slider during a long run therefore costs one send, not hundreds.

use serde_json::Value;
use tracing::{info, trace, warn};

use orrery_patch::{Diff, FieldPath, PatchError, PatchOp, apply_patches, produce_with_patches};
use orrery_types::{CellData, CellId, NotebookDocument, NotebookListEntry};

use crate::clipboard::deserialize_cells;
use crate::edits::LocalEditBuffer;
use crate::messages::{ClientMessage, ServerMessage};
use crate::recent::RecentNotebooks;
use crate::transport::{NotebookTransport, TransportError};
use crate::undo::DeletionRecord;

/// Error from a gateway transaction.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// An intent named a cell the document does not contain.
    #[error("unknown cell {0}")]
    UnknownCell(CellId),
    /// A diff tried to address into a sequence. This cannot come out of the
    /// diff engine; it means a hand-built mutation bypassed the model.
    #[error("diff addresses into a sequence at '{0}'")]
    PositionalPath(FieldPath),
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Where to place a new cell relative to an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellPlacement {
    Before,
    After,
}

/// What a deletion request needs from the user before it may proceed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeletePrompt {
    /// Single idle cell: delete without asking.
    Ready,
    /// Multiple idle cells: confirm the count.
    ConfirmCount(usize),
    /// At least one selected cell is queued or running: confirm, then
    /// interrupt before deleting.
    CellsRunning,
}

/// Owns the local mirror of one notebook and mediates all mutation.
pub struct NotebookController<T: NotebookTransport> {
    transport: T,
    doc: NotebookDocument,
    local_edits: LocalEditBuffer,
    pending_bonds: Diff,
    recently_deleted: Option<DeletionRecord>,
    update_in_flight: bool,
    notebook_list: Vec<NotebookListEntry>,
    recent: Option<RecentNotebooks>,
}

impl<T: NotebookTransport> NotebookController<T> {
    pub fn new(doc: NotebookDocument, transport: T) -> Self {
        Self {
            transport,
            doc,
            local_edits: LocalEditBuffer::new(),
            pending_bonds: Vec::new(),
            recently_deleted: None,
            update_in_flight: false,
            notebook_list: Vec::new(),
            recent: RecentNotebooks::default_location(),
        }
    }

    /// Use an explicit recent-notebooks store (tests) or none at all.
    pub fn with_recent_store(mut self, recent: Option<RecentNotebooks>) -> Self {
        self.recent = recent;
        self
    }

    // ========================================================================
    // State access
    // ========================================================================

    /// The committed local mirror. Read-only; mutate through the gateway.
    pub fn doc(&self) -> &NotebookDocument {
        &self.doc
    }

    /// Idle means the worker has nothing queued or running **and** no update
    /// of ours is currently in flight. Gates bond transmission.
    pub fn is_idle(&self) -> bool {
        !self.update_in_flight && !self.doc.has_active_cells()
    }

    /// Bond ops parked until the next idle transition.
    pub fn pending_bond_ops(&self) -> &[PatchOp] {
        &self.pending_bonds
    }

    /// Most recent `notebook_list` from the authority.
    pub fn notebook_list(&self) -> &[NotebookListEntry] {
        &self.notebook_list
    }

    /// Record a keystroke-level edit. Nothing is transmitted.
    pub fn set_local_edit(&mut self, id: CellId, code: impl Into<String>) {
        self.local_edits.set(id, code);
    }

    /// The working copy of a cell's code, if one exists.
    pub fn local_code(&self, id: &CellId) -> Option<&str> {
        self.local_edits.get(id)
    }

    /// Whether the cell's displayed code differs from the committed code.
    pub fn is_dirty(&self, id: &CellId) -> bool {
        self.local_edits.is_dirty(&self.doc, id)
    }

    // ========================================================================
    // Mutation gateway
    // ========================================================================

    /// Run `mutate` against a copy of the document, commit the result locally,
    /// and transmit the structural diff to the authority.
    ///
    /// Bond ops produced while not idle are queued instead of sent, and their
    /// effect on the local bonds table is held back with them; the queued ops
    /// re-enter here on the transition back to idle. A transport failure is
    /// returned to the caller but never rolls back the commit — the authority
    /// re-synchronizes us through its own diff stream.
    pub async fn update_notebook<F>(&mut self, mutate: F) -> Result<(), UpdateError>
    where
        F: FnOnce(&mut NotebookDocument),
    {
        self.transact(mutate).await?;
        self.flush_pending_bonds().await
    }

    /// One gateway transaction, without the trailing idle check.
    async fn transact<F>(&mut self, mutate: F) -> Result<(), UpdateError>
    where
        F: FnOnce(&mut NotebookDocument),
    {
        let (mut next, mut diff, _inverse) = produce_with_patches(&self.doc, mutate)?;

        let base = serde_json::to_value(&self.doc).map_err(PatchError::Serde)?;
        guard_structural(&base, &diff)?;

        // Worker busy: park bond ops for the next idle transition. The local
        // bonds table is held back too, so the flush re-diff reproduces (and
        // dedupes) exactly what the authority has not seen yet.
        if !self.is_idle() {
            let (bonds, rest): (Diff, Diff) = diff
                .into_iter()
                .partition(|op| op.path().head() == Some("bonds"));
            if !bonds.is_empty() {
                trace!(deferred = bonds.len(), "deferring bond ops until idle");
                self.pending_bonds.extend(bonds);
                next.bonds = self.doc.bonds.clone();
            }
            diff = rest;
        }

        // No-op mutation (or bonds-only while busy): nothing to commit or send.
        if diff.is_empty() {
            return Ok(());
        }

        // Optimistic commit; the send may still fail.
        self.doc = next;
        self.update_in_flight = true;
        let sent = self
            .transport
            .send(ClientMessage::UpdateNotebook {
                notebook_id: self.doc.notebook_id,
                updates: diff,
            })
            .await;
        self.update_in_flight = false;
        sent?;
        Ok(())
    }

    /// Edge-triggered bond flush: when idle with parked ops, fold them into
    /// the document and transmit the net result as one diff. Superseded
    /// intermediate values collapse in the re-diff.
    async fn flush_pending_bonds(&mut self) -> Result<(), UpdateError> {
        if self.pending_bonds.is_empty() || !self.is_idle() {
            return Ok(());
        }
        let ops = std::mem::take(&mut self.pending_bonds);
        info!(ops = ops.len(), "flushing deferred bond updates");
        let target: NotebookDocument = apply_patches(&self.doc, &ops)?;
        let bonds = target.bonds;
        self.transact(move |doc| doc.bonds = bonds).await
    }

    // ========================================================================
    // Incoming-diff reconciler
    // ========================================================================

    /// Apply one authority message to local state.
    ///
    /// Diffs for other notebooks are discarded with a warning. Becoming idle
    /// as a result of a remote diff (run finished) flushes parked bond ops.
    pub async fn handle_server_message(
        &mut self,
        message: ServerMessage,
    ) -> Result<(), UpdateError> {
        match message {
            ServerMessage::NotebookDiff { notebook_id, message } => {
                if notebook_id != self.doc.notebook_id {
                    warn!(%notebook_id, "discarding diff for a notebook we don't mirror");
                    return Ok(());
                }
                if message.is_empty() {
                    return Ok(());
                }
                let old_path = self.doc.path.clone();
                // An inapplicable diff is the authority's bug, not ours; keep
                // operating on the last good state.
                match apply_patches(&self.doc, &message) {
                    Ok(patched) => self.doc = patched,
                    Err(e) => {
                        warn!("discarding inapplicable authority diff: {e}");
                        return Ok(());
                    }
                }
                trace!(ops = message.len(), "reconciled authority diff");
                if self.doc.path != old_path {
                    self.remember_path(&self.doc.path, &old_path);
                }
                self.flush_pending_bonds().await
            }
            ServerMessage::Log { notebook_id, message } => {
                info!(%notebook_id, "worker: {message}");
                Ok(())
            }
            ServerMessage::NotebookList { notebooks } => {
                // The authority's listing is where we learn our canonical
                // path, whether or not the notebook ever moves.
                if let Some(entry) = notebooks
                    .iter()
                    .find(|n| n.notebook_id == self.doc.notebook_id)
                {
                    self.remember_path(&entry.path, &self.doc.path);
                }
                self.notebook_list = notebooks;
                Ok(())
            }
        }
    }

    /// Parse and dispatch a raw wire frame. Unknown message types are logged
    /// and dropped so a newer authority can't wedge an older client.
    pub async fn handle_server_json(&mut self, raw: &str) -> Result<(), UpdateError> {
        match serde_json::from_str::<ServerMessage>(raw) {
            Ok(message) => self.handle_server_message(message).await,
            Err(e) => {
                warn!("ignoring unrecognized server message: {e}");
                Ok(())
            }
        }
    }

    /// The authority reported a canonical path; move it to the front of the
    /// recent-notebooks list, dropping the superseded one.
    fn remember_path(&self, canonical: &str, old_path: &str) {
        if canonical.is_empty() {
            return;
        }
        if let Some(recent) = &self.recent {
            let superseded = (!old_path.is_empty() && old_path != canonical).then_some(old_path);
            if let Err(e) = recent.insert(canonical, superseded) {
                warn!("could not update recent-notebooks list: {e}");
            }
        }
    }

    // ========================================================================
    // Cell intents
    // ========================================================================

    /// Insert a fresh empty cell at `index` (clamped) and run it.
    pub async fn add_cell_at(&mut self, index: usize) -> Result<CellId, UpdateError> {
        let cell = CellData::empty();
        let id = cell.cell_id;
        self.update_notebook(move |doc| doc.insert_cell_at(cell, index))
            .await?;
        self.run_cells(vec![id]).await?;
        Ok(id)
    }

    /// Insert a fresh empty cell next to an existing one.
    pub async fn add_cell(
        &mut self,
        relative_to: &CellId,
        placement: CellPlacement,
    ) -> Result<CellId, UpdateError> {
        let anchor = self
            .doc
            .index_of(relative_to)
            .ok_or(UpdateError::UnknownCell(*relative_to))?;
        let index = match placement {
            CellPlacement::Before => anchor,
            CellPlacement::After => anchor + 1,
        };
        self.add_cell_at(index).await
    }

    /// Insert cells from a clipboard payload at `index` (end of notebook when
    /// `None`). The pasted code stays in the local edit buffer and the cells
    /// are created empty remotely, so pasted code never runs unreviewed.
    pub async fn add_pasted_cells(
        &mut self,
        payload: &str,
        index: Option<usize>,
    ) -> Result<Vec<CellId>, UpdateError> {
        let codes = deserialize_cells(payload);
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let cells: Vec<CellData> = codes.iter().map(|_| CellData::empty()).collect();
        let ids: Vec<CellId> = cells.iter().map(|c| c.cell_id).collect();
        for (id, code) in ids.iter().zip(&codes) {
            self.local_edits.set(*id, code.clone());
        }
        let at = index.unwrap_or(self.doc.cell_order.len());
        self.update_notebook(move |doc| {
            for (offset, cell) in cells.into_iter().enumerate() {
                doc.insert_cell_at(cell, at + offset);
            }
        })
        .await?;
        Ok(ids)
    }

    /// Commit new code for one cell and run it. Clears the cell's local edit.
    pub async fn set_cell_code(
        &mut self,
        id: CellId,
        code: impl Into<String>,
    ) -> Result<(), UpdateError> {
        if self.doc.cell(&id).is_none() {
            return Err(UpdateError::UnknownCell(id));
        }
        let code = code.into();
        self.update_notebook(move |doc| {
            if let Some(cell) = doc.cells.get_mut(&id) {
                cell.code = code;
            }
        })
        .await?;
        self.local_edits.remove(&id);
        self.run_cells(vec![id]).await
    }

    /// Fold the local edits of the given cells into the document as one
    /// transaction, then run them all. Cells without an edit run as-is.
    pub async fn set_and_run_multiple(&mut self, ids: &[CellId]) -> Result<(), UpdateError> {
        for id in ids {
            if self.doc.cell(id).is_none() {
                return Err(UpdateError::UnknownCell(*id));
            }
        }
        let edits: Vec<(CellId, String)> = ids
            .iter()
            .filter_map(|id| self.local_edits.get(id).map(|c| (*id, c.to_string())))
            .collect();
        self.update_notebook(move |doc| {
            for (id, code) in edits {
                if let Some(cell) = doc.cells.get_mut(&id) {
                    cell.code = code;
                }
            }
        })
        .await?;
        for id in ids {
            self.local_edits.remove(id);
        }
        self.run_cells(ids.to_vec()).await
    }

    /// Commit and run every cell whose local edit differs from the document.
    pub async fn set_and_run_all_changed(&mut self) -> Result<Vec<CellId>, UpdateError> {
        let dirty = self.local_edits.dirty_cells(&self.doc);
        if !dirty.is_empty() {
            self.set_and_run_multiple(&dirty).await?;
        }
        Ok(dirty)
    }

    /// Move the given cells (kept in the given order) so they sit at `index`
    /// of the pre-move order. Emits a single wholesale `cell_order` replace.
    pub async fn move_cells(&mut self, ids: &[CellId], index: usize) -> Result<(), UpdateError> {
        for id in ids {
            if self.doc.cell(id).is_none() {
                return Err(UpdateError::UnknownCell(*id));
            }
        }
        let moved = ids.to_vec();
        self.update_notebook(move |doc| {
            let index = index.min(doc.cell_order.len());
            let mut order = Vec::with_capacity(doc.cell_order.len());
            order.extend(doc.cell_order[..index].iter().filter(|c| !moved.contains(c)));
            order.extend(&moved);
            order.extend(doc.cell_order[index..].iter().filter(|c| !moved.contains(c)));
            doc.cell_order = order;
        })
        .await
    }

    /// Fold or unfold a cell's code view.
    pub async fn fold_cell(&mut self, id: CellId, folded: bool) -> Result<(), UpdateError> {
        if self.doc.cell(&id).is_none() {
            return Err(UpdateError::UnknownCell(id));
        }
        self.update_notebook(move |doc| {
            if let Some(cell) = doc.cells.get_mut(&id) {
                cell.folded = folded;
            }
        })
        .await
    }

    /// Set a reactive input value. Deferred automatically while not idle.
    pub async fn set_bond(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) -> Result<(), UpdateError> {
        let name = name.into();
        self.update_notebook(move |doc| {
            doc.bonds.insert(name, value);
        })
        .await
    }

    // ========================================================================
    // Deletion and undo
    // ========================================================================

    /// Classify a deletion request so the caller knows what to confirm.
    pub fn delete_prompt(&self, ids: &[CellId]) -> DeletePrompt {
        let any_active = ids
            .iter()
            .any(|id| self.doc.run_state.get(id).is_some_and(|rs| rs.is_active()));
        if any_active {
            DeletePrompt::CellsRunning
        } else if ids.len() > 1 {
            DeletePrompt::ConfirmCount(ids.len())
        } else {
            DeletePrompt::Ready
        }
    }

    /// Delete the given cells, capturing them for a single-level undo, then
    /// ask the worker to re-evaluate dependents. Unknown ids are skipped.
    /// Confirmation (per [`Self::delete_prompt`]) is the caller's concern.
    pub async fn delete_cells(&mut self, ids: &[CellId]) -> Result<(), UpdateError> {
        let record = DeletionRecord::capture(&self.doc, ids);
        if record.is_empty() {
            return Ok(());
        }
        let doomed: Vec<CellId> = record.entries().iter().map(|e| e.cell.cell_id).collect();
        self.update_notebook(move |doc| {
            for id in &doomed {
                doc.remove_cell(id);
            }
        })
        .await?;
        for id in ids {
            self.local_edits.remove(id);
        }
        self.recently_deleted = Some(record);
        // Empty run: dependents of the deleted cells re-evaluate.
        self.run_cells(Vec::new()).await
    }

    /// Restore the most recent deletion at its original indices and re-run
    /// the restored cells. No-op when there is nothing to restore.
    pub async fn restore_deleted(&mut self) -> Result<Vec<CellId>, UpdateError> {
        let Some(record) = self.recently_deleted.take() else {
            return Ok(Vec::new());
        };
        let ids: Vec<CellId> = record.entries().iter().map(|e| e.cell.cell_id).collect();
        self.update_notebook(move |doc| record.restore_into(doc)).await?;
        self.run_cells(ids.clone()).await?;
        Ok(ids)
    }

    // ========================================================================
    // Worker pass-throughs
    // ========================================================================

    /// Request execution of the given cells (empty = re-evaluate dependents).
    pub async fn run_cells(&mut self, cells: Vec<CellId>) -> Result<(), UpdateError> {
        self.transport
            .send(ClientMessage::RunMultipleCells {
                notebook_id: self.doc.notebook_id,
                cells,
            })
            .await?;
        Ok(())
    }

    /// Interrupt everything queued or running in this notebook.
    pub async fn interrupt_all(&mut self) -> Result<(), UpdateError> {
        self.transport
            .send(ClientMessage::InterruptAll {
                notebook_id: self.doc.notebook_id,
            })
            .await?;
        Ok(())
    }

    /// Completion query against the worker's namespace.
    pub async fn complete(&mut self, query: impl Into<String>) -> Result<(), UpdateError> {
        self.transport
            .send(ClientMessage::Complete {
                notebook_id: self.doc.notebook_id,
                query: query.into(),
            })
            .await?;
        Ok(())
    }

    /// Re-render a displayed object at a new size.
    pub async fn reshow_cell(
        &mut self,
        cell_id: CellId,
        objectid: impl Into<String>,
        dim: u32,
    ) -> Result<(), UpdateError> {
        self.transport
            .send(ClientMessage::ReshowCell {
                notebook_id: self.doc.notebook_id,
                cell_id,
                objectid: objectid.into(),
                dim,
            })
            .await?;
        Ok(())
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Ask the authority to move the notebook file. Overwrite confirmation is
    /// the caller's concern when the notebook already has a real location.
    pub async fn submit_file_change(
        &mut self,
        new_path: impl Into<String>,
    ) -> Result<(), UpdateError> {
        let new_path = new_path.into();
        self.update_notebook(move |doc| {
            doc.path = new_path;
            doc.in_temp_dir = false;
        })
        .await
    }

    /// Establish the session: request the notebook list, send an empty update
    /// to register interest in this notebook's diff stream, and warm up the
    /// completion machinery.
    pub async fn handshake(&mut self) -> Result<(), UpdateError> {
        info!(notebook_id = %self.doc.notebook_id, "connecting to authority");
        self.transport.send(ClientMessage::GetAllNotebooks).await?;
        self.transport
            .send(ClientMessage::UpdateNotebook {
                notebook_id: self.doc.notebook_id,
                updates: Vec::new(),
            })
            .await?;
        // One real query so the worker precompiles its completion machinery.
        self.complete("sq").await
    }
}

/// Reject any op whose path would descend into a sequence of the base
/// document. Engine-produced diffs can't do this; the guard catches diffs
/// smuggled in through a mutator that swaps field types.
fn guard_structural(base: &Value, diff: &Diff) -> Result<(), UpdateError> {
    for op in diff {
        let mut cursor = base;
        for token in op.path().tokens() {
            match cursor {
                Value::Array(_) => {
                    return Err(UpdateError::PositionalPath(op.path().clone()));
                }
                Value::Object(map) => match map.get(token) {
                    Some(v) => cursor = v,
                    None => break,
                },
                _ => break,
            }
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
