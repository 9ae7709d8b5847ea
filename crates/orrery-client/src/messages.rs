//! Wire message types for the bidirectional authority channel.
//!
//! These are the typed forms of everything that crosses the channel, tagged
//! with a `type` discriminant on the wire. Each notebook-scoped message
//! carries its notebook id (and cell id where relevant) directly in the
//! variant; the transport does not add a second envelope.

use orrery_patch::Diff;
use orrery_types::{CellId, NotebookId, NotebookListEntry};
use serde::{Deserialize, Serialize};

/// Messages sent from this client to the authority.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Structural diff of a committed local mutation.
    UpdateNotebook {
        notebook_id: NotebookId,
        updates: Diff,
    },
    /// Request execution of the given cells (possibly empty, which asks the
    /// worker to re-evaluate dependents of whatever just changed).
    RunMultipleCells {
        notebook_id: NotebookId,
        cells: Vec<CellId>,
    },
    /// Interrupt everything queued or running in this notebook.
    InterruptAll { notebook_id: NotebookId },
    /// Ask for the list of all open notebooks. Unscoped.
    GetAllNotebooks,
    /// Completion query against the worker's namespace.
    Complete {
        notebook_id: NotebookId,
        query: String,
    },
    /// Re-render a displayed object at a new size.
    ReshowCell {
        notebook_id: NotebookId,
        cell_id: CellId,
        objectid: String,
        dim: u32,
    },
}

impl ClientMessage {
    /// The notebook this message is scoped to, if any.
    pub fn notebook_id(&self) -> Option<NotebookId> {
        match self {
            ClientMessage::UpdateNotebook { notebook_id, .. }
            | ClientMessage::RunMultipleCells { notebook_id, .. }
            | ClientMessage::InterruptAll { notebook_id }
            | ClientMessage::Complete { notebook_id, .. }
            | ClientMessage::ReshowCell { notebook_id, .. } => Some(*notebook_id),
            ClientMessage::GetAllNotebooks => None,
        }
    }
}

/// Messages pushed unsolicited from the authority to this client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Structural diff the authority applied to its copy of the notebook.
    NotebookDiff {
        notebook_id: NotebookId,
        message: Diff,
    },
    /// Worker log line for display.
    Log {
        notebook_id: NotebookId,
        message: String,
    },
    /// Current list of open notebooks. Global, unscoped.
    NotebookList { notebooks: Vec<NotebookListEntry> },
}

// ============================================================================
// Tests
// ============================================================================
