//! Cell data and run-state types.
//!
//! `CellData` is the authoritative content of a cell (what the server saves);
//! `CellRunState` is owned by the worker and mirrors execution status. The two
//! tables are only eventually consistent: a freshly added cell may have no run
//! state yet, and a deleted cell's run state may linger for a moment. Consumers
//! treat a missing run-state entry as "unknown / idle".

use serde::{Deserialize, Serialize};

use crate::ids::CellId;

/// Authoritative content of a single cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellData {
    /// Stable identifier, unique across the notebook's lifetime.
    pub cell_id: CellId,
    /// Source code of the cell.
    pub code: String,
    /// Whether the code view is folded in the UI.
    pub folded: bool,
}

impl CellData {
    /// Create a new cell with a fresh id.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            cell_id: CellId::new(),
            code: code.into(),
            folded: false,
        }
    }

    /// An empty, unfolded cell with a fresh id.
    pub fn empty() -> Self {
        Self::new("")
    }
}

/// Output payload of the most recent run of a cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CellOutput {
    /// Rendered output body (interpretation depends on `mime`).
    pub body: String,
    /// MIME type of `body`.
    pub mime: String,
    /// The variable this cell assigns to, if the worker could determine one.
    pub rootassignee: Option<String>,
    /// Unix timestamp (seconds, fractional) of the last completed run.
    pub last_run_timestamp: f64,
    /// Whether interactive display state survives re-runs.
    pub persist_state: bool,
}

/// Execution status of a cell, owned by the worker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CellRunState {
    /// Waiting in the worker's run queue.
    pub queued: bool,
    /// Currently executing.
    pub running: bool,
    /// Last run ended in an error.
    pub errored: bool,
    /// Duration of the last run in nanoseconds, if it completed.
    pub runtime: Option<u64>,
    /// Output of the last run.
    pub output: CellOutput,
}

impl CellRunState {
    /// Whether this cell is occupying the worker (queued or running).
    pub fn is_active(&self) -> bool {
        self.queued || self.running
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cell_has_fresh_id() {
        let a = CellData::new("x = 1");
        let b = CellData::new("x = 1");
        assert_ne!(a.cell_id, b.cell_id);
        assert_eq!(a.code, "x = 1");
        assert!(!a.folded);
    }

    #[test]
    fn test_default_run_state_is_idle() {
        let rs = CellRunState::default();
        assert!(!rs.is_active());
        assert!(!rs.errored);
        assert!(rs.runtime.is_none());
    }

    #[test]
    fn test_queued_or_running_is_active() {
        let queued = CellRunState { queued: true, ..Default::default() };
        let running = CellRunState { running: true, ..Default::default() };
        assert!(queued.is_active());
        assert!(running.is_active());
    }

    #[test]
    fn test_json_roundtrip() {
        let rs = CellRunState {
            running: true,
            runtime: Some(1_500_000),
            output: CellOutput {
                body: "3".into(),
                mime: "text/plain".into(),
                rootassignee: Some("x".into()),
                last_run_timestamp: 1.0e9,
                persist_state: false,
            },
            ..Default::default()
        };
        let json = serde_json::to_string(&rs).unwrap();
        let parsed: CellRunState = serde_json::from_str(&json).unwrap();
        assert_eq!(rs, parsed);
    }
}
