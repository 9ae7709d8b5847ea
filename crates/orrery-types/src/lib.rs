//! Shared document model for Orrery.
//!
//! This crate is the pure-data foundation: typed IDs, cell content and run
//! state, and the notebook document value. It has **no internal orrery
//! dependencies** — a leaf crate the patch engine and client build on.
//!
//! # Entity overview
//!
//! ```text
//! NotebookDocument (NotebookId) ← local mirror of the authority's copy
//!     ├── cells:      CellId → CellData       (authoritative content)
//!     ├── cell_order: Vec<CellId>             (permutation of cells' keys)
//!     ├── run_state:  CellId → CellRunState   (worker-owned, eventually consistent)
//!     └── bonds:      name   → value          (reactive inputs, last write wins)
//! ```

pub mod cell;
pub mod ids;
pub mod notebook;

// Re-export primary types at crate root for convenience.
pub use cell::{CellData, CellOutput, CellRunState};
pub use ids::{CellId, NotebookId};
pub use notebook::{NotebookDocument, NotebookListEntry};
