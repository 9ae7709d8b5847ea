//! Client-side notebook synchronization engine.
//!
//! This crate owns everything stateful about mirroring a server-held notebook:
//!
//! - [`NotebookController`] — the mutation gateway and reconciler. All local
//!   mutation flows through [`NotebookController::update_notebook`]; all
//!   authority messages flow through
//!   [`NotebookController::handle_server_message`].
//! - [`LocalEditBuffer`] — keystroke-level edits not yet committed.
//! - [`DeletionRecord`] — single-level undo of cell deletion.
//! - Clipboard serialization ([`clipboard`]) and the durable recent-notebooks
//!   list ([`RecentNotebooks`]).
//! - The wire vocabulary ([`ClientMessage`], [`ServerMessage`]) and the
//!   [`NotebookTransport`] seam the embedding application implements.
//!
//! The whole engine is single-threaded cooperative: the controller owns the
//! document exclusively, and concurrent interleaving happens only at await
//! points. Local mutations are committed optimistically — a failed send never
//! rolls state back; the authority's diff stream is the source of truth.

pub mod clipboard;
pub mod controller;
pub mod edits;
pub mod messages;
pub mod recent;
pub mod transport;
pub mod undo;

pub use controller::{CellPlacement, DeletePrompt, NotebookController, UpdateError};
pub use edits::LocalEditBuffer;
pub use messages::{ClientMessage, ServerMessage};
pub use recent::{RECENT_NOTEBOOKS_CAP, RecentError, RecentNotebooks};
pub use transport::{ChannelTransport, NotebookTransport, TransportError};
pub use undo::{DeletedCell, DeletionRecord};
