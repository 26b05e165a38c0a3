//! Tablesync Core - Multi-user command history engine
//!
//! An undo/redo subsystem built on the Command pattern: per-user stacks
//! with named branches, a global chronological log, dependency tracking
//! between commands touching the same entities, cross-user conflict
//! detection, filtered replay, bounded pruning, and a version-tagged
//! snapshot codec. The state the commands operate on is opaque to the
//! engine; callers own it and thread it through every operation.

pub mod command;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod graph;
pub mod replay;
pub mod snapshot;
pub mod stack;

// Re-export commonly used types
pub use command::{affects_set, Command, CommandInfo};
pub use conflict::{Conflict, ConflictResolution};
pub use engine::{HistoryEngine, HistoryStats, PruneConfig, DEFAULT_CONFLICT_WINDOW};
pub use error::HistoryError;
pub use graph::DependencyGraph;
pub use replay::{replay, ReplayOptions};
pub use snapshot::{
    load_snapshot, save_snapshot, CommandFactory, CommandRegistry, SerializedCommand, Snapshot,
    SNAPSHOT_VERSION,
};
pub use stack::UndoStack;
