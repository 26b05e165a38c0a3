//! Tablesync - Multi-user command history for collaborative tabletop sessions
//!
//! This crate pairs the generic history engine from `tablesync-core` with a
//! concrete card-table domain: a board state, a catalog of reversible game
//! commands, and a session layer that keeps state and history coherent
//! across several players at one table.

pub mod app;
pub mod commands;
pub mod game;
pub mod utils;

// Re-export commonly used types
pub use app::{Session, SessionConfig};
pub use commands::{
    register_builtin_commands, AdvanceTurnCommand, CompositeCommand, DrawCardCommand,
    MoveCardCommand, SetLifeCommand, TapCardCommand, UpdateLifeCommand,
};
pub use game::GameState;
pub use utils::{
    error::{GameError, Result, TablesyncError},
    logging::{init_default_logging, init_env_logging, LogConfig, LogFormat, LogLevel},
};

// Re-export the engine surface so most callers need a single import
pub use tablesync_core::{
    affects_set, load_snapshot, replay, save_snapshot, Command, CommandInfo, CommandRegistry,
    Conflict, ConflictResolution, HistoryEngine, HistoryError, HistoryStats, PruneConfig,
    ReplayOptions, SerializedCommand, Snapshot, UndoStack, DEFAULT_CONFLICT_WINDOW,
    SNAPSHOT_VERSION,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
