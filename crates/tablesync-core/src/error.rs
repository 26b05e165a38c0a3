//! Error types for the history engine

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the history engine itself.
///
/// Errors raised by individual commands (domain failures such as an empty
/// library) are passed through unchanged; the engine never interprets them.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// A command (or one of its dependents during a cascade) reported via
    /// `can_revert` that its effect is no longer present in the state.
    #[error("command '{kind}' ({id}) cannot be reverted in the current state")]
    ValidationFailed { id: Uuid, kind: String },

    /// A command with this id is already present in the global log.
    #[error("command {0} was already submitted")]
    DuplicateCommandId(Uuid),

    /// The snapshot carries a version tag this build does not understand.
    #[error("unsupported snapshot version '{found}' (expected '{expected}')")]
    UnsupportedVersion { found: String, expected: String },

    /// The snapshot is structurally invalid.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// No factory is registered for a serialized command kind.
    #[error("no command factory registered for kind '{0}'")]
    UnknownCommandKind(String),
}
