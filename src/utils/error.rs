//! Error handling for tablesync

use thiserror::Error;

/// Domain errors raised by the bundled game commands.
///
/// The history engine surfaces these unchanged; it never interprets them.
#[derive(Error, Debug)]
pub enum GameError {
    #[error("card '{card}' not found in zone '{zone}'")]
    CardNotFound { card: String, zone: String },

    #[error("zone '{0}' does not exist")]
    ZoneNotFound(String),

    #[error("unknown player '{0}'")]
    UnknownPlayer(String),

    #[error("player '{player}' has no cards left in their library")]
    EmptyLibrary { player: String },

    #[error("no players seated at the table")]
    NoPlayers,
}

/// Main error type for the tablesync application layer.
#[derive(Error, Debug)]
pub enum TablesyncError {
    #[error("game error: {0}")]
    Game(#[from] GameError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error in '{field}': {message}")]
    Config { field: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TablesyncError {
    /// Create a configuration error
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result alias used across the application layer
pub type Result<T> = std::result::Result<T, TablesyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_error_messages() {
        let err = GameError::CardNotFound {
            card: "island".to_string(),
            zone: "alice:hand".to_string(),
        };
        assert!(err.to_string().contains("island"));
        assert!(err.to_string().contains("alice:hand"));

        let err = GameError::EmptyLibrary {
            player: "bob".to_string(),
        };
        assert!(err.to_string().contains("bob"));
    }

    #[test]
    fn test_game_error_converts_to_app_error() {
        let err: TablesyncError = GameError::NoPlayers.into();
        assert!(matches!(err, TablesyncError::Game(_)));
    }
}
