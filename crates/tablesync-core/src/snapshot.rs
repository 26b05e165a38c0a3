//! Snapshot codec and command registry
//!
//! A snapshot is the portable form of the engine's persistable state: the
//! serialized global log plus each user's stack contents and cursor, under
//! a version tag. Redo buffers, branches, dependency edges and conflict
//! records are not carried; the first two are intentionally volatile, the
//! last two are re-derived when the snapshot is loaded.
//!
//! The engine does not know concrete command types, so reconstruction goes
//! through a caller-provided registry of `kind -> factory`.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::command::Command;
use crate::error::HistoryError;

/// Snapshot wire format version
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// The portable form of one command: its attributes plus the opaque payload
/// its factory needs to rebuild it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedCommand {
    pub id: Uuid,
    pub kind: String,
    pub timestamp: i64,
    pub user_id: String,
    pub affects: BTreeSet<String>,
    pub metadata: Value,
}

impl SerializedCommand {
    /// Capture a live command into its portable form.
    pub fn from_command<S>(command: &dyn Command<S>) -> Self {
        Self {
            id: command.id(),
            kind: command.kind().to_string(),
            timestamp: command.timestamp(),
            user_id: command.user_id().to_string(),
            affects: command.affects().clone(),
            metadata: command.metadata(),
        }
    }
}

/// Version-tagged container for the engine's persistable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version for compatibility checking
    pub version: String,
    /// Capture time, ms since epoch
    pub timestamp: i64,
    /// The global log, in submission order
    pub commands: Vec<SerializedCommand>,
    /// Per-user stack contents: the id sequence of each user's stack, in
    /// submission order. A stack can be a strict subset of the user's
    /// global-log entries after push-after-undo truncation or a branch
    /// restore, so the log alone does not determine it.
    pub user_stacks: HashMap<String, Vec<Uuid>>,
    /// Per-user cursor: last-applied index into that user's stack, or -1
    pub user_positions: HashMap<String, i64>,
}

impl Snapshot {
    pub(crate) fn new(
        commands: Vec<SerializedCommand>,
        user_stacks: HashMap<String, Vec<Uuid>>,
        user_positions: HashMap<String, i64>,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            commands,
            user_stacks,
            user_positions,
        }
    }

    /// Whether this snapshot's version tag is one this build understands.
    pub fn is_compatible(&self) -> bool {
        self.version == SNAPSHOT_VERSION
    }

    /// Encode as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to encode snapshot")
    }

    /// Decode from JSON. Structural problems surface as
    /// [`HistoryError::MalformedSnapshot`]; the version tag is not checked
    /// here (see [`crate::HistoryEngine::from_snapshot`]).
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)
            .map_err(|e| HistoryError::MalformedSnapshot(e.to_string()))?;
        Ok(snapshot)
    }
}

/// Factory signature: rebuilds one command from its portable form. The
/// registry itself is passed back in so container commands can decode the
/// children embedded in their metadata.
pub type CommandFactory<S> =
    Box<dyn Fn(&SerializedCommand, &CommandRegistry<S>) -> Result<Arc<dyn Command<S>>> + Send + Sync>;

/// Registry mapping command kinds to reconstruction factories.
pub struct CommandRegistry<S> {
    factories: HashMap<String, CommandFactory<S>>,
}

impl<S> Default for CommandRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> CommandRegistry<S> {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory for `kind`, replacing any previous registration.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&SerializedCommand, &CommandRegistry<S>) -> Result<Arc<dyn Command<S>>>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds, unordered.
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Rebuild one command, dispatching on its kind tag.
    pub fn decode(&self, record: &SerializedCommand) -> Result<Arc<dyn Command<S>>> {
        let factory = self
            .factories
            .get(&record.kind)
            .ok_or_else(|| HistoryError::UnknownCommandKind(record.kind.clone()))?;
        factory(record, self)
    }
}

impl<S> fmt::Debug for CommandRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("kinds", &self.factories.len())
            .finish()
    }
}

/// Save a snapshot as a pretty-printed JSON file.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn save_snapshot<P: AsRef<Path>>(snapshot: &Snapshot, path: P) -> Result<()> {
    let path = path.as_ref();
    debug!("saving history snapshot to: {}", path.display());

    let content = snapshot.to_json()?;
    std::fs::write(path, content)
        .with_context(|| format!("failed to write snapshot file: {}", path.display()))?;

    info!(
        version = %snapshot.version,
        commands = snapshot.commands.len(),
        users = snapshot.user_positions.len(),
        "snapshot saved"
    );
    Ok(())
}

/// Load a snapshot from a JSON file, rejecting incompatible versions.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Snapshot> {
    let path = path.as_ref();
    debug!("loading history snapshot from: {}", path.display());

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot file: {}", path.display()))?;
    let snapshot = Snapshot::from_json(&content)?;

    if !snapshot.is_compatible() {
        return Err(HistoryError::UnsupportedVersion {
            found: snapshot.version,
            expected: SNAPSHOT_VERSION.to_string(),
        }
        .into());
    }

    info!(
        version = %snapshot.version,
        commands = snapshot.commands.len(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::affects_set;
    use crate::testutil::{register_test_commands, set_value, TestState};

    #[test]
    fn test_serialized_command_captures_attributes() {
        let command = set_value("u1", "a", 5, 0);
        let record = SerializedCommand::from_command(command.as_ref());
        assert_eq!(record.id, command.id());
        assert_eq!(record.kind, "set_value");
        assert_eq!(record.user_id, "u1");
        assert!(record.affects.contains("a"));
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let record = SerializedCommand {
            id: Uuid::new_v4(),
            kind: "set_value".to_string(),
            timestamp: 1_000,
            user_id: "u1".to_string(),
            affects: affects_set(["a"]),
            metadata: serde_json::json!({"key": "a", "value": 5, "previous": 0}),
        };
        let snapshot = Snapshot::new(
            vec![record.clone()],
            HashMap::from([("u1".to_string(), vec![record.id])]),
            HashMap::from([("u1".to_string(), 0)]),
        );

        let json = snapshot.to_json().unwrap();
        let decoded = Snapshot::from_json(&json).unwrap();
        assert_eq!(decoded.version, SNAPSHOT_VERSION);
        assert_eq!(decoded.commands.len(), 1);
        assert_eq!(decoded.user_stacks["u1"], vec![record.id]);
        assert_eq!(decoded.user_positions["u1"], 0);
        assert_eq!(decoded.commands[0].id, snapshot.commands[0].id);
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let err = Snapshot::from_json("{\"version\": \"1.0.0\"").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HistoryError>(),
            Some(HistoryError::MalformedSnapshot(_))
        ));

        // Structurally valid JSON missing required fields is also malformed
        let err = Snapshot::from_json("{\"version\": \"1.0.0\"}").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HistoryError>(),
            Some(HistoryError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_registry_decodes_known_kind() {
        let mut registry: CommandRegistry<TestState> = CommandRegistry::new();
        register_test_commands(&mut registry);
        assert!(registry.contains("set_value"));

        let original = set_value("u1", "a", 5, 0);
        let record = SerializedCommand::from_command(original.as_ref());
        let rebuilt = registry.decode(&record).unwrap();
        assert_eq!(rebuilt.id(), original.id());
        assert_eq!(rebuilt.kind(), "set_value");
        assert_eq!(rebuilt.timestamp(), original.timestamp());
    }

    #[test]
    fn test_registry_rejects_unknown_kind() {
        let registry: CommandRegistry<TestState> = CommandRegistry::new();
        let record = SerializedCommand {
            id: Uuid::new_v4(),
            kind: "mystery".to_string(),
            timestamp: 0,
            user_id: "u1".to_string(),
            affects: BTreeSet::new(),
            metadata: Value::Null,
        };
        let err = registry.decode(&record).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HistoryError>(),
            Some(HistoryError::UnknownCommandKind(kind)) if kind == "mystery"
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let snapshot = Snapshot::new(Vec::new(), HashMap::new(), HashMap::new());
        save_snapshot(&snapshot, &path).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded.version, snapshot.version);
        assert!(loaded.commands.is_empty());
    }

    #[test]
    fn test_load_rejects_old_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.json");

        let mut snapshot = Snapshot::new(Vec::new(), HashMap::new(), HashMap::new());
        snapshot.version = "0.9.0".to_string();
        std::fs::write(&path, snapshot.to_json().unwrap()).unwrap();

        let err = load_snapshot(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HistoryError>(),
            Some(HistoryError::UnsupportedVersion { found, .. }) if found == "0.9.0"
        ));
    }
}
