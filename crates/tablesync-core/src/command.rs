//! Command contract for the history engine
//!
//! This module defines the Command trait every reversible operation must
//! implement, together with the CommandInfo attribute bag concrete command
//! types embed. The engine treats commands as black boxes: it never reads
//! the state they operate on and never looks inside their metadata.

use std::collections::BTreeSet;
use std::fmt::Debug;

use anyhow::Result;
use serde_json::Value;
use uuid::Uuid;

use crate::snapshot::SerializedCommand;

/// Core trait for all reversible commands over a state type `S`.
///
/// `apply` and `revert` are pure: they take the current state by reference
/// and return a new state, never mutating their input. Any pre-image a
/// command needs to reverse itself (the previous value of a field, the
/// position a card was taken from) must be captured inside the command at
/// construction time, not stored in the state: `revert` may run against a
/// state that later operations have modified and then been undone from.
///
/// For any `s0` where `apply(&s0)` produced `s1`, `revert(&s1)` must return
/// a state equal to `s0`, and `can_revert(&s1)` must be true as long as the
/// command's effect is still present.
pub trait Command<S>: Debug + Send + Sync {
    /// Unique identifier, assigned at construction.
    fn id(&self) -> Uuid;

    /// Family tag naming the command kind, used for statistics and for
    /// factory dispatch when a snapshot is reconstructed.
    fn kind(&self) -> &str;

    /// Human-readable description of this command.
    fn description(&self) -> &str;

    /// Creation time in milliseconds since the Unix epoch. Monotonic within
    /// a single submitter on a single host.
    fn timestamp(&self) -> i64;

    /// Opaque identifier of the submitting user.
    fn user_id(&self) -> &str;

    /// The set of entity identifiers this command reads or writes. Used for
    /// dependency and conflict reasoning; never interpreted beyond equality.
    fn affects(&self) -> &BTreeSet<String>;

    /// Opaque payload sufficient for a registered factory to rebuild this
    /// command after deserialization.
    fn metadata(&self) -> Value;

    /// Produce the state that results from performing this command.
    fn apply(&self, state: &S) -> Result<S>;

    /// Produce the state that results from reversing this command.
    fn revert(&self, state: &S) -> Result<S>;

    /// Whether this command's effect is still present in `state`, i.e.
    /// whether `revert` would succeed.
    fn can_revert(&self, state: &S) -> bool;
}

/// Attribute bag embedded by concrete command types.
///
/// Collects the identity fields the engine reads on every command so
/// implementations only add their own payload.
#[derive(Debug, Clone)]
pub struct CommandInfo {
    /// Unique command identifier
    pub id: Uuid,
    /// Submitting user
    pub user_id: String,
    /// Creation time, ms since epoch
    pub timestamp: i64,
    /// Entities this command touches
    pub affects: BTreeSet<String>,
}

impl CommandInfo {
    /// Create a fresh attribute bag for a newly constructed command.
    pub fn new(user_id: impl Into<String>, affects: BTreeSet<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            affects,
        }
    }

    /// Rebuild the attribute bag from a serialized command, preserving the
    /// original id and timestamp.
    pub fn from_serialized(record: &SerializedCommand) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id.clone(),
            timestamp: record.timestamp,
            affects: record.affects.clone(),
        }
    }
}

/// Build an affects set from anything yielding entity ids.
pub fn affects_set<I, T>(entities: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    entities.into_iter().map(Into::into).collect()
}
