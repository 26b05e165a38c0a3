//! Cross-user conflict records
//!
//! The engine detects overlaps between different users' commands and keeps
//! an append-only log of them. Detection is advisory: nothing is rolled
//! back or merged automatically, and tagging a record with a resolution is
//! entirely the caller's business.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the caller settled a conflict. Set via
/// `HistoryEngine::resolve_conflict`; never interpreted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    LastWriteWins,
    FirstWriteWins,
    Merge,
    Manual,
}

/// A record of two or more users touching the same entities within the
/// conflict window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    /// Unique record identifier
    pub id: Uuid,
    /// The commands involved: every overlapping prior command, in log
    /// order, followed by the newly submitted one
    pub command_ids: Vec<Uuid>,
    /// The distinct users behind `command_ids`, in first-seen order
    pub users: Vec<String>,
    /// The entities the commands overlap on
    pub entities: BTreeSet<String>,
    /// Detection time, ms since epoch
    pub detected_at: i64,
    /// Caller-assigned resolution, if any
    pub resolution: Option<ConflictResolution>,
}

impl Conflict {
    pub(crate) fn new(command_ids: Vec<Uuid>, users: Vec<String>, entities: BTreeSet<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            command_ids,
            users,
            entities,
            detected_at: chrono::Utc::now().timestamp_millis(),
            resolution: None,
        }
    }

    /// Whether the caller has tagged this record with a resolution.
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}
