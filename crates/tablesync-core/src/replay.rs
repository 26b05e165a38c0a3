//! Chronological replay driver
//!
//! Replays a command sequence against an initial state, with optional
//! filters. Replay is a pure function: it never touches engine state, so it
//! can run against any command list from any source (a live history, a
//! decoded snapshot, a hand-built scenario).

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use crate::command::Command;

/// Filters applied while replaying.
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Only apply commands submitted by this user.
    pub user_id: Option<String>,
    /// Command ids to skip entirely.
    pub skip: HashSet<Uuid>,
    /// Replay becomes active after this id; the command carrying it is
    /// itself skipped.
    pub start_from: Option<Uuid>,
    /// Replay halts at this id; the command carrying it is not applied.
    pub stop_at: Option<Uuid>,
}

impl ReplayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict replay to a single user's commands.
    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Skip the given command ids.
    pub fn skipping(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.skip.extend(ids);
        self
    }

    /// Start applying only after the command with `id`.
    pub fn starting_after(mut self, id: Uuid) -> Self {
        self.start_from = Some(id);
        self
    }

    /// Halt before applying the command with `id`.
    pub fn stopping_at(mut self, id: Uuid) -> Self {
        self.stop_at = Some(id);
        self
    }
}

/// Apply `commands` in order to a copy of `initial`, honoring `options`.
///
/// The first command error aborts the replay and is returned unchanged.
pub fn replay<S: Clone>(
    initial: &S,
    commands: &[Arc<dyn Command<S>>],
    options: &ReplayOptions,
) -> Result<S> {
    let mut state = initial.clone();
    let mut active = options.start_from.is_none();

    for command in commands {
        if options.stop_at == Some(command.id()) {
            break;
        }
        if !active {
            if options.start_from == Some(command.id()) {
                active = true;
            }
            continue;
        }
        if let Some(user_id) = &options.user_id {
            if command.user_id() != user_id {
                continue;
            }
        }
        if options.skip.contains(&command.id()) {
            continue;
        }
        state = command.apply(&state)?;
    }

    Ok(state)
}
