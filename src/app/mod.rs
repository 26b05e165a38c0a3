//! Session framework
//!
//! A Session pairs one [`GameState`] with one [`HistoryEngine`] and keeps
//! the two coherent: executing a command applies it to the state and then
//! records it, undo and redo thread the state through the engine. This is
//! the intended calling pattern for the engine, which on its own never
//! applies commands.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use tablesync_core::{
    Command, Conflict, HistoryEngine, HistoryStats, PruneConfig, Snapshot,
    DEFAULT_CONFLICT_WINDOW,
};

use crate::game::GameState;

/// Session tuning knobs
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Global-log tail length scanned for cross-user conflicts
    pub conflict_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            conflict_window: DEFAULT_CONFLICT_WINDOW,
        }
    }
}

/// A running game session: the authoritative state plus its history.
#[derive(Debug)]
pub struct Session {
    engine: HistoryEngine<GameState>,
    state: GameState,
}

impl Session {
    /// Start a session from an initial state with default configuration.
    pub fn new(state: GameState) -> Self {
        Self::with_config(state, SessionConfig::default())
    }

    pub fn with_config(state: GameState, config: SessionConfig) -> Self {
        info!(
            players = state.turn_order.len(),
            conflict_window = config.conflict_window,
            "starting session"
        );
        Self {
            engine: HistoryEngine::with_conflict_window(config.conflict_window),
            state,
        }
    }

    /// The current table state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// The underlying history engine, read-only.
    pub fn engine(&self) -> &HistoryEngine<GameState> {
        &self.engine
    }

    /// The underlying history engine, for operations such as branching,
    /// pruning or conflict resolution.
    pub fn engine_mut(&mut self) -> &mut HistoryEngine<GameState> {
        &mut self.engine
    }

    /// Apply a command to the state and record it in the history.
    ///
    /// The state is only replaced once both steps succeeded, so a failed
    /// apply or a duplicate submission leaves the session unchanged.
    pub fn execute<C>(&mut self, command: C) -> Result<()>
    where
        C: Command<GameState> + 'static,
    {
        debug!(kind = command.kind(), user = command.user_id(), "executing command");
        let next = command.apply(&self.state)?;
        self.engine.submit(Arc::new(command))?;
        self.state = next;
        Ok(())
    }

    /// Undo the user's most recent command. Returns false when there was
    /// nothing to undo.
    pub fn undo(&mut self, user: &str) -> Result<bool> {
        if !self.engine.can_undo(user) {
            return Ok(false);
        }
        self.state = self.engine.undo(user, &self.state)?;
        Ok(true)
    }

    /// Redo the user's most recently undone command. Returns false when
    /// there was nothing to redo.
    pub fn redo(&mut self, user: &str) -> Result<bool> {
        if !self.engine.can_redo(user) {
            return Ok(false);
        }
        self.state = self.engine.redo(user, &self.state)?;
        Ok(true)
    }

    /// Snapshot the session history. The state itself is not part of the
    /// snapshot; replaying the decoded commands over the same initial
    /// state reproduces it.
    pub fn snapshot(&self) -> Snapshot {
        self.engine.snapshot()
    }

    /// Compact the history log.
    pub fn prune(&mut self, config: &PruneConfig) -> usize {
        self.engine.prune(config)
    }

    pub fn stats(&self) -> HistoryStats {
        self.engine.stats()
    }

    pub fn conflicts(&self) -> &[Conflict] {
        self.engine.conflicts()
    }
}
