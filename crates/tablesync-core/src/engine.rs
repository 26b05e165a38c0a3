//! History manager
//!
//! HistoryEngine coordinates the per-user stacks, the global chronological
//! log, the dependency graph, the conflict log and the redo buffers behind
//! one public API. The engine never applies a submitted command and never
//! reads the state type `S`: the caller owns the state and threads it
//! through `undo`/`redo`/`replay` explicitly.
//!
//! All operations are synchronous and assume serial use; callers that need
//! concurrent submission wrap the engine in a mutex.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};
use uuid::Uuid;

use crate::command::Command;
use crate::conflict::{Conflict, ConflictResolution};
use crate::error::HistoryError;
use crate::graph::DependencyGraph;
use crate::replay::ReplayOptions;
use crate::snapshot::{CommandRegistry, SerializedCommand, Snapshot};
use crate::stack::UndoStack;

/// Number of trailing global-log entries scanned for conflicts on submit.
pub const DEFAULT_CONFLICT_WINDOW: usize = 10;

/// Retention policy for [`HistoryEngine::prune`].
///
/// A command survives when it is authored by a user in `keep_from_users`,
/// touches an entity in `keep_affecting`, or is younger than `max_age_ms`
/// (unset means no age limit). `max_commands` then caps the survivors to
/// the most recent N.
#[derive(Debug, Clone, Default)]
pub struct PruneConfig {
    pub max_commands: Option<usize>,
    pub max_age_ms: Option<i64>,
    pub keep_affecting: HashSet<String>,
    pub keep_from_users: HashSet<String>,
}

impl PruneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_commands(mut self, max: usize) -> Self {
        self.max_commands = Some(max);
        self
    }

    pub fn with_max_age_ms(mut self, max_age_ms: i64) -> Self {
        self.max_age_ms = Some(max_age_ms);
        self
    }

    pub fn keeping_entities(mut self, entities: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.keep_affecting.extend(entities.into_iter().map(Into::into));
        self
    }

    pub fn keeping_users(mut self, users: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.keep_from_users.extend(users.into_iter().map(Into::into));
        self
    }
}

/// Aggregate figures over the global log.
#[derive(Debug, Clone, Default)]
pub struct HistoryStats {
    pub total_commands: usize,
    pub commands_by_user: HashMap<String, usize>,
    pub commands_by_kind: HashMap<String, usize>,
    pub oldest_timestamp: Option<i64>,
    pub newest_timestamp: Option<i64>,
    /// Rough serialized size of the log, in bytes
    pub estimated_bytes: usize,
}

/// Multi-user command history manager over an opaque state `S`.
pub struct HistoryEngine<S> {
    global_log: Vec<Arc<dyn Command<S>>>,
    by_id: HashMap<Uuid, Arc<dyn Command<S>>>,
    stacks: HashMap<String, UndoStack<S>>,
    redo_buffers: HashMap<String, Vec<Arc<dyn Command<S>>>>,
    graph: DependencyGraph,
    conflicts: Vec<Conflict>,
    conflict_window: usize,
}

impl<S> Default for HistoryEngine<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> HistoryEngine<S> {
    pub fn new() -> Self {
        Self::with_conflict_window(DEFAULT_CONFLICT_WINDOW)
    }

    /// Create an engine scanning the last `window` log entries on submit.
    pub fn with_conflict_window(window: usize) -> Self {
        Self {
            global_log: Vec::new(),
            by_id: HashMap::new(),
            stacks: HashMap::new(),
            redo_buffers: HashMap::new(),
            graph: DependencyGraph::new(),
            conflicts: Vec::new(),
            conflict_window: window,
        }
    }

    pub fn conflict_window(&self) -> usize {
        self.conflict_window
    }

    /// Record a command: append it to the global log, push it on the
    /// submitter's stack (created lazily), clear that user's redo buffer,
    /// materialize dependency edges and scan the log tail for cross-user
    /// conflicts.
    ///
    /// The command is *not* applied; the caller controls the state.
    pub fn submit(&mut self, command: Arc<dyn Command<S>>) -> Result<()> {
        debug!(
            id = %command.id(),
            kind = command.kind(),
            user = command.user_id(),
            "submitting command"
        );

        let user = command.user_id().to_string();
        self.ingest(command.clone())?;
        self.stacks
            .entry(user.clone())
            .or_insert_with(|| UndoStack::new(user.clone()))
            .push(command);
        self.redo_buffers.remove(&user);
        Ok(())
    }

    /// Shared admission path for live submits and snapshot reloads: the
    /// duplicate-id check, the global log and id map, dependency edges and
    /// the conflict scan. Stacks and redo buffers are the caller's concern.
    fn ingest(&mut self, command: Arc<dyn Command<S>>) -> Result<()> {
        let id = command.id();
        if self.by_id.contains_key(&id) {
            return Err(HistoryError::DuplicateCommandId(id).into());
        }
        self.global_log.push(command.clone());
        self.by_id.insert(id, command.clone());
        self.graph.record(id, command.timestamp(), command.affects());
        self.detect_conflicts(&command);
        Ok(())
    }

    /// Scan the log tail (excluding the just-appended command) for entries
    /// by other users that overlap the new command's entities.
    fn detect_conflicts(&mut self, command: &Arc<dyn Command<S>>) {
        let prior_len = self.global_log.len() - 1;
        let window_start = prior_len.saturating_sub(self.conflict_window);

        let mut prior_ids = Vec::new();
        let mut users = vec![command.user_id().to_string()];
        let mut entities: BTreeSet<String> = BTreeSet::new();

        for prior in &self.global_log[window_start..prior_len] {
            if prior.user_id() == command.user_id() {
                continue;
            }
            let overlap: Vec<&String> =
                prior.affects().intersection(command.affects()).collect();
            if overlap.is_empty() {
                continue;
            }
            entities.extend(overlap.into_iter().cloned());
            prior_ids.push(prior.id());
            let user = prior.user_id().to_string();
            if !users.contains(&user) {
                users.push(user);
            }
        }

        if prior_ids.is_empty() {
            return;
        }

        // Involved users in first-seen order, the submitter's priors first
        users.rotate_left(1);
        let mut command_ids = prior_ids;
        command_ids.push(command.id());

        info!(
            commands = command_ids.len(),
            entities = entities.len(),
            "cross-user conflict detected"
        );
        self.conflicts.push(Conflict::new(command_ids, users, entities));
    }

    /// Undo the submitting user's most recent applied command.
    ///
    /// Commands by any user that depend on it (newer, overlapping entities)
    /// are reverted first, newest to oldest, as selective undos: their
    /// cursors and redo buffers are untouched. If any step's `can_revert`
    /// refuses — checked against the state the preceding reverts produced —
    /// the whole call fails with `ValidationFailed` and neither the engine
    /// nor the caller's state changes.
    ///
    /// With nothing to undo, the input state is returned unchanged.
    pub fn undo(&mut self, user: &str, state: &S) -> Result<S>
    where
        S: Clone,
    {
        let Some(command) = self.stacks.get(user).and_then(|s| s.current()).cloned() else {
            return Ok(state.clone());
        };

        let cascade = self.cascade_order(&command);
        let mut working: Option<S> = None;
        for dependent in &cascade {
            let input = working.as_ref().unwrap_or(state);
            if !dependent.can_revert(input) {
                return Err(HistoryError::ValidationFailed {
                    id: dependent.id(),
                    kind: dependent.kind().to_string(),
                }
                .into());
            }
            working = Some(dependent.revert(input)?);
        }

        let input = working.as_ref().unwrap_or(state);
        if !command.can_revert(input) {
            return Err(HistoryError::ValidationFailed {
                id: command.id(),
                kind: command.kind().to_string(),
            }
            .into());
        }
        let result = command.revert(input)?;

        if let Some(stack) = self.stacks.get_mut(user) {
            stack.move_back();
        }
        self.redo_buffers
            .entry(user.to_string())
            .or_default()
            .push(command.clone());

        debug!(
            id = %command.id(),
            user,
            cascaded = cascade.len(),
            "command undone"
        );
        Ok(result)
    }

    /// Dependents of `command` still present in the global log, newest
    /// first. Ids left dangling by `clear_user` resolve to nothing and are
    /// skipped.
    fn cascade_order(&self, command: &Arc<dyn Command<S>>) -> Vec<Arc<dyn Command<S>>> {
        let dependent_ids: HashSet<Uuid> =
            self.graph.dependents_of(command.id()).into_iter().collect();
        if dependent_ids.is_empty() {
            return Vec::new();
        }
        let mut cascade: Vec<Arc<dyn Command<S>>> = self
            .global_log
            .iter()
            .filter(|c| dependent_ids.contains(&c.id()))
            .cloned()
            .collect();
        // Submission order is the tie-break for equal timestamps
        cascade.reverse();
        cascade.sort_by_key(|c| std::cmp::Reverse(c.timestamp()));
        cascade
    }

    /// Re-apply the user's most recently undone command.
    ///
    /// With an empty redo buffer, the input state is returned unchanged.
    /// The buffer and cursor move only after the command's `apply`
    /// succeeded.
    pub fn redo(&mut self, user: &str, state: &S) -> Result<S>
    where
        S: Clone,
    {
        let Some(command) = self
            .redo_buffers
            .get(user)
            .and_then(|buffer| buffer.last())
            .cloned()
        else {
            return Ok(state.clone());
        };

        let result = command.apply(state)?;

        if let Some(buffer) = self.redo_buffers.get_mut(user) {
            buffer.pop();
        }
        if let Some(stack) = self.stacks.get_mut(user) {
            stack.move_forward();
        }

        debug!(id = %command.id(), user, "command redone");
        Ok(result)
    }

    /// Selective undo of one command, regardless of stack positions.
    ///
    /// No cursor moves and no redo buffer is touched; this is the primitive
    /// the cascade uses, exposed for callers that manage ordering
    /// themselves.
    pub fn undo_command(&self, command: &dyn Command<S>, state: &S) -> Result<S> {
        if !command.can_revert(state) {
            return Err(HistoryError::ValidationFailed {
                id: command.id(),
                kind: command.kind().to_string(),
            }
            .into());
        }
        command.revert(state)
    }

    pub fn can_undo(&self, user: &str) -> bool {
        self.stacks.get(user).is_some_and(UndoStack::can_undo)
    }

    pub fn can_redo(&self, user: &str) -> bool {
        self.redo_buffers
            .get(user)
            .is_some_and(|buffer| !buffer.is_empty())
    }

    /// Every command the user has submitted and not lost to truncation or
    /// branch restoration, in submission order.
    pub fn history(&self, user: &str) -> Vec<Arc<dyn Command<S>>> {
        self.stacks
            .get(user)
            .map(|stack| stack.commands().to_vec())
            .unwrap_or_default()
    }

    /// Every command ever submitted and not pruned, in submission order
    /// across all users.
    pub fn global_history(&self) -> &[Arc<dyn Command<S>>] {
        &self.global_log
    }

    /// The user's currently applied commands, oldest first.
    pub fn undoable(&self, user: &str) -> Vec<Arc<dyn Command<S>>> {
        self.stacks
            .get(user)
            .map(|stack| stack.active_prefix())
            .unwrap_or_default()
    }

    /// The user's undone commands, next redo first.
    pub fn redoable(&self, user: &str) -> Vec<Arc<dyn Command<S>>> {
        self.redo_buffers
            .get(user)
            .map(|buffer| buffer.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop everything: log, stacks, redo buffers, edges and conflicts.
    pub fn clear(&mut self) {
        self.global_log.clear();
        self.by_id.clear();
        self.stacks.clear();
        self.redo_buffers.clear();
        self.graph.clear();
        self.conflicts.clear();
        info!("history cleared");
    }

    /// Drop one user: their stack, redo buffer, their commands in the
    /// global log and the graph records keyed by those commands.
    ///
    /// Edges *to* the removed ids from other users' commands are left in
    /// place; everything resolving ids through the log skips them.
    pub fn clear_user(&mut self, user: &str) {
        self.stacks.remove(user);
        self.redo_buffers.remove(user);

        let removed: HashSet<Uuid> = self
            .global_log
            .iter()
            .filter(|c| c.user_id() == user)
            .map(|c| c.id())
            .collect();
        if removed.is_empty() {
            return;
        }

        self.global_log.retain(|c| c.user_id() != user);
        for id in &removed {
            self.by_id.remove(id);
        }
        self.graph.remove(&removed);
        info!(user, removed = removed.len(), "user history cleared");
    }

    /// Snapshot the user's active prefix under `name`. False for a user
    /// with no history.
    pub fn create_branch(&mut self, user: &str, name: &str) -> bool {
        match self.stacks.get_mut(user) {
            Some(stack) => {
                stack.create_branch(name);
                true
            }
            None => false,
        }
    }

    /// Restore a named branch, replacing the user's stack contents. The
    /// global log, other users' stacks, edges and conflicts are not
    /// rewound; callers wanting state coherence revert externally. False
    /// for an unknown user or branch.
    pub fn restore_branch(&mut self, user: &str, name: &str) -> bool {
        self.stacks
            .get_mut(user)
            .is_some_and(|stack| stack.restore_branch(name))
    }

    /// Drop a named branch. False for an unknown user or branch.
    pub fn delete_branch(&mut self, user: &str, name: &str) -> bool {
        self.stacks
            .get_mut(user)
            .is_some_and(|stack| stack.delete_branch(name))
    }

    /// Capture the persistable state: the serialized global log plus every
    /// user's stack contents and cursor.
    pub fn snapshot(&self) -> Snapshot {
        let commands = self
            .global_log
            .iter()
            .map(|command| SerializedCommand::from_command(command.as_ref()))
            .collect();
        let user_stacks = self
            .stacks
            .iter()
            .map(|(user, stack)| {
                let ids = stack.commands().iter().map(|command| command.id()).collect();
                (user.clone(), ids)
            })
            .collect();
        let user_positions = self
            .stacks
            .iter()
            .map(|(user, stack)| (user.clone(), stack.position() as i64))
            .collect();
        Snapshot::new(commands, user_stacks, user_positions)
    }

    /// Rebuild an engine from a snapshot.
    ///
    /// The global log is decoded through `registry` and re-ingested in
    /// order, which re-derives dependency edges and conflict records.
    /// Per-user stacks are rebuilt from their recorded id sequences — a
    /// stack can be a strict subset of the user's log entries after
    /// push-after-undo truncation or a branch restore — and cursors are
    /// then restored on top. Redo buffers and branches start empty, and
    /// prior conflict resolutions are not restored.
    pub fn from_snapshot(snapshot: &Snapshot, registry: &CommandRegistry<S>) -> Result<Self> {
        if !snapshot.is_compatible() {
            return Err(HistoryError::UnsupportedVersion {
                found: snapshot.version.clone(),
                expected: crate::snapshot::SNAPSHOT_VERSION.to_string(),
            }
            .into());
        }

        let mut engine = Self::new();
        for record in &snapshot.commands {
            let command = registry.decode(record)?;
            engine.ingest(command)?;
        }

        for (user, ids) in &snapshot.user_stacks {
            let mut stack = UndoStack::new(user.clone());
            for id in ids {
                let command = engine.by_id.get(id).cloned().ok_or_else(|| {
                    HistoryError::MalformedSnapshot(format!(
                        "stack entry {id} for user '{user}' is not in the command log"
                    ))
                })?;
                if command.user_id() != user.as_str() {
                    return Err(HistoryError::MalformedSnapshot(format!(
                        "stack entry {id} for user '{user}' belongs to '{}'",
                        command.user_id()
                    ))
                    .into());
                }
                stack.push(command);
            }
            engine.stacks.insert(user.clone(), stack);
        }

        for (user, position) in &snapshot.user_positions {
            match engine.stacks.get_mut(user) {
                Some(stack) => {
                    if *position < -1 || *position >= stack.len() as i64 {
                        return Err(HistoryError::MalformedSnapshot(format!(
                            "cursor {position} out of range for user '{user}'"
                        ))
                        .into());
                    }
                    stack.set_position(*position as isize);
                }
                // A cursor for a user with no commands is only meaningful
                // at -1
                None if *position == -1 => {}
                None => {
                    return Err(HistoryError::MalformedSnapshot(format!(
                        "cursor {position} for unknown user '{user}'"
                    ))
                    .into());
                }
            }
        }

        info!(
            commands = engine.global_log.len(),
            users = engine.stacks.len(),
            "engine restored from snapshot"
        );
        Ok(engine)
    }

    /// Pure filtered replay; see [`crate::replay::replay`].
    pub fn replay(
        &self,
        initial: &S,
        commands: &[Arc<dyn Command<S>>],
        options: &ReplayOptions,
    ) -> Result<S>
    where
        S: Clone,
    {
        crate::replay::replay(initial, commands, options)
    }

    /// Compact the global log under `config`, returning how many commands
    /// were removed.
    ///
    /// Only the log (and its id map) is rewritten: per-user stacks,
    /// dependency edges and conflict records keep whatever they reference,
    /// so `history(user)` may afterwards list commands `global_history()`
    /// no longer holds.
    pub fn prune(&mut self, config: &PruneConfig) -> usize {
        let now = chrono::Utc::now().timestamp_millis();
        let before = self.global_log.len();

        let mut retained: Vec<Arc<dyn Command<S>>> = self
            .global_log
            .iter()
            .filter(|command| Self::is_retained(command.as_ref(), config, now))
            .cloned()
            .collect();
        if let Some(max) = config.max_commands {
            if retained.len() > max {
                retained.drain(..retained.len() - max);
            }
        }

        self.global_log = retained;
        self.by_id = self
            .global_log
            .iter()
            .map(|command| (command.id(), command.clone()))
            .collect();

        let removed = before - self.global_log.len();
        if removed > 0 {
            info!(removed, remaining = self.global_log.len(), "global log pruned");
        }
        removed
    }

    fn is_retained(command: &dyn Command<S>, config: &PruneConfig, now: i64) -> bool {
        if config.keep_from_users.contains(command.user_id()) {
            return true;
        }
        if command
            .affects()
            .iter()
            .any(|entity| config.keep_affecting.contains(entity))
        {
            return true;
        }
        match config.max_age_ms {
            None => true,
            Some(max_age_ms) => now - command.timestamp() <= max_age_ms,
        }
    }

    /// Aggregate totals over the global log.
    pub fn stats(&self) -> HistoryStats {
        let mut stats = HistoryStats {
            total_commands: self.global_log.len(),
            ..Default::default()
        };
        for command in &self.global_log {
            *stats
                .commands_by_user
                .entry(command.user_id().to_string())
                .or_insert(0) += 1;
            *stats
                .commands_by_kind
                .entry(command.kind().to_string())
                .or_insert(0) += 1;
            stats.estimated_bytes += Self::estimated_size(command.as_ref());
        }
        stats.oldest_timestamp = self.global_log.iter().map(|c| c.timestamp()).min();
        stats.newest_timestamp = self.global_log.iter().map(|c| c.timestamp()).max();
        stats
    }

    // id + timestamp are fixed-width; strings and metadata dominate
    fn estimated_size(command: &dyn Command<S>) -> usize {
        let metadata_len = serde_json::to_string(&command.metadata())
            .map(|payload| payload.len())
            .unwrap_or(0);
        24 + command.kind().len()
            + command.user_id().len()
            + command.affects().iter().map(String::len).sum::<usize>()
            + metadata_len
    }

    /// The append-only conflict log, oldest first.
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// Tag a conflict record with a resolution. Never alters state.
    /// False for an unknown record id.
    pub fn resolve_conflict(&mut self, conflict_id: Uuid, resolution: ConflictResolution) -> bool {
        match self
            .conflicts
            .iter_mut()
            .find(|conflict| conflict.id == conflict_id)
        {
            Some(conflict) => {
                conflict.resolution = Some(resolution);
                true
            }
            None => false,
        }
    }

    /// Direct dependencies (older, overlapping) of a command id.
    pub fn dependencies_of(&self, id: Uuid) -> Vec<Uuid> {
        self.graph.dependencies_of(id)
    }

    /// Direct dependents (newer, overlapping) of a command id.
    pub fn dependents_of(&self, id: Uuid) -> Vec<Uuid> {
        self.graph.dependents_of(id)
    }
}

impl<S> fmt::Debug for HistoryEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryEngine")
            .field("commands", &self.global_log.len())
            .field("users", &self.stacks.len())
            .field("conflicts", &self.conflicts.len())
            .field("conflict_window", &self.conflict_window)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{set_value, set_value_at, value_of, TestState};

    #[test]
    fn test_submit_and_undo_redo_round_trip() {
        let mut engine: HistoryEngine<TestState> = HistoryEngine::new();
        let command = set_value("u1", "a", 1, 0);

        let state = command.apply(&TestState::new()).unwrap();
        engine.submit(command).unwrap();
        assert!(engine.can_undo("u1"));
        assert!(!engine.can_redo("u1"));

        let undone = engine.undo("u1", &state).unwrap();
        assert_eq!(value_of(&undone, "a"), 0);
        assert!(!engine.can_undo("u1"));
        assert!(engine.can_redo("u1"));

        let redone = engine.redo("u1", &undone).unwrap();
        assert_eq!(value_of(&redone, "a"), 1);
        assert!(engine.can_undo("u1"));
        assert!(!engine.can_redo("u1"));
    }

    #[test]
    fn test_undo_with_nothing_applied_is_identity() {
        let mut engine: HistoryEngine<TestState> = HistoryEngine::new();
        let state = TestState::new();
        let result = engine.undo("ghost", &state).unwrap();
        assert_eq!(result, state);
        let result = engine.redo("ghost", &state).unwrap();
        assert_eq!(result, state);
    }

    #[test]
    fn test_duplicate_submit_is_rejected() {
        let mut engine: HistoryEngine<TestState> = HistoryEngine::new();
        let command = set_value("u1", "a", 1, 0);
        engine.submit(command.clone()).unwrap();

        let err = engine.submit(command).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HistoryError>(),
            Some(HistoryError::DuplicateCommandId(_))
        ));
        assert_eq!(engine.global_history().len(), 1);
    }

    #[test]
    fn test_submit_clears_redo_buffer() {
        let mut engine: HistoryEngine<TestState> = HistoryEngine::new();
        let state = TestState::new();

        let first = set_value("u1", "a", 1, 0);
        let state = first.apply(&state).unwrap();
        engine.submit(first).unwrap();
        let state = engine.undo("u1", &state).unwrap();
        assert!(engine.can_redo("u1"));

        let second = set_value("u1", "b", 2, 0);
        second.apply(&state).unwrap();
        engine.submit(second).unwrap();
        assert!(!engine.can_redo("u1"));
        assert!(engine.redoable("u1").is_empty());
    }

    #[test]
    fn test_undo_cascades_dependents_across_users() {
        let mut engine: HistoryEngine<TestState> = HistoryEngine::new();
        let state = TestState::new();

        let older = set_value_at("u1", "a", 1, 0, 1_000);
        let newer = set_value_at("u2", "a", 2, 1, 2_000);
        let state = older.apply(&state).unwrap();
        let state = newer.apply(&state).unwrap();
        engine.submit(older.clone()).unwrap();
        engine.submit(newer.clone()).unwrap();
        assert_eq!(engine.dependents_of(older.id()), vec![newer.id()]);

        // Undoing u1's command peels u2's dependent first
        let result = engine.undo("u1", &state).unwrap();
        assert_eq!(value_of(&result, "a"), 0);

        // The cascaded command stays on u2's stack and gains no redo entry
        assert!(engine.can_undo("u2"));
        assert!(!engine.can_redo("u2"));
        assert!(engine.can_redo("u1"));
    }

    #[test]
    fn test_undo_validation_failure_leaves_engine_untouched() {
        let mut engine: HistoryEngine<TestState> = HistoryEngine::new();
        let command = set_value("u1", "a", 1, 0);
        engine.submit(command).unwrap();

        // Stale state: the command's effect is no longer present
        let mut stale = TestState::new();
        stale.values.insert("a".to_string(), 5);

        let err = engine.undo("u1", &stale).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HistoryError>(),
            Some(HistoryError::ValidationFailed { .. })
        ));
        assert!(engine.can_undo("u1"));
        assert!(!engine.can_redo("u1"));
    }

    #[test]
    fn test_undo_command_is_selective() {
        let mut engine: HistoryEngine<TestState> = HistoryEngine::new();
        let command = set_value("u1", "a", 1, 0);
        let state = command.apply(&TestState::new()).unwrap();
        engine.submit(command.clone()).unwrap();

        let result = engine.undo_command(command.as_ref(), &state).unwrap();
        assert_eq!(value_of(&result, "a"), 0);
        // No cursor moved, no redo buffer touched
        assert!(engine.can_undo("u1"));
        assert!(!engine.can_redo("u1"));
    }

    #[test]
    fn test_clear_user_rewrites_log_and_graph() {
        let mut engine: HistoryEngine<TestState> = HistoryEngine::new();
        let mine = set_value_at("u1", "a", 1, 0, 1_000);
        let theirs = set_value_at("u2", "a", 2, 1, 2_000);
        engine.submit(mine.clone()).unwrap();
        engine.submit(theirs.clone()).unwrap();

        engine.clear_user("u1");
        assert_eq!(engine.global_history().len(), 1);
        assert!(engine.history("u1").is_empty());
        assert!(!engine.can_undo("u1"));

        // u2's edge to the removed command dangles but resolves to nothing
        assert_eq!(engine.dependencies_of(theirs.id()), vec![mine.id()]);
        let state = theirs.apply(&TestState::from([("a", 1)])).unwrap();
        let result = engine.undo("u2", &state).unwrap();
        assert_eq!(value_of(&result, "a"), 1);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut engine: HistoryEngine<TestState> = HistoryEngine::new();
        engine.submit(set_value("u1", "a", 1, 0)).unwrap();
        engine.submit(set_value("u2", "a", 2, 1)).unwrap();
        assert!(!engine.conflicts().is_empty());

        engine.clear();
        assert!(engine.global_history().is_empty());
        assert!(engine.conflicts().is_empty());
        assert_eq!(engine.stats().total_commands, 0);
    }

    #[test]
    fn test_stats_aggregates() {
        let mut engine: HistoryEngine<TestState> = HistoryEngine::new();
        engine.submit(set_value_at("u1", "a", 1, 0, 1_000)).unwrap();
        engine.submit(set_value_at("u1", "b", 2, 0, 2_000)).unwrap();
        engine.submit(set_value_at("u2", "c", 3, 0, 3_000)).unwrap();

        let stats = engine.stats();
        assert_eq!(stats.total_commands, 3);
        assert_eq!(stats.commands_by_user["u1"], 2);
        assert_eq!(stats.commands_by_user["u2"], 1);
        assert_eq!(stats.commands_by_kind["set_value"], 3);
        assert_eq!(stats.oldest_timestamp, Some(1_000));
        assert_eq!(stats.newest_timestamp, Some(3_000));
        assert!(stats.estimated_bytes > 0);
    }

    #[test]
    fn test_conflict_window_is_tunable() {
        let mut engine: HistoryEngine<TestState> = HistoryEngine::with_conflict_window(1);
        engine.submit(set_value_at("u1", "a", 1, 0, 1_000)).unwrap();
        engine.submit(set_value_at("u2", "b", 2, 0, 2_000)).unwrap();
        // u1's overlapping command has scrolled out of the window of 1
        engine.submit(set_value_at("u3", "a", 3, 1, 3_000)).unwrap();
        assert!(engine.conflicts().is_empty());
    }
}
