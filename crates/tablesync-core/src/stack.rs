//! Per-user undo stack
//!
//! Each user submitting commands gets one UndoStack: an ordered sequence of
//! that user's commands, a cursor marking the last-applied entry, and a map
//! of named branch snapshots for speculative lines of play.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::command::Command;

/// Ordered command sequence plus cursor for a single user.
///
/// Invariants: every held command carries this stack's `user_id`, timestamps
/// are non-decreasing along `commands`, and `-1 <= position < len`. The
/// active prefix `commands[0..=position]` is exactly the set of this user's
/// commands currently in effect; `position == -1` means nothing can be
/// undone.
pub struct UndoStack<S> {
    user_id: String,
    commands: Vec<Arc<dyn Command<S>>>,
    position: isize,
    branches: HashMap<String, Vec<Arc<dyn Command<S>>>>,
}

impl<S> UndoStack<S> {
    /// Create an empty stack owned by `user_id`.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            commands: Vec::new(),
            position: -1,
            branches: HashMap::new(),
        }
    }

    /// The owning user.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Append a command, discarding any previously undone suffix first.
    ///
    /// There is no forking without a branch: anything beyond the cursor is
    /// dropped before the new command is appended, and the cursor lands on
    /// the new entry.
    pub fn push(&mut self, command: Arc<dyn Command<S>>) {
        debug_assert_eq!(command.user_id(), self.user_id);
        if let Some(current) = self.current() {
            debug_assert!(command.timestamp() >= current.timestamp());
        }
        self.commands.truncate((self.position + 1) as usize);
        self.commands.push(command);
        self.position = self.commands.len() as isize - 1;
    }

    /// The command the cursor points at, i.e. the next undo candidate.
    pub fn current(&self) -> Option<&Arc<dyn Command<S>>> {
        if self.position >= 0 {
            self.commands.get(self.position as usize)
        } else {
            None
        }
    }

    /// The command just past the cursor, i.e. the next redo candidate.
    pub fn next(&self) -> Option<&Arc<dyn Command<S>>> {
        self.commands.get((self.position + 1) as usize)
    }

    /// Move the cursor one step back. Saturates at the bottom.
    pub fn move_back(&mut self) {
        if self.position >= 0 {
            self.position -= 1;
        }
    }

    /// Move the cursor one step forward. Saturates at the top.
    pub fn move_forward(&mut self) {
        if self.position + 1 < self.commands.len() as isize {
            self.position += 1;
        }
    }

    pub fn can_undo(&self) -> bool {
        self.position >= 0
    }

    pub fn can_redo(&self) -> bool {
        self.position + 1 < self.commands.len() as isize
    }

    /// Cursor value, `-1` when nothing is applied.
    pub fn position(&self) -> isize {
        self.position
    }

    /// Set the cursor directly. Used when cursors are restored from a
    /// snapshot; `position` must already be validated against `len`.
    pub(crate) fn set_position(&mut self, position: isize) {
        debug_assert!(position >= -1 && position < self.commands.len() as isize);
        self.position = position;
    }

    /// All commands held by this stack, applied or not, in submission order.
    pub fn commands(&self) -> &[Arc<dyn Command<S>>] {
        &self.commands
    }

    /// The commands currently in effect, in application order.
    pub fn active_prefix(&self) -> Vec<Arc<dyn Command<S>>> {
        self.commands[..(self.position + 1) as usize].to_vec()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Snapshot the active prefix under `name`, replacing any snapshot
    /// already stored there. Commands are immutable, so the snapshot is a
    /// shallow copy of the reference sequence.
    pub fn create_branch(&mut self, name: impl Into<String>) {
        let name = name.into();
        debug!(user = %self.user_id, branch = %name, "creating branch");
        self.branches.insert(name, self.active_prefix());
    }

    /// Replace the stack contents with the named snapshot and point the
    /// cursor at its end. The branch is consumed by the restore. Returns
    /// false for an unknown name.
    pub fn restore_branch(&mut self, name: &str) -> bool {
        match self.branches.remove(name) {
            Some(snapshot) => {
                debug!(user = %self.user_id, branch = %name, len = snapshot.len(), "restoring branch");
                self.position = snapshot.len() as isize - 1;
                self.commands = snapshot;
                true
            }
            None => false,
        }
    }

    /// Drop the named snapshot. Returns false for an unknown name.
    pub fn delete_branch(&mut self, name: &str) -> bool {
        self.branches.remove(name).is_some()
    }

    /// Names of the stored branch snapshots, unordered.
    pub fn branch_names(&self) -> Vec<&str> {
        self.branches.keys().map(String::as_str).collect()
    }
}

impl<S> fmt::Debug for UndoStack<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoStack")
            .field("user_id", &self.user_id)
            .field("len", &self.commands.len())
            .field("position", &self.position)
            .field("branches", &self.branches.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{set_value, TestState};

    fn ids<S>(commands: &[Arc<dyn Command<S>>]) -> Vec<uuid::Uuid> {
        commands.iter().map(|c| c.id()).collect()
    }

    #[test]
    fn test_empty_stack() {
        let stack: UndoStack<TestState> = UndoStack::new("u1");
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
        assert_eq!(stack.position(), -1);
        assert!(stack.current().is_none());
        assert!(stack.next().is_none());
        assert!(stack.active_prefix().is_empty());
    }

    #[test]
    fn test_push_and_cursor_movement() {
        let mut stack: UndoStack<TestState> = UndoStack::new("u1");
        stack.push(set_value("u1", "a", 1, 0));
        stack.push(set_value("u1", "b", 2, 0));

        assert_eq!(stack.position(), 1);
        assert!(stack.can_undo());
        assert!(!stack.can_redo());

        stack.move_back();
        assert_eq!(stack.position(), 0);
        assert!(stack.can_redo());
        assert_eq!(stack.next().unwrap().id(), stack.commands()[1].id());

        stack.move_back();
        assert_eq!(stack.position(), -1);
        assert!(!stack.can_undo());

        // Saturates instead of underflowing
        stack.move_back();
        assert_eq!(stack.position(), -1);

        stack.move_forward();
        stack.move_forward();
        assert_eq!(stack.position(), 1);
        stack.move_forward();
        assert_eq!(stack.position(), 1);
    }

    #[test]
    fn test_push_truncates_undone_suffix() {
        let mut stack: UndoStack<TestState> = UndoStack::new("u1");
        stack.push(set_value("u1", "a", 1, 0));
        stack.push(set_value("u1", "b", 2, 0));
        stack.move_back();

        let replacement = set_value("u1", "c", 3, 0);
        let replacement_id = replacement.id();
        stack.push(replacement);

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.commands()[1].id(), replacement_id);
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_branch_create_restore() {
        let mut stack: UndoStack<TestState> = UndoStack::new("u1");
        stack.push(set_value("u1", "a", 1, 0));
        let saved = ids(&stack.active_prefix());

        stack.create_branch("main-line");
        stack.push(set_value("u1", "b", 2, 0));
        stack.push(set_value("u1", "c", 3, 0));
        assert_eq!(stack.len(), 3);

        assert!(stack.restore_branch("main-line"));
        assert_eq!(ids(&stack.active_prefix()), saved);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.position(), 0);

        // Restore consumed the branch
        assert!(!stack.restore_branch("main-line"));
    }

    #[test]
    fn test_branch_unknown_and_delete() {
        let mut stack: UndoStack<TestState> = UndoStack::new("u1");
        assert!(!stack.restore_branch("nope"));
        assert!(!stack.delete_branch("nope"));

        stack.create_branch("empty");
        assert!(stack.delete_branch("empty"));
        assert!(!stack.restore_branch("empty"));
    }

    #[test]
    fn test_restore_empty_branch_resets_cursor() {
        let mut stack: UndoStack<TestState> = UndoStack::new("u1");
        stack.create_branch("clean");
        stack.push(set_value("u1", "a", 1, 0));

        assert!(stack.restore_branch("clean"));
        assert_eq!(stack.position(), -1);
        assert!(stack.is_empty());
    }
}
