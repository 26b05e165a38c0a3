//! Command implementations for the game table
//!
//! Concrete commands over [`GameState`]: card movement, tapping, drawing,
//! life totals and turn structure, plus a composite that groups several
//! commands into one undoable action. `register_builtin_commands` wires
//! every kind into a registry so snapshots containing them can be decoded.

pub mod card_commands;
pub mod player_commands;
pub mod turn_commands;

// Re-export commonly used command types
pub use card_commands::{DrawCardCommand, MoveCardCommand, TapCardCommand};
pub use player_commands::{SetLifeCommand, UpdateLifeCommand};
pub use turn_commands::AdvanceTurnCommand;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tablesync_core::{Command, CommandInfo, CommandRegistry, SerializedCommand};
use uuid::Uuid;

use crate::game::GameState;

/// Register a factory for every bundled command kind.
pub fn register_builtin_commands(registry: &mut CommandRegistry<GameState>) {
    card_commands::register(registry);
    player_commands::register(registry);
    turn_commands::register(registry);
    registry.register("composite", |record, registry| {
        Ok(Arc::new(CompositeCommand::from_serialized(record, registry)?)
            as Arc<dyn Command<GameState>>)
    });
}

/// A composite command that groups multiple commands together
///
/// Useful for operations that consist of several atomic steps but should
/// be undone as a single action: apply runs the children in order, revert
/// runs them in reverse, and reverting requires every child's effect to
/// still be present. The composite affects the union of its children's
/// entities and serializes the children inside its own metadata.
pub struct CompositeCommand<S> {
    info: CommandInfo,
    description: String,
    commands: Vec<Arc<dyn Command<S>>>,
}

impl<S> CompositeCommand<S> {
    /// Create a new composite command
    pub fn new(
        user: impl Into<String>,
        description: impl Into<String>,
        commands: Vec<Arc<dyn Command<S>>>,
    ) -> Self {
        let affects: BTreeSet<String> = commands
            .iter()
            .flat_map(|command| command.affects().iter().cloned())
            .collect();
        Self {
            info: CommandInfo::new(user, affects),
            description: description.into(),
            commands,
        }
    }

    /// Get the number of sub-commands
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    fn from_serialized(record: &SerializedCommand, registry: &CommandRegistry<S>) -> Result<Self> {
        let description = record.metadata["description"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing field 'description' in command metadata"))?
            .to_string();
        let children = record.metadata["commands"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("missing field 'commands' in command metadata"))?;

        let mut commands = Vec::with_capacity(children.len());
        for child in children {
            let child: SerializedCommand = serde_json::from_value(child.clone())?;
            commands.push(registry.decode(&child)?);
        }

        Ok(Self {
            info: CommandInfo::from_serialized(record),
            description,
            commands,
        })
    }
}

impl<S: Clone> Command<S> for CompositeCommand<S> {
    fn id(&self) -> Uuid {
        self.info.id
    }

    fn kind(&self) -> &str {
        "composite"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn timestamp(&self) -> i64 {
        self.info.timestamp
    }

    fn user_id(&self) -> &str {
        &self.info.user_id
    }

    fn affects(&self) -> &BTreeSet<String> {
        &self.info.affects
    }

    fn metadata(&self) -> Value {
        let children: Vec<Value> = self
            .commands
            .iter()
            .map(|command| {
                serde_json::to_value(SerializedCommand::from_command(command.as_ref()))
                    .unwrap_or(Value::Null)
            })
            .collect();
        json!({
            "description": self.description,
            "commands": children,
        })
    }

    fn apply(&self, state: &S) -> Result<S> {
        let mut result: Option<S> = None;
        for command in &self.commands {
            let input = result.as_ref().unwrap_or(state);
            result = Some(command.apply(input)?);
        }
        Ok(result.unwrap_or_else(|| state.clone()))
    }

    fn revert(&self, state: &S) -> Result<S> {
        let mut result: Option<S> = None;
        for command in self.commands.iter().rev() {
            let input = result.as_ref().unwrap_or(state);
            result = Some(command.revert(input)?);
        }
        Ok(result.unwrap_or_else(|| state.clone()))
    }

    fn can_revert(&self, state: &S) -> bool {
        self.commands.iter().all(|command| command.can_revert(state))
    }
}

impl<S> fmt::Debug for CompositeCommand<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeCommand")
            .field("id", &self.info.id)
            .field("description", &self.description)
            .field("commands", &self.commands.len())
            .finish()
    }
}
