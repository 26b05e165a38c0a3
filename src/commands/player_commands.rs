//! Player-related commands
//!
//! Life-total adjustments, relative and absolute. The absolute form
//! captures the previous total at construction; the relative form reverses
//! by applying the opposite delta.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tablesync_core::{affects_set, Command, CommandInfo, SerializedCommand};
use uuid::Uuid;

use crate::game::GameState;
use crate::utils::error::GameError;

/// Entity identifier for a player's life total
fn life_entity(player: &str) -> String {
    format!("{player}:life")
}

/// Command to adjust a player's life total by a delta
#[derive(Debug)]
pub struct UpdateLifeCommand {
    info: CommandInfo,
    description: String,
    player: String,
    delta: i32,
}

impl UpdateLifeCommand {
    pub fn new(
        state: &GameState,
        user: impl Into<String>,
        player: impl Into<String>,
        delta: i32,
    ) -> Result<Self> {
        let player = player.into();
        if state.life(&player).is_none() {
            return Err(GameError::UnknownPlayer(player).into());
        }

        Ok(Self {
            info: CommandInfo::new(user, affects_set([life_entity(&player)])),
            description: format!("{player} life {delta:+}"),
            player,
            delta,
        })
    }

    pub(crate) fn from_serialized(record: &SerializedCommand) -> Result<Self> {
        let player = record.metadata["player"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing field 'player' in command metadata"))?
            .to_string();
        let delta = record.metadata["delta"]
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("missing field 'delta' in command metadata"))?
            as i32;

        Ok(Self {
            info: CommandInfo::from_serialized(record),
            description: format!("{player} life {delta:+}"),
            player,
            delta,
        })
    }

    fn shift(&self, state: &GameState, delta: i32) -> Result<GameState> {
        let mut next = state.clone();
        let life = next
            .life_totals
            .get_mut(&self.player)
            .ok_or_else(|| GameError::UnknownPlayer(self.player.clone()))?;
        *life += delta;
        Ok(next)
    }
}

impl Command<GameState> for UpdateLifeCommand {
    fn id(&self) -> Uuid {
        self.info.id
    }

    fn kind(&self) -> &str {
        "update_life"
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
        json!({
            "player": self.player,
            "delta": self.delta,
        })
    }

    fn apply(&self, state: &GameState) -> Result<GameState> {
        self.shift(state, self.delta)
    }

    fn revert(&self, state: &GameState) -> Result<GameState> {
        self.shift(state, -self.delta)
    }

    fn can_revert(&self, state: &GameState) -> bool {
        state.life(&self.player).is_some()
    }
}

/// Command to set a player's life total to an absolute value
#[derive(Debug)]
pub struct SetLifeCommand {
    info: CommandInfo,
    description: String,
    player: String,
    total: i32,
    previous: i32,
}

impl SetLifeCommand {
    /// Create a set-life command, capturing the current total for reverse.
    pub fn new(
        state: &GameState,
        user: impl Into<String>,
        player: impl Into<String>,
        total: i32,
    ) -> Result<Self> {
        let player = player.into();
        let previous = state
            .life(&player)
            .ok_or_else(|| GameError::UnknownPlayer(player.clone()))?;

        Ok(Self {
            info: CommandInfo::new(user, affects_set([life_entity(&player)])),
            description: format!("Set {player} life to {total}"),
            player,
            total,
            previous,
        })
    }

    pub(crate) fn from_serialized(record: &SerializedCommand) -> Result<Self> {
        let player = record.metadata["player"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing field 'player' in command metadata"))?
            .to_string();
        let total = record.metadata["total"]
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("missing field 'total' in command metadata"))?
            as i32;
        let previous = record.metadata["previous"]
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("missing field 'previous' in command metadata"))?
            as i32;

        Ok(Self {
            info: CommandInfo::from_serialized(record),
            description: format!("Set {player} life to {total}"),
            player,
            total,
            previous,
        })
    }

    fn set(&self, state: &GameState, total: i32) -> Result<GameState> {
        let mut next = state.clone();
        let life = next
            .life_totals
            .get_mut(&self.player)
            .ok_or_else(|| GameError::UnknownPlayer(self.player.clone()))?;
        *life = total;
        Ok(next)
    }
}

impl Command<GameState> for SetLifeCommand {
    fn id(&self) -> Uuid {
        self.info.id
    }

    fn kind(&self) -> &str {
        "set_life"
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
        json!({
            "player": self.player,
            "total": self.total,
            "previous": self.previous,
        })
    }

    fn apply(&self, state: &GameState) -> Result<GameState> {
        self.set(state, self.total)
    }

    fn revert(&self, state: &GameState) -> Result<GameState> {
        self.set(state, self.previous)
    }

    fn can_revert(&self, state: &GameState) -> bool {
        state.life(&self.player) == Some(self.total)
    }
}

pub(crate) fn register(registry: &mut tablesync_core::CommandRegistry<GameState>) {
    registry.register("update_life", |record, _| {
        Ok(Arc::new(UpdateLifeCommand::from_serialized(record)?) as Arc<dyn Command<GameState>>)
    });
    registry.register("set_life", |record, _| {
        Ok(Arc::new(SetLifeCommand::from_serialized(record)?) as Arc<dyn Command<GameState>>)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::STARTING_LIFE;

    #[test]
    fn test_update_life_round_trip() {
        let state = GameState::with_players(["alice"]);
        let command = UpdateLifeCommand::new(&state, "alice", "alice", -3).unwrap();

        let hit = command.apply(&state).unwrap();
        assert_eq!(hit.life("alice"), Some(STARTING_LIFE - 3));

        let back = command.revert(&hit).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_update_life_unknown_player() {
        let state = GameState::with_players(["alice"]);
        let err = UpdateLifeCommand::new(&state, "alice", "mallory", 5).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameError>(),
            Some(GameError::UnknownPlayer(p)) if p == "mallory"
        ));
    }

    #[test]
    fn test_set_life_captures_previous() {
        let state = GameState::with_players(["alice"]);
        let command = SetLifeCommand::new(&state, "alice", "alice", 7).unwrap();

        let set = command.apply(&state).unwrap();
        assert_eq!(set.life("alice"), Some(7));
        assert!(command.can_revert(&set));
        assert!(!command.can_revert(&state));

        let back = command.revert(&set).unwrap();
        assert_eq!(back.life("alice"), Some(STARTING_LIFE));
    }

    #[test]
    fn test_set_life_serialization_round_trip() {
        let state = GameState::with_players(["alice"]);
        let command = SetLifeCommand::new(&state, "alice", "alice", 12).unwrap();

        let record = SerializedCommand::from_command(&command);
        let rebuilt = SetLifeCommand::from_serialized(&record).unwrap();
        assert_eq!(rebuilt.previous, STARTING_LIFE);
        assert_eq!(rebuilt.apply(&state).unwrap(), command.apply(&state).unwrap());
    }
}
