//! Turn-structure commands

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tablesync_core::{affects_set, Command, CommandInfo, SerializedCommand};
use uuid::Uuid;

use crate::game::GameState;
use crate::utils::error::GameError;

/// Entity identifier for the shared turn structure
const TURN_ENTITY: &str = "turn";

/// Command to pass the turn to the next player in seating order
#[derive(Debug)]
pub struct AdvanceTurnCommand {
    info: CommandInfo,
    description: String,
    previous_player: String,
    next_player: String,
    previous_turn: u32,
}

impl AdvanceTurnCommand {
    pub fn new(state: &GameState, user: impl Into<String>) -> Result<Self> {
        if state.turn_order.is_empty() {
            return Err(GameError::NoPlayers.into());
        }
        let seat = state
            .turn_order
            .iter()
            .position(|p| p == &state.active_player)
            .unwrap_or(0);
        let next_player = state.turn_order[(seat + 1) % state.turn_order.len()].clone();

        Ok(Self {
            info: CommandInfo::new(user, affects_set([TURN_ENTITY])),
            description: format!("Turn passes to {next_player}"),
            previous_player: state.active_player.clone(),
            next_player,
            previous_turn: state.turn,
        })
    }

    pub(crate) fn from_serialized(record: &SerializedCommand) -> Result<Self> {
        let previous_player = record.metadata["previous_player"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing field 'previous_player' in command metadata"))?
            .to_string();
        let next_player = record.metadata["next_player"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing field 'next_player' in command metadata"))?
            .to_string();
        let previous_turn = record.metadata["previous_turn"]
            .as_u64()
            .ok_or_else(|| anyhow::anyhow!("missing field 'previous_turn' in command metadata"))?
            as u32;

        Ok(Self {
            info: CommandInfo::from_serialized(record),
            description: format!("Turn passes to {next_player}"),
            previous_player,
            next_player,
            previous_turn,
        })
    }
}

impl Command<GameState> for AdvanceTurnCommand {
    fn id(&self) -> Uuid {
        self.info.id
    }

    fn kind(&self) -> &str {
        "advance_turn"
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
            "previous_player": self.previous_player,
            "next_player": self.next_player,
            "previous_turn": self.previous_turn,
        })
    }

    fn apply(&self, state: &GameState) -> Result<GameState> {
        let mut next = state.clone();
        next.turn = self.previous_turn + 1;
        next.active_player = self.next_player.clone();
        Ok(next)
    }

    fn revert(&self, state: &GameState) -> Result<GameState> {
        let mut next = state.clone();
        next.turn = self.previous_turn;
        next.active_player = self.previous_player.clone();
        Ok(next)
    }

    fn can_revert(&self, state: &GameState) -> bool {
        state.active_player == self.next_player && state.turn == self.previous_turn + 1
    }
}

pub(crate) fn register(registry: &mut tablesync_core::CommandRegistry<GameState>) {
    registry.register("advance_turn", |record, _| {
        Ok(Arc::new(AdvanceTurnCommand::from_serialized(record)?) as Arc<dyn Command<GameState>>)
    });
}
