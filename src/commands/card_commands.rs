//! Card-related commands
//!
//! Commands for moving cards between zones, tapping and untapping them,
//! and drawing from a library. Each command captures the pre-image it
//! needs for its reverse at construction time: the zone position a card
//! came from, the previous tap state, the identity of the drawn card.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tablesync_core::{affects_set, Command, CommandInfo, SerializedCommand};
use uuid::Uuid;

use crate::game::{zone_id, GameState, HAND, LIBRARY};
use crate::utils::error::GameError;

fn metadata_str(metadata: &Value, field: &str) -> Result<String> {
    metadata[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("missing field '{field}' in command metadata"))
}

/// Command to move a card from one zone to another
#[derive(Debug)]
pub struct MoveCardCommand {
    info: CommandInfo,
    description: String,
    card: String,
    from_zone: String,
    to_zone: String,
    from_index: usize,
}

impl MoveCardCommand {
    /// Create a new move command, capturing the card's current position in
    /// its source zone so the move can be reversed exactly.
    pub fn new(
        state: &GameState,
        user: impl Into<String>,
        card: impl Into<String>,
        from_zone: impl Into<String>,
        to_zone: impl Into<String>,
    ) -> Result<Self> {
        let card = card.into();
        let from_zone = from_zone.into();
        let to_zone = to_zone.into();
        let from_index =
            state
                .card_position(&from_zone, &card)
                .ok_or_else(|| GameError::CardNotFound {
                    card: card.clone(),
                    zone: from_zone.clone(),
                })?;

        Ok(Self {
            info: CommandInfo::new(user, affects_set([card.as_str()])),
            description: format!("Move '{card}' from {from_zone} to {to_zone}"),
            card,
            from_zone,
            to_zone,
            from_index,
        })
    }

    pub(crate) fn from_serialized(record: &SerializedCommand) -> Result<Self> {
        let card = metadata_str(&record.metadata, "card")?;
        let from_zone = metadata_str(&record.metadata, "from_zone")?;
        let to_zone = metadata_str(&record.metadata, "to_zone")?;
        let from_index = record.metadata["from_index"]
            .as_u64()
            .ok_or_else(|| anyhow::anyhow!("missing field 'from_index' in command metadata"))?
            as usize;

        Ok(Self {
            info: CommandInfo::from_serialized(record),
            description: format!("Move '{card}' from {from_zone} to {to_zone}"),
            card,
            from_zone,
            to_zone,
            from_index,
        })
    }
}

impl Command<GameState> for MoveCardCommand {
    fn id(&self) -> Uuid {
        self.info.id
    }

    fn kind(&self) -> &str {
        "move_card"
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
            "card": self.card,
            "from_zone": self.from_zone,
            "to_zone": self.to_zone,
            "from_index": self.from_index,
        })
    }

    fn apply(&self, state: &GameState) -> Result<GameState> {
        let mut next = state.clone();
        let source = next
            .zones
            .get_mut(&self.from_zone)
            .ok_or_else(|| GameError::ZoneNotFound(self.from_zone.clone()))?;
        let index = source
            .iter()
            .position(|c| c == &self.card)
            .ok_or_else(|| GameError::CardNotFound {
                card: self.card.clone(),
                zone: self.from_zone.clone(),
            })?;
        source.remove(index);
        next.zones
            .entry(self.to_zone.clone())
            .or_default()
            .push(self.card.clone());
        Ok(next)
    }

    fn revert(&self, state: &GameState) -> Result<GameState> {
        let mut next = state.clone();
        let target = next
            .zones
            .get_mut(&self.to_zone)
            .ok_or_else(|| GameError::ZoneNotFound(self.to_zone.clone()))?;
        let index = target
            .iter()
            .position(|c| c == &self.card)
            .ok_or_else(|| GameError::CardNotFound {
                card: self.card.clone(),
                zone: self.to_zone.clone(),
            })?;
        target.remove(index);
        let source = next.zones.entry(self.from_zone.clone()).or_default();
        let insert_at = self.from_index.min(source.len());
        source.insert(insert_at, self.card.clone());
        Ok(next)
    }

    fn can_revert(&self, state: &GameState) -> bool {
        state.zone_contains(&self.to_zone, &self.card)
    }
}

/// Command to tap or untap a card
#[derive(Debug)]
pub struct TapCardCommand {
    info: CommandInfo,
    description: String,
    card: String,
    tapped: bool,
    was_tapped: bool,
}

impl TapCardCommand {
    /// Create a tap/untap command, capturing the card's current tap state.
    pub fn new(
        state: &GameState,
        user: impl Into<String>,
        card: impl Into<String>,
        tapped: bool,
    ) -> Self {
        let card = card.into();
        Self {
            info: CommandInfo::new(user, affects_set([card.as_str()])),
            description: if tapped {
                format!("Tap '{card}'")
            } else {
                format!("Untap '{card}'")
            },
            was_tapped: state.is_tapped(&card),
            card,
            tapped,
        }
    }

    pub(crate) fn from_serialized(record: &SerializedCommand) -> Result<Self> {
        let card = metadata_str(&record.metadata, "card")?;
        let tapped = record.metadata["tapped"]
            .as_bool()
            .ok_or_else(|| anyhow::anyhow!("missing field 'tapped' in command metadata"))?;
        let was_tapped = record.metadata["was_tapped"]
            .as_bool()
            .ok_or_else(|| anyhow::anyhow!("missing field 'was_tapped' in command metadata"))?;

        Ok(Self {
            info: CommandInfo::from_serialized(record),
            description: if tapped {
                format!("Tap '{card}'")
            } else {
                format!("Untap '{card}'")
            },
            card,
            tapped,
            was_tapped,
        })
    }

    fn set_tapped(&self, state: &GameState, tapped: bool) -> GameState {
        let mut next = state.clone();
        if tapped {
            next.tapped.insert(self.card.clone());
        } else {
            next.tapped.remove(&self.card);
        }
        next
    }
}

impl Command<GameState> for TapCardCommand {
    fn id(&self) -> Uuid {
        self.info.id
    }

    fn kind(&self) -> &str {
        "tap_card"
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
            "card": self.card,
            "tapped": self.tapped,
            "was_tapped": self.was_tapped,
        })
    }

    fn apply(&self, state: &GameState) -> Result<GameState> {
        Ok(self.set_tapped(state, self.tapped))
    }

    fn revert(&self, state: &GameState) -> Result<GameState> {
        Ok(self.set_tapped(state, self.was_tapped))
    }

    fn can_revert(&self, state: &GameState) -> bool {
        state.is_tapped(&self.card) == self.tapped
    }
}

/// Command to draw the top card of a player's library into their hand
#[derive(Debug)]
pub struct DrawCardCommand {
    info: CommandInfo,
    description: String,
    player: String,
    card: String,
}

impl DrawCardCommand {
    /// Create a draw command for the top card of the player's library.
    /// Fails with [`GameError::EmptyLibrary`] when nothing is left to draw.
    pub fn new(state: &GameState, player: impl Into<String>) -> Result<Self> {
        let player = player.into();
        let card = state
            .zone(&zone_id(&player, LIBRARY))
            .last()
            .cloned()
            .ok_or_else(|| GameError::EmptyLibrary {
                player: player.clone(),
            })?;

        Ok(Self {
            info: CommandInfo::new(player.clone(), affects_set([card.as_str()])),
            description: format!("{player} draws a card"),
            player,
            card,
        })
    }

    pub(crate) fn from_serialized(record: &SerializedCommand) -> Result<Self> {
        let player = metadata_str(&record.metadata, "player")?;
        let card = metadata_str(&record.metadata, "card")?;

        Ok(Self {
            info: CommandInfo::from_serialized(record),
            description: format!("{player} draws a card"),
            player,
            card,
        })
    }
}

impl Command<GameState> for DrawCardCommand {
    fn id(&self) -> Uuid {
        self.info.id
    }

    fn kind(&self) -> &str {
        "draw_card"
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
            "card": self.card,
        })
    }

    fn apply(&self, state: &GameState) -> Result<GameState> {
        let library = zone_id(&self.player, LIBRARY);
        let mut next = state.clone();
        let cards = next
            .zones
            .get_mut(&library)
            .ok_or_else(|| GameError::ZoneNotFound(library.clone()))?;
        match cards.last() {
            Some(top) if top == &self.card => {
                cards.pop();
            }
            _ => {
                return Err(GameError::CardNotFound {
                    card: self.card.clone(),
                    zone: library,
                }
                .into())
            }
        }
        next.zones
            .entry(zone_id(&self.player, HAND))
            .or_default()
            .push(self.card.clone());
        Ok(next)
    }

    fn revert(&self, state: &GameState) -> Result<GameState> {
        let hand = zone_id(&self.player, HAND);
        let mut next = state.clone();
        let cards = next
            .zones
            .get_mut(&hand)
            .ok_or_else(|| GameError::ZoneNotFound(hand.clone()))?;
        let index = cards
            .iter()
            .position(|c| c == &self.card)
            .ok_or_else(|| GameError::CardNotFound {
                card: self.card.clone(),
                zone: hand,
            })?;
        cards.remove(index);
        next.zones
            .entry(zone_id(&self.player, LIBRARY))
            .or_default()
            .push(self.card.clone());
        Ok(next)
    }

    fn can_revert(&self, state: &GameState) -> bool {
        state.zone_contains(&zone_id(&self.player, HAND), &self.card)
    }
}

pub(crate) fn register(registry: &mut tablesync_core::CommandRegistry<GameState>) {
    registry.register("move_card", |record, _| {
        Ok(Arc::new(MoveCardCommand::from_serialized(record)?) as Arc<dyn Command<GameState>>)
    });
    registry.register("tap_card", |record, _| {
        Ok(Arc::new(TapCardCommand::from_serialized(record)?) as Arc<dyn Command<GameState>>)
    });
    registry.register("draw_card", |record, _| {
        Ok(Arc::new(DrawCardCommand::from_serialized(record)?) as Arc<dyn Command<GameState>>)
    });
}
