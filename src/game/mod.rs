//! Game table state
//!
//! The board representation the bundled command catalog operates on: card
//! zones, life totals, tapped cards and the turn marker. The history engine
//! never looks inside this type; commands carry everything they need to
//! apply and revert themselves against it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Life total every player starts with
pub const STARTING_LIFE: i32 = 20;

/// Standard per-player zone names
pub const LIBRARY: &str = "library";
pub const HAND: &str = "hand";
pub const BATTLEFIELD: &str = "battlefield";
pub const GRAVEYARD: &str = "graveyard";

/// Qualified zone identifier for a player's named zone, e.g. `alice:hand`.
pub fn zone_id(player: &str, zone: &str) -> String {
    format!("{player}:{zone}")
}

/// Complete table state for one game session.
///
/// Zones map a zone identifier to an ordered card list; ordering matters
/// (a library has a top card). All collections are BTree-backed so two
/// states produced by the same command sequence compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Zone id -> ordered card ids, last element on top
    pub zones: BTreeMap<String, Vec<String>>,
    /// Player id -> life total
    pub life_totals: BTreeMap<String, i32>,
    /// Cards currently tapped
    pub tapped: BTreeSet<String>,
    /// 1-based turn counter
    pub turn: u32,
    /// Player whose turn it is
    pub active_player: String,
    /// Seating order, drives turn rotation
    pub turn_order: Vec<String>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// An empty table: no players, no zones.
    pub fn new() -> Self {
        Self {
            zones: BTreeMap::new(),
            life_totals: BTreeMap::new(),
            tapped: BTreeSet::new(),
            turn: 1,
            active_player: String::new(),
            turn_order: Vec::new(),
        }
    }

    /// Seat the given players with starting life and the standard zones.
    /// The first player becomes active.
    pub fn with_players<I, T>(players: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut state = Self::new();
        for player in players {
            let player = player.into();
            state.life_totals.insert(player.clone(), STARTING_LIFE);
            for zone in [LIBRARY, HAND, BATTLEFIELD, GRAVEYARD] {
                state.zones.insert(zone_id(&player, zone), Vec::new());
            }
            state.turn_order.push(player);
        }
        if let Some(first) = state.turn_order.first() {
            state.active_player = first.clone();
        }
        state
    }

    /// Put a card into a zone (setup helper, not a tracked operation).
    pub fn place_card(&mut self, zone: impl Into<String>, card: impl Into<String>) {
        self.zones.entry(zone.into()).or_default().push(card.into());
    }

    /// The cards in a zone, bottom to top. Empty for an unknown zone.
    pub fn zone(&self, zone: &str) -> &[String] {
        self.zones.get(zone).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn zone_contains(&self, zone: &str, card: &str) -> bool {
        self.zone(zone).iter().any(|c| c == card)
    }

    /// Position of a card within a zone, if present.
    pub fn card_position(&self, zone: &str, card: &str) -> Option<usize> {
        self.zone(zone).iter().position(|c| c == card)
    }

    pub fn life(&self, player: &str) -> Option<i32> {
        self.life_totals.get(player).copied()
    }

    pub fn is_tapped(&self, card: &str) -> bool {
        self.tapped.contains(card)
    }

    /// Total cards across all zones.
    pub fn card_count(&self) -> usize {
        self.zones.values().map(Vec::len).sum()
    }
}
