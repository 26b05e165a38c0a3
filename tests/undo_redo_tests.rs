//! Undo/redo behavior over a shared card table

use tablesync::game::GameState;
use tablesync::{Command, HistoryEngine, HistoryError, MoveCardCommand, UpdateLifeCommand};

const BATTLEFIELD: &str = "battlefield";
const TABLE_HAND: &str = "hand";

/// A table with shared (unqualified) zones and two cards in hand.
fn table() -> GameState {
    let mut state = GameState::with_players(["u1", "u2"]);
    state.zones.insert(TABLE_HAND.to_string(), vec!["A".to_string(), "B".to_string()]);
    state.zones.insert(BATTLEFIELD.to_string(), Vec::new());
    state
}

#[test]
fn test_single_undo_redo_restores_each_side() {
    let mut engine: HistoryEngine<GameState> = HistoryEngine::new();
    let initial = table();

    let play = MoveCardCommand::new(&initial, "u1", "A", TABLE_HAND, BATTLEFIELD).unwrap();
    let after_play = play.apply(&initial).unwrap();
    engine.submit(std::sync::Arc::new(play)).unwrap();

    assert_eq!(after_play.zone(TABLE_HAND), ["B"]);
    assert_eq!(after_play.zone(BATTLEFIELD), ["A"]);

    let undone = engine.undo("u1", &after_play).unwrap();
    assert_eq!(undone, initial);
    assert_eq!(undone.zone(TABLE_HAND), ["A", "B"]);
    assert!(undone.zone(BATTLEFIELD).is_empty());

    let redone = engine.redo("u1", &undone).unwrap();
    assert_eq!(redone, after_play);
    assert_eq!(redone.zone(TABLE_HAND), ["B"]);
    assert_eq!(redone.zone(BATTLEFIELD), ["A"]);
}

#[test]
fn test_undo_then_redo_round_trip_is_exact() {
    let mut engine: HistoryEngine<GameState> = HistoryEngine::new();
    let initial = table();

    let command = UpdateLifeCommand::new(&initial, "u1", "u2", -5).unwrap();
    let applied = command.apply(&initial).unwrap();
    engine.submit(std::sync::Arc::new(command)).unwrap();

    let undone = engine.undo("u1", &applied).unwrap();
    let redone = engine.redo("u1", &undone).unwrap();
    assert_eq!(redone, applied);

    let undone_again = engine.undo("u1", &redone).unwrap();
    assert_eq!(undone_again, initial);
}

#[test]
fn test_new_submission_clears_redo() {
    let mut engine: HistoryEngine<GameState> = HistoryEngine::new();
    let initial = table();

    let play_a = MoveCardCommand::new(&initial, "u1", "A", TABLE_HAND, BATTLEFIELD).unwrap();
    let after_a = play_a.apply(&initial).unwrap();
    engine.submit(std::sync::Arc::new(play_a)).unwrap();

    let undone = engine.undo("u1", &after_a).unwrap();
    assert!(engine.can_redo("u1"));

    let play_b = MoveCardCommand::new(&undone, "u1", "B", TABLE_HAND, BATTLEFIELD).unwrap();
    play_b.apply(&undone).unwrap();
    engine.submit(std::sync::Arc::new(play_b)).unwrap();

    assert!(!engine.can_redo("u1"));
    assert!(engine.redoable("u1").is_empty());
}

#[test]
fn test_undo_refuses_when_effect_is_gone() {
    let mut engine: HistoryEngine<GameState> = HistoryEngine::new();
    let initial = table();

    let play = MoveCardCommand::new(&initial, "u1", "A", TABLE_HAND, BATTLEFIELD).unwrap();
    engine.submit(std::sync::Arc::new(play)).unwrap();

    // The card never reached the battlefield in this state
    let err = engine.undo("u1", &initial).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HistoryError>(),
        Some(HistoryError::ValidationFailed { .. })
    ));
    // The failed undo moved nothing
    assert!(engine.can_undo("u1"));
    assert!(!engine.can_redo("u1"));
}

#[test]
fn test_undo_for_unknown_user_returns_state_unchanged() {
    let mut engine: HistoryEngine<GameState> = HistoryEngine::new();
    let state = table();
    let result = engine.undo("nobody", &state).unwrap();
    assert_eq!(result, state);
}

#[test]
fn test_per_user_history_is_chronological_and_owned() {
    let mut engine: HistoryEngine<GameState> = HistoryEngine::new();
    let state = table();

    for (user, target, delta) in [("u1", "u2", -1), ("u2", "u1", -2), ("u1", "u2", -3)] {
        let command = UpdateLifeCommand::new(&state, user, target, delta).unwrap();
        engine.submit(std::sync::Arc::new(command)).unwrap();
    }

    for user in ["u1", "u2"] {
        let history = engine.history(user);
        assert!(history.iter().all(|c| c.user_id() == user));
        assert!(history.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp()));
        let undoable = engine.undoable(user);
        assert!(undoable.iter().all(|c| c.user_id() == user));
    }
    assert_eq!(engine.history("u1").len(), 2);
    assert_eq!(engine.history("u2").len(), 1);
    assert_eq!(engine.global_history().len(), 3);
}
