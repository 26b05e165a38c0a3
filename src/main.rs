use tablesync::{
    init_default_logging, AdvanceTurnCommand, GameState, MoveCardCommand, Session,
    UpdateLifeCommand,
};
use tablesync::game::{zone_id, BATTLEFIELD, HAND};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_default_logging()?;

    println!("tablesync v{}", tablesync::VERSION);

    // A short two-player exchange
    let mut state = GameState::with_players(["alice", "bob"]);
    state.place_card(zone_id("alice", HAND), "goblin-guide");
    let mut session = Session::new(state);

    let play = MoveCardCommand::new(
        session.state(),
        "alice",
        "goblin-guide",
        zone_id("alice", HAND),
        zone_id("alice", BATTLEFIELD),
    )?;
    session.execute(play)?;

    let attack = UpdateLifeCommand::new(session.state(), "alice", "bob", -2)?;
    session.execute(attack)?;

    let pass = AdvanceTurnCommand::new(session.state(), "alice")?;
    session.execute(pass)?;

    println!(
        "turn {}, active player {}, bob at {} life",
        session.state().turn,
        session.state().active_player,
        session.state().life("bob").unwrap_or_default()
    );

    // Take the attack back and replay it
    session.undo("alice")?;
    session.undo("alice")?;
    println!("after undo: bob at {} life", session.state().life("bob").unwrap_or_default());
    session.redo("alice")?;

    let stats = session.stats();
    println!(
        "{} commands recorded ({} conflicts), ~{} bytes",
        stats.total_commands,
        session.conflicts().len(),
        stats.estimated_bytes
    );

    Ok(())
}
