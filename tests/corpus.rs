//! Every bundled variant document loads and plays to completion with only
//! passive default actions, at minimum table size, conserving chips.

mod common;

use common::{play_passively, total_chips};
use houserules::{BettingStructure, Game, GamePhase, Rules, Stakes};

fn smoke(rules: Rules, structure: BettingStructure, stakes: Stakes) {
    let min_players = rules.players.min;
    let name = rules.game.clone();
    let mut game = Game::new(rules, structure, stakes, 99).unwrap();
    for seat in 0..min_players {
        game.add_player(format!("p{seat}"), format!("Player {seat}"), 300, seat)
            .unwrap();
    }
    let before = min_players as i64 * 300;
    game.start_hand(None)
        .unwrap_or_else(|err| panic!("{name}: start failed: {err}"));
    play_passively(&mut game);
    assert_eq!(game.state(), GamePhase::Complete, "{name} did not complete");
    assert_eq!(total_chips(&game), before, "{name} leaked chips");
    assert!(game.result().is_some(), "{name} produced no result");
}

#[test]
fn holdem_plays_to_completion() {
    smoke(
        common::holdem(),
        BettingStructure::NoLimit,
        Stakes::blinds(1, 2),
    );
}

#[test]
fn holdem_limit_plays_to_completion() {
    smoke(
        common::holdem(),
        BettingStructure::Limit,
        Stakes::limit(10, 0, 0),
    );
}

#[test]
fn omaha_plays_to_completion() {
    smoke(
        common::omaha(),
        BettingStructure::PotLimit,
        Stakes::blinds(1, 2),
    );
}

#[test]
fn seven_card_stud_plays_to_completion() {
    smoke(
        common::seven_card_stud(),
        BettingStructure::Limit,
        Stakes::limit(10, 1, 3),
    );
}

#[test]
fn badugi_plays_to_completion() {
    smoke(
        common::badugi(),
        BettingStructure::Limit,
        Stakes::blinds(2, 4),
    );
}

#[test]
fn dramaha_plays_to_completion() {
    smoke(
        common::dramaha(),
        BettingStructure::PotLimit,
        Stakes::blinds(1, 2),
    );
}

#[test]
fn declare_hi_lo_plays_to_completion() {
    smoke(
        common::declare_hi_lo(),
        BettingStructure::Limit,
        Stakes::limit(10, 1, 0),
    );
}

#[test]
fn antes_only_flip_never_needs_input_after_the_deal() {
    // Reaching COMPLETE without a single betting round is legal.
    let rules = common::flip();
    let mut game = Game::new(rules, BettingStructure::Limit, Stakes::limit(10, 1, 0), 4).unwrap();
    game.add_player("p0", "Zero", 50, 0).unwrap();
    game.add_player("p1", "One", 50, 1).unwrap();
    game.start_hand(None).unwrap();
    assert_eq!(game.state(), GamePhase::Complete);
    assert_eq!(total_chips(&game), 100);
    assert!(game.result().is_some());
}
