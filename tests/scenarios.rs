//! End-to-end hands with literal stacks, stakes, and stacked decks.

mod common;

use common::{
    badugi, declare_hi_lo, dramaha, holdem, omaha, play_passively, seven_card_stud, stack_of,
    stacked, total_chips,
};
use houserules::{
    ActionKind, BettingStructure, Card, Declaration, Game, GamePhase, PlayerAction, Stakes,
};

#[test]
fn heads_up_fold_awards_the_blinds() {
    let mut game = Game::new(holdem(), BettingStructure::NoLimit, Stakes::blinds(1, 2), 11).unwrap();
    game.add_player("sb", "Small Blind", 100, 0).unwrap();
    game.add_player("bb", "Big Blind", 100, 1).unwrap();
    game.start_hand(None).unwrap();

    // Heads-up the dealer posts the small blind and acts first.
    assert_eq!(game.current_player(), Some("sb".to_string()));
    let result = game
        .player_action(&"sb".to_string(), ActionKind::Fold, PlayerAction::default())
        .unwrap();
    assert!(result.ok);

    assert_eq!(game.state(), GamePhase::Complete);
    assert_eq!(stack_of(&game, "bb"), 101);
    assert_eq!(stack_of(&game, "sb"), 99);
    assert_eq!(total_chips(&game), 200);
    let result = game.result().expect("hand complete");
    assert_eq!(result.winners, vec!["bb".to_string()]);
}

#[test]
fn three_way_all_in_cascade_builds_layered_pots() {
    let mut game = Game::new(holdem(), BettingStructure::NoLimit, Stakes::blinds(1, 2), 5).unwrap();
    game.add_player("a", "Shorty", 10, 0).unwrap();
    game.add_player("b", "Middle", 40, 1).unwrap();
    game.add_player("c", "Cover", 100, 2).unwrap();

    // Deal order is b, c, a; board gives nobody a surprise.
    let deck = stacked("Kc Ah 2c Kd As 7d Qs Jh 3c 9d 2h");
    game.start_hand(Some(deck)).unwrap();

    for (player, to) in [("a", 10), ("b", 40), ("c", 100)] {
        assert_eq!(game.current_player(), Some(player.to_string()));
        let result = game
            .player_action(
                &player.to_string(),
                ActionKind::Raise,
                PlayerAction::amount(to),
            )
            .unwrap();
        assert!(result.ok, "{player} shove rejected: {:?}", result.error);
    }

    // All-in preflop runs out automatically to the showdown.
    assert_eq!(game.state(), GamePhase::Complete);
    assert_eq!(stack_of(&game, "a"), 0);
    assert_eq!(stack_of(&game, "b"), 0);
    assert_eq!(stack_of(&game, "c"), 150);
    assert_eq!(total_chips(&game), 150);

    let result = game.result().expect("hand complete");
    assert_eq!(result.winners, vec!["c".to_string()]);
    assert_eq!(result.awards[&"c".to_string()], 150);
}

#[test]
fn omaha_requires_exactly_two_hole_cards() {
    let mut game = Game::new(omaha(), BettingStructure::PotLimit, Stakes::blinds(1, 2), 9).unwrap();
    game.add_player("p1", "One", 100, 0).unwrap();
    game.add_player("p2", "Two", 100, 1).unwrap();

    // The board is a royal flush; neither player may play it. p1's pair of
    // aces makes trips, beating p2's kings.
    let deck = stacked("Ks As Kd Ad 7c 2c 8c 3d Ah Kh Qh Jh Th");
    game.start_hand(Some(deck)).unwrap();
    play_passively(&mut game);

    let result = game.result().expect("hand complete");
    assert_eq!(result.winners, vec!["p1".to_string()]);

    let shown = result
        .hands
        .iter()
        .find(|h| h.player == "p1")
        .expect("p1 shows a hand");
    assert!(shown.description.contains("Three of a kind"));

    let p1_hole = Card::parse_cards("As Ad 2c 3d").unwrap();
    let hole_used = shown.cards.iter().filter(|c| p1_hole.contains(c)).count();
    assert_eq!(hole_used, 2, "omaha hands use exactly two hole cards");
    assert_eq!(total_chips(&game), 200);
}

#[test]
fn stud_bring_in_and_high_hand_order() {
    let mut game = Game::new(
        seven_card_stud(),
        BettingStructure::Limit,
        Stakes::limit(10, 1, 3),
        3,
    )
    .unwrap();
    game.add_player("a", "Alice", 500, 0).unwrap();
    game.add_player("b", "Bob", 500, 1).unwrap();
    game.add_player("c", "Carol", 500, 2).unwrap();

    let deck = stacked(
        "5c 6d 2h Jd Td 3s 9h 2c Kd 4h 7d Ks 8s 5d 6h 9c 4d 7s Js Qc Tc",
    );
    game.start_hand(Some(deck)).unwrap();

    // Carol's deuce is the low door card: she posts the bring-in and the
    // player on her left acts first.
    let bring_in = game.events().iter().find_map(|e| match e {
        houserules::Event::ForcedBet { player, kind, amount, .. }
            if *kind == houserules::actions::ForcedBetKind::BringIn =>
        {
            Some((player.clone(), *amount))
        }
        _ => None,
    });
    assert_eq!(bring_in, Some(("c".to_string(), 3)));
    assert_eq!(game.current_player(), Some("a".to_string()));

    for player in ["a", "b"] {
        let result = game
            .player_action(&player.to_string(), ActionKind::Call, PlayerAction::default())
            .unwrap();
        assert!(result.ok);
    }
    let result = game
        .player_action(&"c".to_string(), ActionKind::Check, PlayerAction::default())
        .unwrap();
    assert!(result.ok);

    // Fourth street: Alice pairs kings on board and leads.
    assert_eq!(game.current_player(), Some("a".to_string()));

    play_passively(&mut game);
    assert_eq!(total_chips(&game), 1500);
}

#[test]
fn badugi_triple_draw_stand_pat_wheel_wins() {
    let mut game = Game::new(badugi(), BettingStructure::Limit, Stakes::blinds(1, 2), 3).unwrap();
    game.add_player("p1", "One", 100, 0).unwrap();
    game.add_player("p2", "Two", 100, 1).unwrap();

    let deck = stacked("Kh Ah Qc 2c Jd 3d 9s 4s");
    game.start_hand(Some(deck)).unwrap();
    play_passively(&mut game);

    let result = game.result().expect("hand complete");
    assert_eq!(result.winners, vec!["p1".to_string()]);
    let shown = result
        .hands
        .iter()
        .find(|h| h.player == "p1")
        .expect("winner shows");
    assert!(shown.description.contains("4-card badugi"));
    assert_eq!(stack_of(&game, "p1"), 102);
    assert_eq!(stack_of(&game, "p2"), 98);
}

#[test]
fn dramaha_scoop_takes_both_lines() {
    let mut game = Game::new(dramaha(), BettingStructure::PotLimit, Stakes::blinds(1, 2), 3).unwrap();
    game.add_player("p1", "One", 100, 0).unwrap();
    game.add_player("p2", "Two", 100, 1).unwrap();

    // p1 draws into quad aces and holds the best board hand too.
    let deck = stacked("4c As 5d Ah 9h Ad Jc Ac Qs 2h Kh Qd 7s 8c 3h");
    game.start_hand(Some(deck)).unwrap();
    play_passively(&mut game);

    let result = game.result().expect("hand complete");
    assert_eq!(result.winners, vec!["p1".to_string()]);
    assert_eq!(stack_of(&game, "p1"), 102);
    assert_eq!(stack_of(&game, "p2"), 98);
}

#[test]
fn dramaha_split_pays_each_line_half() {
    let mut game = Game::new(dramaha(), BettingStructure::PotLimit, Stakes::blinds(1, 2), 3).unwrap();
    game.add_player("p1", "One", 100, 0).unwrap();
    game.add_player("p2", "Two", 100, 1).unwrap();

    // p1 holds the board line with aces; p2's quad fives take the draw line.
    let deck = stacked("5c As 5d Ah 5h 2c 5s 2d 9c 9h Kh Qd 7s 8c 3h");
    game.start_hand(Some(deck)).unwrap();
    play_passively(&mut game);

    let result = game.result().expect("hand complete");
    assert_eq!(result.awards[&"p1".to_string()], 2);
    assert_eq!(result.awards[&"p2".to_string()], 2);
    assert_eq!(stack_of(&game, "p1"), 100);
    assert_eq!(stack_of(&game, "p2"), 100);
    assert_eq!(total_chips(&game), 200);
}

#[test]
fn declaring_both_without_scooping_forfeits_everything() {
    let mut game = Game::new(
        declare_hi_lo(),
        BettingStructure::Limit,
        Stakes::limit(10, 1, 0),
        13,
    )
    .unwrap();
    game.add_player("p1", "One", 100, 0).unwrap();
    game.add_player("p2", "Two", 100, 1).unwrap();

    // Identical rank patterns: both lines tie between the two players.
    let deck = stacked("2h 2c 3h 3d 4d 4h 5c 5s 7h 7c");
    game.start_hand(Some(deck)).unwrap();

    // Betting round first: both check.
    for player in ["p2", "p1"] {
        let result = game
            .player_action(&player.to_string(), ActionKind::Check, PlayerAction::default())
            .unwrap();
        assert!(result.ok, "{player} check rejected");
    }

    // p2 declares low only; p1 declares both ways.
    let declare = |game: &mut Game, player: &str, declaration: Declaration| {
        let action = PlayerAction {
            declaration: Some(declaration),
            ..PlayerAction::default()
        };
        let result = game
            .player_action(&player.to_string(), ActionKind::Declare, action)
            .unwrap();
        assert!(result.ok, "{player} declaration rejected");
    };
    declare(&mut game, "p2", Declaration::Low);
    declare(&mut game, "p1", Declaration::HighLow);

    assert_eq!(game.state(), GamePhase::Complete);
    let result = game.result().expect("hand complete");
    // p1 tied the low, so the both-ways declaration forfeits; p2 takes the
    // whole pot.
    assert_eq!(result.winners, vec!["p2".to_string()]);
    assert_eq!(stack_of(&game, "p2"), 101);
    assert_eq!(stack_of(&game, "p1"), 99);
}

fn dealers_pick() -> houserules::Rules {
    houserules::Rules::from_value(serde_json::json!({
        "game": "Dealer's Pick",
        "players": {"min": 2, "max": 6},
        "deck": {"type": "standard", "cards": 52},
        "bettingStructures": ["No Limit"],
        "forcedBets": {"style": "blinds"},
        "bettingOrder": {"initial": "after_big_blind", "subsequent": "left_of_dealer"},
        "gamePlay": [
            {"name": "Pick Mode",
             "choose": {"possible_values": ["wide", "tight"], "value": "mode",
                        "chooser": "dealer", "default": "wide"}},
            {"name": "Post Blinds", "bet": {"type": "blinds"}},
            {"name": "Deal Hole Cards",
             "deal": {"location": "player", "cards": [{"number": 2, "state": "face down"}]}},
            {"name": "Pre-Flop Bet", "bet": {"type": "small"}},
            {"name": "Deal Board",
             "deal": {"location": "community",
                      "cards": [{"number": 5, "state": "face up", "subset": "Board"}]}},
            {"name": "Deal Bonus",
             "conditional_state": {"type": "player_choice", "value": "mode",
                                   "matches": "wide",
                                   "true_state": "execute", "false_state": "skip"},
             "deal": {"location": "community",
                      "cards": [{"number": 1, "state": "face up", "subset": "Bonus"}]}},
            {"name": "Final Bet", "bet": {"type": "big"}},
            {"name": "Showdown", "showdown": {"type": "final"}}
        ],
        "showdown": {
            "order": "clockwise",
            "startingFrom": "dealer",
            "cardsRequired": "depends on the chosen mode",
            "conditionalBestHands": [
                {"type": "player_choice", "value": "mode", "matches": "wide",
                 "bestHand": [{"name": "Wide High", "evaluationType": "high", "anyCards": 5}]}
            ],
            "defaultBestHand": [{"name": "Tight High", "evaluationType": "high",
                                 "holeCards": 2, "communityCards": 3}]
        }
    }))
    .expect("dealer's pick document is valid")
}

#[test]
fn choose_step_drives_conditional_steps_and_showdown() {
    // Tight mode: the dealer's choice skips the bonus card and selects the
    // constrained best-hand table.
    let mut game = Game::new(dealers_pick(), BettingStructure::NoLimit, Stakes::blinds(1, 2), 21)
        .unwrap();
    game.add_player("p1", "One", 100, 0).unwrap();
    game.add_player("p2", "Two", 100, 1).unwrap();
    game.start_hand(None).unwrap();

    assert_eq!(game.current_player(), Some("p1".to_string()));
    let action = PlayerAction {
        choice: Some("tight".to_string()),
        ..PlayerAction::default()
    };
    let result = game
        .player_action(&"p1".to_string(), ActionKind::Choose, action)
        .unwrap();
    assert!(result.ok);
    play_passively(&mut game);

    let view = game.view_for(None);
    assert!(!view.community_cards.contains_key("Bonus"));
    assert!(view.community_cards.contains_key("Board"));
    let result = game.result().expect("hand complete");
    assert!(result.hands.iter().all(|h| h.line == "Tight High"));

    // Wide mode (the passive default) deals the bonus card and uses the
    // any-five table.
    let mut game = Game::new(dealers_pick(), BettingStructure::NoLimit, Stakes::blinds(1, 2), 21)
        .unwrap();
    game.add_player("p1", "One", 100, 0).unwrap();
    game.add_player("p2", "Two", 100, 1).unwrap();
    game.start_hand(None).unwrap();
    play_passively(&mut game);

    let view = game.view_for(None);
    assert!(view.community_cards.contains_key("Bonus"));
    let result = game.result().expect("hand complete");
    assert!(result.hands.iter().all(|h| h.line == "Wide High"));
}

#[test]
fn replay_with_same_seed_is_bit_identical() {
    let run = || {
        let mut game =
            Game::new(holdem(), BettingStructure::NoLimit, Stakes::blinds(1, 2), 42).unwrap();
        game.add_player("a", "Alice", 200, 0).unwrap();
        game.add_player("b", "Bob", 200, 1).unwrap();
        game.add_player("c", "Carol", 200, 2).unwrap();
        game.start_hand(None).unwrap();
        play_passively(&mut game);
        let events = serde_json::to_string(game.events()).unwrap();
        let stacks: Vec<i64> = game.table().players().map(|p| p.stack).collect();
        (events, stacks)
    };
    let first = run();
    let second = run();
    assert_eq!(first.0, second.0);
    assert_eq!(first.1, second.1);
}

#[test]
fn views_hide_other_players_hole_cards() {
    let mut game = Game::new(holdem(), BettingStructure::NoLimit, Stakes::blinds(1, 2), 3).unwrap();
    game.add_player("p1", "One", 100, 0).unwrap();
    game.add_player("p2", "Two", 100, 1).unwrap();
    game.start_hand(None).unwrap();

    let p1 = "p1".to_string();
    let own_view = game.view_for(Some(&p1));
    let me = own_view.players.iter().find(|p| p.id == "p1").unwrap();
    assert!(me.cards.iter().all(Option::is_some));

    let other = own_view.players.iter().find(|p| p.id == "p2").unwrap();
    assert!(other.cards.iter().all(Option::is_none));

    let spectator = game.view_for(None);
    assert!(spectator
        .players
        .iter()
        .all(|p| p.cards.iter().all(Option::is_none)));

    // Only the player to act is handed options.
    let current = game.current_player().unwrap();
    let view = game.view_for(Some(&current));
    assert!(view.valid_actions.as_deref().map_or(false, |o| !o.is_empty()));
}

fn pass_and_show() -> houserules::Rules {
    houserules::Rules::from_value(serde_json::json!({
        "game": "Pass And Show",
        "players": {"min": 2, "max": 6},
        "deck": {"type": "standard", "cards": 52},
        "bettingStructures": ["Limit"],
        "forcedBets": {"style": "antes_only"},
        "bettingOrder": {"initial": "left_of_dealer", "subsequent": "left_of_dealer"},
        "gamePlay": [
            {"name": "Post Antes", "bet": {"type": "antes"}},
            {"name": "Deal Hands",
             "deal": {"location": "player", "cards": [{"number": 3, "state": "face down"}]}},
            {"name": "Pass One Left", "pass": {"direction": "left", "count": 1}},
            {"name": "Expose One",
             "expose": {"cards": [{"number": 1, "immediate": true}]}},
            {"name": "Showdown", "showdown": {"type": "final"}}
        ],
        "showdown": {
            "order": "clockwise",
            "startingFrom": "dealer",
            "cardsRequired": "best two of three",
            "bestHand": [{"name": "Two Card High", "evaluationType": "two_card_high",
                          "anyCards": 2}]
        }
    }))
    .expect("pass-and-show document is valid")
}

#[test]
fn pass_moves_cards_and_expose_flips_them() {
    let mut game = Game::new(
        pass_and_show(),
        BettingStructure::Limit,
        Stakes::limit(10, 1, 0),
        31,
    )
    .unwrap();
    game.add_player("p1", "One", 100, 0).unwrap();
    game.add_player("p2", "Two", 100, 1).unwrap();

    // p2 draws first from the stacked deck: Ah Kh Qh; p1 gets As Ks Qs.
    let deck = stacked("Ah As Kh Ks Qh Qs");
    game.start_hand(Some(deck)).unwrap();

    // Both players pass their first card to the left simultaneously.
    let give = |game: &Game, id: &str| {
        let id = id.to_string();
        game.table().player(&id).unwrap().hand.cards().next().unwrap().card
    };
    let p2_gave = give(&game, "p2");
    assert_eq!(game.current_player(), Some("p2".to_string()));
    let result = game
        .player_action(
            &"p2".to_string(),
            ActionKind::Pass,
            PlayerAction::cards(vec![p2_gave]),
        )
        .unwrap();
    assert!(result.ok);

    let p1_gave = give(&game, "p1");
    let result = game
        .player_action(
            &"p1".to_string(),
            ActionKind::Pass,
            PlayerAction::cards(vec![p1_gave]),
        )
        .unwrap();
    assert!(result.ok);

    // The swap happened only once everyone had chosen.
    assert!(game.table().player(&"p1".to_string()).unwrap().hand.contains(p2_gave));
    assert!(game.table().player(&"p2".to_string()).unwrap().hand.contains(p1_gave));

    // Each exposes one card immediately.
    for id in ["p2", "p1"] {
        let id = id.to_string();
        let card = give(&game, &id);
        let result = game
            .player_action(&id, ActionKind::Expose, PlayerAction::cards(vec![card]))
            .unwrap();
        assert!(result.ok);
    }

    assert_eq!(game.state(), GamePhase::Complete);
    assert_eq!(total_chips(&game), 200);
    let spectator = game.view_for(None);
    let exposed: usize = spectator
        .players
        .iter()
        .map(|p| p.cards.iter().filter(|c| c.is_some()).count())
        .sum();
    assert_eq!(exposed, 2, "one card per player shows to spectators");
}

fn twin_boards() -> houserules::Rules {
    houserules::Rules::from_value(serde_json::json!({
        "game": "Twin Boards",
        "players": {"min": 2, "max": 6},
        "deck": {"type": "standard", "cards": 52},
        "bettingStructures": ["Limit"],
        "forcedBets": {"style": "antes_only"},
        "bettingOrder": {"initial": "left_of_dealer", "subsequent": "left_of_dealer"},
        "gamePlay": [
            {"name": "Post Antes", "bet": {"type": "antes"}},
            {"name": "Deal Hands",
             "deal": {"location": "player", "cards": [{"number": 2, "state": "face down"}]}},
            {"name": "Spread The Table",
             "groupedActions": [
                {"deal": {"location": "community",
                          "cards": [{"number": 1, "state": "face up", "subset": "Board 1"}]}},
                {"deal": {"location": "community",
                          "cards": [{"number": 1, "state": "face up", "subset": "Board 2"}]}},
                {"roll_die": {"subset": "Die"}}
             ]},
            {"name": "Drop The Low Board",
             "remove": {"type": "community_cards", "criteria": "lowest_card",
                        "subsets": ["Board 1", "Board 2"]}},
            {"name": "Showdown", "showdown": {"type": "final"}}
        ],
        "showdown": {
            "order": "clockwise",
            "startingFrom": "dealer",
            "cardsRequired": "best two cards",
            "bestHand": [{"name": "Two Card High", "evaluationType": "two_card_high",
                          "anyCards": 2}]
        }
    }))
    .expect("twin-boards document is valid")
}

#[test]
fn grouped_deals_roll_a_die_and_prune_the_low_board() {
    let mut game = Game::new(
        twin_boards(),
        BettingStructure::Limit,
        Stakes::limit(10, 1, 0),
        17,
    )
    .unwrap();
    game.add_player("p1", "One", 100, 0).unwrap();
    game.add_player("p2", "Two", 100, 1).unwrap();

    // Board 1 gets the deuce and is removed; Board 2 keeps the king.
    let deck = stacked("Ah As Kh Ks 2c Kd");
    game.start_hand(Some(deck)).unwrap();

    assert_eq!(game.state(), GamePhase::Complete);
    let view = game.view_for(None);
    assert!(!view.community_cards.contains_key("Board 1"));
    assert!(view.community_cards.contains_key("Board 2"));
    let die = view.community_values.get("Die").copied().unwrap_or(0);
    assert!((1..=6).contains(&die));
    assert_eq!(total_chips(&game), 200);
}

#[test]
fn out_of_turn_and_bad_amounts_leave_state_unchanged() {
    let mut game = Game::new(holdem(), BettingStructure::NoLimit, Stakes::blinds(1, 2), 3).unwrap();
    game.add_player("p1", "One", 100, 0).unwrap();
    game.add_player("p2", "Two", 100, 1).unwrap();
    game.start_hand(None).unwrap();

    let before: Vec<i64> = game.table().players().map(|p| p.stack).collect();

    let result = game
        .player_action(&"p2".to_string(), ActionKind::Fold, PlayerAction::default())
        .unwrap();
    assert!(!result.ok);
    assert_eq!(
        result.error,
        Some(houserules::actions::ActionErrorKind::NotYourTurn)
    );

    let result = game
        .player_action(&"p1".to_string(), ActionKind::Raise, PlayerAction::amount(3))
        .unwrap();
    assert!(!result.ok);
    assert_eq!(
        result.error,
        Some(houserules::actions::ActionErrorKind::AmountOutOfRange)
    );

    let after: Vec<i64> = game.table().players().map(|p| p.stack).collect();
    assert_eq!(before, after);
    assert_eq!(game.current_player(), Some("p1".to_string()));
}

#[test]
fn leave_intent_folds_and_clears_the_seat_next_hand() {
    let mut game = Game::new(holdem(), BettingStructure::NoLimit, Stakes::blinds(1, 2), 3).unwrap();
    game.add_player("p1", "One", 100, 0).unwrap();
    game.add_player("p2", "Two", 100, 1).unwrap();
    game.add_player("p3", "Three", 100, 2).unwrap();
    game.start_hand(None).unwrap();

    // p3 is the big blind; leaving out of turn folds them immediately.
    let p3 = "p3".to_string();
    game.remove_player(&p3).unwrap();
    assert!(!game.table().player(&p3).unwrap().is_active);

    play_passively(&mut game);
    assert_eq!(game.state(), GamePhase::Complete);
    assert_eq!(total_chips(&game), 300);

    game.start_hand(None).unwrap();
    assert!(game.table().player(&p3).is_none());
    play_passively(&mut game);
}
