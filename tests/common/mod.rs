//! Shared fixtures: rule documents and a passive driver.
#![allow(dead_code)]

use houserules::{
    ActionKind, Card, Deck, Game, GamePhase, PlayerAction, PlayerId, Rules,
};
use serde_json::json;

pub fn holdem() -> Rules {
    Rules::from_value(json!({
        "game": "Texas Hold'em",
        "players": {"min": 2, "max": 9},
        "deck": {"type": "standard", "cards": 52},
        "bettingStructures": ["Limit", "No Limit", "Pot Limit"],
        "forcedBets": {"style": "blinds"},
        "bettingOrder": {"initial": "after_big_blind", "subsequent": "left_of_dealer"},
        "gamePlay": [
            {"name": "Post Blinds", "bet": {"type": "blinds"}},
            {"name": "Deal Hole Cards",
             "deal": {"location": "player", "cards": [{"number": 2, "state": "face down"}]}},
            {"name": "Pre-Flop Bet", "bet": {"type": "small"}},
            {"name": "Deal Flop",
             "deal": {"location": "community",
                      "cards": [{"number": 3, "state": "face up", "subset": "Flop"}]}},
            {"name": "Flop Bet", "bet": {"type": "small"}},
            {"name": "Deal Turn",
             "deal": {"location": "community",
                      "cards": [{"number": 1, "state": "face up", "subset": "Turn"}]}},
            {"name": "Turn Bet", "bet": {"type": "big"}},
            {"name": "Deal River",
             "deal": {"location": "community",
                      "cards": [{"number": 1, "state": "face up", "subset": "River"}]}},
            {"name": "River Bet", "bet": {"type": "big"}},
            {"name": "Showdown", "showdown": {"type": "final"}}
        ],
        "showdown": {
            "order": "clockwise",
            "startingFrom": "dealer",
            "cardsRequired": "any five cards",
            "bestHand": [{"name": "High Hand", "evaluationType": "high", "anyCards": 5}]
        }
    }))
    .expect("holdem document is valid")
}

pub fn omaha() -> Rules {
    Rules::from_value(json!({
        "game": "Omaha",
        "players": {"min": 2, "max": 9},
        "deck": {"type": "standard", "cards": 52},
        "bettingStructures": ["Pot Limit", "No Limit"],
        "forcedBets": {"style": "blinds"},
        "bettingOrder": {"initial": "after_big_blind", "subsequent": "left_of_dealer"},
        "gamePlay": [
            {"name": "Post Blinds", "bet": {"type": "blinds"}},
            {"name": "Deal Hole Cards",
             "deal": {"location": "player", "cards": [{"number": 4, "state": "face down"}]}},
            {"name": "Pre-Flop Bet", "bet": {"type": "small"}},
            {"name": "Deal Flop",
             "deal": {"location": "community",
                      "cards": [{"number": 3, "state": "face up", "subset": "Flop"}]}},
            {"name": "Flop Bet", "bet": {"type": "small"}},
            {"name": "Deal Turn",
             "deal": {"location": "community",
                      "cards": [{"number": 1, "state": "face up", "subset": "Turn"}]}},
            {"name": "Turn Bet", "bet": {"type": "big"}},
            {"name": "Deal River",
             "deal": {"location": "community",
                      "cards": [{"number": 1, "state": "face up", "subset": "River"}]}},
            {"name": "River Bet", "bet": {"type": "big"}},
            {"name": "Showdown", "showdown": {"type": "final"}}
        ],
        "showdown": {
            "order": "clockwise",
            "startingFrom": "dealer",
            "cardsRequired": "exactly two hole cards and three community cards",
            "bestHand": [{"name": "High Hand", "evaluationType": "high",
                          "holeCards": 2, "communityCards": 3}]
        }
    }))
    .expect("omaha document is valid")
}

pub fn seven_card_stud() -> Rules {
    Rules::from_value(json!({
        "game": "Seven Card Stud",
        "players": {"min": 2, "max": 7},
        "deck": {"type": "standard", "cards": 52},
        "bettingStructures": ["Limit"],
        "forcedBets": {"style": "bring-in", "rule": "low card"},
        "bettingOrder": {"initial": "bring_in", "subsequent": "high_hand"},
        "gamePlay": [
            {"name": "Post Antes", "bet": {"type": "antes"}},
            {"name": "Deal Third Street",
             "deal": {"location": "player",
                      "cards": [{"number": 2, "state": "face down"},
                                {"number": 1, "state": "face up"}]}},
            {"name": "Post Bring-In", "bet": {"type": "bring-in"}},
            {"name": "Third Street Bet", "bet": {"type": "small"}},
            {"name": "Deal Fourth Street",
             "deal": {"location": "player", "cards": [{"number": 1, "state": "face up"}]}},
            {"name": "Fourth Street Bet", "bet": {"type": "small"}},
            {"name": "Deal Fifth Street",
             "deal": {"location": "player", "cards": [{"number": 1, "state": "face up"}]}},
            {"name": "Fifth Street Bet", "bet": {"type": "big"}},
            {"name": "Deal Sixth Street",
             "deal": {"location": "player", "cards": [{"number": 1, "state": "face up"}]}},
            {"name": "Sixth Street Bet", "bet": {"type": "big"}},
            {"name": "Deal Seventh Street",
             "deal": {"location": "player", "cards": [{"number": 1, "state": "face down"}]}},
            {"name": "Seventh Street Bet", "bet": {"type": "big"}},
            {"name": "Showdown", "showdown": {"type": "final"}}
        ],
        "showdown": {
            "order": "clockwise",
            "startingFrom": "dealer",
            "cardsRequired": "best five of seven",
            "bestHand": [{"name": "High Hand", "evaluationType": "high", "anyCards": 5}]
        }
    }))
    .expect("stud document is valid")
}

pub fn badugi() -> Rules {
    Rules::from_value(json!({
        "game": "Badugi",
        "players": {"min": 2, "max": 6},
        "deck": {"type": "standard", "cards": 52},
        "bettingStructures": ["Limit"],
        "forcedBets": {"style": "blinds"},
        "bettingOrder": {"initial": "after_big_blind", "subsequent": "left_of_dealer"},
        "gamePlay": [
            {"name": "Post Blinds", "bet": {"type": "blinds"}},
            {"name": "Deal Hole Cards",
             "deal": {"location": "player", "cards": [{"number": 4, "state": "face down"}]}},
            {"name": "Pre-Draw Bet", "bet": {"type": "small"}},
            {"name": "First Draw", "draw": {"cards": [{"number": 4, "state": "face down"}]}},
            {"name": "Second Bet", "bet": {"type": "small"}},
            {"name": "Second Draw", "draw": {"cards": [{"number": 4, "state": "face down"}]}},
            {"name": "Third Bet", "bet": {"type": "big"}},
            {"name": "Third Draw", "draw": {"cards": [{"number": 4, "state": "face down"}]}},
            {"name": "Final Bet", "bet": {"type": "big"}},
            {"name": "Showdown", "showdown": {"type": "final"}}
        ],
        "showdown": {
            "order": "clockwise",
            "startingFrom": "dealer",
            "cardsRequired": "all four cards",
            "bestHand": [{"name": "Badugi", "evaluationType": "badugi", "holeCards": "all"}]
        }
    }))
    .expect("badugi document is valid")
}

pub fn dramaha() -> Rules {
    Rules::from_value(json!({
        "game": "Dramaha",
        "players": {"min": 2, "max": 6},
        "deck": {"type": "standard", "cards": 52},
        "bettingStructures": ["Pot Limit", "No Limit"],
        "forcedBets": {"style": "blinds"},
        "bettingOrder": {"initial": "after_big_blind", "subsequent": "left_of_dealer"},
        "gamePlay": [
            {"name": "Post Blinds", "bet": {"type": "blinds"}},
            {"name": "Deal Hole Cards",
             "deal": {"location": "player", "cards": [{"number": 5, "state": "face down"}]}},
            {"name": "Pre-Flop Bet", "bet": {"type": "small"}},
            {"name": "Deal Flop",
             "deal": {"location": "community",
                      "cards": [{"number": 3, "state": "face up", "subset": "Flop"}]}},
            {"name": "Flop Bet", "bet": {"type": "small"}},
            {"name": "Draw", "draw": {"cards": [{"number": 5, "state": "face down"}]}},
            {"name": "Deal Turn",
             "deal": {"location": "community",
                      "cards": [{"number": 1, "state": "face up", "subset": "Turn"}]}},
            {"name": "Turn Bet", "bet": {"type": "big"}},
            {"name": "Deal River",
             "deal": {"location": "community",
                      "cards": [{"number": 1, "state": "face up", "subset": "River"}]}},
            {"name": "River Bet", "bet": {"type": "big"}},
            {"name": "Showdown", "showdown": {"type": "final"}}
        ],
        "showdown": {
            "order": "clockwise",
            "startingFrom": "dealer",
            "cardsRequired": "omaha board hand and five-card draw hand",
            "bestHand": [
                {"name": "Board Hand", "evaluationType": "high",
                 "holeCards": 2, "communityCards": 3},
                {"name": "Draw Hand", "evaluationType": "high", "holeCards": "all"}
            ]
        }
    }))
    .expect("dramaha document is valid")
}

/// Five-card no-draw hands, declared hi/lo, antes only.
pub fn declare_hi_lo() -> Rules {
    Rules::from_value(json!({
        "game": "Declare Hi-Lo",
        "players": {"min": 2, "max": 6},
        "deck": {"type": "standard", "cards": 52},
        "bettingStructures": ["Limit"],
        "forcedBets": {"style": "antes_only"},
        "bettingOrder": {"initial": "left_of_dealer", "subsequent": "left_of_dealer"},
        "gamePlay": [
            {"name": "Post Antes", "bet": {"type": "antes"}},
            {"name": "Deal Hands",
             "deal": {"location": "player", "cards": [{"number": 5, "state": "face down"}]}},
            {"name": "Bet", "bet": {"type": "small"}},
            {"name": "Declare",
             "declare": {"options": ["high", "low", "high_low"], "simultaneous": true}},
            {"name": "Showdown", "showdown": {"type": "final"}}
        ],
        "showdown": {
            "order": "clockwise",
            "startingFrom": "dealer",
            "cardsRequired": "all five cards",
            "declaration_mode": "declare",
            "bestHand": [
                {"name": "High", "evaluationType": "high", "holeCards": "all"},
                {"name": "Low", "evaluationType": "a5_low", "holeCards": "all"}
            ]
        }
    }))
    .expect("declare document is valid")
}

/// Antes-only flip game: no voluntary betting at all.
pub fn flip() -> Rules {
    Rules::from_value(json!({
        "game": "Five Card Flip",
        "players": {"min": 2, "max": 8},
        "deck": {"type": "standard", "cards": 52},
        "bettingStructures": ["Limit"],
        "forcedBets": {"style": "antes_only"},
        "bettingOrder": {"initial": "left_of_dealer", "subsequent": "left_of_dealer"},
        "gamePlay": [
            {"name": "Post Antes", "bet": {"type": "antes"}},
            {"name": "Deal Hands",
             "deal": {"location": "player", "cards": [{"number": 5, "state": "face up"}]}},
            {"name": "Showdown", "showdown": {"type": "final"}}
        ],
        "showdown": {
            "order": "clockwise",
            "startingFrom": "dealer",
            "cardsRequired": "all five cards",
            "bestHand": [{"name": "High", "evaluationType": "high", "holeCards": "all"}]
        }
    }))
    .expect("flip document is valid")
}

/// A stacked deck from a card string like `"As Kh 2c ..."`.
pub fn stacked(cards: &str) -> Deck {
    Deck::stacked(Card::parse_cards(cards).expect("valid card string"))
}

/// Plays the hand to completion with passive defaults: check or call,
/// stand pat, minimum card actions, the first declaration or choice.
pub fn play_passively(game: &mut Game) {
    let mut guard = 0;
    while let Some(player) = game.current_player() {
        guard += 1;
        assert!(guard < 1000, "passive driver did not terminate");
        let options = game.valid_actions(&player);
        assert!(!options.is_empty(), "current player must have options");

        let pick = |kind: ActionKind| options.iter().find(|o| o.kind == kind);
        let result = if pick(ActionKind::Check).is_some() {
            game.player_action(&player, ActionKind::Check, PlayerAction::default())
        } else if pick(ActionKind::Call).is_some() {
            game.player_action(&player, ActionKind::Call, PlayerAction::default())
        } else if pick(ActionKind::StandPat).is_some() {
            game.player_action(&player, ActionKind::StandPat, PlayerAction::default())
        } else if let Some(option) = pick(ActionKind::Declare) {
            let value = option.values.first().cloned().unwrap_or_default();
            let declaration = match value.as_str() {
                "low" => houserules::rules::Declaration::Low,
                "high_low" => houserules::rules::Declaration::HighLow,
                _ => houserules::rules::Declaration::High,
            };
            let action = PlayerAction {
                declaration: Some(declaration),
                ..PlayerAction::default()
            };
            game.player_action(&player, ActionKind::Declare, action)
        } else if let Some(option) = pick(ActionKind::Choose) {
            let action = PlayerAction {
                choice: option.values.first().cloned(),
                ..PlayerAction::default()
            };
            game.player_action(&player, ActionKind::Choose, action)
        } else if pick(ActionKind::Skip).is_some() {
            game.player_action(&player, ActionKind::Skip, PlayerAction::default())
        } else if let Some(option) = options.iter().find(|o| o.cards_min.is_some()) {
            // Card actions take the minimum count, face-down cards first
            // (exposes require them).
            let needed = option.cards_min.unwrap_or(0);
            let cards: Vec<_> = game
                .table()
                .player(&player)
                .map(|p| {
                    let mut held: Vec<_> = p.hand.cards().collect();
                    held.sort_by_key(|h| h.is_face_up());
                    held.into_iter().take(needed).map(|h| h.card).collect()
                })
                .unwrap_or_default();
            game.player_action(&player, option.kind, PlayerAction::cards(cards))
        } else {
            let option = &options[0];
            let action = option
                .min
                .map(PlayerAction::amount)
                .unwrap_or_default();
            game.player_action(&player, option.kind, action)
        };
        let result = result.expect("engine stays healthy under passive play");
        assert!(result.ok, "passive action rejected: {:?}", result.error);
    }
    assert_eq!(game.state(), GamePhase::Complete);
}

/// Total chips across all stacks.
pub fn total_chips(game: &Game) -> i64 {
    game.table().players().map(|p| p.stack).sum()
}

/// Convenience: a player's stack by id.
pub fn stack_of(game: &Game, id: &str) -> i64 {
    let id: PlayerId = id.to_string();
    game.table().player(&id).map(|p| p.stack).unwrap_or(-1)
}
