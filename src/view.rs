//! Per-observer snapshots.
//!
//! The projector serializes a hand for one viewer: another player's
//! face-down cards become `null`, the viewer's own cards always carry their
//! value plus a visibility flag, and the currently legal actions are
//! attached when it is the viewer's turn. The projection is pure; it never
//! mutates the game.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::actions::{ActionOption, GamePhase, PlayerId};
use crate::cards::{Card, Visibility};
use crate::game::Game;
use crate::rules::{Chips, Declaration};

#[derive(Debug, Clone, Serialize)]
pub struct GameInfo {
    pub variant_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub step_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BettingView {
    pub structure: String,
    pub current_bet: Chips,
    pub pot: Chips,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerEntry {
    pub id: PlayerId,
    pub name: String,
    pub stack: Chips,
    pub seat: usize,
    /// Clockwise distance from the dealer button; zero is the button.
    pub position: usize,
    pub current_bet: Chips,
    pub is_active: bool,
    pub is_all_in: bool,
    pub is_current: bool,
    /// Cards in hand order; `null` where the viewer may not see one.
    pub cards: Vec<Option<Card>>,
    /// Subset name per card, parallel to `cards`.
    pub card_subsets: Vec<String>,
    /// Visibility per card, parallel to `cards`.
    pub card_visibility: Vec<Visibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration: Option<Declaration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
}

/// A snapshot of the hand as one observer is allowed to see it.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub game_info: GameInfo,
    pub state: GamePhase,
    pub pot: Chips,
    /// Region name to cards; face-down board cards are `null` for everyone.
    pub community_cards: BTreeMap<String, Vec<Option<Card>>>,
    /// Scalar community values such as die rolls.
    pub community_values: BTreeMap<String, i64>,
    pub betting: BettingView,
    pub players: Vec<PlayerEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_player: Option<PlayerId>,
    /// Present when the viewer is the player to act.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_actions: Option<Vec<ActionOption>>,
}

impl Game {
    /// Projects the hand for `viewer`; `None` is a spectator who sees only
    /// face-up cards.
    pub fn view_for(&self, viewer: Option<&PlayerId>) -> PlayerView {
        let current = self.current_player();
        let dealer = self.table().dealer_seat();
        let seat_count = self.table().seat_count();

        let community_cards = self
            .table()
            .community
            .iter()
            .map(|(region, cards)| {
                let projected = cards
                    .iter()
                    .map(|h| h.is_face_up().then_some(h.card))
                    .collect();
                (region.clone(), projected)
            })
            .collect();

        let players = self
            .table()
            .players()
            .map(|player| {
                let own = viewer == Some(&player.id);
                let mut cards = Vec::with_capacity(player.hand.len());
                let mut card_subsets = Vec::with_capacity(player.hand.len());
                let mut card_visibility = Vec::with_capacity(player.hand.len());
                for (subset, held_cards) in player.hand.subsets() {
                    for held in held_cards {
                        let visible = own || held.is_face_up();
                        cards.push(visible.then_some(held.card));
                        card_subsets.push(subset.clone());
                        card_visibility.push(held.visibility);
                    }
                }
                PlayerEntry {
                    id: player.id.clone(),
                    name: player.name.clone(),
                    stack: player.stack,
                    seat: player.seat,
                    position: (player.seat + seat_count - dealer) % seat_count,
                    current_bet: self.betting.round_bet(&player.id),
                    is_active: player.is_active,
                    is_all_in: player.is_all_in,
                    is_current: current.as_ref() == Some(&player.id),
                    cards,
                    card_subsets,
                    card_visibility,
                    // Declarations stay hidden until the reveal.
                    declaration: if self.state() == GamePhase::Complete || own {
                        player.declaration
                    } else {
                        None
                    },
                    classification: player.classification.clone(),
                }
            })
            .collect();

        let valid_actions = viewer.and_then(|id| {
            if current.as_ref() == Some(id) {
                Some(self.valid_actions(id))
            } else {
                None
            }
        });

        PlayerView {
            game_info: GameInfo {
                variant_name: self.rules().game.clone(),
                category: self.rules().category.clone(),
                step_name: self.current_step_name.clone(),
            },
            state: self.state(),
            pot: self.betting.pot_total(),
            community_cards,
            community_values: self.table().scalars.clone(),
            betting: BettingView {
                structure: self.structure.to_string(),
                current_bet: self.betting.current_bet(),
                pot: self.betting.pot_total(),
            },
            players,
            current_player: current,
            valid_actions,
        }
    }
}
