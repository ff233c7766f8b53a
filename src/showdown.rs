//! Showdown resolution.
//!
//! Interprets the rules document's showdown configuration against the
//! finished hand: resolves conditional best-hand tables, gates players by
//! declaration, partitions them by classification, evaluates every line
//! through the selector, and pays every pot layer out through the betting
//! manager's split rules. The result is a serializable record the driver
//! can render directly.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::actions::{Event, PlayerId};
use crate::betting::BettingManager;
use crate::cards::{Card, Rank};
use crate::errors::EngineError;
use crate::evaluator::EvalCache;
use crate::game::Game;
use crate::rules::{
    Chips, Declaration, DeclarationMode, HandConfig, UnqualifiedAction,
};
use crate::selector::{best_hand, BestHand};

/// One pot layer's outcome for one line.
#[derive(Debug, Clone, Serialize)]
pub struct PotBreakdown {
    pub amount: Chips,
    pub line: String,
    pub winners: Vec<PlayerId>,
}

/// A hand shown at the end, with the exact cards that played.
#[derive(Debug, Clone, Serialize)]
pub struct ShownHand {
    pub player: PlayerId,
    pub line: String,
    pub description: String,
    pub cards: Vec<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
}

/// The final record of a completed hand.
#[derive(Debug, Clone, Serialize)]
pub struct GameResult {
    pub winners: Vec<PlayerId>,
    pub awards: BTreeMap<PlayerId, Chips>,
    pub pots: Vec<PotBreakdown>,
    pub hands: Vec<ShownHand>,
}

impl GameResult {
    pub fn uncontested(survivor: &PlayerId, total: Chips) -> Self {
        Self {
            winners: vec![survivor.clone()],
            awards: BTreeMap::from([(survivor.clone(), total)]),
            pots: vec![PotBreakdown {
                amount: total,
                line: "uncontested".to_string(),
                winners: vec![survivor.clone()],
            }],
            hands: Vec::new(),
        }
    }
}

/// A face card anywhere in the hand classifies a player as "face",
/// otherwise "butt" (action-razz style strata).
fn classify(priority: &[String], hole: &BTreeMap<String, Vec<crate::cards::HeldCard>>) -> Option<String> {
    if priority.is_empty() {
        return None;
    }
    let has_face = hole
        .values()
        .flatten()
        .any(|h| matches!(h.card.rank, Rank::Jack | Rank::Queen | Rank::King));
    let tag = if has_face { "face" } else { "butt" };
    priority
        .iter()
        .find(|p| p.as_str() == tag)
        .cloned()
        .or_else(|| Some(tag.to_string()))
}

fn line_name(config: &HandConfig, index: usize) -> String {
    config
        .name
        .clone()
        .unwrap_or_else(|| format!("{} ({})", config.evaluation_type, index + 1))
}

fn contests(declaration: Option<Declaration>, low_line: bool) -> bool {
    match declaration {
        None => true,
        Some(Declaration::High) => !low_line,
        Some(Declaration::Low) => low_line,
        Some(Declaration::HighLow) => true,
    }
}

/// Runs the final showdown for `game`: evaluates, awards, records.
pub(crate) fn run(game: &mut Game) -> Result<(), EngineError> {
    game.betting.close_round();

    // Resolve which best-hand table applies.
    let showdown_rules = game.rules.showdown.clone();
    let mut lines: Vec<HandConfig> = if !showdown_rules.conditional_best_hands.is_empty() {
        showdown_rules
            .conditional_best_hands
            .iter()
            .find_map(|conditional| {
                match game.eval_trigger(&conditional.trigger, None) {
                    Ok(true) => Some(Ok(conditional.best_hand.clone())),
                    Ok(false) => None,
                    Err(err) => Some(Err(err)),
                }
            })
            .transpose()?
            .unwrap_or_else(|| showdown_rules.default_best_hand.clone())
    } else if !showdown_rules.best_hand.is_empty() {
        showdown_rules.best_hand.clone()
    } else {
        showdown_rules.default_best_hand.clone()
    };
    // Wildcard rules registered during dealing apply to every line.
    for line in &mut lines {
        line.wild_cards.extend(game.hand_wilds.iter().cloned());
    }

    let contenders: Vec<PlayerId> = game.table.active_ids();
    let mut cache = EvalCache::new();

    // Best hand per (line, player).
    let mut evaluated: Vec<BTreeMap<PlayerId, BestHand>> = Vec::with_capacity(lines.len());
    for config in &lines {
        let mut per_player = BTreeMap::new();
        for id in &contenders {
            let player = game
                .table
                .player(id)
                .ok_or_else(|| EngineError::NoSuchPlayer(id.clone()))?;
            if !contests(
                player.declaration.filter(|_| {
                    showdown_rules.declaration_mode == DeclarationMode::Declare
                }),
                config.evaluation_type.is_low(),
            ) {
                continue;
            }
            if let Some(found) = best_hand(
                config,
                player.hand.subsets(),
                game.table.community_view(),
                &mut cache,
            )? {
                per_player.insert(id.clone(), found);
            }
        }
        evaluated.push(per_player);
    }

    // Classification strata: the best class present keeps the whole pot.
    if !showdown_rules.classification_priority.is_empty() {
        let mut tags: BTreeMap<PlayerId, String> = BTreeMap::new();
        for id in &contenders {
            if let Some(player) = game.table.player(id) {
                if let Some(tag) =
                    classify(&showdown_rules.classification_priority, player.hand.subsets())
                {
                    tags.insert(id.clone(), tag.clone());
                    if let Some(entry) = game.table.player_mut(id) {
                        entry.classification = Some(tag);
                    }
                }
            }
        }
        let winning_class = showdown_rules
            .classification_priority
            .iter()
            .find(|class| tags.values().any(|t| t == *class))
            .cloned();
        if let Some(class) = winning_class {
            for per_player in &mut evaluated {
                per_player.retain(|id, _| tags.get(id) == Some(&class));
            }
        }
    }

    // Declare-both forfeiture: a high-low declarer must win every line
    // outright; otherwise they are stripped from all lines and the winners
    // are recomputed without them.
    let both_declarers: Vec<PlayerId> = if showdown_rules.declaration_mode
        == DeclarationMode::Declare
    {
        contenders
            .iter()
            .filter(|id| {
                game.table
                    .player(id)
                    .map_or(false, |p| p.declaration == Some(Declaration::HighLow))
            })
            .cloned()
            .collect()
    } else {
        Vec::new()
    };
    let mut excluded: BTreeSet<PlayerId> = BTreeSet::new();
    loop {
        let mut newly_excluded = None;
        for id in &both_declarers {
            if excluded.contains(id) {
                continue;
            }
            let sweeps = evaluated.iter().all(|per_player| {
                let live: Vec<(&PlayerId, &BestHand)> = per_player
                    .iter()
                    .filter(|(p, _)| !excluded.contains(*p))
                    .collect();
                match live.iter().map(|(_, b)| &b.rank).max() {
                    Some(best) => {
                        live.iter().filter(|(_, b)| &b.rank == best).count() == 1
                            && live
                                .iter()
                                .any(|(p, b)| *p == id && &b.rank == best)
                    }
                    None => false,
                }
            });
            if !sweeps {
                newly_excluded = Some(id.clone());
                break;
            }
        }
        match newly_excluded {
            Some(id) => {
                log::debug!("declare-both player {id} failed to scoop and forfeits");
                excluded.insert(id);
            }
            None => break,
        }
    }
    for per_player in &mut evaluated {
        per_player.retain(|id, _| !excluded.contains(id));
    }

    // Record shown hands.
    let mut shown: Vec<ShownHand> = Vec::new();
    for (index, (config, per_player)) in lines.iter().zip(&evaluated).enumerate() {
        for (id, found) in per_player {
            let classification = game.table.player(id).and_then(|p| p.classification.clone());
            shown.push(ShownHand {
                player: id.clone(),
                line: line_name(config, index),
                description: found.rank.description.clone(),
                cards: found.cards.clone(),
                classification,
            });
        }
    }
    for hand in &shown {
        game.events.push(Event::ShowdownHand {
            player: hand.player.clone(),
            line: hand.line.clone(),
            description: hand.description.clone(),
            cards: hand.cards.clone(),
        });
    }

    // Pay out every pot layer.
    let award_order = game.award_order();
    let pots = game.betting.pots();
    let mut breakdowns: Vec<PotBreakdown> = Vec::new();
    let mut awards: BTreeMap<PlayerId, Chips> = BTreeMap::new();
    for (pot_index, pot) in pots.iter().enumerate() {
        // Winners per line among this pot's eligible players.
        let mut line_winners: Vec<Vec<PlayerId>> = Vec::with_capacity(lines.len());
        for per_player in &evaluated {
            let eligible: Vec<(&PlayerId, &BestHand)> = per_player
                .iter()
                .filter(|(id, _)| pot.eligible.contains(id))
                .collect();
            let winners = match eligible.iter().map(|(_, b)| &b.rank).max() {
                Some(best) => {
                    let mut ids: Vec<PlayerId> = eligible
                        .iter()
                        .filter(|(_, b)| &b.rank == best)
                        .map(|(id, _)| (*id).clone())
                        .collect();
                    ids.sort_by_key(|id| award_order.iter().position(|o| o == id));
                    ids
                }
                None => Vec::new(),
            };
            line_winners.push(winners);
        }

        // Split the layer across lines, odd chip to the first line.
        let mut shares = vec![0; lines.len().max(1)];
        let per_line = pot.amount / lines.len().max(1) as Chips;
        let mut remainder = pot.amount - per_line * lines.len().max(1) as Chips;
        for share in shares.iter_mut() {
            *share = per_line + if remainder > 0 { 1 } else { 0 };
            if remainder > 0 {
                remainder -= 1;
            }
        }

        // Reassign shares of lines nobody qualified for.
        let claimed: Vec<usize> = (0..lines.len())
            .filter(|&i| !line_winners[i].is_empty())
            .collect();
        for i in 0..lines.len() {
            if !line_winners[i].is_empty() || shares[i] == 0 {
                continue;
            }
            let action = lines[i]
                .default_action
                .or(showdown_rules.global_default_action)
                .unwrap_or(UnqualifiedAction::ToOtherLine);
            let orphan = shares[i];
            shares[i] = 0;
            match action {
                UnqualifiedAction::ToOtherLine | UnqualifiedAction::BestHigh => {
                    // With no qualifying line at all the chips fall back to
                    // the pot's eligible players evenly.
                    if let Some(&target) = claimed.first() {
                        let target = match action {
                            UnqualifiedAction::BestHigh => claimed
                                .iter()
                                .copied()
                                .find(|&t| !lines[t].evaluation_type.is_low())
                                .unwrap_or(target),
                            UnqualifiedAction::ToOtherLine => target,
                        };
                        shares[target] += orphan;
                    } else {
                        log::warn!(
                            "no line qualified for pot {pot_index}; refunding evenly"
                        );
                        let mut refund_order: Vec<PlayerId> = award_order
                            .iter()
                            .filter(|id| pot.eligible.contains(id))
                            .cloned()
                            .collect();
                        if refund_order.is_empty() {
                            refund_order = pot.eligible.clone();
                        }
                        for (id, amount) in
                            BettingManager::split_award(orphan, &refund_order)
                        {
                            *awards.entry(id).or_default() += amount;
                        }
                    }
                }
            }
        }

        for (i, config) in lines.iter().enumerate() {
            if shares[i] == 0 || line_winners[i].is_empty() {
                continue;
            }
            let split = BettingManager::split_award(shares[i], &line_winners[i]);
            for (id, amount) in &split {
                *awards.entry(id.clone()).or_default() += amount;
                game.events.push(Event::PotAwarded {
                    player: id.clone(),
                    amount: *amount,
                    pot_index,
                    line: line_name(config, i),
                });
            }
            breakdowns.push(PotBreakdown {
                amount: shares[i],
                line: line_name(config, i),
                winners: line_winners[i].clone(),
            });
        }
    }

    // Move the chips.
    for (id, amount) in &awards {
        if let Some(player) = game.table.player_mut(id) {
            player.stack += amount;
        }
    }

    let mut winners: Vec<PlayerId> = awards
        .iter()
        .filter(|(_, &amount)| amount > 0)
        .map(|(id, _)| id.clone())
        .collect();
    winners.sort_by_key(|id| award_order.iter().position(|o| o == id));

    game.result = Some(GameResult {
        winners,
        awards,
        pots: breakdowns,
        hands: shown,
    });
    Ok(())
}
