//! Best-hand selection.
//!
//! Given a player's hole cards (partitioned into named subsets), the
//! community regions, and one `bestHand` line from the rules document, this
//! module enumerates every admissible hole-and-community combination,
//! evaluates each, and returns the best qualifying hand together with the
//! exact cards it uses. The admissible combinations are driven entirely by
//! the line's constraint fields; the precedence between constraint forms is
//! fixed and documented on [`best_hand`].

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::cards::{Card, HeldCard, Rank, RankOrder, WildRole};
use crate::errors::EngineError;
use crate::evaluator::{evaluate_held, EvalCache, EvaluationType, HandRank};
use crate::rules::{CardCount, HandConfig, WildCardRule, WildRoleSpec};

/// The winning combination for one line.
#[derive(Debug, Clone)]
pub struct BestHand {
    pub rank: HandRank,
    pub cards: Vec<Card>,
}

struct Search<'a> {
    eval: EvaluationType,
    qualifier: Option<(u32, u32)>,
    cache: &'a mut EvalCache,
    best: Option<BestHand>,
}

impl Search<'_> {
    /// Scores one candidate, reducing oversized sets to the evaluator's
    /// fixed hand size first.
    fn consider(&mut self, cards: &[HeldCard]) -> Result<(), EngineError> {
        match self.eval.hand_size() {
            Some(k) if cards.len() < k => return Ok(()),
            Some(k) if cards.len() > k => {
                for combo in cards.iter().copied().combinations(k) {
                    self.score(&combo)?;
                }
                Ok(())
            }
            _ => self.score(cards),
        }
    }

    fn score(&mut self, cards: &[HeldCard]) -> Result<(), EngineError> {
        let rank = evaluate_held(cards, self.eval, self.cache)?;
        if !rank.qualifies(self.qualifier) {
            return Ok(());
        }
        if self.best.as_ref().map_or(true, |b| rank > b.rank) {
            self.best = Some(BestHand {
                rank,
                cards: cards.iter().map(|h| h.card).collect(),
            });
        }
        Ok(())
    }
}

fn lowest_rank(cards: &[HeldCard]) -> Option<Rank> {
    cards
        .iter()
        .filter_map(|h| {
            RankOrder::STANDARD
                .iter()
                .position(|&r| r == h.card.rank)
                .map(|pos| (pos, h.card.rank))
        })
        .min_by_key(|&(pos, _)| pos)
        .map(|(_, rank)| rank)
}

fn role_of(spec: WildRoleSpec) -> WildRole {
    match spec {
        WildRoleSpec::Wild => WildRole::Wild,
        WildRoleSpec::Bug => WildRole::Bug,
    }
}

/// Applies a line's wildcard rules on top of any deal-time roles.
fn apply_wild_rules(cards: &mut [HeldCard], rules: &[WildCardRule], lowest_hole: Option<Rank>, is_hole: bool) {
    for rule in rules {
        match rule {
            WildCardRule::Joker { role, .. } => {
                for held in cards.iter_mut() {
                    if held.card.rank == Rank::Joker && held.wild_role == WildRole::None {
                        held.wild_role = role_of(*role);
                    }
                }
            }
            WildCardRule::Rank { rank, role, .. } => {
                for held in cards.iter_mut() {
                    if held.card.rank == *rank && held.wild_role == WildRole::None {
                        held.wild_role = role_of(*role);
                    }
                }
            }
            WildCardRule::LowestHole { role, .. } => {
                if !is_hole {
                    continue;
                }
                if let Some(low) = lowest_hole {
                    for held in cards.iter_mut() {
                        if held.card.rank == low && held.wild_role == WildRole::None {
                            held.wild_role = role_of(*role);
                        }
                    }
                }
            }
        }
    }
}

fn region_pool(
    community: &BTreeMap<String, Vec<HeldCard>>,
    names: Option<&[String]>,
) -> Vec<HeldCard> {
    match names {
        None => community.values().flatten().copied().collect(),
        Some(names) => names
            .iter()
            .flat_map(|name| community.get(name).into_iter().flatten().copied())
            .collect(),
    }
}

fn hole_selections(pool: &[HeldCard], count: CardCount) -> Vec<Vec<HeldCard>> {
    match count {
        CardCount::All => vec![pool.to_vec()],
        CardCount::Exact(n) => pool.iter().copied().combinations(n).collect(),
    }
}

/// Finds the best qualifying hand for one `bestHand` line, or `None` when
/// no admissible combination qualifies.
///
/// Constraint precedence: `playerHandSize` branch (when one matches the
/// player's hand size), then `combinations`, `communityCardCombinations`,
/// `communityCardSelectCombinations`, `communitySubsetRequirements`, the
/// plain `holeCards`/`communityCards` pair, and finally `anyCards`.
pub fn best_hand(
    config: &HandConfig,
    hole: &BTreeMap<String, Vec<HeldCard>>,
    community: &BTreeMap<String, Vec<HeldCard>>,
    cache: &mut EvalCache,
) -> Result<Option<BestHand>, EngineError> {
    let all_hole: Vec<HeldCard> = hole.values().flatten().copied().collect();
    let lowest_hole = lowest_rank(&all_hole);

    let mut hole_pool: Vec<HeldCard> = if config.hole_cards_allowed.is_empty() {
        all_hole.clone()
    } else {
        config
            .hole_cards_allowed
            .iter()
            .flat_map(|name| hole.get(name).into_iter().flatten().copied())
            .collect()
    };
    apply_wild_rules(&mut hole_pool, &config.wild_cards, lowest_hole, true);

    let mut regions: BTreeMap<String, Vec<HeldCard>> = community.clone();
    for cards in regions.values_mut() {
        apply_wild_rules(cards, &config.wild_cards, lowest_hole, false);
    }

    let mut search = Search {
        eval: config.evaluation_type,
        qualifier: config.qualifier,
        cache,
        best: None,
    };

    let community_subset = config.community_subset.as_ref().map(std::slice::from_ref);

    if !config.player_hand_size.is_empty() {
        if let Some(branch) = config
            .player_hand_size
            .iter()
            .find(|b| b.size == all_hole.len())
        {
            let pool = region_pool(&regions, community_subset);
            pair_candidates(
                &mut search,
                &hole_pool,
                &pool,
                branch.hole_cards,
                branch.community_cards,
            )?;
            return Ok(search.best);
        }
    }

    if !config.combinations.is_empty() {
        for combo in &config.combinations {
            let names = combo
                .community_subset
                .as_ref()
                .map(std::slice::from_ref)
                .or(community_subset);
            let pool = region_pool(&regions, names);
            pair_candidates(
                &mut search,
                &hole_pool,
                &pool,
                CardCount::Exact(combo.hole_cards),
                combo.community_cards,
            )?;
        }
    } else if !config.community_card_combinations.is_empty() {
        let hole_count = config.hole_cards.unwrap_or(CardCount::All);
        for names in &config.community_card_combinations {
            let pool = region_pool(&regions, Some(names.as_slice()));
            let community_count = config.community_cards.unwrap_or(pool.len());
            pair_candidates(&mut search, &hole_pool, &pool, hole_count, community_count)?;
        }
    } else if !config.community_card_select_combinations.is_empty() {
        let hole_count = config.hole_cards.unwrap_or(CardCount::All);
        for picks in &config.community_card_select_combinations {
            // Build every per-region pick within each region's (min, max).
            let mut community_sets: Vec<Vec<HeldCard>> = vec![Vec::new()];
            for pick in picks {
                let pool = regions.get(&pick.0).cloned().unwrap_or_default();
                let mut grown = Vec::new();
                for n in pick.1..=pick.2 {
                    for combo in pool.iter().copied().combinations(n) {
                        for base in &community_sets {
                            let mut set = base.clone();
                            set.extend(combo.iter().copied());
                            grown.push(set);
                        }
                    }
                }
                community_sets = grown;
            }
            for set in community_sets {
                if let Some(required) = config.community_cards {
                    if set.len() != required {
                        continue;
                    }
                }
                for holes in hole_selections(&hole_pool, hole_count) {
                    let mut candidate = holes;
                    candidate.extend(set.iter().copied());
                    search.consider(&candidate)?;
                }
            }
        }
    } else if !config.community_subset_requirements.is_empty() {
        let mut community_sets: Vec<Vec<HeldCard>> = vec![Vec::new()];
        for req in &config.community_subset_requirements {
            let pool = regions.get(&req.subset).cloned().unwrap_or_default();
            let low = if req.required { req.count } else { 0 };
            let mut grown = Vec::new();
            for n in low..=req.count {
                for combo in pool.iter().copied().combinations(n) {
                    for base in &community_sets {
                        let mut set = base.clone();
                        set.extend(combo.iter().copied());
                        grown.push(set);
                    }
                }
            }
            community_sets = grown;
        }
        for set in community_sets {
            let hole_count = match (config.hole_cards, config.evaluation_type.hand_size()) {
                (Some(count), _) => count,
                (None, Some(k)) if k >= set.len() => CardCount::Exact(k - set.len()),
                _ => CardCount::Exact(0),
            };
            for holes in hole_selections(&hole_pool, hole_count) {
                let mut candidate = holes;
                candidate.extend(set.iter().copied());
                search.consider(&candidate)?;
            }
        }
    } else if config.hole_cards.is_some() || config.community_cards.is_some() {
        let pool = region_pool(&regions, community_subset);
        pair_candidates(
            &mut search,
            &hole_pool,
            &pool,
            config.hole_cards.unwrap_or(CardCount::All),
            config.community_cards.unwrap_or(0),
        )?;
    } else if let Some(n) = config.any_cards {
        let mut pool = hole_pool.clone();
        pool.extend(region_pool(&regions, community_subset));
        if pool.len() >= n {
            for combo in pool.iter().copied().combinations(n) {
                search.consider(&combo)?;
            }
        }
    } else {
        search.consider(&hole_pool)?;
    }

    Ok(search.best)
}

fn pair_candidates(
    search: &mut Search<'_>,
    hole_pool: &[HeldCard],
    community_pool: &[HeldCard],
    hole_count: CardCount,
    community_count: usize,
) -> Result<(), EngineError> {
    if community_pool.len() < community_count {
        return Ok(());
    }
    for holes in hole_selections(hole_pool, hole_count) {
        for board in community_pool.iter().copied().combinations(community_count) {
            let mut candidate = holes.clone();
            candidate.extend(board.iter().copied());
            search.consider(&candidate)?;
        }
    }
    Ok(())
}
