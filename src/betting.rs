//! Bet tracking, legal-action computation, and pot formation.
//!
//! The manager keeps two ledgers: per-round bets (reset when a round
//! closes) and per-hand contributions (never reset; side pots are derived
//! from them by contribution layering, so pots never need incremental
//! bookkeeping). It never touches player stacks directly: `apply` validates
//! an action and returns the chips to deduct, and the game applies them.

use std::collections::{BTreeMap, BTreeSet};

use crate::actions::{ActionKind, ActionOption, PlayerId};
use crate::errors::ActionError;
use crate::rules::{BettingStructure, Chips};

/// Table stakes for one game. Limit games read the fixed street sizes;
/// no-limit and pot-limit games read the blinds and treat the big blind as
/// the minimum bet.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stakes {
    pub ante: Chips,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub small_bet: Chips,
    pub big_bet: Chips,
    pub bring_in: Chips,
}

impl Stakes {
    /// Conventional limit stakes: big bet twice the small, big blind equal
    /// to the small bet.
    pub fn limit(small_bet: Chips, ante: Chips, bring_in: Chips) -> Self {
        Self {
            ante,
            small_blind: small_bet / 2,
            big_blind: small_bet,
            small_bet,
            big_bet: small_bet * 2,
            bring_in,
        }
    }

    pub fn blinds(small_blind: Chips, big_blind: Chips) -> Self {
        Self {
            ante: 0,
            small_blind,
            big_blind,
            small_bet: big_blind,
            big_bet: big_blind * 2,
            bring_in: 0,
        }
    }
}

/// Which per-street bet size a round uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreetSize {
    Small,
    Big,
}

/// A pot layer: its chips and who can win it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pot {
    pub amount: Chips,
    pub eligible: Vec<PlayerId>,
}

/// How many raises a limit street allows before betting is capped.
const LIMIT_RAISE_CAP: usize = 4;

#[derive(Debug)]
pub struct BettingManager {
    structure: BettingStructure,
    stakes: Stakes,
    /// Total chips each player has put into this hand, including the open
    /// round and antes.
    contributions: BTreeMap<PlayerId, Chips>,
    folded: BTreeSet<PlayerId>,
    all_in: BTreeSet<PlayerId>,
    round_bets: BTreeMap<PlayerId, Chips>,
    acted: BTreeSet<PlayerId>,
    current_bet: Chips,
    min_raise: Chips,
    street_bet: Chips,
    raises: usize,
    /// After a bring-in: the full small bet the action may be completed to.
    completion_to: Option<Chips>,
}

impl BettingManager {
    pub fn new(structure: BettingStructure, stakes: Stakes) -> Self {
        Self {
            structure,
            stakes,
            contributions: BTreeMap::new(),
            folded: BTreeSet::new(),
            all_in: BTreeSet::new(),
            round_bets: BTreeMap::new(),
            acted: BTreeSet::new(),
            current_bet: 0,
            min_raise: 0,
            street_bet: 0,
            raises: 0,
            completion_to: None,
        }
    }

    pub fn structure(&self) -> BettingStructure {
        self.structure
    }

    pub fn stakes(&self) -> &Stakes {
        &self.stakes
    }

    /// Clears every ledger for a new hand.
    pub fn begin_hand(&mut self) {
        self.contributions.clear();
        self.folded.clear();
        self.all_in.clear();
        self.round_bets.clear();
        self.acted.clear();
        self.current_bet = 0;
        self.min_raise = 0;
        self.street_bet = 0;
        self.raises = 0;
        self.completion_to = None;
    }

    /// Opens a voluntary betting round. Forced bets already posted this
    /// round (blinds, bring-in) stay live and must be called.
    pub fn begin_round(&mut self, size: StreetSize) {
        self.street_bet = match (self.structure, size) {
            (BettingStructure::Limit, StreetSize::Small) => self.stakes.small_bet,
            (BettingStructure::Limit, StreetSize::Big) => self.stakes.big_bet,
            // Blind games open for the big blind at minimum.
            _ => self.stakes.big_blind.max(1),
        };
        if self.min_raise < self.street_bet {
            self.min_raise = self.street_bet;
        }
        self.raises = 0;
    }

    pub fn current_bet(&self) -> Chips {
        self.current_bet
    }

    pub fn round_bet(&self, player: &PlayerId) -> Chips {
        self.round_bets.get(player).copied().unwrap_or(0)
    }

    pub fn contribution(&self, player: &PlayerId) -> Chips {
        self.contributions.get(player).copied().unwrap_or(0)
    }

    pub fn pot_total(&self) -> Chips {
        self.contributions.values().sum()
    }

    pub fn is_all_in(&self, player: &PlayerId) -> bool {
        self.all_in.contains(player)
    }

    pub fn has_folded(&self, player: &PlayerId) -> bool {
        self.folded.contains(player)
    }

    pub fn has_acted(&self, player: &PlayerId) -> bool {
        self.acted.contains(player)
    }

    /// Records an ante: straight into the pot, never owed a call.
    pub fn post_ante(&mut self, player: &PlayerId, amount: Chips, stack: Chips) -> Chips {
        let posted = amount.min(stack);
        *self.contributions.entry(player.clone()).or_default() += posted;
        if posted == stack {
            self.all_in.insert(player.clone());
        }
        posted
    }

    /// Records a live forced bet (blind or bring-in). Short stacks post
    /// all-in for less.
    pub fn post_blind(&mut self, player: &PlayerId, amount: Chips, stack: Chips) -> Chips {
        let posted = amount.min(stack);
        *self.round_bets.entry(player.clone()).or_default() += posted;
        *self.contributions.entry(player.clone()).or_default() += posted;
        let live = self.round_bet(player);
        if live > self.current_bet {
            self.current_bet = live;
            // The full nominal amount sets the raise standard even when the
            // poster was short.
            self.min_raise = self.min_raise.max(amount);
        }
        if posted == stack {
            self.all_in.insert(player.clone());
        }
        posted
    }

    /// Forced contribution outside the betting order, e.g. a card
    /// protection fee. Goes straight to the pot like an ante.
    pub fn post_fee(&mut self, player: &PlayerId, amount: Chips, stack: Chips) -> Chips {
        self.post_ante(player, amount, stack)
    }

    /// Records the bring-in. Until someone completes, the live bet is the
    /// bring-in amount and the first "raise" is a completion to the full
    /// small bet rather than a normal increment.
    pub fn post_bring_in(&mut self, player: &PlayerId, stack: Chips) -> Chips {
        let posted = self.post_blind(player, self.stakes.bring_in, stack);
        self.completion_to = Some(self.stakes.small_bet);
        posted
    }

    fn to_call(&self, player: &PlayerId, stack: Chips) -> Chips {
        (self.current_bet - self.round_bet(player)).min(stack)
    }

    /// Largest legal total this player may bring their round bet to.
    fn max_to(&self, player: &PlayerId, stack: Chips) -> Chips {
        let all_in_to = self.round_bet(player) + stack;
        match self.structure {
            BettingStructure::Limit => {
                let target = match self.completion_to {
                    Some(c) if self.current_bet < c => c,
                    _ if self.current_bet == 0 => self.street_bet,
                    _ => self.current_bet + self.street_bet,
                };
                target.min(all_in_to)
            }
            BettingStructure::NoLimit => all_in_to,
            BettingStructure::PotLimit => {
                let call = self.current_bet - self.round_bet(player);
                let pot_after_call = self.pot_total() + call;
                (self.current_bet + pot_after_call).min(all_in_to).max(
                    // A pot-limit player may always at least call.
                    self.round_bet(player) + call.min(stack),
                )
            }
        }
    }

    fn min_to(&self, player: &PlayerId, stack: Chips) -> Chips {
        let all_in_to = self.round_bet(player) + stack;
        let nominal = match self.completion_to {
            Some(c) if self.current_bet < c => c,
            _ if self.current_bet == 0 => self.street_bet,
            _ => self.current_bet + self.min_raise,
        };
        nominal.min(all_in_to)
    }

    fn raise_capped(&self, active_players: usize) -> bool {
        self.structure == BettingStructure::Limit
            && active_players > 2
            && self.raises >= LIMIT_RAISE_CAP
    }

    /// The options open to `player` right now. `active_players` counts
    /// non-folded, non-all-in players still in the hand.
    pub fn legal_actions(
        &self,
        player: &PlayerId,
        stack: Chips,
        active_players: usize,
    ) -> Vec<ActionOption> {
        let mut options = Vec::new();
        let to_call = self.to_call(player, stack);
        if to_call == 0 {
            options.push(ActionOption::simple(ActionKind::Check));
            if stack > 0 && self.current_bet == 0 {
                options.push(ActionOption::chips(
                    ActionKind::Bet,
                    self.min_to(player, stack),
                    self.max_to(player, stack),
                ));
            }
        } else {
            options.push(ActionOption::simple(ActionKind::Fold));
            options.push(ActionOption::chips(ActionKind::Call, to_call, to_call));
        }
        // A player who already acted gets the turn back only after a short
        // all-in that did not reopen the action; they may not re-raise.
        if self.current_bet > 0
            && stack > to_call
            && !self.raise_capped(active_players)
            && !self.acted.contains(player)
        {
            let min = self.min_to(player, stack);
            let max = self.max_to(player, stack);
            if max > self.current_bet {
                options.push(ActionOption::chips(ActionKind::Raise, min, max));
            }
        }
        options
    }

    /// Validates and records one betting action, returning the chips to
    /// deduct from the player's stack. State is untouched on error.
    pub fn apply(
        &mut self,
        player: &PlayerId,
        kind: ActionKind,
        amount: Option<Chips>,
        stack: Chips,
        active_players: usize,
    ) -> Result<Chips, ActionError> {
        match kind {
            ActionKind::Fold => {
                self.folded.insert(player.clone());
                self.acted.insert(player.clone());
                Ok(0)
            }
            ActionKind::Check => {
                if self.to_call(player, stack) != 0 {
                    return Err(ActionError::ActionNotLegal);
                }
                self.acted.insert(player.clone());
                Ok(0)
            }
            ActionKind::Call => {
                let delta = self.to_call(player, stack);
                if delta == 0 {
                    return Err(ActionError::ActionNotLegal);
                }
                self.commit(player, delta, stack);
                self.acted.insert(player.clone());
                Ok(delta)
            }
            ActionKind::Bet => {
                if self.current_bet != 0 {
                    return Err(ActionError::ActionNotLegal);
                }
                let to = amount.ok_or(ActionError::AmountOutOfRange)?;
                let delta = to - self.round_bet(player);
                if delta > stack {
                    return Err(ActionError::InsufficientChips);
                }
                if to < self.min_to(player, stack) || to > self.max_to(player, stack) {
                    return Err(ActionError::AmountOutOfRange);
                }
                self.commit(player, delta, stack);
                self.current_bet = to;
                self.min_raise = to.max(self.street_bet);
                self.acted.clear();
                self.acted.insert(player.clone());
                Ok(delta)
            }
            ActionKind::Raise => {
                if self.current_bet == 0 || self.acted.contains(player) {
                    return Err(ActionError::ActionNotLegal);
                }
                if self.raise_capped(active_players) {
                    return Err(ActionError::ActionNotLegal);
                }
                let to = amount.ok_or(ActionError::AmountOutOfRange)?;
                let delta = to - self.round_bet(player);
                if delta > stack {
                    return Err(ActionError::InsufficientChips);
                }
                if to <= self.current_bet || to > self.max_to(player, stack) {
                    return Err(ActionError::AmountOutOfRange);
                }
                let completing = matches!(self.completion_to, Some(c) if self.current_bet < c);
                let increment = to - self.current_bet;
                let full_raise = if completing {
                    to >= self.completion_to.unwrap_or(0)
                } else {
                    increment >= self.min_raise
                };
                let is_all_in = delta == stack;
                if !full_raise && !is_all_in {
                    return Err(ActionError::AmountOutOfRange);
                }
                self.commit(player, delta, stack);
                self.current_bet = to;
                if full_raise {
                    // A full raise (or completion) reopens the action for
                    // everyone behind.
                    self.min_raise = if completing { self.street_bet } else { increment };
                    self.completion_to = None;
                    self.raises += 1;
                    self.acted.clear();
                }
                self.acted.insert(player.clone());
                Ok(delta)
            }
            _ => Err(ActionError::ActionNotLegal),
        }
    }

    fn commit(&mut self, player: &PlayerId, delta: Chips, stack: Chips) {
        *self.round_bets.entry(player.clone()).or_default() += delta;
        *self.contributions.entry(player.clone()).or_default() += delta;
        if delta == stack {
            self.all_in.insert(player.clone());
        }
    }

    /// A round ends when every live player has matched the current bet and
    /// acted since the last aggressive action.
    pub fn round_complete(&self, live_players: &[PlayerId]) -> bool {
        live_players.iter().all(|p| {
            self.acted.contains(p) && self.round_bet(p) == self.current_bet
        })
    }

    /// Closes the round: round bets are already in the contribution ledger,
    /// so this just resets the round state. Returns the pot total.
    pub fn close_round(&mut self) -> Chips {
        self.round_bets.clear();
        self.acted.clear();
        self.current_bet = 0;
        self.min_raise = 0;
        self.raises = 0;
        self.completion_to = None;
        self.pot_total()
    }

    /// Derives the pot layers from total contributions. Folded players'
    /// chips stay in the layers they reached but they are eligible for
    /// nothing. A layer with a single eligible player is an uncalled bet
    /// and is refunded by the award step.
    pub fn pots(&self) -> Vec<Pot> {
        let mut levels: Vec<Chips> = self
            .contributions
            .iter()
            .filter(|(p, &c)| c > 0 && !self.folded.contains(*p))
            .map(|(_, &c)| c)
            .collect();
        levels.sort_unstable();
        levels.dedup();

        let mut pots = Vec::new();
        let mut previous = 0;
        for &level in &levels {
            let mut amount = 0;
            let mut eligible = Vec::new();
            for (player, &contribution) in &self.contributions {
                amount += contribution.min(level) - contribution.min(previous);
                if contribution >= level && !self.folded.contains(player) {
                    eligible.push(player.clone());
                }
            }
            if amount > 0 {
                pots.push(Pot { amount, eligible });
            }
            previous = level;
        }

        // Chips above the highest non-folded level (an uncalled raise over
        // players who all folded) flow back to their owner.
        let residual: Chips = self
            .contributions
            .iter()
            .map(|(_, &c)| c - c.min(previous))
            .sum();
        if residual > 0 {
            if let Some((player, _)) = self
                .contributions
                .iter()
                .find(|(p, &c)| c > previous && !self.folded.contains(*p))
            {
                pots.push(Pot {
                    amount: residual,
                    eligible: vec![player.clone()],
                });
            }
        }

        pots
    }

    /// Splits one pot among winners, odd chips to the earliest winners in
    /// the given order (first clockwise from the button).
    pub fn split_award(amount: Chips, winners: &[PlayerId]) -> Vec<(PlayerId, Chips)> {
        if winners.is_empty() {
            return Vec::new();
        }
        let share = amount / winners.len() as Chips;
        let mut remainder = amount % winners.len() as Chips;
        winners
            .iter()
            .map(|w| {
                let extra = if remainder > 0 {
                    remainder -= 1;
                    1
                } else {
                    0
                };
                (w.clone(), share + extra)
            })
            .collect()
    }
}
