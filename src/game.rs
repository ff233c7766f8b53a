//! The hand state machine.
//!
//! A `Game` walks the rules document's gameplay step list with an integer
//! cursor. Steps that need no input (deals, forced bets, removals, die
//! rolls, showdowns) run to completion inside `advance`; steps that need a
//! player decision park the machine in `Betting` or `Drawing` with a
//! `current_player` until `player_action` supplies one. Grouped steps expand
//! into their sub-actions and run under a single cursor position.
//!
//! The engine is synchronous and singly owned: one call stack per hand, no
//! timers, no interior concurrency. Drivers serialize access. Rejected
//! player input is reported inside [`ActionResult`] with state untouched;
//! configuration and internal failures come back as [`EngineError`] and end
//! the hand.

use std::collections::{BTreeMap, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::actions::{
    ActionErrorKind, ActionKind, ActionOption, ActionResult, Event, ForcedBetKind, GamePhase,
    PlayerAction, PlayerId,
};
use crate::betting::{BettingManager, Stakes, StreetSize};
use crate::cards::{Card, Deck, HeldCard, RankOrder, Visibility};
use crate::errors::{ActionError, EngineError};
use crate::evaluator::exposed_rank;
use crate::rules::{
    BetType, BettingStructure, BranchState, BringInRule, CardColor, Chips, ChooseSpec, Chooser,
    DealCardSpec, DealLocation, DealSpec, Declaration, DeclareSpec, DiscardLocation, DiscardSpec,
    DrawSpec, ExposeSpec, ForcedBets, OrderRule, PassSpec, PositionRule, RemoveCriteria,
    RemoveSpec, ReplaceCommunitySpec, RollDieSpec, Rules, SeparateSpec, ShowdownKind, Step,
    StepAction, Trigger, WildCardRule,
};
use crate::showdown::{self, GameResult};
use crate::table::{Player, Table, BOARD, UNASSIGNED};

/// Why an action did not go through: rejected input (state untouched) or an
/// engine failure (fatal for the hand).
enum ActionFailure {
    Rejected(ActionError),
    Fatal(EngineError),
}

impl From<ActionError> for ActionFailure {
    fn from(err: ActionError) -> Self {
        ActionFailure::Rejected(err)
    }
}

impl From<EngineError> for ActionFailure {
    fn from(err: EngineError) -> Self {
        ActionFailure::Fatal(err)
    }
}

/// A card-action step the machine is waiting on.
#[derive(Debug, Clone)]
pub(crate) enum CardStep {
    Draw(DrawSpec),
    Discard(DiscardSpec),
    Expose(ExposeSpec),
    Pass(PassSpec),
    Separate(SeparateSpec),
}

/// What the machine is currently waiting for.
#[derive(Debug, Clone)]
pub(crate) enum Pending {
    Betting {
        next: PlayerId,
    },
    Cards {
        step: CardStep,
        queue: VecDeque<PlayerId>,
        /// Pass selections held until everyone has chosen.
        pass_moves: Vec<(PlayerId, PlayerId, Vec<Card>)>,
        /// Exposures deferred to step end when not immediate.
        deferred_expose: Vec<(PlayerId, Vec<Card>)>,
    },
    Declare {
        spec: DeclareSpec,
        remaining: VecDeque<PlayerId>,
    },
    Choose {
        spec: ChooseSpec,
        chooser: PlayerId,
    },
    Replace {
        spec: ReplaceCommunitySpec,
        queue: VecDeque<PlayerId>,
    },
}

pub struct Game {
    pub(crate) rules: Rules,
    pub(crate) structure: BettingStructure,
    auto_progress: bool,
    seed: u64,
    deck_seed: u64,
    hand_counter: u64,
    pub(crate) table: Table,
    pub(crate) betting: BettingManager,
    pub(crate) phase: GamePhase,
    cursor: usize,
    action_queue: VecDeque<StepAction>,
    pub(crate) current_step_name: String,
    pub(crate) pending: Option<Pending>,
    pub(crate) events: Vec<Event>,
    pub(crate) result: Option<GameResult>,
    /// Wildcard rules registered by deal steps, applied at evaluation.
    pub(crate) hand_wilds: Vec<WildCardRule>,
    /// Stored CHOOSE results keyed by the choose step's value name.
    pub(crate) choices: BTreeMap<String, String>,
    bb_seat: Option<usize>,
    bring_in_seat: Option<usize>,
    had_voluntary_round: bool,
    chips_at_start: Chips,
}

impl Game {
    pub fn new(
        rules: Rules,
        structure: BettingStructure,
        stakes: Stakes,
        seed: u64,
    ) -> Result<Self, EngineError> {
        if !rules.betting_structures.contains(&structure) {
            return Err(EngineError::Invariant(format!(
                "'{}' does not allow {structure} play",
                rules.game
            )));
        }
        let table = Table::new(
            rules.players.max,
            rules.deck.deck_type,
            rules.deck.jokers,
            seed,
        );
        Ok(Self {
            structure,
            auto_progress: true,
            seed,
            deck_seed: seed,
            hand_counter: 0,
            table,
            betting: BettingManager::new(structure, stakes),
            phase: GamePhase::Waiting,
            cursor: 0,
            action_queue: VecDeque::new(),
            current_step_name: String::new(),
            pending: None,
            events: Vec::new(),
            result: None,
            hand_wilds: Vec::new(),
            choices: BTreeMap::new(),
            bb_seat: None,
            bring_in_seat: None,
            had_voluntary_round: false,
            chips_at_start: 0,
            rules,
        })
    }

    pub fn set_auto_progress(&mut self, on: bool) {
        self.auto_progress = on;
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn state(&self) -> GamePhase {
        self.phase
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn add_player(
        &mut self,
        id: impl Into<PlayerId>,
        name: impl Into<String>,
        stack: Chips,
        seat: usize,
    ) -> Result<(), EngineError> {
        if !matches!(self.phase, GamePhase::Waiting | GamePhase::Complete) {
            return Err(EngineError::BadPhase("seating"));
        }
        self.table.add_player(id.into(), name.into(), stack, seat)
    }

    /// Removes a player, or records a leave intent when a hand is running:
    /// the player folds (immediately if it is their turn) and the seat is
    /// cleared at the hand boundary.
    pub fn remove_player(&mut self, id: &PlayerId) -> Result<(), EngineError> {
        if matches!(self.phase, GamePhase::Waiting | GamePhase::Complete) {
            self.table.remove_player(id)?;
            return Ok(());
        }
        if self.current_player().as_ref() == Some(id)
            && matches!(self.pending, Some(Pending::Betting { .. }))
        {
            self.player_action(id, ActionKind::Fold, PlayerAction::default())?;
        } else {
            self.deactivate(id)?;
        }
        if let Some(player) = self.table.player_mut(id) {
            player.leave_pending = true;
        }
        Ok(())
    }

    fn deactivate(&mut self, id: &PlayerId) -> Result<(), EngineError> {
        let player = self
            .table
            .player_mut(id)
            .ok_or_else(|| EngineError::NoSuchPlayer(id.clone()))?;
        player.is_active = false;
        // Their chips stay in the pot but they are no longer eligible.
        let _ = self.betting.apply(id, ActionKind::Fold, None, 0, 0);
        // Drop them from any queue they were waiting in.
        if let Some(pending) = &mut self.pending {
            match pending {
                Pending::Cards { queue, .. } | Pending::Replace { queue, .. } => {
                    queue.retain(|p| p != id);
                }
                Pending::Declare { remaining, .. } => remaining.retain(|p| p != id),
                _ => {}
            }
        }
        if self.finish_if_uncontested()? {
            return Ok(());
        }
        if let Some(Pending::Cards { queue, .. }) = &self.pending {
            if queue.is_empty() {
                self.finish_card_step()?;
            }
        }
        Ok(())
    }

    /// Starts a new hand. A stacked deck pins the card order for tests;
    /// otherwise the deck shuffles from the game seed and hand number.
    pub fn start_hand(&mut self, mock_deck: Option<Deck>) -> Result<(), EngineError> {
        if !matches!(self.phase, GamePhase::Waiting | GamePhase::Complete) {
            return Err(EngineError::BadPhase("start_hand"));
        }
        // Clear seats whose players left mid-hand.
        let leavers: Vec<PlayerId> = self
            .table
            .players()
            .filter(|p| p.leave_pending)
            .map(|p| p.id.clone())
            .collect();
        for id in leavers {
            self.table.remove_player(&id)?;
        }
        let funded = self.table.players().filter(|p| p.stack > 0).count();
        if funded < self.rules.players.min {
            return Err(EngineError::Invariant(format!(
                "need at least {} funded players, have {funded}",
                self.rules.players.min
            )));
        }

        self.deck_seed = self.seed.wrapping_add(self.hand_counter);
        if self.hand_counter > 0 {
            self.table.advance_button();
        } else if !self.table.seat_occupied(self.table.dealer_seat()) {
            // First hand: the button lands on the first occupied seat.
            self.table.advance_button();
        }
        self.hand_counter += 1;

        let deck = mock_deck.unwrap_or_else(|| {
            Deck::new(
                self.rules.deck.deck_type,
                self.rules.deck.jokers,
                self.deck_seed,
            )
        });
        self.table.replace_deck(deck);
        self.table.reset_for_hand();
        self.betting.begin_hand();
        self.events.clear();
        self.result = None;
        self.hand_wilds.clear();
        self.choices.clear();
        self.cursor = 0;
        self.action_queue.clear();
        self.pending = None;
        self.bb_seat = None;
        self.bring_in_seat = None;
        self.had_voluntary_round = false;
        self.chips_at_start = self.table.players().map(|p| p.stack).sum();
        self.phase = GamePhase::Dealing;
        self.events.push(Event::HandStarted {
            variant: self.rules.game.clone(),
            dealer_seat: self.table.dealer_seat(),
        });
        log::debug!(
            "hand {} of '{}' started, dealer seat {}",
            self.hand_counter,
            self.rules.game,
            self.table.dealer_seat()
        );
        self.advance()
    }

    /// Runs auto steps until input is required or the hand completes.
    pub fn advance(&mut self) -> Result<(), EngineError> {
        while self.pending.is_none() && self.phase != GamePhase::Complete {
            self.execute_next()?;
        }
        Ok(())
    }

    pub fn current_player(&self) -> Option<PlayerId> {
        match &self.pending {
            Some(Pending::Betting { next }) => Some(next.clone()),
            Some(Pending::Cards { queue, .. }) | Some(Pending::Replace { queue, .. }) => {
                queue.front().cloned()
            }
            Some(Pending::Declare { remaining, .. }) => remaining.front().cloned(),
            Some(Pending::Choose { chooser, .. }) => Some(chooser.clone()),
            None => None,
        }
    }

    pub fn valid_actions(&self, player: &PlayerId) -> Vec<ActionOption> {
        if self.current_player().as_ref() != Some(player) {
            return Vec::new();
        }
        let stack = self.table.player(player).map(|p| p.stack).unwrap_or(0);
        match &self.pending {
            Some(Pending::Betting { .. }) => {
                let active = self.table.active_ids().len();
                self.betting.legal_actions(player, stack, active)
            }
            Some(Pending::Cards { step, .. }) => card_step_options(step),
            Some(Pending::Declare { spec, .. }) => {
                let mut option = ActionOption::simple(ActionKind::Declare);
                option.values = spec
                    .options
                    .iter()
                    .map(|d| {
                        match d {
                            Declaration::High => "high",
                            Declaration::Low => "low",
                            Declaration::HighLow => "high_low",
                        }
                        .to_string()
                    })
                    .collect();
                vec![option]
            }
            Some(Pending::Choose { spec, .. }) => {
                let mut option = ActionOption::simple(ActionKind::Choose);
                option.values = spec.possible_values.clone();
                vec![option]
            }
            Some(Pending::Replace { spec, .. }) => vec![
                ActionOption::cards(ActionKind::ReplaceCommunity, 0, spec.cards_to_replace),
                ActionOption::simple(ActionKind::Skip),
            ],
            None => Vec::new(),
        }
    }

    /// Submits one player action. Rejected input comes back inside the
    /// `ActionResult` with state untouched; an `Err` is an engine failure.
    pub fn player_action(
        &mut self,
        player: &PlayerId,
        kind: ActionKind,
        action: PlayerAction,
    ) -> Result<ActionResult, EngineError> {
        let events_before = self.events.len();
        match self.apply_action(player, kind, action) {
            Ok(()) => Ok(ActionResult {
                ok: true,
                error: None,
                state: self.phase,
                events: self.events[events_before..].to_vec(),
            }),
            Err(ActionFailure::Rejected(err)) => Ok(ActionResult {
                ok: false,
                error: Some(ActionErrorKind::from(err)),
                state: self.phase,
                events: Vec::new(),
            }),
            Err(ActionFailure::Fatal(err)) => Err(err),
        }
    }

    fn apply_action(
        &mut self,
        player: &PlayerId,
        kind: ActionKind,
        action: PlayerAction,
    ) -> Result<(), ActionFailure> {
        if self.current_player().as_ref() != Some(player) {
            return Err(ActionError::NotYourTurn.into());
        }
        let pending = self.pending.clone().expect("current_player implies pending");
        match pending {
            Pending::Betting { .. } => self.apply_betting(player, kind, action.amount),
            Pending::Cards {
                step,
                queue,
                pass_moves,
                deferred_expose,
            } => self.apply_card_action(
                player,
                kind,
                action,
                step,
                queue,
                pass_moves,
                deferred_expose,
            ),
            Pending::Declare { spec, remaining } => {
                self.apply_declare(player, kind, action, spec, remaining)
            }
            Pending::Choose { spec, .. } => self.apply_choose(player, kind, action, spec),
            Pending::Replace { spec, queue } => {
                self.apply_replace(player, kind, action, spec, queue)
            }
        }
    }

    // -----------------------------------------------------------------
    // Step execution
    // -----------------------------------------------------------------

    fn execute_next(&mut self) -> Result<(), EngineError> {
        if let Some(action) = self.action_queue.pop_front() {
            return self.run_action(action);
        }
        let Some(step) = self.rules.game_play.get(self.cursor).cloned() else {
            // Running off the end is unreachable past the rules validator,
            // but never spin.
            self.phase = GamePhase::Complete;
            return Err(EngineError::Invariant(
                "gameplay ended without a final showdown".into(),
            ));
        };
        self.cursor += 1;
        if !self.step_should_run(&step)? {
            log::debug!("skipping step '{}'", step.name);
            return Ok(());
        }
        self.current_step_name = step.name.clone();
        match step.action {
            StepAction::Grouped(subs) => {
                for sub in subs {
                    self.action_queue.push_back(sub.action);
                }
            }
            action => self.action_queue.push_back(action),
        }
        Ok(())
    }

    fn step_should_run(&self, step: &Step) -> Result<bool, EngineError> {
        let Some(conditional) = &step.conditional_state else {
            return Ok(true);
        };
        let truth = self.eval_trigger(&conditional.trigger, None)?;
        let state = if truth {
            conditional.true_state
        } else {
            conditional.false_state
        };
        Ok(state == BranchState::Execute)
    }

    fn run_action(&mut self, action: StepAction) -> Result<(), EngineError> {
        match action {
            StepAction::Bet(spec) => self.run_bet(spec.bet_type),
            StepAction::Deal(spec) => self.run_deal(spec),
            StepAction::Draw(spec) => {
                self.open_card_step(CardStep::Draw(spec));
                Ok(())
            }
            StepAction::Discard(spec) => {
                self.open_card_step(CardStep::Discard(spec));
                Ok(())
            }
            StepAction::Expose(spec) => {
                self.open_card_step(CardStep::Expose(spec));
                Ok(())
            }
            StepAction::Pass(spec) => {
                self.open_card_step(CardStep::Pass(spec));
                Ok(())
            }
            StepAction::Separate(spec) => {
                self.open_card_step(CardStep::Separate(spec));
                Ok(())
            }
            StepAction::Declare(spec) => {
                let remaining: VecDeque<PlayerId> = self.table.active_ids().into();
                if remaining.is_empty() {
                    return Ok(());
                }
                self.phase = GamePhase::Drawing;
                self.pending = Some(Pending::Declare { spec, remaining });
                Ok(())
            }
            StepAction::Choose(spec) => {
                let chooser = match spec.chooser {
                    Chooser::Dealer => self.active_at_or_after(self.table.dealer_seat()),
                    Chooser::LeftOfDealer => {
                        self.active_at_or_after(self.table.next_seat(self.table.dealer_seat()))
                    }
                };
                let Some(chooser) = chooser else {
                    self.choices
                        .insert(spec.value.clone(), spec.default.clone());
                    return Ok(());
                };
                self.phase = GamePhase::Drawing;
                self.pending = Some(Pending::Choose { spec, chooser });
                Ok(())
            }
            StepAction::ReplaceCommunity(spec) => {
                let start = self.position_rule_seat(spec.starting_from);
                let queue: VecDeque<PlayerId> = self
                    .table
                    .players_from(start)
                    .into_iter()
                    .filter(|id| self.table.player(id).map_or(false, |p| p.is_active))
                    .collect();
                if queue.is_empty() || self.table.community.is_empty() {
                    return Ok(());
                }
                self.phase = GamePhase::Drawing;
                self.pending = Some(Pending::Replace { spec, queue });
                Ok(())
            }
            StepAction::Remove(spec) => self.run_remove(spec),
            StepAction::RollDie(spec) => self.run_roll_die(spec),
            StepAction::Showdown(spec) => self.run_showdown(spec.kind),
            StepAction::Grouped(subs) => {
                for sub in subs {
                    self.action_queue.push_back(sub.action);
                }
                Ok(())
            }
        }
    }

    fn run_bet(&mut self, bet_type: BetType) -> Result<(), EngineError> {
        match bet_type {
            BetType::Antes => self.post_antes(),
            BetType::Blinds => self.post_blinds(),
            BetType::BringIn => self.post_bring_in(),
            BetType::Small => self.open_betting_round(StreetSize::Small),
            BetType::Big => self.open_betting_round(StreetSize::Big),
        }
    }

    fn post_antes(&mut self) -> Result<(), EngineError> {
        let ante = self.betting.stakes().ante;
        if ante == 0 {
            return Ok(());
        }
        for id in self.table.active_ids() {
            let stack = self.table.player(&id).map(|p| p.stack).unwrap_or(0);
            let posted = self.betting.post_ante(&id, ante, stack);
            self.debit(&id, posted)?;
            self.events.push(Event::ForcedBet {
                player: id,
                kind: ForcedBetKind::Ante,
                amount: posted,
                all_in: posted == stack,
            });
        }
        Ok(())
    }

    fn post_blinds(&mut self) -> Result<(), EngineError> {
        let ForcedBets::Blinds { additional_blinds } = self.resolved_forced_bets() else {
            // Antes-only and bring-in games post nothing here.
            return Ok(());
        };
        let stakes = *self.betting.stakes();
        let actives = self.table.active_ids();
        if actives.len() < 2 {
            return Ok(());
        }
        // Heads-up, the dealer posts the small blind.
        let dealer_seat = self.table.dealer_seat();
        let sb = if actives.len() == 2 {
            self.active_at_or_after(dealer_seat)
        } else {
            self.active_after_seat(dealer_seat)
        }
        .ok_or_else(|| EngineError::Invariant("no small blind player".into()))?;
        let sb_seat = self.table.player(&sb).map(|p| p.seat).unwrap_or(dealer_seat);
        let bb = self
            .active_after_seat(sb_seat)
            .ok_or_else(|| EngineError::Invariant("no big blind player".into()))?;

        self.post_one_blind(&sb, stakes.small_blind, ForcedBetKind::SmallBlind)?;
        self.post_one_blind(&bb, stakes.big_blind, ForcedBetKind::BigBlind)?;
        self.bb_seat = self.table.player(&bb).map(|p| p.seat);

        let mut seat = self.bb_seat.unwrap_or(dealer_seat);
        for multiple in additional_blinds {
            let Some(next) = self.active_after_seat(seat) else {
                break;
            };
            seat = self.table.player(&next).map(|p| p.seat).unwrap_or(seat);
            self.post_one_blind(
                &next,
                stakes.big_blind * multiple,
                ForcedBetKind::AdditionalBlind,
            )?;
        }
        Ok(())
    }

    fn post_one_blind(
        &mut self,
        id: &PlayerId,
        amount: Chips,
        kind: ForcedBetKind,
    ) -> Result<(), EngineError> {
        let stack = self.table.player(id).map(|p| p.stack).unwrap_or(0);
        let posted = self.betting.post_blind(id, amount, stack);
        self.debit(id, posted)?;
        self.events.push(Event::ForcedBet {
            player: id.clone(),
            kind,
            amount: posted,
            all_in: posted == stack,
        });
        Ok(())
    }

    fn post_bring_in(&mut self) -> Result<(), EngineError> {
        let ForcedBets::BringIn { rule, .. } = self.resolved_forced_bets() else {
            return Ok(());
        };
        let Some(id) = self.bring_in_player(rule) else {
            return Err(EngineError::Invariant(
                "no exposed card to select the bring-in".into(),
            ));
        };
        let stack = self.table.player(&id).map(|p| p.stack).unwrap_or(0);
        let posted = self.betting.post_bring_in(&id, stack);
        self.debit(&id, posted)?;
        self.bring_in_seat = self.table.player(&id).map(|p| p.seat);
        self.events.push(Event::ForcedBet {
            player: id,
            kind: ForcedBetKind::BringIn,
            amount: posted,
            all_in: posted == stack,
        });
        Ok(())
    }

    /// Picks the bring-in by the configured up-card rule: card rank first,
    /// suit (clubs lowest) as the deterministic tiebreak.
    fn bring_in_player(&self, rule: BringInRule) -> Option<PlayerId> {
        let mut candidates: Vec<(PlayerId, (usize, u8))> = Vec::new();
        for id in self.table.active_ids() {
            let player = self.table.player(&id)?;
            let keys = player.hand.face_up_cards().into_iter().filter_map(|c| {
                RankOrder::STANDARD
                    .iter()
                    .position(|&r| r == c.rank)
                    .map(|pos| (pos, c.suit as u8))
            });
            let key = match rule {
                BringInRule::LowCard => keys.min(),
                BringInRule::HighCard | BringInRule::HighCardAhWild => keys.max(),
            };
            if let Some(key) = key {
                candidates.push((id, key));
            }
        }
        match rule {
            BringInRule::LowCard => candidates.into_iter().min_by_key(|(_, k)| *k),
            BringInRule::HighCard | BringInRule::HighCardAhWild => {
                candidates.into_iter().max_by_key(|(_, k)| *k)
            }
        }
        .map(|(id, _)| id)
    }

    fn open_betting_round(&mut self, size: StreetSize) -> Result<(), EngineError> {
        self.betting.begin_round(size);
        let order = if self.had_voluntary_round {
            self.rules.betting_order.subsequent.clone()
        } else {
            self.rules.betting_order.initial.clone()
        };
        self.had_voluntary_round = true;

        let live = self.table.live_ids();
        let owes = |id: &PlayerId| self.betting.round_bet(id) < self.betting.current_bet();
        if live.len() < 2 && !live.iter().any(owes) {
            // Nothing to decide: everyone else is all-in and nothing is owed.
            let total = self.betting.close_round();
            self.events.push(Event::RoundClosed { pot_total: total });
            return Ok(());
        }

        let position = self.resolve_order_rule(&order);
        let anchor = self.position_rule_seat(position);
        let first = match position {
            // The anchor player themselves leads these orders.
            PositionRule::Dealer | PositionRule::HighHand => self
                .betting_actor_at_or_after(anchor)
                .or_else(|| self.next_betting_actor(anchor)),
            _ => self.next_betting_actor(anchor),
        };
        match first {
            Some(next) => {
                self.phase = GamePhase::Betting;
                self.pending = Some(Pending::Betting { next });
            }
            None => {
                let total = self.betting.close_round();
                self.events.push(Event::RoundClosed { pot_total: total });
            }
        }
        Ok(())
    }

    fn resolve_order_rule(&self, rule: &OrderRule) -> PositionRule {
        match rule {
            OrderRule::Fixed(position) => *position,
            OrderRule::Conditional {
                value,
                cases,
                default,
            } => match self.choices.get(value) {
                Some(chosen) => cases.get(chosen).copied().unwrap_or(*default),
                None => *default,
            },
        }
    }

    /// Seat anchoring the given position rule.
    fn position_rule_seat(&self, rule: PositionRule) -> usize {
        let dealer = self.table.dealer_seat();
        match rule {
            PositionRule::Dealer | PositionRule::LeftOfDealer => dealer,
            PositionRule::AfterBigBlind => self.bb_seat.unwrap_or(dealer),
            PositionRule::BringIn => self.bring_in_seat.unwrap_or(dealer),
            PositionRule::HighHand => self
                .high_hand_seat()
                .unwrap_or_else(|| self.table.next_seat(dealer)),
        }
    }

    /// Seat of the best exposed partial hand, for stud street order.
    fn high_hand_seat(&self) -> Option<usize> {
        self.table
            .players()
            .filter(|p| p.is_active)
            .filter(|p| !p.hand.face_up_cards().is_empty())
            .max_by(|a, b| {
                exposed_rank(&a.hand.face_up_cards(), true)
                    .cmp(&exposed_rank(&b.hand.face_up_cards(), true))
                    // Lower seat wins ties, deterministically.
                    .then(b.seat.cmp(&a.seat))
            })
            .map(|p| p.seat)
    }

    fn active_at_or_after(&self, seat: usize) -> Option<PlayerId> {
        self.table
            .players_from(seat)
            .into_iter()
            .find(|id| self.table.player(id).map_or(false, |p| p.is_active))
    }

    fn active_after_seat(&self, seat: usize) -> Option<PlayerId> {
        self.active_at_or_after(self.table.next_seat(seat))
    }

    /// First player clockwise from `seat` (inclusive) still owing a
    /// betting decision.
    fn betting_actor_at_or_after(&self, seat: usize) -> Option<PlayerId> {
        self.table
            .players_from(seat)
            .into_iter()
            .find(|id| self.owes_action(id))
    }

    /// First player strictly after `seat` still owing a decision.
    fn next_betting_actor(&self, seat: usize) -> Option<PlayerId> {
        self.table
            .players_from(self.table.next_seat(seat))
            .into_iter()
            .find(|id| self.owes_action(id))
    }

    fn owes_action(&self, id: &PlayerId) -> bool {
        let Some(player) = self.table.player(id) else {
            return false;
        };
        player.is_active
            && !player.is_all_in
            && (!self.betting.has_acted(id)
                || self.betting.round_bet(id) < self.betting.current_bet())
    }

    fn run_deal(&mut self, spec: DealSpec) -> Result<(), EngineError> {
        self.phase = GamePhase::Dealing;
        for rule in &spec.wild_cards {
            self.hand_wilds.push(rule.clone());
        }
        for card_spec in &spec.cards {
            for rule in &card_spec.wild_cards {
                self.hand_wilds.push(rule.clone());
            }
            match spec.location {
                DealLocation::Player => self.deal_players(card_spec)?,
                DealLocation::Community => self.deal_to_board(card_spec)?,
            }
        }
        Ok(())
    }

    fn deal_players(&mut self, spec: &DealCardSpec) -> Result<(), EngineError> {
        let subset = spec.subset.clone().unwrap_or_else(|| UNASSIGNED.to_string());
        let order: Vec<PlayerId> = self
            .table
            .players_from(self.table.next_seat(self.table.dealer_seat()))
            .into_iter()
            .filter(|id| self.table.player(id).map_or(false, |p| p.is_active))
            .collect();
        // One card per player per pass, clockwise, as a live deal would go.
        for _ in 0..spec.number {
            for id in &order {
                let mut visibility = match &spec.conditional_state {
                    Some(conditional) => {
                        if self.eval_trigger(&conditional.trigger, Some(id))? {
                            conditional.true_state
                        } else {
                            conditional.false_state
                        }
                    }
                    None => spec.state,
                };
                if visibility == Visibility::FaceUp {
                    if let Some(option) = &spec.protection_option {
                        // The protection fee buys the card face down; it is
                        // an extra forced contribution to the pot.
                        let stack = self.table.player(id).map(|p| p.stack).unwrap_or(0);
                        if stack > 0 {
                            let posted = self.betting.post_fee(id, option.fee, stack);
                            self.debit(id, posted)?;
                            self.events.push(Event::ForcedBet {
                                player: id.clone(),
                                kind: ForcedBetKind::ProtectionFee,
                                amount: posted,
                                all_in: posted == stack,
                            });
                            visibility = Visibility::FaceDown;
                        }
                    }
                }
                let card = self.table.deal_to_player(id, &subset, visibility)?;
                self.events.push(Event::DealtHole {
                    player: id.clone(),
                    subset: subset.clone(),
                    count: 1,
                    face_up: if visibility == Visibility::FaceUp {
                        vec![card]
                    } else {
                        Vec::new()
                    },
                });
            }
        }
        Ok(())
    }

    fn deal_to_board(&mut self, spec: &DealCardSpec) -> Result<(), EngineError> {
        let region = spec.subset.clone().unwrap_or_else(|| BOARD.to_string());
        let visibility = match &spec.conditional_state {
            Some(conditional) => {
                if self.eval_trigger(&conditional.trigger, None)? {
                    conditional.true_state
                } else {
                    conditional.false_state
                }
            }
            None => spec.state,
        };
        let cards = self.table.deal_community(&region, spec.number, visibility)?;
        self.events.push(Event::DealtCommunity { region, cards });
        Ok(())
    }

    fn open_card_step(&mut self, step: CardStep) {
        let queue: VecDeque<PlayerId> = self
            .table
            .players_from(self.table.next_seat(self.table.dealer_seat()))
            .into_iter()
            .filter(|id| self.table.player(id).map_or(false, |p| p.is_active))
            .collect();
        if queue.is_empty() {
            return;
        }
        self.phase = GamePhase::Drawing;
        self.pending = Some(Pending::Cards {
            step,
            queue,
            pass_moves: Vec::new(),
            deferred_expose: Vec::new(),
        });
    }

    fn run_remove(&mut self, spec: RemoveSpec) -> Result<(), EngineError> {
        let mut keyed: Vec<(String, usize)> = Vec::new();
        for region in &spec.subsets {
            let Some(cards) = self.table.community.get(region) else {
                continue;
            };
            // The criterion reads the region's latest card (the river in
            // Oklahoma-style multi-board pruning).
            let Some(last) = cards.last() else {
                continue;
            };
            let strength = RankOrder::STANDARD
                .iter()
                .position(|&r| r == last.card.rank)
                .unwrap_or(0);
            keyed.push((region.clone(), strength));
        }
        if keyed.len() < 2 || keyed.iter().all(|(_, k)| *k == keyed[0].1) {
            // Fewer than two candidates, or all tied: nothing is removed.
            return Ok(());
        }
        let victim = match spec.criteria {
            RemoveCriteria::LowestCard => keyed.iter().min_by_key(|(_, k)| *k),
            RemoveCriteria::HighestCard => keyed.iter().max_by_key(|(_, k)| *k),
        }
        .map(|(region, _)| region.clone())
        .expect("keyed nonempty");
        self.table.remove_region(&victim);
        self.events.push(Event::RegionRemoved { region: victim });
        Ok(())
    }

    fn run_roll_die(&mut self, spec: RollDieSpec) -> Result<(), EngineError> {
        // Derived from the hand seed and step position so replays reproduce
        // the roll regardless of how many cards have been drawn.
        let mut rng = StdRng::seed_from_u64(self.deck_seed ^ (self.cursor as u64));
        let value = rng.gen_range(1..=6);
        self.table.scalars.insert(spec.subset.clone(), value);
        self.events.push(Event::DieRolled {
            subset: spec.subset,
            value,
        });
        Ok(())
    }

    fn run_showdown(&mut self, kind: ShowdownKind) -> Result<(), EngineError> {
        self.phase = GamePhase::Showdown;
        match kind {
            ShowdownKind::Intermediate => {
                // Reveal only; nothing is awarded yet.
                for id in self.table.active_ids() {
                    if let Some(player) = self.table.player_mut(&id) {
                        let cards: Vec<Card> = player.hand.cards().map(|h| h.card).collect();
                        for card in cards {
                            player.hand.set_visibility(card, Visibility::FaceUp);
                        }
                    }
                }
                Ok(())
            }
            ShowdownKind::Final => {
                showdown::run(self)?;
                self.assert_conservation()?;
                self.phase = GamePhase::Complete;
                self.events.push(Event::HandComplete);
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------
    // Action application
    // -----------------------------------------------------------------

    fn apply_betting(
        &mut self,
        player: &PlayerId,
        kind: ActionKind,
        amount: Option<Chips>,
    ) -> Result<(), ActionFailure> {
        let stack = self.table.player(player).map(|p| p.stack).unwrap_or(0);
        let active = self.table.active_ids().len();
        let delta = self.betting.apply(player, kind, amount, stack, active)?;
        {
            let entry = self.table.player_mut(player).expect("actor is seated");
            entry.stack -= delta;
            if entry.stack == 0 && kind != ActionKind::Fold {
                entry.is_all_in = true;
            }
            if kind == ActionKind::Fold {
                entry.is_active = false;
            }
        }
        self.events.push(Event::Acted {
            player: player.clone(),
            kind,
            amount: if delta > 0 { Some(delta) } else { None },
        });
        let seat = self.table.player(player).map(|p| p.seat).unwrap_or(0);
        self.after_betting_action(seat)?;
        Ok(())
    }

    fn after_betting_action(&mut self, actor_seat: usize) -> Result<(), EngineError> {
        if self.finish_if_uncontested()? {
            return Ok(());
        }
        let live = self.table.live_ids();
        if self.betting.round_complete(&live) {
            let total = self.betting.close_round();
            self.events.push(Event::RoundClosed { pot_total: total });
            self.pending = None;
            if self.auto_progress {
                self.advance()?;
            }
            return Ok(());
        }
        match self.next_betting_actor(actor_seat) {
            Some(next) => {
                self.pending = Some(Pending::Betting { next });
                Ok(())
            }
            None => {
                // Everyone left is all-in; the round is over.
                let total = self.betting.close_round();
                self.events.push(Event::RoundClosed { pot_total: total });
                self.pending = None;
                if self.auto_progress {
                    self.advance()?;
                }
                Ok(())
            }
        }
    }

    /// When one active player remains, the hand ends without a showdown and
    /// every pot goes to them.
    fn finish_if_uncontested(&mut self) -> Result<bool, EngineError> {
        let actives = self.table.active_ids();
        if actives.len() != 1 || self.phase == GamePhase::Complete {
            return Ok(false);
        }
        let survivor = actives[0].clone();
        self.betting.close_round();
        let pots = self.betting.pots();
        let mut total = 0;
        for (index, pot) in pots.iter().enumerate() {
            total += pot.amount;
            self.events.push(Event::PotAwarded {
                player: survivor.clone(),
                amount: pot.amount,
                pot_index: index,
                line: "uncontested".to_string(),
            });
        }
        if let Some(player) = self.table.player_mut(&survivor) {
            player.stack += total;
        }
        self.result = Some(GameResult::uncontested(&survivor, total));
        self.pending = None;
        self.assert_conservation()?;
        self.phase = GamePhase::Complete;
        self.events.push(Event::HandComplete);
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_card_action(
        &mut self,
        player: &PlayerId,
        kind: ActionKind,
        action: PlayerAction,
        step: CardStep,
        mut queue: VecDeque<PlayerId>,
        mut pass_moves: Vec<(PlayerId, PlayerId, Vec<Card>)>,
        mut deferred_expose: Vec<(PlayerId, Vec<Card>)>,
    ) -> Result<(), ActionFailure> {
        match &step {
            CardStep::Draw(spec) => self.do_draw(player, kind, &action, spec)?,
            CardStep::Discard(spec) => self.do_discard(player, kind, &action, spec)?,
            CardStep::Expose(spec) => {
                self.do_expose(player, kind, &action, spec, &mut deferred_expose)?
            }
            CardStep::Pass(spec) => self.do_pass(player, kind, &action, spec, &mut pass_moves)?,
            CardStep::Separate(spec) => self.do_separate(player, kind, &action, spec)?,
        }
        queue.pop_front();
        let done = queue.is_empty();
        self.pending = Some(Pending::Cards {
            step,
            queue,
            pass_moves,
            deferred_expose,
        });
        if done {
            self.finish_card_step()?;
        }
        Ok(())
    }

    fn finish_card_step(&mut self) -> Result<(), EngineError> {
        let Some(Pending::Cards {
            pass_moves,
            deferred_expose,
            ..
        }) = self.pending.take()
        else {
            return Ok(());
        };
        for (from, to, cards) in pass_moves {
            self.table.pass_cards(&from, &to, &cards)?;
            self.events.push(Event::Passed {
                from,
                to,
                count: cards.len(),
            });
        }
        for (player, cards) in deferred_expose {
            self.table.expose(&player, &cards)?;
            self.events.push(Event::Exposed { player, cards });
        }
        if self.auto_progress {
            self.advance()?;
        }
        Ok(())
    }

    fn do_draw(
        &mut self,
        player: &PlayerId,
        kind: ActionKind,
        action: &PlayerAction,
        spec: &DrawSpec,
    ) -> Result<(), ActionFailure> {
        let min_total: usize = spec.cards.iter().map(|c| c.min_number.unwrap_or(0)).sum();
        if kind == ActionKind::StandPat {
            if min_total > 0 {
                return Err(ActionError::IllegalCardSelection.into());
            }
            self.events.push(Event::Drew {
                player: player.clone(),
                discarded: 0,
                drawn: 0,
            });
            return Ok(());
        }
        if kind != ActionKind::Draw {
            return Err(ActionError::ActionNotLegal.into());
        }
        let groups = self.group_cards_for_specs(
            player,
            &action.cards,
            spec.cards
                .iter()
                .map(|c| (c.hole_subset.clone(), c.min_number.unwrap_or(0), c.number)),
        )?;
        let count = action.cards.len();
        for (entry, cards) in spec.cards.iter().zip(groups) {
            if cards.is_empty() {
                continue;
            }
            let subset = entry
                .hole_subset
                .clone()
                .unwrap_or_else(|| UNASSIGNED.to_string());
            self.table
                .draw_replace(player, &cards, &subset, entry.state, entry.preserve_state)?;
        }
        self.events.push(Event::Drew {
            player: player.clone(),
            discarded: count,
            drawn: count,
        });
        Ok(())
    }

    fn do_discard(
        &mut self,
        player: &PlayerId,
        kind: ActionKind,
        action: &PlayerAction,
        spec: &DiscardSpec,
    ) -> Result<(), ActionFailure> {
        if kind != ActionKind::Discard {
            return Err(ActionError::ActionNotLegal.into());
        }
        // entire_subset discards the whole named subset, whatever the
        // submitted card list says.
        for entry in &spec.cards {
            if entry.entire_subset {
                let subset = entry
                    .hole_subset
                    .clone()
                    .unwrap_or_else(|| UNASSIGNED.to_string());
                let cards: Vec<Card> = self
                    .table
                    .player(player)
                    .map(|p| p.hand.subset(&subset).iter().map(|h| h.card).collect())
                    .unwrap_or_default();
                let region = match entry.discard_location {
                    DiscardLocation::Muck => None,
                    DiscardLocation::Community => entry.discard_subset.as_deref(),
                };
                self.table.discard(player, &cards, region)?;
                self.events.push(Event::Discarded {
                    player: player.clone(),
                    count: cards.len(),
                });
                return Ok(());
            }
        }
        let groups = self.group_cards_for_specs(
            player,
            &action.cards,
            spec.cards.iter().map(|c| {
                (
                    c.hole_subset.clone(),
                    c.min_number.unwrap_or(c.number),
                    c.number,
                )
            }),
        )?;
        for (entry, cards) in spec.cards.iter().zip(groups) {
            if cards.is_empty() {
                continue;
            }
            let region = match entry.discard_location {
                DiscardLocation::Muck => None,
                DiscardLocation::Community => entry.discard_subset.as_deref(),
            };
            self.table.discard(player, &cards, region)?;
        }
        self.events.push(Event::Discarded {
            player: player.clone(),
            count: action.cards.len(),
        });
        Ok(())
    }

    fn do_expose(
        &mut self,
        player: &PlayerId,
        kind: ActionKind,
        action: &PlayerAction,
        spec: &ExposeSpec,
        deferred: &mut Vec<(PlayerId, Vec<Card>)>,
    ) -> Result<(), ActionFailure> {
        if kind != ActionKind::Expose {
            return Err(ActionError::ActionNotLegal.into());
        }
        let entry = spec
            .cards
            .first()
            .ok_or(ActionError::ActionNotLegal)?;
        let min = entry.min_number.unwrap_or(entry.number);
        if action.cards.len() < min || action.cards.len() > entry.number {
            return Err(ActionError::IllegalCardSelection.into());
        }
        {
            let hand = &self
                .table
                .player(player)
                .ok_or(ActionError::NotYourTurn)?
                .hand;
            for card in &action.cards {
                let held = hand
                    .cards()
                    .find(|h| h.card == *card)
                    .ok_or(ActionError::IllegalCardSelection)?;
                let required = entry.state.unwrap_or(Visibility::FaceDown);
                if held.visibility != required {
                    return Err(ActionError::IllegalCardSelection.into());
                }
            }
        }
        if entry.immediate {
            self.table.expose(player, &action.cards)?;
            self.events.push(Event::Exposed {
                player: player.clone(),
                cards: action.cards.clone(),
            });
        } else {
            deferred.push((player.clone(), action.cards.clone()));
        }
        Ok(())
    }

    fn do_pass(
        &mut self,
        player: &PlayerId,
        kind: ActionKind,
        action: &PlayerAction,
        spec: &PassSpec,
        moves: &mut Vec<(PlayerId, PlayerId, Vec<Card>)>,
    ) -> Result<(), ActionFailure> {
        if kind != ActionKind::Pass {
            return Err(ActionError::ActionNotLegal.into());
        }
        if action.cards.len() != spec.count {
            return Err(ActionError::IllegalCardSelection.into());
        }
        let seat = self
            .table
            .player(player)
            .ok_or(ActionError::NotYourTurn)?
            .seat;
        let hand = &self.table.player(player).expect("seated").hand;
        for card in &action.cards {
            if !hand.contains(*card) {
                return Err(ActionError::IllegalCardSelection.into());
            }
        }
        let target = self
            .table
            .pass_target(seat, spec.direction)
            .ok_or(ActionError::ActionNotLegal)?;
        moves.push((player.clone(), target, action.cards.clone()));
        Ok(())
    }

    fn do_separate(
        &mut self,
        player: &PlayerId,
        kind: ActionKind,
        action: &PlayerAction,
        spec: &SeparateSpec,
    ) -> Result<(), ActionFailure> {
        if kind != ActionKind::Separate {
            return Err(ActionError::ActionNotLegal.into());
        }
        let expected: usize = spec.cards.iter().map(|t| t.number).sum();
        if action.cards.len() != expected {
            return Err(ActionError::IllegalCardSelection.into());
        }
        {
            let hand = &self
                .table
                .player(player)
                .ok_or(ActionError::NotYourTurn)?
                .hand;
            for card in &action.cards {
                if !hand.contains(*card) {
                    return Err(ActionError::IllegalCardSelection.into());
                }
            }
        }
        // Cards arrive in target order: the first target's count, then the
        // next. Apply, then verify the visibility floors.
        let player_mut = self.table.player_mut(player).expect("seated");
        let mut offset = 0;
        for target in &spec.cards {
            for card in &action.cards[offset..offset + target.number] {
                player_mut
                    .hand
                    .reassign(*card, &target.hole_subset)
                    .map_err(|_| ActionError::IllegalCardSelection)?;
            }
            offset += target.number;
        }
        for requirement in &spec.visibility_requirements {
            let down = player_mut.hand.face_down_count(&requirement.hole_subset);
            if down < requirement.min_face_down {
                return Err(ActionError::IllegalCardSelection.into());
            }
        }
        self.events.push(Event::Separated {
            player: player.clone(),
        });
        Ok(())
    }

    fn apply_declare(
        &mut self,
        player: &PlayerId,
        kind: ActionKind,
        action: PlayerAction,
        spec: DeclareSpec,
        mut remaining: VecDeque<PlayerId>,
    ) -> Result<(), ActionFailure> {
        if kind != ActionKind::Declare {
            return Err(ActionError::ActionNotLegal.into());
        }
        let declaration = action.declaration.ok_or(ActionError::NoDeclaration)?;
        if !spec.options.contains(&declaration) {
            return Err(ActionError::AmbiguousDeclaration.into());
        }
        self.table
            .player_mut(player)
            .ok_or(ActionError::NotYourTurn)?
            .declaration = Some(declaration);
        self.events.push(Event::Declared {
            player: player.clone(),
        });
        remaining.retain(|p| p != player);
        if remaining.is_empty() {
            let declarations: Vec<(PlayerId, Declaration)> = self
                .table
                .players()
                .filter(|p| p.is_active)
                .filter_map(|p| p.declaration.map(|d| (p.id.clone(), d)))
                .collect();
            self.events.push(Event::DeclarationsRevealed { declarations });
            self.pending = None;
            if self.auto_progress {
                self.advance()?;
            }
        } else {
            self.pending = Some(Pending::Declare { spec, remaining });
        }
        Ok(())
    }

    fn apply_choose(
        &mut self,
        player: &PlayerId,
        kind: ActionKind,
        action: PlayerAction,
        spec: ChooseSpec,
    ) -> Result<(), ActionFailure> {
        if kind != ActionKind::Choose {
            return Err(ActionError::ActionNotLegal.into());
        }
        let choice = action.choice.ok_or(ActionError::ActionNotLegal)?;
        if !spec.possible_values.contains(&choice) {
            return Err(ActionError::ActionNotLegal.into());
        }
        self.choices.insert(spec.value.clone(), choice.clone());
        if let Some(entry) = self.table.player_mut(player) {
            entry.game_choices.insert(spec.value.clone(), choice.clone());
        }
        self.events.push(Event::Chose {
            player: player.clone(),
            key: spec.value.clone(),
            value: choice,
        });
        self.pending = None;
        if self.auto_progress {
            self.advance()?;
        }
        Ok(())
    }

    fn apply_replace(
        &mut self,
        player: &PlayerId,
        kind: ActionKind,
        action: PlayerAction,
        spec: ReplaceCommunitySpec,
        mut queue: VecDeque<PlayerId>,
    ) -> Result<(), ActionFailure> {
        match kind {
            ActionKind::Skip => {}
            ActionKind::ReplaceCommunity => {
                if action.cards.len() > spec.cards_to_replace {
                    return Err(ActionError::IllegalCardSelection.into());
                }
                for card in &action.cards {
                    if !self
                        .table
                        .community
                        .values()
                        .any(|cards| cards.iter().any(|h| h.card == *card))
                    {
                        return Err(ActionError::IllegalCardSelection.into());
                    }
                }
                for card in &action.cards {
                    self.replace_one_community(*card)?;
                }
                self.events.push(Event::CommunityReplaced {
                    player: player.clone(),
                    count: action.cards.len(),
                });
            }
            _ => return Err(ActionError::ActionNotLegal.into()),
        }
        queue.pop_front();
        if queue.is_empty() {
            self.pending = None;
            if self.auto_progress {
                self.advance()?;
            }
        } else {
            self.pending = Some(Pending::Replace { spec, queue });
        }
        Ok(())
    }

    fn replace_one_community(&mut self, card: Card) -> Result<(), EngineError> {
        let region = self
            .table
            .community
            .iter()
            .find(|(_, cards)| cards.iter().any(|h| h.card == card))
            .map(|(name, _)| name.clone())
            .ok_or_else(|| EngineError::Invariant(format!("{card} is not on the board")))?;
        let cards = self.table.community.get_mut(&region).expect("found above");
        let pos = cards
            .iter()
            .position(|h| h.card == card)
            .expect("found above");
        let visibility = cards[pos].visibility;
        cards.remove(pos);
        self.table.deck_mut().push_back(card);
        let fresh = self.table.deck_mut().draw_one()?;
        self.table
            .community
            .get_mut(&region)
            .expect("region exists")
            .push(HeldCard::new(fresh, visibility));
        Ok(())
    }

    // -----------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------

    /// Splits submitted cards across per-subset specs and validates the
    /// counts. Specs without a subset match cards from any subset.
    fn group_cards_for_specs(
        &self,
        player: &PlayerId,
        cards: &[Card],
        specs: impl Iterator<Item = (Option<String>, usize, usize)>,
    ) -> Result<Vec<Vec<Card>>, ActionError> {
        let hand = &self
            .table
            .player(player)
            .ok_or(ActionError::NotYourTurn)?
            .hand;
        let specs: Vec<(Option<String>, usize, usize)> = specs.collect();
        let mut groups: Vec<Vec<Card>> = vec![Vec::new(); specs.len()];
        for &card in cards {
            let subset = hand
                .subset_of(card)
                .ok_or(ActionError::IllegalCardSelection)?;
            let slot = specs
                .iter()
                .position(|(wanted, _, _)| wanted.as_deref().map_or(true, |name| name == subset))
                .ok_or(ActionError::IllegalCardSelection)?;
            groups[slot].push(card);
        }
        for ((_, min, max), group) in specs.iter().zip(&groups) {
            if group.len() < *min || group.len() > *max {
                return Err(ActionError::IllegalCardSelection);
            }
        }
        Ok(groups)
    }

    fn debit(&mut self, id: &PlayerId, amount: Chips) -> Result<(), EngineError> {
        let player = self
            .table
            .player_mut(id)
            .ok_or_else(|| EngineError::NoSuchPlayer(id.clone()))?;
        player.stack -= amount;
        if player.stack == 0 {
            player.is_all_in = true;
        }
        Ok(())
    }

    /// Forced-bet configuration after resolving any CHOOSE condition.
    pub(crate) fn resolved_forced_bets(&self) -> ForcedBets {
        let mut current = &self.rules.forced_bets;
        loop {
            match current {
                ForcedBets::Conditional {
                    value,
                    cases,
                    default,
                } => {
                    current = match self.choices.get(value) {
                        Some(chosen) => cases.get(chosen).map(|b| b.as_ref()).unwrap_or(default),
                        None => default,
                    };
                }
                other => return other.clone(),
            }
        }
    }

    /// Evaluates a conditional-state trigger, optionally for one player.
    pub(crate) fn eval_trigger(
        &self,
        trigger: &Trigger,
        player: Option<&PlayerId>,
    ) -> Result<bool, EngineError> {
        match trigger {
            Trigger::PlayerChoice { value, matches } => {
                Ok(self.choices.get(value).map(String::as_str) == Some(matches.as_str()))
            }
            Trigger::BoardComposition {
                subset,
                color,
                suit,
                rank,
                min_count,
            } => {
                let cards = self
                    .table
                    .community
                    .get(subset)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                let matching = cards
                    .iter()
                    .filter(|h| {
                        color.map_or(true, |c| (c == CardColor::Red) == h.card.suit.is_red())
                            && suit.map_or(true, |s| h.card.suit == s)
                            && rank.map_or(true, |r| h.card.rank == r)
                    })
                    .count();
                Ok(matching >= *min_count)
            }
            Trigger::CommunityCardValue { subset, equals } => {
                Ok(self.table.scalars.get(subset) == Some(equals))
            }
            Trigger::PlayerHandSize { equals } => {
                let id = player.ok_or_else(|| {
                    EngineError::BadCondition("player_hand_size needs a player context".into())
                })?;
                Ok(self.table.player(id).map(|p| p.hand.len()) == Some(*equals))
            }
            Trigger::AllExposed {} => {
                Ok(self.exposure(player, |up, total| up == total && total > 0))
            }
            Trigger::AnyExposed {} => Ok(self.exposure(player, |up, _| up > 0)),
            Trigger::NoneExposed {} => Ok(self.exposure(player, |up, _| up == 0)),
        }
    }

    /// Exposure predicate over one player's cards, or over every active
    /// player when no player is in context.
    fn exposure(&self, player: Option<&PlayerId>, pred: impl Fn(usize, usize) -> bool) -> bool {
        let count = |p: &Player| (p.hand.face_up_cards().len(), p.hand.len());
        match player {
            Some(id) => self
                .table
                .player(id)
                .map(|p| {
                    let (up, total) = count(p);
                    pred(up, total)
                })
                .unwrap_or(false),
            None => self.table.players().filter(|p| p.is_active).all(|p| {
                let (up, total) = count(p);
                pred(up, total)
            }),
        }
    }

    pub(crate) fn assert_conservation(&self) -> Result<(), EngineError> {
        let found: Chips = self.table.players().map(|p| p.stack).sum();
        if found != self.chips_at_start {
            return Err(EngineError::ChipLeak {
                expected: self.chips_at_start,
                found,
            });
        }
        Ok(())
    }

    /// Clockwise-from-the-button ordering used for odd-chip placement.
    pub(crate) fn award_order(&self) -> Vec<PlayerId> {
        self.table
            .players_from(self.table.next_seat(self.table.dealer_seat()))
    }
}

fn card_step_options(step: &CardStep) -> Vec<ActionOption> {
    match step {
        CardStep::Draw(spec) => {
            let min: usize = spec.cards.iter().map(|c| c.min_number.unwrap_or(0)).sum();
            let max: usize = spec.cards.iter().map(|c| c.number).sum();
            let mut options = vec![ActionOption::cards(ActionKind::Draw, min, max)];
            if min == 0 {
                options.push(ActionOption::simple(ActionKind::StandPat));
            }
            options
        }
        CardStep::Discard(spec) => {
            let min: usize = spec
                .cards
                .iter()
                .map(|c| c.min_number.unwrap_or(c.number))
                .sum();
            let max: usize = spec.cards.iter().map(|c| c.number).sum();
            vec![ActionOption::cards(ActionKind::Discard, min, max)]
        }
        CardStep::Expose(spec) => {
            let min: usize = spec
                .cards
                .iter()
                .map(|c| c.min_number.unwrap_or(c.number))
                .sum();
            let max: usize = spec.cards.iter().map(|c| c.number).sum();
            vec![ActionOption::cards(ActionKind::Expose, min, max)]
        }
        CardStep::Pass(spec) => {
            vec![ActionOption::cards(ActionKind::Pass, spec.count, spec.count)]
        }
        CardStep::Separate(spec) => {
            let total: usize = spec.cards.iter().map(|t| t.number).sum();
            vec![ActionOption::cards(ActionKind::Separate, total, total)]
        }
    }
}
