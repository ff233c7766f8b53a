//! Seats, the button, community regions, and card movement.
//!
//! The table owns the deck and every card that has left it. All primitives
//! here move cards without interpreting the rules document; the game state
//! machine decides *when* to call them and with what arguments.

use std::collections::BTreeMap;

use crate::actions::PlayerId;
use crate::cards::{Card, Deck, DeckType, HeldCard, Visibility};
use crate::errors::EngineError;
use crate::rules::{Chips, Declaration, PassDirection};

/// Default hole subset name for cards dealt without an explicit subset.
pub const UNASSIGNED: &str = "unassigned";
/// Default community region name.
pub const BOARD: &str = "Board";

/// A player's cards, partitioned into named subsets.
#[derive(Debug, Clone, Default)]
pub struct PlayerHand {
    subsets: BTreeMap<String, Vec<HeldCard>>,
}

impl PlayerHand {
    pub fn add(&mut self, subset: &str, card: HeldCard) {
        self.subsets.entry(subset.to_string()).or_default().push(card);
    }

    pub fn subsets(&self) -> &BTreeMap<String, Vec<HeldCard>> {
        &self.subsets
    }

    pub fn subset(&self, name: &str) -> &[HeldCard] {
        self.subsets.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cards(&self) -> impl Iterator<Item = &HeldCard> {
        self.subsets.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.subsets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, card: Card) -> bool {
        self.cards().any(|h| h.card == card)
    }

    /// Which subset a card currently sits in.
    pub fn subset_of(&self, card: Card) -> Option<&str> {
        self.subsets
            .iter()
            .find(|(_, cards)| cards.iter().any(|h| h.card == card))
            .map(|(name, _)| name.as_str())
    }

    /// Removes a card from whatever subset holds it.
    pub fn take(&mut self, card: Card) -> Option<HeldCard> {
        for cards in self.subsets.values_mut() {
            if let Some(pos) = cards.iter().position(|h| h.card == card) {
                return Some(cards.remove(pos));
            }
        }
        None
    }

    /// Moves a card into another subset, keeping its table state.
    pub fn reassign(&mut self, card: Card, subset: &str) -> Result<(), EngineError> {
        let held = self
            .take(card)
            .ok_or_else(|| EngineError::Invariant(format!("player does not hold {card}")))?;
        self.add(subset, held);
        Ok(())
    }

    pub fn set_visibility(&mut self, card: Card, visibility: Visibility) -> bool {
        for cards in self.subsets.values_mut() {
            for held in cards.iter_mut() {
                if held.card == card {
                    held.visibility = visibility;
                    return true;
                }
            }
        }
        false
    }

    pub fn face_up_cards(&self) -> Vec<Card> {
        self.cards()
            .filter(|h| h.is_face_up())
            .map(|h| h.card)
            .collect()
    }

    pub fn face_down_count(&self, subset: &str) -> usize {
        self.subset(subset)
            .iter()
            .filter(|h| !h.is_face_up())
            .count()
    }

    pub fn clear(&mut self) {
        self.subsets.clear();
    }
}

/// A seated player.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub stack: Chips,
    pub seat: usize,
    /// Still contesting the current hand.
    pub is_active: bool,
    pub is_all_in: bool,
    pub hand: PlayerHand,
    pub declaration: Option<Declaration>,
    pub classification: Option<String>,
    pub game_choices: BTreeMap<String, String>,
    /// Seconds of extra decision time the driver may grant.
    pub time_bank: u32,
    /// Asked to leave mid-hand; folded and cleared at the hand boundary.
    pub leave_pending: bool,
}

impl Player {
    fn new(id: PlayerId, name: String, stack: Chips, seat: usize) -> Self {
        Self {
            id,
            name,
            stack,
            seat,
            is_active: false,
            is_all_in: false,
            hand: PlayerHand::default(),
            declaration: None,
            classification: None,
            game_choices: BTreeMap::new(),
            time_bank: 0,
            leave_pending: false,
        }
    }
}

/// The table: fixed seats, a dealer button, the deck, community regions.
#[derive(Debug)]
pub struct Table {
    seats: Vec<Option<Player>>,
    dealer: usize,
    pub community: BTreeMap<String, Vec<HeldCard>>,
    /// Scalar community values such as die rolls, keyed by region name.
    pub scalars: BTreeMap<String, i64>,
    deck: Deck,
}

impl Table {
    pub fn new(seat_count: usize, deck_type: DeckType, jokers: usize, seed: u64) -> Self {
        Self {
            seats: (0..seat_count).map(|_| None).collect(),
            dealer: 0,
            community: BTreeMap::new(),
            scalars: BTreeMap::new(),
            deck: Deck::new(deck_type, jokers, seed),
        }
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn deck_mut(&mut self) -> &mut Deck {
        &mut self.deck
    }

    pub fn replace_deck(&mut self, deck: Deck) {
        self.deck = deck;
    }

    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    pub fn dealer_seat(&self) -> usize {
        self.dealer
    }

    pub fn add_player(
        &mut self,
        id: PlayerId,
        name: String,
        stack: Chips,
        seat: usize,
    ) -> Result<(), EngineError> {
        if seat >= self.seats.len() {
            return Err(EngineError::NoSuchSeat(seat));
        }
        if self.seats[seat].is_some() {
            return Err(EngineError::SeatOccupied(seat));
        }
        self.seats[seat] = Some(Player::new(id, name, stack, seat));
        Ok(())
    }

    pub fn remove_player(&mut self, id: &PlayerId) -> Result<Player, EngineError> {
        let seat = self
            .seat_of(id)
            .ok_or_else(|| EngineError::NoSuchPlayer(id.clone()))?;
        Ok(self.seats[seat].take().expect("seat checked occupied"))
    }

    pub fn seat_occupied(&self, seat: usize) -> bool {
        self.seats.get(seat).map_or(false, Option::is_some)
    }

    pub fn seat_of(&self, id: &PlayerId) -> Option<usize> {
        self.seats
            .iter()
            .position(|s| s.as_ref().map_or(false, |p| &p.id == id))
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.seats
            .iter()
            .filter_map(|s| s.as_ref())
            .find(|p| &p.id == id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.seats
            .iter_mut()
            .filter_map(|s| s.as_mut())
            .find(|p| &p.id == id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.seats.iter().filter_map(|s| s.as_ref())
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.seats.iter_mut().filter_map(|s| s.as_mut())
    }

    pub fn player_count(&self) -> usize {
        self.players().count()
    }

    pub fn active_ids(&self) -> Vec<PlayerId> {
        self.players_from(self.next_seat(self.dealer))
            .into_iter()
            .filter(|id| self.player(id).map_or(false, |p| p.is_active))
            .collect()
    }

    /// Active and not all-in: the players who can still put chips in.
    pub fn live_ids(&self) -> Vec<PlayerId> {
        self.players_from(self.next_seat(self.dealer))
            .into_iter()
            .filter(|id| {
                self.player(id)
                    .map_or(false, |p| p.is_active && !p.is_all_in)
            })
            .collect()
    }

    /// Next occupied seat clockwise after `seat`.
    pub fn next_seat(&self, seat: usize) -> usize {
        let n = self.seats.len();
        (1..=n)
            .map(|step| (seat + step) % n)
            .find(|&s| self.seats[s].is_some())
            .unwrap_or(seat)
    }

    /// Next seat clockwise after `seat` whose player satisfies `pred`.
    pub fn next_seat_where(&self, seat: usize, pred: impl Fn(&Player) -> bool) -> Option<usize> {
        let n = self.seats.len();
        (1..=n)
            .map(|step| (seat + step) % n)
            .find(|&s| self.seats[s].as_ref().map_or(false, &pred))
    }

    /// All player ids in clockwise seat order starting at `seat`.
    pub fn players_from(&self, seat: usize) -> Vec<PlayerId> {
        let n = self.seats.len();
        (0..n)
            .map(|step| (seat + step) % n)
            .filter_map(|s| self.seats[s].as_ref().map(|p| p.id.clone()))
            .collect()
    }

    /// Moves the button to the next occupied seat.
    pub fn advance_button(&mut self) {
        self.dealer = self.next_seat(self.dealer);
    }

    /// Resets per-hand state: hands cleared, players with chips activated,
    /// regions emptied. The deck must already have been replaced.
    pub fn reset_for_hand(&mut self) {
        self.community.clear();
        self.scalars.clear();
        for player in self.players_mut() {
            player.hand.clear();
            player.is_active = player.stack > 0;
            player.is_all_in = false;
            player.declaration = None;
            player.classification = None;
            player.game_choices.clear();
        }
    }

    pub fn deal_to_player(
        &mut self,
        id: &PlayerId,
        subset: &str,
        visibility: Visibility,
    ) -> Result<Card, EngineError> {
        let card = self.deck.draw_one()?;
        let player = self
            .player_mut(id)
            .ok_or_else(|| EngineError::NoSuchPlayer(id.clone()))?;
        player.hand.add(subset, HeldCard::new(card, visibility));
        Ok(card)
    }

    pub fn deal_community(
        &mut self,
        region: &str,
        count: usize,
        visibility: Visibility,
    ) -> Result<Vec<Card>, EngineError> {
        let cards = self.deck.draw(count)?;
        let slot = self.community.entry(region.to_string()).or_default();
        slot.extend(cards.iter().map(|&c| HeldCard::new(c, visibility)));
        Ok(cards)
    }

    /// Replaces `discards` in a player's hand with fresh cards. Replacement
    /// visibility either follows the configured `state` or, with
    /// `preserve_state`, the card it replaces. Discards go under the deck.
    pub fn draw_replace(
        &mut self,
        id: &PlayerId,
        discards: &[Card],
        subset: &str,
        visibility: Option<Visibility>,
        preserve_state: bool,
    ) -> Result<Vec<Card>, EngineError> {
        let mut states = Vec::with_capacity(discards.len());
        {
            let player = self
                .player_mut(id)
                .ok_or_else(|| EngineError::NoSuchPlayer(id.clone()))?;
            for &card in discards {
                let held = player.hand.take(card).ok_or_else(|| {
                    EngineError::Invariant(format!("player does not hold {card}"))
                })?;
                states.push(held.visibility);
            }
        }
        for &card in discards {
            self.deck.push_back(card);
        }
        let mut drawn = Vec::with_capacity(discards.len());
        for old_state in states {
            let card = self.deck.draw_one()?;
            let state = if preserve_state {
                old_state
            } else {
                visibility.unwrap_or(Visibility::FaceDown)
            };
            let player = self.player_mut(id).expect("player present above");
            player.hand.add(subset, HeldCard::new(card, state));
            drawn.push(card);
        }
        Ok(drawn)
    }

    /// Removes cards from a hand without replacement. They go under the
    /// deck unless a community region is named to receive them.
    pub fn discard(
        &mut self,
        id: &PlayerId,
        cards: &[Card],
        to_region: Option<&str>,
    ) -> Result<(), EngineError> {
        let mut taken = Vec::with_capacity(cards.len());
        {
            let player = self
                .player_mut(id)
                .ok_or_else(|| EngineError::NoSuchPlayer(id.clone()))?;
            for &card in cards {
                let held = player.hand.take(card).ok_or_else(|| {
                    EngineError::Invariant(format!("player does not hold {card}"))
                })?;
                taken.push(held);
            }
        }
        match to_region {
            Some(region) => {
                let slot = self.community.entry(region.to_string()).or_default();
                slot.extend(taken);
            }
            None => {
                for held in taken {
                    self.deck.push_back(held.card);
                }
            }
        }
        Ok(())
    }

    pub fn expose(&mut self, id: &PlayerId, cards: &[Card]) -> Result<(), EngineError> {
        let player = self
            .player_mut(id)
            .ok_or_else(|| EngineError::NoSuchPlayer(id.clone()))?;
        for &card in cards {
            if !player.hand.set_visibility(card, Visibility::FaceUp) {
                return Err(EngineError::Invariant(format!(
                    "player does not hold {card}"
                )));
            }
        }
        Ok(())
    }

    /// Moves cards between players, preserving visibility and subsets.
    pub fn pass_cards(
        &mut self,
        from: &PlayerId,
        to: &PlayerId,
        cards: &[Card],
    ) -> Result<(), EngineError> {
        let mut moved = Vec::with_capacity(cards.len());
        {
            let giver = self
                .player_mut(from)
                .ok_or_else(|| EngineError::NoSuchPlayer(from.clone()))?;
            for &card in cards {
                let subset = giver
                    .hand
                    .subset_of(card)
                    .map(str::to_string)
                    .unwrap_or_else(|| UNASSIGNED.to_string());
                let held = giver.hand.take(card).ok_or_else(|| {
                    EngineError::Invariant(format!("player does not hold {card}"))
                })?;
                moved.push((subset, held));
            }
        }
        let receiver = self
            .player_mut(to)
            .ok_or_else(|| EngineError::NoSuchPlayer(to.clone()))?;
        for (subset, held) in moved {
            receiver.hand.add(&subset, held);
        }
        Ok(())
    }

    /// The receiving player for a pass in the given direction.
    pub fn pass_target(&self, from_seat: usize, direction: PassDirection) -> Option<PlayerId> {
        let actives: Vec<usize> = {
            let n = self.seats.len();
            (0..n)
                .map(|step| (from_seat + step) % n)
                .filter(|&s| self.seats[s].as_ref().map_or(false, |p| p.is_active))
                .collect()
        };
        if actives.len() < 2 {
            return None;
        }
        let target_seat = match direction {
            PassDirection::Left => actives[1],
            PassDirection::Right => actives[actives.len() - 1],
            PassDirection::Across => actives[actives.len() / 2],
        };
        self.seats[target_seat].as_ref().map(|p| p.id.clone())
    }

    /// Drops a community region entirely.
    pub fn remove_region(&mut self, region: &str) -> bool {
        self.community.remove(region).is_some()
    }

    /// Community view keyed by region, for the selector.
    pub fn community_view(&self) -> &BTreeMap<String, Vec<HeldCard>> {
        &self.community
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn table_with(players: &[(&str, Chips, usize)]) -> Table {
        let mut table = Table::new(6, DeckType::Standard, 0, 1);
        for (id, stack, seat) in players {
            table
                .add_player(id.to_string(), id.to_string(), *stack, *seat)
                .unwrap();
        }
        table
    }

    #[test]
    fn seating_is_fixed_and_exclusive() {
        let mut table = table_with(&[("a", 100, 0), ("b", 100, 2)]);
        assert!(matches!(
            table.add_player("c".into(), "c".into(), 100, 2),
            Err(EngineError::SeatOccupied(2))
        ));
        assert!(matches!(
            table.add_player("c".into(), "c".into(), 100, 9),
            Err(EngineError::NoSuchSeat(9))
        ));
        assert_eq!(table.seat_of(&"b".to_string()), Some(2));
    }

    #[test]
    fn button_skips_empty_seats() {
        let mut table = table_with(&[("a", 100, 0), ("b", 100, 3), ("c", 100, 4)]);
        assert_eq!(table.dealer_seat(), 0);
        table.advance_button();
        assert_eq!(table.dealer_seat(), 3);
        table.advance_button();
        assert_eq!(table.dealer_seat(), 4);
        table.advance_button();
        assert_eq!(table.dealer_seat(), 0);
    }

    #[test]
    fn reset_activates_funded_players_only() {
        let mut table = table_with(&[("a", 100, 0), ("broke", 0, 1)]);
        table.reset_for_hand();
        assert!(table.player(&"a".to_string()).unwrap().is_active);
        assert!(!table.player(&"broke".to_string()).unwrap().is_active);
    }

    #[test]
    fn dealing_respects_visibility_and_subset() {
        let mut table = table_with(&[("a", 100, 0)]);
        table.reset_for_hand();
        table
            .deal_to_player(&"a".to_string(), UNASSIGNED, Visibility::FaceDown)
            .unwrap();
        table
            .deal_to_player(&"a".to_string(), "door", Visibility::FaceUp)
            .unwrap();
        let player = table.player(&"a".to_string()).unwrap();
        assert_eq!(player.hand.len(), 2);
        assert_eq!(player.hand.face_up_cards().len(), 1);
        assert_eq!(player.hand.subset("door").len(), 1);
    }

    #[test]
    fn draw_replace_preserves_visibility_when_asked() {
        let mut table = table_with(&[("a", 100, 0)]);
        table.reset_for_hand();
        let card = table
            .deal_to_player(&"a".to_string(), UNASSIGNED, Visibility::FaceUp)
            .unwrap();
        let drawn = table
            .draw_replace(&"a".to_string(), &[card], UNASSIGNED, None, true)
            .unwrap();
        assert_eq!(drawn.len(), 1);
        let player = table.player(&"a".to_string()).unwrap();
        // The replacement inherited the face-up state of the discard.
        assert_eq!(player.hand.face_up_cards(), drawn);
    }

    #[test]
    fn pass_keeps_subset_and_visibility() {
        let mut table = table_with(&[("a", 100, 0), ("b", 100, 1)]);
        table.reset_for_hand();
        let card = table
            .deal_to_player(&"a".to_string(), "kept", Visibility::FaceUp)
            .unwrap();
        table
            .pass_cards(&"a".to_string(), &"b".to_string(), &[card])
            .unwrap();
        let b = table.player(&"b".to_string()).unwrap();
        assert_eq!(b.hand.subset("kept").len(), 1);
        assert!(b.hand.subset("kept")[0].is_face_up());
        assert!(table.player(&"a".to_string()).unwrap().hand.is_empty());
    }

    #[test]
    fn pass_targets_by_direction() {
        let mut table = table_with(&[("a", 100, 0), ("b", 100, 1), ("c", 100, 2), ("d", 100, 3)]);
        table.reset_for_hand();
        assert_eq!(table.pass_target(0, PassDirection::Left), Some("b".into()));
        assert_eq!(table.pass_target(0, PassDirection::Right), Some("d".into()));
        assert_eq!(table.pass_target(0, PassDirection::Across), Some("c".into()));
    }

    #[test]
    fn separate_moves_cards_between_subsets() {
        let mut table = table_with(&[("a", 100, 0)]);
        table.reset_for_hand();
        let card = table
            .deal_to_player(&"a".to_string(), UNASSIGNED, Visibility::FaceDown)
            .unwrap();
        let player = table.player_mut(&"a".to_string()).unwrap();
        player.hand.reassign(card, "Front").unwrap();
        assert_eq!(player.hand.subset("Front").len(), 1);
        assert_eq!(player.hand.subset(UNASSIGNED).len(), 0);
    }

    #[test]
    fn stacked_deck_controls_the_deal() {
        let mut table = table_with(&[("a", 100, 0)]);
        table.replace_deck(Deck::stacked(vec![
            Card::from_str("As").unwrap(),
            Card::from_str("Kd").unwrap(),
        ]));
        table.reset_for_hand();
        let first = table
            .deal_to_player(&"a".to_string(), UNASSIGNED, Visibility::FaceDown)
            .unwrap();
        assert_eq!(first, Card::from_str("As").unwrap());
    }
}
