//! Cards, ranks, suits, visibility, and decks.
//!
//! Everything the engine ever shuffles or deals lives here. `Card` itself is
//! a plain (rank, suit) pair and stays `Copy`; per-card table state such as
//! visibility and wild roles is carried by [`HeldCard`], which wraps a card
//! once it leaves the deck.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{Display, EnumString};

use crate::errors::EngineError;

/// Rank of a card. `Joker` serializes as `X`.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize, EnumString, Display)]
pub enum Rank {
    #[serde(rename = "A")]
    #[strum(serialize = "A")]
    Ace,
    #[serde(rename = "2")]
    #[strum(serialize = "2")]
    Deuce,
    #[serde(rename = "3")]
    #[strum(serialize = "3")]
    Trey,
    #[serde(rename = "4")]
    #[strum(serialize = "4")]
    Four,
    #[serde(rename = "5")]
    #[strum(serialize = "5")]
    Five,
    #[serde(rename = "6")]
    #[strum(serialize = "6")]
    Six,
    #[serde(rename = "7")]
    #[strum(serialize = "7")]
    Seven,
    #[serde(rename = "8")]
    #[strum(serialize = "8")]
    Eight,
    #[serde(rename = "9")]
    #[strum(serialize = "9")]
    Nine,
    #[serde(rename = "T")]
    #[strum(serialize = "T")]
    Ten,
    #[serde(rename = "J")]
    #[strum(serialize = "J")]
    Jack,
    #[serde(rename = "Q")]
    #[strum(serialize = "Q")]
    Queen,
    #[serde(rename = "K")]
    #[strum(serialize = "K")]
    King,
    #[serde(rename = "X")]
    #[strum(serialize = "X")]
    Joker,
}

impl Rank {
    /// Pip value used by the pip-count evaluation families. Aces count one,
    /// court cards count beyond ten in declaration order, jokers count zero.
    pub fn pips(self) -> i64 {
        match self {
            Rank::Ace => 1,
            Rank::Deuce => 2,
            Rank::Trey => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten => 10,
            Rank::Jack => 11,
            Rank::Queen => 12,
            Rank::King => 13,
            Rank::Joker => 0,
        }
    }
}

/// Rank orderings used by the different evaluation families, worst first.
pub struct RankOrder;

impl RankOrder {
    /// Deuce low, ace high.
    pub const STANDARD: [Rank; 13] = [
        Rank::Deuce,
        Rank::Trey,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];
    /// Ace low, king high (A-5 style low evaluation).
    pub const REGULAR: [Rank; 13] = [
        Rank::Ace,
        Rank::Deuce,
        Rank::Trey,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];
    /// 36-card deck, six low.
    pub const SHORT_6A: [Rank; 9] = [
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];
    /// 20-card deck, ten low.
    pub const SHORT_TA: [Rank; 5] = [Rank::Ten, Rank::Jack, Rank::Queen, Rank::King, Rank::Ace];
    /// 40-card deck with eights, nines and tens stripped.
    pub const SHORT_27_JA: [Rank; 10] = [
        Rank::Deuce,
        Rank::Trey,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];
}

/// Suit of a card.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize, EnumString, Display)]
pub enum Suit {
    #[serde(rename = "c")]
    #[strum(serialize = "c")]
    Club,
    #[serde(rename = "d")]
    #[strum(serialize = "d")]
    Diamond,
    #[serde(rename = "h")]
    #[strum(serialize = "h")]
    Heart,
    #[serde(rename = "s")]
    #[strum(serialize = "s")]
    Spade,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Diamond, Suit::Heart, Suit::Spade];

    /// Red/black color bucket, used by board-composition conditions.
    pub fn is_red(self) -> bool {
        matches!(self, Suit::Diamond | Suit::Heart)
    }
}

/// A playing card.
#[derive(PartialEq, Eq, Hash, Clone, Copy)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    pub fn get_ranks(cards: &[Card]) -> impl Iterator<Item = Rank> + '_ {
        cards.iter().map(|c| c.rank)
    }

    pub fn get_suits(cards: &[Card]) -> impl Iterator<Item = Suit> + '_ {
        cards.iter().map(|c| c.suit)
    }

    pub fn are_suited(cards: &[Card]) -> bool {
        Self::get_suits(cards).unique().count() <= 1
    }

    pub fn are_rainbow(cards: &[Card]) -> bool {
        let suits: Vec<Suit> = Self::get_suits(cards).collect();
        suits.iter().unique().count() == suits.len()
    }

    /// Parses a run of card strings, e.g. `"AsKh 2c"` or `"10d"` (tens may
    /// be written `T` or `10`).
    pub fn parse_cards(s: &str) -> Result<Vec<Card>, EngineError> {
        let s = s.replace("10", "T").replace(',', "");
        let mut cards = Vec::new();
        for content in s.split_whitespace() {
            if content.len() % 2 != 0 {
                return Err(EngineError::CardParse(format!(
                    "card string length must be a multiple of 2, got '{content}'"
                )));
            }
            for i in (0..content.len()).step_by(2) {
                let rank_str = &content[i..i + 1];
                let suit_str = &content[i + 1..i + 2];
                let rank = Rank::from_str(rank_str)
                    .map_err(|_| EngineError::CardParse(format!("invalid rank '{rank_str}'")))?;
                let suit = Suit::from_str(suit_str)
                    .map_err(|_| EngineError::CardParse(format!("invalid suit '{suit_str}'")))?;
                cards.push(Card::new(rank, suit));
            }
        }
        Ok(cards)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

impl FromStr for Card {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cards = Card::parse_cards(s)?;
        match cards.as_slice() {
            [card] => Ok(*card),
            _ => Err(EngineError::CardParse(format!(
                "expected a single card, got '{s}'"
            ))),
        }
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Card::from_str(&s).map_err(D::Error::custom)
    }
}

/// Whether a card is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
pub enum Visibility {
    #[strum(serialize = "face down")]
    #[serde(rename = "face down")]
    FaceDown,
    #[strum(serialize = "face up")]
    #[serde(rename = "face up")]
    FaceUp,
}

/// Wild status assigned to a card at deal time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum WildRole {
    #[default]
    None,
    /// Substitutes for any card.
    Wild,
    /// Completes straights, flushes and ace-high only; otherwise an ace.
    Bug,
}

/// A card in someone's possession: on the table or in a player's hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeldCard {
    pub card: Card,
    pub visibility: Visibility,
    pub wild_role: WildRole,
}

impl HeldCard {
    pub fn new(card: Card, visibility: Visibility) -> Self {
        Self {
            card,
            visibility,
            wild_role: WildRole::None,
        }
    }

    pub fn is_face_up(&self) -> bool {
        self.visibility == Visibility::FaceUp
    }
}

/// Deck construction kinds recognized by the rules schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
pub enum DeckType {
    #[strum(serialize = "standard")]
    #[serde(rename = "standard")]
    Standard,
    #[strum(serialize = "short_6a")]
    #[serde(rename = "short_6a")]
    Short6A,
    #[strum(serialize = "short_ta")]
    #[serde(rename = "short_ta")]
    ShortTA,
    #[strum(serialize = "short_27_ja")]
    #[serde(rename = "short_27_ja")]
    Short27JA,
}

impl DeckType {
    pub fn ranks(self) -> &'static [Rank] {
        match self {
            DeckType::Standard => &RankOrder::STANDARD,
            DeckType::Short6A => &RankOrder::SHORT_6A,
            DeckType::ShortTA => &RankOrder::SHORT_TA,
            DeckType::Short27JA => &RankOrder::SHORT_27_JA,
        }
    }

    pub fn size(self) -> usize {
        self.ranks().len() * 4
    }

    fn cards(self) -> Vec<Card> {
        self.ranks()
            .iter()
            .cartesian_product(&Suit::ALL)
            .map(|(&rank, &suit)| Card::new(rank, suit))
            .collect()
    }
}

/// An ordered sequence of undealt cards.
///
/// A freshly built deck is shuffled with a seeded [`StdRng`] so that a hand
/// replays bit-identically from its seed. A stacked deck skips the shuffle
/// and draws in exactly the order supplied, which is how tests pin outcomes.
/// Every draw is appended to `drawn`, the reproducibility witness.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
    drawn: Vec<Card>,
}

impl Deck {
    pub fn new(deck_type: DeckType, jokers: usize, seed: u64) -> Self {
        let mut cards = deck_type.cards();
        for _ in 0..jokers {
            // Joker suits only disambiguate multiple jokers in one deck.
            cards.push(Card::new(Rank::Joker, Suit::ALL[cards.len() % 4]));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        cards.shuffle(&mut rng);
        Self {
            cards,
            drawn: Vec::new(),
        }
    }

    /// A deck of predetermined cards, drawn front first.
    pub fn stacked(cards: Vec<Card>) -> Self {
        Self {
            cards,
            drawn: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn draw_one(&mut self) -> Result<Card, EngineError> {
        if self.cards.is_empty() {
            return Err(EngineError::DeckExhausted);
        }
        let card = self.cards.remove(0);
        self.drawn.push(card);
        Ok(card)
    }

    pub fn draw(&mut self, count: usize) -> Result<Vec<Card>, EngineError> {
        if self.cards.len() < count {
            return Err(EngineError::DeckExhausted);
        }
        (0..count).map(|_| self.draw_one()).collect()
    }

    /// Returns a card to the bottom of the deck. Discards and mucked cards
    /// go here so long drawing variants cannot run the deck dry early.
    pub fn push_back(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// The exact order cards have left the deck.
    pub fn drawn(&self) -> &[Card] {
        &self.drawn
    }
}
