//! Hand evaluation.
//!
//! [`evaluate`] turns a concrete card set into a [`HandRank`]: an opaque,
//! totally ordered strength carrying a classification label and a printable
//! description. Each [`EvaluationType`] is one arm of a closed dispatch;
//! most are backed by the shared lookup tables, a few (pip counts, partial
//! exposed hands, soko) are computed arithmetically. Wild and bug roles are
//! resolved here by substitution over the deck-legal cards.
//!
//! Orders are normalized so that a *smaller* `order` is a *better* hand in
//! every system; qualifier windows index into that ordering directly, e.g.
//! `[1, 56]` is "eight or better" under `a5_low`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::cards::{Card, HeldCard, Rank, RankOrder, Suit, WildRole};
use crate::errors::EngineError;
use crate::lookups::{table, Label, LookupFamily};

/// The closed set of scoring systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationType {
    High,
    A5Low,
    TwoSevenLow,
    Badugi,
    BadugiAh,
    Higudi,
    HighWild,
    HighWildBug,
    Ffh36CardHigh,
    Ffh27JaHighWildBug,
    TwentyCardHigh,
    A5LowHigh,
    TwoCardHigh,
    OneCardHighSpade,
    NeSevenCardHigh,
    LowPip6Cards,
    FortyNine,
    Zero,
    Six,
    TwentyOne,
    SokoHigh,
    A6Low,
    /// Generic pip-sum fallback over N cards, used by bring-in borrows.
    LowPip(u8),
}

impl fmt::Display for EvaluationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvaluationType::High => "high",
            EvaluationType::A5Low => "a5_low",
            EvaluationType::TwoSevenLow => "27_low",
            EvaluationType::Badugi => "badugi",
            EvaluationType::BadugiAh => "badugi_ah",
            EvaluationType::Higudi => "higudi",
            EvaluationType::HighWild => "high_wild",
            EvaluationType::HighWildBug => "high_wild_bug",
            EvaluationType::Ffh36CardHigh => "36card_ffh_high",
            EvaluationType::Ffh27JaHighWildBug => "27_ja_ffh_high_wild_bug",
            EvaluationType::TwentyCardHigh => "20card_high",
            EvaluationType::A5LowHigh => "a5_low_high",
            EvaluationType::TwoCardHigh => "two_card_high",
            EvaluationType::OneCardHighSpade => "one_card_high_spade",
            EvaluationType::NeSevenCardHigh => "ne_seven_card_high",
            EvaluationType::LowPip6Cards => "low_pip_6_cards",
            EvaluationType::FortyNine => "49",
            EvaluationType::Zero => "zero",
            EvaluationType::Six => "6",
            EvaluationType::TwentyOne => "21",
            EvaluationType::SokoHigh => "soko_high",
            EvaluationType::A6Low => "a6_low",
            EvaluationType::LowPip(n) => return write!(f, "low_pip_{n}"),
        };
        write!(f, "{name}")
    }
}

impl FromStr for EvaluationType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let eval = match s {
            "high" => EvaluationType::High,
            "a5_low" => EvaluationType::A5Low,
            "27_low" => EvaluationType::TwoSevenLow,
            "badugi" => EvaluationType::Badugi,
            "badugi_ah" => EvaluationType::BadugiAh,
            "higudi" => EvaluationType::Higudi,
            "high_wild" => EvaluationType::HighWild,
            "high_wild_bug" => EvaluationType::HighWildBug,
            "36card_ffh_high" => EvaluationType::Ffh36CardHigh,
            "27_ja_ffh_high_wild_bug" => EvaluationType::Ffh27JaHighWildBug,
            "20card_high" => EvaluationType::TwentyCardHigh,
            "a5_low_high" => EvaluationType::A5LowHigh,
            "two_card_high" => EvaluationType::TwoCardHigh,
            "one_card_high_spade" => EvaluationType::OneCardHighSpade,
            "ne_seven_card_high" => EvaluationType::NeSevenCardHigh,
            "low_pip_6_cards" => EvaluationType::LowPip6Cards,
            "49" => EvaluationType::FortyNine,
            "zero" => EvaluationType::Zero,
            "6" => EvaluationType::Six,
            "21" => EvaluationType::TwentyOne,
            "soko_high" => EvaluationType::SokoHigh,
            "a6_low" => EvaluationType::A6Low,
            other => {
                if let Some(n) = other
                    .strip_prefix("low_pip_")
                    .and_then(|rest| rest.parse::<u8>().ok())
                {
                    EvaluationType::LowPip(n)
                } else {
                    return Err(EngineError::UnknownEvaluation(other.to_string()));
                }
            }
        };
        Ok(eval)
    }
}

impl Serialize for EvaluationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EvaluationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        EvaluationType::from_str(&s).map_err(D::Error::custom)
    }
}

impl EvaluationType {
    /// The fixed card count this system evaluates, if it has one. The
    /// selector reduces larger sets to this size before evaluating.
    pub fn hand_size(&self) -> Option<usize> {
        match self {
            EvaluationType::High
            | EvaluationType::A5Low
            | EvaluationType::TwoSevenLow
            | EvaluationType::HighWild
            | EvaluationType::HighWildBug
            | EvaluationType::Ffh36CardHigh
            | EvaluationType::Ffh27JaHighWildBug
            | EvaluationType::TwentyCardHigh
            | EvaluationType::A5LowHigh
            | EvaluationType::SokoHigh
            | EvaluationType::A6Low => Some(5),
            EvaluationType::Badugi | EvaluationType::BadugiAh | EvaluationType::Higudi => Some(4),
            EvaluationType::TwoCardHigh => Some(2),
            EvaluationType::OneCardHighSpade => Some(1),
            EvaluationType::NeSevenCardHigh => Some(7),
            EvaluationType::LowPip6Cards => Some(6),
            EvaluationType::LowPip(n) => Some(*n as usize),
            EvaluationType::FortyNine
            | EvaluationType::Zero
            | EvaluationType::Six
            | EvaluationType::TwentyOne => None,
        }
    }

    /// Whether this system is a low line for declaration purposes.
    pub fn is_low(&self) -> bool {
        matches!(
            self,
            EvaluationType::A5Low
                | EvaluationType::TwoSevenLow
                | EvaluationType::A6Low
                | EvaluationType::Badugi
                | EvaluationType::BadugiAh
                | EvaluationType::LowPip6Cards
                | EvaluationType::Zero
                | EvaluationType::LowPip(_)
        )
    }

    /// Ranks a wild card may substitute to under this system.
    fn legal_ranks(&self) -> &'static [Rank] {
        match self {
            EvaluationType::Ffh36CardHigh => &RankOrder::SHORT_6A,
            EvaluationType::Ffh27JaHighWildBug => &RankOrder::SHORT_27_JA,
            EvaluationType::TwentyCardHigh => &RankOrder::SHORT_TA,
            _ => &RankOrder::STANDARD,
        }
    }
}

/// An opaque, comparable hand strength.
///
/// Greater is better; two ranks with equal `order` tie even if their
/// descriptions differ.
#[derive(Debug, Clone, Serialize)]
pub struct HandRank {
    pub order: u32,
    pub label: Label,
    pub description: String,
}

impl HandRank {
    const UNQUALIFIED_ORDER: u32 = u32::MAX;

    pub fn unqualified() -> Self {
        Self {
            order: Self::UNQUALIFIED_ORDER,
            label: Label::Unqualified,
            description: "Unqualified".to_string(),
        }
    }

    pub fn is_unqualified(&self) -> bool {
        self.order == Self::UNQUALIFIED_ORDER
    }

    /// Whether this rank sits inside a `[low, high]` qualifier window.
    pub fn qualifies(&self, window: Option<(u32, u32)>) -> bool {
        if self.is_unqualified() {
            return false;
        }
        match window {
            None => true,
            Some((lo, hi)) => (lo..=hi).contains(&self.order),
        }
    }
}

impl PartialEq for HandRank {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl Eq for HandRank {}

impl PartialOrd for HandRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HandRank {
    fn cmp(&self, other: &Self) -> Ordering {
        other.order.cmp(&self.order)
    }
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

fn fmt_cards(cards: &[Card]) -> String {
    cards.iter().map(|c| c.to_string()).collect()
}

fn describe(label: Label, cards: &[Card]) -> String {
    format!("{} ({})", label, fmt_cards(cards))
}

#[derive(Clone, Copy)]
enum Direction {
    High,
    Low,
}

fn table_rank(family: LookupFamily, direction: Direction, cards: &[Card]) -> Result<HandRank, EngineError> {
    let t = table(family);
    let entry = t.get_entry(cards).ok_or_else(|| {
        EngineError::Invariant(format!("no ranking entry for {}", fmt_cards(cards)))
    })?;
    let order = match direction {
        Direction::Low => entry.index + 1,
        Direction::High => t.len() - entry.index,
    };
    Ok(HandRank {
        order,
        label: entry.label,
        description: describe(entry.label, cards),
    })
}

/// Best valid rainbow subset, fewest-card hands last.
fn badugi_rank(family: LookupFamily, cards: &[Card]) -> Result<HandRank, EngineError> {
    let t = table(family);
    let mut best: Option<(u32, Vec<Card>)> = None;
    for size in (1..=cards.len().min(4)).rev() {
        for combo in cards.iter().copied().combinations(size) {
            if let Some(entry) = t.get_entry(&combo) {
                if best.as_ref().map_or(true, |(idx, _)| entry.index < *idx) {
                    best = Some((entry.index, combo));
                }
            }
        }
    }
    let (index, combo) = best.ok_or_else(|| {
        EngineError::Invariant(format!("no badugi subset in {}", fmt_cards(cards)))
    })?;
    Ok(HandRank {
        order: index + 1,
        label: Label::Badugi,
        description: format!("{}-card badugi ({})", combo.len(), fmt_cards(&combo)),
    })
}

/// Hi-dugi: most cards first, then the *highest* ranks win.
fn higudi_rank(cards: &[Card]) -> Result<HandRank, EngineError> {
    let t = table(LookupFamily::BadugiAh);
    let mut best: Option<(usize, u32, Vec<Card>)> = None;
    for size in (1..=cards.len().min(4)).rev() {
        for combo in cards.iter().copied().combinations(size) {
            if let Some(entry) = t.get_entry(&combo) {
                let better = match &best {
                    None => true,
                    Some((len, idx, _)) => size > *len || (size == *len && entry.index > *idx),
                };
                if better {
                    best = Some((size, entry.index, combo));
                }
            }
        }
    }
    let (size, index, combo) = best.ok_or_else(|| {
        EngineError::Invariant(format!("no badugi subset in {}", fmt_cards(cards)))
    })?;
    let order = (4 - size as u32) * 1_000_000 + (t.len() - index);
    Ok(HandRank {
        order,
        label: Label::Badugi,
        description: format!("{size}-card hi-dugi ({})", fmt_cards(&combo)),
    })
}

fn rank_strength(rank: Rank, order: &[Rank]) -> Option<usize> {
    order.iter().position(|&r| r == rank)
}

fn has_four_card_flush(cards: &[Card]) -> bool {
    Suit::ALL
        .iter()
        .any(|&s| cards.iter().filter(|c| c.suit == s).count() >= 4)
}

fn has_four_card_straight(cards: &[Card]) -> bool {
    let mut positions: Vec<usize> = cards
        .iter()
        .filter_map(|c| rank_strength(c.rank, &RankOrder::STANDARD))
        .collect();
    positions.sort_unstable();
    positions.dedup();
    let runs = positions.windows(4).any(|w| w[3] - w[0] == 3);
    // A-2-3-4 with the ace on top of the standard order.
    let wheel = [Rank::Ace, Rank::Deuce, Rank::Trey, Rank::Four]
        .iter()
        .all(|r| cards.iter().any(|c| c.rank == *r));
    runs || wheel
}

/// Canadian stud: four-card flushes and straights slot above one pair.
fn soko_rank(cards: &[Card]) -> Result<HandRank, EngineError> {
    let t = table(LookupFamily::Standard);
    let entry = t.get_entry(cards).ok_or_else(|| {
        EngineError::Invariant(format!("no ranking entry for {}", fmt_cards(cards)))
    })?;
    let within = t.len() - entry.index;
    // Band zero is best. Partial hands slot between two pair and one pair.
    let (band, label) = match entry.label {
        Label::StraightFlush => (0, entry.label),
        Label::FourOfAKind => (1, entry.label),
        Label::FullHouse => (2, entry.label),
        Label::Flush => (3, entry.label),
        Label::Straight => (4, entry.label),
        Label::ThreeOfAKind => (5, entry.label),
        Label::TwoPair => (6, entry.label),
        _ if has_four_card_flush(cards) => (7, Label::FourCardFlush),
        _ if has_four_card_straight(cards) => (8, Label::FourCardStraight),
        Label::OnePair => (9, entry.label),
        _ => (10, entry.label),
    };
    Ok(HandRank {
        order: band * 100_000 + within,
        label,
        description: describe(label, cards),
    })
}

fn one_card_high_spade_rank(cards: &[Card]) -> Result<HandRank, EngineError> {
    match cards {
        [card] if card.suit == Suit::Spade => {
            let strength = rank_strength(card.rank, &RankOrder::STANDARD).ok_or_else(|| {
                EngineError::Invariant(format!("joker has no spade ranking: {card}"))
            })?;
            Ok(HandRank {
                order: 13 - strength as u32,
                label: Label::HighCard,
                description: format!("High spade ({card})"),
            })
        }
        [_] => Ok(HandRank::unqualified()),
        _ => Err(EngineError::Invariant(
            "one-card evaluation needs exactly one card".into(),
        )),
    }
}

fn best_five_of(cards: &[Card], family: LookupFamily) -> Result<HandRank, EngineError> {
    if cards.len() < 5 {
        return Err(EngineError::Invariant(format!(
            "need at least five cards, got {}",
            cards.len()
        )));
    }
    cards
        .iter()
        .copied()
        .combinations(5)
        .filter_map(|combo| table_rank(family, Direction::High, &combo).ok())
        .max()
        .ok_or_else(|| EngineError::Invariant(format!("no ranking entry in {}", fmt_cards(cards))))
}

fn pip_rank(cards: &[Card], target: i64) -> HandRank {
    let sum: i64 = cards.iter().map(|c| c.rank.pips()).sum();
    let distance = (sum - target).unsigned_abs() as u32;
    HandRank {
        order: distance + 1,
        label: Label::PipCount,
        description: format!("{sum} pips ({})", fmt_cards(cards)),
    }
}

/// Evaluates a concrete card set with no wild roles.
pub fn evaluate(cards: &[Card], eval: EvaluationType) -> Result<HandRank, EngineError> {
    if let Some(required) = eval.hand_size() {
        if cards.len() != required {
            return Err(EngineError::Invariant(format!(
                "{eval} evaluates {required} cards, got {}",
                cards.len()
            )));
        }
    }
    match eval {
        EvaluationType::High => table_rank(LookupFamily::Standard, Direction::High, cards),
        EvaluationType::TwoSevenLow => table_rank(LookupFamily::Standard, Direction::Low, cards),
        EvaluationType::A5Low => table_rank(LookupFamily::Regular, Direction::Low, cards),
        EvaluationType::A5LowHigh => table_rank(LookupFamily::Regular, Direction::High, cards),
        EvaluationType::A6Low => table_rank(LookupFamily::AceToSixLow, Direction::Low, cards),
        EvaluationType::HighWild | EvaluationType::HighWildBug => {
            table_rank(LookupFamily::StandardWild, Direction::High, cards)
        }
        EvaluationType::Ffh36CardHigh => {
            table_rank(LookupFamily::Short6AFfh, Direction::High, cards)
        }
        EvaluationType::Ffh27JaHighWildBug => {
            table_rank(LookupFamily::Short27JaFfhWild, Direction::High, cards)
        }
        EvaluationType::TwentyCardHigh => table_rank(LookupFamily::ShortTa, Direction::High, cards),
        EvaluationType::TwoCardHigh => table_rank(LookupFamily::TwoCard, Direction::High, cards),
        EvaluationType::Badugi => badugi_rank(LookupFamily::Badugi, cards),
        EvaluationType::BadugiAh => badugi_rank(LookupFamily::BadugiAh, cards),
        EvaluationType::Higudi => higudi_rank(cards),
        EvaluationType::SokoHigh => soko_rank(cards),
        EvaluationType::OneCardHighSpade => one_card_high_spade_rank(cards),
        EvaluationType::NeSevenCardHigh => best_five_of(cards, LookupFamily::Standard),
        EvaluationType::LowPip6Cards | EvaluationType::Zero | EvaluationType::LowPip(_) => {
            Ok(pip_rank(cards, 0))
        }
        EvaluationType::FortyNine => Ok(pip_rank(cards, 49)),
        EvaluationType::Six => Ok(pip_rank(cards, 6)),
        EvaluationType::TwentyOne => Ok(pip_rank(cards, 21)),
    }
}

/// Memo for repeated sub-evaluations inside one best-hand search.
#[derive(Default)]
pub struct EvalCache {
    entries: HashMap<(Vec<(Card, WildRole)>, EvaluationType), HandRank>,
}

impl EvalCache {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_key(cards: &[HeldCard]) -> Vec<(Card, WildRole)> {
    let mut key: Vec<(Card, WildRole)> = cards.iter().map(|h| (h.card, h.wild_role)).collect();
    key.sort_by_key(|(c, _)| (c.rank as u8, c.suit as u8));
    key
}

/// Evaluates held cards, expanding wild and bug roles by substitution.
///
/// A bug may substitute to any card that completes a straight or flush,
/// otherwise it plays as an ace. A joker that reached the table without an
/// explicit role plays as a bug.
pub fn evaluate_held(
    cards: &[HeldCard],
    eval: EvaluationType,
    cache: &mut EvalCache,
) -> Result<HandRank, EngineError> {
    let key = (sorted_key(cards), eval);
    if let Some(hit) = cache.entries.get(&key) {
        return Ok(hit.clone());
    }

    let mut concrete: Vec<Card> = Vec::with_capacity(cards.len());
    let mut substitutions: Vec<WildRole> = Vec::new();
    for held in cards {
        let role = match held.wild_role {
            WildRole::None if held.card.rank == Rank::Joker => WildRole::Bug,
            role => role,
        };
        match role {
            WildRole::None => concrete.push(held.card),
            WildRole::Wild | WildRole::Bug => substitutions.push(role),
        }
    }

    let rank = if substitutions.is_empty() {
        evaluate(&concrete, eval)?
    } else {
        // Plain high tables have no five-of-a-kind row; substitution can
        // reach one, so wild evaluation always runs on the wild family.
        let eval = match eval {
            EvaluationType::High => {
                log::debug!("promoting high to high_wild for wild-card hand");
                EvaluationType::HighWild
            }
            other => other,
        };
        expand_wilds(&concrete, &substitutions, eval)?
    };

    cache.entries.insert(key, rank.clone());
    Ok(rank)
}

fn expand_wilds(
    concrete: &[Card],
    roles: &[WildRole],
    eval: EvaluationType,
) -> Result<HandRank, EngineError> {
    let candidates: Vec<Card> = eval
        .legal_ranks()
        .iter()
        .flat_map(|&rank| Suit::ALL.iter().map(move |&suit| Card::new(rank, suit)))
        .collect();

    let straightish =
        |label: Label| matches!(label, Label::Straight | Label::Flush | Label::StraightFlush);

    let mut best: Option<HandRank> = None;
    let assignments = roles
        .iter()
        .map(|_| candidates.iter().copied())
        .multi_cartesian_product();
    for assignment in assignments {
        let mut hand = concrete.to_vec();
        hand.extend(assignment.iter().copied());
        let Ok(rank) = evaluate(&hand, eval) else {
            continue;
        };
        let bug_ok = roles.iter().zip(assignment.iter()).all(|(role, card)| {
            *role != WildRole::Bug || card.rank == Rank::Ace || straightish(rank.label)
        });
        if !bug_ok {
            continue;
        }
        if best.as_ref().map_or(true, |b| rank > *b) {
            best = Some(rank);
        }
    }
    best.ok_or_else(|| {
        EngineError::Invariant(format!(
            "wild expansion produced no valid hand for {}",
            fmt_cards(concrete)
        ))
    })
}

/// Orders partial exposed hands (stud streets) by rank multisets: quads,
/// trips, two pair, pair, then high cards. Suits are ignored; callers break
/// residual ties positionally.
pub fn exposed_rank(cards: &[Card], ace_high: bool) -> HandRank {
    let order_table: &[Rank] = if ace_high {
        &RankOrder::STANDARD
    } else {
        &RankOrder::REGULAR
    };
    let mut counts: HashMap<Rank, usize> = HashMap::new();
    for card in cards {
        *counts.entry(card.rank).or_default() += 1;
    }
    let mut groups: Vec<(usize, usize)> = counts
        .iter()
        .map(|(&rank, &count)| (count, rank_strength(rank, order_table).unwrap_or(0)))
        .collect();
    groups.sort_unstable_by(|a, b| b.cmp(a));

    let (band, label) = match groups.first().map(|g| g.0).unwrap_or(0) {
        4 => (0u32, Label::FourOfAKind),
        3 => (1, Label::ThreeOfAKind),
        2 if groups.iter().filter(|g| g.0 == 2).count() >= 2 => (2, Label::TwoPair),
        2 => (3, Label::OnePair),
        _ => (4, Label::HighCard),
    };
    let mut encoded = 0u32;
    for &(_, strength) in groups.iter().take(5) {
        encoded = encoded * 14 + (13 - strength as u32);
    }
    HandRank {
        order: band * 1_000_000 + encoded,
        label,
        description: describe(label, cards),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Visibility;

    fn cards(s: &str) -> Vec<Card> {
        Card::parse_cards(s).unwrap()
    }

    fn rank_of(s: &str, eval: EvaluationType) -> HandRank {
        evaluate(&cards(s), eval).unwrap()
    }

    #[test]
    fn high_and_low_directions_disagree() {
        let wheel_high = rank_of("Ah 2c 3d 4s 5h", EvaluationType::High);
        let kings_high = rank_of("Ks Kh 9d 5c 2s", EvaluationType::High);
        assert!(wheel_high > kings_high);

        let seven_low = rank_of("2c 3d 4s 5h 7c", EvaluationType::TwoSevenLow);
        let pair_low = rank_of("2c 2d 4s 5h 7c", EvaluationType::TwoSevenLow);
        assert!(seven_low > pair_low);
    }

    #[test]
    fn a5_low_qualifier_window_matches_eight_or_better() {
        let qualifies = rank_of("Ah 2c 3d 4s 8h", EvaluationType::A5Low);
        let too_rough = rank_of("Ah 2c 3d 4s 9h", EvaluationType::A5Low);
        assert!(qualifies.qualifies(Some((1, 56))));
        assert!(!too_rough.qualifies(Some((1, 56))));
        // The best low is the wheel at order one.
        assert_eq!(rank_of("Ah 2c 3d 4s 5h", EvaluationType::A5Low).order, 1);
    }

    #[test]
    fn badugi_rainbow_wheel_beats_everything() {
        let wheel = rank_of("Ah 2c 3d 4s", EvaluationType::Badugi);
        assert_eq!(wheel.order, 1);
        let three_card = rank_of("Ah 2c 3d 3s", EvaluationType::Badugi);
        assert!(wheel > three_card);
        assert!(three_card.description.contains("3-card"));
    }

    #[test]
    fn higudi_wants_high_rainbow_cards() {
        let big = rank_of("Th Jc Qd Ks", EvaluationType::Higudi);
        let small = rank_of("2h 3c 4d 5s", EvaluationType::Higudi);
        let three = rank_of("Kh Qc Jd Js", EvaluationType::Higudi);
        assert!(big > small);
        assert!(small > three);
    }

    #[test]
    fn wild_expansion_finds_the_best_substitution() {
        let mut cache = EvalCache::new();
        let mut hand: Vec<HeldCard> = cards("Ks Qs Js Ts")
            .into_iter()
            .map(|c| HeldCard::new(c, Visibility::FaceDown))
            .collect();
        let mut wild = HeldCard::new(Card::from_str("2h").unwrap(), Visibility::FaceDown);
        wild.wild_role = WildRole::Wild;
        hand.push(wild);

        let rank = evaluate_held(&hand, EvaluationType::HighWild, &mut cache).unwrap();
        assert_eq!(rank.label, Label::StraightFlush);
    }

    #[test]
    fn wild_never_hurts() {
        let mut cache = EvalCache::new();
        let base: Vec<HeldCard> = cards("Ks Qh 9d 5c 2s")
            .into_iter()
            .map(|c| HeldCard::new(c, Visibility::FaceDown))
            .collect();
        let plain = evaluate_held(&base, EvaluationType::HighWild, &mut cache).unwrap();

        let mut wilded = base.clone();
        wilded[4].wild_role = WildRole::Wild;
        let improved = evaluate_held(&wilded, EvaluationType::HighWild, &mut cache).unwrap();
        assert!(improved >= plain);
    }

    #[test]
    fn bug_completes_flushes_but_otherwise_plays_as_ace() {
        let mut cache = EvalCache::new();
        // Four spades and a bug: the bug completes the flush.
        let mut hand: Vec<HeldCard> = cards("Ks Qs 9s 5s")
            .into_iter()
            .map(|c| HeldCard::new(c, Visibility::FaceDown))
            .collect();
        let mut bug = HeldCard::new(Card::from_str("2h").unwrap(), Visibility::FaceDown);
        bug.wild_role = WildRole::Bug;
        hand.push(bug.clone());
        let rank = evaluate_held(&hand, EvaluationType::HighWildBug, &mut cache).unwrap();
        assert_eq!(rank.label, Label::Flush);

        // No straight or flush to complete: the bug is an ace.
        let mut ragged: Vec<HeldCard> = cards("Kh Qs 9d 5c")
            .into_iter()
            .map(|c| HeldCard::new(c, Visibility::FaceDown))
            .collect();
        ragged.push(bug);
        let rank = evaluate_held(&ragged, EvaluationType::HighWildBug, &mut cache).unwrap();
        assert_eq!(rank.label, Label::HighCard);
        assert!(rank.description.contains('A'));
    }

    #[test]
    fn five_of_a_kind_tops_the_wild_order() {
        let mut cache = EvalCache::new();
        let mut hand: Vec<HeldCard> = cards("As Ah Ad Ac")
            .into_iter()
            .map(|c| HeldCard::new(c, Visibility::FaceDown))
            .collect();
        let mut wild = HeldCard::new(Card::from_str("2h").unwrap(), Visibility::FaceDown);
        wild.wild_role = WildRole::Wild;
        hand.push(wild);
        let rank = evaluate_held(&hand, EvaluationType::HighWild, &mut cache).unwrap();
        assert_eq!(rank.label, Label::FiveOfAKind);
    }

    #[test]
    fn soko_partial_hands_slot_between_pairs() {
        let four_flush = rank_of("Ks Qs 9s 5s 2h", EvaluationType::SokoHigh);
        let four_straight = rank_of("9s 8h 7d 6c 2h", EvaluationType::SokoHigh);
        let pair = rank_of("As Ah 9d 5c 2s", EvaluationType::SokoHigh);
        let two_pair = rank_of("As Ah 9d 9c 2s", EvaluationType::SokoHigh);
        assert_eq!(four_flush.label, Label::FourCardFlush);
        assert_eq!(four_straight.label, Label::FourCardStraight);
        assert!(two_pair > four_flush);
        assert!(four_flush > four_straight);
        assert!(four_straight > pair);
    }

    #[test]
    fn pip_targets_score_by_distance() {
        let close = pip_rank(&cards("Ks Qs Js"), 49);
        let closer = pip_rank(&cards("Ks Qs Js Jc"), 49);
        assert!(closer > close);
        assert!(closer.description.contains("47 pips"));
    }

    #[test]
    fn one_card_spade_only() {
        let ace = rank_of("As", EvaluationType::OneCardHighSpade);
        let king = rank_of("Ks", EvaluationType::OneCardHighSpade);
        let heart = rank_of("Ah", EvaluationType::OneCardHighSpade);
        assert!(ace > king);
        assert!(heart.is_unqualified());
    }

    #[test]
    fn exposed_rank_orders_stud_boards() {
        let pair = exposed_rank(&cards("Ks Kh 2d"), true);
        let high = exposed_rank(&cards("As Kh Qd"), true);
        let low_ace = exposed_rank(&cards("As"), false);
        let low_deuce = exposed_rank(&cards("2s"), false);
        assert!(pair > high);
        // Ace low: the deuce outranks the ace.
        assert!(low_deuce > low_ace);
    }

    #[test]
    fn unqualified_loses_to_everything() {
        let worst = rank_of("2c 3d 4s 5h 7c", EvaluationType::High);
        assert!(worst > HandRank::unqualified());
    }

    #[test]
    fn evaluation_type_round_trips_through_strings() {
        for name in [
            "high",
            "a5_low",
            "27_low",
            "badugi",
            "higudi",
            "36card_ffh_high",
            "49",
            "low_pip_4",
        ] {
            let eval = EvaluationType::from_str(name).unwrap();
            assert_eq!(eval.to_string(), name);
        }
        assert!(EvaluationType::from_str("mystery").is_err());
    }
}
