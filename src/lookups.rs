//! Pre-computed hand-ranking tables.
//!
//! Every ranking family maps a canonicalized card set to an [`Entry`]: an
//! index into the family's total order plus a classification label. The key
//! is a product of per-rank primes (so it is order-independent and collision
//! free over rank multisets) paired with a suitedness flag. Tables are built
//! once per process on first use and shared by every game.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::cards::{Card, Rank, RankOrder};

// Generated by build.rs: rank char -> prime multiplier.
include!(concat!(env!("OUT_DIR"), "/rank_multipliers.rs"));

/// Hand classification labels across all families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Label {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    FiveOfAKind,
    FourCardFlush,
    FourCardStraight,
    Badugi,
    PipCount,
    Unqualified,
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Label::HighCard => "High card",
            Label::OnePair => "One pair",
            Label::TwoPair => "Two pair",
            Label::ThreeOfAKind => "Three of a kind",
            Label::Straight => "Straight",
            Label::Flush => "Flush",
            Label::FullHouse => "Full house",
            Label::FourOfAKind => "Four of a kind",
            Label::StraightFlush => "Straight flush",
            Label::FiveOfAKind => "Five of a kind",
            Label::FourCardFlush => "Four-card flush",
            Label::FourCardStraight => "Four-card straight",
            Label::Badugi => "Badugi",
            Label::PipCount => "Pip count",
            Label::Unqualified => "Unqualified",
        };
        write!(f, "{name}")
    }
}

/// Position of a hand within its family's order, weakest first.
#[derive(Debug, Clone, Copy, Eq, Hash)]
pub struct Entry {
    pub index: u32,
    pub label: Label,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

/// The ranking families backed by a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupFamily {
    /// 52-card high hands, ace high.
    Standard,
    /// Standard plus five-of-a-kind, for wild-card evaluation.
    StandardWild,
    /// Ace-to-five low: no straights or flushes, ace low.
    Regular,
    /// Ace-to-six low: straights and flushes count, ace low.
    AceToSixLow,
    /// 36-card deck where a flush beats a full house.
    Short6AFfh,
    /// 40-card deck (no 8/9/T), flush beats full house, five-of-a-kind on top.
    Short27JaFfhWild,
    /// 20-card deck, tens low.
    ShortTa,
    /// Rainbow-distinct subsets of up to four cards, ace low.
    Badugi,
    /// Rainbow-distinct subsets of up to four cards, ace high.
    BadugiAh,
    /// Two-card hands: pairs over high cards.
    TwoCard,
}

/// A fully built ranking table.
pub struct LookupTable {
    entries: HashMap<(BigUint, bool), Entry>,
    rank_order: &'static [Rank],
    distinct: u32,
}

impl LookupTable {
    pub fn rank_order(&self) -> &'static [Rank] {
        self.rank_order
    }

    /// Number of distinct strength indexes in this family.
    pub fn len(&self) -> u32 {
        self.distinct
    }

    pub fn is_empty(&self) -> bool {
        self.distinct == 0
    }

    fn hash_ranks(ranks: &[Rank]) -> BigUint {
        ranks
            .iter()
            .map(|r| {
                let rank_char = r.to_string().chars().next().unwrap();
                BigUint::from(*RANK_MULTIPLIERS.get(&rank_char).unwrap_or(&1))
            })
            .product()
    }

    fn key(cards: &[Card]) -> (BigUint, bool) {
        let ranks: Vec<Rank> = Card::get_ranks(cards).collect();
        (Self::hash_ranks(&ranks), Card::are_suited(cards))
    }

    pub fn get_entry(&self, cards: &[Card]) -> Option<Entry> {
        self.entries.get(&Self::key(cards)).copied()
    }

    pub fn has_entry(&self, cards: &[Card]) -> bool {
        self.entries.contains_key(&Self::key(cards))
    }
}

/// Accumulates entries for one family, then re-indexes them contiguously.
#[derive(Default)]
struct LookupBuilder {
    entries: HashMap<(BigUint, bool), Entry>,
    entry_count: u32,
}

impl LookupBuilder {
    fn add_entry(&mut self, hash: BigUint, suitednesses: &[bool], label: Label) {
        let entry = Entry {
            index: self.entry_count,
            label,
        };
        self.entry_count += 1;
        for &suitedness in suitednesses {
            self.entries.insert((hash.clone(), suitedness), entry);
        }
    }

    /// Hashes for every hand matching a rank-multiplicity profile, weakest
    /// first under `rank_order`.
    fn hash_multisets(rank_order: &[Rank], counter: &mut BTreeMap<usize, usize>) -> Vec<BigUint> {
        if counter.is_empty() {
            return vec![BigUint::from(1u32)];
        }

        let (&multiplicity, &count) = counter.iter().next_back().unwrap();
        counter.remove(&multiplicity);

        let mut hashes = Vec::new();
        for samples in rank_order.iter().rev().combinations(count) {
            let sample_ranks: Vec<Rank> = samples.iter().map(|&&r| r).collect();
            let hash_part = LookupTable::hash_ranks(&sample_ranks).pow(multiplicity as u32);

            let remaining: Vec<Rank> = rank_order
                .iter()
                .filter(|r| !sample_ranks.contains(r))
                .cloned()
                .collect();

            for partial in Self::hash_multisets(&remaining, counter) {
                hashes.push(&hash_part * partial);
            }
        }

        counter.insert(multiplicity, count);
        hashes
    }

    fn add_multisets(
        &mut self,
        rank_order: &[Rank],
        counter: BTreeMap<usize, usize>,
        suitednesses: &[bool],
        label: Label,
    ) {
        let mut counter = counter;
        let hashes = Self::hash_multisets(rank_order, &mut counter);
        for hash in hashes.into_iter().rev() {
            self.add_entry(hash, suitednesses, label);
        }
    }

    /// All straights of `count` cards, low to high. `wheel` additionally
    /// treats the top rank as sitting below the bottom (A-2-3-4-5).
    fn add_straights(
        &mut self,
        rank_order: &[Rank],
        count: usize,
        wheel: bool,
        suitednesses: &[bool],
        label: Label,
    ) {
        if wheel {
            let mut wheel_ranks = vec![rank_order[rank_order.len() - 1]];
            wheel_ranks.extend_from_slice(&rank_order[..count - 1]);
            self.add_entry(LookupTable::hash_ranks(&wheel_ranks), suitednesses, label);
        }
        for i in 0..=(rank_order.len() - count) {
            self.add_entry(
                LookupTable::hash_ranks(&rank_order[i..i + count]),
                suitednesses,
                label,
            );
        }
    }

    fn build(mut self, rank_order: &'static [Rank]) -> LookupTable {
        let mut sorted_indices: Vec<u32> = self.entries.values().map(|e| e.index).collect();
        sorted_indices.sort_unstable();
        sorted_indices.dedup();

        let reset: HashMap<u32, u32> = sorted_indices
            .iter()
            .enumerate()
            .map(|(i, &old)| (old, i as u32))
            .collect();

        for entry in self.entries.values_mut() {
            entry.index = reset[&entry.index];
        }

        LookupTable {
            entries: self.entries,
            rank_order,
            distinct: sorted_indices.len() as u32,
        }
    }
}

fn build_standard_shape(rank_order: &'static [Rank], five_of_a_kind: bool) -> LookupTable {
    let mut b = LookupBuilder::default();
    b.add_multisets(rank_order, BTreeMap::from([(1, 5)]), &[false], Label::HighCard);
    b.add_multisets(rank_order, BTreeMap::from([(2, 1), (1, 3)]), &[false], Label::OnePair);
    b.add_multisets(rank_order, BTreeMap::from([(2, 2), (1, 1)]), &[false], Label::TwoPair);
    b.add_multisets(rank_order, BTreeMap::from([(3, 1), (1, 2)]), &[false], Label::ThreeOfAKind);
    b.add_straights(rank_order, 5, true, &[false], Label::Straight);
    b.add_multisets(rank_order, BTreeMap::from([(1, 5)]), &[true], Label::Flush);
    b.add_multisets(rank_order, BTreeMap::from([(3, 1), (2, 1)]), &[false], Label::FullHouse);
    b.add_multisets(rank_order, BTreeMap::from([(4, 1), (1, 1)]), &[false], Label::FourOfAKind);
    b.add_straights(rank_order, 5, true, &[true], Label::StraightFlush);
    if five_of_a_kind {
        b.add_multisets(rank_order, BTreeMap::from([(5, 1)]), &[false, true], Label::FiveOfAKind);
    }
    b.build(rank_order)
}

/// Flush-beats-full-house shape used by the stripped decks.
fn build_ffh_shape(rank_order: &'static [Rank], five_of_a_kind: bool) -> LookupTable {
    let mut b = LookupBuilder::default();
    b.add_multisets(rank_order, BTreeMap::from([(1, 5)]), &[false], Label::HighCard);
    b.add_multisets(rank_order, BTreeMap::from([(2, 1), (1, 3)]), &[false], Label::OnePair);
    b.add_multisets(rank_order, BTreeMap::from([(2, 2), (1, 1)]), &[false], Label::TwoPair);
    b.add_multisets(rank_order, BTreeMap::from([(3, 1), (1, 2)]), &[false], Label::ThreeOfAKind);
    b.add_straights(rank_order, 5, true, &[false], Label::Straight);
    b.add_multisets(rank_order, BTreeMap::from([(3, 1), (2, 1)]), &[false], Label::FullHouse);
    b.add_multisets(rank_order, BTreeMap::from([(1, 5)]), &[true], Label::Flush);
    b.add_multisets(rank_order, BTreeMap::from([(4, 1), (1, 1)]), &[false], Label::FourOfAKind);
    b.add_straights(rank_order, 5, true, &[true], Label::StraightFlush);
    if five_of_a_kind {
        b.add_multisets(rank_order, BTreeMap::from([(5, 1)]), &[false, true], Label::FiveOfAKind);
    }
    b.build(rank_order)
}

fn build_regular() -> LookupTable {
    let order: &'static [Rank] = &RankOrder::REGULAR;
    let mut b = LookupBuilder::default();
    b.add_multisets(order, BTreeMap::from([(1, 5)]), &[false, true], Label::HighCard);
    b.add_multisets(order, BTreeMap::from([(2, 1), (1, 3)]), &[false], Label::OnePair);
    b.add_multisets(order, BTreeMap::from([(2, 2), (1, 1)]), &[false], Label::TwoPair);
    b.add_multisets(order, BTreeMap::from([(3, 1), (1, 2)]), &[false], Label::ThreeOfAKind);
    b.add_multisets(order, BTreeMap::from([(3, 1), (2, 1)]), &[false], Label::FullHouse);
    b.add_multisets(order, BTreeMap::from([(4, 1), (1, 1)]), &[false], Label::FourOfAKind);
    b.build(order)
}

fn build_ace_to_six_low() -> LookupTable {
    let order: &'static [Rank] = &RankOrder::REGULAR;
    let mut b = LookupBuilder::default();
    b.add_multisets(order, BTreeMap::from([(1, 5)]), &[false], Label::HighCard);
    b.add_multisets(order, BTreeMap::from([(2, 1), (1, 3)]), &[false], Label::OnePair);
    b.add_multisets(order, BTreeMap::from([(2, 2), (1, 1)]), &[false], Label::TwoPair);
    b.add_multisets(order, BTreeMap::from([(3, 1), (1, 2)]), &[false], Label::ThreeOfAKind);
    // Ace plays low here, so A-2-3-4-5 is already the first window and no
    // wheel entry is needed.
    b.add_straights(order, 5, false, &[false], Label::Straight);
    b.add_multisets(order, BTreeMap::from([(1, 5)]), &[true], Label::Flush);
    b.add_multisets(order, BTreeMap::from([(3, 1), (2, 1)]), &[false], Label::FullHouse);
    b.add_multisets(order, BTreeMap::from([(4, 1), (1, 1)]), &[false], Label::FourOfAKind);
    b.add_straights(order, 5, false, &[true], Label::StraightFlush);
    b.build(order)
}

fn build_badugi(rank_order: &'static [Rank]) -> LookupTable {
    let mut b = LookupBuilder::default();
    // Sizes are added largest first: any four-card badugi outranks (sits
    // below, read low-first) every three-card hand, and so on down.
    for i in (1..=4).rev() {
        b.add_multisets(rank_order, BTreeMap::from([(1, i)]), &[i == 1], Label::Badugi);
    }
    b.build(rank_order)
}

fn build_two_card() -> LookupTable {
    let order: &'static [Rank] = &RankOrder::STANDARD;
    let mut b = LookupBuilder::default();
    b.add_multisets(order, BTreeMap::from([(1, 2)]), &[false, true], Label::HighCard);
    b.add_multisets(order, BTreeMap::from([(2, 1)]), &[false], Label::OnePair);
    b.build(order)
}

static STANDARD: Lazy<LookupTable> = Lazy::new(|| build_standard_shape(&RankOrder::STANDARD, false));
static STANDARD_WILD: Lazy<LookupTable> =
    Lazy::new(|| build_standard_shape(&RankOrder::STANDARD, true));
static REGULAR: Lazy<LookupTable> = Lazy::new(build_regular);
static ACE_TO_SIX_LOW: Lazy<LookupTable> = Lazy::new(build_ace_to_six_low);
static SHORT_6A_FFH: Lazy<LookupTable> = Lazy::new(|| build_ffh_shape(&RankOrder::SHORT_6A, false));
static SHORT_27_JA_FFH_WILD: Lazy<LookupTable> =
    Lazy::new(|| build_ffh_shape(&RankOrder::SHORT_27_JA, true));
static SHORT_TA: Lazy<LookupTable> = Lazy::new(|| build_standard_shape(&RankOrder::SHORT_TA, false));
static BADUGI: Lazy<LookupTable> = Lazy::new(|| build_badugi(&RankOrder::REGULAR));
static BADUGI_AH: Lazy<LookupTable> = Lazy::new(|| build_badugi(&RankOrder::STANDARD));
static TWO_CARD: Lazy<LookupTable> = Lazy::new(build_two_card);

/// The shared table for a family, built on first access.
pub fn table(family: LookupFamily) -> &'static LookupTable {
    match family {
        LookupFamily::Standard => &STANDARD,
        LookupFamily::StandardWild => &STANDARD_WILD,
        LookupFamily::Regular => &REGULAR,
        LookupFamily::AceToSixLow => &ACE_TO_SIX_LOW,
        LookupFamily::Short6AFfh => &SHORT_6A_FFH,
        LookupFamily::Short27JaFfhWild => &SHORT_27_JA_FFH_WILD,
        LookupFamily::ShortTa => &SHORT_TA,
        LookupFamily::Badugi => &BADUGI,
        LookupFamily::BadugiAh => &BADUGI_AH,
        LookupFamily::TwoCard => &TWO_CARD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Card;

    fn entry(family: LookupFamily, cards: &str) -> Entry {
        table(family)
            .get_entry(&Card::parse_cards(cards).unwrap())
            .unwrap()
    }

    #[test]
    fn standard_orders_classic_hands() {
        let high_card = entry(LookupFamily::Standard, "As Kh 9d 5c 2s");
        let pair = entry(LookupFamily::Standard, "As Ah 9d 5c 2s");
        let flush = entry(LookupFamily::Standard, "As Ks 9s 5s 2s");
        let boat = entry(LookupFamily::Standard, "As Ah Ad Ks Kh");
        assert!(high_card < pair);
        assert!(pair < flush);
        assert!(flush < boat);
        assert_eq!(flush.label, Label::Flush);
    }

    #[test]
    fn wheel_is_the_weakest_straight() {
        let wheel = entry(LookupFamily::Standard, "Ah 2c 3d 4s 5h");
        let six_high = entry(LookupFamily::Standard, "2c 3d 4s 5h 6c");
        let broadway = entry(LookupFamily::Standard, "Th Jc Qd Ks Ah");
        assert_eq!(wheel.label, Label::Straight);
        assert!(wheel < six_high);
        assert!(six_high < broadway);
    }

    #[test]
    fn wild_family_puts_five_of_a_kind_on_top() {
        let quints = entry(LookupFamily::StandardWild, "As Ah Ad Ac As");
        let royal = entry(LookupFamily::StandardWild, "Ts Js Qs Ks As");
        assert_eq!(quints.label, Label::FiveOfAKind);
        assert!(royal < quints);
        assert!(table(LookupFamily::Standard)
            .get_entry(&Card::parse_cards("As Ah Ad Ac As").unwrap())
            .is_none());
    }

    #[test]
    fn regular_low_ignores_straights_and_flushes() {
        let wheel = entry(LookupFamily::Regular, "Ah 2c 3d 4s 5h");
        let suited_wheel = entry(LookupFamily::Regular, "Ah 2h 3h 4h 5h");
        assert_eq!(wheel.index, suited_wheel.index);
        // Best possible low sits at index zero.
        assert_eq!(wheel.index, 0);
    }

    #[test]
    fn eight_or_better_spans_the_first_56_lows() {
        // C(8,5) distinct eight-or-better lows occupy indexes 0..56.
        let worst_qualifier = entry(LookupFamily::Regular, "4h 5c 6d 7s 8h");
        let best_nine_low = entry(LookupFamily::Regular, "Ah 2c 3d 4s 9h");
        assert_eq!(worst_qualifier.index, 55);
        assert_eq!(best_nine_low.index, 56);
    }

    #[test]
    fn ffh_ranks_flush_above_full_house() {
        let flush = entry(LookupFamily::Short6AFfh, "As Ks 9s 7s 6s");
        let boat = entry(LookupFamily::Short6AFfh, "As Ah Ad Ks Kh");
        assert!(boat < flush);
    }

    #[test]
    fn badugi_prefers_more_cards_then_lower_ranks() {
        let four = entry(LookupFamily::Badugi, "Ah 2c 3d 4s");
        let rough_four = entry(LookupFamily::Badugi, "Th Jc Qd Ks");
        let three = entry(LookupFamily::Badugi, "Ah 2c 3d");
        assert!(four < rough_four);
        assert!(rough_four < three);
    }

    #[test]
    fn badugi_rejects_paired_or_suited_sets() {
        let t = table(LookupFamily::Badugi);
        assert!(t.get_entry(&Card::parse_cards("Ah Ac 3d 4s").unwrap()).is_none());
        assert!(t.get_entry(&Card::parse_cards("Ah 3h").unwrap()).is_none());
    }

    #[test]
    fn two_card_pairs_beat_high_cards() {
        let aces = entry(LookupFamily::TwoCard, "As Ah");
        let ace_king = entry(LookupFamily::TwoCard, "As Kh");
        let deuces = entry(LookupFamily::TwoCard, "2s 2h");
        assert!(ace_king < deuces);
        assert!(deuces < aces);
    }

    #[test]
    fn ace_to_six_low_counts_straights() {
        let t = table(LookupFamily::AceToSixLow);
        let wheel = t
            .get_entry(&Card::parse_cards("Ah 2c 3d 4s 5h").unwrap())
            .unwrap();
        assert_eq!(wheel.label, Label::Straight);
        // 6-4-3-2-A is the best ace-to-six low.
        let best = t
            .get_entry(&Card::parse_cards("Ah 2c 3d 4s 6h").unwrap())
            .unwrap();
        assert_eq!(best.label, Label::HighCard);
        assert_eq!(best.index, 0);
    }
}
