//! The rules document model.
//!
//! A variant is described entirely by a JSON document: forced bets, the
//! ordered gameplay step list, and the showdown configuration. This module
//! parses that document into an immutable, fully typed [`Rules`] value and
//! validates the document-level invariants at load time. The engine never
//! touches raw JSON after this point; every step kind is a closed enum
//! variant and every use site matches exhaustively.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};

use crate::cards::{DeckType, Rank, Visibility};
use crate::errors::RulesError;
use crate::evaluator::EvaluationType;

/// Chip quantity. Stacks, bets and pots all use this alias.
pub type Chips = i64;

/// A parsed, validated variant document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rules {
    pub game: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
    pub players: PlayerBounds,
    pub deck: DeckSpec,
    #[serde(rename = "bettingStructures")]
    pub betting_structures: Vec<BettingStructure>,
    #[serde(rename = "forcedBets")]
    pub forced_bets: ForcedBets,
    #[serde(rename = "bettingOrder", default)]
    pub betting_order: BettingOrder,
    #[serde(rename = "gamePlay")]
    pub game_play: Vec<Step>,
    pub showdown: ShowdownRules,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerBounds {
    pub min: usize,
    pub max: usize,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeckSpec {
    #[serde(rename = "type")]
    pub deck_type: DeckType,
    pub cards: usize,
    #[serde(default)]
    pub jokers: usize,
}

/// Betting structure names accepted by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BettingStructure {
    #[serde(rename = "Limit")]
    Limit,
    #[serde(rename = "No Limit", alias = "NoLimit")]
    NoLimit,
    #[serde(rename = "Pot Limit", alias = "PotLimit")]
    PotLimit,
}

impl fmt::Display for BettingStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BettingStructure::Limit => write!(f, "Limit"),
            BettingStructure::NoLimit => write!(f, "No Limit"),
            BettingStructure::PotLimit => write!(f, "Pot Limit"),
        }
    }
}

/// How the pot is seeded before any voluntary betting.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "style", deny_unknown_fields)]
pub enum ForcedBets {
    #[serde(rename = "blinds")]
    Blinds {
        /// Extra blinds beyond small/big, as multiples of the big blind,
        /// posted by the players after the big blind in order.
        #[serde(default, rename = "additionalBlinds")]
        additional_blinds: Vec<i64>,
    },
    #[serde(rename = "bring-in")]
    BringIn {
        rule: BringInRule,
        #[serde(default, rename = "bringInEval")]
        bring_in_eval: Option<EvaluationType>,
    },
    #[serde(rename = "antes_only")]
    AntesOnly,
    /// Resolved after the CHOOSE step: the chosen value picks a case.
    #[serde(rename = "conditional")]
    Conditional {
        /// Which stored choice key to inspect.
        value: String,
        cases: BTreeMap<String, Box<ForcedBets>>,
        default: Box<ForcedBets>,
    },
}

/// Which exposed card owes the bring-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BringInRule {
    #[serde(rename = "low card")]
    LowCard,
    #[serde(rename = "high card")]
    HighCard,
    #[serde(rename = "high card ah wild")]
    HighCardAhWild,
}

/// First-to-act rules for the initial and subsequent betting rounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BettingOrder {
    pub initial: OrderRule,
    pub subsequent: OrderRule,
}

impl Default for BettingOrder {
    fn default() -> Self {
        Self {
            initial: OrderRule::Fixed(PositionRule::AfterBigBlind),
            subsequent: OrderRule::Fixed(PositionRule::LeftOfDealer),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrderRule {
    Fixed(PositionRule),
    Conditional {
        value: String,
        cases: BTreeMap<String, PositionRule>,
        default: PositionRule,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PositionRule {
    #[serde(rename = "after_big_blind")]
    AfterBigBlind,
    #[serde(rename = "dealer")]
    Dealer,
    #[serde(rename = "left_of_dealer")]
    LeftOfDealer,
    #[serde(rename = "bring_in")]
    BringIn,
    #[serde(rename = "high_hand")]
    HighHand,
}

/// One entry of the gameplay sequence.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub name: String,
    #[serde(default)]
    pub conditional_state: Option<ConditionalAction>,
    #[serde(flatten)]
    pub action: StepAction,
}

/// A sub-action inside `groupedActions`; its name is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct SubStep {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub action: StepAction,
}

/// Exactly one of these keys appears on each step object.
#[derive(Debug, Clone, Deserialize)]
pub enum StepAction {
    #[serde(rename = "bet")]
    Bet(BetSpec),
    #[serde(rename = "deal")]
    Deal(DealSpec),
    #[serde(rename = "draw")]
    Draw(DrawSpec),
    #[serde(rename = "discard")]
    Discard(DiscardSpec),
    #[serde(rename = "expose")]
    Expose(ExposeSpec),
    #[serde(rename = "pass")]
    Pass(PassSpec),
    #[serde(rename = "separate")]
    Separate(SeparateSpec),
    #[serde(rename = "declare")]
    Declare(DeclareSpec),
    #[serde(rename = "choose")]
    Choose(ChooseSpec),
    #[serde(rename = "replace_community")]
    ReplaceCommunity(ReplaceCommunitySpec),
    #[serde(rename = "remove")]
    Remove(RemoveSpec),
    #[serde(rename = "roll_die")]
    RollDie(RollDieSpec),
    #[serde(rename = "showdown")]
    Showdown(ShowdownStepSpec),
    #[serde(rename = "groupedActions")]
    Grouped(Vec<SubStep>),
}

impl StepAction {
    /// Short tag used in logs and events.
    pub fn kind(&self) -> &'static str {
        match self {
            StepAction::Bet(_) => "bet",
            StepAction::Deal(_) => "deal",
            StepAction::Draw(_) => "draw",
            StepAction::Discard(_) => "discard",
            StepAction::Expose(_) => "expose",
            StepAction::Pass(_) => "pass",
            StepAction::Separate(_) => "separate",
            StepAction::Declare(_) => "declare",
            StepAction::Choose(_) => "choose",
            StepAction::ReplaceCommunity(_) => "replace_community",
            StepAction::Remove(_) => "remove",
            StepAction::RollDie(_) => "roll_die",
            StepAction::Showdown(_) => "showdown",
            StepAction::Grouped(_) => "grouped",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BetSpec {
    #[serde(rename = "type")]
    pub bet_type: BetType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BetType {
    #[serde(rename = "blinds")]
    Blinds,
    #[serde(rename = "antes")]
    Antes,
    #[serde(rename = "bring-in")]
    BringIn,
    #[serde(rename = "small")]
    Small,
    #[serde(rename = "big")]
    Big,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DealSpec {
    pub location: DealLocation,
    pub cards: Vec<DealCardSpec>,
    #[serde(default, rename = "wildCards")]
    pub wild_cards: Vec<WildCardRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DealLocation {
    #[serde(rename = "player")]
    Player,
    #[serde(rename = "community")]
    Community,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DealCardSpec {
    pub number: usize,
    pub state: Visibility,
    /// Hole subset or community region receiving the cards.
    #[serde(default)]
    pub subset: Option<String>,
    #[serde(default, rename = "wildCards")]
    pub wild_cards: Vec<WildCardRule>,
    /// Overrides `state` based on table conditions at deal time.
    #[serde(default)]
    pub conditional_state: Option<ConditionalVisibility>,
    /// Fee a player may pay to keep this card face down.
    #[serde(default)]
    pub protection_option: Option<ProtectionOption>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtectionOption {
    pub fee: Chips,
}

/// A wildcard rule registered when its deal step runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", deny_unknown_fields)]
pub enum WildCardRule {
    #[serde(rename = "joker")]
    Joker {
        #[serde(default)]
        role: WildRoleSpec,
        #[serde(default)]
        scope: Option<WildScope>,
    },
    #[serde(rename = "rank")]
    Rank {
        rank: Rank,
        #[serde(default)]
        role: WildRoleSpec,
        #[serde(default)]
        scope: Option<WildScope>,
    },
    /// Each player's lowest hole card (and every card of that rank they
    /// hold) is wild for them.
    #[serde(rename = "lowest_hole")]
    LowestHole {
        #[serde(default)]
        role: WildRoleSpec,
        #[serde(default)]
        scope: Option<WildScope>,
    },
}

impl WildCardRule {
    pub fn scope(&self) -> Option<WildScope> {
        match self {
            WildCardRule::Joker { scope, .. }
            | WildCardRule::Rank { scope, .. }
            | WildCardRule::LowestHole { scope, .. } => *scope,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum WildRoleSpec {
    #[default]
    #[serde(rename = "wild")]
    Wild,
    #[serde(rename = "bug")]
    Bug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum WildScope {
    #[serde(rename = "global")]
    Global,
    #[serde(rename = "player")]
    Player,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DrawSpec {
    pub cards: Vec<DrawCardSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DrawCardSpec {
    /// Maximum cards a player may exchange.
    pub number: usize,
    #[serde(default)]
    pub min_number: Option<usize>,
    /// Visibility of the replacement cards unless `preserve_state` is set.
    #[serde(default)]
    pub state: Option<Visibility>,
    #[serde(default)]
    pub hole_subset: Option<String>,
    /// Replacements inherit the visibility of the card they replace.
    #[serde(default)]
    pub preserve_state: bool,
    #[serde(default)]
    pub rule: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscardSpec {
    pub cards: Vec<DiscardCardSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscardCardSpec {
    pub number: usize,
    #[serde(default)]
    pub min_number: Option<usize>,
    #[serde(default)]
    pub state: Option<Visibility>,
    #[serde(default)]
    pub hole_subset: Option<String>,
    #[serde(default)]
    pub rule: Option<String>,
    #[serde(default, rename = "discardLocation")]
    pub discard_location: DiscardLocation,
    /// Community region receiving the discards when the location is
    /// `community`.
    #[serde(default, rename = "discardSubset")]
    pub discard_subset: Option<String>,
    /// The whole named subset goes at once; `number` is ignored.
    #[serde(default)]
    pub entire_subset: bool,
    #[serde(default, rename = "oncePerStep")]
    pub once_per_step: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DiscardLocation {
    #[default]
    #[serde(rename = "muck")]
    Muck,
    #[serde(rename = "community")]
    Community,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExposeSpec {
    pub cards: Vec<ExposeCardSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExposeCardSpec {
    pub number: usize,
    #[serde(default)]
    pub min_number: Option<usize>,
    /// Visibility a card must currently have to be exposable.
    #[serde(default)]
    pub state: Option<Visibility>,
    /// Flip as each player acts rather than all at once at step end.
    #[serde(default)]
    pub immediate: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PassSpec {
    pub direction: PassDirection,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PassDirection {
    #[serde(rename = "left")]
    Left,
    #[serde(rename = "right")]
    Right,
    #[serde(rename = "across")]
    Across,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeparateSpec {
    pub cards: Vec<SeparateTarget>,
    #[serde(default)]
    pub visibility_requirements: Vec<VisibilityRequirement>,
    /// Present in some documents but only partially specified upstream;
    /// rejected at load.
    #[serde(default)]
    pub hand_comparison: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeparateTarget {
    pub hole_subset: String,
    pub number: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VisibilityRequirement {
    pub hole_subset: String,
    #[serde(default)]
    pub min_face_down: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclareSpec {
    pub options: Vec<Declaration>,
    #[serde(default)]
    pub per_pot: bool,
    pub simultaneous: bool,
}

/// Which pot portions a player contests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Declaration {
    #[serde(rename = "high")]
    High,
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "high_low")]
    HighLow,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChooseSpec {
    pub possible_values: Vec<String>,
    /// Key the chosen value is stored under in `game_choices`.
    pub value: String,
    pub chooser: Chooser,
    pub default: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Chooser {
    #[serde(rename = "dealer")]
    Dealer,
    #[serde(rename = "left_of_dealer")]
    LeftOfDealer,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplaceCommunitySpec {
    #[serde(rename = "cardsToReplace")]
    pub cards_to_replace: usize,
    pub order: ReplaceOrder,
    #[serde(rename = "startingFrom")]
    pub starting_from: PositionRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ReplaceOrder {
    #[serde(rename = "clockwise")]
    Clockwise,
    #[serde(rename = "counterclockwise")]
    Counterclockwise,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoveSpec {
    #[serde(rename = "type")]
    pub kind: RemoveKind,
    pub criteria: RemoveCriteria,
    pub subsets: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RemoveKind {
    #[serde(rename = "community_cards")]
    CommunityCards,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RemoveCriteria {
    /// Prune the region holding the lowest card, unless every candidate
    /// region ties on rank.
    #[serde(rename = "lowest_card")]
    LowestCard,
    #[serde(rename = "highest_card")]
    HighestCard,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RollDieSpec {
    /// Community scalar region the rolled value is stored under.
    pub subset: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShowdownStepSpec {
    #[serde(rename = "type")]
    pub kind: ShowdownKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ShowdownKind {
    #[serde(rename = "final")]
    Final,
    #[serde(rename = "intermediate")]
    Intermediate,
}

// ---------------------------------------------------------------------------
// Conditional states
// ---------------------------------------------------------------------------

/// Step-level conditional: run, skip, or swap in an alternative.
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionalAction {
    #[serde(flatten)]
    pub trigger: Trigger,
    pub true_state: BranchState,
    pub false_state: BranchState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BranchState {
    #[serde(rename = "execute")]
    Execute,
    #[serde(rename = "skip")]
    Skip,
}

/// Card-level conditional: pick the visibility a card is dealt with.
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionalVisibility {
    #[serde(flatten)]
    pub trigger: Trigger,
    pub true_state: Visibility,
    pub false_state: Visibility,
}

/// The closed set of condition trigger kinds.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Trigger {
    /// Compares a stored CHOOSE result against `matches`.
    #[serde(rename = "player_choice")]
    PlayerChoice { value: String, matches: String },
    /// Counts cards on a named community region matching the predicate.
    #[serde(rename = "board_composition")]
    BoardComposition {
        subset: String,
        #[serde(default)]
        color: Option<CardColor>,
        #[serde(default)]
        suit: Option<crate::cards::Suit>,
        #[serde(default)]
        rank: Option<Rank>,
        #[serde(default = "one")]
        min_count: usize,
    },
    /// Compares a community scalar (e.g. a die roll) against a value.
    #[serde(rename = "community_card_value")]
    CommunityCardValue { subset: String, equals: i64 },
    #[serde(rename = "player_hand_size")]
    PlayerHandSize { equals: usize },
    #[serde(rename = "all_exposed")]
    AllExposed {},
    #[serde(rename = "any_exposed")]
    AnyExposed {},
    #[serde(rename = "none_exposed")]
    NoneExposed {},
}

fn one() -> usize {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CardColor {
    #[serde(rename = "red")]
    Red,
    #[serde(rename = "black")]
    Black,
}

// ---------------------------------------------------------------------------
// Showdown configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShowdownRules {
    #[serde(default)]
    pub order: Option<ReplaceOrder>,
    #[serde(default, rename = "startingFrom")]
    pub starting_from: Option<PositionRule>,
    /// Descriptive only; mirrored into views.
    #[serde(default, rename = "cardsRequired")]
    pub cards_required: Option<String>,
    #[serde(default)]
    pub declaration_mode: DeclarationMode,
    #[serde(default)]
    pub classification_priority: Vec<String>,
    #[serde(default, rename = "globalDefaultAction")]
    pub global_default_action: Option<UnqualifiedAction>,
    #[serde(default, rename = "bestHand")]
    pub best_hand: Vec<HandConfig>,
    #[serde(default, rename = "conditionalBestHands")]
    pub conditional_best_hands: Vec<ConditionalBestHand>,
    #[serde(default, rename = "defaultBestHand")]
    pub default_best_hand: Vec<HandConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DeclarationMode {
    #[default]
    #[serde(rename = "cards_speak")]
    CardsSpeak,
    #[serde(rename = "declare")]
    Declare,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionalBestHand {
    #[serde(flatten)]
    pub trigger: Trigger,
    #[serde(rename = "bestHand")]
    pub best_hand: Vec<HandConfig>,
}

/// One pot-portion line of the showdown.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "evaluationType")]
    pub evaluation_type: EvaluationType,
    /// Any mix of hole and community cards totaling this count.
    #[serde(default, rename = "anyCards")]
    pub any_cards: Option<usize>,
    #[serde(default, rename = "holeCards")]
    pub hole_cards: Option<CardCount>,
    #[serde(default, rename = "communityCards")]
    pub community_cards: Option<usize>,
    #[serde(default)]
    pub combinations: Vec<ComboSpec>,
    /// Concrete multi-region picks, e.g. `[["Flop 1", "Turn 1", "River"]]`.
    #[serde(default, rename = "communityCardCombinations")]
    pub community_card_combinations: Vec<Vec<String>>,
    /// Per-region (min, max) picks, e.g. `[[["Flop 1", 1, 1], ["Turn", 0, 1]]]`.
    #[serde(default, rename = "communityCardSelectCombinations")]
    pub community_card_select_combinations: Vec<Vec<RegionPick>>,
    #[serde(default, rename = "communitySubsetRequirements")]
    pub community_subset_requirements: Vec<SubsetRequirement>,
    /// `[low, high]` window into the evaluator's global ordering.
    #[serde(default)]
    pub qualifier: Option<(u32, u32)>,
    #[serde(default, rename = "wildCards")]
    pub wild_cards: Vec<WildCardRule>,
    /// Restrict community cards to one named region.
    #[serde(default)]
    pub community_subset: Option<String>,
    /// Restrict hole cards to the union of these subsets.
    #[serde(default, rename = "holeCardsAllowed")]
    pub hole_cards_allowed: Vec<String>,
    /// Variable-handsize branches keyed by current hand size.
    #[serde(default, rename = "playerHandSize")]
    pub player_hand_size: Vec<HandSizeBranch>,
    /// What happens to this line's share when nobody qualifies.
    #[serde(default, rename = "defaultAction")]
    pub default_action: Option<UnqualifiedAction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComboSpec {
    #[serde(rename = "holeCards")]
    pub hole_cards: usize,
    #[serde(rename = "communityCards")]
    pub community_cards: usize,
    #[serde(default)]
    pub community_subset: Option<String>,
}

/// `(region, min, max)` pick, serialized as a three-element array.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionPick(pub String, pub usize, pub usize);

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubsetRequirement {
    pub subset: String,
    pub count: usize,
    pub required: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandSizeBranch {
    pub size: usize,
    #[serde(rename = "holeCards")]
    pub hole_cards: CardCount,
    #[serde(rename = "communityCards")]
    pub community_cards: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum UnqualifiedAction {
    /// The unclaimed share joins the opposite/next line.
    #[serde(rename = "to_other_line")]
    ToOtherLine,
    /// The unclaimed share goes to the best high hand overall.
    #[serde(rename = "best_high")]
    BestHigh,
}

/// `holeCards` accepts a number or the string `"all"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardCount {
    All,
    Exact(usize),
}

impl<'de> Deserialize<'de> for CardCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            N(usize),
            S(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::N(n) => Ok(CardCount::Exact(n)),
            Raw::S(s) if s == "all" => Ok(CardCount::All),
            Raw::S(s) => Err(D::Error::custom(format!(
                "expected a number or \"all\", got '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl Rules {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_str(&text)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Result<Self, RulesError> {
        let rules: Rules = serde_json::from_str(text)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, RulesError> {
        let rules: Rules = serde_json::from_value(value)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Every step, grouped sub-actions flattened in order.
    pub fn flat_actions(&self) -> impl Iterator<Item = &StepAction> {
        self.game_play.iter().flat_map(|step| match &step.action {
            StepAction::Grouped(subs) => {
                subs.iter().map(|s| &s.action).collect::<Vec<_>>()
            }
            other => vec![other],
        })
    }

    fn validate(&self) -> Result<(), RulesError> {
        if self.players.min < 2 || self.players.max < self.players.min {
            return Err(RulesError::Invalid(format!(
                "player bounds {}..{} are not sensible",
                self.players.min, self.players.max
            )));
        }
        if self.betting_structures.is_empty() {
            return Err(RulesError::Invalid(
                "bettingStructures must not be empty".into(),
            ));
        }
        if self.deck.cards != self.deck.deck_type.size() {
            return Err(RulesError::Invalid(format!(
                "deck declares {} cards but type '{}' has {}",
                self.deck.cards,
                self.deck.deck_type,
                self.deck.deck_type.size()
            )));
        }

        let final_showdowns = self
            .flat_actions()
            .filter(|a| matches!(a, StepAction::Showdown(s) if s.kind == ShowdownKind::Final))
            .count();
        if final_showdowns != 1 {
            return Err(RulesError::Invalid(format!(
                "expected exactly one final showdown step, found {final_showdowns}"
            )));
        }

        let choose_indices: Vec<usize> = self
            .game_play
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s.action, StepAction::Choose(_)))
            .map(|(i, _)| i)
            .collect();
        if choose_indices.len() > 1 {
            return Err(RulesError::Invalid(
                "at most one choose step is permitted".into(),
            ));
        }
        let choose_at = choose_indices.first().copied();
        for (i, step) in self.game_play.iter().enumerate() {
            let depends = matches!(
                &step.conditional_state,
                Some(c) if matches!(c.trigger, Trigger::PlayerChoice { .. })
            );
            if depends {
                match choose_at {
                    Some(at) if at < i => {}
                    _ => {
                        return Err(RulesError::Invalid(format!(
                            "step '{}' conditions on a player choice but no choose step precedes it",
                            step.name
                        )))
                    }
                }
            }
        }
        let wants_choice = matches!(self.forced_bets, ForcedBets::Conditional { .. })
            || matches!(self.betting_order.initial, OrderRule::Conditional { .. })
            || matches!(self.betting_order.subsequent, OrderRule::Conditional { .. })
            || self
                .showdown
                .conditional_best_hands
                .iter()
                .any(|c| matches!(c.trigger, Trigger::PlayerChoice { .. }));
        if wants_choice && choose_at.is_none() {
            return Err(RulesError::Invalid(
                "conditional configuration requires a choose step".into(),
            ));
        }

        let bring_in_possible = self.forced_bets.may_bring_in();
        let has_bring_in_bet = self
            .flat_actions()
            .any(|a| matches!(a, StepAction::Bet(b) if b.bet_type == BetType::BringIn));
        if has_bring_in_bet && !bring_in_possible {
            return Err(RulesError::Invalid(
                "bet{bring-in} requires forcedBets style bring-in".into(),
            ));
        }

        let mut peak_cards = 0usize;
        for action in self.flat_actions() {
            if let StepAction::Deal(deal) = action {
                let per_target: usize = deal.cards.iter().map(|c| c.number).sum();
                peak_cards += match deal.location {
                    DealLocation::Player => per_target * self.players.max,
                    DealLocation::Community => per_target,
                };
            }
        }
        let deck_total = self.deck.cards + self.deck.jokers;
        if peak_cards > deck_total {
            return Err(RulesError::Invalid(format!(
                "gameplay deals up to {peak_cards} simultaneous cards but the deck has {deck_total}"
            )));
        }

        for action in self.flat_actions() {
            match action {
                StepAction::Separate(sep) if sep.hand_comparison.is_some() => {
                    return Err(RulesError::UnsupportedFeature(
                        "separate.hand_comparison".into(),
                    ));
                }
                StepAction::Draw(draw) => {
                    if let Some(rule) = draw.cards.iter().find_map(|c| c.rule.as_deref()) {
                        return Err(RulesError::UnsupportedFeature(format!(
                            "draw rule '{rule}'"
                        )));
                    }
                }
                StepAction::Discard(discard) => {
                    if let Some(rule) = discard.cards.iter().find_map(|c| c.rule.as_deref()) {
                        return Err(RulesError::UnsupportedFeature(format!(
                            "discard rule '{rule}'"
                        )));
                    }
                    for card in &discard.cards {
                        if card.discard_location == DiscardLocation::Community
                            && card.discard_subset.is_none()
                        {
                            return Err(RulesError::Invalid(
                                "community discard requires a discardSubset".into(),
                            ));
                        }
                    }
                }
                StepAction::Deal(deal) => {
                    for rule in deal
                        .wild_cards
                        .iter()
                        .chain(deal.cards.iter().flat_map(|c| c.wild_cards.iter()))
                    {
                        if rule.scope() == Some(WildScope::Player) {
                            return Err(RulesError::UnsupportedFeature(
                                "player-scoped wildcards".into(),
                            ));
                        }
                    }
                }
                StepAction::Choose(choose) => {
                    if !choose.possible_values.contains(&choose.default) {
                        return Err(RulesError::Invalid(format!(
                            "choose default '{}' is not among its possible values",
                            choose.default
                        )));
                    }
                }
                _ => {}
            }
        }

        for config in self.showdown.all_hand_configs() {
            if config
                .wild_cards
                .iter()
                .any(|r| r.scope() == Some(WildScope::Player))
            {
                return Err(RulesError::UnsupportedFeature(
                    "player-scoped wildcards".into(),
                ));
            }
            if let Some((lo, hi)) = config.qualifier {
                if lo > hi {
                    return Err(RulesError::Invalid(format!(
                        "qualifier window [{lo}, {hi}] is inverted"
                    )));
                }
            }
        }
        if self.showdown.best_hand.is_empty() && self.showdown.default_best_hand.is_empty() {
            return Err(RulesError::Invalid(
                "showdown requires bestHand or defaultBestHand".into(),
            ));
        }
        if !self.showdown.conditional_best_hands.is_empty()
            && self.showdown.default_best_hand.is_empty()
        {
            return Err(RulesError::Invalid(
                "conditionalBestHands requires a defaultBestHand".into(),
            ));
        }

        Ok(())
    }
}

impl ForcedBets {
    /// Whether a bring-in can ever be owed under this configuration.
    pub fn may_bring_in(&self) -> bool {
        match self {
            ForcedBets::BringIn { .. } => true,
            ForcedBets::Conditional { cases, default, .. } => {
                default.may_bring_in() || cases.values().any(|c| c.may_bring_in())
            }
            _ => false,
        }
    }
}

impl ShowdownRules {
    /// Every hand config reachable from this showdown, conditional or not.
    pub fn all_hand_configs(&self) -> impl Iterator<Item = &HandConfig> {
        self.best_hand
            .iter()
            .chain(self.default_best_hand.iter())
            .chain(self.conditional_best_hands.iter().flat_map(|c| c.best_hand.iter()))
    }
}
