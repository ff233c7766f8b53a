//! Player-facing action types and the hand event log.
//!
//! Everything a driver sends into the engine or reads back out of it is
//! defined here: the action vocabulary, the legal-action options surfaced
//! per turn, the result of submitting an action, and the ordered event log
//! every hand appends to.

use serde::Serialize;

use crate::cards::Card;
use crate::errors::ActionError;
use crate::rules::{Chips, Declaration};

/// Stable player identifier chosen by the driver.
pub type PlayerId = String;

/// Coarse phase of a hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    /// No hand is running.
    Waiting,
    /// A voluntary betting round wants input.
    Betting,
    /// The engine is distributing cards.
    Dealing,
    /// A non-wager step (draw, discard, expose, pass, separate, declare,
    /// choose, replace) wants input.
    Drawing,
    Showdown,
    Complete,
}

/// Everything a player can be asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    PostBringIn,
    /// Exchange the named cards for replacements.
    Draw,
    /// Decline to draw.
    StandPat,
    Discard,
    Expose,
    Pass,
    Separate,
    Declare,
    Choose,
    ReplaceCommunity,
    /// Decline an optional card action.
    Skip,
}

/// One legal action for the player to act, with its bounds.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOption {
    pub kind: ActionKind,
    /// For bets and raises: the smallest legal *to* amount. For calls: the
    /// amount that will be taken.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Chips>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Chips>,
    /// For card actions: how many cards must accompany the action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cards_min: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cards_max: Option<usize>,
    /// For choose steps: the values on offer.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl ActionOption {
    pub fn simple(kind: ActionKind) -> Self {
        Self {
            kind,
            min: None,
            max: None,
            cards_min: None,
            cards_max: None,
            values: Vec::new(),
        }
    }

    pub fn chips(kind: ActionKind, min: Chips, max: Chips) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            ..Self::simple(kind)
        }
    }

    pub fn cards(kind: ActionKind, min: usize, max: usize) -> Self {
        Self {
            cards_min: Some(min),
            cards_max: Some(max),
            ..Self::simple(kind)
        }
    }
}

/// A submitted player action.
#[derive(Debug, Clone, Default)]
pub struct PlayerAction {
    pub amount: Option<Chips>,
    pub cards: Vec<Card>,
    pub declaration: Option<Declaration>,
    pub choice: Option<String>,
}

impl PlayerAction {
    pub fn amount(amount: Chips) -> Self {
        Self {
            amount: Some(amount),
            ..Self::default()
        }
    }

    pub fn cards(cards: Vec<Card>) -> Self {
        Self {
            cards,
            ..Self::default()
        }
    }
}

/// Outcome of `player_action`: either the hand advanced or the input was
/// rejected with state untouched.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionErrorKind>,
    pub state: GamePhase,
    /// Events appended by this action, in order.
    pub events: Vec<Event>,
}

/// Serializable mirror of [`ActionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActionErrorKind {
    NotYourTurn,
    ActionNotLegal,
    AmountOutOfRange,
    IllegalCardSelection,
    NoDeclaration,
    AmbiguousDeclaration,
    InsufficientChips,
}

impl From<ActionError> for ActionErrorKind {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::NotYourTurn => ActionErrorKind::NotYourTurn,
            ActionError::ActionNotLegal => ActionErrorKind::ActionNotLegal,
            ActionError::AmountOutOfRange => ActionErrorKind::AmountOutOfRange,
            ActionError::IllegalCardSelection => ActionErrorKind::IllegalCardSelection,
            ActionError::NoDeclaration => ActionErrorKind::NoDeclaration,
            ActionError::AmbiguousDeclaration => ActionErrorKind::AmbiguousDeclaration,
            ActionError::InsufficientChips => ActionErrorKind::InsufficientChips,
        }
    }
}

/// One observable occurrence within a hand. The log is strictly ordered
/// and, with the deck seed, replays the hand bit for bit.
#[derive(Debug, Clone, Serialize)]
pub enum Event {
    HandStarted {
        variant: String,
        dealer_seat: usize,
    },
    ForcedBet {
        player: PlayerId,
        kind: ForcedBetKind,
        amount: Chips,
        all_in: bool,
    },
    DealtHole {
        player: PlayerId,
        subset: String,
        count: usize,
        face_up: Vec<Card>,
    },
    DealtCommunity {
        region: String,
        cards: Vec<Card>,
    },
    Acted {
        player: PlayerId,
        kind: ActionKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        amount: Option<Chips>,
    },
    Drew {
        player: PlayerId,
        discarded: usize,
        drawn: usize,
    },
    Discarded {
        player: PlayerId,
        count: usize,
    },
    Exposed {
        player: PlayerId,
        cards: Vec<Card>,
    },
    Passed {
        from: PlayerId,
        to: PlayerId,
        count: usize,
    },
    Separated {
        player: PlayerId,
    },
    Declared {
        player: PlayerId,
    },
    DeclarationsRevealed {
        declarations: Vec<(PlayerId, Declaration)>,
    },
    Chose {
        player: PlayerId,
        key: String,
        value: String,
    },
    DieRolled {
        subset: String,
        value: i64,
    },
    RegionRemoved {
        region: String,
    },
    CommunityReplaced {
        player: PlayerId,
        count: usize,
    },
    RoundClosed {
        pot_total: Chips,
    },
    ShowdownHand {
        player: PlayerId,
        line: String,
        description: String,
        cards: Vec<Card>,
    },
    PotAwarded {
        player: PlayerId,
        amount: Chips,
        pot_index: usize,
        line: String,
    },
    HandComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForcedBetKind {
    Ante,
    SmallBlind,
    BigBlind,
    AdditionalBlind,
    BringIn,
    ProtectionFee,
}
