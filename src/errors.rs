//! Error channels.
//!
//! Two distinct classes per the engine contract: [`EngineError`] covers
//! configuration and internal invariant failures and is fatal for the hand;
//! [`ActionError`] covers rejected player input and never mutates state.
//! Rules parsing has its own [`RulesError`] so the loader can report
//! document problems without dragging in hand-level concerns.

use thiserror::Error;

/// A problem with the rules document itself, reported at load time.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("rules json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reading rules file: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Invalid(String),
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
}

/// Configuration or internal failure. Never caused by player input.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown evaluation type '{0}'")]
    UnknownEvaluation(String),
    #[error("deck exhausted")]
    DeckExhausted,
    #[error("step references undefined subset '{0}'")]
    UndefinedSubset(String),
    #[error("unrecognized condition trigger '{0}'")]
    BadCondition(String),
    #[error("cannot parse card: {0}")]
    CardParse(String),
    #[error("no seat {0} at the table")]
    NoSuchSeat(usize),
    #[error("player '{0}' is not seated")]
    NoSuchPlayer(String),
    #[error("seat {0} is occupied")]
    SeatOccupied(usize),
    #[error("chip conservation violated: expected {expected}, found {found}")]
    ChipLeak { expected: i64, found: i64 },
    #[error("hand is not in a state that allows {0}")]
    BadPhase(&'static str),
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

/// Why a player action was rejected. State is unchanged in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("not your turn")]
    NotYourTurn,
    #[error("action is not legal here")]
    ActionNotLegal,
    #[error("amount out of range")]
    AmountOutOfRange,
    #[error("illegal card selection")]
    IllegalCardSelection,
    #[error("a declaration is required")]
    NoDeclaration,
    #[error("declaration is ambiguous")]
    AmbiguousDeclaration,
    #[error("insufficient chips")]
    InsufficientChips,
}
