//! houserules: a data-driven poker engine.
//!
//! A poker variant is a JSON rules document: forced bets, an ordered list
//! of gameplay steps (deals, betting rounds, draws, exposes, passes,
//! declarations, choices), and a showdown configuration naming one or more
//! scoring lines. The engine loads a document into an immutable [`Rules`]
//! value and runs hands of it as a deterministic, synchronous state
//! machine: given the same rules, players, seed and action sequence, two
//! runs produce identical events and stacks.
//!
//! The external driver loop is small:
//!
//! ```no_run
//! use houserules::{Game, Rules, Stakes, BettingStructure, ActionKind, PlayerAction};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rules = Rules::from_path("variants/holdem.json")?;
//! let mut game = Game::new(rules, BettingStructure::NoLimit, Stakes::blinds(1, 2), 42)?;
//! game.add_player("alice", "Alice", 200, 0)?;
//! game.add_player("bob", "Bob", 200, 1)?;
//! game.start_hand(None)?;
//! while let Some(player) = game.current_player() {
//!     let options = game.valid_actions(&player);
//!     // ... pick an option, then:
//!     game.player_action(&player, ActionKind::Call, PlayerAction::default())?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! There is no wire protocol, persistence, or timer in here; drivers own
//! all of that and treat each [`Game`] as singly owned.

pub mod actions;
pub mod betting;
pub mod cards;
pub mod errors;
pub mod evaluator;
pub mod game;
pub mod lookups;
pub mod rules;
pub mod selector;
pub mod showdown;
pub mod table;
pub mod view;

pub use actions::{
    ActionKind, ActionOption, ActionResult, Event, GamePhase, PlayerAction, PlayerId,
};
pub use betting::{BettingManager, Pot, Stakes};
pub use cards::{Card, Deck, DeckType, Rank, Suit, Visibility, WildRole};
pub use errors::{ActionError, EngineError, RulesError};
pub use evaluator::{evaluate, EvaluationType, HandRank};
pub use game::Game;
pub use lookups::Label;
pub use rules::{BettingStructure, Chips, Declaration, Rules};
pub use showdown::GameResult;
pub use view::PlayerView;
