//! Strongly-typed enums for game concepts

use crate::core::PlayerId;
use serde::{Deserialize, Serialize};

/// Card kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardKind {
    Minion,
    Spell,
    Weapon,
    Hero,
    HeroPower,
}

/// Keyword abilities an entity can carry, either printed on its card data
/// or granted by an enchantment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    Taunt,
    Charge,
    Stealth,
    Windfury,
}

/// Coarse game state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameProgress {
    /// No game started yet (or a finished game has been torn down)
    Invalid,
    /// Waiting for both players to submit their starting-hand replacement
    WaitReplace,
    /// Normal play
    Main,
    /// Game over, result recorded
    Finished,
}

/// Terminal result of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    Win(PlayerId),
    Draw,
}
