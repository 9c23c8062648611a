//! Error types for hearthrules
//!
//! Only illegal invocations and programming-contract violations surface as
//! errors. Rule-legal rejections (not enough mana, invalid target, full board)
//! go through the message callback and refuse the action without mutation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HsError {
    #[error("Entity not found: {0}")]
    EntityNotFound(u32),

    #[error("Illegal action: {0}")]
    IllegalAction(String),

    #[error("Zone error: {0}")]
    ZoneError(String),

    #[error("Unknown card id: {0}")]
    UnknownCard(u32),

    #[error("Invalid deck: {0}")]
    InvalidDeck(String),
}

pub type Result<T> = std::result::Result<T, HsError>;
