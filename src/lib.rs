//! hearthrules - deterministic rules engine for a Hearthstone-style card game
//!
//! The core of the crate is the recursive event/trigger resolution engine
//! together with its zone-movement, aura-recalculation and death-creation
//! mechanics. Card content, rendering and persistence are external
//! collaborators reached through the traits in [`core`].

pub mod core;
pub mod error;
pub mod game;
pub mod zones;

pub use error::{HsError, Result};
