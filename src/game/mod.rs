//! Game engine: events, triggers, auras, the resolution loop and the
//! player-action layer

pub mod actions;
pub mod aura;
pub mod engine;
pub mod event;
pub mod logger;
pub mod state;
pub mod status;
pub mod trigger;

pub use actions::PlayerAction;
pub use aura::{Aura, AuraEffect, AuraKind, AuraRegistry, AuraSet};
pub use event::{Event, EventKind, EventRef, Phase};
pub use logger::{GameLogger, LogEntry, OutputMode, VerbosityLevel};
pub use state::{Callbacks, DeathRecord, DeckSpec, GameState, ResolvedItem, TURN_MAX};
pub use status::{EntityStatus, GameStatus, PlayerStatus, ZoneStatus};
pub use trigger::{Timing, Trigger, TriggerEffect};
