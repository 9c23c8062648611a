//! Reactive triggers and their subscription table types
//!
//! A trigger subscribes to one or more (event kind, timing) pairs. Dead
//! triggers are only marked, never removed while resolution may still be
//! iterating; the registry sweeps them afterwards.

use crate::core::{EntityId, TriggerId};
use crate::game::event::{Event, EventKind, EventRef, Phase};
use crate::game::GameState;
use crate::Result;
use smallvec::SmallVec;
use std::rc::Rc;

/// Whether a trigger fires before or after its event resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timing {
    Before,
    After,
}

/// The reactive body of a trigger
///
/// `queue_condition` is checked once when the trigger queue is built;
/// `trigger_condition` is re-evaluated against the still-open event when the
/// trigger's turn comes, because earlier triggers may have negated the event.
pub trait TriggerEffect {
    fn queue_condition(&self, game: &GameState, event: &Event) -> bool {
        let _ = (game, event);
        true
    }

    fn trigger_condition(&self, game: &GameState, event: &Event) -> bool {
        let _ = (game, event);
        true
    }

    /// React to the event. May disable it, cancel the remaining queue, or
    /// enqueue new phases.
    fn process(&self, game: &mut GameState, event: &EventRef) -> Result<Vec<Phase>>;
}

/// A registered trigger
pub struct Trigger {
    pub id: TriggerId,

    /// Entity whose presence keeps this trigger alive, if any
    pub owner: Option<EntityId>,

    /// Order-of-play tag for simultaneous-trigger ordering
    pub oop: u32,

    /// Cleared when the owner leaves play; swept lazily
    pub alive: bool,

    /// Deathrattle-style triggers survive their owner leaving play
    pub persistent: bool,

    /// Marked dead after firing once
    pub one_shot: bool,

    pub keys: SmallVec<[(EventKind, Timing); 2]>,

    pub effect: Rc<dyn TriggerEffect>,
}

impl Trigger {
    pub fn new(
        id: TriggerId,
        owner: Option<EntityId>,
        oop: u32,
        keys: SmallVec<[(EventKind, Timing); 2]>,
        effect: Rc<dyn TriggerEffect>,
    ) -> Self {
        Trigger {
            id,
            owner,
            oop,
            alive: true,
            persistent: false,
            one_shot: false,
            keys,
            effect,
        }
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub fn one_shot(mut self) -> Self {
        self.one_shot = true;
        self
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("oop", &self.oop)
            .field("alive", &self.alive)
            .field("keys", &self.keys)
            .finish()
    }
}
