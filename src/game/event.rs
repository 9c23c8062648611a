//! Events and phases: the units of work consumed by the resolution engine
//!
//! A phase is either a resolvable [`Event`] or an opaque control marker.
//! Events are shared behind `Rc<RefCell<_>>` because a trigger resolving
//! against an event may disable that same event mid-resolution (rule
//! cancellation), and later triggers must observe the change.

use crate::core::{EntityId, PlayerId};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

/// Kinds of atomic rule effects
///
/// Kinds form a small ancestor hierarchy: the death family shares the
/// [`EventKind::Death`] ancestor so one trigger subscription covers all of
/// them. Everything else is its own root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    GameBegin,
    BeginOfTurn,
    EndOfTurn,
    DrawCard,

    Damage,

    OnPlaySpell,
    SpellText,
    AfterSpell,

    OnPlayMinion,
    Battlecry,
    AfterPlayMinion,
    Summon,
    AfterSummon,

    OnPlayWeapon,
    EquipWeapon,
    AfterPlayWeapon,

    /// The shared attack proposal carried as a pre-event by combat phases
    Attack,
    PrepareCombat,
    Combat,

    HeroPowerPhase,
    AfterHeroPower,

    /// Ancestor of the concrete death kinds
    Death,
    MinionDeath,
    WeaponDeath,
    HeroDeath,

    /// Synthetic phase wrapping a batch of deaths
    DeathPhase,
}

impl EventKind {
    fn parent(&self) -> Option<EventKind> {
        match self {
            EventKind::MinionDeath | EventKind::WeaponDeath | EventKind::HeroDeath => Some(EventKind::Death),
            _ => None,
        }
    }

    /// The kind itself plus all its ancestors, most specific first
    pub fn ancestors(&self) -> SmallVec<[EventKind; 2]> {
        let mut out = SmallVec::new();
        let mut cur = Some(*self);
        while let Some(kind) = cur {
            out.push(kind);
            cur = kind.parent();
        }
        out
    }
}

/// A shared, mutable event handle
pub type EventRef = Rc<RefCell<Event>>;

/// One atomic rule effect
#[derive(Clone)]
pub struct Event {
    pub kind: EventKind,

    /// Cleared by cancellation effects; a disabled event's effect does not
    /// run and its after-triggers never fire
    pub enabled: bool,

    /// Sub-steps that are not outermost phases skip the post-phase cleanup
    /// sequence even at depth 0
    pub skip_cleanup: bool,

    /// Order-of-play tag of the event's owner, for simultaneous sorting
    pub oop: u32,

    pub source: Option<EntityId>,
    pub target: Option<EntityId>,
    pub player: Option<PlayerId>,

    /// Damage amount, or other kind-specific magnitude
    pub amount: i32,

    /// Battlefield position: requested play location, or recorded death
    /// location
    pub location: Option<usize>,

    /// Declared pre-events. Before-triggers resolve against these; an empty
    /// list means the event is its own (sole) pre-event.
    pub pre: SmallVec<[EventRef; 1]>,

    /// Death events wrapped by a DeathPhase
    pub deaths: Vec<EventRef>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Event {
            kind,
            enabled: true,
            skip_cleanup: false,
            oop: 0,
            source: None,
            target: None,
            player: None,
            amount: 0,
            location: None,
            pre: SmallVec::new(),
            deaths: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_target(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_player(mut self, player: PlayerId) -> Self {
        self.player = Some(player);
        self
    }

    pub fn with_amount(mut self, amount: i32) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_location(mut self, location: usize) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_oop(mut self, oop: u32) -> Self {
        self.oop = oop;
        self
    }

    pub fn with_pre(mut self, pre: EventRef) -> Self {
        self.pre.push(pre);
        self
    }

    pub fn skipping_cleanup(mut self) -> Self {
        self.skip_cleanup = true;
        self
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Wrap into a shared handle
    pub fn into_ref(self) -> EventRef {
        Rc::new(RefCell::new(self))
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("enabled", &self.enabled)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("player", &self.player)
            .field("amount", &self.amount)
            .field("location", &self.location)
            .field("oop", &self.oop)
            .finish()
    }
}

/// One queued unit of work
#[derive(Clone)]
pub enum Phase {
    Event(EventRef),
    /// Control marker: run the terminal win/loss/draw check
    CheckWin,
}

impl Phase {
    pub fn event(event: Event) -> Phase {
        Phase::Event(event.into_ref())
    }
}

impl std::fmt::Debug for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Event(ev) => write!(f, "Phase::Event({:?})", ev.borrow().kind),
            Phase::CheckWin => write!(f, "Phase::CheckWin"),
        }
    }
}
