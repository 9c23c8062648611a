//! Game zones (Deck, Hand, Play, Secret, Graveyard, ...) and movement types
//!
//! Every zone is an ordered container; order matters everywhere because
//! battlefield position is rule-relevant and iteration order must stay
//! deterministic. The single choke point for relocation is
//! [`crate::game::GameState::move_entity`].

use crate::core::{EntityId, PlayerId};
use serde::{Deserialize, Serialize};

/// Different zones where entities can exist. Each player owns one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    Deck,
    Hand,
    /// The battlefield
    Play,
    Secret,
    Graveyard,
    SetAside,
    Weapon,
    Hero,
    HeroPower,
}

impl Zone {
    /// Capacity rule for this zone (None = unbounded)
    pub fn capacity(&self) -> Option<usize> {
        match self {
            Zone::Hand => Some(10),
            Zone::Play => Some(7),
            Zone::Secret => Some(5),
            Zone::Weapon | Zone::Hero | Zone::HeroPower => Some(1),
            Zone::Deck | Zone::Graveyard | Zone::SetAside => None,
        }
    }

    /// Zones whose occupants are "in play": entering assigns an
    /// order-of-play tag, leaving kills the entity's triggers and auras.
    pub fn is_in_play(&self) -> bool {
        matches!(self, Zone::Play | Zone::Secret | Zone::Weapon | Zone::Hero | Zone::HeroPower)
    }
}

/// How to address a slot within a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneLocator {
    /// A position in the zone's ordering
    Index(usize),
    /// The entity itself; the store must locate it and fail loudly if absent
    Entity(EntityId),
    /// Append after the current last entry
    Last,
}

/// Policy when the destination zone is at capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullZonePolicy {
    /// The entity dies instead: instant-death event (when leaving the
    /// battlefield) and a forced move to the graveyard with no owning player
    Destroy,
    /// Abort the move with no state change
    Ignore,
}

/// Structured result of a move attempt
#[derive(Debug, Default)]
pub struct MoveOutcome {
    pub success: bool,
    pub from_index: Option<usize>,
    pub to_index: Option<usize>,
}

/// One ordered zone belonging to one player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityZone {
    pub zone: Zone,
    pub owner: PlayerId,
    pub entities: Vec<EntityId>,
}

impl EntityZone {
    pub fn new(zone: Zone, owner: PlayerId) -> Self {
        EntityZone {
            zone,
            owner,
            entities: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn is_full(&self) -> bool {
        match self.zone.capacity() {
            Some(cap) => self.entities.len() >= cap,
            None => false,
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains(&id)
    }

    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.iter().position(|&e| e == id)
    }

    pub fn push(&mut self, id: EntityId) {
        self.entities.push(id);
    }

    /// Insert at a position, clamped to the current length
    pub fn insert_at(&mut self, index: usize, id: EntityId) -> usize {
        let index = index.min(self.entities.len());
        self.entities.insert(index, id);
        index
    }

    pub fn remove_at(&mut self, index: usize) -> EntityId {
        self.entities.remove(index)
    }

    /// Take from the top (deck draws)
    pub fn draw_top(&mut self) -> Option<EntityId> {
        self.entities.pop()
    }

    pub fn peek_top(&self) -> Option<EntityId> {
        self.entities.last().copied()
    }

    /// Shuffle the zone (decks)
    pub fn shuffle(&mut self, rng: &mut impl rand::Rng) {
        use rand::seq::SliceRandom;
        self.entities.shuffle(rng);
    }
}

/// Collection of all zones for one player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerZones {
    pub deck: EntityZone,
    pub hand: EntityZone,
    pub play: EntityZone,
    pub secret: EntityZone,
    pub graveyard: EntityZone,
    pub set_aside: EntityZone,
    pub weapon: EntityZone,
    pub hero: EntityZone,
    pub hero_power: EntityZone,
}

impl PlayerZones {
    pub fn new(owner: PlayerId) -> Self {
        PlayerZones {
            deck: EntityZone::new(Zone::Deck, owner),
            hand: EntityZone::new(Zone::Hand, owner),
            play: EntityZone::new(Zone::Play, owner),
            secret: EntityZone::new(Zone::Secret, owner),
            graveyard: EntityZone::new(Zone::Graveyard, owner),
            set_aside: EntityZone::new(Zone::SetAside, owner),
            weapon: EntityZone::new(Zone::Weapon, owner),
            hero: EntityZone::new(Zone::Hero, owner),
            hero_power: EntityZone::new(Zone::HeroPower, owner),
        }
    }

    pub fn zone(&self, zone: Zone) -> &EntityZone {
        match zone {
            Zone::Deck => &self.deck,
            Zone::Hand => &self.hand,
            Zone::Play => &self.play,
            Zone::Secret => &self.secret,
            Zone::Graveyard => &self.graveyard,
            Zone::SetAside => &self.set_aside,
            Zone::Weapon => &self.weapon,
            Zone::Hero => &self.hero,
            Zone::HeroPower => &self.hero_power,
        }
    }

    pub fn zone_mut(&mut self, zone: Zone) -> &mut EntityZone {
        match zone {
            Zone::Deck => &mut self.deck,
            Zone::Hand => &mut self.hand,
            Zone::Play => &mut self.play,
            Zone::Secret => &mut self.secret,
            Zone::Graveyard => &mut self.graveyard,
            Zone::SetAside => &mut self.set_aside,
            Zone::Weapon => &mut self.weapon,
            Zone::Hero => &mut self.hero,
            Zone::HeroPower => &mut self.hero_power,
        }
    }
}
