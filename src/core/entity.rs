//! Game entity identifiers and storage

use crate::HsError;
use crate::Result;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            pub fn new(id: u32) -> Self {
                $name(id)
            }

            pub fn as_u32(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id! {
    /// Simple integer ID for game entities (cards, heroes, hero powers)
    ///
    /// IDs are stable throughout a game - entities don't get deallocated,
    /// they just change zones (graveyard included).
    EntityId
}

define_id! {
    /// ID of a registered trigger
    TriggerId
}

define_id! {
    /// ID of an attached enchantment
    EnchantId
}

define_id! {
    /// ID of a standing aura
    AuraId
}

/// Player identifier. Two-player games use the values 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    pub fn new(id: u32) -> Self {
        PlayerId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }

    /// The opponent in a two-player game
    pub fn opponent(&self) -> PlayerId {
        PlayerId(1 - self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Central storage for game entities
///
/// Provides fast lookup by EntityId and manages the id well.
/// Uses FxHashMap for fast hashing of integer keys.
#[derive(Debug, Clone, Default)]
pub struct EntityStore<T> {
    entities: FxHashMap<EntityId, T>,
    next_id: u32,
}

impl<T> EntityStore<T> {
    pub fn new() -> Self {
        EntityStore {
            entities: FxHashMap::default(),
            next_id: 0,
        }
    }

    /// Generate a new unique EntityId
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert an entity with a specific ID
    pub fn insert(&mut self, id: EntityId, entity: T) {
        self.entities.insert(id, entity);
    }

    /// Get an entity by ID
    pub fn get(&self, id: EntityId) -> Result<&T> {
        self.entities.get(&id).ok_or(HsError::EntityNotFound(id.as_u32()))
    }

    /// Get a mutable reference to an entity
    pub fn get_mut(&mut self, id: EntityId) -> Result<&mut T> {
        self.entities
            .get_mut(&id)
            .ok_or(HsError::EntityNotFound(id.as_u32()))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Iterate over all entities
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &T)> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_store() {
        let mut store: EntityStore<&str> = EntityStore::new();
        let id1 = store.next_id();
        let id2 = store.next_id();

        assert_eq!(id1.as_u32(), 0);
        assert_eq!(id2.as_u32(), 1);

        store.insert(id1, "wisp");
        store.insert(id2, "boar");

        assert_eq!(store.len(), 2);
        assert_eq!(*store.get(id1).unwrap(), "wisp");
        assert_eq!(*store.get(id2).unwrap(), "boar");
        assert!(store.get(EntityId::new(999)).is_err());
    }

    #[test]
    fn test_player_opponent() {
        assert_eq!(PlayerId::new(0).opponent(), PlayerId::new(1));
        assert_eq!(PlayerId::new(1).opponent(), PlayerId::new(0));
    }
}
