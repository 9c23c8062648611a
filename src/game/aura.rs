//! Standing auras: continuously recalculated modifiers
//!
//! Two disjoint aura kinds exist because the rules recalculate them at
//! different points of the post-phase pipeline: attack/health auras run
//! before the Death Creation Step (twice), "other" auras run after it.
//! Auras removed between passes keep their granted enchantments until the
//! next pass of their kind, which detaches the grants exactly once.

use crate::core::{AuraId, EnchantId, EntityId};
use crate::core::{DetachWhen, EnchantApply};
use crate::game::GameState;

/// Which recalculation pass an aura belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuraKind {
    AttackHealth,
    Other,
}

/// The rule body of an aura
pub trait AuraEffect {
    /// Snapshot whatever positional state the predicate needs (e.g. the
    /// owner's battlefield index) before entities are scanned - a preceding
    /// move may have shifted it.
    fn prepare_update(&mut self, game: &GameState, owner: EntityId) {
        let _ = (game, owner);
    }

    /// Relational predicate: should `entity` currently hold this aura's
    /// enchantment?
    fn applies_to(&self, game: &GameState, owner: EntityId, entity: EntityId) -> bool;

    /// The enchantment granted while the predicate holds
    fn grant(&self) -> (EnchantApply, DetachWhen);
}

/// A registered standing aura
pub struct Aura {
    pub id: AuraId,

    /// Entity whose presence sustains the aura
    pub owner: EntityId,

    pub kind: AuraKind,

    pub oop: u32,

    pub effect: Box<dyn AuraEffect>,

    /// Grants currently held, target -> enchantment
    pub granted: Vec<(EntityId, EnchantId)>,
}

impl Aura {
    pub fn granted_to(&self, entity: EntityId) -> Option<EnchantId> {
        self.granted
            .iter()
            .find(|(target, _)| *target == entity)
            .map(|(_, ench)| *ench)
    }
}

impl std::fmt::Debug for Aura {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aura")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("kind", &self.kind)
            .field("granted", &self.granted)
            .finish()
    }
}

/// Auras of one kind: the active set plus the removed-but-pending-detach set
#[derive(Debug, Default)]
pub struct AuraSet {
    pub active: Vec<Aura>,
    pub removed: Vec<Aura>,
}

impl AuraSet {
    pub fn new() -> Self {
        AuraSet {
            active: Vec::new(),
            removed: Vec::new(),
        }
    }
}

/// Both aura sets, indexed by kind
#[derive(Debug, Default)]
pub struct AuraRegistry {
    pub attack_health: AuraSet,
    pub other: AuraSet,
}

impl AuraRegistry {
    pub fn new() -> Self {
        AuraRegistry {
            attack_health: AuraSet::new(),
            other: AuraSet::new(),
        }
    }

    pub fn set(&self, kind: AuraKind) -> &AuraSet {
        match kind {
            AuraKind::AttackHealth => &self.attack_health,
            AuraKind::Other => &self.other,
        }
    }

    pub fn set_mut(&mut self, kind: AuraKind) -> &mut AuraSet {
        match kind {
            AuraKind::AttackHealth => &mut self.attack_health,
            AuraKind::Other => &mut self.other,
        }
    }

    /// Move every aura sustained by `owner` into the pending-detach set
    pub fn remove_owned_by(&mut self, owner: EntityId) {
        for kind in [AuraKind::AttackHealth, AuraKind::Other] {
            let set = self.set_mut(kind);
            let mut i = 0;
            while i < set.active.len() {
                if set.active[i].owner == owner {
                    let aura = set.active.remove(i);
                    set.removed.push(aura);
                } else {
                    i += 1;
                }
            }
        }
    }
}
