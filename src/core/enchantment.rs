//! Enchantments: modifiers attached to a single entity
//!
//! An enchantment is owned exclusively by the entity it modifies. It may be
//! granted permanently (owned by the target until explicitly removed) or by
//! an aura, in which case the grant belongs to the aura and is retracted when
//! the aura's predicate stops matching or the aura itself is removed.

use crate::core::{Ability, AuraId, EnchantId, EntityId};
use serde::{Deserialize, Serialize};

/// The effect an enchantment applies during stat recalculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnchantApply {
    /// Add to attack and maximum health
    ModifyStats { attack: i32, health: i32 },
    /// Overwrite attack and/or maximum health
    SetStats {
        attack: Option<i32>,
        health: Option<i32>,
    },
    /// Grant a keyword ability
    GrantAbility(Ability),
}

/// When an enchantment detaches on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetachWhen {
    /// Stays until explicitly removed (or its target leaves play)
    Never,
    /// Detaches during the owner's End-of-Turn event
    EndOfTurn,
}

/// A single modifier attached to one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enchantment {
    pub id: EnchantId,

    /// The entity this enchantment modifies
    pub target: EntityId,

    /// The entity whose effect created this enchantment, if any
    pub source: Option<EntityId>,

    pub apply: EnchantApply,

    pub detach: DetachWhen,

    /// Set when the grant is owned by an aura rather than the target
    pub granted_by: Option<AuraId>,
}

impl Enchantment {
    pub fn is_aura_grant(&self) -> bool {
        self.granted_by.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aura_grant_flag() {
        let ench = Enchantment {
            id: EnchantId::new(1),
            target: EntityId::new(5),
            source: None,
            apply: EnchantApply::ModifyStats { attack: 1, health: 1 },
            detach: DetachWhen::Never,
            granted_by: Some(AuraId::new(2)),
        };
        assert!(ench.is_aura_grant());
    }
}
