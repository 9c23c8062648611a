//! Entity model, card data and the content-provider contract

pub mod card;
pub mod enchantment;
pub mod entity;
pub mod player;
pub mod types;

pub use card::{CardBehavior, CardData, CardDef, CardOverrides, ContentProvider, Entity, NullBehavior};
pub use enchantment::{DetachWhen, EnchantApply, Enchantment};
pub use entity::{AuraId, EnchantId, EntityId, EntityStore, PlayerId, TriggerId};
pub use player::Player;
pub use types::{Ability, CardKind, GameOutcome, GameProgress};
