//! Catalog items: identity, classification, and current stock.
//!
//! An item's id is assigned once at creation and never changes or gets
//! reused. Movements reference it long after the item itself is edited.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::principal::{Actor, Principal};

/// Globally unique, stable item identifier.
///
/// # Examples
///
/// ```
/// use guildvault::ItemId;
///
/// let id = ItemId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Creates a new random item ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an item ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidValue {
                field: "item_id".to_string(),
                value: s.to_string(),
            })
    }
}

/// What kind of thing an item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Swords, bows, daggers.
    Weapon,
    /// Plate, boots, shields.
    Armor,
    /// Crafting inputs: ores, herbs, fragments.
    Material,
    /// Potions, scrolls.
    Consumable,
    /// Quest-bound unique objects.
    #[serde(rename = "Key Item")]
    KeyItem,
}

impl Category {
    /// Every category in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Weapon,
        Self::Armor,
        Self::Material,
        Self::Consumable,
        Self::KeyItem,
    ];

    /// Display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weapon => "Weapon",
            Self::Armor => "Armor",
            Self::Material => "Material",
            Self::Consumable => "Consumable",
            Self::KeyItem => "Key Item",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| {
                c.as_str().eq_ignore_ascii_case(needle)
                    || (matches!(c, Self::KeyItem) && needle.eq_ignore_ascii_case("keyitem"))
            })
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "category".to_string(),
                value: s.to_string(),
            })
    }
}

/// Ordered rarity scale. Later variants compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Tier {
    /// Everyday loot.
    #[default]
    Common,
    /// Uncommon drops.
    Rare,
    /// Raid-grade.
    Epic,
    /// One of a kind.
    Legendary,
}

impl Tier {
    /// Every tier in ascending order.
    pub const ALL: [Self; 4] = [Self::Common, Self::Rare, Self::Epic, Self::Legendary];

    /// Position on the scale, starting at 1.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Common => 1,
            Self::Rare => 2,
            Self::Epic => 3,
            Self::Legendary => 4,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Rare => "Rare",
            Self::Epic => "Epic",
            Self::Legendary => "Legendary",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "tier".to_string(),
                value: s.to_string(),
            })
    }
}

/// A tracked item and its current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Immutable identity.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Classification.
    pub category: Category,
    /// Rarity.
    pub tier: Tier,
    /// Units on hand. Never negative.
    pub quantity: i64,
    /// Estimated gold value of one unit.
    pub unit_value: Decimal,
    /// Who brought the item into the vault.
    pub acquired_by: Principal,
    /// When the item entered the catalog.
    pub date_acquired: DateTime<Utc>,
}

impl Item {
    /// Estimated value of the whole stack, saturating at the `Decimal` bounds.
    #[must_use]
    pub fn stack_value(&self) -> Decimal {
        self.unit_value.saturating_mul(Decimal::from(self.quantity))
    }

    /// Identity key of the owning principal.
    #[must_use]
    pub fn owner_key(&self) -> &str {
        self.acquired_by.identity_key()
    }

    /// Display name of the owning principal.
    #[must_use]
    pub fn owner_name(&self) -> &str {
        self.acquired_by.display_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::Player;

    fn sample() -> Item {
        Item {
            id: ItemId::new(),
            name: "Valyrian Steel Sword".to_string(),
            category: Category::Weapon,
            tier: Tier::Epic,
            quantity: 2,
            unit_value: Decimal::new(5000, 0),
            acquired_by: Player::new("p1", "Aragorn", "Warrior").into(),
            date_acquired: Utc::now(),
        }
    }

    #[test]
    fn test_item_id_parse() {
        let id = ItemId::new();
        let parsed: ItemId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<ItemId>().is_err());
    }

    #[test]
    fn test_tier_is_ordered() {
        assert!(Tier::Common < Tier::Rare);
        assert!(Tier::Epic < Tier::Legendary);
        assert_eq!(Tier::Legendary.ordinal(), 4);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("weapon".parse::<Category>().unwrap(), Category::Weapon);
        assert_eq!("Key Item".parse::<Category>().unwrap(), Category::KeyItem);
        assert_eq!("keyitem".parse::<Category>().unwrap(), Category::KeyItem);
        assert!("Furniture".parse::<Category>().is_err());
    }

    #[test]
    fn test_stack_value_and_owner() {
        let item = sample();
        assert_eq!(item.stack_value(), Decimal::new(10_000, 0));
        assert_eq!(item.owner_key(), "p1");
        assert_eq!(item.owner_name(), "Aragorn");
    }

    #[test]
    fn test_item_json_is_lossless() {
        let mut item = sample();
        item.unit_value = Decimal::new(12_345, 2);
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"123.45\""));
        let back: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_key_item_label_serializes_with_space() {
        let json = serde_json::to_string(&Category::KeyItem).unwrap();
        assert_eq!(json, "\"Key Item\"");
    }
}
