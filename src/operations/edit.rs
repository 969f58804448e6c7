//! EDIT request: an administrative overwrite of item attributes.
//!
//! Unlike IN/OUT, an edit may set the quantity to any non-negative value.

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::item::{Category, Item, Tier};

/// Attributes to overwrite. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    /// New name.
    pub name: Option<String>,
    /// New category.
    pub category: Option<Category>,
    /// New tier.
    pub tier: Option<Tier>,
    /// New unit value.
    pub unit_value: Option<Decimal>,
    /// New quantity, applied without IN/OUT checks.
    pub quantity: Option<i64>,
}

impl ItemPatch {
    /// Empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Overwrite the category.
    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Overwrite the tier.
    #[must_use]
    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Overwrite the unit value.
    #[must_use]
    pub fn unit_value(mut self, value: Decimal) -> Self {
        self.unit_value = Some(value);
        self
    }

    /// Overwrite the quantity.
    #[must_use]
    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// True when the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.tier.is_none()
            && self.unit_value.is_none()
            && self.quantity.is_none()
    }

    /// Produces the edited item. Identity, owner and acquisition date never change.
    pub(crate) fn apply_to(&self, item: &Item) -> Result<Item, ValidationError> {
        let mut edited = item.clone();

        if let Some(name) = &self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ValidationError::EmptyItemName);
            }
            edited.name = name.to_string();
        }
        if let Some(category) = self.category {
            edited.category = category;
        }
        if let Some(tier) = self.tier {
            edited.tier = tier;
        }
        if let Some(value) = self.unit_value {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(ValidationError::NegativeUnitValue { value });
            }
            edited.unit_value = value;
        }
        if let Some(quantity) = self.quantity {
            if quantity < 0 {
                return Err(ValidationError::NegativeQuantity {
                    field: "quantity".to_string(),
                    value: quantity,
                });
            }
            edited.quantity = quantity;
        }

        Ok(edited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemId;
    use crate::principal::Player;
    use chrono::Utc;

    fn item() -> Item {
        Item {
            id: ItemId::new(),
            name: "Rusty Dagger".to_string(),
            category: Category::Weapon,
            tier: Tier::Common,
            quantity: 25,
            unit_value: Decimal::new(10, 0),
            acquired_by: Player::new("p5", "Frodo", "Bearer").into(),
            date_acquired: Utc::now(),
        }
    }

    #[test]
    fn test_empty_patch_is_identity() {
        let original = item();
        let patch = ItemPatch::new();
        assert!(patch.is_empty());
        assert_eq!(patch.apply_to(&original).unwrap(), original);
    }

    #[test]
    fn test_patch_overwrites_fields() {
        let original = item();
        let edited = ItemPatch::new()
            .name(" Sting ")
            .tier(Tier::Legendary)
            .quantity(1)
            .apply_to(&original)
            .unwrap();
        assert_eq!(edited.id, original.id);
        assert_eq!(edited.name, "Sting");
        assert_eq!(edited.tier, Tier::Legendary);
        assert_eq!(edited.quantity, 1);
        assert_eq!(edited.acquired_by, original.acquired_by);
        assert_eq!(edited.date_acquired, original.date_acquired);
    }

    #[test]
    fn test_patch_rejects_negative_quantity() {
        let err = ItemPatch::new().quantity(-5).apply_to(&item()).unwrap_err();
        assert!(matches!(err, ValidationError::NegativeQuantity { value: -5, .. }));
    }

    #[test]
    fn test_patch_rejects_blank_name() {
        let err = ItemPatch::new().name("").apply_to(&item()).unwrap_err();
        assert_eq!(err, ValidationError::EmptyItemName);
    }
}
