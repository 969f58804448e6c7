//! CREATE request builder.
//!
//! `CreateItemBuilder` is the only way to obtain a [`NewItem`], so every
//! creation request reaching the engine has already passed shape checks.

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::item::{Category, Tier};
use crate::principal::Principal;

/// A validated creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub(crate) name: String,
    pub(crate) category: Category,
    pub(crate) tier: Tier,
    pub(crate) unit_value: Decimal,
    pub(crate) initial_quantity: i64,
    pub(crate) owner: Option<Principal>,
}

impl NewItem {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> CreateItemBuilder {
        CreateItemBuilder::new()
    }

    /// Trimmed item name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Quantity the CREATE movement will record.
    #[must_use]
    pub const fn initial_quantity(&self) -> i64 {
        self.initial_quantity
    }
}

/// Builder for CREATE requests.
///
/// # Example
/// ```
/// use guildvault::{Category, NewItem, Tier};
/// use rust_decimal::Decimal;
///
/// let new_item = NewItem::builder()
///     .name("Iron Ore")
///     .category(Category::Material)
///     .tier(Tier::Common)
///     .unit_value(Decimal::new(5, 0))
///     .initial_quantity(10)
///     .build()
///     .unwrap();
/// assert_eq!(new_item.initial_quantity(), 10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CreateItemBuilder {
    name: Option<String>,
    category: Option<Category>,
    tier: Tier,
    unit_value: Decimal,
    initial_quantity: i64,
    owner: Option<Principal>,
}

impl CreateItemBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the item name (required).
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the category (required).
    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Set the rarity tier (default: Common).
    #[must_use]
    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Set the per-unit value (default: 0).
    #[must_use]
    pub fn unit_value(mut self, value: Decimal) -> Self {
        self.unit_value = value;
        self
    }

    /// Set the starting stock (default: 0).
    #[must_use]
    pub fn initial_quantity(mut self, quantity: i64) -> Self {
        self.initial_quantity = quantity;
        self
    }

    /// Record a different owner than the acting principal, e.g. the player who looted it.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<Principal>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Build the request.
    ///
    /// Returns `ValidationError::MissingField` if name or category is not set,
    /// `EmptyItemName` for a blank name, and `NegativeQuantity` /
    /// `NegativeUnitValue` for out-of-range numbers.
    pub fn build(self) -> Result<NewItem, ValidationError> {
        let name = self.name.ok_or_else(|| ValidationError::MissingField {
            field: "name".to_string(),
        })?;
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyItemName);
        }

        let category = self.category.ok_or_else(|| ValidationError::MissingField {
            field: "category".to_string(),
        })?;

        if self.initial_quantity < 0 {
            return Err(ValidationError::NegativeQuantity {
                field: "initial_quantity".to_string(),
                value: self.initial_quantity,
            });
        }

        if self.unit_value.is_sign_negative() && !self.unit_value.is_zero() {
            return Err(ValidationError::NegativeUnitValue {
                value: self.unit_value,
            });
        }

        Ok(NewItem {
            name,
            category,
            tier: self.tier,
            unit_value: self.unit_value,
            initial_quantity: self.initial_quantity,
            owner: self.owner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::Player;

    fn valid_builder() -> CreateItemBuilder {
        CreateItemBuilder::new()
            .name("Elven Boots")
            .category(Category::Armor)
            .tier(Tier::Rare)
            .unit_value(Decimal::new(800, 0))
            .initial_quantity(4)
    }

    #[test]
    fn test_valid_build() {
        let item = valid_builder().build().unwrap();
        assert_eq!(item.name(), "Elven Boots");
        assert_eq!(item.tier, Tier::Rare);
        assert!(item.owner.is_none());
    }

    #[test]
    fn test_name_is_trimmed() {
        let item = valid_builder().name("  Elven Boots \t").build().unwrap();
        assert_eq!(item.name(), "Elven Boots");
    }

    #[test]
    fn test_blank_name_rejected() {
        let err = valid_builder().name("   ").build().unwrap_err();
        assert_eq!(err, ValidationError::EmptyItemName);
    }

    #[test]
    fn test_missing_category() {
        let err = CreateItemBuilder::new().name("Rope").build().unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { field } if field == "category"));
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let err = valid_builder().initial_quantity(-1).build().unwrap_err();
        assert!(matches!(err, ValidationError::NegativeQuantity { value: -1, .. }));
    }

    #[test]
    fn test_zero_quantity_allowed() {
        let item = valid_builder().initial_quantity(0).build().unwrap();
        assert_eq!(item.initial_quantity(), 0);
    }

    #[test]
    fn test_negative_value_rejected() {
        let err = valid_builder()
            .unit_value(Decimal::new(-1, 2))
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::NegativeUnitValue { .. }));
    }

    #[test]
    fn test_owner_override() {
        let item = valid_builder()
            .owner(Player::new("p2", "Legolas", "Archer"))
            .build()
            .unwrap();
        assert!(matches!(item.owner, Some(Principal::Player(ref p)) if p.id == "p2"));
    }
}
