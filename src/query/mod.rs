//! Read-side projections over the catalog and ledger.
//!
//! Everything here is a pure function over slices the caller already holds,
//! so the same views work on a live engine, an import file, or test fixtures.

mod audit;

pub use audit::{audit, replay_stock, StockDiscrepancy};

use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::item::{Category, Item, ItemId, Tier};
use crate::principal::Principal;

/// Label that disables a filter dimension.
pub const ALL: &str = "All";

fn is_all(label: &str) -> bool {
    let label = label.trim();
    label.is_empty() || label.eq_ignore_ascii_case(ALL)
}

/// Conjunctive item filter. Every unset dimension matches everything.
///
/// # Examples
///
/// ```
/// use guildvault::query::ItemFilter;
/// use guildvault::Category;
///
/// let filter = ItemFilter::all().search("sword").category(Category::Weapon);
/// assert!(!filter.is_unconstrained());
/// assert!(ItemFilter::from_labels("", "All", "All", "All").unwrap().is_unconstrained());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFilter {
    /// Case-insensitive substring of the item name.
    pub search: Option<String>,
    /// Exact category.
    pub category: Option<Category>,
    /// Identity key of the owning principal.
    pub owner: Option<String>,
    /// Exact tier.
    pub tier: Option<Tier>,
}

impl ItemFilter {
    /// A filter that matches every item.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a filter from UI-style labels where `"All"` (or blank) means no constraint.
    pub fn from_labels(
        search: &str,
        category: &str,
        owner: &str,
        tier: &str,
    ) -> Result<Self, ValidationError> {
        let mut filter = Self::all().search(search);
        if !is_all(category) {
            filter.category = Some(category.parse()?);
        }
        if !is_all(owner) {
            filter.owner = Some(owner.trim().to_string());
        }
        if !is_all(tier) {
            filter.tier = Some(tier.parse()?);
        }
        Ok(filter)
    }

    /// Restrict to names containing `needle`, ignoring case.
    ///
    /// The needle is matched as typed, surrounding whitespace included. An
    /// empty needle clears the constraint.
    #[must_use]
    pub fn search(mut self, needle: impl AsRef<str>) -> Self {
        let needle = needle.as_ref();
        self.search = (!needle.is_empty()).then(|| needle.to_lowercase());
        self
    }

    /// Restrict to one category.
    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Restrict to items owned by the principal with this identity key.
    #[must_use]
    pub fn owner(mut self, identity_key: impl Into<String>) -> Self {
        self.owner = Some(identity_key.into());
        self
    }

    /// Restrict to one tier.
    #[must_use]
    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// True when no dimension is constrained.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.search.is_none() && self.category.is_none() && self.owner.is_none() && self.tier.is_none()
    }

    /// Whether `item` passes every constraint.
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(needle) = &self.search {
            if !item.name.to_lowercase().contains(needle.as_str()) {
                return false;
            }
        }
        if self.category.is_some_and(|c| c != item.category) {
            return false;
        }
        if self.tier.is_some_and(|t| t != item.tier) {
            return false;
        }
        if let Some(owner) = &self.owner {
            if owner != item.owner_key() {
                return false;
            }
        }
        true
    }
}

/// Items passing `filter`, in catalog order.
#[must_use]
pub fn filter_items(items: &[Item], filter: &ItemFilter) -> Vec<Item> {
    items.iter().filter(|i| filter.matches(i)).cloned().collect()
}

/// Headline numbers for a set of items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of quantities.
    pub total_quantity: i64,
    /// Sum of quantity × unit value.
    pub total_value: Decimal,
    /// Number of catalog entries.
    pub distinct_items: usize,
}

/// Sum quantities and stack values.
#[must_use]
pub fn totals(items: &[Item]) -> Totals {
    items.iter().fold(
        Totals {
            distinct_items: items.len(),
            ..Totals::default()
        },
        |mut acc, item| {
            acc.total_quantity = acc.total_quantity.saturating_add(item.quantity);
            acc.total_value = acc.total_value.saturating_add(item.stack_value());
            acc
        },
    )
}

/// Units held per category, in declaration order. Empty categories are omitted.
#[must_use]
pub fn category_distribution(items: &[Item]) -> Vec<(Category, i64)> {
    Category::ALL
        .into_iter()
        .map(|c| {
            let sum = items
                .iter()
                .filter(|i| i.category == c)
                .fold(0i64, |sum, i| sum.saturating_add(i.quantity));
            (c, sum)
        })
        .filter(|(_, sum)| *sum > 0)
        .collect()
}

/// Units held per tier, from Common up. Empty tiers are omitted.
#[must_use]
pub fn tier_distribution(items: &[Item]) -> Vec<(Tier, i64)> {
    Tier::ALL
        .into_iter()
        .map(|t| {
            let sum = items
                .iter()
                .filter(|i| i.tier == t)
                .fold(0i64, |sum, i| sum.saturating_add(i.quantity));
            (t, sum)
        })
        .filter(|(_, sum)| *sum > 0)
        .collect()
}

/// One principal's share of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    /// The contributing principal as recorded on their items.
    pub principal: Principal,
    /// Units across every item they acquired.
    pub quantity: i64,
}

/// The principal whose items hold the most units.
///
/// Equal totals go to whoever appears first in catalog order. `None` for an
/// empty catalog.
#[must_use]
pub fn top_contributor(items: &[Item]) -> Option<Contribution> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut tally: Vec<Contribution> = Vec::new();

    for item in items {
        let key = item.owner_key();
        match slots.get(key) {
            Some(&slot) => {
                tally[slot].quantity = tally[slot].quantity.saturating_add(item.quantity);
            }
            None => {
                slots.insert(key, tally.len());
                tally.push(Contribution {
                    principal: item.acquired_by.clone(),
                    quantity: item.quantity,
                });
            }
        }
    }

    let mut best: Option<Contribution> = None;
    for entry in tally {
        if best.as_ref().map_or(true, |b| entry.quantity > b.quantity) {
            best = Some(entry);
        }
    }
    best
}

/// Every dashboard aggregate computed in one pass over the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStats {
    /// Headline totals.
    pub totals: Totals,
    /// Units per category.
    pub categories: Vec<(Category, i64)>,
    /// Units per tier.
    pub tiers: Vec<(Tier, i64)>,
    /// Principal holding the most units.
    pub top_contributor: Option<Contribution>,
}

/// Compute [`InventoryStats`] for `items`.
#[must_use]
pub fn stats(items: &[Item]) -> InventoryStats {
    InventoryStats {
        totals: totals(items),
        categories: category_distribution(items),
        tiers: tier_distribution(items),
        top_contributor: top_contributor(items),
    }
}

/// Flattened, owner-resolved view of an item for downstream summarisers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    /// Item id.
    pub id: ItemId,
    /// Item name.
    pub name: String,
    /// Category.
    pub category: Category,
    /// Tier.
    pub tier: Tier,
    /// Units on hand.
    pub quantity: i64,
    /// Value of one unit.
    pub unit_value: Decimal,
    /// Display name of the acquiring principal.
    pub owner: String,
}

impl From<&Item> for ItemSnapshot {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            category: item.category,
            tier: item.tier,
            quantity: item.quantity,
            unit_value: item.unit_value,
            owner: item.owner_name().to_string(),
        }
    }
}

impl fmt::Display for ItemSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "- {} ({}, {}): {} units (acquired by: {})",
            self.name, self.category, self.tier, self.quantity, self.owner
        )
    }
}

/// Read-only snapshot of every item, in catalog order.
#[must_use]
pub fn snapshot(items: &[Item]) -> Vec<ItemSnapshot> {
    items.iter().map(ItemSnapshot::from).collect()
}
