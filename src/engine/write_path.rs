//! Engine write path: CREATE, IN/OUT and EDIT.
//!
//! Each operation takes the write gate before reading the item, so the
//! quantity it validates against is the one it commits on top of.

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{ExecutionError, ValidationError, VaultResult};
use crate::item::{Item, ItemId};
use crate::movement::{Movement, MovementKind};
use crate::operations::{ItemPatch, NewItem};
use crate::principal::Actor;

use super::{InventoryEngine, CREATE_REASON, EDIT_REASON};

fn clean_reason(reason: Option<String>) -> Option<String> {
    reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}

impl InventoryEngine {
    /// Add a new item to the catalog and record its CREATE movement.
    ///
    /// The owner defaults to the acting principal.
    pub fn create_item(&self, new_item: NewItem, actor: &dyn Actor) -> VaultResult<Item> {
        self.check_name_length(&new_item.name)?;

        let _gate = self.lock_writes()?;
        let actor = self.resolve_actor(actor)?;

        let item = Item {
            id: ItemId::new(),
            name: new_item.name,
            category: new_item.category,
            tier: new_item.tier,
            quantity: new_item.initial_quantity,
            unit_value: new_item.unit_value,
            acquired_by: new_item.owner.unwrap_or_else(|| actor.principal.clone()),
            date_acquired: Utc::now(),
        };
        let movement = Movement::record(
            &item,
            MovementKind::Create,
            item.quantity,
            &actor.key,
            Some(CREATE_REASON.to_string()),
        );

        self.store.commit(item.clone(), Some(movement))?;
        info!(
            item_id = %item.id,
            name = %item.name,
            quantity = item.quantity,
            actor = %actor.key,
            "item created"
        );
        Ok(item)
    }

    /// Apply an IN or OUT movement of `quantity` units.
    ///
    /// # Errors
    /// - `UnsupportedMovementKind` for anything but IN/OUT
    /// - `NonPositiveQuantity` when `quantity <= 0`
    /// - `ItemNotFound` for an unknown id
    /// - `InsufficientStock` when an OUT exceeds the stock on hand
    /// - `QuantityOverflow` when an IN would not fit
    pub fn apply_movement(
        &self,
        item_id: ItemId,
        kind: MovementKind,
        quantity: i64,
        actor: &dyn Actor,
        reason: Option<String>,
    ) -> VaultResult<Item> {
        if !kind.is_transfer() {
            return Err(ValidationError::UnsupportedMovementKind {
                kind: kind.to_string(),
            }
            .into());
        }
        if quantity <= 0 {
            return Err(ValidationError::NonPositiveQuantity { value: quantity }.into());
        }

        let _gate = self.lock_writes()?;
        let actor = self.resolve_actor(actor)?;
        let mut item = self.load_item(item_id)?;

        item.quantity = match kind {
            MovementKind::Out => {
                if quantity > item.quantity {
                    warn!(
                        item_id = %item.id,
                        available = item.quantity,
                        requested = quantity,
                        actor = %actor.key,
                        "OUT rejected: insufficient stock"
                    );
                    return Err(ExecutionError::InsufficientStock {
                        item_id: item.id,
                        item_name: item.name,
                        available: item.quantity,
                        requested: quantity,
                    }
                    .into());
                }
                item.quantity - quantity
            }
            _ => item
                .quantity
                .checked_add(quantity)
                .ok_or(ValidationError::QuantityOverflow {
                    current: item.quantity,
                    delta: quantity,
                })?,
        };

        let movement = Movement::record(&item, kind, quantity, &actor.key, clean_reason(reason));
        self.store.commit(item.clone(), Some(movement))?;
        info!(
            item_id = %item.id,
            kind = %kind,
            quantity,
            balance = item.quantity,
            actor = %actor.key,
            "stock moved"
        );
        Ok(item)
    }

    /// Shorthand for an IN movement.
    pub fn stock_in(&self, item_id: ItemId, quantity: i64, actor: &dyn Actor) -> VaultResult<Item> {
        self.apply_movement(item_id, MovementKind::In, quantity, actor, None)
    }

    /// Shorthand for an OUT movement.
    pub fn stock_out(&self, item_id: ItemId, quantity: i64, actor: &dyn Actor) -> VaultResult<Item> {
        self.apply_movement(item_id, MovementKind::Out, quantity, actor, None)
    }

    /// Overwrite item attributes directly. Admin only.
    ///
    /// Quantity changes bypass IN/OUT validation. No movement is recorded
    /// unless edit auditing is enabled, in which case a changed quantity
    /// produces one ADJUST movement.
    pub fn edit_item(&self, item_id: ItemId, patch: ItemPatch, actor: &dyn Actor) -> VaultResult<Item> {
        let _gate = self.lock_writes()?;
        let actor = self.resolve_actor(actor)?;
        self.require_admin(&actor, "edit items")?;

        let current = self.load_item(item_id)?;
        let edited = patch.apply_to(&current)?;
        self.check_name_length(&edited.name)?;

        let movement = (self.config.audit_edits && edited.quantity != current.quantity).then(|| {
            Movement::record(
                &edited,
                MovementKind::Adjust,
                (edited.quantity - current.quantity).abs(),
                &actor.key,
                Some(EDIT_REASON.to_string()),
            )
        });
        let audited = movement.is_some();

        self.store.commit(edited.clone(), movement)?;
        info!(
            item_id = %edited.id,
            quantity_before = current.quantity,
            quantity_after = edited.quantity,
            audited,
            actor = %actor.key,
            "item edited"
        );
        Ok(edited)
    }
}
