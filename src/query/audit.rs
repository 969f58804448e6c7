//! Ledger replay and reconciliation against the catalog.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::item::{Item, ItemId};
use crate::movement::{Movement, MovementKind};

/// Quantities implied by the ledger alone.
///
/// `movements` must be oldest first. IN, OUT and CREATE apply their signed
/// delta; ADJUST resets the running balance to its recorded `balance_after`.
#[must_use]
pub fn replay_stock(movements: &[Movement]) -> HashMap<ItemId, i64> {
    let mut stock: HashMap<ItemId, i64> = HashMap::new();
    for m in movements {
        let balance = stock.entry(m.item_id).or_insert(0);
        *balance = match m.kind {
            MovementKind::Adjust => m.balance_after,
            _ => balance.saturating_add(m.signed_delta()),
        };
    }
    stock
}

/// A catalog entry whose quantity the ledger cannot account for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDiscrepancy {
    /// Affected item.
    pub item_id: ItemId,
    /// Current name of the item.
    pub item_name: String,
    /// Quantity in the catalog.
    pub catalog_quantity: i64,
    /// Quantity the ledger replays to; `None` when the item has no movements at all.
    pub ledger_quantity: Option<i64>,
}

/// Compare every item against the replayed ledger, in catalog order.
///
/// An empty result means the ledger fully explains current stock.
#[must_use]
pub fn audit(items: &[Item], movements: &[Movement]) -> Vec<StockDiscrepancy> {
    let replayed = replay_stock(movements);
    items
        .iter()
        .filter_map(|item| {
            let ledger_quantity = replayed.get(&item.id).copied();
            if ledger_quantity == Some(item.quantity) {
                return None;
            }
            Some(StockDiscrepancy {
                item_id: item.id,
                item_name: item.name.clone(),
                catalog_quantity: item.quantity,
                ledger_quantity,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::item::{Category, Tier};
    use crate::principal::Player;

    fn item(quantity: i64) -> Item {
        Item {
            id: ItemId::new(),
            name: "Mithril Ore".to_string(),
            category: Category::Material,
            tier: Tier::Rare,
            quantity,
            unit_value: Decimal::ONE,
            acquired_by: Player::new("p3", "Gimli", "Miner").into(),
            date_acquired: Utc::now(),
        }
    }

    fn step(item: &mut Item, kind: MovementKind, quantity: i64) -> Movement {
        item.quantity = match kind {
            MovementKind::Create => quantity,
            MovementKind::In => item.quantity + quantity,
            MovementKind::Out => item.quantity - quantity,
            MovementKind::Adjust => item.quantity,
        };
        Movement::record(item, kind, quantity, "admin", None)
    }

    #[test]
    fn test_replay_matches_engine_arithmetic() {
        let mut ore = item(0);
        let history = vec![
            step(&mut ore, MovementKind::Create, 10),
            step(&mut ore, MovementKind::In, 5),
            step(&mut ore, MovementKind::Out, 15),
        ];
        assert_eq!(replay_stock(&history)[&ore.id], 0);
        assert!(audit(&[ore], &history).is_empty());
    }

    #[test]
    fn test_adjust_resets_balance() {
        let mut ore = item(0);
        let mut history = vec![step(&mut ore, MovementKind::Create, 10)];
        ore.quantity = 3;
        history.push(Movement::record(&ore, MovementKind::Adjust, 7, "admin", None));
        history.push(step(&mut ore, MovementKind::In, 2));

        assert_eq!(replay_stock(&history)[&ore.id], 5);
        assert!(audit(&[ore], &history).is_empty());
    }

    #[test]
    fn test_unaudited_edit_is_reported() {
        let mut ore = item(0);
        let history = vec![step(&mut ore, MovementKind::Create, 10)];
        ore.quantity = 4;
        let orphan = item(2);

        let found = audit(&[ore.clone(), orphan.clone()], &history);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].item_id, ore.id);
        assert_eq!(found[0].catalog_quantity, 4);
        assert_eq!(found[0].ledger_quantity, Some(10));
        assert_eq!(found[1].item_id, orphan.id);
        assert_eq!(found[1].ledger_quantity, None);
    }
}
