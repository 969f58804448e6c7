//! Property-based tests for the stock mutation engine.
//!
//! These tests use proptest to drive random movement sequences through the
//! engine and check the ledger invariants after every run.

use guildvault::query::{self, ItemFilter};
use guildvault::{Category, InventoryEngine, ItemPatch, MovementKind, NewItem, Role, Tier, User};
use proptest::prelude::*;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
enum Op {
    Move { slot: usize, kind: MovementKind, quantity: i64 },
    Edit { slot: usize, quantity: i64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..3, prop_oneof![Just(MovementKind::In), Just(MovementKind::Out)], -5i64..60)
            .prop_map(|(slot, kind, quantity)| Op::Move { slot, kind, quantity }),
        1 => (0usize..3, -3i64..100).prop_map(|(slot, quantity)| Op::Edit { slot, quantity }),
    ]
}

fn category_strategy() -> impl Strategy<Value = Category> {
    prop_oneof![
        Just(Category::Weapon),
        Just(Category::Armor),
        Just(Category::Material),
        Just(Category::Consumable),
        Just(Category::KeyItem),
    ]
}

fn admin() -> User {
    User::new("admin", Role::Admin).unwrap()
}

fn new_item(name: String, category: Category, quantity: i64) -> NewItem {
    NewItem::builder()
        .name(name)
        .category(category)
        .tier(Tier::Rare)
        .unit_value(Decimal::new(3, 0))
        .initial_quantity(quantity)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn quantities_never_negative_and_ledger_counts_accepted_ops(
        initial in proptest::collection::vec(0i64..40, 3),
        ops in proptest::collection::vec(op_strategy(), 0..60),
    ) {
        let engine = InventoryEngine::in_memory().unwrap();
        let actor = admin();
        let ids: Vec<_> = initial
            .iter()
            .enumerate()
            .map(|(i, q)| engine.create_item(new_item(format!("item {i}"), Category::Material, *q), &actor).unwrap().id)
            .collect();

        let mut accepted = ids.len();
        for op in ops {
            match op {
                Op::Move { slot, kind, quantity } => {
                    let before = engine.get_item(ids[slot]).unwrap().quantity;
                    match engine.apply_movement(ids[slot], kind, quantity, &actor, None) {
                        Ok(after) => {
                            accepted += 1;
                            let expected = if kind == MovementKind::In { before + quantity } else { before - quantity };
                            prop_assert_eq!(after.quantity, expected);
                        }
                        Err(_) => {
                            prop_assert_eq!(engine.get_item(ids[slot]).unwrap().quantity, before);
                        }
                    }
                }
                Op::Edit { slot, quantity } => {
                    let result = engine.edit_item(ids[slot], ItemPatch::new().quantity(quantity), &actor);
                    prop_assert_eq!(result.is_ok(), quantity >= 0);
                }
            }

            for item in engine.items().unwrap() {
                prop_assert!(item.quantity >= 0);
            }
        }

        prop_assert_eq!(engine.ledger_len().unwrap(), accepted);
    }

    #[test]
    fn unconstrained_filter_is_idempotent(
        names in proptest::collection::vec("[a-z]{1,12}", 0..12),
        categories in proptest::collection::vec(category_strategy(), 12),
    ) {
        let engine = InventoryEngine::in_memory().unwrap();
        for (name, category) in names.into_iter().zip(categories) {
            engine.create_item(new_item(name, category, 1), &admin()).unwrap();
        }

        let all = engine.items().unwrap();
        let once = query::filter_items(&all, &ItemFilter::all());
        let twice = query::filter_items(&once, &ItemFilter::all());
        prop_assert_eq!(&once, &all);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn filtered_items_all_match(
        names in proptest::collection::vec("[a-z]{1,8}", 1..10),
        needle in "[a-z]{1,2}",
        category in category_strategy(),
    ) {
        let engine = InventoryEngine::in_memory().unwrap();
        for (i, name) in names.into_iter().enumerate() {
            let c = if i % 2 == 0 { category } else { Category::Armor };
            engine.create_item(new_item(name, c, 1), &admin()).unwrap();
        }

        let filter = ItemFilter::all().search(&needle).category(category);
        for item in engine.list_items(&filter).unwrap() {
            prop_assert!(item.name.contains(&needle));
            prop_assert_eq!(item.category, category);
        }
    }

    #[test]
    fn ledger_replay_matches_catalog_without_edits(
        ops in proptest::collection::vec((prop_oneof![Just(MovementKind::In), Just(MovementKind::Out)], 1i64..30), 0..40),
    ) {
        let engine = InventoryEngine::in_memory().unwrap();
        let actor = admin();
        let item = engine.create_item(new_item("Mithril".to_string(), Category::Material, 25), &actor).unwrap();
        for (kind, q) in ops {
            let _ = engine.apply_movement(item.id, kind, q, &actor, None);
        }

        prop_assert!(engine.audit().unwrap().is_empty());
        let mut history = engine.movements().unwrap();
        history.reverse();
        let replayed = query::replay_stock(&history);
        prop_assert_eq!(replayed[&item.id], engine.get_item(item.id).unwrap().quantity);
    }
}
