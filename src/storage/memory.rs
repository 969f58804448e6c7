//! In-memory storage backend.
//!
//! This module provides thread-safe in-memory implementations of the storage traits.
//! It is intended for embedded usage, tests, and as the working set in front of a
//! [`Persistence`] backend.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::item::{Item, ItemId};
use crate::movement::{Movement, MovementId};
use crate::principal::{Role, User};
use crate::storage::traits::{
    IdentityStore, InventoryStore, ItemCatalog, MovementLedger, Persistence, StorageError,
};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

fn check_quantity(item: &Item) -> Result<(), StorageError> {
    if item.quantity < 0 {
        return Err(StorageError::NegativeQuantity {
            id: item.id,
            quantity: item.quantity,
        });
    }
    Ok(())
}

/// Newest first; equal timestamps put the later append first.
fn newest_first<'a>(movements: impl DoubleEndedIterator<Item = &'a Movement>) -> Vec<Movement> {
    let mut out: Vec<Movement> = movements.rev().cloned().collect();
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    out
}

#[derive(Debug, Default)]
struct InventoryState {
    by_id: HashMap<ItemId, Item>,
    order: Vec<ItemId>,
    movements: Vec<Movement>,
    movement_ids: HashSet<MovementId>,
}

impl InventoryState {
    fn put_item(&mut self, item: Item) {
        if !self.by_id.contains_key(&item.id) {
            self.order.push(item.id);
        }
        self.by_id.insert(item.id, item);
    }

    fn check_movement(&self, movement: &Movement) -> Result<(), StorageError> {
        if self.movement_ids.contains(&movement.id) {
            return Err(StorageError::DuplicateKey(movement.id.to_string()));
        }
        Ok(())
    }

    fn push_movement(&mut self, movement: Movement) {
        self.movement_ids.insert(movement.id);
        self.movements.push(movement);
    }

    fn items_in_order(&self) -> Vec<Item> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .cloned()
            .collect()
    }
}

/// Thread-safe in-memory catalog + ledger.
///
/// Optionally writes through to a [`Persistence`] backend: every change is
/// persisted first and applied in memory only once the backend accepted it.
#[derive(Default)]
pub struct InMemoryInventoryStore {
    state: RwLock<InventoryState>,
    persistence: Option<Arc<dyn Persistence>>,
}

impl InMemoryInventoryStore {
    /// Create a new empty, volatile store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the catalog and ledger from `persistence` and write through to it from now on.
    pub fn open(persistence: Arc<dyn Persistence>) -> Result<Self, StorageError> {
        let items = persistence.load_catalog()?;
        let movements = persistence.load_ledger()?;

        let mut state = InventoryState::default();
        for item in items {
            check_quantity(&item)?;
            state.put_item(item);
        }
        for movement in movements {
            state.check_movement(&movement)?;
            state.push_movement(movement);
        }

        info!(
            items = state.order.len(),
            movements = state.movements.len(),
            "inventory store loaded"
        );

        Ok(Self {
            state: RwLock::new(state),
            persistence: Some(persistence),
        })
    }

    /// Restore an exported catalog and ledger into an empty store.
    ///
    /// Returns `DuplicateKey` if the store already holds data.
    pub fn import(&self, items: Vec<Item>, movements: Vec<Movement>) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("inventory.import"))?;
        if !state.order.is_empty() || !state.movements.is_empty() {
            return Err(StorageError::DuplicateKey(
                "import requires an empty store".to_string(),
            ));
        }

        let mut staged = InventoryState::default();
        for item in items {
            check_quantity(&item)?;
            staged.put_item(item);
        }
        for movement in movements {
            staged.check_movement(&movement)?;
            staged.push_movement(movement);
        }

        if let Some(persistence) = &self.persistence {
            persistence.import(&staged.items_in_order(), &staged.movements)?;
        }

        debug!(
            items = staged.order.len(),
            movements = staged.movements.len(),
            "inventory imported"
        );
        *state = staged;
        Ok(())
    }
}

impl ItemCatalog for InMemoryInventoryStore {
    fn get(&self, id: ItemId) -> Result<Option<Item>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("catalog.get"))?;
        Ok(state.by_id.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<Item>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("catalog.list"))?;
        Ok(state.items_in_order())
    }

    fn upsert(&self, item: Item) -> Result<(), StorageError> {
        check_quantity(&item)?;
        let mut state = self.state.write().map_err(|_| lock_err("catalog.upsert"))?;
        if let Some(persistence) = &self.persistence {
            persistence.commit(&item, None)?;
        }
        state.put_item(item);
        Ok(())
    }
}

impl MovementLedger for InMemoryInventoryStore {
    fn append(&self, movement: Movement) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("ledger.append"))?;
        state.check_movement(&movement)?;
        if let Some(persistence) = &self.persistence {
            persistence.append_ledger(&movement)?;
        }
        state.push_movement(movement);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Movement>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("ledger.list"))?;
        Ok(newest_first(state.movements.iter()))
    }

    fn history(&self) -> Result<Vec<Movement>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("ledger.history"))?;
        Ok(state.movements.clone())
    }

    fn list_for_item(&self, item_id: ItemId) -> Result<Vec<Movement>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("ledger.list_for_item"))?;
        let matching: Vec<&Movement> = state
            .movements
            .iter()
            .filter(|m| m.item_id == item_id)
            .collect();
        Ok(newest_first(matching.into_iter()))
    }

    fn len(&self) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("ledger.len"))?;
        Ok(state.movements.len())
    }
}

impl InventoryStore for InMemoryInventoryStore {
    fn catalog(&self) -> &dyn ItemCatalog {
        self
    }

    fn ledger(&self) -> &dyn MovementLedger {
        self
    }

    fn commit(&self, item: Item, movement: Option<Movement>) -> Result<(), StorageError> {
        check_quantity(&item)?;
        let mut state = self.state.write().map_err(|_| lock_err("inventory.commit"))?;
        if let Some(m) = &movement {
            state.check_movement(m)?;
        }

        // Nothing is applied in memory until the backend has the record.
        if let Some(persistence) = &self.persistence {
            persistence.commit(&item, movement.as_ref())?;
        }

        state.put_item(item);
        if let Some(m) = movement {
            state.push_movement(m);
        }
        Ok(())
    }
}

/// Thread-safe in-memory identity store.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    users: RwLock<BTreeMap<String, User>>,
}

impl InMemoryIdentityStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn register(&self, user: User) -> Result<(), StorageError> {
        let mut users = self.users.write().map_err(|_| lock_err("identity.register"))?;
        if users.contains_key(&user.username) {
            return Err(StorageError::DuplicateKey(user.username));
        }
        users.insert(user.username.clone(), user);
        Ok(())
    }

    fn get(&self, username: &str) -> Result<Option<User>, StorageError> {
        let users = self.users.read().map_err(|_| lock_err("identity.get"))?;
        Ok(users.get(username).cloned())
    }

    fn list(&self) -> Result<Vec<User>, StorageError> {
        let users = self.users.read().map_err(|_| lock_err("identity.list"))?;
        Ok(users.values().cloned().collect())
    }

    fn set_role(&self, username: &str, role: Role) -> Result<(), StorageError> {
        let mut users = self.users.write().map_err(|_| lock_err("identity.set_role"))?;
        let user = users
            .get_mut(username)
            .ok_or_else(|| StorageError::IdentityNotFound(username.to_string()))?;
        user.role = role;
        Ok(())
    }
}
