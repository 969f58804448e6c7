//! The stock mutation engine.
//!
//! [`InventoryEngine`] is the only writer of the catalog and the ledger. Every
//! mutation runs read → validate → commit under one engine-wide write gate,
//! so two concurrent OUT movements can never both pass validation against the
//! same stale quantity.

mod identity;
mod write_path;

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{ExecutionError, ValidationError, VaultError, VaultResult};
use crate::item::{Item, ItemId};
use crate::movement::Movement;
use crate::principal::{Principal, Role, User};
use crate::query::{self, InventoryStats, ItemFilter, ItemSnapshot, StockDiscrepancy};
use crate::storage::{
    IdentityStore, InMemoryIdentityStore, InMemoryInventoryStore, InventoryStore,
};

/// Reason recorded on every CREATE movement.
pub const CREATE_REASON: &str = "item created";

/// Reason recorded on ADJUST movements produced by audited edits.
pub const EDIT_REASON: &str = "manual edit";

/// An actor after registry lookup.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedActor {
    pub(crate) key: String,
    pub(crate) role: Role,
    pub(crate) principal: Principal,
}

/// Inventory ledger and stock-mutation engine.
///
/// Cheap to clone; clones share stores and the write gate.
#[derive(Clone)]
pub struct InventoryEngine {
    store: Arc<dyn InventoryStore>,
    identities: Arc<dyn IdentityStore>,
    config: EngineConfig,
    write_gate: Arc<Mutex<()>>,
}

impl std::fmt::Debug for InventoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl InventoryEngine {
    /// Create an engine over the given stores.
    ///
    /// Validates `config` and, when enabled, registers the default
    /// administrator if the identity store does not know it yet.
    pub fn new(
        store: Arc<dyn InventoryStore>,
        identities: Arc<dyn IdentityStore>,
        config: EngineConfig,
    ) -> VaultResult<Self> {
        let config = config.validate()?;
        let engine = Self {
            store,
            identities,
            config,
            write_gate: Arc::new(Mutex::new(())),
        };
        engine.seed_default_admin()?;
        Ok(engine)
    }

    /// An engine over fresh in-memory stores with the default configuration.
    pub fn in_memory() -> VaultResult<Self> {
        Self::new(
            Arc::new(InMemoryInventoryStore::new()),
            Arc::new(InMemoryIdentityStore::new()),
            EngineConfig::default(),
        )
    }

    /// Get a reference to the inventory store.
    pub fn inventory_store(&self) -> &Arc<dyn InventoryStore> {
        &self.store
    }

    /// Get a reference to the identity store.
    pub fn identity_store(&self) -> &Arc<dyn IdentityStore> {
        &self.identities
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn lock_writes(&self) -> VaultResult<MutexGuard<'_, ()>> {
        self.write_gate
            .lock()
            .map_err(|_| VaultError::internal("engine write gate poisoned"))
    }

    fn check_name_length(&self, name: &str) -> VaultResult<()> {
        if name.chars().count() > self.config.max_name_length {
            return Err(ValidationError::FieldTooLong {
                field: "name".to_string(),
                max_length: self.config.max_name_length,
            }
            .into());
        }
        Ok(())
    }

    fn load_item(&self, id: ItemId) -> VaultResult<Item> {
        self.store
            .catalog()
            .get(id)?
            .ok_or_else(|| ExecutionError::ItemNotFound { id }.into())
    }

    // Read path

    /// Fetch one item.
    pub fn get_item(&self, id: ItemId) -> VaultResult<Item> {
        self.load_item(id)
    }

    /// Every item, in catalog order.
    pub fn items(&self) -> VaultResult<Vec<Item>> {
        Ok(self.store.catalog().list()?)
    }

    /// Items passing `filter`, in catalog order.
    pub fn list_items(&self, filter: &ItemFilter) -> VaultResult<Vec<Item>> {
        let items = self.items()?;
        let matched = query::filter_items(&items, filter);
        debug!(total = items.len(), matched = matched.len(), "items filtered");
        Ok(matched)
    }

    /// The whole ledger, most recent first.
    pub fn movements(&self) -> VaultResult<Vec<Movement>> {
        Ok(self.store.ledger().list()?)
    }

    /// Movements touching one item, most recent first.
    pub fn movements_for(&self, id: ItemId) -> VaultResult<Vec<Movement>> {
        Ok(self.store.ledger().list_for_item(id)?)
    }

    /// Number of ledger entries.
    pub fn ledger_len(&self) -> VaultResult<usize> {
        Ok(self.store.ledger().len()?)
    }

    /// Dashboard aggregates over the full catalog.
    pub fn stats(&self) -> VaultResult<InventoryStats> {
        Ok(query::stats(&self.items()?))
    }

    /// Read-only snapshot of the catalog for summarisers.
    pub fn snapshot(&self) -> VaultResult<Vec<ItemSnapshot>> {
        Ok(query::snapshot(&self.items()?))
    }

    /// Items whose quantity the ledger does not explain.
    pub fn audit(&self) -> VaultResult<Vec<StockDiscrepancy>> {
        // Hold the gate so the catalog and ledger are read at the same point.
        let _gate = self.lock_writes()?;
        let items = self.items()?;
        let history = self.store.ledger().history()?;
        let found = query::audit(&items, &history);
        debug!(items = items.len(), discrepancies = found.len(), "ledger audited");
        Ok(found)
    }

    /// Registered users, ordered by username.
    pub fn users(&self) -> VaultResult<Vec<User>> {
        Ok(self.identities.list()?)
    }
}
