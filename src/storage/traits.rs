//! Abstract storage traits for GuildVault.
//!
//! These traits define the contract that storage backends must implement.
//! By using traits, we enable:
//! - In-memory backends for tests and embedded use
//! - Durable backends (the WAL journal) behind the same engine
//! - Remote backends supplied by the host application

use thiserror::Error;

use crate::item::{Item, ItemId};
use crate::movement::Movement;
use crate::principal::{Role, User};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Item not found.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// Registered identity not found.
    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// A write would leave an item with negative stock.
    #[error("Refusing to store negative quantity {quantity} for item {id}")]
    NegativeQuantity {
        /// Offending item.
        id: ItemId,
        /// Quantity the write carried.
        quantity: i64,
    },

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Persisted data failed an integrity check.
    #[error("Corrupted storage: {0}")]
    Corruption(String),
}

/// Keyed storage of items.
///
/// `list` returns items in insertion order; aggregations that break ties by
/// first encounter rely on it.
pub trait ItemCatalog: Send + Sync {
    /// Get an item by ID.
    fn get(&self, id: ItemId) -> Result<Option<Item>, StorageError>;

    /// All items, in insertion order.
    fn list(&self) -> Result<Vec<Item>, StorageError>;

    /// Insert or replace an item. Returns `NegativeQuantity` for a negative stock write.
    fn upsert(&self, item: Item) -> Result<(), StorageError>;
}

/// Append-only storage of movements. There is no update or delete.
pub trait MovementLedger: Send + Sync {
    /// Append a movement. Returns `DuplicateKey` if the movement ID was already recorded.
    fn append(&self, movement: Movement) -> Result<(), StorageError>;

    /// All movements, most recent first. Equal timestamps list the later append first.
    fn list(&self) -> Result<Vec<Movement>, StorageError>;

    /// All movements in the order they were appended, regardless of timestamp.
    fn history(&self) -> Result<Vec<Movement>, StorageError>;

    /// Movements touching one item, most recent first.
    fn list_for_item(&self, item_id: ItemId) -> Result<Vec<Movement>, StorageError>;

    /// Number of recorded movements.
    fn len(&self) -> Result<usize, StorageError>;

    /// True when nothing has been recorded.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

/// A catalog and ledger that can change together.
///
/// # Safety Considerations
/// - `commit` must apply both halves or neither
/// - Implementations should handle concurrent access safely
pub trait InventoryStore: Send + Sync {
    /// Read/write view of the catalog.
    fn catalog(&self) -> &dyn ItemCatalog;

    /// Read/append view of the ledger.
    fn ledger(&self) -> &dyn MovementLedger;

    /// Upsert `item` and append `movement` (if any) as one atomic change.
    fn commit(&self, item: Item, movement: Option<Movement>) -> Result<(), StorageError>;
}

/// Registered user accounts.
pub trait IdentityStore: Send + Sync {
    /// Register a user. Returns `DuplicateKey` if the username is taken.
    fn register(&self, user: User) -> Result<(), StorageError>;

    /// Look a user up by username.
    fn get(&self, username: &str) -> Result<Option<User>, StorageError>;

    /// All users, ordered by username.
    fn list(&self) -> Result<Vec<User>, StorageError>;

    /// Change a user's role. Returns `IdentityNotFound` for unknown usernames.
    fn set_role(&self, username: &str, role: Role) -> Result<(), StorageError>;
}

/// Durable home for a catalog + ledger pair.
///
/// Implementations may be local files, device storage, or a remote service.
/// The in-memory store writes through to a `Persistence` before applying any
/// change, so a failed write leaves the working set untouched.
pub trait Persistence: Send + Sync {
    /// Every persisted item, in insertion order.
    fn load_catalog(&self) -> Result<Vec<Item>, StorageError>;

    /// Replace the persisted catalog wholesale.
    fn save_catalog(&self, items: &[Item]) -> Result<(), StorageError>;

    /// Every persisted movement, in append order.
    fn load_ledger(&self) -> Result<Vec<Movement>, StorageError>;

    /// Persist one movement.
    fn append_ledger(&self, movement: &Movement) -> Result<(), StorageError>;

    /// Persist an item write and its movement as a single record.
    fn commit(&self, item: &Item, movement: Option<&Movement>) -> Result<(), StorageError>;

    /// Persist a whole catalog and ledger as a single record, replacing everything stored.
    fn import(&self, items: &[Item], movements: &[Movement]) -> Result<(), StorageError>;
}
