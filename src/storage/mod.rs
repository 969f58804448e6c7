//! Storage traits and backends for GuildVault.
//!
//! The engine only ever talks to the traits in [`traits`]. The in-memory
//! store is always available; the durable journal sits behind the
//! `persistent` feature.

mod memory;
mod traits;

#[cfg(feature = "persistent")]
pub mod persistent;

pub use memory::{InMemoryIdentityStore, InMemoryInventoryStore};
pub use traits::{
    IdentityStore, InventoryStore, ItemCatalog, MovementLedger, Persistence, StorageError,
};
