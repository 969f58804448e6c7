//! # GuildVault - Guild Inventory Ledger
//!
//! GuildVault tracks a guild's shared stock: an item catalog, per-item
//! quantities and owners, and an append-only ledger recording every stock
//! movement. Current stock can always be replayed from, and audited against,
//! that ledger.
//!
//! ## Core Concepts
//!
//! - **Item**: a catalog entry with category, tier, quantity and unit value
//! - **Movement**: an immutable ledger record (CREATE, IN, OUT, ADJUST)
//! - **Principal**: a player profile or registered user that owns items and performs changes
//! - **InventoryEngine**: the single writer; validates and commits every mutation atomically
//!
//! ## Usage
//!
//! ```rust
//! use guildvault::{Category, InventoryEngine, MovementKind, NewItem, Role, Tier, User};
//! use rust_decimal::Decimal;
//!
//! let engine = InventoryEngine::in_memory()?;
//! let admin = User::new("admin", Role::Admin)?;
//!
//! let ore = engine.create_item(
//!     NewItem::builder()
//!         .name("Iron Ore")
//!         .category(Category::Material)
//!         .tier(Tier::Common)
//!         .unit_value(Decimal::new(5, 0))
//!         .initial_quantity(10)
//!         .build()?,
//!     &admin,
//! )?;
//!
//! let ore = engine.apply_movement(ore.id, MovementKind::In, 5, &admin, None)?;
//! assert_eq!(ore.quantity, 15);
//! assert_eq!(engine.movements()?.len(), 2);
//! # Ok::<(), guildvault::VaultError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod config;
pub mod error;
pub mod item;
pub mod movement;
pub mod principal;

// Storage, operations and the engine
pub mod engine;
pub mod operations;
pub mod query;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use config::EngineConfig;
pub use engine::InventoryEngine;
pub use error::{ExecutionError, ValidationError, VaultError, VaultResult};
pub use item::{Category, Item, ItemId, Tier};
pub use movement::{Movement, MovementId, MovementKind};
pub use principal::{Actor, Player, Principal, Role, User};

pub use operations::{CreateItemBuilder, ItemPatch, NewItem};
pub use query::{InventoryStats, ItemFilter, ItemSnapshot, StockDiscrepancy, Totals};
pub use storage::{
    IdentityStore, InMemoryIdentityStore, InMemoryInventoryStore, InventoryStore, ItemCatalog,
    MovementLedger, Persistence, StorageError,
};
