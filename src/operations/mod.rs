//! Operation builders for GuildVault.
//!
//! These builders provide a fluent, type-safe API for constructing
//! mutation requests. They validate inputs before anything reaches the engine.

mod create;
mod edit;

pub use create::{CreateItemBuilder, NewItem};
pub use edit::ItemPatch;
