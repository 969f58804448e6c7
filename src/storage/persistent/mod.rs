//! Persistent storage backend for GuildVault.
//!
//! This module provides durable, crash-safe storage with:
//! - Write-Ahead Logging (WAL) for crash recovery
//! - File locking for single-process access
//! - CRC32 checksums for corruption detection
//! - Checkpoint snapshots that bound replay time
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                     Journal                      │
//! ├──────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐        │
//! │  │ WriteAheadLog   │  │ vault.snapshot  │        │
//! │  │ (append-only)   │  │ (checkpoint)    │        │
//! │  └────────┬────────┘  └────────┬────────┘        │
//! │           └──────────┬─────────┘                 │
//! │                      ↓                           │
//! │           ┌─────────────────────┐                │
//! │           │   FileLock (flock)  │                │
//! │           └─────────────────────┘                │
//! └──────────────────────────────────────────────────┘
//! ```

mod codec;
mod file_lock;
mod journal;
mod snapshot;
mod wal;

pub use file_lock::{holder_pid, FileLock, LOCK_FILE};
pub use journal::{CheckpointStats, Journal, SNAPSHOT_FILE, WAL_FILE};
pub use snapshot::SnapshotData;
pub use wal::{WalEntry, WalEntryKind, WriteAheadLog};

use std::path::Path;

use serde::Deserialize;

use crate::error::{ValidationError, VaultResult};

/// Configuration for persistent storage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PersistentConfig {
    /// WAL size that triggers a checkpoint (bytes).
    pub max_wal_size: u64,
    /// Whether to fsync after every write (slower but safer).
    pub sync_on_write: bool,
}

impl Default for PersistentConfig {
    fn default() -> Self {
        Self {
            max_wal_size: 8 * 1024 * 1024, // 8 MiB
            sync_on_write: true,
        }
    }
}

impl PersistentConfig {
    const MIN_WAL_SIZE: u64 = 4 * 1024; // 4 KiB minimum to avoid degenerate checkpoint loops

    /// Checks the configuration, returning it unchanged when valid.
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.max_wal_size < Self::MIN_WAL_SIZE {
            return Err(ValidationError::InvalidConfig {
                reason: format!(
                    "max_wal_size must be at least {} bytes (got {})",
                    Self::MIN_WAL_SIZE,
                    self.max_wal_size
                ),
            });
        }
        Ok(self)
    }
}

/// Open or create a journal at the given directory.
///
/// # Arguments
/// * `path` - Directory to store the journal files
/// * `config` - Optional configuration (uses defaults if None)
///
/// # Errors
/// - If the configuration is invalid
/// - If the path cannot be created or accessed
/// - If another process holds the lock
/// - If WAL replay hits a corrupted record
///
/// # Example
/// ```rust,no_run
/// use std::sync::Arc;
/// use guildvault::storage::persistent::open_journal;
/// use guildvault::storage::{InMemoryIdentityStore, InMemoryInventoryStore};
/// use guildvault::{EngineConfig, InventoryEngine};
///
/// let journal = open_journal("./guild.vault", None)?;
/// let store = InMemoryInventoryStore::open(Arc::new(journal))?;
/// let engine = InventoryEngine::new(
///     Arc::new(store),
///     Arc::new(InMemoryIdentityStore::new()),
///     EngineConfig::default(),
/// )?;
/// # Ok::<(), guildvault::VaultError>(())
/// ```
pub fn open_journal(
    path: impl AsRef<Path>,
    config: Option<PersistentConfig>,
) -> VaultResult<Journal> {
    let cfg = config.unwrap_or_default().validate()?;
    Ok(Journal::open(path.as_ref(), cfg)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_defaults() {
        let cfg = PersistentConfig::default().validate().unwrap();
        assert_eq!(cfg.max_wal_size, 8 * 1024 * 1024);
        assert!(cfg.sync_on_write);
    }

    #[test]
    fn test_config_rejects_tiny_wal() {
        let cfg = PersistentConfig {
            max_wal_size: 1024,
            ..PersistentConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ValidationError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_config_from_json() {
        let cfg: PersistentConfig = serde_json::from_str(r#"{ "sync_on_write": false }"#).unwrap();
        assert!(!cfg.sync_on_write);
        assert_eq!(cfg.max_wal_size, PersistentConfig::default().max_wal_size);
    }

    #[test]
    fn test_open_journal_validates_config() {
        let dir = tempdir().unwrap();
        let err = open_journal(
            dir.path(),
            Some(PersistentConfig {
                max_wal_size: 0,
                sync_on_write: false,
            }),
        )
        .unwrap_err();
        assert!(err.is_validation());

        assert!(open_journal(dir.path(), None).is_ok());
    }
}
