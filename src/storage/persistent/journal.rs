//! The durable [`Persistence`] implementation.
//!
//! A journal directory holds the last checkpoint snapshot plus a write-ahead
//! log of everything since. The journal keeps a mirror of the persisted state
//! so `load_*` never touches disk and checkpoints can be cut at any time.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockWriteGuard};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::item::{Item, ItemId};
use crate::movement::{Movement, MovementId};
use crate::storage::traits::{Persistence, StorageError};

use super::file_lock::FileLock;
use super::snapshot::{self, SnapshotData};
use super::wal::{WalEntryKind, WriteAheadLog};
use super::PersistentConfig;

/// WAL file name inside the journal directory.
pub const WAL_FILE: &str = "vault.wal";

/// Snapshot file name inside the journal directory.
pub const SNAPSHOT_FILE: &str = "vault.snapshot";

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

fn io_err(context: &str, e: IoError) -> StorageError {
    if e.kind() == ErrorKind::InvalidData {
        StorageError::Corruption(format!("{context}: {e}"))
    } else {
        StorageError::BackendError(format!("{context}: {e}"))
    }
}

/// What a checkpoint wrote and reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointStats {
    /// Items in the new snapshot.
    pub items: usize,
    /// Movements in the new snapshot.
    pub movements: usize,
    /// WAL bytes dropped by the truncation.
    pub wal_bytes_reclaimed: u64,
}

#[derive(Debug, Default)]
struct Mirror {
    order: Vec<ItemId>,
    items: HashMap<ItemId, Item>,
    movements: Vec<Movement>,
    movement_ids: HashSet<MovementId>,
}

impl Mirror {
    fn from_snapshot(data: SnapshotData) -> Self {
        let mut mirror = Self::default();
        mirror.replace_catalog(data.items);
        for movement in data.movements {
            mirror.push_movement(movement);
        }
        mirror
    }

    fn put_item(&mut self, item: Item) {
        if !self.items.contains_key(&item.id) {
            self.order.push(item.id);
        }
        self.items.insert(item.id, item);
    }

    fn replace_catalog(&mut self, items: Vec<Item>) {
        self.order.clear();
        self.items.clear();
        for item in items {
            self.put_item(item);
        }
    }

    /// Returns false when the movement was already recorded.
    fn push_movement(&mut self, movement: Movement) -> bool {
        if !self.movement_ids.insert(movement.id) {
            return false;
        }
        self.movements.push(movement);
        true
    }

    fn apply(&mut self, kind: WalEntryKind) {
        match kind {
            WalEntryKind::Commit { item, movement } => {
                self.put_item(item);
                if let Some(m) = movement {
                    self.push_movement(m);
                }
            }
            WalEntryKind::LedgerAppend(m) => {
                self.push_movement(m);
            }
            WalEntryKind::CatalogReplace(items) => self.replace_catalog(items),
            WalEntryKind::Import { items, movements } => {
                self.replace_catalog(items);
                self.movements.clear();
                self.movement_ids.clear();
                for m in movements {
                    self.push_movement(m);
                }
            }
        }
    }

    fn items_in_order(&self) -> Vec<Item> {
        self.order
            .iter()
            .filter_map(|id| self.items.get(id))
            .cloned()
            .collect()
    }

    fn check_movement(&self, movement: &Movement) -> Result<(), StorageError> {
        if self.movement_ids.contains(&movement.id) {
            return Err(StorageError::DuplicateKey(movement.id.to_string()));
        }
        Ok(())
    }
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

/// WAL + snapshot persistence rooted at one directory.
///
/// The directory is locked for as long as the journal is alive.
pub struct Journal {
    dir: PathBuf,
    _lock: FileLock,
    wal: WriteAheadLog,
    snapshot_path: PathBuf,
    config: PersistentConfig,
    mirror: RwLock<Mirror>,
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("dir", &self.dir)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Journal {
    /// Open or create a journal in `dir`.
    ///
    /// Loads the last snapshot, then replays the WAL on top of it. A torn
    /// final WAL record is dropped; any checksum failure aborts with
    /// [`StorageError::Corruption`].
    pub fn open(dir: &Path, config: PersistentConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(dir).map_err(|e| io_err("failed to create journal directory", e))?;

        let lock = FileLock::acquire(dir).map_err(|e| {
            StorageError::BackendError(format!("failed to acquire journal lock: {e}"))
        })?;

        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let mut mirror = match snapshot::read(&snapshot_path)
            .map_err(|e| io_err("failed to read snapshot", e))?
        {
            Some(data) => Mirror::from_snapshot(data),
            None => Mirror::default(),
        };
        let from_snapshot = mirror.movements.len();

        let wal = WriteAheadLog::open(&dir.join(WAL_FILE), config.sync_on_write)
            .map_err(|e| io_err("failed to open WAL", e))?;

        let mut replayed = 0usize;
        for entry in wal.iter().map_err(|e| io_err("failed to read WAL", e))? {
            let entry = entry.map_err(|e| {
                warn!(error = %e, "WAL replay hit a corrupted entry");
                io_err("WAL replay failed", e)
            })?;
            mirror.apply(entry.kind);
            replayed += 1;
        }
        debug!(replayed, "WAL replayed");

        info!(
            dir = %dir.display(),
            items = mirror.order.len(),
            movements = mirror.movements.len(),
            from_snapshot,
            "journal opened"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            _lock: lock,
            wal,
            snapshot_path,
            config,
            mirror: RwLock::new(mirror),
        })
    }

    /// The journal directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Current WAL size in bytes.
    pub fn wal_size(&self) -> Result<u64, StorageError> {
        self.wal.size_bytes().map_err(|e| io_err("failed to stat WAL", e))
    }

    /// Write a snapshot of the full state and truncate the WAL.
    ///
    /// Writers are blocked for the duration.
    pub fn checkpoint(&self) -> Result<CheckpointStats, StorageError> {
        let mirror = self.mirror.write().map_err(|_| lock_err("journal.checkpoint"))?;
        self.checkpoint_locked(&mirror)
    }

    fn checkpoint_locked(&self, mirror: &Mirror) -> Result<CheckpointStats, StorageError> {
        let before = self.wal_size()?;
        let data = SnapshotData {
            created_at: Utc::now(),
            items: mirror.items_in_order(),
            movements: mirror.movements.clone(),
        };
        snapshot::write(&self.snapshot_path, &data, self.config.sync_on_write)
            .map_err(|e| io_err("failed to write snapshot", e))?;
        self.wal
            .truncate()
            .map_err(|e| io_err("failed to truncate WAL", e))?;

        let stats = CheckpointStats {
            items: data.items.len(),
            movements: data.movements.len(),
            wal_bytes_reclaimed: before.saturating_sub(self.wal_size()?),
        };
        info!(
            items = stats.items,
            movements = stats.movements,
            reclaimed = stats.wal_bytes_reclaimed,
            "journal checkpoint written"
        );
        Ok(stats)
    }

    /// Log `kind`, apply it to the mirror, and checkpoint if the WAL outgrew its limit.
    ///
    /// The mirror lock is held across the append so a checkpoint never
    /// truncates an entry the mirror has not seen. Once the append succeeds
    /// the write has succeeded: a failed checkpoint is logged and retried on
    /// the next write.
    fn write(&self, kind: WalEntryKind, context: &'static str) -> Result<(), StorageError> {
        let mut mirror: RwLockWriteGuard<'_, Mirror> =
            self.mirror.write().map_err(|_| lock_err(context))?;
        self.wal
            .append(kind.clone())
            .map_err(|e| io_err("failed to append to WAL", e))?;
        mirror.apply(kind);

        match self.wal_size() {
            Ok(size) if size > self.config.max_wal_size => {
                if let Err(e) = self.checkpoint_locked(&mirror) {
                    warn!(error = %e, wal_bytes = size, "checkpoint failed, WAL left in place");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "could not size WAL after append"),
        }
        Ok(())
    }
}

impl Persistence for Journal {
    fn load_catalog(&self) -> Result<Vec<Item>, StorageError> {
        let mirror = self.mirror.read().map_err(|_| lock_err("journal.load_catalog"))?;
        Ok(mirror.items_in_order())
    }

    fn save_catalog(&self, items: &[Item]) -> Result<(), StorageError> {
        for item in items {
            check_quantity(item)?;
        }
        self.write(
            WalEntryKind::CatalogReplace(items.to_vec()),
            "journal.save_catalog",
        )
    }

    fn load_ledger(&self) -> Result<Vec<Movement>, StorageError> {
        let mirror = self.mirror.read().map_err(|_| lock_err("journal.load_ledger"))?;
        Ok(mirror.movements.clone())
    }

    fn append_ledger(&self, movement: &Movement) -> Result<(), StorageError> {
        {
            let mirror = self.mirror.read().map_err(|_| lock_err("journal.append_ledger"))?;
            mirror.check_movement(movement)?;
        }
        self.write(
            WalEntryKind::LedgerAppend(movement.clone()),
            "journal.append_ledger",
        )
    }

    fn import(&self, items: &[Item], movements: &[Movement]) -> Result<(), StorageError> {
        for item in items {
            check_quantity(item)?;
        }
        let mut seen = HashSet::with_capacity(movements.len());
        for m in movements {
            if !seen.insert(m.id) {
                return Err(StorageError::DuplicateKey(m.id.to_string()));
            }
        }
        self.write(
            WalEntryKind::Import {
                items: items.to_vec(),
                movements: movements.to_vec(),
            },
            "journal.import",
        )
    }

    fn commit(&self, item: &Item, movement: Option<&Movement>) -> Result<(), StorageError> {
        check_quantity(item)?;
        if let Some(m) = movement {
            let mirror = self.mirror.read().map_err(|_| lock_err("journal.commit"))?;
            mirror.check_movement(m)?;
        }
        self.write(
            WalEntryKind::Commit {
                item: item.clone(),
                movement: movement.cloned(),
            },
            "journal.commit",
        )
    }
}
