//! Checkpoint snapshots.
//!
//! A snapshot holds the full catalog and ledger as of a checkpoint. It is
//! written to a temporary file, synced, and renamed over the previous one, so
//! a reader sees either the old snapshot or the new one, never a mix.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Result as IoResult, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::item::Item;
use crate::movement::Movement;

use super::codec;

/// Contents of a snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotData {
    /// When the checkpoint was taken.
    pub created_at: DateTime<Utc>,
    /// Catalog in insertion order.
    pub items: Vec<Item>,
    /// Ledger in append order.
    pub movements: Vec<Movement>,
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Atomically replace the snapshot at `path`.
pub fn write(path: &Path, data: &SnapshotData, sync: bool) -> IoResult<()> {
    let tmp = temp_path(path);
    {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)?;
        let mut writer = BufWriter::new(file);
        codec::write_header(&mut writer)?;
        writer.write_all(&codec::encode(data)?)?;
        writer.flush()?;
        if sync {
            writer.get_ref().sync_all()?;
        }
    }
    fs::rename(&tmp, path)?;

    if sync {
        if let Some(parent) = path.parent() {
            // Directory fsync makes the rename itself durable. Not every platform allows it.
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
    }
    Ok(())
}

/// Read the snapshot at `path`, or `None` if no checkpoint was ever taken.
pub fn read(path: &Path) -> IoResult<Option<SnapshotData>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut reader = BufReader::new(file);
    let _version = codec::read_header(&mut reader)?;
    codec::decode(&mut reader).map(Some)
}
