//! Write-ahead log for the journal.
//!
//! Every change is appended here, and flushed (optionally fsynced), before the
//! in-memory mirror sees it. On open the log is replayed on top of the last
//! snapshot.
//!
//! # File Format
//! ```text
//! [MAGIC: 4 bytes][VERSION: 1 byte]
//! [ENTRY 1: codec record of WalEntry]
//! [ENTRY 2: codec record of WalEntry]
//! ...
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Error as IoError, ErrorKind, Result as IoResult, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::item::Item;
use crate::movement::Movement;

use super::codec;

/// A single entry in the write-ahead log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    /// Position in the current log, starting at 1 after every truncation.
    pub sequence: u64,
    /// When this entry was written.
    pub timestamp: DateTime<Utc>,
    /// The change being logged.
    pub kind: WalEntryKind,
}

/// The change recorded by a WAL entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WalEntryKind {
    /// An item write together with the movement it produced.
    Commit {
        /// Item state after the change.
        item: Item,
        /// Ledger entry, absent for catalog-only edits.
        movement: Option<Movement>,
    },
    /// A standalone ledger append.
    LedgerAppend(Movement),
    /// The whole catalog replaced at once.
    CatalogReplace(Vec<Item>),
    /// A restored catalog and ledger, replacing everything before it.
    Import {
        /// Items in catalog order.
        items: Vec<Item>,
        /// Movements in append order.
        movements: Vec<Movement>,
    },
}

struct WalState {
    writer: BufWriter<File>,
    sequence: u64,
}

/// Append-only log file.
///
/// Thread-safe via an internal mutex.
pub struct WriteAheadLog {
    path: PathBuf,
    state: Mutex<WalState>,
    sync_on_write: bool,
}

fn poisoned() -> IoError {
    IoError::new(ErrorKind::Other, "WAL lock poisoned")
}

impl WriteAheadLog {
    /// Open or create a WAL file.
    ///
    /// An existing file is scanned to recover the last sequence number; a new
    /// file gets the header.
    pub fn open(path: &Path, sync_on_write: bool) -> IoResult<Self> {
        let existing_len = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        let sequence = if existing_len >= codec::HEADER_LEN {
            let scan = Self::scan(path)?;
            if scan.torn {
                warn!(
                    last_sequence = scan.last_sequence,
                    dropped_bytes = existing_len - scan.valid_len,
                    "dropping torn WAL tail"
                );
                let file = OpenOptions::new().write(true).open(path)?;
                file.set_len(scan.valid_len)?;
                if sync_on_write {
                    file.sync_all()?;
                }
            }
            scan.last_sequence
        } else {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            codec::write_header(&mut file)?;
            if sync_on_write {
                file.sync_all()?;
            }
            0
        };

        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(WalState {
                writer: BufWriter::new(file),
                sequence,
            }),
            sync_on_write,
        })
    }

    fn lock(&self) -> IoResult<MutexGuard<'_, WalState>> {
        self.state.lock().map_err(|_| poisoned())
    }

    /// Append an entry, returning the sequence number assigned to it.
    pub fn append(&self, kind: WalEntryKind) -> IoResult<u64> {
        let mut state = self.lock()?;
        let sequence = state.sequence + 1;
        let encoded = codec::encode(&WalEntry {
            sequence,
            timestamp: Utc::now(),
            kind,
        })?;

        state.writer.write_all(&encoded)?;
        state.writer.flush()?;
        if self.sync_on_write {
            state.writer.get_ref().sync_data()?;
        }

        state.sequence = sequence;
        Ok(sequence)
    }

    /// Iterate over all entries, oldest first.
    pub fn iter(&self) -> IoResult<WalIterator> {
        WalIterator::new(&self.path)
    }

    /// Sequence number of the last appended entry (0 for an empty log).
    pub fn current_sequence(&self) -> IoResult<u64> {
        Ok(self.lock()?.sequence)
    }

    /// WAL file size in bytes.
    pub fn size_bytes(&self) -> IoResult<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Drop every entry, leaving only the header.
    ///
    /// Only call this once a snapshot covering all entries is durable. The
    /// header bytes are never rewritten, so a failure here leaves either the
    /// old log or an empty one.
    pub fn truncate(&self) -> IoResult<()> {
        let mut state = self.lock()?;
        state.writer.flush()?;

        let file = OpenOptions::new().write(true).open(&self.path)?;
        file.set_len(codec::HEADER_LEN)?;
        if self.sync_on_write {
            file.sync_all()?;
        }

        let file = OpenOptions::new().append(true).open(&self.path)?;
        state.writer = BufWriter::new(file);
        state.sequence = 0;
        Ok(())
    }

    fn scan(path: &Path) -> IoResult<WalScan> {
        let mut iter = WalIterator::new(path)?;
        let mut last_sequence = 0;
        for entry in iter.by_ref() {
            match entry {
                Ok(entry) => last_sequence = entry.sequence,
                Err(e) => {
                    // Replay decides whether this is fatal; here we only need the tail position.
                    warn!(after_sequence = last_sequence, error = %e, "WAL scan stopped at unreadable entry");
                    break;
                }
            }
        }
        Ok(WalScan {
            last_sequence,
            valid_len: iter.valid_len,
            torn: iter.torn,
        })
    }
}

struct WalScan {
    last_sequence: u64,
    valid_len: u64,
    torn: bool,
}

/// Iterator over WAL entries.
///
/// A torn final record (the stream ends mid-entry) ends iteration quietly;
/// any other decode failure is yielded as an error.
pub struct WalIterator {
    reader: BufReader<File>,
    file_size: u64,
    valid_len: u64,
    torn: bool,
}

impl WalIterator {
    fn new(path: &Path) -> IoResult<Self> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let _version = codec::read_header(&mut reader)?;
        Ok(Self {
            reader,
            file_size,
            valid_len: codec::HEADER_LEN,
            torn: false,
        })
    }
}

impl Iterator for WalIterator {
    type Item = IoResult<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.stream_position() {
            Ok(pos) if pos >= self.file_size => return None,
            Ok(_) => {}
            Err(e) => return Some(Err(e)),
        }

        match codec::decode::<WalEntry>(&mut self.reader) {
            Ok(entry) => match self.reader.stream_position() {
                Ok(pos) => {
                    self.valid_len = pos;
                    Some(Ok(entry))
                }
                Err(e) => Some(Err(e)),
            },
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.torn = true;
                None
            }
            Err(e) => Some(Err(e)),
        }
    }
}
