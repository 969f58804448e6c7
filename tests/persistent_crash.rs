//! Crash recovery tests for the journal.
//!
//! These tests verify that the storage layer correctly handles:
//! - Partial writes (simulated crash mid-write)
//! - Replay across restarts and checkpoints
//! - CRC corruption detection

#![cfg(feature = "persistent")]

use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use guildvault::storage::persistent::{open_journal, Journal, PersistentConfig, WAL_FILE};
use guildvault::{
    Category, EngineConfig, InMemoryIdentityStore, InMemoryInventoryStore, InventoryEngine,
    InventoryStore, MovementKind, MovementLedger, NewItem, Player, Role, Tier, User,
};
use rust_decimal::Decimal;
use tempfile::tempdir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fast_config() -> PersistentConfig {
    PersistentConfig {
        sync_on_write: false,
        ..PersistentConfig::default()
    }
}

fn engine_over(journal: Arc<Journal>) -> InventoryEngine {
    let store = InMemoryInventoryStore::open(journal).unwrap();
    InventoryEngine::new(
        Arc::new(store),
        Arc::new(InMemoryIdentityStore::new()),
        EngineConfig::default(),
    )
    .unwrap()
}

fn open_engine(dir: &Path, config: PersistentConfig) -> InventoryEngine {
    engine_over(Arc::new(open_journal(dir, Some(config)).unwrap()))
}

fn admin() -> User {
    User::new("admin", Role::Admin).unwrap()
}

fn new_item(name: &str, quantity: i64) -> NewItem {
    NewItem::builder()
        .name(name)
        .category(Category::Consumable)
        .tier(Tier::Rare)
        .unit_value(Decimal::new(1999, 2))
        .initial_quantity(quantity)
        .owner(Player::new("p4", "Gandalf", "Wizard"))
        .build()
        .unwrap()
}

/// Catalog and ledger come back field-for-field identical.
#[test]
fn test_reopen_is_lossless() {
    let dir = tempdir().unwrap();
    let (items, movements) = {
        let engine = open_engine(dir.path(), fast_config());
        let potion = engine.create_item(new_item("Greater Health Potion", 150), &admin()).unwrap();
        engine
            .apply_movement(potion.id, MovementKind::Out, 30, &admin(), Some("siege".to_string()))
            .unwrap();
        engine.create_item(new_item("Phoenix Feather", 1), &admin()).unwrap();
        (engine.items().unwrap(), engine.movements().unwrap())
    };

    for _ in 0..2 {
        let engine = open_engine(dir.path(), fast_config());
        assert_eq!(engine.items().unwrap(), items);
        assert_eq!(engine.movements().unwrap(), movements);
        assert!(engine.audit().unwrap().is_empty());
    }
}

/// A torn final record is dropped; every surviving item still has its movement.
#[test]
fn test_partial_wal_entry_recovery() {
    init_tracing();
    let dir = tempdir().unwrap();
    let wal_path = dir.path().join(WAL_FILE);

    {
        let engine = open_engine(dir.path(), fast_config());
        for i in 0..5 {
            engine.create_item(new_item(&format!("potion_{i}"), 10), &admin()).unwrap();
        }
    }

    {
        let file = fs::OpenOptions::new().write(true).open(&wal_path).unwrap();
        let size = file.metadata().unwrap().len();
        // Cut into the last record, simulating a crash mid-write.
        file.set_len(size - 7).unwrap();
    }

    let engine = open_engine(dir.path(), fast_config());
    let items = engine.items().unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(engine.ledger_len().unwrap(), 4);
    assert!(engine.audit().unwrap().is_empty());

    // The log keeps accepting writes after recovery.
    engine.create_item(new_item("potion_5", 1), &admin()).unwrap();
    drop(engine);
    let engine = open_engine(dir.path(), fast_config());
    assert_eq!(engine.items().unwrap().len(), 5);
}

/// A flipped byte inside a record fails the open instead of silently losing data.
#[test]
fn test_crc_corruption_detection() {
    init_tracing();
    let dir = tempdir().unwrap();
    let wal_path = dir.path().join(WAL_FILE);

    {
        let engine = open_engine(dir.path(), fast_config());
        engine.create_item(new_item("Star Fragment", 3), &admin()).unwrap();
    }

    {
        let mut content = Vec::new();
        fs::File::open(&wal_path)
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        // File header is 5 bytes, frame header another 9: this lands in the JSON payload.
        content[20] ^= 0xFF;
        fs::File::create(&wal_path)
            .unwrap()
            .write_all(&content)
            .unwrap();
    }

    let err = open_journal(dir.path(), Some(fast_config())).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("CRC") || msg.contains("orrupt"), "{msg}");
}

/// State written before and after a checkpoint survives a restart.
#[test]
fn test_checkpoint_recovery() {
    init_tracing();
    let dir = tempdir().unwrap();
    let potion_id;
    {
        let journal = Arc::new(open_journal(dir.path(), Some(fast_config())).unwrap());
        let engine = engine_over(journal.clone());
        let potion = engine.create_item(new_item("Mana Potion", 10), &admin()).unwrap();
        potion_id = potion.id;

        let stats = journal.checkpoint().unwrap();
        assert_eq!(stats.items, 1);
        assert_eq!(stats.movements, 1);

        engine.stock_in(potion.id, 5, &admin()).unwrap();
        engine.stock_out(potion.id, 12, &admin()).unwrap();
    }

    let engine = open_engine(dir.path(), fast_config());
    assert_eq!(engine.get_item(potion_id).unwrap().quantity, 3);
    assert_eq!(engine.movements_for(potion_id).unwrap().len(), 3);
}

/// A small WAL limit forces automatic checkpoints without losing anything.
#[test]
fn test_automatic_checkpoints() {
    let dir = tempdir().unwrap();
    let config = PersistentConfig {
        max_wal_size: 4 * 1024,
        sync_on_write: false,
    };
    let potion_id;
    {
        let engine = open_engine(dir.path(), config.clone());
        let potion = engine.create_item(new_item("Elixir", 0), &admin()).unwrap();
        potion_id = potion.id;
        for _ in 0..40 {
            engine.stock_in(potion.id, 2, &admin()).unwrap();
        }
        for _ in 0..10 {
            engine.stock_out(potion.id, 3, &admin()).unwrap();
        }
    }

    let engine = open_engine(dir.path(), config);
    assert_eq!(engine.get_item(potion_id).unwrap().quantity, 50);
    assert_eq!(engine.ledger_len().unwrap(), 51);
    assert!(engine.audit().unwrap().is_empty());
}

/// Only one process may own a journal directory.
#[test]
fn test_directory_is_locked() {
    let dir = tempdir().unwrap();
    let _engine = open_engine(dir.path(), fast_config());
    let err = open_journal(dir.path(), Some(fast_config())).unwrap_err();
    assert!(err.to_string().contains("lock"));
}

/// A rejected OUT never reaches the log.
#[test]
fn test_rejected_movement_is_not_persisted() {
    let dir = tempdir().unwrap();
    let potion_id;
    {
        let engine = open_engine(dir.path(), fast_config());
        let potion = engine.create_item(new_item("Antidote", 2), &admin()).unwrap();
        potion_id = potion.id;
        assert!(engine.stock_out(potion.id, 3, &admin()).unwrap_err().is_insufficient_stock());
    }

    let engine = open_engine(dir.path(), fast_config());
    assert_eq!(engine.get_item(potion_id).unwrap().quantity, 2);
    assert_eq!(engine.ledger_len().unwrap(), 1);
}

/// A damaged length field in the middle of the log fails the open instead of
/// cutting off every record after it.
#[test]
fn test_mid_log_length_damage_is_corruption() {
    init_tracing();
    let dir = tempdir().unwrap();
    let wal_path = dir.path().join(WAL_FILE);

    {
        let engine = open_engine(dir.path(), fast_config());
        let potion = engine.create_item(new_item("Mana Potion", 10), &admin()).unwrap();
        for _ in 0..5 {
            engine.stock_in(potion.id, 1, &admin()).unwrap();
        }
    }

    let mut content = fs::read(&wal_path).unwrap();
    let first_len = u32::from_le_bytes(content[6..10].try_into().unwrap()) as usize;
    // File header, then version + length + header crc + payload + crc of record 1.
    let second = 5 + 1 + 4 + 4 + first_len + 4;
    content[second + 4] = 0x01;
    fs::write(&wal_path, &content).unwrap();

    let err = open_journal(dir.path(), Some(fast_config())).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("CRC") || msg.contains("orrupt"), "{msg}");
    assert_eq!(fs::read(&wal_path).unwrap(), content);
}

/// A checkpoint that cannot be written never turns a logged movement into a
/// reported failure.
#[test]
fn test_failed_checkpoint_keeps_memory_and_disk_in_step() {
    init_tracing();
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("vault.snapshot.tmp")).unwrap();
    let config = PersistentConfig {
        max_wal_size: 4 * 1024,
        sync_on_write: false,
    };

    let (potion_id, ledger_len) = {
        let engine = open_engine(dir.path(), config.clone());
        let potion = engine.create_item(new_item("Elixir", 0), &admin()).unwrap();
        for _ in 0..30 {
            engine.stock_in(potion.id, 1, &admin()).unwrap();
        }
        (potion.id, engine.ledger_len().unwrap())
    };
    assert_eq!(ledger_len, 31);

    let engine = open_engine(dir.path(), config);
    assert_eq!(engine.ledger_len().unwrap(), ledger_len);
    assert_eq!(engine.get_item(potion_id).unwrap().quantity, 30);
    assert!(engine.audit().unwrap().is_empty());
}

/// An imported catalog and ledger land in the journal as one record.
#[test]
fn test_import_survives_reopen() {
    let source = InventoryEngine::in_memory().unwrap();
    let potion = source.create_item(new_item("Antidote", 4), &admin()).unwrap();
    source.stock_out(potion.id, 1, &admin()).unwrap();
    let items = source.items().unwrap();
    let history = source.inventory_store().ledger().history().unwrap();

    let dir = tempdir().unwrap();
    {
        let journal = Arc::new(open_journal(dir.path(), Some(fast_config())).unwrap());
        let store = InMemoryInventoryStore::open(journal).unwrap();
        store.import(items.clone(), history.clone()).unwrap();
    }

    let engine = open_engine(dir.path(), fast_config());
    assert_eq!(engine.items().unwrap(), items);
    assert_eq!(engine.movements().unwrap(), source.movements().unwrap());
}
