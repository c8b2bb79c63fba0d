//! # Store - ordered namespaced key-value store
//!
//! Ties the [`memtable`] and [`wal`] crates together into the store the
//! vendor catalog writes to. Keys are partitioned into named collections;
//! inside a collection keys are kept in ascending byte order.
//!
//! ## Architecture
//!
//! ```text
//! Catalog
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                    STORE                      │
//! │                                               │
//! │ write.rs → validate batch → WAL frame append  │
//! │              |                                │
//! │              v                                │
//! │           apply ops to per-collection         │
//! │           memtables (seq, seq+1, ...)         │
//! │                                               │
//! │ read.rs  → get() / range_scan() on one        │
//! │            collection's memtable              │
//! │                                               │
//! │ checkpoint → rewrite WAL with live entries    │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module       | Purpose                                              |
//! |--------------|------------------------------------------------------|
//! | [`lib.rs`]   | `Store` struct, constructors, accessors, `Debug`     |
//! | [`batch`]    | `WriteBatch` builder                                 |
//! | [`recovery`] | WAL replay into collections                          |
//! | [`write`]    | `put()`, `delete()`, `write()`, `checkpoint()`       |
//! | [`read`]     | `get()`, `range_scan()`, `RangeScan` cursor          |
//!
//! ## Atomicity
//!
//! Every mutation goes through [`Store::write`]. A batch is validated in
//! full, appended to the WAL as one CRC-checked frame, and only then applied
//! in memory. Replay drops a torn final frame as a unit, so a batch is either
//! entirely visible after a restart or not at all.
mod batch;
mod read;
mod recovery;
mod write;

use anyhow::Result;
use memtable::Memtable;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;
use wal::WalWriter;

pub use batch::WriteBatch;
pub use read::RangeScan;
pub use recovery::replay_wal_into;
pub use wal::WalOp;

/// Maximum allowed key size in bytes (64 KiB).
pub const MAX_KEY_SIZE: usize = 64 * 1024;
/// Maximum allowed value size in bytes (10 MiB).
pub const MAX_VALUE_SIZE: usize = 10 * 1024 * 1024;
/// Maximum allowed collection name length in bytes.
pub const MAX_COLLECTION_NAME: usize = 255;

/// Ordered key-value store partitioned into collections.
///
/// Each collection is an independent [`Memtable`]; the same key may exist in
/// two collections without interference. Durability is optional: a store
/// built with [`Store::in_memory`] has no WAL and loses its contents on drop.
pub struct Store {
    pub(crate) collections: BTreeMap<String, Memtable>,
    pub(crate) wal_path: Option<PathBuf>,
    pub(crate) wal_writer: Option<WalWriter>,
    /// If `true`, every WAL append is followed by `fsync`.
    pub(crate) wal_sync: bool,
    /// Sequence number of the most recent op.
    pub(crate) seq: u64,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sizes: BTreeMap<&str, usize> = self
            .collections
            .iter()
            .map(|(name, mem)| (name.as_str(), mem.live_len()))
            .collect();
        f.debug_struct("Store")
            .field("seq", &self.seq)
            .field("wal_path", &self.wal_path)
            .field("wal_sync", &self.wal_sync)
            .field("collections", &sizes)
            .finish()
    }
}

impl Store {
    /// Opens a durable store, rebuilding every collection from the WAL at
    /// `wal_path` (created if missing).
    ///
    /// Replay happens before the writer is opened so that the reader never
    /// shares the file with an append handle.
    pub fn open<P: AsRef<Path>>(wal_path: P, wal_sync: bool) -> Result<Self> {
        let wal_path = wal_path.as_ref().to_path_buf();
        if let Some(parent) = wal_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut collections = BTreeMap::new();
        let seq = replay_wal_into(&wal_path, &mut collections)?;

        let wal_writer = WalWriter::create(&wal_path, wal_sync)?;

        info!(
            wal = %wal_path.display(),
            seq,
            collections = collections.len(),
            "store opened"
        );

        Ok(Self {
            collections,
            wal_path: Some(wal_path),
            wal_writer: Some(wal_writer),
            wal_sync,
            seq,
        })
    }

    /// Creates a store with no WAL.
    pub fn in_memory() -> Self {
        Self {
            collections: BTreeMap::new(),
            wal_path: None,
            wal_writer: None,
            wal_sync: false,
            seq: 0,
        }
    }

    /// Returns the current monotonic sequence number.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.wal_writer.is_some()
    }

    pub fn wal_path(&self) -> Option<&Path> {
        self.wal_path.as_deref()
    }

    /// Names of collections that have ever been written, in sorted order.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Number of live keys in `collection`.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(Memtable::live_len)
            .unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.values().all(|m| m.live_len() == 0)
    }
}

/// Best-effort fsync on drop so an unsynced store still leaves its last
/// frames on disk. Errors are ignored because Drop cannot report them.
impl Drop for Store {
    fn drop(&mut self) {
        if let Some(writer) = self.wal_writer.as_mut() {
            if !self.wal_sync {
                let _ = writer.sync_to_disk();
            }
        }
    }
}

#[cfg(test)]
mod tests;
