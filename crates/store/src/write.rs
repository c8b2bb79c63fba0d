/// Write path: `put()`, `delete()`, `write()`, and `checkpoint()`.
///
/// All mutations flow through [`Store::write`]. A batch is checked in full
/// before anything is persisted, appended to the WAL as a single frame, and
/// then applied to the in-memory collections.
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{debug, info};
use wal::{WalOp, WalRecord, WalWriter};

use crate::recovery::apply_record;
use crate::{Store, WriteBatch, MAX_COLLECTION_NAME, MAX_KEY_SIZE, MAX_VALUE_SIZE};

fn validate_op(op: &WalOp) -> Result<()> {
    let collection = op.collection();
    anyhow::ensure!(!collection.is_empty(), "collection name must not be empty");
    anyhow::ensure!(
        collection.len() <= MAX_COLLECTION_NAME,
        "collection name too long: {} bytes (max {})",
        collection.len(),
        MAX_COLLECTION_NAME
    );

    let key = op.key();
    anyhow::ensure!(!key.is_empty(), "key must not be empty");
    anyhow::ensure!(
        key.len() <= MAX_KEY_SIZE,
        "key too large: {} bytes (max {})",
        key.len(),
        MAX_KEY_SIZE
    );

    if let WalOp::Put { value, .. } = op {
        anyhow::ensure!(
            value.len() <= MAX_VALUE_SIZE,
            "value too large: {} bytes (max {})",
            value.len(),
            MAX_VALUE_SIZE
        );
    }
    Ok(())
}

impl Store {
    /// Inserts or replaces `key` in `collection`.
    pub fn put(
        &mut self,
        collection: &str,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(collection, key, value);
        self.write(batch)
    }

    /// Deletes `key` from `collection` by writing a tombstone.
    pub fn delete(&mut self, collection: &str, key: impl Into<Vec<u8>>) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.delete(collection, key);
        self.write(batch)
    }

    /// Commits `batch` atomically.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the store untouched, if any op has an empty
    /// or oversized collection/key/value, if the sequence counter would
    /// overflow, or if the WAL append fails.
    pub fn write(&mut self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        for op in batch.ops() {
            validate_op(op)?;
        }

        let count = batch.len() as u64;
        let first = self
            .seq
            .checked_add(1)
            .ok_or_else(|| anyhow::anyhow!("sequence number overflow (u64::MAX reached)"))?;
        let last = self
            .seq
            .checked_add(count)
            .ok_or_else(|| anyhow::anyhow!("sequence number overflow (u64::MAX reached)"))?;

        let record = WalRecord {
            seq: first,
            ops: batch.into_ops(),
        };

        // WAL first, memory second
        if let Some(writer) = self.wal_writer.as_mut() {
            writer.append(&record).context("WAL append failed")?;
        }

        apply_record(&mut self.collections, record);
        self.seq = last;

        debug!(first_seq = first, last_seq = last, ops = count, "committed write batch");
        Ok(())
    }

    /// Rewrites the WAL so it holds only live entries, then drops tombstones
    /// from memory.
    ///
    /// # Steps
    ///
    /// 1. Write every live entry, with its original sequence number, to
    ///    `<wal>.tmp`, followed by an empty frame carrying the current seq so
    ///    the counter survives a restart.
    /// 2. fsync and rename over the WAL.
    /// 3. Keep appending through the checkpoint file's handle.
    /// 4. Purge tombstones and empty collections.
    ///
    /// An in-memory store only performs step 4.
    pub fn checkpoint(&mut self) -> Result<()> {
        if let Some(wal_path) = self.wal_path.clone() {
            let tmp_path = tmp_path_for(&wal_path);
            let mut entries = 0usize;
            // A stale tmp from an interrupted checkpoint must not be appended to.
            if tmp_path.exists() {
                std::fs::remove_file(&tmp_path).with_context(|| {
                    format!("failed to remove stale {}", tmp_path.display())
                })?;
            }
            let mut tmp = WalWriter::create(&tmp_path, false).with_context(|| {
                format!("failed to create checkpoint file {}", tmp_path.display())
            })?;

            for (name, mem) in &self.collections {
                for (key, value, seq) in mem.range(b"", b"") {
                    tmp.append(&WalRecord {
                        seq,
                        ops: vec![WalOp::Put {
                            collection: name.clone(),
                            key: key.to_vec(),
                            value: value.to_vec(),
                        }],
                    })?;
                    entries += 1;
                }
            }
            tmp.append(&WalRecord {
                seq: self.seq,
                ops: Vec::new(),
            })?;
            tmp.sync_to_disk()?;

            std::fs::rename(&tmp_path, &wal_path).with_context(|| {
                format!(
                    "failed to move checkpoint {} over {}",
                    tmp_path.display(),
                    wal_path.display()
                )
            })?;
            // After the rename this handle is the live WAL.
            tmp.set_sync(self.wal_sync);
            self.wal_writer = Some(tmp);

            info!(wal = %wal_path.display(), entries, seq = self.seq, "WAL checkpointed");
        }

        let mut purged = 0usize;
        for mem in self.collections.values_mut() {
            purged += mem.purge_tombstones();
        }
        self.collections.retain(|_, mem| !mem.is_empty());
        debug!(purged, "tombstones purged");
        Ok(())
    }
}

fn tmp_path_for(wal_path: &std::path::Path) -> PathBuf {
    let mut name: OsString = wal_path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
