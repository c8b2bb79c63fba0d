/// Recovery: rebuild collections by replaying the WAL.
use anyhow::{Context, Result};
use memtable::Memtable;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, warn};
use wal::{WalOp, WalReader, WalRecord};

/// Replays the WAL at `path` into `collections` and returns the highest
/// sequence number seen. A missing WAL file is an empty store (`Ok(0)`).
///
/// A torn tail frame is cut off the file so that frames appended afterwards
/// start on a frame boundary.
pub fn replay_wal_into(path: &Path, collections: &mut BTreeMap<String, Memtable>) -> Result<u64> {
    if !path.exists() {
        return Ok(0);
    }

    let mut reader = WalReader::open(path)
        .with_context(|| format!("failed to open WAL at {}", path.display()))?;
    let mut max_seq = 0u64;
    let mut frames = 0usize;

    let valid_len = reader
        .replay(|record| {
            frames += 1;
            max_seq = max_seq.max(record.last_seq());
            apply_record(collections, record);
        })
        .with_context(|| format!("failed to replay WAL at {}", path.display()))?;

    drop(reader);

    let file_len = std::fs::metadata(path)
        .with_context(|| format!("failed to stat WAL at {}", path.display()))?
        .len();
    if file_len > valid_len {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .with_context(|| format!("failed to open WAL at {} for repair", path.display()))?;
        file.set_len(valid_len)
            .with_context(|| format!("failed to truncate torn WAL tail at {}", path.display()))?;
        file.sync_all()?;
        warn!(
            wal = %path.display(),
            dropped_bytes = file_len - valid_len,
            "discarded torn WAL tail"
        );
    }

    debug!(wal = %path.display(), frames, max_seq, "replayed WAL");
    Ok(max_seq)
}

/// Applies every op of `record`, the `i`-th op at sequence `record.seq + i`.
pub(crate) fn apply_record(collections: &mut BTreeMap<String, Memtable>, record: WalRecord) {
    let base = record.seq;
    for (i, op) in record.ops.into_iter().enumerate() {
        let seq = base.saturating_add(i as u64);
        match op {
            WalOp::Put {
                collection,
                key,
                value,
            } => collections.entry(collection).or_default().put(key, value, seq),
            WalOp::Del { collection, key } => {
                collections.entry(collection).or_default().delete(key, seq)
            }
        }
    }
}
