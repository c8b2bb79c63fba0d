//! # Memtable - ordered in-memory table for one collection
//!
//! Every collection in the store is backed by its own `Memtable`: a
//! `BTreeMap` from raw key bytes to a sequenced entry. Iteration is
//! always in ascending byte order, which is what makes range scans and
//! composite-key prefix scans possible without a separate index structure.
//!
//! Deletes are recorded as tombstones (`value == None`) so that a replayed
//! WAL can resolve the latest mutation per key purely by sequence number.

use std::collections::BTreeMap;
use std::ops::Bound;

/// Sequence number and optional value of one key.
/// `value == None` signifies a tombstone (delete).
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValueEntry {
    seq: u64,
    value: Option<Vec<u8>>,
}

#[derive(Debug)]
pub struct Memtable {
    map: BTreeMap<Vec<u8>, ValueEntry>,
    live: usize,
}

impl Memtable {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
            live: 0,
        }
    }

    /// Put a key with a seq number. Overwrites existing entry if seq is newer.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>, seq: u64) {
        match self.map.get(&key) {
            Some(old) if old.seq >= seq => return,
            Some(old) if old.value.is_some() => {}
            _ => self.live += 1,
        }
        self.map.insert(
            key,
            ValueEntry {
                seq,
                value: Some(value),
            },
        );
    }

    /// Delete: add a tombstone with seq
    pub fn delete(&mut self, key: Vec<u8>, seq: u64) {
        match self.map.get(&key) {
            Some(old) if old.seq >= seq => return,
            Some(old) if old.value.is_some() => self.live -= 1,
            _ => {}
        }
        self.map.insert(key, ValueEntry { seq, value: None });
    }

    /// Get the latest value if present and not a tombstone
    pub fn get(&self, key: &[u8]) -> Option<(u64, &[u8])> {
        self.map
            .get(key)
            .and_then(|e| e.value.as_deref().map(|v| (e.seq, v)))
    }

    /// Live entries with `start <= key < end`, in ascending key order.
    ///
    /// An empty `start` is unbounded below and an empty `end` is unbounded
    /// above. A non-empty `start` that is not below a non-empty `end` yields
    /// nothing.
    pub fn range<'a>(&'a self, start: &[u8], end: &[u8]) -> LiveRange<'a> {
        let lower = if start.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(start.to_vec())
        };
        let upper = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end.to_vec())
        };

        // BTreeMap::range panics on inverted bounds.
        let inner = if !start.is_empty() && !end.is_empty() && start >= end {
            None
        } else {
            Some(self.map.range((lower, upper)))
        };
        LiveRange { inner }
    }

    /// Number of entries, tombstones included.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Number of entries holding a value.
    pub fn live_len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Drops every tombstone. Only safe once no older value for those keys
    /// can be replayed from anywhere else.
    pub fn purge_tombstones(&mut self) -> usize {
        let before = self.map.len();
        self.map.retain(|_, e| e.value.is_some());
        before - self.map.len()
    }
}

impl Default for Memtable {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowing iterator over the live entries of a key range.
pub struct LiveRange<'a> {
    inner: Option<std::collections::btree_map::Range<'a, Vec<u8>, ValueEntry>>,
}

impl<'a> Iterator for LiveRange<'a> {
    type Item = (&'a [u8], &'a [u8], u64);

    fn next(&mut self) -> Option<Self::Item> {
        let inner = self.inner.as_mut()?;
        for (k, e) in inner.by_ref() {
            if let Some(v) = e.value.as_deref() {
                return Some((k.as_slice(), v, e.seq));
            }
        }
        None
    }
}
