/// Read path: `get()` and `range_scan()`.
///
/// Both read a single collection's memtable. Tombstones are invisible: a
/// deleted key reads as absent and is skipped by scans.
use anyhow::Result;
use memtable::LiveRange;
use tracing::trace;

use crate::Store;

impl Store {
    /// Looks up `key` in `collection`.
    ///
    /// Absence (including an unknown collection) is `Ok(None)`, never an error.
    pub fn get(&self, collection: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|mem| mem.get(key))
            .map(|(_seq, value)| value.to_vec()))
    }

    /// Opens a cursor over `collection` yielding live entries with
    /// `start <= key < end` in ascending byte order.
    ///
    /// Empty `start`/`end` leave that side unbounded. The cursor borrows the
    /// store, so no write can happen while it is open; it is released when
    /// dropped or passed to [`RangeScan::close`].
    pub fn range_scan<'a>(
        &'a self,
        collection: &'a str,
        start: &[u8],
        end: &[u8],
    ) -> Result<RangeScan<'a>> {
        let inner = self
            .collections
            .get(collection)
            .map(|mem| mem.range(start, end));
        trace!(collection, "range scan opened");
        Ok(RangeScan {
            collection,
            inner,
            yielded: 0,
        })
    }
}

/// Lazy, single-pass cursor over a key range of one collection.
pub struct RangeScan<'a> {
    collection: &'a str,
    inner: Option<LiveRange<'a>>,
    yielded: usize,
}

impl<'a> RangeScan<'a> {
    /// Releases the cursor and returns how many entries it produced.
    pub fn close(mut self) -> usize {
        self.inner = None;
        self.yielded
    }
}

impl<'a> Iterator for RangeScan<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value, _seq) = self.inner.as_mut()?.next()?;
        self.yielded += 1;
        Some((key, value))
    }
}

impl Drop for RangeScan<'_> {
    fn drop(&mut self) {
        trace!(collection = self.collection, yielded = self.yielded, "range scan released");
    }
}
