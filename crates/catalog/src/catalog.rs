//! Catalog operations over the store.

use keycodec::KeyCodecError;
use serde::Serialize;
use store::{Store, WriteBatch};
use tracing::{debug, error, info, warn};

use crate::error::{CatalogError, Field, RecordKind, ValidationError};
use crate::record::{QualificationRecord, VendorInput};

/// Collection holding qualification records and the status index.
pub const VENDOR_COLLECTION: &str = "vendor";
/// Collection holding priced records.
pub const PRICE_COLLECTION: &str = "vendorPrice";
/// Composite index over `(Status, Name)`.
pub const STATUS_INDEX: &str = "status~name";
/// Value stored under every index marker key.
pub const INDEX_SENTINEL: &[u8] = &[0x00];

/// Index marker key for a vendor with `status` and `name`.
pub fn status_marker(status: &str, name: &str) -> Result<String, KeyCodecError> {
    keycodec::encode(STATUS_INDEX, &[status, name])
}

/// Mediates between callers and the [`Store`]. Holds no state of its own.
#[derive(Debug)]
pub struct Catalog {
    store: Store,
}

impl Catalog {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Validates `input` and writes the qualification record, the priced
    /// record and the status marker as one batch.
    ///
    /// When the vendor already exists under a different status, its old
    /// marker is deleted in the same batch so the index only reflects
    /// current records.
    pub fn create_or_replace(&mut self, input: VendorInput) -> Result<(), CatalogError> {
        input.validate()?;
        let (qualification, priced) = input.into_records();
        let name = qualification.name.clone();

        let previous = self
            .store
            .get(VENDOR_COLLECTION, name.as_bytes())
            .map_err(|e| CatalogError::store(format!("Failed to get state for {name}"), e))?;
        let stale_marker = match previous.as_deref() {
            Some(bytes) => self.stale_marker(&qualification, bytes)?,
            None => None,
        };

        let marker = status_marker(&qualification.status, &name)?;

        let mut batch = WriteBatch::new();
        batch
            .put(VENDOR_COLLECTION, name.as_bytes(), serde_json::to_vec(&qualification)?)
            .put(PRICE_COLLECTION, name.as_bytes(), serde_json::to_vec(&priced)?);
        if let Some(stale) = &stale_marker {
            batch.delete(VENDOR_COLLECTION, stale.as_bytes());
        }
        batch.put(VENDOR_COLLECTION, marker.into_bytes(), INDEX_SENTINEL);

        self.store
            .write(batch)
            .map_err(|e| CatalogError::store(format!("Failed to store vendor {name}"), e))?;

        info!(
            name = %name,
            status = %qualification.status,
            replaced = previous.is_some(),
            reindexed = stale_marker.is_some(),
            "vendor stored"
        );
        Ok(())
    }

    /// Marker of the previously stored record when its status differs from
    /// the incoming one. An unreadable previous record cannot be reindexed;
    /// it is logged and left alone.
    fn stale_marker(
        &self,
        incoming: &QualificationRecord,
        previous: &[u8],
    ) -> Result<Option<String>, CatalogError> {
        let previous: QualificationRecord = match serde_json::from_slice(previous) {
            Ok(record) => record,
            Err(e) => {
                warn!(name = %incoming.name, error = %e, "previous record unreadable, old index marker kept");
                return Ok(None);
            }
        };
        if previous.status == incoming.status {
            return Ok(None);
        }
        Ok(Some(status_marker(&previous.status, &previous.name)?))
    }

    /// Raw qualification record bytes for `name`.
    pub fn fetch_qualification(&self, name: &str) -> Result<Vec<u8>, CatalogError> {
        self.store
            .get(VENDOR_COLLECTION, name.as_bytes())
            .map_err(|e| CatalogError::store(format!("Failed to get state for {name}"), e))?
            .ok_or_else(|| CatalogError::NotFound {
                kind: RecordKind::Vendor,
                name: name.to_string(),
            })
    }

    /// Raw priced record bytes for `name`.
    pub fn fetch_price(&self, name: &str) -> Result<Vec<u8>, CatalogError> {
        self.store
            .get(PRICE_COLLECTION, name.as_bytes())
            .map_err(|e| CatalogError::store(format!("Failed to get vendor price for {name}"), e))?
            .ok_or_else(|| CatalogError::NotFound {
                kind: RecordKind::VendorPrice,
                name: name.to_string(),
            })
    }

    /// JSON array of `{"Key", "Record"}` for every entry of the vendor
    /// collection in `[start, end)`.
    ///
    /// Values are copied verbatim. Index markers are ordinary keys of the same
    /// collection, so a range reaching below the first printable character
    /// returns them too.
    pub fn fetch_by_range(&self, start: &str, end: &str) -> Result<Vec<u8>, CatalogError> {
        let scan = self
            .store
            .range_scan(VENDOR_COLLECTION, start.as_bytes(), end.as_bytes())
            .map_err(|e| CatalogError::store("Failed to open range scan", e))?;

        let mut out = QueryResults::new();
        let mut markers = 0usize;
        for (key, value) in scan {
            if keycodec::is_composite(key) {
                markers += 1;
            }
            out.push(&String::from_utf8_lossy(key), value)?;
        }
        let count = out.len();
        debug!(start, end, count, markers, "range query");
        Ok(out.finish())
    }

    /// JSON array of `{"Key", "Record"}` for every vendor whose current
    /// status is `status`, in ascending name order.
    pub fn fetch_by_status(&self, status: &str) -> Result<Vec<u8>, CatalogError> {
        if keycodec::validate_component(status).is_err() {
            return Err(ValidationError::ReservedCharacter(Field::Status).into());
        }
        let (start, end) = keycodec::prefix_range(STATUS_INDEX, &[status])?;

        let scan = self
            .store
            .range_scan(VENDOR_COLLECTION, start.as_bytes(), end.as_bytes())
            .map_err(|e| CatalogError::store("Failed to open index scan", e))?;

        let mut out = QueryResults::new();
        for (key, _sentinel) in scan {
            let name = match marker_name(key, status) {
                Ok(name) => name,
                Err(e) => {
                    error!(key = ?String::from_utf8_lossy(key), error = %e, "corrupt status index entry");
                    return Err(e);
                }
            };
            match self.store.get(VENDOR_COLLECTION, name.as_bytes()) {
                Ok(Some(record)) => out.push(&name, &record)?,
                Ok(None) => warn!(name = %name, status, "index marker without record"),
                Err(e) => {
                    return Err(CatalogError::store(format!("Failed to get state for {name}"), e))
                }
            }
        }
        let count = out.len();
        debug!(status, count, "status query");
        Ok(out.finish())
    }
}

/// Recovers the vendor name from a status marker and checks that it belongs
/// to the expected index and status.
fn marker_name(key: &[u8], status: &str) -> Result<String, CatalogError> {
    let (index, mut parts) = keycodec::decode_bytes(key)?;
    if index != STATUS_INDEX || parts.len() != 2 || parts[0] != status {
        return Err(KeyCodecError::MalformedKey("not a status~name marker").into());
    }
    Ok(parts.swap_remove(1))
}

/// Builds `[{"Key":"k", "Record":<raw>},...]` without re-parsing records.
struct QueryResults {
    buf: Vec<u8>,
    count: usize,
}

impl QueryResults {
    fn new() -> Self {
        Self {
            buf: vec![b'['],
            count: 0,
        }
    }

    fn push(&mut self, key: &str, record: &[u8]) -> Result<(), CatalogError> {
        if self.count > 0 {
            self.buf.push(b',');
        }
        self.buf.extend_from_slice(b"{\"Key\":");
        write_json(&mut self.buf, key)?;
        self.buf.extend_from_slice(b", \"Record\":");
        self.buf.extend_from_slice(record);
        self.buf.push(b'}');
        self.count += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.count
    }

    fn finish(mut self) -> Vec<u8> {
        self.buf.push(b']');
        self.buf
    }
}

fn write_json<T: Serialize + ?Sized>(buf: &mut Vec<u8>, value: &T) -> Result<(), CatalogError> {
    serde_json::to_writer(buf, value)?;
    Ok(())
}
