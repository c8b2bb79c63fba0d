//! # Catalog - vendor records over the ordered store
//!
//! Stores vendor qualification data and vendor prices in two collections of
//! a [`store::Store`] and keeps a `status~name` composite index next to the
//! qualification records so vendors can be listed by status with a plain
//! range scan.
//!
//! ```text
//! vendor       test0                          -> {"Name":"test0",...}
//! vendor       \0status~name\0yes\0test0\0    -> 0x00
//! vendorPrice  test0                          -> {"Name":"test0",...,"Price":6666.0}
//! ```
//!
//! Callers either use [`Catalog`] methods directly or go through
//! [`Catalog::invoke`], which takes a function name, positional arguments
//! and a [`Transient`] map the way the hosting harness delivers them.
mod catalog;
mod dispatch;
mod error;
mod record;

pub use catalog::{
    status_marker, Catalog, INDEX_SENTINEL, PRICE_COLLECTION, STATUS_INDEX, VENDOR_COLLECTION,
};
pub use dispatch::{
    vendor_input, Invocation, Operation, Response, Transient, UnknownFunction,
    TRANSIENT_VENDOR_KEY,
};
pub use error::{CatalogError, Field, RecordKind, ValidationError};
pub use record::{PricedRecord, QualificationRecord, VendorInput};

#[cfg(test)]
mod tests;
