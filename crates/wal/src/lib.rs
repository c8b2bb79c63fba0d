//! # WAL - Write-Ahead Log
//!
//! Durability layer for the vendor store. Every committed write batch is
//! serialized into one binary frame and appended to the WAL **before** the
//! in-memory collections change. On restart the WAL is replayed to rebuild
//! every collection.
//!
//! A frame is the unit of atomicity: a batch that writes a qualification
//! record, its priced twin and an index marker lands in a single frame, so a
//! crash mid-append loses the whole batch and never a part of it.
//!
//! ## Binary Record Format
//!
//! ```text
//! [record_len: u32 LE][crc32: u32 LE][body ...]
//! ```
//!
//! Body: `[seq: u64][op_count: u32][op ...]`
//!
//! Op (Put): `[op=0: u8][coll_len: u16][collection][key_len: u32][key][val_len: u32][value]`
//! Op (Del): `[op=1: u8][coll_len: u16][collection][key_len: u32][key]`
//!
//! `record_len` includes the 4-byte CRC but **not** itself. The `i`-th op of a
//! frame carries sequence number `seq + i`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wal::{WalOp, WalReader, WalRecord, WalWriter};
//!
//! let mut w = WalWriter::create("vendor.wal", true).unwrap();
//! w.append(&WalRecord {
//!     seq: 1,
//!     ops: vec![WalOp::Put {
//!         collection: "vendor".into(),
//!         key: b"test0".to_vec(),
//!         value: b"{}".to_vec(),
//!     }],
//! }).unwrap();
//! drop(w);
//!
//! let mut r = WalReader::open("vendor.wal").unwrap();
//! r.replay(|rec| println!("{:?}", rec)).unwrap();
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use thiserror::Error;

const OP_PUT: u8 = 0;
const OP_DEL: u8 = 1;

/// A single mutation inside a WAL frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalOp {
    /// A key-value insertion.
    Put {
        /// Collection the key belongs to.
        collection: String,
        /// The lookup key.
        key: Vec<u8>,
        /// The payload value.
        value: Vec<u8>,
    },
    /// A key deletion (tombstone).
    Del {
        /// Collection the key belongs to.
        collection: String,
        /// The key to delete.
        key: Vec<u8>,
    },
}

impl WalOp {
    pub fn collection(&self) -> &str {
        match self {
            WalOp::Put { collection, .. } | WalOp::Del { collection, .. } => collection,
        }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            WalOp::Put { key, .. } | WalOp::Del { key, .. } => key,
        }
    }
}

/// One committed batch: an ordered list of ops sharing a base sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalRecord {
    /// Sequence number of the first op.
    pub seq: u64,
    pub ops: Vec<WalOp>,
}

impl WalRecord {
    /// Sequence number carried by the last op, or `seq` for an empty frame.
    pub fn last_seq(&self) -> u64 {
        self.seq
            .saturating_add(self.ops.len().saturating_sub(1) as u64)
    }
}

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A record failed CRC validation, contained an unknown op code, or
    /// carried a collection name that is not UTF-8.
    #[error("corrupt record")]
    Corrupt,
}

/// Append-only WAL writer.
///
/// Frames are serialized into an in-memory buffer, CRC-checksummed, and then
/// written to the underlying file in a single `write_all` call. When `sync` is
/// `true`, every append is followed by `sync_all()` (fsync).
pub struct WalWriter {
    file: File,
    sync: bool,
    /// Reusable scratch buffer to avoid allocation on every append.
    buf: Vec<u8>,
}

impl WalWriter {
    /// Opens (or creates) a WAL file in append mode.
    pub fn create<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, WalError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;
        Ok(Self {
            file,
            sync,
            buf: Vec::with_capacity(256),
        })
    }

    /// Serializes `record` and appends it to the WAL file as one frame.
    pub fn append(&mut self, record: &WalRecord) -> Result<(), WalError> {
        self.buf.clear();

        // Frame header (record_len + crc), filled in once the body is known
        self.buf.extend_from_slice(&[0u8; 8]);

        self.buf.write_u64::<LittleEndian>(record.seq)?;
        self.buf
            .write_u32::<LittleEndian>(checked_len(record.ops.len())?)?;
        for op in &record.ops {
            let collection = op.collection().as_bytes();
            let coll_len = u16::try_from(collection.len())
                .map_err(|_| invalid_input("collection name longer than u16::MAX bytes"))?;

            match op {
                WalOp::Put { key, value, .. } => {
                    self.buf.write_u8(OP_PUT)?;
                    self.buf.write_u16::<LittleEndian>(coll_len)?;
                    self.buf.extend_from_slice(collection);
                    self.buf.write_u32::<LittleEndian>(checked_len(key.len())?)?;
                    self.buf.extend_from_slice(key);
                    self.buf.write_u32::<LittleEndian>(checked_len(value.len())?)?;
                    self.buf.extend_from_slice(value);
                }
                WalOp::Del { key, .. } => {
                    self.buf.write_u8(OP_DEL)?;
                    self.buf.write_u16::<LittleEndian>(coll_len)?;
                    self.buf.extend_from_slice(collection);
                    self.buf.write_u32::<LittleEndian>(checked_len(key.len())?)?;
                    self.buf.extend_from_slice(key);
                }
            }
        }

        let body = &self.buf[8..];

        let mut hasher = Crc32::new();
        hasher.update(body);
        let crc = hasher.finalize();

        // record_len = body.len() + 4 (CRC), must fit in u32
        let record_len = (body.len() as u64) + 4;
        if record_len > (u32::MAX as u64) {
            return Err(invalid_input("WAL record too large (exceeds u32::MAX bytes)"));
        }

        self.buf[0..4].copy_from_slice(&(record_len as u32).to_le_bytes());
        self.buf[4..8].copy_from_slice(&crc.to_le_bytes());

        // Single write call for the entire frame
        self.file.write_all(&self.buf)?;
        self.file.flush()?;

        if self.sync {
            self.file.sync_all()?;
        }

        Ok(())
    }

    /// Changes whether later appends are followed by `sync_all()`.
    pub fn set_sync(&mut self, sync: bool) {
        self.sync = sync;
    }

    /// Forces all buffered data to be written to disk via `sync_all()`.
    pub fn sync_to_disk(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

fn invalid_input(msg: &'static str) -> WalError {
    WalError::Io(io::Error::new(io::ErrorKind::InvalidInput, msg))
}

fn checked_len(len: usize) -> Result<u32, WalError> {
    u32::try_from(len).map_err(|_| invalid_input("length exceeds u32::MAX"))
}

/// Sequential WAL reader that yields valid frames.
///
/// Generic over any `Read` implementor so tests can feed in-memory buffers.
/// A truncated tail frame (crash mid-write) is treated as a clean EOF and the
/// whole batch it carried is dropped. [`WalReader::replay`] reports where the
/// valid prefix ends so the caller can truncate the file there.
pub struct WalReader<R: Read> {
    rdr: BufReader<R>,
}

impl WalReader<File> {
    /// Opens an existing WAL file for sequential replay.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<WalReader<File>, WalError> {
        let f = File::open(path)?;
        Ok(WalReader {
            rdr: BufReader::new(f),
        })
    }
}

impl<R: Read> WalReader<R> {
    pub fn from_reader(reader: R) -> Self {
        WalReader {
            rdr: BufReader::new(reader),
        }
    }

    /// Replays every valid frame in the WAL, calling `apply` for each one.
    ///
    /// Returns the byte length of the valid prefix, i.e. the offset just past
    /// the last complete frame. Anything beyond it is a torn tail that must be
    /// cut off before new frames are appended.
    ///
    /// # Termination
    ///
    /// - **Clean EOF** -> `Ok(len)` where `len` is the file length.
    /// - **Truncated tail** -> `Ok(len)` after yielding all complete frames.
    /// - **CRC mismatch**, unknown op code, bad lengths -> `Err(WalError::Corrupt)`.
    /// - **I/O error** -> `Err(WalError::Io(...))`.
    pub fn replay<F>(&mut self, mut apply: F) -> Result<u64, WalError>
    where
        F: FnMut(WalRecord),
    {
        let mut body = Vec::with_capacity(256);
        let mut valid_len = 0u64;

        loop {
            let record_len = match self.rdr.read_u32::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(valid_len),
                Err(e) => return Err(WalError::Io(e)),
            };

            const MAX_RECORD_SIZE: u32 = 64 * 1024 * 1024; // 64MB safety cap
            if record_len <= 4 || record_len > MAX_RECORD_SIZE {
                return Err(WalError::Corrupt);
            }

            let crc = match self.rdr.read_u32::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(valid_len),
                Err(e) => return Err(WalError::Io(e)),
            };

            let body_len = (record_len - 4) as usize;
            body.clear();
            body.resize(body_len, 0);
            match self.rdr.read_exact(&mut body) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(valid_len),
                Err(e) => return Err(WalError::Io(e)),
            }

            let mut hasher = Crc32::new();
            hasher.update(&body);
            if hasher.finalize() != crc {
                return Err(WalError::Corrupt);
            }

            apply(decode_body(&body)?);
            valid_len += 4 + u64::from(record_len);
        }
    }
}

/// Parses a CRC-verified frame body. Any short read here means the writer
/// produced inconsistent lengths, so it is reported as corruption.
fn decode_body(body: &[u8]) -> Result<WalRecord, WalError> {
    let mut br = body;
    let seq = br.read_u64::<LittleEndian>().map_err(|_| WalError::Corrupt)?;
    let op_count = br.read_u32::<LittleEndian>().map_err(|_| WalError::Corrupt)? as usize;
    if op_count > body.len() {
        return Err(WalError::Corrupt);
    }

    let mut ops = Vec::with_capacity(op_count);
    for _ in 0..op_count {
        let op = br.read_u8().map_err(|_| WalError::Corrupt)?;
        let coll_len = br.read_u16::<LittleEndian>().map_err(|_| WalError::Corrupt)? as usize;
        let collection = String::from_utf8(take(&mut br, coll_len)?.to_vec())
            .map_err(|_| WalError::Corrupt)?;
        let key_len = br.read_u32::<LittleEndian>().map_err(|_| WalError::Corrupt)? as usize;
        let key = take(&mut br, key_len)?.to_vec();

        match op {
            OP_PUT => {
                let val_len =
                    br.read_u32::<LittleEndian>().map_err(|_| WalError::Corrupt)? as usize;
                let value = take(&mut br, val_len)?.to_vec();
                ops.push(WalOp::Put {
                    collection,
                    key,
                    value,
                });
            }
            OP_DEL => ops.push(WalOp::Del { collection, key }),
            _ => return Err(WalError::Corrupt),
        }
    }

    if !br.is_empty() {
        return Err(WalError::Corrupt);
    }
    Ok(WalRecord { seq, ops })
}

fn take<'a>(br: &mut &'a [u8], len: usize) -> Result<&'a [u8], WalError> {
    if len > br.len() {
        return Err(WalError::Corrupt);
    }
    let (head, tail) = br.split_at(len);
    *br = tail;
    Ok(head)
}
