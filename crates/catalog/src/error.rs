//! Error taxonomy for catalog operations.

use keycodec::KeyCodecError;
use std::fmt;
use thiserror::Error;

/// Input fields of a vendor write, in validation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Project,
    Status,
    Expiry,
    Price,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Name => "name",
            Field::Project => "project",
            Field::Status => "status",
            Field::Expiry => "expiry",
            Field::Price => "price",
        })
    }
}

/// Which collection a lookup went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Vendor,
    VendorPrice,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::Vendor => "Vendor",
            RecordKind::VendorPrice => "Vendor price",
        })
    }
}

/// Malformed or missing caller input. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Incorrect number of arguments. {0}")]
    Arity(&'static str),

    #[error("{key} must be a key in the transient map")]
    MissingTransient { key: &'static str },

    #[error("{key} value in the transient map must be a non-empty JSON string")]
    EmptyTransient { key: &'static str },

    #[error("Failed to decode JSON of: {raw}")]
    MalformedInput { raw: String, reason: String },

    #[error("{0} field must be a non-empty string")]
    EmptyField(Field),

    #[error("{0} field must not contain U+0000 or U+10FFFF")]
    ReservedCharacter(Field),

    #[error("price field must be a positive number")]
    NonPositivePrice,
}

impl ValidationError {
    /// The input field the error is about, if it concerns a single field.
    pub fn field(&self) -> Option<Field> {
        match self {
            ValidationError::EmptyField(f) | ValidationError::ReservedCharacter(f) => Some(*f),
            ValidationError::NonPositivePrice => Some(Field::Price),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{kind} does not exist: {name}")]
    NotFound { kind: RecordKind, name: String },

    /// The underlying store failed; `message` carries its full error chain.
    #[error("{context}: {message}")]
    Store { context: String, message: String },

    /// A composite key read back from the store does not decode.
    #[error("malformed index key: {0}")]
    MalformedKey(#[from] KeyCodecError),

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CatalogError {
    pub(crate) fn store(context: impl Into<String>, err: impl fmt::Display) -> Self {
        CatalogError::Store {
            context: context.into(),
            message: format!("{err:#}"),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}
