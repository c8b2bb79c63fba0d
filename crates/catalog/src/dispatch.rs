//! Invocation dispatch: function name + positional arguments + transient
//! input in, [`Response`] out.

use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{error, info, warn};

use crate::catalog::Catalog;
use crate::error::{CatalogError, ValidationError};
use crate::record::VendorInput;

/// Transient-map key carrying the vendor JSON for `putVendor`.
pub const TRANSIENT_VENDOR_KEY: &str = "vendor";

/// Every operation a caller can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    PutVendor,
    GetVendor,
    GetVendorPrice,
    GetVendorByRange,
    GetVendorByStatus,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::PutVendor,
        Operation::GetVendor,
        Operation::GetVendorPrice,
        Operation::GetVendorByRange,
        Operation::GetVendorByStatus,
    ];

    /// Function name used on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Operation::PutVendor => "putVendor",
            Operation::GetVendor => "getVendor",
            Operation::GetVendorPrice => "getVendorPrice",
            Operation::GetVendorByRange => "getVendorByRange",
            Operation::GetVendorByStatus => "getVendorByStatus",
        }
    }

    /// Lookups answer failures with a JSON `{"Error": ...}` body.
    fn json_errors(self) -> bool {
        !matches!(self, Operation::PutVendor)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Received unknown function invocation")]
pub struct UnknownFunction(pub String);

impl FromStr for Operation {
    type Err = UnknownFunction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| UnknownFunction(s.to_string()))
    }
}

/// Per-invocation confidential input. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transient(BTreeMap<String, Vec<u8>>);

impl Transient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> FromIterator<(K, V)> for Transient {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One call as delivered by the harness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub function: String,
    pub args: Vec<String>,
    pub transient: Transient,
}

impl Invocation {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            args: Vec::new(),
            transient: Transient::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn transient(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.transient.insert(key, value);
        self
    }
}

/// Outcome of an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Success(Vec<u8>),
    Error(String),
}

impl Response {
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    /// Payload on success, message bytes on failure.
    pub fn body(&self) -> &[u8] {
        match self {
            Response::Success(payload) => payload.as_slice(),
            Response::Error(message) => message.as_bytes(),
        }
    }

    fn from_error(op: Operation, err: &CatalogError) -> Self {
        let lookup_failure = matches!(
            err,
            CatalogError::NotFound { .. } | CatalogError::Store { .. }
        );
        if op.json_errors() && lookup_failure {
            Response::Error(json!({ "Error": err.to_string() }).to_string())
        } else {
            Response::Error(err.to_string())
        }
    }
}

impl Catalog {
    /// Resolves `invocation.function` and runs it.
    pub fn invoke(&mut self, invocation: &Invocation) -> Response {
        let function = invocation.function.as_str();
        info!(function, args = invocation.args.len(), "invoke start");

        let response = match function.parse::<Operation>() {
            Ok(op) => self.execute(op, &invocation.args, &invocation.transient),
            Err(e) => {
                warn!(function, "unknown function");
                Response::Error(e.to_string())
            }
        };

        info!(function, ok = response.is_success(), "invoke stop");
        response
    }

    /// Runs a resolved operation.
    pub fn execute(&mut self, op: Operation, args: &[String], transient: &Transient) -> Response {
        let result = match op {
            Operation::PutVendor => self.put_vendor(args, transient).map(|()| Vec::new()),
            Operation::GetVendor => {
                exactly_one(args, "Expecting name of the vendor to query")
                    .and_then(|name| self.fetch_qualification(name))
            }
            Operation::GetVendorPrice => {
                exactly_one(args, "Expecting name of the vendor to query")
                    .and_then(|name| self.fetch_price(name))
            }
            Operation::GetVendorByRange => match args {
                [start, end] => self.fetch_by_range(start, end),
                _ => Err(ValidationError::Arity("Expecting 2").into()),
            },
            Operation::GetVendorByStatus => {
                exactly_one(args, "Expecting status to query")
                    .and_then(|status| self.fetch_by_status(status))
            }
        };

        match result {
            Ok(payload) => Response::Success(payload),
            Err(err) => {
                if matches!(err, CatalogError::MalformedKey(_)) {
                    error!(op = %op, error = %err, "index invariant violated");
                }
                Response::from_error(op, &err)
            }
        }
    }

    fn put_vendor(&mut self, args: &[String], transient: &Transient) -> Result<(), CatalogError> {
        if !args.is_empty() {
            return Err(ValidationError::Arity(
                "Private data must be passed in transient map.",
            )
            .into());
        }
        let input = vendor_input(transient)?;
        self.create_or_replace(input)
    }
}

fn exactly_one<'a>(args: &'a [String], expecting: &'static str) -> Result<&'a str, CatalogError> {
    match args {
        [one] => Ok(one.as_str()),
        _ => Err(ValidationError::Arity(expecting).into()),
    }
}

/// Extracts and decodes the `vendor` transient entry. Presence and shape are
/// checked here; business rules are left to [`VendorInput::validate`].
pub fn vendor_input(transient: &Transient) -> Result<VendorInput, ValidationError> {
    let raw = transient
        .get(TRANSIENT_VENDOR_KEY)
        .ok_or(ValidationError::MissingTransient {
            key: TRANSIENT_VENDOR_KEY,
        })?;
    if raw.is_empty() {
        return Err(ValidationError::EmptyTransient {
            key: TRANSIENT_VENDOR_KEY,
        });
    }
    serde_json::from_slice(raw).map_err(|e| ValidationError::MalformedInput {
        raw: String::from_utf8_lossy(raw).into_owned(),
        reason: e.to_string(),
    })
}
