mod catalog_tests;

use crate::*;
use store::Store;

pub fn vendor(name: &str, status: &str, price: f64) -> VendorInput {
    VendorInput {
        name: name.to_string(),
        project: "supplychain".to_string(),
        status: status.to_string(),
        expiry: "2020-05-01".to_string(),
        price,
    }
}

pub fn catalog() -> Catalog {
    Catalog::new(Store::in_memory())
}

pub fn parse(bytes: &[u8]) -> serde_json::Value {
    serde_json::from_slice(bytes).unwrap()
}

/// Keys of a `[{"Key":..,"Record":..}]` response.
pub fn result_keys(bytes: &[u8]) -> Vec<String> {
    parse(bytes)
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["Key"].as_str().unwrap().to_string())
        .collect()
}
