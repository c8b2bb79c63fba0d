use crate::Store;

pub fn collect(store: &Store, collection: &str, start: &[u8], end: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    store
        .range_scan(collection, start, end)
        .unwrap()
        .map(|(k, v)| (k.to_vec(), v.to_vec()))
        .collect()
}

pub fn keys(store: &Store, collection: &str, start: &[u8], end: &[u8]) -> Vec<String> {
    collect(store, collection, start, end)
        .into_iter()
        .map(|(k, _)| String::from_utf8_lossy(&k).into_owned())
        .collect()
}
