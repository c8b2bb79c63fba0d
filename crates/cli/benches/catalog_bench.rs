use catalog::{Catalog, VendorInput};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use store::Store;
use tempfile::tempdir;

const N_VENDORS: usize = 2_000;
const STATUSES: [&str; 4] = ["approved", "pending", "rejected", "expired"];

fn vendor(i: usize) -> VendorInput {
    VendorInput {
        name: format!("vendor{:05}", i),
        project: "supplychain".to_string(),
        status: STATUSES[i % STATUSES.len()].to_string(),
        expiry: "2020-05-01".to_string(),
        price: 100.0 + i as f64,
    }
}

fn filled_catalog() -> Catalog {
    let mut catalog = Catalog::new(Store::in_memory());
    for i in 0..N_VENDORS {
        catalog.create_or_replace(vendor(i)).unwrap();
    }
    catalog
}

fn catalog_write_in_memory_benchmark(c: &mut Criterion) {
    c.bench_function("catalog_write_in_memory_2k", |b| {
        b.iter_batched(
            || Catalog::new(Store::in_memory()),
            |mut catalog| {
                for i in 0..N_VENDORS {
                    catalog.create_or_replace(vendor(i)).unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn catalog_write_wal_benchmark(c: &mut Criterion) {
    c.bench_function("catalog_write_wal_nosync_2k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let store = Store::open(dir.path().join("bench.wal"), false).unwrap();
                (dir, Catalog::new(store))
            },
            |(_dir, mut catalog)| {
                for i in 0..N_VENDORS {
                    catalog.create_or_replace(vendor(i)).unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn catalog_reindex_benchmark(c: &mut Criterion) {
    c.bench_function("catalog_status_change_2k", |b| {
        b.iter_batched(
            filled_catalog,
            |mut catalog| {
                for i in 0..N_VENDORS {
                    let mut input = vendor(i);
                    input.status = STATUSES[(i + 1) % STATUSES.len()].to_string();
                    catalog.create_or_replace(input).unwrap();
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn catalog_range_benchmark(c: &mut Criterion) {
    let catalog = filled_catalog();
    c.bench_function("catalog_range_full", |b| {
        b.iter(|| {
            let out = catalog.fetch_by_range("vendor", "vendor~").unwrap();
            assert!(!out.is_empty());
        });
    });
}

fn catalog_status_benchmark(c: &mut Criterion) {
    let catalog = filled_catalog();
    c.bench_function("catalog_status_query", |b| {
        b.iter(|| {
            let out = catalog.fetch_by_status("pending").unwrap();
            assert!(out.len() > 2);
        });
    });
}

criterion_group!(
    benches,
    catalog_write_in_memory_benchmark,
    catalog_write_wal_benchmark,
    catalog_reindex_benchmark,
    catalog_range_benchmark,
    catalog_status_benchmark
);
criterion_main!(benches);
