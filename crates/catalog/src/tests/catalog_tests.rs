use super::*;
use anyhow::Result;
use tempfile::tempdir;

// --------------------- Create / fetch ---------------------

#[test]
fn create_then_fetch_both_records() -> Result<()> {
    let mut c = catalog();
    c.create_or_replace(vendor("test0", "yes", 6666.0))?;

    let q: QualificationRecord = serde_json::from_slice(&c.fetch_qualification("test0")?)?;
    assert_eq!(
        q,
        QualificationRecord {
            name: "test0".into(),
            project: "supplychain".into(),
            status: "yes".into(),
            expiry: "2020-05-01".into(),
        }
    );

    let p: PricedRecord = serde_json::from_slice(&c.fetch_price("test0")?)?;
    assert_eq!(p.qualification, q);
    assert_eq!(p.price, 6666.0);

    // qualification record carries no price
    assert!(parse(&c.fetch_qualification("test0")?).get("Price").is_none());
    Ok(())
}

#[test]
fn fetch_returns_stored_bytes_unchanged() -> Result<()> {
    let mut c = catalog();
    let raw = br#"{"Name":"legacy","Extra":true}"#;
    c.store_mut().put(VENDOR_COLLECTION, "legacy", &raw[..])?;
    assert_eq!(c.fetch_qualification("legacy")?, raw.to_vec());
    Ok(())
}

#[test]
fn missing_vendor_is_not_found() {
    let c = catalog();
    let err = c.fetch_qualification("ghost").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Vendor does not exist: ghost");

    let err = c.fetch_price("ghost").unwrap_err();
    assert!(matches!(
        err,
        CatalogError::NotFound {
            kind: RecordKind::VendorPrice,
            ..
        }
    ));
    assert_eq!(err.to_string(), "Vendor price does not exist: ghost");
}

#[test]
fn overwrite_keeps_latest() -> Result<()> {
    let mut c = catalog();
    c.create_or_replace(vendor("test0", "yes", 1.0))?;
    c.create_or_replace(vendor("test0", "no", 2.0))?;

    assert_eq!(parse(&c.fetch_qualification("test0")?)["Status"], "no");
    assert_eq!(parse(&c.fetch_price("test0")?)["Price"].as_f64(), Some(2.0));
    Ok(())
}

// --------------------- Validation ---------------------

#[test]
fn negative_price_writes_nothing() {
    let mut c = catalog();
    let err = c.create_or_replace(vendor("test0", "yes", -1.0)).unwrap_err();
    match err {
        CatalogError::Validation(v) => assert_eq!(v.field(), Some(Field::Price)),
        other => panic!("unexpected error: {other}"),
    }
    assert!(c.store().is_empty());
    assert_eq!(c.store().seq(), 0);
}

#[test]
fn empty_fields_fail_in_order() {
    let mut c = catalog();
    let mut input = vendor("", "", 0.0);
    input.expiry.clear();
    let err = c.create_or_replace(input).unwrap_err();
    assert_eq!(err.to_string(), "name field must be a non-empty string");

    let err = c.create_or_replace(vendor("n", "", 1.0)).unwrap_err();
    assert_eq!(err.to_string(), "status field must be a non-empty string");
    assert!(c.store().is_empty());
}

// --------------------- Status index ---------------------

fn marker_count(c: &Catalog, status: &str) -> usize {
    let (start, end) = keycodec::prefix_range(STATUS_INDEX, &[status]).unwrap();
    c.store()
        .range_scan(VENDOR_COLLECTION, start.as_bytes(), end.as_bytes())
        .unwrap()
        .count()
}

#[test]
fn write_creates_marker() -> Result<()> {
    let mut c = catalog();
    c.create_or_replace(vendor("test0", "yes", 1.0))?;

    let marker = status_marker("yes", "test0")?;
    assert_eq!(
        c.store().get(VENDOR_COLLECTION, marker.as_bytes())?,
        Some(INDEX_SENTINEL.to_vec())
    );
    assert_eq!(c.store().len(VENDOR_COLLECTION), 2);
    assert_eq!(c.store().len(PRICE_COLLECTION), 1);
    Ok(())
}

#[test]
fn status_change_moves_marker() -> Result<()> {
    let mut c = catalog();
    c.create_or_replace(vendor("test0", "yes", 1.0))?;
    c.create_or_replace(vendor("test0", "no", 1.0))?;

    assert_eq!(marker_count(&c, "yes"), 0);
    assert_eq!(marker_count(&c, "no"), 1);
    assert_eq!(c.store().len(VENDOR_COLLECTION), 2);
    Ok(())
}

#[test]
fn same_status_rewrite_keeps_single_marker() -> Result<()> {
    let mut c = catalog();
    c.create_or_replace(vendor("test0", "yes", 1.0))?;
    c.create_or_replace(vendor("test0", "yes", 5.0))?;
    assert_eq!(marker_count(&c, "yes"), 1);
    Ok(())
}

#[test]
fn unreadable_previous_record_keeps_old_marker() -> Result<()> {
    let mut c = catalog();
    c.create_or_replace(vendor("test0", "yes", 1.0))?;
    c.store_mut().put(VENDOR_COLLECTION, "test0", "not json")?;
    c.create_or_replace(vendor("test0", "no", 1.0))?;

    assert_eq!(marker_count(&c, "yes"), 1);
    assert_eq!(marker_count(&c, "no"), 1);
    assert_eq!(parse(&c.fetch_qualification("test0")?)["Status"], "no");
    Ok(())
}

#[test]
fn fetch_by_status_lists_current_members() -> Result<()> {
    let mut c = catalog();
    c.create_or_replace(vendor("test0", "yes", 6666.0))?;
    c.create_or_replace(vendor("test1", "yes", 7777.0))?;
    c.create_or_replace(vendor("test3", "no", 9999.0))?;
    c.create_or_replace(vendor("test5", "ok", 6666.0))?;
    c.create_or_replace(vendor("test2", "yes", 8888.0))?;

    assert_eq!(
        result_keys(&c.fetch_by_status("yes")?),
        vec!["test0", "test1", "test2"]
    );
    assert_eq!(result_keys(&c.fetch_by_status("no")?), vec!["test3"]);
    assert!(result_keys(&c.fetch_by_status("maybe")?).is_empty());

    let listed = parse(&c.fetch_by_status("ok")?);
    assert_eq!(listed[0]["Record"]["Project"], "supplychain");

    c.create_or_replace(vendor("test1", "no", 7777.0))?;
    assert_eq!(result_keys(&c.fetch_by_status("yes")?), vec!["test0", "test2"]);
    assert_eq!(result_keys(&c.fetch_by_status("no")?), vec!["test1", "test3"]);
    Ok(())
}

#[test]
fn fetch_by_status_does_not_match_status_prefixes() -> Result<()> {
    let mut c = catalog();
    c.create_or_replace(vendor("a", "ok", 1.0))?;
    c.create_or_replace(vendor("b", "okay", 1.0))?;
    assert_eq!(result_keys(&c.fetch_by_status("ok")?), vec!["a"]);
    Ok(())
}

#[test]
fn fetch_by_status_skips_dangling_marker() -> Result<()> {
    let mut c = catalog();
    c.create_or_replace(vendor("a", "ok", 1.0))?;
    let dangling = status_marker("ok", "ghost")?;
    c.store_mut()
        .put(VENDOR_COLLECTION, dangling.into_bytes(), INDEX_SENTINEL)?;
    assert_eq!(result_keys(&c.fetch_by_status("ok")?), vec!["a"]);
    Ok(())
}

#[test]
fn fetch_by_status_reports_corrupt_marker() -> Result<()> {
    let mut c = catalog();
    // three components under the status prefix is not a valid marker
    let bogus = keycodec::encode(STATUS_INDEX, &["ok", "a", "extra"])?;
    c.store_mut()
        .put(VENDOR_COLLECTION, bogus.into_bytes(), INDEX_SENTINEL)?;
    assert!(matches!(
        c.fetch_by_status("ok"),
        Err(CatalogError::MalformedKey(_))
    ));
    Ok(())
}

#[test]
fn fetch_by_status_rejects_separator() {
    let c = catalog();
    assert!(matches!(
        c.fetch_by_status("o\u{0}k"),
        Err(CatalogError::Validation(ValidationError::ReservedCharacter(Field::Status)))
    ));
}

// --------------------- Range ---------------------

#[test]
fn fetch_by_range_is_half_open() -> Result<()> {
    let mut c = catalog();
    for (name, price) in [("test0", 6666.0), ("test1", 7777.0), ("test2", 8888.0)] {
        c.create_or_replace(vendor(name, "yes", price))?;
    }

    let body = c.fetch_by_range("test0", "test2")?;
    assert_eq!(result_keys(&body), vec!["test0", "test1"]);
    let parsed = parse(&body);
    assert_eq!(parsed[1]["Record"]["Name"], "test1");
    Ok(())
}

#[test]
fn fetch_by_range_copies_records_verbatim() -> Result<()> {
    let mut c = catalog();
    c.create_or_replace(vendor("test0", "yes", 1.0))?;
    let record = c.fetch_qualification("test0")?;

    let mut expected = b"[{\"Key\":\"test0\", \"Record\":".to_vec();
    expected.extend_from_slice(&record);
    expected.extend_from_slice(b"}]");
    assert_eq!(c.fetch_by_range("test0", "test1")?, expected);
    Ok(())
}

#[test]
fn fetch_by_range_empty() -> Result<()> {
    let c = catalog();
    assert_eq!(c.fetch_by_range("a", "b")?, b"[]".to_vec());
    assert_eq!(c.fetch_by_range("b", "a")?, b"[]".to_vec());
    Ok(())
}

#[test]
fn fetch_by_range_exposes_markers_below_names() -> Result<()> {
    let mut c = catalog();
    c.create_or_replace(vendor("test0", "yes", 1.0))?;

    // The marker sorts before every printable name and is returned as-is.
    let body = c.fetch_by_range("", "test1")?;
    let text = String::from_utf8_lossy(&body);
    assert!(text.starts_with("[{\"Key\":\"\\u0000status~name\\u0000yes\\u0000test0\\u0000\""));
    assert!(text.contains("\"Key\":\"test0\""));

    // A range starting at a printable name never sees it.
    assert_eq!(result_keys(&c.fetch_by_range("a", "z")?), vec!["test0"]);
    Ok(())
}

#[test]
fn range_order_is_strictly_ascending() -> Result<()> {
    let mut c = catalog();
    for name in ["m", "b", "x", "a", "q", "c"] {
        c.create_or_replace(vendor(name, "s", 1.0))?;
    }
    let keys = result_keys(&c.fetch_by_range("a", "y")?);
    assert_eq!(keys, vec!["a", "b", "c", "m", "q", "x"]);
    Ok(())
}

// --------------------- Durability ---------------------

#[test]
fn catalog_survives_reopen() -> Result<()> {
    let dir = tempdir()?;
    let wal = dir.path().join("vendor.wal");
    {
        let mut c = Catalog::new(Store::open(&wal, true)?);
        c.create_or_replace(vendor("test0", "yes", 6666.0))?;
        c.create_or_replace(vendor("test0", "no", 6666.0))?;
        c.create_or_replace(vendor("test3", "no", 9999.0))?;
    }

    let c = Catalog::new(Store::open(&wal, true)?);
    assert_eq!(parse(&c.fetch_price("test3")?)["Price"].as_f64(), Some(9999.0));
    assert_eq!(result_keys(&c.fetch_by_status("no")?), vec!["test0", "test3"]);
    assert!(result_keys(&c.fetch_by_status("yes")?).is_empty());
    Ok(())
}
