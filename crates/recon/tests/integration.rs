use std::path::{Path, PathBuf};

use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};

use shipvoid_io::{normalize_header, LoadError, RawRecord, RawValue, SourceKind};
use shipvoid_recon::model::{DetailKind, Field, MatchResult, ReconWarning};
use shipvoid_recon::{reconcile, reconcile_tables, Decimal, ReconConfig, ReconError};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct Carton {
    store: f64,
    div: f64,
    carton: &'static str,
    label_date: (u16, u8, u8),
    whpk: f64,
    status: &'static str,
    cost: f64,
}

const SHIPVOID_HEADERS: [&str; 7] = [
    "Store",
    "Div",
    "Carton Number",
    "Label Date",
    "Whpk",
    "Status",
    "Whpk Cost",
];

fn write_sheet(ws: &mut Worksheet, name: &str, rows: &[Option<Carton>]) {
    let date_format = Format::new().set_num_format("mm/dd/yyyy");
    ws.set_name(name).unwrap();
    for (col, h) in SHIPVOID_HEADERS.iter().enumerate() {
        ws.write_string(0, col as u16, *h).unwrap();
    }
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        // None leaves a blank row
        let Some(c) = row else { continue };
        ws.write_number(r, 0, c.store).unwrap();
        ws.write_number(r, 1, c.div).unwrap();
        if !c.carton.is_empty() {
            ws.write_string(r, 2, c.carton).unwrap();
        }
        let (y, m, d) = c.label_date;
        let date = ExcelDateTime::from_ymd(y, m, d).unwrap();
        ws.write_datetime_with_format(r, 3, &date, &date_format).unwrap();
        ws.write_number(r, 4, c.whpk).unwrap();
        ws.write_string(r, 5, c.status).unwrap();
        ws.write_number(r, 6, c.cost).unwrap();
    }
}

fn carton(store: f64, div: f64, carton: &'static str, day: u8, whpk: f64, status: &'static str, cost: f64) -> Option<Carton> {
    Some(Carton {
        store,
        div,
        carton,
        label_date: (2024, 1, day),
        whpk,
        status,
        cost,
    })
}

fn write_shipvoid(path: &Path, with_crossdock: bool) {
    let mut wb = Workbook::new();

    let summary = wb.add_worksheet();
    summary.set_name("Summary").unwrap();
    summary.write_string(0, 0, "not reconciled").unwrap();

    write_sheet(
        wb.add_worksheet(),
        "Inhouse Data",
        &[
            carton(6031.0, 1.0, "00042", 5, 10.0, "Open", 12.5),
            carton(6031.0, 1.0, "00043", 5, 4.0, "VF", 3.0),
            None,
            carton(6031.0, 1.0, "", 5, 1.0, "OPEN", 1.0),
        ],
    );

    if with_crossdock {
        write_sheet(
            wb.add_worksheet(),
            "Crossdock Data",
            &[
                carton(6031.0, 2.0, "00100", 6, 5.0, "BILLED OR INACTIVE", 7.0),
                carton(6031.0, 2.0, "00200", 6, 8.0, "OPEN", 2.25),
            ],
        );
    }

    wb.save(path).unwrap();
}

const LEGACY_CSV: &str = "\
container_id,container_create_date,quantity,event_ts_1,status_1,event_type_1,location_id_1,event_ts_2,status_2,event_type_2,location_id_2
6031100042,2024-01-05,7,2024-01-05 08:00:00,CREATED,Create,DC,2024-01-06 10:00:00,LOADED,Trailer Load,DOOR 14
6031100043,2024-01-04,4,,,,,,,,
6031200200,2024-01-06,8,,,,,,,,
6031200200,2024-01-06,8,,,,,,,,
6031200100,2024-01-06,5,,,,,,,,

X999,01/06/2024,1,,,,,,,,
";

fn fixture_dir(with_crossdock: bool) -> (tempfile::TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let shipvoid = dir.path().join("Shipvoid Forecast 01-06-2024_0600.xlsx");
    let legacy = dir.path().join("Legacy_Unbilled_Cartons 01-06-2024_0600.csv");
    write_shipvoid(&shipvoid, with_crossdock);
    std::fs::write(&legacy, LEGACY_CSV).unwrap();
    (dir, shipvoid, legacy)
}

// ---------------------------------------------------------------------------
// End-to-end
// ---------------------------------------------------------------------------

#[test]
fn workbook_and_csv_reconcile() {
    let (_dir, shipvoid, legacy) = fixture_dir(true);
    let report = reconcile(&shipvoid, &legacy, &ReconConfig::default()).unwrap();

    let s = &report.summary;
    assert_eq!(s.shipvoid_records, 5);
    assert_eq!(s.legacy_records, 6);
    assert_eq!(s.total_raw_records, 11);
    assert_eq!(s.totals.matched, 2);
    assert_eq!(s.totals.quantity_mismatches, 1);
    assert_eq!(s.totals.shipvoid_only, 2);
    assert_eq!(s.totals.legacy_only, 2);
    assert_eq!(s.totals.duplicate_keys, 1);
    assert_eq!(s.totals.duplicate_records, 2);
    assert_eq!(s.totals.invalid, 1);
    assert_eq!(s.filtered_out, 0);
    assert!(s.is_balanced());

    assert_eq!(
        report.meta.shipvoid_file.as_deref(),
        Some("Shipvoid Forecast 01-06-2024_0600.xlsx")
    );
}

#[test]
fn matched_pair_carries_delta_and_latest_event() {
    let (_dir, shipvoid, legacy) = fixture_dir(true);
    let report = reconcile(&shipvoid, &legacy, &ReconConfig::default()).unwrap();

    let row = report
        .details
        .iter()
        .find(|d| d.key == "6031100042|2024-01-05")
        .unwrap();
    assert_eq!(row.kind, DetailKind::Matched);
    assert_eq!(row.delta, Field::Value(Decimal::from_int(3)));
    assert_eq!(row.shipvoid_status, Field::Value("OPEN".to_string()));
    assert_eq!(row.origin, Field::Value("In House".to_string()));
    assert_eq!(row.legacy_status, Field::Value("LOADED".to_string()));
    assert_eq!(row.legacy_location, Field::Value("DOOR 14".to_string()));
}

#[test]
fn create_date_mismatch_does_not_join() {
    let (_dir, shipvoid, legacy) = fixture_dir(true);
    let report = reconcile(&shipvoid, &legacy, &ReconConfig::default()).unwrap();

    let kinds: Vec<(DetailKind, &str)> = report
        .details
        .iter()
        .filter(|d| d.key.starts_with("6031100043"))
        .map(|d| (d.kind, d.key.as_str()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (DetailKind::LegacyOnly, "6031100043|2024-01-04"),
            (DetailKind::ShipvoidOnly, "6031100043|2024-01-05"),
        ]
    );
}

#[test]
fn legacy_duplicate_leaves_shipvoid_unmatched() {
    let (_dir, shipvoid, legacy) = fixture_dir(true);
    let report = reconcile(&shipvoid, &legacy, &ReconConfig::default()).unwrap();

    let for_key: Vec<&MatchResult> = report
        .results
        .iter()
        .filter(|r| r.key() == "6031200200|2024-01-06")
        .collect();
    assert_eq!(for_key.len(), 2);
    assert!(matches!(for_key[0], MatchResult::ShipvoidOnly { .. }));
    match for_key[1] {
        MatchResult::DuplicateKey { source, records, .. } => {
            assert_eq!(*source, SourceKind::Legacy);
            assert_eq!(records.len(), 2);
        }
        other => panic!("expected duplicate, got {other:?}"),
    }
    assert!(report.warnings.iter().any(|w| matches!(w, ReconWarning::DuplicateKey(d) if d.count == 2)));
}

#[test]
fn dashboard_stats_over_forecast() {
    let (_dir, shipvoid, legacy) = fixture_dir(true);
    let report = reconcile(&shipvoid, &legacy, &ReconConfig::default()).unwrap();

    let stats = &report.stats;
    assert_eq!(stats.total, 5);
    assert_eq!(stats.by_origin["In House"], 3);
    assert_eq!(stats.by_origin["CrossDock"], 2);
    assert_eq!(stats.at_risk_count, 3);
    assert_eq!(stats.potential_cost.to_string(), "15.75");
    assert_eq!(stats.oldest_date.unwrap().to_string(), "2024-01-05");
    assert_eq!(stats.by_label_date.len(), 2);
    assert_eq!(stats.by_label_date[0].containers, 3);
}

#[test]
fn missing_crossdock_sheet_is_a_warning() {
    let (_dir, shipvoid, legacy) = fixture_dir(false);
    let report = reconcile(&shipvoid, &legacy, &ReconConfig::default()).unwrap();

    assert_eq!(report.summary.shipvoid_records, 3);
    assert!(report.warnings.iter().any(|w| matches!(
        w,
        ReconWarning::SheetSkipped { sheet, .. } if sheet == "Crossdock Data"
    )));
    assert!(report.summary.is_balanced());
}

#[test]
fn missing_required_column_fails_without_report() {
    let (dir, shipvoid, _) = fixture_dir(true);
    let legacy = dir.path().join("Legacy_bad.csv");
    std::fs::write(&legacy, "container_id,quantity\nC1,1\n").unwrap();

    let err = reconcile(&shipvoid, &legacy, &ReconConfig::default()).unwrap_err();
    match err {
        ReconError::Load(LoadError::MissingColumn { kind, column, .. }) => {
            assert_eq!(kind, SourceKind::Legacy);
            assert_eq!(column, "container_create_date");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn identical_inputs_identical_report() {
    let (_dir, shipvoid, legacy) = fixture_dir(true);
    let config = ReconConfig::default();
    let a = reconcile(&shipvoid, &legacy, &config).unwrap();
    let b = reconcile(&shipvoid, &legacy, &config).unwrap();
    assert_eq!(a.summary, b.summary);
    assert_eq!(a.details, b.details);
    assert_eq!(a.warnings, b.warnings);
}

#[test]
fn report_json_shape() {
    let (_dir, shipvoid, legacy) = fixture_dir(true);
    let report = reconcile(&shipvoid, &legacy, &ReconConfig::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["summary"]["totals"]["matched"], 2);
    let only = json["details"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["kind"] == "shipvoid_only")
        .unwrap();
    assert_eq!(only["legacy_quantity"], "n/a");
    assert_eq!(only["source"], "shipvoid");
    let invalid = json["details"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["kind"] == "invalid_key")
        .unwrap();
    assert_eq!(invalid["key"], "INVALID");
    assert!(json.get("results").is_none());
}

// ---------------------------------------------------------------------------
// In-memory tables
// ---------------------------------------------------------------------------

fn raw(source: SourceKind, row: usize, fields: &[(&str, &str)]) -> RawRecord {
    RawRecord {
        source,
        sheet: None,
        origin: None,
        row,
        fields: fields
            .iter()
            .map(|(k, v)| (normalize_header(k), RawValue::from_text(v)))
            .collect(),
    }
}

fn void_type_config() -> ReconConfig {
    ReconConfig::from_toml(
        r#"
[shipvoid]
key_columns = ["facility", "void_type"]
key_fallback = ""
date_column = "date"
quantity_column = "quantity"
facility_column = "facility"

[legacy]
key_columns = ["facility", "void_type"]
date_column = "date"
quantity_column = "quantity"
facility_column = "facility"
"#,
    )
    .unwrap()
}

#[test]
fn void_type_example_matches_with_delta() {
    let fields = |qty| {
        vec![
            ("facility", "6031"),
            ("date", "2024-01-05"),
            ("void_type", "A"),
            ("quantity", qty),
        ]
    };
    let report = reconcile_tables(
        vec![raw(SourceKind::Shipvoid, 2, &fields("10"))],
        vec![raw(SourceKind::Legacy, 2, &fields("7"))],
        &void_type_config(),
    );

    assert_eq!(report.results.len(), 1);
    match &report.results[0] {
        MatchResult::Matched { delta, shipvoid, .. } => {
            assert_eq!(*delta, Some(Decimal::from_int(3)));
            assert_eq!(shipvoid.facility, "6031");
        }
        other => panic!("expected match, got {other:?}"),
    }
    assert_eq!(report.summary.groups.len(), 1);
    assert_eq!(report.summary.groups[0].facility.as_deref(), Some("6031"));
    assert_eq!(report.summary.groups[0].date_bucket.as_deref(), Some("2024-01-05"));
}

#[test]
fn shipvoid_only_record_yields_exactly_one_result() {
    let report = reconcile_tables(
        vec![raw(
            SourceKind::Shipvoid,
            2,
            &[("facility", "6031"), ("date", "2024-01-05"), ("void_type", "B"), ("quantity", "1")],
        )],
        vec![],
        &void_type_config(),
    );
    assert_eq!(report.results.len(), 1);
    assert!(matches!(report.results[0], MatchResult::ShipvoidOnly { .. }));
    assert_eq!(report.summary.totals.records(), 1);
}

#[test]
fn float_noise_and_two_digit_years_still_match() {
    let dir = tempfile::tempdir().unwrap();
    let shipvoid = dir.path().join("Shipvoid Forecast 01-05-2024_0600.xlsx");
    let legacy = dir.path().join("Legacy_Unbilled_Cartons 01-05-2024_0600.csv");

    let mut wb = Workbook::new();
    write_sheet(
        wb.add_worksheet(),
        "Inhouse Data",
        &[carton(6031.0, 1.0, "00042", 5, 1.1 * 3.0, "OPEN", 0.1 + 0.2)],
    );
    wb.save(&shipvoid).unwrap();
    std::fs::write(&legacy, "container_id,container_create_date,quantity\n6031100042,1/5/24,3.3\n").unwrap();

    let report = reconcile(&shipvoid, &legacy, &ReconConfig::default()).unwrap();
    assert_eq!(report.summary.totals.matched, 1);
    assert_eq!(report.summary.totals.quantity_mismatches, 0);
    match &report.results[0] {
        MatchResult::Matched { delta, .. } => assert!(delta.as_ref().is_some_and(Decimal::is_zero)),
        other => panic!("expected match, got {other:?}"),
    }
    assert_eq!(report.stats.potential_cost.to_string(), "0.3");
    // Only the missing Crossdock sheet is reported
    assert!(report
        .warnings
        .iter()
        .all(|w| matches!(w, ReconWarning::SheetSkipped { .. })));
}

#[test]
fn duplicate_across_sheets_names_each_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let shipvoid = dir.path().join("Shipvoid Forecast 01-05-2024_0600.xlsx");
    let legacy = dir.path().join("Legacy_Unbilled_Cartons 01-05-2024_0600.csv");

    let mut wb = Workbook::new();
    let same = || carton(6031.0, 1.0, "00042", 5, 10.0, "OPEN", 1.0);
    write_sheet(wb.add_worksheet(), "Inhouse Data", &[same()]);
    write_sheet(wb.add_worksheet(), "Crossdock Data", &[same()]);
    wb.save(&shipvoid).unwrap();
    std::fs::write(&legacy, "container_id,container_create_date,quantity\n").unwrap();

    let report = reconcile(&shipvoid, &legacy, &ReconConfig::default()).unwrap();
    assert_eq!(report.summary.totals.duplicate_keys, 1);
    let row = &report.details[0];
    assert_eq!(row.kind, DetailKind::DuplicateKey);
    assert_eq!(row.csv_record()[16], "Inhouse Data!2;Crossdock Data!2");
}
