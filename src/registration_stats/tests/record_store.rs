mod common;
use common::{DELHI, KARNATAKA, mixed_records, record, seed, setup_db, ymd};

use std::collections::BTreeSet;

use proptest::prelude::*;
use registration_stats::column::{Column, ColumnValue};
use registration_stats::store::{
    DateRange, RecordFilter, RecordStore, SqliteStore, StoreError, SummaryStats,
};

fn set(xs: &[&str]) -> BTreeSet<String> {
    xs.iter().map(|s| s.to_string()).collect()
}

#[test]
fn empty_store_reports_nulls_and_zeros() {
    let (_db, mut conn) = setup_db();
    let store = SqliteStore::new();

    assert_eq!(store.date_range(&mut conn).unwrap(), DateRange::default());
    assert_eq!(store.summary_stats(&mut conn).unwrap(), SummaryStats::default());
    assert!(
        store
            .filtered_query(&mut conn, &RecordFilter::default())
            .unwrap()
            .is_empty()
    );
    assert!(
        store
            .distinct_values(&mut conn, "manufacturer")
            .unwrap()
            .is_empty()
    );
}

#[test]
fn unknown_column_is_rejected_before_any_sql() {
    let (_db, mut conn) = setup_db();
    let store = SqliteStore::new();
    for name in ["nonexistent_col", "manufacturer; DROP TABLE vehicle_registrations", ""] {
        let err = store.distinct_values(&mut conn, name).unwrap_err();
        assert!(matches!(err, StoreError::InvalidColumn(ref n) if n == name));
    }
    // The table is still there.
    assert_eq!(store.summary_stats(&mut conn).unwrap().record_count, 0);
}

#[test]
fn distinct_values_are_sorted_and_typed() {
    let (_db, mut conn) = setup_db();
    seed(&mut conn, &mixed_records());
    let store = SqliteStore::new();

    let cats = store.distinct_values(&mut conn, "vehicle_category").unwrap();
    assert_eq!(
        cats,
        ["2W", "3W", "4W"].map(|c| ColumnValue::Text(c.to_string()))
    );
    let months = store.distinct_values(&mut conn, "month").unwrap();
    assert_eq!(months, [1, 2, 3].map(ColumnValue::Integer));
    let dates = store.distinct_values(&mut conn, "date").unwrap();
    assert_eq!(dates.first(), Some(&ColumnValue::Date(ymd(2023, 1, 1))));
}

#[test]
fn summary_and_date_range_cover_everything() {
    let (_db, mut conn) = setup_db();
    seed(&mut conn, &mixed_records());
    let store = SqliteStore::new();

    let stats = store.summary_stats(&mut conn).unwrap();
    assert_eq!(
        stats,
        SummaryStats {
            record_count: 6,
            total_registrations: 540,
            unique_manufacturers: 5,
            unique_regions: 3,
        }
    );
    let range = store.date_range(&mut conn).unwrap();
    assert_eq!(range.min, Some(ymd(2023, 1, 1)));
    assert_eq!(range.max, Some(ymd(2023, 3, 1)));
}

#[test]
fn no_filter_returns_all_rows_in_order() {
    let (_db, mut conn) = setup_db();
    let mut records = mixed_records();
    records.reverse();
    seed(&mut conn, &records);

    let rows = SqliteStore::new()
        .filtered_query(&mut conn, &RecordFilter::default())
        .unwrap();
    assert_eq!(rows.len(), 6);
    let keys: Vec<_> = rows
        .iter()
        .map(|r| (r.date, r.region_code.clone(), r.vehicle_category.clone()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn filters_are_conjunctive_with_inclusive_dates() {
    let (_db, mut conn) = setup_db();
    seed(&mut conn, &mixed_records());
    let store = SqliteStore::new();

    let filter = RecordFilter {
        start: Some(ymd(2023, 1, 1)),
        end: Some(ymd(2023, 2, 1)),
        categories: set(&["2W", "4W"]),
        region_codes: set(&["KA"]),
        ..Default::default()
    };
    let rows = store.filtered_query(&mut conn, &filter).unwrap();
    let got: Vec<_> = rows.iter().map(|r| r.manufacturer.as_str()).collect();
    assert_eq!(got, ["Tata", "TVS"]);

    let filter = RecordFilter {
        manufacturers: set(&["Hero"]),
        region_codes: set(&["KA"]),
        ..Default::default()
    };
    assert!(store.filtered_query(&mut conn, &filter).unwrap().is_empty());
}

#[test]
fn aggregate_totals_match_the_store() {
    let (_db, mut conn) = setup_db();
    seed(&mut conn, &mixed_records());
    let store = SqliteStore::new();

    let rows = store
        .aggregated_query(
            &mut conn,
            &[Column::VehicleCategory, Column::Manufacturer, Column::VehicleCategory],
            None,
            None,
        )
        .unwrap();
    let total: i64 = rows.iter().map(|r| r.total_registrations).sum();
    assert_eq!(total, 540);
    assert_eq!(rows[0].group.len(), 2, "repeated columns collapse");
    assert_eq!(
        rows[0].group.get(&Column::VehicleCategory),
        Some(&ColumnValue::Text("2W".into()))
    );
    assert_eq!(rows[0].group.get(&Column::Manufacturer), Some(&ColumnValue::Text("Hero".into())));
    assert_eq!(rows[0].total_registrations, 320);
    assert_eq!(rows[0].record_count, 2);
    assert_eq!(rows[0].avg_registrations, 160.0);

    let by_month = store
        .aggregated_query(&mut conn, &[Column::Month], Some(ymd(2023, 2, 1)), None)
        .unwrap();
    assert_eq!(by_month.len(), 2);
    assert_eq!(by_month[0].group[&Column::Month], ColumnValue::Integer(2));
    assert_eq!(by_month[1].total_registrations, 215);

    assert!(matches!(
        store.aggregated_query(&mut conn, &[], None, None),
        Err(StoreError::EmptyGroupBy)
    ));
}

#[test]
fn aggregate_rows_serialize_flat() {
    let (_db, mut conn) = setup_db();
    seed(&mut conn, &mixed_records());
    let rows = SqliteStore::new()
        .aggregated_query(&mut conn, &[Column::Quarter, Column::Year], None, None)
        .unwrap();
    insta::assert_json_snapshot!(rows, @r###"
    [
      {
        "quarter": "Q1",
        "year": 2023,
        "total_registrations": 540,
        "record_count": 6,
        "avg_registrations": 90.0
      }
    ]
    "###);
}

#[test]
fn aggregate_keeps_text_with_control_characters() {
    let (_db, mut conn) = setup_db();
    let odd = "Hero\u{1f}Moto";
    seed(
        &mut conn,
        &[
            record(ymd(2023, 1, 1), DELHI, "2W", odd, 40),
            record(ymd(2023, 2, 1), DELHI, "2W", odd, 60),
            record(ymd(2023, 1, 1), DELHI, "2W", "TVS", 10),
        ],
    );
    let store = SqliteStore::new();

    let rows = store
        .aggregated_query(&mut conn, &[Column::Manufacturer, Column::Year], None, None)
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].group[&Column::Manufacturer], ColumnValue::Text(odd.into()));
    assert_eq!(rows[0].group[&Column::Year], ColumnValue::Integer(2023));
    assert_eq!(rows[0].total_registrations, 100);

    let by_date = store
        .aggregated_query(&mut conn, &[Column::Date], None, None)
        .unwrap();
    assert_eq!(by_date[0].group[&Column::Date], ColumnValue::Date(ymd(2023, 1, 1)));
    assert_eq!(by_date[0].total_registrations, 50);
    assert_eq!(
        store.distinct_values(&mut conn, "manufacturer").unwrap()[0],
        ColumnValue::Text(odd.into())
    );
}

#[test]
fn region_pairs_are_ordered_by_code() {
    let (_db, mut conn) = setup_db();
    seed(&mut conn, &mixed_records());
    let pairs = SqliteStore::new().region_pairs(&mut conn).unwrap();
    assert_eq!(
        pairs,
        vec![
            ("DL".to_string(), "Delhi".to_string()),
            ("KA".to_string(), "Karnataka".to_string()),
            ("MH".to_string(), "Maharashtra".to_string()),
        ]
    );
}

#[test]
fn replace_all_swaps_dataset_and_rolls_back_on_failure() {
    let (_db, mut conn) = setup_db();
    let store = SqliteStore::new();
    seed(&mut conn, &mixed_records());

    let next = vec![
        record(ymd(2024, 1, 1), DELHI, "EV", "Ather", 5),
        record(ymd(2024, 1, 1), KARNATAKA, "EV", "Ola", 7),
    ];
    assert_eq!(store.replace_all(&mut conn, &next).unwrap(), 2);
    let rows = store
        .filtered_query(&mut conn, &RecordFilter::default())
        .unwrap();
    assert_eq!(rows, next);

    // Duplicate natural key fails inside the transaction; the previous rows survive.
    let duplicated = vec![next[0].clone(), next[0].clone()];
    let err = store.replace_all(&mut conn, &duplicated).unwrap_err();
    assert!(matches!(err, StoreError::Storage(_)));
    assert_eq!(store.summary_stats(&mut conn).unwrap().record_count, 2);

    // Region bijection violations are caught before touching the table.
    let renamed = vec![
        record(ymd(2024, 2, 1), DELHI, "EV", "Ather", 1),
        record(ymd(2024, 2, 1), ("DL", "New Delhi"), "EV", "Ola", 1),
    ];
    assert!(matches!(
        store.replace_all(&mut conn, &renamed),
        Err(StoreError::InvalidRecord(_))
    ));
    assert_eq!(store.summary_stats(&mut conn).unwrap().total_registrations, 12);
}

#[test]
fn large_load_is_chunked() {
    let (_db, mut conn) = setup_db();
    let records: Vec<_> = (0..250u32)
        .map(|i| record(ymd(2020, 1, 1), DELHI, "2W", &format!("M{i:03}"), i))
        .collect();
    seed(&mut conn, &records);
    let stats = SqliteStore::new().summary_stats(&mut conn).unwrap();
    assert_eq!(stats.record_count, 250);
    assert_eq!(stats.total_registrations, (0..250).sum::<i64>());
}

#[test]
fn backup_writes_a_readable_copy() {
    let (db, mut conn) = setup_db();
    seed(&mut conn, &mixed_records());
    let target = db.dir.path().join("backup.db");

    SqliteStore::new().backup_to(&mut conn, &target).unwrap();

    let mut copy =
        registration_stats::db::connection::connect_sqlite(target.to_str().unwrap()).unwrap();
    assert_eq!(
        SqliteStore::new().summary_stats(&mut copy).unwrap().record_count,
        6
    );
}

fn any_subset(universe: &'static [&'static str]) -> impl Strategy<Value = BTreeSet<String>> {
    prop::sample::subsequence(universe, 0..=universe.len())
        .prop_map(|xs| xs.into_iter().map(str::to_string).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn store_filter_agrees_with_in_memory_filter(
        categories in any_subset(&["2W", "3W", "4W", "EV"]),
        manufacturers in any_subset(&["Hero", "TVS", "Tata", "Maruti", "Bajaj"]),
        region_codes in any_subset(&["DL", "KA", "MH"]),
        start in prop::option::of(1u32..=3),
        end in prop::option::of(1u32..=3),
    ) {
        let (_db, mut conn) = setup_db();
        let records = mixed_records();
        seed(&mut conn, &records);

        let filter = RecordFilter {
            start: start.map(|m| ymd(2023, m, 1)),
            end: end.map(|m| ymd(2023, m, 1)),
            categories,
            manufacturers,
            region_codes,
        };
        let from_store = SqliteStore::new().filtered_query(&mut conn, &filter).unwrap();
        let mut expected: Vec<_> = records.into_iter().filter(|r| filter.matches(r)).collect();
        expected.sort_by(|a, b| {
            (a.date, &a.region_code, &a.vehicle_category, &a.manufacturer)
                .cmp(&(b.date, &b.region_code, &b.vehicle_category, &b.manufacturer))
        });
        prop_assert_eq!(from_store, expected);
    }
}
