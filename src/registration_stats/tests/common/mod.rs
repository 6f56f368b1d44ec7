#![allow(dead_code)]

use chrono::NaiveDate;
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use registration_stats::db::{connection, migrate};
use registration_stats::models::RegistrationRecord;
use registration_stats::store::{RecordStore, SqliteStore};
use std::path::PathBuf;
use tempfile::TempDir;

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct ForeignKeys {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = Integer, column_name = "timeout")]
    busy_timeout: i32,
}

pub struct TestDb {
    pub dir: TempDir, // keep alive for the life of the test
    pub path: String, // <tmpdir>/test.db
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_all(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { dir, path }, conn)
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal"); // WAL is persistent per DB file

    let fk: ForeignKeys = sql_query("PRAGMA foreign_keys;").get_result(conn).unwrap();
    assert_eq!(fk.foreign_keys, 1);

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn record(
    date: NaiveDate,
    region: (&str, &str),
    category: &str,
    manufacturer: &str,
    registrations: u32,
) -> RegistrationRecord {
    RegistrationRecord::new(date, region.0, region.1, category, manufacturer, registrations)
}

pub const DELHI: (&str, &str) = ("DL", "Delhi");
pub const KARNATAKA: (&str, &str) = ("KA", "Karnataka");

/// 2 regions × 1 category × 2 manufacturers × 13 months starting 2023-01.
///
/// Hero is flat at 100 per region; TVS grows 10% per month from 100, rounded.
pub fn thirteen_month_scenario() -> Vec<RegistrationRecord> {
    let mut out = Vec::new();
    for i in 0..13u32 {
        let date = ymd(2023 + (i / 12) as i32, i % 12 + 1, 1);
        let tvs = (100.0 * 1.1_f64.powi(i as i32)).round() as u32;
        for region in [DELHI, KARNATAKA] {
            out.push(record(date, region, "2W", "Hero", 100));
            out.push(record(date, region, "2W", "TVS", tvs));
        }
    }
    out
}

/// Small mixed dataset for filter tests.
pub fn mixed_records() -> Vec<RegistrationRecord> {
    vec![
        record(ymd(2023, 1, 1), DELHI, "2W", "Hero", 120),
        record(ymd(2023, 1, 1), KARNATAKA, "4W", "Tata", 40),
        record(ymd(2023, 2, 1), DELHI, "4W", "Maruti", 90),
        record(ymd(2023, 2, 1), KARNATAKA, "2W", "TVS", 75),
        record(ymd(2023, 3, 1), DELHI, "3W", "Bajaj", 15),
        record(ymd(2023, 3, 1), ("MH", "Maharashtra"), "2W", "Hero", 200),
    ]
}

pub fn seed(conn: &mut SqliteConnection, records: &[RegistrationRecord]) {
    let inserted = SqliteStore::new()
        .replace_all(conn, records)
        .expect("seed records");
    assert_eq!(inserted, records.len());
}
