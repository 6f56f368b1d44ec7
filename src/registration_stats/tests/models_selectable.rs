mod common;
use common::{DELHI, record, ymd};

use registration_stats::db::{connection::connect_sqlite, migrate::run_sqlite};
use registration_stats::models::{RegistrationRecord, RegistrationRow};
use registration_stats::period::Quarter;
use registration_stats::schema::vehicle_registrations::dsl as vr;
use diesel::prelude::*;
use tempfile::NamedTempFile;

#[test]
fn selectable_smoke_query_compiles_and_runs() {
    // temp file DB
    let tmp = NamedTempFile::new().unwrap();
    let path = tmp.path().to_string_lossy().to_string();

    // apply migrations, then open with our PRAGMAs
    run_sqlite(&path).expect("migrations");
    let mut conn = connect_sqlite(&path).expect("connect");

    let rec = record(ymd(2023, 11, 1), DELHI, "4W", "Maruti", 1234);
    diesel::insert_into(vr::vehicle_registrations)
        .values(&rec.as_insertable().unwrap())
        .execute(&mut conn)
        .unwrap();

    let rows = vr::vehicle_registrations
        .select(RegistrationRow::as_select())
        .load::<RegistrationRow>(&mut conn)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quarter, "Q4");
    assert_eq!(rows[0].month, 11);
    assert!(rows[0].id > 0);

    let back = RegistrationRecord::try_from(rows[0].clone()).unwrap();
    assert_eq!(back.quarter, Quarter::Q4);
    assert_eq!(back, rec);
}
