//! Run store persistence.

use revenue_core::{
    drivers::{DriverComparisonRow, DriverScores},
    event::{EventLogEntry, PipelineEvent},
    recommendation::select,
    store::RunStore,
    types::Driver,
    PipelineError,
};
use rusqlite::{params, Connection};
use tempfile::TempDir;

fn store_with_run(run_id: &str) -> RunStore {
    let store = RunStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store.insert_run(run_id, "0.1.0-test", "2024-09-01T00:00:00Z").expect("insert run");
    store
}

fn entry(run_id: &str, seq: u32, event: &PipelineEvent) -> EventLogEntry {
    EventLogEntry {
        id:         None,
        run_id:     run_id.to_string(),
        seq,
        stage:      "pipeline".to_string(),
        event_type: event.type_name().to_string(),
        payload:    serde_json::to_string(event).unwrap(),
    }
}

#[test]
fn migrate_is_repeatable() {
    let store = store_with_run("r1");
    store.migrate().expect("second migration");
    assert!(store.run_exists("r1").unwrap());
    assert!(!store.run_exists("r2").unwrap());
}

#[test]
fn duplicate_run_ids_are_rejected() {
    let store = store_with_run("r1");
    assert!(store.insert_run("r1", "0.1.0-test", "later").is_err());
}

#[test]
fn events_come_back_in_sequence_order() {
    let store = store_with_run("r1");
    let started = PipelineEvent::RunStarted { run_id: "r1".into() };
    let stage = PipelineEvent::StageCompleted { stage: "monthly".into(), rows: 8 };

    store.append_event(&entry("r1", 1, &stage)).unwrap();
    store.append_event(&entry("r1", 0, &started)).unwrap();

    let events = store.events_for_run("r1").unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, "run_started");
    assert!(events[0].id.is_some());
    let decoded: PipelineEvent = serde_json::from_str(&events[1].payload).unwrap();
    assert_eq!(decoded, stage);

    assert!(store.events_for_run("other").unwrap().is_empty());
}

#[test]
fn events_for_unknown_runs_violate_the_foreign_key() {
    let store = store_with_run("r1");
    let started = PipelineEvent::RunStarted { run_id: "ghost".into() };
    assert!(store.append_event(&entry("ghost", 0, &started)).is_err());
}

#[test]
fn recommendation_round_trips_and_replaces() {
    let store = store_with_run("r1");
    assert_eq!(store.recommendation_for_run("r1").unwrap(), None);

    let mixed = select(&[Some(Driver::Pricing), Some(Driver::Retention)], &[Some(Driver::Acquisition)], 3);
    store.save_recommendation("r1", &mixed).unwrap();
    assert_eq!(store.recommendation_for_run("r1").unwrap(), Some(mixed));

    let single = select(&[Some(Driver::Retention); 4], &[Some(Driver::Pricing)], 3);
    store.save_recommendation("r1", &single).unwrap();
    assert_eq!(store.recommendation_for_run("r1").unwrap(), Some(single));
}

fn driver_row(month: &str, pricing_pressure: f64) -> DriverComparisonRow {
    let scores = DriverScores { acquisition: Some(0.0), retention: Some(1.0), pricing: Some(pricing_pressure) };
    DriverComparisonRow {
        month:              month.parse().unwrap(),
        net_revenue:        1000.0,
        mom_growth:         None,
        yoy_growth:         None,
        new_accounts:       2.0,
        avg_starting_mrr:   50.0,
        contribution:       DriverScores::default(),
        magnitude:          scores,
        magnitude_3m:       scores,
        leader_lever_3m:    scores.leader(),
        pressure:           scores,
        pressure_3m:        scores,
        leader_pressure_3m: scores.leader(),
    }
}

#[test]
fn saving_driver_rows_twice_replaces_the_first_set() {
    let store = store_with_run("r1");
    store
        .save_driver_rows("r1", &[driver_row("2024-01", 0.5), driver_row("2024-02", 0.5)])
        .unwrap();
    store.save_driver_rows("r1", &[driver_row("2024-03", 9.0)]).unwrap();

    let rows = store.driver_rows_for_run("r1").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].month, "2024-03-01");
    assert_eq!(rows[0].leader_pressure_3m, Some(Driver::Pricing));
    assert_eq!(rows[0].prc_pressure_3m, Some(9.0));
    assert_eq!(rows[0].acq_pressure_3m, Some(0.0));
}

/// A file-backed store plus a second raw connection onto the same database.
fn file_store_with_run(dir: &TempDir, run_id: &str) -> (RunStore, Connection) {
    let path = dir.path().join("runs.db");
    let path = path.to_str().expect("utf-8 path");
    let store = RunStore::open(path).expect("file store");
    store.migrate().expect("migration");
    store.insert_run(run_id, "0.1.0-test", "2024-09-01T00:00:00Z").expect("insert run");
    let raw = Connection::open(path).expect("raw connection");
    (store, raw)
}

#[test]
fn unknown_recommendation_mode_is_an_error() {
    let dir = TempDir::new().unwrap();
    let (store, raw) = file_store_with_run(&dir, "r1");
    let rec = select(&[Some(Driver::Pricing); 3], &[Some(Driver::Pricing)], 3);
    store.save_recommendation("r1", &rec).unwrap();

    raw.execute("UPDATE recommendation SET mode = ?1 WHERE run_id = ?2", params!["hedged", "r1"])
        .unwrap();

    let err = store.recommendation_for_run("r1").unwrap_err();
    assert!(matches!(err, PipelineError::Database(_)), "{err}");
}

#[test]
fn unknown_driver_labels_are_errors() {
    let dir = TempDir::new().unwrap();
    let (store, raw) = file_store_with_run(&dir, "r1");
    let rec = select(&[Some(Driver::Retention); 3], &[Some(Driver::Pricing)], 3);
    store.save_recommendation("r1", &rec).unwrap();
    store.save_driver_rows("r1", &[driver_row("2024-03", 9.0)]).unwrap();

    raw.execute("UPDATE recommendation SET lever_leader = 'discounting' WHERE run_id = 'r1'", [])
        .unwrap();
    raw.execute("UPDATE driver_comparison SET leader_pressure_3m = 'Pricing' WHERE run_id = 'r1'", [])
        .unwrap();

    assert!(matches!(store.recommendation_for_run("r1"), Err(PipelineError::Database(_))));
    assert!(matches!(store.driver_rows_for_run("r1"), Err(PipelineError::Database(_))));
}

#[test]
fn null_driver_columns_read_back_as_none() {
    let store = store_with_run("r1");
    let rec = select(&[None], &[None], 3);
    store.save_recommendation("r1", &rec).unwrap();

    let back = store.recommendation_for_run("r1").unwrap().expect("stored");
    assert_eq!(back.driver, None);
    assert_eq!(back.lever_leader, None);
    assert_eq!(back.pressure_leader, None);
}
