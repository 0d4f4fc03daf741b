//! SQLite run store.
//!
//! RULE: Only store.rs talks to the database.
//! Stages never touch the store; the pipeline hands it events and final
//! outputs after each stage completes.

use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use crate::{
    drivers::DriverComparisonRow,
    error::PipelineResult,
    event::EventLogEntry,
    recommendation::{Recommendation, RecommendationMode},
    types::Driver,
};

pub struct RunStore {
    conn: Connection,
}

/// A driver comparison row as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDriverRow {
    pub month:              String,
    pub net_revenue:        f64,
    pub leader_lever_3m:    Option<Driver>,
    pub leader_pressure_3m: Option<Driver>,
    pub acq_pressure_3m:    Option<f64>,
    pub ret_pressure_3m:    Option<f64>,
    pub prc_pressure_3m:    Option<f64>,
}

impl RunStore {
    /// Open (or create) the run database at `path`.
    pub fn open(path: &str) -> PipelineResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PipelineResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Safe to call more than once.
    pub fn migrate(&self) -> PipelineResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        self.conn.execute_batch(include_str!("../../migrations/002_results.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, version: &str, started_at: &str) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, version, started_at) VALUES (?1, ?2, ?3)",
            params![run_id, version, started_at],
        )?;
        Ok(())
    }

    pub fn run_exists(&self, run_id: &str) -> PipelineResult<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM run WHERE run_id = ?1", params![run_id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, seq, stage, event_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.run_id,
                entry.seq as i64,
                entry.stage,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_run(&self, run_id: &str) -> PipelineResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, seq, stage, event_type, payload
             FROM event_log WHERE run_id = ?1
             ORDER BY seq ASC, id ASC"
        )?;
        let entries = stmt.query_map(params![run_id], |row| {
            Ok(EventLogEntry {
                id:         Some(row.get(0)?),
                run_id:     row.get(1)?,
                seq:        row.get::<_, i64>(2)? as u32,
                stage:      row.get(3)?,
                event_type: row.get(4)?,
                payload:    row.get(5)?,
            })
        })?.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Results ────────────────────────────────────────────────

    /// Replace the stored driver comparison for `run_id`.
    pub fn save_driver_rows(&self, run_id: &str, rows: &[DriverComparisonRow]) -> PipelineResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM driver_comparison WHERE run_id = ?1", params![run_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO driver_comparison (
                    run_id, month, net_revenue,
                    acq_contribution, retention_contribution, pricing_contribution,
                    acq_abs_3m, ret_abs_3m, prc_abs_3m, leader_lever_3m,
                    acq_pressure_3m, ret_pressure_3m, prc_pressure_3m, leader_pressure_3m
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            )?;
            for r in rows {
                stmt.execute(params![
                    run_id,
                    r.month.to_string(),
                    r.net_revenue,
                    r.contribution.acquisition,
                    r.contribution.retention,
                    r.contribution.pricing,
                    r.magnitude_3m.acquisition,
                    r.magnitude_3m.retention,
                    r.magnitude_3m.pricing,
                    r.leader_lever_3m.map(|d| d.as_str()),
                    r.pressure_3m.acquisition,
                    r.pressure_3m.retention,
                    r.pressure_3m.pricing,
                    r.leader_pressure_3m.map(|d| d.as_str()),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn driver_rows_for_run(&self, run_id: &str) -> PipelineResult<Vec<StoredDriverRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT month, net_revenue, leader_lever_3m, leader_pressure_3m,
                    acq_pressure_3m, ret_pressure_3m, prc_pressure_3m
             FROM driver_comparison WHERE run_id = ?1
             ORDER BY month ASC"
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok(StoredDriverRow {
                month:              row.get(0)?,
                net_revenue:        row.get(1)?,
                leader_lever_3m:    driver_column(row, 2)?,
                leader_pressure_3m: driver_column(row, 3)?,
                acq_pressure_3m:    row.get(4)?,
                ret_pressure_3m:    row.get(5)?,
                prc_pressure_3m:    row.get(6)?,
            })
        })?.collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn save_recommendation(&self, run_id: &str, rec: &Recommendation) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO recommendation
                (run_id, mode, driver, pressure_streak, streak_threshold, lever_leader, pressure_leader)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run_id,
                rec.mode.as_str(),
                rec.driver.map(|d| d.as_str()),
                rec.pressure_streak as i64,
                rec.streak_threshold as i64,
                rec.lever_leader.map(|d| d.as_str()),
                rec.pressure_leader.map(|d| d.as_str()),
            ],
        )?;
        Ok(())
    }

    pub fn recommendation_for_run(&self, run_id: &str) -> PipelineResult<Option<Recommendation>> {
        let rec = self.conn.query_row(
            "SELECT mode, driver, pressure_streak, streak_threshold, lever_leader, pressure_leader
             FROM recommendation WHERE run_id = ?1",
            params![run_id],
            |row| {
                Ok(Recommendation {
                    mode:             mode_column(row, 0)?,
                    driver:           driver_column(row, 1)?,
                    pressure_streak:  row.get::<_, i64>(2)? as usize,
                    streak_threshold: row.get::<_, i64>(3)? as usize,
                    lever_leader:     driver_column(row, 4)?,
                    pressure_leader:  driver_column(row, 5)?,
                })
            },
        ).optional()?;
        Ok(rec)
    }
}

fn unknown_label(idx: usize, what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unknown {what} {value:?}").into(),
    )
}

/// A NULL driver column reads as `None`; any other unknown label is an error.
fn driver_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Driver>> {
    let Some(label) = row.get::<_, Option<String>>(idx)? else {
        return Ok(None);
    };
    label
        .parse()
        .map(Some)
        .map_err(|_| unknown_label(idx, "driver", &label))
}

fn mode_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<RecommendationMode> {
    let label: String = row.get(idx)?;
    match label.as_str() {
        "single-driver" => Ok(RecommendationMode::SingleDriver),
        "mixed-signal"  => Ok(RecommendationMode::MixedSignal),
        _ => Err(unknown_label(idx, "recommendation mode", &label)),
    }
}
