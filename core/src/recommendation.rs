//! Recommendation selection over the pressure-leader series.
//!
//! A single driver is named only when the same pressure leader has held for
//! at least `streak_threshold` consecutive months at the end of the series.
//! Otherwise the period is mixed-signal, and the latest lever and pressure
//! leaders are reported alongside as context.

use crate::{drivers::DriverComparisonRow, types::Driver};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_STREAK_THRESHOLD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationMode {
    SingleDriver,
    MixedSignal,
}

impl RecommendationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationMode::SingleDriver => "single-driver",
            RecommendationMode::MixedSignal  => "mixed-signal",
        }
    }
}

impl fmt::Display for RecommendationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub mode:             RecommendationMode,
    /// Set only in single-driver mode.
    pub driver:           Option<Driver>,
    pub pressure_streak:  usize,
    pub streak_threshold: usize,
    pub lever_leader:     Option<Driver>,
    pub pressure_leader:  Option<Driver>,
}

/// Length of the run of identical leaders at the end of the series.
///
/// Only the non-null tail counts: a `None` ends the run, and so does a
/// trailing `None`.
pub fn trailing_streak(series: &[Option<Driver>]) -> usize {
    let mut tail = series.iter().rev().map_while(|v| *v);
    let Some(last) = tail.next() else {
        return 0;
    };
    1 + tail.take_while(|v| *v == last).count()
}

pub fn latest_non_null(series: &[Option<Driver>]) -> Option<Driver> {
    series.iter().rev().find_map(|v| *v)
}

/// Apply the streak rule to explicit leader series.
pub fn select(
    pressure_leaders: &[Option<Driver>],
    lever_leaders: &[Option<Driver>],
    streak_threshold: usize,
) -> Recommendation {
    let pressure_streak = trailing_streak(pressure_leaders);
    let pressure_leader = latest_non_null(pressure_leaders);
    let lever_leader = latest_non_null(lever_leaders);

    let (mode, driver) = if pressure_streak >= streak_threshold && pressure_streak > 0 {
        (RecommendationMode::SingleDriver, pressure_leader)
    } else {
        (RecommendationMode::MixedSignal, None)
    };

    Recommendation {
        mode,
        driver,
        pressure_streak,
        streak_threshold,
        lever_leader,
        pressure_leader,
    }
}

pub fn recommend(rows: &[DriverComparisonRow], streak_threshold: usize) -> Recommendation {
    let pressure: Vec<Option<Driver>> = rows.iter().map(|r| r.leader_pressure_3m).collect();
    let lever: Vec<Option<Driver>> = rows.iter().map(|r| r.leader_lever_3m).collect();
    select(&pressure, &lever, streak_threshold)
}
