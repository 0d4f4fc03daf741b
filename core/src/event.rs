//! Pipeline events — what happened during a run, in order.
//!
//! RULE: Stages never log to the store directly.
//! The pipeline records one event per stage transition; the run store,
//! when attached, persists them as JSON in the event log.

use crate::{
    recommendation::RecommendationMode,
    types::{Driver, RunId},
};
use serde::{Deserialize, Serialize};

/// Variants are append-only; the serialized `type` tag is stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunStarted {
        run_id: RunId,
    },
    StageCompleted {
        stage: String,
        rows: usize,
    },
    ArtifactWritten {
        stage: String,
        path: String,
    },
    RecommendationMade {
        mode: RecommendationMode,
        driver: Option<Driver>,
        pressure_streak: usize,
    },
    RunCompleted {
        run_id: RunId,
        stages: usize,
    },
}

impl PipelineEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            PipelineEvent::RunStarted { .. }         => "run_started",
            PipelineEvent::StageCompleted { .. }     => "stage_completed",
            PipelineEvent::ArtifactWritten { .. }    => "artifact_written",
            PipelineEvent::RecommendationMade { .. } => "recommendation_made",
            PipelineEvent::RunCompleted { .. }       => "run_completed",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub seq: u32,
    pub stage: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized PipelineEvent
}
