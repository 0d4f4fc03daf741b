//! The pipeline: stage registry and run loop.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. intervals       subscriptions -> account-month MRR
//!   2. monthly         net revenue, ARPA, growth
//!   3. acquisition     new accounts, referral mix, starting MRR
//!   4. cohort          churn rate, tenure buckets, retention bridge
//!   5. pricing         ARPA drift, plan tier mix, seat migration
//!   6. drivers         contributions, rolling scores, leaders
//!   7. recommendation  streak rule over pressure leaders
//!
//! RULES:
//!   - Stages execute in registration order, once per run.
//!   - A stage reads only datasets produced by earlier stages.
//!   - Every derived table is recomputed in full on each run.
//!   - Every stage completion is recorded as a PipelineEvent.

use crate::{
    acquisition::{acquisition_output, AcquisitionOutput},
    aggregate::{build_account_months, monthly_net_revenue, AccountMonthRecord, MonthlyAggregate},
    artifacts::{self, ArtifactWriter},
    cohort::{cohort_analysis, CohortOutput},
    config::PipelineConfig,
    drivers::{compare_drivers, DriverComparisonRow},
    error::{PipelineError, PipelineResult},
    event::{EventLogEntry, PipelineEvent},
    interval::expand_subscriptions,
    pricing::{pricing_proxies, PricingOutput},
    raw::{load_raw, RawTables},
    recommendation::{recommend, Recommendation},
    report::write_report,
    store::RunStore,
    types::RunId,
};
use std::path::PathBuf;

/// Named intermediate tables, filled in stage by stage.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub raw:            RawTables,
    pub account_months: Vec<AccountMonthRecord>,
    pub monthly:        Vec<MonthlyAggregate>,
    pub acquisition:    AcquisitionOutput,
    pub cohort:         CohortOutput,
    pub pricing:        PricingOutput,
    pub drivers:        Vec<DriverComparisonRow>,
    pub recommendation: Option<Recommendation>,
}

/// The contract every stage must fulfill.
pub trait Stage: Send {
    /// Unique stable name for this stage.
    fn name(&self) -> &'static str;

    /// Compute this stage's tables from earlier ones.
    /// Returns the number of rows produced.
    fn run(&self, data: &mut Datasets, config: &PipelineConfig) -> PipelineResult<usize>;

    /// Write this stage's artifacts. Stages without CSV output keep the default.
    fn persist(&self, _data: &Datasets, _writer: &ArtifactWriter) -> PipelineResult<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

// ── Stages ───────────────────────────────────────────────────────────────────

pub struct IntervalStage;

impl Stage for IntervalStage {
    fn name(&self) -> &'static str { "intervals" }

    fn run(&self, data: &mut Datasets, _config: &PipelineConfig) -> PipelineResult<usize> {
        let expanded = expand_subscriptions(&data.raw.subscriptions);
        data.account_months = build_account_months(&expanded);
        if data.account_months.is_empty() {
            return Err(PipelineError::EmptyDerivedSet { stage: self.name().to_string() });
        }
        Ok(data.account_months.len())
    }

    fn persist(&self, data: &Datasets, writer: &ArtifactWriter) -> PipelineResult<Vec<PathBuf>> {
        Ok(vec![writer.write(artifacts::ACCOUNT_MONTH_MRR, &data.account_months)?])
    }
}

pub struct MonthlyStage;

impl Stage for MonthlyStage {
    fn name(&self) -> &'static str { "monthly" }

    fn run(&self, data: &mut Datasets, _config: &PipelineConfig) -> PipelineResult<usize> {
        data.monthly = monthly_net_revenue(&data.account_months);
        Ok(data.monthly.len())
    }

    fn persist(&self, data: &Datasets, writer: &ArtifactWriter) -> PipelineResult<Vec<PathBuf>> {
        Ok(vec![writer.write(artifacts::MONTHLY_NET_REVENUE, &data.monthly)?])
    }
}

pub struct AcquisitionStage;

impl Stage for AcquisitionStage {
    fn name(&self) -> &'static str { "acquisition" }

    fn run(&self, data: &mut Datasets, _config: &PipelineConfig) -> PipelineResult<usize> {
        data.acquisition = acquisition_output(&data.raw.accounts, &data.account_months);
        Ok(data.acquisition.new_accounts.len())
    }

    fn persist(&self, data: &Datasets, writer: &ArtifactWriter) -> PipelineResult<Vec<PathBuf>> {
        let out = &data.acquisition;
        Ok(vec![
            writer.write(artifacts::NEW_ACCOUNTS_PER_MONTH, &out.new_accounts)?,
            writer.write(artifacts::REFERRAL_SOURCE_MIX, &out.referral_mix)?,
            writer.write(artifacts::STARTING_MRR_TREND, &out.starting_mrr)?,
        ])
    }
}

pub struct CohortStage;

impl Stage for CohortStage {
    fn name(&self) -> &'static str { "cohort" }

    fn run(&self, data: &mut Datasets, _config: &PipelineConfig) -> PipelineResult<usize> {
        data.cohort = cohort_analysis(
            &data.account_months,
            &data.raw.accounts,
            &data.raw.churn_events,
        );
        Ok(data.cohort.bridge.len())
    }

    fn persist(&self, data: &Datasets, writer: &ArtifactWriter) -> PipelineResult<Vec<PathBuf>> {
        let out = &data.cohort;
        Ok(vec![
            writer.write(artifacts::CHURN_RATE_OVERALL, &out.churn_rate)?,
            writer.write(artifacts::CHURN_BY_TENURE_BUCKET, &out.churn_by_tenure)?,
            writer.write(artifacts::REVENUE_BRIDGE, &out.bridge)?,
        ])
    }
}

pub struct PricingStage;

impl Stage for PricingStage {
    fn name(&self) -> &'static str { "pricing" }

    fn run(&self, data: &mut Datasets, _config: &PipelineConfig) -> PipelineResult<usize> {
        data.pricing = pricing_proxies(&data.raw.subscriptions, &data.monthly);
        Ok(data.pricing.arpa_drift.len())
    }

    fn persist(&self, data: &Datasets, writer: &ArtifactWriter) -> PipelineResult<Vec<PathBuf>> {
        let out = &data.pricing;
        Ok(vec![
            writer.write(artifacts::ARPA_DRIFT, &out.arpa_drift)?,
            writer.write(artifacts::PLAN_TIER_MIX, &out.plan_tier_mix)?,
            writer.write(artifacts::SEAT_MIGRATION, &out.seat_migration)?,
        ])
    }
}

pub struct DriverStage;

impl Stage for DriverStage {
    fn name(&self) -> &'static str { "drivers" }

    fn run(&self, data: &mut Datasets, _config: &PipelineConfig) -> PipelineResult<usize> {
        data.drivers = compare_drivers(&data.monthly, &data.acquisition, &data.cohort);
        Ok(data.drivers.len())
    }

    fn persist(&self, data: &Datasets, writer: &ArtifactWriter) -> PipelineResult<Vec<PathBuf>> {
        Ok(vec![writer.write(artifacts::DRIVER_COMPARISON, &data.drivers)?])
    }
}

pub struct RecommendationStage;

impl Stage for RecommendationStage {
    fn name(&self) -> &'static str { "recommendation" }

    fn run(&self, data: &mut Datasets, config: &PipelineConfig) -> PipelineResult<usize> {
        data.recommendation = Some(recommend(&data.drivers, config.streak_threshold));
        Ok(1)
    }
}

// ── Event recording ──────────────────────────────────────────────────────────

struct EventRecorder {
    run_id: RunId,
    store:  Option<RunStore>,
    events: Vec<PipelineEvent>,
    seq:    u32,
}

impl EventRecorder {
    fn record(&mut self, stage: &str, event: PipelineEvent) -> PipelineResult<()> {
        if let Some(store) = &self.store {
            let entry = EventLogEntry {
                id:         None,
                run_id:     self.run_id.clone(),
                seq:        self.seq,
                stage:      stage.to_string(),
                event_type: event.type_name().to_string(),
                payload:    serde_json::to_string(&event)?,
            };
            store.append_event(&entry)?;
        }
        self.seq += 1;
        self.events.push(event);
        Ok(())
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

pub struct Pipeline {
    pub run_id: RunId,
    config:     PipelineConfig,
    stages:     Vec<Box<dyn Stage>>,
    recorder:   EventRecorder,
}

impl Pipeline {
    pub fn new(run_id: RunId, config: PipelineConfig) -> Self {
        Self {
            recorder: EventRecorder {
                run_id: run_id.clone(),
                store:  None,
                events: Vec::new(),
                seq:    0,
            },
            run_id,
            config,
            stages: Vec::new(),
        }
    }

    /// Build a fully wired pipeline with all stages registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(run_id: RunId, config: PipelineConfig) -> Self {
        let mut pipeline = Pipeline::new(run_id, config);

        // EXECUTION ORDER — fixed, documented, never reordered.
        pipeline.register(Box::new(IntervalStage));
        pipeline.register(Box::new(MonthlyStage));
        pipeline.register(Box::new(AcquisitionStage));
        pipeline.register(Box::new(CohortStage));
        pipeline.register(Box::new(PricingStage));
        pipeline.register(Box::new(DriverStage));
        pipeline.register(Box::new(RecommendationStage));
        pipeline
    }

    /// Attach a migrated run store. The run row must already exist.
    pub fn with_store(mut self, store: RunStore) -> Self {
        self.recorder.store = Some(store);
        self
    }

    /// Register a stage. Call in the documented execution order.
    pub fn register(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Events recorded by the most recent run, in order.
    pub fn events(&self) -> &[PipelineEvent] {
        &self.recorder.events
    }

    pub fn store(&self) -> Option<&RunStore> {
        self.recorder.store.as_ref()
    }

    /// Load the raw tables named in the config, then run.
    pub fn run_from_disk(&mut self) -> PipelineResult<Datasets> {
        let raw = load_raw(&self.config)?;
        self.run(raw)
    }

    /// Run every registered stage over `raw`.
    pub fn run(&mut self, raw: RawTables) -> PipelineResult<Datasets> {
        self.recorder.events.clear();
        self.recorder.seq = 0;
        self.recorder.record("pipeline", PipelineEvent::RunStarted { run_id: self.run_id.clone() })?;

        let writer = self
            .config
            .processed_dir
            .as_deref()
            .map(ArtifactWriter::create)
            .transpose()?;

        let mut data = Datasets { raw, ..Datasets::default() };

        for stage in &self.stages {
            let rows = stage.run(&mut data, &self.config)?;
            log::info!("{}: {rows} rows", stage.name());
            self.recorder.record(
                stage.name(),
                PipelineEvent::StageCompleted { stage: stage.name().to_string(), rows },
            )?;

            if let Some(writer) = &writer {
                for path in stage.persist(&data, writer)? {
                    self.recorder.record(
                        stage.name(),
                        PipelineEvent::ArtifactWritten {
                            stage: stage.name().to_string(),
                            path:  path.display().to_string(),
                        },
                    )?;
                }
            }
        }

        if let Some(rec) = &data.recommendation {
            log::info!(
                "recommendation: {} (driver: {}, streak: {})",
                rec.mode,
                rec.driver.map(|d| d.as_str()).unwrap_or("none"),
                rec.pressure_streak,
            );
            self.recorder.record(
                "recommendation",
                PipelineEvent::RecommendationMade {
                    mode:            rec.mode,
                    driver:          rec.driver,
                    pressure_streak: rec.pressure_streak,
                },
            )?;

            if let Some(store) = &self.recorder.store {
                store.save_driver_rows(&self.run_id, &data.drivers)?;
                store.save_recommendation(&self.run_id, rec)?;
            }

            if let Some(path) = self.config.report_path.as_deref() {
                write_report(path, &data.drivers, rec, self.config.evidence_months)?;
                self.recorder.record(
                    "report",
                    PipelineEvent::ArtifactWritten { stage: "report".into(), path: path.to_string() },
                )?;
            }
        }

        self.recorder.record(
            "pipeline",
            PipelineEvent::RunCompleted { run_id: self.run_id.clone(), stages: self.stages.len() },
        )?;
        Ok(data)
    }
}
