//! pipeline-runner: headless runner for the revenue-driver pipeline.
//!
//! Usage:
//!   pipeline-runner --raw-dir data/raw/ravenstack --out-dir data/processed
//!   pipeline-runner --config pipeline.json --db runs.db
//!   pipeline-runner --verify --out-dir data/processed --report analysis_recommendation.md

use anyhow::Result;
use revenue_core::{
    pipeline::{Datasets, Pipeline},
    store::RunStore,
    verify::verify_outputs,
    PipelineConfig,
};
use std::env;

const DEFAULT_PROCESSED_DIR: &str = "data/processed";
const DEFAULT_REPORT: &str = "analysis_recommendation.md";

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let verify_only = args.iter().any(|a| a == "--verify");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");

    let mut config = match string_arg(&args, "--config") {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = string_arg(&args, "--raw-dir") {
        config.raw_dir = dir.to_string();
    }
    if let Some(dir) = string_arg(&args, "--out-dir") {
        config.processed_dir = Some(dir.to_string());
    }
    if let Some(path) = string_arg(&args, "--report") {
        config.report_path = Some(path.to_string());
    }
    config.streak_threshold = parse_arg(&args, "--streak", config.streak_threshold);

    if verify_only {
        let processed = config.processed_dir.as_deref().unwrap_or(DEFAULT_PROCESSED_DIR);
        let report = config.report_path.as_deref().unwrap_or(DEFAULT_REPORT);
        log::info!("verifying {processed} and {report}");
        let summary = verify_outputs(processed, report)?;
        println!("Verification passed.");
        println!("  files checked:  {}", summary.files_checked);
        println!("  driver months:  {}", summary.driver_months);
        return Ok(());
    }

    println!("Revenue driver pipeline — pipeline-runner");
    println!("  raw_dir:    {}", config.raw_dir);
    println!("  out_dir:    {}", config.processed_dir.as_deref().unwrap_or("(none)"));
    println!("  report:     {}", config.report_path.as_deref().unwrap_or("(none)"));
    println!("  db:         {db}");
    println!();

    let store = RunStore::open(db)?;
    store.migrate()?;

    let started_at = chrono::Utc::now();
    let run_id = format!("run-{}", started_at.format("%Y%m%dT%H%M%S"));
    store.insert_run(&run_id, env!("CARGO_PKG_VERSION"), &started_at.to_rfc3339())?;

    let mut pipeline = Pipeline::build(run_id.clone(), config).with_store(store);
    let data = pipeline.run_from_disk()?;
    log::info!("{run_id}: {} events recorded", pipeline.events().len());

    print_summary(&pipeline, &data, &run_id)?;
    Ok(())
}

fn print_summary(pipeline: &Pipeline, data: &Datasets, run_id: &str) -> Result<()> {
    let evidence = pipeline.config().evidence_months;
    let stored_events = match pipeline.store() {
        Some(store) => store.events_for_run(run_id)?.len(),
        None => 0,
    };

    println!("=== RUN SUMMARY ===");
    println!("  run_id:          {run_id}");
    println!("  subscriptions:   {}", data.raw.subscriptions.len());
    println!("  account-months:  {}", data.account_months.len());
    println!("  months:          {}", data.monthly.len());
    println!("  events logged:   {stored_events}");

    println!();
    println!("=== DRIVER COMPARISON (Last {evidence} Months) ===");
    let start = data.drivers.len().saturating_sub(evidence);
    for r in &data.drivers[start..] {
        println!(
            "  {} | Revenue: {:.0} | Lever: {:<11} | Pressure: {}",
            r.month.label(),
            r.net_revenue,
            r.leader_lever_3m.map(|d| d.as_str()).unwrap_or("-"),
            r.leader_pressure_3m.map(|d| d.as_str()).unwrap_or("-"),
        );
    }

    println!();
    println!("=== RECOMMENDATION ===");
    match &data.recommendation {
        Some(rec) => println!("{}", serde_json::to_string_pretty(rec)?),
        None => println!("  (No recommendation produced)"),
    }
    Ok(())
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
