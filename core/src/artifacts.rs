//! CSV artifacts — the persisted view of every derived table.
//!
//! RULE: Only artifacts.rs knows column names and file names.
//! Stages hand typed tables to each other in memory; this module renders
//! them for inspection and for downstream consumers. Column names and file
//! names are a durable contract.

use crate::{
    acquisition::{NewAccountsRow, ReferralMixRow, StartingMrrRow},
    aggregate::{AccountMonthRecord, MonthlyAggregate},
    cohort::{BridgeRow, ChurnRateRow, TenureChurnRow},
    drivers::DriverComparisonRow,
    error::PipelineResult,
    pricing::{ArpaDriftRow, PlanTierMixRow, SeatMigrationRow},
    types::Driver,
};
use std::path::{Path, PathBuf};

pub const ACCOUNT_MONTH_MRR: &str = "account_month_mrr.csv";
pub const MONTHLY_NET_REVENUE: &str = "monthly_net_revenue.csv";
pub const NEW_ACCOUNTS_PER_MONTH: &str = "hypA_new_accounts_per_month.csv";
pub const REFERRAL_SOURCE_MIX: &str = "hypA_referral_source_mix.csv";
pub const STARTING_MRR_TREND: &str = "hypA_starting_mrr_trend.csv";
pub const CHURN_RATE_OVERALL: &str = "hypB_churn_rate_overall.csv";
pub const CHURN_BY_TENURE_BUCKET: &str = "hypB_churn_by_tenure_bucket.csv";
pub const REVENUE_BRIDGE: &str = "hypB_revenue_bridge_components.csv";
pub const ARPA_DRIFT: &str = "hypC_arpa_drift.csv";
pub const PLAN_TIER_MIX: &str = "hypC_plan_tier_mix.csv";
pub const SEAT_MIGRATION: &str = "hypC_seat_migration.csv";
pub const DRIVER_COMPARISON: &str = "phase3_driver_comparison.csv";

/// Every artifact a complete run leaves in the processed directory.
pub const EXPECTED_ARTIFACTS: &[&str] = &[
    MONTHLY_NET_REVENUE,
    ACCOUNT_MONTH_MRR,
    NEW_ACCOUNTS_PER_MONTH,
    REFERRAL_SOURCE_MIX,
    STARTING_MRR_TREND,
    CHURN_RATE_OVERALL,
    CHURN_BY_TENURE_BUCKET,
    REVENUE_BRIDGE,
    ARPA_DRIFT,
    PLAN_TIER_MIX,
    SEAT_MIGRATION,
    DRIVER_COMPARISON,
];

/// Columns downstream verification requires in the driver comparison.
pub const DRIVER_COMPARISON_REQUIRED: &[&str] = &[
    "month",
    "leader_lever_3m",
    "leader_pressure_3m",
    "acq_pressure_3m",
    "ret_pressure_3m",
    "prc_pressure_3m",
];

/// A table row that can be rendered as one CSV record.
pub trait CsvRow {
    const HEADER: &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    /// Create the output directory if needed.
    pub fn create(dir: impl AsRef<Path>) -> PipelineResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `rows` to `file_name`, replacing any previous content.
    /// The header is written even for an empty table.
    pub fn write<T: CsvRow>(&self, file_name: &str, rows: &[T]) -> PipelineResult<PathBuf> {
        let path = self.dir.join(file_name);
        let mut wtr = csv::Writer::from_path(&path)?;
        wtr.write_record(T::HEADER)?;
        for row in rows {
            wtr.write_record(row.cells())?;
        }
        wtr.flush()?;
        log::debug!("artifacts: wrote {} rows to {}", rows.len(), path.display());
        Ok(path)
    }
}

// ── Cell formatting ──────────────────────────────────────────────────────────

fn num(v: f64) -> String {
    v.to_string()
}

fn opt_num(v: Option<f64>) -> String {
    v.map(num).unwrap_or_default()
}

fn opt_driver(v: Option<Driver>) -> String {
    v.map(|d| d.as_str().to_string()).unwrap_or_default()
}

fn flag(v: bool) -> String {
    if v { "True".into() } else { "False".into() }
}

// ── Tables ───────────────────────────────────────────────────────────────────

impl CsvRow for AccountMonthRecord {
    const HEADER: &'static [&'static str] =
        &["account_id", "month", "mrr_amount", "any_upgrade", "any_downgrade", "any_churn"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.account_id.clone(),
            self.month.to_string(),
            num(self.mrr_amount),
            flag(self.any_upgrade),
            flag(self.any_downgrade),
            flag(self.any_churn),
        ]
    }
}

impl CsvRow for MonthlyAggregate {
    const HEADER: &'static [&'static str] =
        &["month", "net_revenue", "active_accounts", "arpa", "mom_growth", "yoy_growth"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.month.to_string(),
            num(self.net_revenue),
            self.active_accounts.to_string(),
            num(self.arpa),
            opt_num(self.mom_growth),
            opt_num(self.yoy_growth),
        ]
    }
}

impl CsvRow for NewAccountsRow {
    const HEADER: &'static [&'static str] = &["month", "new_accounts"];

    fn cells(&self) -> Vec<String> {
        vec![self.month.to_string(), self.new_accounts.to_string()]
    }
}

impl CsvRow for ReferralMixRow {
    const HEADER: &'static [&'static str] = &["month", "referral_source", "new_accounts"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.month.to_string(),
            self.referral_source.clone(),
            self.new_accounts.to_string(),
        ]
    }
}

impl CsvRow for StartingMrrRow {
    const HEADER: &'static [&'static str] =
        &["month", "avg_starting_mrr", "median_starting_mrr", "pct_missing_starting_mrr"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.month.to_string(),
            opt_num(self.avg_starting_mrr),
            opt_num(self.median_starting_mrr),
            num(self.pct_missing_starting_mrr),
        ]
    }
}

impl CsvRow for ChurnRateRow {
    const HEADER: &'static [&'static str] =
        &["month", "churned_accounts", "prior_active_accounts", "churn_rate"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.month.to_string(),
            self.churned_accounts.to_string(),
            self.prior_active_accounts.map(|n| n.to_string()).unwrap_or_default(),
            opt_num(self.churn_rate),
        ]
    }
}

impl CsvRow for TenureChurnRow {
    const HEADER: &'static [&'static str] =
        &["month", "tenure_bucket", "churned_accounts", "churned_mrr"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.month.to_string(),
            self.tenure_bucket.as_str().to_string(),
            self.churned_accounts.to_string(),
            num(self.churned_mrr),
        ]
    }
}

impl CsvRow for BridgeRow {
    const HEADER: &'static [&'static str] = &[
        "month",
        "expansion_mrr",
        "contraction_mrr",
        "churned_mrr",
        "prior_start_mrr",
        "net_retained_mrr",
        "nrr",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.month.to_string(),
            num(self.expansion_mrr),
            num(self.contraction_mrr),
            num(self.churned_mrr),
            opt_num(self.prior_start_mrr),
            opt_num(self.net_retained_mrr),
            opt_num(self.nrr),
        ]
    }
}

impl CsvRow for ArpaDriftRow {
    const HEADER: &'static [&'static str] = &["month", "arpa", "active_accounts", "net_revenue"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.month.to_string(),
            num(self.arpa),
            self.active_accounts.to_string(),
            num(self.net_revenue),
        ]
    }
}

impl CsvRow for PlanTierMixRow {
    const HEADER: &'static [&'static str] = &[
        "month",
        "plan_tier",
        "accounts",
        "seats",
        "mrr",
        "total_accounts",
        "total_mrr",
        "account_share",
        "mrr_share",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.month.to_string(),
            self.plan_tier.clone(),
            self.accounts.to_string(),
            self.seats.to_string(),
            num(self.mrr),
            self.total_accounts.to_string(),
            num(self.total_mrr),
            opt_num(self.account_share),
            opt_num(self.mrr_share),
        ]
    }
}

impl CsvRow for SeatMigrationRow {
    const HEADER: &'static [&'static str] = &["month", "avg_seats", "median_seats"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.month.to_string(),
            opt_num(self.avg_seats),
            opt_num(self.median_seats),
        ]
    }
}

impl CsvRow for DriverComparisonRow {
    const HEADER: &'static [&'static str] = &[
        "month",
        "net_revenue",
        "mom_growth",
        "yoy_growth",
        "new_accounts",
        "avg_starting_mrr",
        "acq_contribution",
        "retention_contribution",
        "pricing_contribution",
        "acq_abs",
        "ret_abs",
        "prc_abs",
        "acq_abs_3m",
        "ret_abs_3m",
        "prc_abs_3m",
        "leader_lever_3m",
        "acq_pressure",
        "ret_pressure",
        "prc_pressure",
        "acq_pressure_3m",
        "ret_pressure_3m",
        "prc_pressure_3m",
        "leader_pressure_3m",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.month.to_string(),
            num(self.net_revenue),
            opt_num(self.mom_growth),
            opt_num(self.yoy_growth),
            num(self.new_accounts),
            num(self.avg_starting_mrr),
            opt_num(self.contribution.acquisition),
            opt_num(self.contribution.retention),
            opt_num(self.contribution.pricing),
            opt_num(self.magnitude.acquisition),
            opt_num(self.magnitude.retention),
            opt_num(self.magnitude.pricing),
            opt_num(self.magnitude_3m.acquisition),
            opt_num(self.magnitude_3m.retention),
            opt_num(self.magnitude_3m.pricing),
            opt_driver(self.leader_lever_3m),
            opt_num(self.pressure.acquisition),
            opt_num(self.pressure.retention),
            opt_num(self.pressure.pricing),
            opt_num(self.pressure_3m.acquisition),
            opt_num(self.pressure_3m.retention),
            opt_num(self.pressure_3m.pricing),
            opt_driver(self.leader_pressure_3m),
        ]
    }
}
