//! Raw source tables — CSV loading and schema validation.
//!
//! Each table's required columns are checked once, against the header row.
//! Extra columns are ignored. A missing required column is fatal; an
//! unparsable cell is not: it becomes `None` and the owning row is dropped
//! later, by whichever stage needs that value.

use crate::{
    config::PipelineConfig,
    error::{PipelineError, PipelineResult},
    types::AccountId,
};
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

// ── Records ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub account_id:      Option<AccountId>,
    pub signup_date:     Option<NaiveDate>,
    pub referral_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub subscription_id: Option<String>,
    pub account_id:      Option<AccountId>,
    pub plan_tier:       Option<String>,
    pub seats:           Option<i64>,
    pub mrr_amount:      Option<f64>,
    pub start_date:      Option<NaiveDate>,
    pub end_date:        Option<NaiveDate>,
    pub upgrade_flag:    bool,
    pub downgrade_flag:  bool,
    pub churn_flag:      bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChurnEvent {
    pub account_id: Option<AccountId>,
    pub churn_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub accounts:      Vec<Account>,
    pub subscriptions: Vec<Subscription>,
    pub churn_events:  Vec<ChurnEvent>,
}

pub const ACCOUNT_COLUMNS: &[&str] = &["account_id", "signup_date", "referral_source"];

pub const SUBSCRIPTION_COLUMNS: &[&str] = &[
    "subscription_id",
    "account_id",
    "plan_tier",
    "seats",
    "mrr_amount",
    "start_date",
    "end_date",
    "upgrade_flag",
    "downgrade_flag",
    "churn_flag",
];

pub const CHURN_EVENT_COLUMNS: &[&str] = &["account_id", "churn_date"];

// ── Loading ──────────────────────────────────────────────────────────────────

/// Load all three source tables named by `config`.
pub fn load_raw(config: &PipelineConfig) -> PipelineResult<RawTables> {
    let accounts = read_accounts(open_input(&config.accounts_path())?)?;
    let subscriptions = read_subscriptions(open_input(&config.subscriptions_path())?)?;
    let churn_events = read_churn_events(open_input(&config.churn_events_path())?)?;

    log::info!(
        "raw: loaded {} accounts, {} subscriptions, {} churn events",
        accounts.len(),
        subscriptions.len(),
        churn_events.len(),
    );

    Ok(RawTables { accounts, subscriptions, churn_events })
}

fn open_input(path: &Path) -> PipelineResult<std::fs::File> {
    if !path.is_file() {
        return Err(PipelineError::MissingInput { path: path.display().to_string() });
    }
    Ok(std::fs::File::open(path)?)
}

pub fn read_accounts<R: Read>(reader: R) -> PipelineResult<Vec<Account>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let schema = Schema::resolve("accounts", rdr.headers()?, ACCOUNT_COLUMNS)?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(Account {
            account_id:      schema.text(&record, "account_id"),
            signup_date:     schema.date(&record, "signup_date"),
            referral_source: schema.text(&record, "referral_source"),
        });
    }
    Ok(rows)
}

pub fn read_subscriptions<R: Read>(reader: R) -> PipelineResult<Vec<Subscription>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let schema = Schema::resolve("subscriptions", rdr.headers()?, SUBSCRIPTION_COLUMNS)?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(Subscription {
            subscription_id: schema.text(&record, "subscription_id"),
            account_id:      schema.text(&record, "account_id"),
            plan_tier:       schema.text(&record, "plan_tier"),
            seats:           schema.text(&record, "seats").as_deref().and_then(parse_count),
            mrr_amount:      schema.number(&record, "mrr_amount"),
            start_date:      schema.date(&record, "start_date"),
            end_date:        schema.date(&record, "end_date"),
            upgrade_flag:    schema.flag(&record, "upgrade_flag"),
            downgrade_flag:  schema.flag(&record, "downgrade_flag"),
            churn_flag:      schema.flag(&record, "churn_flag"),
        });
    }
    Ok(rows)
}

pub fn read_churn_events<R: Read>(reader: R) -> PipelineResult<Vec<ChurnEvent>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let schema = Schema::resolve("churn_events", rdr.headers()?, CHURN_EVENT_COLUMNS)?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(ChurnEvent {
            account_id: schema.text(&record, "account_id"),
            churn_date: schema.date(&record, "churn_date"),
        });
    }
    Ok(rows)
}

// ── Schema ───────────────────────────────────────────────────────────────────

/// Column positions of one table, resolved from its header row.
struct Schema {
    positions: HashMap<&'static str, usize>,
}

impl Schema {
    fn resolve(
        table: &str,
        headers: &StringRecord,
        required: &[&'static str],
    ) -> PipelineResult<Self> {
        let mut positions = HashMap::with_capacity(required.len());
        for &column in required {
            let idx = headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or_else(|| PipelineError::MissingColumn {
                    table:  table.to_string(),
                    column: column.to_string(),
                })?;
            positions.insert(column, idx);
        }
        Ok(Self { positions })
    }

    fn cell<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        let idx = *self.positions.get(column)?;
        record.get(idx).map(str::trim).filter(|s| !s.is_empty())
    }

    fn text(&self, record: &StringRecord, column: &str) -> Option<String> {
        self.cell(record, column).map(str::to_string)
    }

    fn number(&self, record: &StringRecord, column: &str) -> Option<f64> {
        self.cell(record, column)
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    fn date(&self, record: &StringRecord, column: &str) -> Option<NaiveDate> {
        self.cell(record, column).and_then(parse_date)
    }

    fn flag(&self, record: &StringRecord, column: &str) -> bool {
        self.cell(record, column).is_some_and(parse_flag)
    }
}

// ── Cell parsing ─────────────────────────────────────────────────────────────

/// Parse a calendar date. Accepts ISO dates, ISO datetimes (time dropped)
/// and US-style `MM/DD/YYYY`. Anything else is missing.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%m/%d/%Y").ok()
}

fn parse_flag(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "y" | "t")
}

/// Whole counts; `"3.0"` is accepted, `"2.5"` is not.
fn parse_count(s: &str) -> Option<i64> {
    s.parse::<i64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}
