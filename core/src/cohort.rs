//! Cohort and churn attribution — tenure buckets, churn months, MRR deltas
//! and the net-revenue-retention bridge.
//!
//! This stage:
//!   1. Buckets every account-month by tenure since signup
//!   2. Fixes each account's churn month at its earliest churn event
//!   3. Attributes churned MRR at the point of loss (the prior record's MRR)
//!   4. Splits account-level MRR deltas into expansion and contraction
//!   5. Builds the monthly bridge, logo churn rate and churn by tenure

use crate::{
    acquisition::signup_months,
    aggregate::{monthly_totals, AccountMonthRecord},
    raw::{Account, ChurnEvent},
    stats,
    types::{AccountId, YearMonth},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ── Tenure ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TenureBucket {
    #[serde(rename = "0-2")]
    Months0To2,
    #[serde(rename = "3-5")]
    Months3To5,
    #[serde(rename = "6-11")]
    Months6To11,
    #[serde(rename = "12+")]
    Months12Plus,
    #[serde(rename = "unknown")]
    Unknown,
}

impl TenureBucket {
    pub fn from_tenure(tenure_months: Option<i64>) -> Self {
        match tenure_months {
            Some(t) if t < 0 => TenureBucket::Unknown,
            Some(0..=2)      => TenureBucket::Months0To2,
            Some(3..=5)      => TenureBucket::Months3To5,
            Some(6..=11)     => TenureBucket::Months6To11,
            Some(_)          => TenureBucket::Months12Plus,
            None             => TenureBucket::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TenureBucket::Months0To2   => "0-2",
            TenureBucket::Months3To5   => "3-5",
            TenureBucket::Months6To11  => "6-11",
            TenureBucket::Months12Plus => "12+",
            TenureBucket::Unknown      => "unknown",
        }
    }
}

/// Months between the signup month and `month`. `None` without a signup.
pub fn tenure_months(month: YearMonth, signup: Option<YearMonth>) -> Option<i64> {
    signup.map(|s| month.months_since(s))
}

// ── Churn month ──────────────────────────────────────────────────────────────

/// Earliest churn month per account. Later events are ignored.
pub fn earliest_churn_months(events: &[ChurnEvent]) -> HashMap<AccountId, YearMonth> {
    let mut out: HashMap<AccountId, YearMonth> = HashMap::new();
    for ev in events {
        let (Some(id), Some(date)) = (&ev.account_id, ev.churn_date) else {
            continue;
        };
        let month = YearMonth::from_date(date);
        out.entry(id.clone())
            .and_modify(|m| *m = (*m).min(month))
            .or_insert(month);
    }
    out
}

// ── Attribution ──────────────────────────────────────────────────────────────

/// An account-month annotated with its prior record, tenure and churn status.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributedMonth {
    pub account_id:     AccountId,
    pub month:          YearMonth,
    pub mrr_amount:     f64,
    /// MRR of the account's previous record; `None` on its first record.
    pub prior_mrr:      Option<f64>,
    pub tenure_bucket:  TenureBucket,
    pub is_churn_month: bool,
}

impl AttributedMonth {
    pub fn delta_mrr(&self) -> Option<f64> {
        self.prior_mrr.map(|prior| self.mrr_amount - prior)
    }

    pub fn expansion_mrr(&self) -> f64 {
        self.delta_mrr().filter(|d| *d > 0.0).unwrap_or(0.0)
    }

    pub fn contraction_mrr(&self) -> f64 {
        self.delta_mrr().filter(|d| *d < 0.0).map(|d| -d).unwrap_or(0.0)
    }

    /// MRR lost if this is the churn month: the prior record's MRR.
    pub fn churned_mrr(&self) -> f64 {
        if self.is_churn_month { self.prior_mrr.unwrap_or(0.0) } else { 0.0 }
    }
}

/// Annotate account-months, ordered by (account, month).
pub fn attribute(
    account_months: &[AccountMonthRecord],
    accounts: &[Account],
    churn_events: &[ChurnEvent],
) -> Vec<AttributedMonth> {
    let signups = signup_months(accounts);
    let churn_months = earliest_churn_months(churn_events);

    let mut sorted: Vec<&AccountMonthRecord> = account_months.iter().collect();
    sorted.sort_by(|a, b| a.account_id.cmp(&b.account_id).then(a.month.cmp(&b.month)));

    let mut out = Vec::with_capacity(sorted.len());
    let mut previous: Option<&AccountMonthRecord> = None;

    for rec in sorted {
        let prior_mrr = previous
            .filter(|p| p.account_id == rec.account_id)
            .map(|p| p.mrr_amount);
        let tenure = tenure_months(rec.month, signups.get(&rec.account_id).copied());

        out.push(AttributedMonth {
            account_id:     rec.account_id.clone(),
            month:          rec.month,
            mrr_amount:     rec.mrr_amount,
            prior_mrr,
            tenure_bucket:  TenureBucket::from_tenure(tenure),
            is_churn_month: churn_months.get(&rec.account_id) == Some(&rec.month),
        });
        previous = Some(rec);
    }

    out
}

// ── Output tables ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeRow {
    pub month:            YearMonth,
    pub expansion_mrr:    f64,
    pub contraction_mrr:  f64,
    pub churned_mrr:      f64,
    /// Total MRR of the preceding calendar month.
    pub prior_start_mrr:  Option<f64>,
    pub net_retained_mrr: Option<f64>,
    pub nrr:              Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChurnRateRow {
    pub month:                 YearMonth,
    pub churned_accounts:      usize,
    pub prior_active_accounts: Option<usize>,
    pub churn_rate:            Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TenureChurnRow {
    pub month:            YearMonth,
    pub tenure_bucket:    TenureBucket,
    pub churned_accounts: usize,
    pub churned_mrr:      f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CohortOutput {
    pub bridge:          Vec<BridgeRow>,
    pub churn_rate:      Vec<ChurnRateRow>,
    pub churn_by_tenure: Vec<TenureChurnRow>,
}

impl CohortOutput {
    pub fn bridge_for(&self, month: YearMonth) -> Option<&BridgeRow> {
        self.bridge.iter().find(|r| r.month == month)
    }
}

#[derive(Default)]
struct MonthAccumulator {
    expansion:   f64,
    contraction: f64,
    churned:     f64,
    churned_accounts: usize,
    active_accounts:  usize,
}

pub fn cohort_analysis(
    account_months: &[AccountMonthRecord],
    accounts: &[Account],
    churn_events: &[ChurnEvent],
) -> CohortOutput {
    let attributed = attribute(account_months, accounts, churn_events);
    let totals = monthly_totals(account_months);

    let mut per_month: BTreeMap<YearMonth, MonthAccumulator> = BTreeMap::new();
    let mut per_tenure: BTreeMap<(YearMonth, &'static str), (TenureBucket, usize, f64)> =
        BTreeMap::new();

    for row in &attributed {
        let acc = per_month.entry(row.month).or_default();
        acc.expansion += row.expansion_mrr();
        acc.contraction += row.contraction_mrr();
        acc.active_accounts += 1;

        if row.is_churn_month {
            acc.churned += row.churned_mrr();
            acc.churned_accounts += 1;

            let slot = per_tenure
                .entry((row.month, row.tenure_bucket.as_str()))
                .or_insert((row.tenure_bucket, 0, 0.0));
            slot.1 += 1;
            slot.2 += row.churned_mrr();
        }
    }

    let mut out = CohortOutput::default();

    for (month, acc) in &per_month {
        let prior_start_mrr = totals.get(&month.prev()).copied();
        let net_retained_mrr =
            prior_start_mrr.map(|p| p + acc.expansion - acc.contraction - acc.churned);
        let nrr = net_retained_mrr.and_then(|n| stats::ratio(n, prior_start_mrr));

        out.bridge.push(BridgeRow {
            month:            *month,
            expansion_mrr:    acc.expansion,
            contraction_mrr:  acc.contraction,
            churned_mrr:      acc.churned,
            prior_start_mrr,
            net_retained_mrr,
            nrr,
        });

        if acc.churned_accounts > 0 {
            let prior_active_accounts = per_month.get(&month.prev()).map(|p| p.active_accounts);
            out.churn_rate.push(ChurnRateRow {
                month:            *month,
                churned_accounts: acc.churned_accounts,
                prior_active_accounts,
                churn_rate: stats::ratio(
                    acc.churned_accounts as f64,
                    prior_active_accounts.map(|n| n as f64),
                ),
            });
        }
    }

    out.churn_by_tenure = per_tenure
        .into_iter()
        .map(|((month, _), (bucket, n, mrr))| TenureChurnRow {
            month,
            tenure_bucket:    bucket,
            churned_accounts: n,
            churned_mrr:      mrr,
        })
        .collect();

    let churned: usize = out.churn_rate.iter().map(|r| r.churned_accounts).sum();
    log::debug!(
        "cohort: {} bridge months, {churned} churned accounts attributed",
        out.bridge.len(),
    );

    out
}
