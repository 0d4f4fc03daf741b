//! Account-month rollup and the monthly net revenue series.

use crate::{
    interval::SubscriptionMonth,
    stats,
    types::{AccountId, YearMonth},
};
use std::collections::BTreeMap;

/// Rows back for the year-over-year comparison.
pub const YOY_LAG: usize = 12;

/// One account in one month. Unique on (account_id, month).
#[derive(Debug, Clone, PartialEq)]
pub struct AccountMonthRecord {
    pub account_id:    AccountId,
    pub month:         YearMonth,
    pub mrr_amount:    f64,
    pub any_upgrade:   bool,
    pub any_downgrade: bool,
    pub any_churn:     bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyAggregate {
    pub month:           YearMonth,
    pub net_revenue:     f64,
    pub active_accounts: usize,
    pub arpa:            f64,
    pub mom_growth:      Option<f64>,
    pub yoy_growth:      Option<f64>,
}

/// Collapse subscription-months into account-months.
///
/// Concurrent subscriptions add up: a second subscription is extra revenue,
/// not a replacement. Flags are OR'ed. Output is sorted by (month, account).
pub fn build_account_months(expanded: &[SubscriptionMonth]) -> Vec<AccountMonthRecord> {
    let mut by_key: BTreeMap<(YearMonth, &str), AccountMonthRecord> = BTreeMap::new();

    for row in expanded {
        by_key
            .entry((row.month, row.account_id.as_str()))
            .and_modify(|rec| {
                rec.mrr_amount    += row.mrr_amount;
                rec.any_upgrade   |= row.upgrade_flag;
                rec.any_downgrade |= row.downgrade_flag;
                rec.any_churn     |= row.churn_flag;
            })
            .or_insert_with(|| AccountMonthRecord {
                account_id:    row.account_id.clone(),
                month:         row.month,
                mrr_amount:    row.mrr_amount,
                any_upgrade:   row.upgrade_flag,
                any_downgrade: row.downgrade_flag,
                any_churn:     row.churn_flag,
            });
    }

    by_key.into_values().collect()
}

/// Total MRR per month across all accounts.
pub fn monthly_totals(records: &[AccountMonthRecord]) -> BTreeMap<YearMonth, f64> {
    let mut totals = BTreeMap::new();
    for rec in records {
        *totals.entry(rec.month).or_insert(0.0) += rec.mrr_amount;
    }
    totals
}

/// One row per distinct month, ascending, with MoM and YoY growth.
///
/// Growth compares against the previous row and the row `YOY_LAG` rows
/// earlier. Either is `None` when that row is absent or its revenue is zero.
pub fn monthly_net_revenue(records: &[AccountMonthRecord]) -> Vec<MonthlyAggregate> {
    let mut per_month: BTreeMap<YearMonth, (f64, usize)> = BTreeMap::new();
    for rec in records {
        let entry = per_month.entry(rec.month).or_insert((0.0, 0));
        entry.0 += rec.mrr_amount;
        entry.1 += 1;
    }

    let mut rows: Vec<MonthlyAggregate> = per_month
        .into_iter()
        .map(|(month, (net_revenue, active_accounts))| MonthlyAggregate {
            month,
            net_revenue,
            active_accounts,
            arpa: net_revenue / active_accounts as f64,
            mom_growth: None,
            yoy_growth: None,
        })
        .collect();

    for i in 0..rows.len() {
        let lagged = |lag: usize| i.checked_sub(lag).map(|j| rows[j].net_revenue);
        let mom = stats::pct_change(rows[i].net_revenue, lagged(1));
        let yoy = stats::pct_change(rows[i].net_revenue, lagged(YOY_LAG));
        rows[i].mom_growth = mom;
        rows[i].yoy_growth = yoy;
    }

    rows
}
