//! Pricing proxies — ARPA drift, plan-tier mix and seat migration.
//!
//! No discount data exists, so pricing pressure is read indirectly: ARPA
//! over time, which tiers accounts sit on, and how many seats they carry.
//! Each account-month is represented by its highest-MRR subscription.

use crate::{
    aggregate::MonthlyAggregate,
    interval::month_range,
    raw::Subscription,
    stats,
    types::{AccountId, YearMonth},
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ArpaDriftRow {
    pub month:           YearMonth,
    pub arpa:            f64,
    pub active_accounts: usize,
    pub net_revenue:     f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanTierMixRow {
    pub month:          YearMonth,
    pub plan_tier:      String,
    pub accounts:       usize,
    pub seats:          i64,
    pub mrr:            f64,
    pub total_accounts: usize,
    pub total_mrr:      f64,
    pub account_share:  Option<f64>,
    pub mrr_share:      Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeatMigrationRow {
    pub month:        YearMonth,
    pub avg_seats:    Option<f64>,
    pub median_seats: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingOutput {
    pub arpa_drift:     Vec<ArpaDriftRow>,
    pub plan_tier_mix:  Vec<PlanTierMixRow>,
    pub seat_migration: Vec<SeatMigrationRow>,
}

/// A tiered subscription active in one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct TierMonth {
    pub account_id: AccountId,
    pub month:      YearMonth,
    pub plan_tier:  String,
    pub seats:      Option<i64>,
    pub mrr_amount: Option<f64>,
}

/// Highest-MRR subscription per (month, account). Ties keep the first
/// subscription in input order.
///
/// Only the account id, both dates and the plan tier are required. A blank
/// MRR ranks below any recorded amount and adds nothing to tier MRR.
pub fn top_subscription_per_account_month(
    subscriptions: &[Subscription],
) -> BTreeMap<(YearMonth, AccountId), TierMonth> {
    let mut top: BTreeMap<(YearMonth, AccountId), TierMonth> = BTreeMap::new();
    let mut skipped = 0usize;

    for sub in subscriptions {
        let (Some(account_id), Some(start), Some(end), Some(tier)) =
            (&sub.account_id, sub.start_date, sub.end_date, &sub.plan_tier)
        else {
            skipped += 1;
            continue;
        };

        let (start, end) = (YearMonth::from_date(start), YearMonth::from_date(end));
        for month in month_range(start, end) {
            let key = (month, account_id.clone());
            match top.get(&key) {
                Some(current) if current.mrr_amount >= sub.mrr_amount => {}
                _ => {
                    top.insert(key, TierMonth {
                        account_id: account_id.clone(),
                        month,
                        plan_tier:  tier.clone(),
                        seats:      sub.seats,
                        mrr_amount: sub.mrr_amount,
                    });
                }
            }
        }
    }

    if skipped > 0 {
        log::debug!("pricing: {skipped} subscriptions without account, dates or tier");
    }
    top
}

pub fn pricing_proxies(
    subscriptions: &[Subscription],
    monthly: &[MonthlyAggregate],
) -> PricingOutput {
    let arpa_drift = monthly
        .iter()
        .map(|m| ArpaDriftRow {
            month:           m.month,
            arpa:            m.arpa,
            active_accounts: m.active_accounts,
            net_revenue:     m.net_revenue,
        })
        .collect();

    let top = top_subscription_per_account_month(subscriptions);

    // (month, tier) -> (accounts, seats, mrr)
    let mut tiers: BTreeMap<(YearMonth, &str), (usize, i64, f64)> = BTreeMap::new();
    let mut seats: BTreeMap<YearMonth, Vec<f64>> = BTreeMap::new();
    for ((month, _), row) in &top {
        let slot = tiers.entry((*month, row.plan_tier.as_str())).or_insert((0, 0, 0.0));
        slot.0 += 1;
        slot.1 += row.seats.unwrap_or(0);
        slot.2 += row.mrr_amount.unwrap_or(0.0);

        let month_seats = seats.entry(*month).or_default();
        if let Some(n) = row.seats {
            month_seats.push(n as f64);
        }
    }

    let mut totals: BTreeMap<YearMonth, (usize, f64)> = BTreeMap::new();
    for ((month, _), (accounts, _, mrr)) in &tiers {
        let t = totals.entry(*month).or_insert((0, 0.0));
        t.0 += accounts;
        t.1 += mrr;
    }

    let mut plan_tier_mix: Vec<PlanTierMixRow> = tiers
        .into_iter()
        .map(|((month, tier), (accounts, seat_sum, mrr))| {
            let (total_accounts, total_mrr) = totals.get(&month).copied().unwrap_or((0, 0.0));
            PlanTierMixRow {
                month,
                plan_tier: tier.to_string(),
                accounts,
                seats: seat_sum,
                mrr,
                total_accounts,
                total_mrr,
                account_share: stats::ratio(accounts as f64, Some(total_accounts as f64)),
                mrr_share: stats::ratio(mrr, Some(total_mrr)),
            }
        })
        .collect();
    plan_tier_mix.sort_by(|a, b| {
        a.month
            .cmp(&b.month)
            .then(b.accounts.cmp(&a.accounts))
            .then_with(|| a.plan_tier.cmp(&b.plan_tier))
    });

    let seat_migration = seats
        .into_iter()
        .map(|(month, values)| SeatMigrationRow {
            month,
            avg_seats:    stats::mean(&values),
            median_seats: stats::median(&values),
        })
        .collect();

    PricingOutput { arpa_drift, plan_tier_mix, seat_migration }
}
