//! Interval expansion — subscriptions to subscription-months.
//!
//! A subscription active on any day of a month counts that month's full MRR.
//! There is no pro-ration of the first or last month.

use crate::{
    raw::Subscription,
    types::{AccountId, YearMonth},
};

/// One subscription active in one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionMonth {
    pub account_id:      AccountId,
    pub month:           YearMonth,
    pub subscription_id: Option<String>,
    pub plan_tier:       Option<String>,
    pub seats:           Option<i64>,
    pub mrr_amount:      f64,
    pub upgrade_flag:    bool,
    pub downgrade_flag:  bool,
    pub churn_flag:      bool,
}

/// Every calendar month from `start` through `end`, inclusive.
/// Empty when `start > end`.
pub fn month_range(start: YearMonth, end: YearMonth) -> impl Iterator<Item = YearMonth> {
    (start.index()..=end.index()).map(YearMonth::from_index)
}

/// Expand every usable subscription into its covered months.
///
/// Rows missing an account id, start date, end date or MRR are skipped, as
/// are rows with negative MRR. An inverted interval contributes nothing.
/// Output order follows input order; consumers sort.
pub fn expand_subscriptions(subscriptions: &[Subscription]) -> Vec<SubscriptionMonth> {
    let mut out = Vec::new();
    let mut skipped = 0usize;
    let mut inverted = 0usize;

    for sub in subscriptions {
        let (Some(account_id), Some(start), Some(end), Some(mrr)) =
            (&sub.account_id, sub.start_date, sub.end_date, sub.mrr_amount)
        else {
            skipped += 1;
            continue;
        };
        if mrr < 0.0 {
            skipped += 1;
            continue;
        }

        let (start, end) = (YearMonth::from_date(start), YearMonth::from_date(end));
        if start > end {
            inverted += 1;
            continue;
        }

        out.extend(month_range(start, end).map(|month| SubscriptionMonth {
            account_id:      account_id.clone(),
            month,
            subscription_id: sub.subscription_id.clone(),
            plan_tier:       sub.plan_tier.clone(),
            seats:           sub.seats,
            mrr_amount:      mrr,
            upgrade_flag:    sub.upgrade_flag,
            downgrade_flag:  sub.downgrade_flag,
            churn_flag:      sub.churn_flag,
        }));
    }

    if skipped > 0 || inverted > 0 {
        log::warn!(
            "interval: skipped {skipped} incomplete subscriptions, {inverted} with start after end"
        );
    }
    log::debug!(
        "interval: {} subscriptions expanded to {} subscription-months",
        subscriptions.len() - skipped - inverted,
        out.len(),
    );

    out
}
