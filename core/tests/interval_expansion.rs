//! Subscription intervals expand to one record per covered calendar month.

mod common;

use common::{account_months, sub, ym};
use revenue_core::{interval::{expand_subscriptions, month_range}, raw::Subscription};

#[test]
fn one_month_subscription_yields_one_record() {
    let rows = expand_subscriptions(&[sub("A1", "2024-03-05", "2024-03-28", 100.0)]);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].month, ym("2024-03"));
    assert_eq!(rows[0].mrr_amount, 100.0);
    assert_eq!(rows[0].account_id, "A1");
}

#[test]
fn start_after_end_yields_nothing() {
    let rows = expand_subscriptions(&[sub("A1", "2024-05-01", "2024-02-01", 100.0)]);
    assert!(rows.is_empty());
}

#[test]
fn partial_first_and_last_months_count_in_full() {
    let rows = expand_subscriptions(&[sub("A1", "2023-11-30", "2024-02-01", 80.0)]);

    let months: Vec<_> = rows.iter().map(|r| r.month).collect();
    assert_eq!(months, vec![ym("2023-11"), ym("2023-12"), ym("2024-01"), ym("2024-02")]);
    assert!(rows.iter().all(|r| r.mrr_amount == 80.0));
}

#[test]
fn month_range_is_inclusive_and_empty_when_inverted() {
    assert_eq!(month_range(ym("2024-01"), ym("2024-03")).count(), 3);
    assert_eq!(month_range(ym("2024-03"), ym("2024-03")).count(), 1);
    assert_eq!(month_range(ym("2024-04"), ym("2024-03")).count(), 0);
}

#[test]
fn incomplete_and_negative_rows_are_skipped() {
    let missing_mrr = Subscription { mrr_amount: None, ..sub("A1", "2024-01-01", "2024-02-01", 0.0) };
    let missing_end = Subscription { end_date: None, ..sub("A2", "2024-01-01", "2024-02-01", 50.0) };
    let missing_account = Subscription { account_id: None, ..sub("A3", "2024-01-01", "2024-02-01", 50.0) };
    let negative = sub("A4", "2024-01-01", "2024-02-01", -10.0);
    let good = sub("A5", "2024-01-01", "2024-02-01", 0.0);

    let rows = expand_subscriptions(&[missing_mrr, missing_end, missing_account, negative, good]);

    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.account_id == "A5"));
}

#[test]
fn overlapping_subscriptions_add_up_per_account_month() {
    let records = account_months(&[
        sub("A1", "2024-01-01", "2024-03-31", 100.0),
        sub("A1", "2024-03-01", "2024-04-30", 40.0),
        sub("A2", "2024-03-01", "2024-03-31", 7.0),
    ]);

    let march_a1: Vec<_> = records
        .iter()
        .filter(|r| r.account_id == "A1" && r.month == ym("2024-03"))
        .collect();
    assert_eq!(march_a1.len(), 1, "account-months must be unique");
    assert_eq!(march_a1[0].mrr_amount, 140.0);

    let april_a1 = records
        .iter()
        .find(|r| r.account_id == "A1" && r.month == ym("2024-04"))
        .expect("april record");
    assert_eq!(april_a1.mrr_amount, 40.0);

    // A1 covers Jan..Apr, A2 only March.
    assert_eq!(records.len(), 5);
}

#[test]
fn flags_are_ored_across_concurrent_subscriptions() {
    let upgraded = Subscription { upgrade_flag: true, ..sub("A1", "2024-01-01", "2024-01-31", 10.0) };
    let churned = Subscription { churn_flag: true, ..sub("A1", "2024-01-01", "2024-01-31", 20.0) };

    let records = account_months(&[upgraded, churned]);

    assert_eq!(records.len(), 1);
    assert!(records[0].any_upgrade);
    assert!(!records[0].any_downgrade);
    assert!(records[0].any_churn);
}

#[test]
fn account_months_are_sorted_by_month_then_account() {
    let records = account_months(&[
        sub("B", "2024-02-01", "2024-02-28", 1.0),
        sub("A", "2024-01-01", "2024-02-28", 1.0),
    ]);

    let keys: Vec<_> = records.iter().map(|r| (r.month, r.account_id.as_str())).collect();
    assert_eq!(
        keys,
        vec![(ym("2024-01"), "A"), (ym("2024-02"), "A"), (ym("2024-02"), "B")]
    );
}
