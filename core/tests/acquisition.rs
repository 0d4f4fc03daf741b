//! New accounts, referral mix and starting MRR per signup month.

mod common;

use common::{account, account_months, sub, ym};
use revenue_core::{
    acquisition::{acquisition_output, signup_months, starting_mrr_by_account},
    raw::Account,
};

fn accounts() -> Vec<Account> {
    vec![
        account("A1", "2024-01-03", Some("ads")),
        account("A2", "2024-01-20", Some("partner")),
        account("A3", "2024-01-25", Some("ads")),
        account("A4", "2024-02-02", None),
        // Duplicate id: the first row wins.
        account("A1", "2024-05-01", Some("other")),
        Account { signup_date: None, ..account("A5", "2024-01-01", Some("ads")) },
    ]
}

#[test]
fn new_accounts_count_distinct_signups_per_month() {
    let out = acquisition_output(&accounts(), &[]);

    let counts: Vec<_> = out.new_accounts.iter().map(|r| (r.month, r.new_accounts)).collect();
    assert_eq!(counts, vec![(ym("2024-01"), 3), (ym("2024-02"), 1)]);
    assert_eq!(out.new_accounts_in(ym("2024-05")), None);
}

#[test]
fn referral_mix_is_ordered_by_count_then_source() {
    let out = acquisition_output(&accounts(), &[]);

    let mix: Vec<_> = out
        .referral_mix
        .iter()
        .map(|r| (r.month, r.referral_source.as_str(), r.new_accounts))
        .collect();
    // A4 has no source and is left out of February's mix.
    assert_eq!(mix, vec![(ym("2024-01"), "ads", 2), (ym("2024-01"), "partner", 1)]);
}

#[test]
fn starting_mrr_is_each_accounts_first_account_month() {
    let records = account_months(&[
        sub("A1", "2024-01-03", "2024-02-29", 100.0),
        sub("A1", "2024-02-01", "2024-02-29", 20.0),
        sub("A2", "2024-02-01", "2024-03-31", 50.0),
        sub("A4", "2024-02-02", "2024-02-29", 30.0),
    ]);
    let starting = starting_mrr_by_account(&records);
    assert_eq!(starting.get("A1"), Some(&100.0));
    assert_eq!(starting.get("A2"), Some(&50.0));

    let out = acquisition_output(&accounts(), &records);
    let jan = &out.starting_mrr[0];
    assert_eq!(jan.month, ym("2024-01"));
    assert_eq!(jan.avg_starting_mrr, Some(75.0));
    assert_eq!(jan.median_starting_mrr, Some(75.0));
    // A3 never billed.
    assert!((jan.pct_missing_starting_mrr - 1.0 / 3.0).abs() < 1e-12);

    assert_eq!(out.avg_starting_mrr_in(ym("2024-02")), Some(30.0));
    assert_eq!(out.starting_mrr[1].pct_missing_starting_mrr, 0.0);
}

#[test]
fn signup_months_skip_accounts_without_a_date() {
    let months = signup_months(&accounts());
    assert_eq!(months.len(), 4);
    assert_eq!(months.get("A1"), Some(&ym("2024-01")));
    assert!(!months.contains_key("A5"));
}
