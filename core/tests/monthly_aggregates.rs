//! Monthly net revenue, ARPA and growth boundaries.

mod common;

use common::{account_months, sub, ym};
use revenue_core::aggregate::{monthly_net_revenue, monthly_totals};

#[test]
fn first_month_has_no_growth_and_thirteenth_has_yoy() {
    let records = account_months(&[
        sub("A1", "2023-01-01", "2024-01-31", 100.0),
        sub("A2", "2024-01-01", "2024-01-31", 50.0),
    ]);
    let rows = monthly_net_revenue(&records);

    assert_eq!(rows.len(), 13);
    assert_eq!(rows[0].mom_growth, None);
    assert_eq!(rows[0].yoy_growth, None);

    assert_eq!(rows[1].mom_growth, Some(0.0));
    assert_eq!(rows[11].yoy_growth, None);

    assert_eq!(rows[12].month, ym("2024-01"));
    assert_eq!(rows[12].yoy_growth, Some(0.5));
    assert_eq!(rows[12].mom_growth, Some(0.5));
}

#[test]
fn arpa_is_revenue_per_active_account() {
    let records = account_months(&[
        sub("A1", "2024-01-01", "2024-01-31", 100.0),
        sub("A1", "2024-01-01", "2024-01-31", 20.0),
        sub("A2", "2024-01-01", "2024-01-31", 60.0),
    ]);
    let rows = monthly_net_revenue(&records);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].net_revenue, 180.0);
    assert_eq!(rows[0].active_accounts, 2);
    assert_eq!(rows[0].arpa, 90.0);
}

#[test]
fn growth_from_zero_revenue_is_undefined() {
    let records = account_months(&[
        sub("A1", "2024-01-01", "2024-01-31", 0.0),
        sub("A1", "2024-02-01", "2024-02-29", 10.0),
    ]);
    let rows = monthly_net_revenue(&records);

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].mom_growth, None);
}

#[test]
fn gaps_compare_against_the_previous_row() {
    let records = account_months(&[
        sub("A1", "2024-01-01", "2024-01-31", 100.0),
        sub("A1", "2024-04-01", "2024-04-30", 150.0),
    ]);
    let rows = monthly_net_revenue(&records);

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].month, ym("2024-04"));
    assert_eq!(rows[1].mom_growth, Some(0.5));
}

#[test]
fn totals_match_the_monthly_series() {
    let records = account_months(&[
        sub("A1", "2024-01-01", "2024-03-31", 100.0),
        sub("A2", "2024-02-01", "2024-03-31", 25.0),
    ]);
    let totals = monthly_totals(&records);
    let rows = monthly_net_revenue(&records);

    for row in &rows {
        assert_eq!(totals.get(&row.month).copied(), Some(row.net_revenue));
    }
}
