//! Shared builders for the integration tests.
#![allow(dead_code)]

use chrono::NaiveDate;
use revenue_core::{
    aggregate::{build_account_months, AccountMonthRecord},
    interval::expand_subscriptions,
    raw::{Account, ChurnEvent, Subscription},
    types::YearMonth,
};
use std::path::Path;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("test date")
}

pub fn ym(s: &str) -> YearMonth {
    s.parse().expect("test month")
}

pub fn sub(account: &str, start: &str, end: &str, mrr: f64) -> Subscription {
    Subscription {
        subscription_id: Some(format!("S-{account}-{start}")),
        account_id:      Some(account.to_string()),
        plan_tier:       Some("Basic".to_string()),
        seats:           Some(1),
        mrr_amount:      Some(mrr),
        start_date:      Some(date(start)),
        end_date:        Some(date(end)),
        upgrade_flag:    false,
        downgrade_flag:  false,
        churn_flag:      false,
    }
}

pub fn tiered(account: &str, start: &str, end: &str, mrr: f64, tier: &str, seats: i64) -> Subscription {
    Subscription {
        plan_tier: Some(tier.to_string()),
        seats:     Some(seats),
        ..sub(account, start, end, mrr)
    }
}

pub fn account(id: &str, signup: &str, source: Option<&str>) -> Account {
    Account {
        account_id:      Some(id.to_string()),
        signup_date:     Some(date(signup)),
        referral_source: source.map(str::to_string),
    }
}

pub fn churn(id: &str, on: &str) -> ChurnEvent {
    ChurnEvent {
        account_id: Some(id.to_string()),
        churn_date: Some(date(on)),
    }
}

pub fn account_months(subs: &[Subscription]) -> Vec<AccountMonthRecord> {
    build_account_months(&expand_subscriptions(subs))
}

// ── On-disk fixture ──────────────────────────────────────────────────────────

pub const ACCOUNTS_CSV: &str = "\
account_id,account_name,signup_date,referral_source,industry
A001,Acme,2024-01-05,ads,Retail
A002,Birch,2024-01-18,partner,Health
A003,Cobalt,2024-02-10,organic,Finance
A004,Dune,2024-03-02,ads,Retail
A005,Ember,2024-04-22,partner,Media
A006,Fjord,2024-05-09,,Media
";

pub const SUBSCRIPTIONS_CSV: &str = "\
subscription_id,account_id,start_date,end_date,plan_tier,seats,mrr_amount,arr_amount,upgrade_flag,downgrade_flag,churn_flag
S1,A001,2024-01-05,2024-08-31,Pro,10,500,6000,False,False,False
S2,A002,2024-01-18,2024-04-30,Basic,3,120,1440,False,False,True
S3,A003,2024-02-10,2024-08-31,Enterprise,25,1500,18000,True,False,False
S4,A004,2024-03-02,2024-05-15,Pro,8,400,4800,False,True,True
S5,A005,2024-04-22,2024-08-31,Basic,2,90,1080,False,False,False
S6,A006,2024-05-09,2024-08-31,Basic,1,40,480,False,False,False
S7,A001,2024-06-01,2024-08-31,Basic,2,60,720,True,False,False
";

pub const CHURN_EVENTS_CSV: &str = "\
churn_event_id,account_id,churn_date,reason_code
C1,A002,2024-04-30,pricing
C2,A004,2024-05-15,features
C3,A004,2024-07-01,support
";

/// Distinct months covered by the fixture subscriptions.
pub const FIXTURE_MONTHS: usize = 8;
/// Account-months produced by the fixture subscriptions.
pub const FIXTURE_ACCOUNT_MONTHS: usize = 31;

pub fn write_fixture(raw_dir: &Path) {
    write_raw(raw_dir, ACCOUNTS_CSV, SUBSCRIPTIONS_CSV, CHURN_EVENTS_CSV);
}

pub fn write_raw(raw_dir: &Path, accounts: &str, subscriptions: &str, churn_events: &str) {
    std::fs::create_dir_all(raw_dir).expect("raw dir");
    std::fs::write(raw_dir.join("ravenstack_accounts.csv"), accounts).expect("accounts");
    std::fs::write(raw_dir.join("ravenstack_subscriptions.csv"), subscriptions).expect("subscriptions");
    std::fs::write(raw_dir.join("ravenstack_churn_events.csv"), churn_events).expect("churn events");
}
