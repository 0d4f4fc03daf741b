//! Acquisition output — new-account volume, referral mix and starting MRR
//! per signup month.

use crate::{
    aggregate::AccountMonthRecord,
    raw::Account,
    stats,
    types::{AccountId, YearMonth},
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct NewAccountsRow {
    pub month:        YearMonth,
    pub new_accounts: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferralMixRow {
    pub month:           YearMonth,
    pub referral_source: String,
    pub new_accounts:    usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartingMrrRow {
    pub month:                    YearMonth,
    pub avg_starting_mrr:         Option<f64>,
    pub median_starting_mrr:      Option<f64>,
    pub pct_missing_starting_mrr: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcquisitionOutput {
    pub new_accounts:  Vec<NewAccountsRow>,
    pub referral_mix:  Vec<ReferralMixRow>,
    pub starting_mrr:  Vec<StartingMrrRow>,
}

impl AcquisitionOutput {
    pub fn new_accounts_in(&self, month: YearMonth) -> Option<usize> {
        self.new_accounts.iter().find(|r| r.month == month).map(|r| r.new_accounts)
    }

    pub fn avg_starting_mrr_in(&self, month: YearMonth) -> Option<f64> {
        self.starting_mrr
            .iter()
            .find(|r| r.month == month)
            .and_then(|r| r.avg_starting_mrr)
    }
}

/// MRR of each account's earliest account-month.
pub fn starting_mrr_by_account(account_months: &[AccountMonthRecord]) -> HashMap<&str, f64> {
    let mut first: HashMap<&str, (YearMonth, f64)> = HashMap::new();
    for rec in account_months {
        first
            .entry(rec.account_id.as_str())
            .and_modify(|cur| {
                if rec.month < cur.0 {
                    *cur = (rec.month, rec.mrr_amount);
                }
            })
            .or_insert((rec.month, rec.mrr_amount));
    }
    first.into_iter().map(|(id, (_, mrr))| (id, mrr)).collect()
}

/// Signup month per account. Accounts without an id or a parseable signup
/// date are left out; a duplicated id keeps its first row.
pub fn signup_months(accounts: &[Account]) -> BTreeMap<AccountId, YearMonth> {
    let mut out = BTreeMap::new();
    for acct in accounts {
        if let (Some(id), Some(date)) = (&acct.account_id, acct.signup_date) {
            out.entry(id.clone()).or_insert_with(|| YearMonth::from_date(date));
        }
    }
    out
}

pub fn acquisition_output(
    accounts: &[Account],
    account_months: &[AccountMonthRecord],
) -> AcquisitionOutput {
    let signups = signup_months(accounts);
    let starting = starting_mrr_by_account(account_months);

    // Referral source of the first row per account, matching `signup_months`.
    let mut referral: HashMap<&str, Option<&str>> = HashMap::new();
    for acct in accounts {
        if let (Some(id), Some(_)) = (&acct.account_id, acct.signup_date) {
            referral
                .entry(id.as_str())
                .or_insert(acct.referral_source.as_deref());
        }
    }

    let mut cohorts: BTreeMap<YearMonth, BTreeSet<&str>> = BTreeMap::new();
    for (id, month) in &signups {
        cohorts.entry(*month).or_default().insert(id.as_str());
    }

    let mut out = AcquisitionOutput::default();

    for (month, ids) in &cohorts {
        out.new_accounts.push(NewAccountsRow { month: *month, new_accounts: ids.len() });

        let mut mix: BTreeMap<&str, usize> = BTreeMap::new();
        for id in ids {
            if let Some(Some(source)) = referral.get(id) {
                *mix.entry(*source).or_insert(0) += 1;
            }
        }
        let mut mix: Vec<(&str, usize)> = mix.into_iter().collect();
        mix.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        out.referral_mix.extend(mix.into_iter().map(|(source, n)| ReferralMixRow {
            month:           *month,
            referral_source: source.to_string(),
            new_accounts:    n,
        }));

        let values: Vec<f64> = ids.iter().filter_map(|id| starting.get(id).copied()).collect();
        let missing = ids.len() - values.len();
        out.starting_mrr.push(StartingMrrRow {
            month:                    *month,
            avg_starting_mrr:         stats::mean(&values),
            median_starting_mrr:      stats::median(&values),
            pct_missing_starting_mrr: missing as f64 / ids.len() as f64,
        });
    }

    log::debug!(
        "acquisition: {} signup months, {} accounts",
        out.new_accounts.len(),
        signups.len(),
    );

    out
}
