//! Driver comparison — acquisition, retention and pricing contributions,
//! scored two ways.
//!
//! Signed contributions (per month):
//!   acquisition = Δ new accounts × average starting MRR of the new accounts
//!   retention   = churned + contraction − expansion   (positive = drag)
//!   pricing     = Δ ARPA × active accounts            (negative = compression)
//!
//! Lever view ranks absolute magnitude. Pressure view ranks one-sided drag
//! only: a tailwind scores zero pressure, never negative.

use crate::{
    acquisition::AcquisitionOutput,
    aggregate::MonthlyAggregate,
    cohort::CohortOutput,
    stats,
    types::{Driver, YearMonth},
};

/// Trailing window for both rolling views.
pub const ROLLING_WINDOW: usize = 3;

/// One optional value per driver.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriverScores {
    pub acquisition: Option<f64>,
    pub retention:   Option<f64>,
    pub pricing:     Option<f64>,
}

impl DriverScores {
    pub fn get(&self, driver: Driver) -> Option<f64> {
        match driver {
            Driver::Acquisition => self.acquisition,
            Driver::Retention   => self.retention,
            Driver::Pricing     => self.pricing,
        }
    }

    fn map(&self, f: impl Fn(Driver, f64) -> f64) -> Self {
        Self {
            acquisition: self.acquisition.map(|v| f(Driver::Acquisition, v)),
            retention:   self.retention.map(|v| f(Driver::Retention, v)),
            pricing:     self.pricing.map(|v| f(Driver::Pricing, v)),
        }
    }

    /// Largest score. `None` unless all three are defined; ties go to the
    /// driver declared first in `Driver::ALL`.
    pub fn leader(&self) -> Option<Driver> {
        let mut best: Option<(Driver, f64)> = None;
        for driver in Driver::ALL {
            let value = self.get(driver)?;
            if best.map_or(true, |(_, top)| value > top) {
                best = Some((driver, value));
            }
        }
        best.map(|(driver, _)| driver)
    }
}

/// Directional drag of a signed contribution.
pub fn pressure(driver: Driver, contribution: f64) -> f64 {
    let drag = match driver {
        Driver::Retention => contribution,
        Driver::Acquisition | Driver::Pricing => -contribution,
    };
    if drag > 0.0 { drag } else { 0.0 }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverComparisonRow {
    pub month:              YearMonth,
    pub net_revenue:        f64,
    pub mom_growth:         Option<f64>,
    pub yoy_growth:         Option<f64>,
    pub new_accounts:       f64,
    pub avg_starting_mrr:   f64,
    pub contribution:       DriverScores,
    pub magnitude:          DriverScores,
    pub magnitude_3m:       DriverScores,
    pub leader_lever_3m:    Option<Driver>,
    pub pressure:           DriverScores,
    pub pressure_3m:        DriverScores,
    pub leader_pressure_3m: Option<Driver>,
}

/// Merge the monthly series and score every month.
///
/// The timeline is the monthly aggregate. Months without new accounts,
/// starting MRR or a bridge row read those inputs as zero, and so does the
/// month before the first. Every contribution is defined, so both leaders
/// exist from the third month on.
pub fn compare_drivers(
    monthly: &[MonthlyAggregate],
    acquisition: &AcquisitionOutput,
    cohort: &CohortOutput,
) -> Vec<DriverComparisonRow> {
    let new_accounts: Vec<f64> = monthly
        .iter()
        .map(|m| acquisition.new_accounts_in(m.month).unwrap_or(0) as f64)
        .collect();
    let avg_starting: Vec<f64> = monthly
        .iter()
        .map(|m| acquisition.avg_starting_mrr_in(m.month).unwrap_or(0.0))
        .collect();

    let contributions: Vec<DriverScores> = monthly
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let retention = cohort
                .bridge_for(m.month)
                .map(|b| b.churned_mrr + b.contraction_mrr - b.expansion_mrr)
                .unwrap_or(0.0);
            // The month before the first reads as zero.
            let (prior_new, prior_arpa) = match i.checked_sub(1) {
                Some(p) => (new_accounts[p], monthly[p].arpa),
                None => (0.0, 0.0),
            };
            DriverScores {
                acquisition: Some((new_accounts[i] - prior_new) * avg_starting[i]),
                retention:   Some(retention),
                pricing:     Some((m.arpa - prior_arpa) * m.active_accounts as f64),
            }
        })
        .collect();

    let magnitude: Vec<DriverScores> =
        contributions.iter().map(|c| c.map(|_, v| v.abs())).collect();
    let pressures: Vec<DriverScores> =
        contributions.iter().map(|c| c.map(pressure)).collect();

    let magnitude_3m = rolling(&magnitude);
    let pressure_3m = rolling(&pressures);

    monthly
        .iter()
        .enumerate()
        .map(|(i, m)| DriverComparisonRow {
            month:              m.month,
            net_revenue:        m.net_revenue,
            mom_growth:         m.mom_growth,
            yoy_growth:         m.yoy_growth,
            new_accounts:       new_accounts[i],
            avg_starting_mrr:   avg_starting[i],
            contribution:       contributions[i],
            magnitude:          magnitude[i],
            magnitude_3m:       magnitude_3m[i],
            leader_lever_3m:    magnitude_3m[i].leader(),
            pressure:           pressures[i],
            pressure_3m:        pressure_3m[i],
            leader_pressure_3m: pressure_3m[i].leader(),
        })
        .collect()
}

fn rolling(series: &[DriverScores]) -> Vec<DriverScores> {
    let column = |driver: Driver| {
        let values: Vec<Option<f64>> = series.iter().map(|s| s.get(driver)).collect();
        stats::rolling_sum(&values, ROLLING_WINDOW)
    };
    let (acq, ret, prc) = (
        column(Driver::Acquisition),
        column(Driver::Retention),
        column(Driver::Pricing),
    );
    (0..series.len())
        .map(|i| DriverScores { acquisition: acq[i], retention: ret[i], pricing: prc[i] })
        .collect()
}
