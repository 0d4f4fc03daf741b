//! Markdown recommendation report.

use crate::{
    drivers::DriverComparisonRow,
    error::PipelineResult,
    recommendation::{Recommendation, RecommendationMode},
    types::Driver,
};
use std::fmt::Write as _;
use std::path::Path;

const EVIDENCE_COLUMNS: &[&str] = &[
    "month",
    "net_revenue",
    "mom_growth",
    "yoy_growth",
    "leader_lever_3m",
    "leader_pressure_3m",
    "acq_abs_3m",
    "ret_abs_3m",
    "prc_abs_3m",
    "acq_pressure_3m",
    "ret_pressure_3m",
    "prc_pressure_3m",
];

pub fn render_report(
    rows: &[DriverComparisonRow],
    rec: &Recommendation,
    evidence_months: usize,
) -> String {
    let mut md = String::new();
    let mut line = |s: &str| {
        md.push_str(s);
        md.push('\n');
    };

    line("# Revenue Driver Recommendation");
    line("");
    line("## Recommendation");
    match (rec.mode, rec.driver) {
        (RecommendationMode::SingleDriver, Some(driver)) => line(&format!(
            "Primary conclusion (based on rolling 3-month pressure with >={}-month consistency): \
             **{driver}** is the leading structural drag in the latest window.",
            rec.streak_threshold
        )),
        _ => line(
            "No single driver meets the explicit consistency rule in the latest window. \
             Treat this as a mixed-signal period and use the pressure view to prioritize near-term action.",
        ),
    }

    line("");
    line("## What this means");
    match (rec.mode, rec.driver) {
        (RecommendationMode::SingleDriver, Some(Driver::Pricing)) => {
            line("Prioritize a packaging and pricing intervention this quarter.");
            line("Focus on plan tier mix, seat contraction, and ARPA drift as the measurable levers.");
        }
        (RecommendationMode::SingleDriver, Some(Driver::Retention)) => {
            line("Prioritize retention and expansion initiatives this quarter.");
            line("Focus on churn, contraction, and expansion dynamics as the measurable levers.");
        }
        (RecommendationMode::SingleDriver, Some(Driver::Acquisition)) => {
            line("Prioritize acquisition output improvements this quarter.");
            line("Focus on new account volume, referral source mix, and starting MRR for new accounts.");
        }
        _ => {
            line(&format!(
                "Largest lever by magnitude (latest window): **{}**.",
                label(rec.lever_leader)
            ));
            line(&format!(
                "Largest drag by directional pressure (latest window): **{}** (streak: {} months).",
                label(rec.pressure_leader),
                rec.pressure_streak
            ));
            line(
                "If you must pick one primary initiative under a hard constraint, prioritize the drag leader; \
                 use the lever leader as a secondary monitoring lens.",
            );
        }
    }

    line("");
    line(&format!("## Evidence snapshot (last {evidence_months} months)"));
    line("");
    let start = rows.len().saturating_sub(evidence_months);
    line(&evidence_table(&rows[start..]));

    line("");
    line("## Interpretation and guardrails");
    line("- Two views are provided: **lever** (largest magnitude movement) and **pressure** (largest directional drag/headwind).");
    line("- Pressure is computed as headwind-only: acquisition (only negative contribution), pricing (only ARPA compression), retention (churn+contraction drag).");
    line(&format!(
        "- The explicit dominance rule requires >={} consecutive months of the same pressure leader; \
         otherwise the window is treated as mixed-signal.",
        rec.streak_threshold
    ));

    line("");
    line("## Risks and limitations");
    line("- CAC and conversion are not available, so acquisition is evaluated via output and value proxies.");
    line("- Discount percentage is not available, so pricing is evaluated via ARPA drift, plan tier migration, and seat changes.");
    line("- No cost data is available, so margin is not modeled.");
    line("- Expansion and contraction are inferred from account-month MRR deltas; validate with billing event logic in a real system.");
    line("- A subscription counts its full MRR in its first and last month; partial months are not pro-rated.");

    md
}

pub fn write_report(
    path: impl AsRef<Path>,
    rows: &[DriverComparisonRow],
    rec: &Recommendation,
    evidence_months: usize,
) -> PipelineResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_report(rows, rec, evidence_months))?;
    log::info!("report: wrote {}", path.display());
    Ok(())
}

fn label(driver: Option<Driver>) -> &'static str {
    driver.map(|d| d.as_str()).unwrap_or("none")
}

fn money(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.2}")).unwrap_or_default()
}

fn percent(v: Option<f64>) -> String {
    v.map(|v| format!("{:.2}%", v * 100.0)).unwrap_or_default()
}

fn evidence_table(rows: &[DriverComparisonRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "| {} |", EVIDENCE_COLUMNS.join(" | "));
    let _ = writeln!(
        out,
        "|{}|",
        EVIDENCE_COLUMNS.iter().map(|_| ":---").collect::<Vec<_>>().join("|")
    );
    for r in rows {
        let cells = [
            r.month.label(),
            money(Some(r.net_revenue)),
            percent(r.mom_growth),
            percent(r.yoy_growth),
            r.leader_lever_3m.map(|d| d.to_string()).unwrap_or_default(),
            r.leader_pressure_3m.map(|d| d.to_string()).unwrap_or_default(),
            money(r.magnitude_3m.acquisition),
            money(r.magnitude_3m.retention),
            money(r.magnitude_3m.pricing),
            money(r.pressure_3m.acquisition),
            money(r.pressure_3m.retention),
            money(r.pressure_3m.pricing),
        ];
        let _ = writeln!(out, "| {} |", cells.join(" | "));
    }
    out.trim_end().to_string()
}
