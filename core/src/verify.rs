//! Output verification — lightweight structural checks on a finished run.
//!
//! Not a test suite. Confirms that the expected files exist and are
//! non-empty, and that the driver comparison carries the columns the report
//! depends on with no missing months.

use crate::{
    artifacts::{DRIVER_COMPARISON, DRIVER_COMPARISON_REQUIRED, EXPECTED_ARTIFACTS},
    error::{PipelineError, PipelineResult},
};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationSummary {
    pub files_checked: usize,
    pub driver_months: usize,
}

pub fn verify_outputs(
    processed_dir: impl AsRef<Path>,
    report_path: impl AsRef<Path>,
) -> PipelineResult<VerificationSummary> {
    let processed_dir = processed_dir.as_ref();

    must_exist(report_path.as_ref())?;
    for name in EXPECTED_ARTIFACTS {
        must_exist(&processed_dir.join(name))?;
    }

    let driver_months = check_driver_comparison(&processed_dir.join(DRIVER_COMPARISON))?;

    log::info!(
        "verify: {} files present, driver comparison has {driver_months} months",
        EXPECTED_ARTIFACTS.len() + 1,
    );

    Ok(VerificationSummary {
        files_checked: EXPECTED_ARTIFACTS.len() + 1,
        driver_months,
    })
}

fn must_exist(path: &Path) -> PipelineResult<()> {
    let meta = std::fs::metadata(path).map_err(|_| {
        PipelineError::Verification(format!("Missing expected file: {}", path.display()))
    })?;
    if meta.is_file() && meta.len() == 0 {
        return Err(PipelineError::Verification(format!(
            "Expected non-empty file: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Returns the number of data rows.
pub fn check_driver_comparison(path: &Path) -> PipelineResult<usize> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();

    let missing: Vec<&str> = DRIVER_COMPARISON_REQUIRED
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::Verification(format!(
            "{DRIVER_COMPARISON} missing columns: {missing:?}"
        )));
    }

    let month_idx = headers.iter().position(|h| h == "month").unwrap_or_default();
    let mut rows = 0usize;
    for record in rdr.records() {
        let record = record?;
        if record.get(month_idx).map_or(true, |m| m.trim().is_empty()) {
            return Err(PipelineError::Verification(format!(
                "{DRIVER_COMPARISON} has null month values"
            )));
        }
        rows += 1;
    }
    Ok(rows)
}
