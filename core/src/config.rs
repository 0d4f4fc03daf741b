use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File names of the three raw source tables, relative to `raw_dir`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputFiles {
    pub accounts:      String,
    pub subscriptions: String,
    pub churn_events:  String,
}

impl Default for InputFiles {
    fn default() -> Self {
        Self {
            accounts:      "ravenstack_accounts.csv".into(),
            subscriptions: "ravenstack_subscriptions.csv".into(),
            churn_events:  "ravenstack_churn_events.csv".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the raw source CSVs.
    pub raw_dir: String,
    /// Where derived tables are written. `None` keeps everything in memory.
    pub processed_dir: Option<String>,
    /// Markdown recommendation report. `None` skips the report.
    pub report_path: Option<String>,
    pub inputs: InputFiles,
    /// Consecutive months a pressure leader must hold before it is
    /// recommended as the single driver.
    pub streak_threshold: usize,
    /// Months shown in the report's evidence table.
    pub evidence_months: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir:          "data/raw/ravenstack".into(),
            processed_dir:    Some("data/processed".into()),
            report_path:      Some("analysis_recommendation.md".into()),
            inputs:           InputFiles::default(),
            streak_threshold: 3,
            evidence_months:  6,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file. Missing keys fall back to the defaults.
    /// In tests, use PipelineConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        if config.streak_threshold == 0 {
            anyhow::bail!("{path}: streak_threshold must be at least 1");
        }
        Ok(config)
    }

    /// In-memory config: no artifacts, no report.
    pub fn default_test() -> Self {
        Self {
            raw_dir:       String::new(),
            processed_dir: None,
            report_path:   None,
            ..Self::default()
        }
    }

    pub fn accounts_path(&self) -> PathBuf {
        Path::new(&self.raw_dir).join(&self.inputs.accounts)
    }

    pub fn subscriptions_path(&self) -> PathBuf {
        Path::new(&self.raw_dir).join(&self.inputs.subscriptions)
    }

    pub fn churn_events_path(&self) -> PathBuf {
        Path::new(&self.raw_dir).join(&self.inputs.churn_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "raw_dir": "fixtures/raw", "streak_threshold": 4 }}"#).unwrap();

        let config = PipelineConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.raw_dir, "fixtures/raw");
        assert_eq!(config.streak_threshold, 4);
        assert_eq!(config.evidence_months, 6);
        assert_eq!(config.inputs, InputFiles::default());
        assert!(config.accounts_path().ends_with("ravenstack_accounts.csv"));
    }

    #[test]
    fn zero_streak_threshold_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "streak_threshold": 0 }}"#).unwrap();
        assert!(PipelineConfig::load(file.path().to_str().unwrap()).is_err());
    }
}
