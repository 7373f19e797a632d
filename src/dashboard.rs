//! Dashboard view and CSV export for a finished job.

use crate::api::SentimentClient;
use crate::orchestrator::{default_export_name, write_file};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeBand {
    Good,
    Fair,
    Poor,
}

impl GaugeBand {
    pub fn from_percentage(pct: f64) -> Self {
        if pct >= 70.0 {
            GaugeBand::Good
        } else if pct >= 50.0 {
            GaugeBand::Fair
        } else {
            GaugeBand::Poor
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GaugeBand::Good => "good",
            GaugeBand::Fair => "fair",
            GaugeBand::Poor => "poor",
        }
    }
}

/// Labels for a trend series: `T1`, `T2`, ...
pub fn trend_labels(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("T{i}")).collect()
}

/// Download the CSV export to `path`, or to `dashboard_export_<job>.csv` in the
/// current directory.
pub async fn export_csv(
    client: &SentimentClient,
    job_id: &str,
    path: Option<&Path>,
) -> Result<PathBuf> {
    let body = client
        .dashboard_export(job_id)
        .await
        .with_context(|| format!("export dashboard for job {job_id}"))?;
    let target = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(default_export_name(job_id)));
    write_file(&target, &body)
}
