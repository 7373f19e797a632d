//! Post-completion processing.
//!
//! Handles report download and builds the messages shown after a job completes.

use crate::api::SentimentClient;
use crate::model::JobOutcome;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Result of post-completion processing, ready for presentation layers.
pub(crate) struct ProcessedJob {
    pub report_path: Option<PathBuf>,
    pub messages: Vec<String>,
}

/// Default file name for a job's PDF report.
pub(crate) fn default_report_name(job_id: &str) -> String {
    format!("sentiment_report_{}.pdf", sanitize(job_id))
}

/// Default file name for a job's dashboard CSV export.
pub(crate) fn default_export_name(job_id: &str) -> String {
    format!("dashboard_export_{}.csv", sanitize(job_id))
}

fn sanitize(job_id: &str) -> String {
    job_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Download the PDF report for `job_id` to `path`.
pub(crate) async fn download_report(
    client: &SentimentClient,
    job_id: &str,
    path: &Path,
) -> Result<PathBuf> {
    let body = client
        .report_pdf(job_id)
        .await
        .with_context(|| format!("download report for job {job_id}"))?;
    write_file(path, &body)
}

/// Write a downloaded body and return the absolute path written.
pub(crate) fn write_file(path: &Path, body: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    std::fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("get current directory")?
            .join(path)
    };
    Ok(abs)
}

/// Process a completed job: fetch the report if one was requested.
pub(crate) async fn process_job_completion(
    client: &SentimentClient,
    report: Option<&Path>,
    outcome: &JobOutcome,
) -> ProcessedJob {
    let mut messages = Vec::new();
    if let Some(err) = outcome.result_error.as_deref() {
        messages.push(format!("Summary unavailable: {err}"));
    }

    let report_path = match report {
        Some(path) => match download_report(client, &outcome.job_id, path).await {
            Ok(p) => {
                messages.push(format!("Saved report: {}", p.display()));
                Some(p)
            }
            Err(e) => {
                messages.push(format!("Report download failed: {e:#}"));
                None
            }
        },
        None => None,
    };

    ProcessedJob {
        report_path,
        messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RunConfig, SentimentCounts};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn default_names_are_filesystem_safe() {
        assert_eq!(default_report_name("a1-b2"), "sentiment_report_a1-b2.pdf");
        assert_eq!(default_export_name("x/../y"), "dashboard_export_x____y.csv");
    }

    #[tokio::test]
    async fn completion_downloads_requested_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/results/done-1/pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
            .mount(&server)
            .await;
        let client = SentimentClient::new(&RunConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out").join("report.pdf");
        let outcome = JobOutcome {
            job_id: "done-1".into(),
            counts: SentimentCounts::default(),
            result_error: Some("could not load results: boom".into()),
            finished_utc: "2024-01-01T00:00:00Z".into(),
        };

        let processed = process_job_completion(&client, Some(&target), &outcome).await;
        assert_eq!(processed.report_path.as_deref(), Some(target.as_path()));
        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF");
        assert_eq!(processed.messages.len(), 2);
        assert!(processed.messages[0].starts_with("Summary unavailable"));
    }

    #[tokio::test]
    async fn failed_report_download_is_reported_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/results/gone/pdf"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let client = SentimentClient::new(&RunConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let outcome = JobOutcome {
            job_id: "gone".into(),
            counts: SentimentCounts::default(),
            result_error: None,
            finished_utc: String::new(),
        };

        let processed =
            process_job_completion(&client, Some(&dir.path().join("r.pdf")), &outcome).await;
        assert!(processed.report_path.is_none());
        assert!(processed.messages[0].starts_with("Report download failed"));
    }
}
