//! Text summary builders for CLI output.
//!
//! Each builder formats one response type into human-readable lines for text mode.

use crate::campaign::{self, ScoreBand};
use crate::dashboard::{trend_labels, GaugeBand};
use crate::metrics;
use crate::model::{
    CampaignResponse, DashboardData, JobOutcome, SentimentCounts, StatusResponse, VideoScript,
};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn or_na(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("N/A")
}

pub(crate) fn build_counts_summary(job_id: &str, c: &SentimentCounts) -> TextSummary {
    let mut lines = vec![format!("Job: {job_id}")];
    match metrics::sentiment_shares(c) {
        Some((pos, neg, neu)) => {
            lines.push(format!("Positive: {} ({pos}%)", c.positive));
            lines.push(format!("Negative: {} ({neg}%)", c.negative));
            lines.push(format!("Neutral:  {} ({neu}%)", c.neutral));
        }
        None => {
            lines.push(format!("Positive: {}", c.positive));
            lines.push(format!("Negative: {}", c.negative));
            lines.push(format!("Neutral:  {}", c.neutral));
        }
    }
    lines.push(format!("Total reviews: {}", c.total));
    TextSummary { lines }
}

pub(crate) fn build_outcome_summary(outcome: &JobOutcome) -> TextSummary {
    let mut summary = build_counts_summary(&outcome.job_id, &outcome.counts);
    summary
        .lines
        .push(format!("Finished: {}", outcome.finished_utc));
    summary
}

pub(crate) fn build_status_summary(job_id: &str, status: &StatusResponse) -> TextSummary {
    let status_str: String = status.status.clone().into();
    let mut line = format!(
        "Job {job_id}: {status_str} ({}%)",
        status.progress_percent()
    );
    if let Some(msg) = status.message.as_deref().filter(|m| !m.is_empty()) {
        line.push_str(&format!(" - {msg}"));
    }
    TextSummary { lines: vec![line] }
}

pub(crate) fn build_dashboard_summary(data: &DashboardData) -> TextSummary {
    let d = &data.sentiment_distribution;
    let mut lines = Vec::new();
    if let Some(id) = data.job_id.as_deref() {
        lines.push(format!("Dashboard for job {id}"));
    }
    lines.push(format!(
        "Distribution: positive {} / neutral {} / negative {}",
        d.positive, d.neutral, d.negative
    ));
    lines.push(format!(
        "Positive rate: {:.1}% ({})",
        data.positive_percentage,
        GaugeBand::from_percentage(data.positive_percentage).label()
    ));

    if !data.sentiment_trends.is_empty() {
        lines.push("Trend:".to_string());
        for (label, t) in trend_labels(data.sentiment_trends.len())
            .iter()
            .zip(&data.sentiment_trends)
        {
            lines.push(format!(
                "  {label}: +{:.0} ={:.0} -{:.0}",
                t.positive, t.neutral, t.negative
            ));
        }
    }

    if data.alerts.is_empty() {
        lines.push("No alerts".to_string());
    } else {
        lines.push("Alerts:".to_string());
        for a in &data.alerts {
            lines.push(format!("  [{}] {} {}", a.severity, a.message, a.timestamp)
                .trim_end()
                .to_string());
        }
    }
    if let Some(updated) = data.last_updated.as_deref() {
        lines.push(format!("Last updated: {updated}"));
    }
    TextSummary { lines }
}

pub(crate) fn build_campaign_summary(resp: &CampaignResponse) -> TextSummary {
    let mut lines = Vec::new();
    for (i, p) in resp.predictions.iter().enumerate() {
        lines.push(format!(
            "{}. {} [{:.1}/10, {}]",
            i + 1,
            p.text,
            p.score,
            ScoreBand::from_score(p.score).label()
        ));
        if !p.roi_projection.is_empty() {
            lines.push(format!("   ROI: {}", p.roi_projection));
        }
        if let Some(s) = p.sentiment_alignment.as_deref().filter(|s| !s.is_empty()) {
            lines.push(format!("   Sentiment: {s}"));
        }
        for r in &p.risks {
            lines.push(format!("   Risk: {r}"));
        }
        if let Some(r) = p.recommendation.as_deref().filter(|r| !r.is_empty()) {
            lines.push(format!("   Recommendation: {r}"));
        }
    }

    let scores = campaign::scores(&resp.predictions);
    if let Some((mean, median, p25, p75)) = metrics::compute_metrics(&scores) {
        lines.push(format!(
            "Scores: avg {mean:.1} med {median:.1} p25 {p25:.1} p75 {p75:.1}"
        ));
    }

    let best = &resp.best_variant;
    let position = campaign::best_index(resp)
        .map(|i| format!(" (#{})", i + 1))
        .unwrap_or_default();
    lines.push(format!(
        "Best variant{position}: \"{}\" score {:.1}/10, ROI {}",
        best.text,
        best.score,
        or_na(Some(best.roi_projection.as_str()))
    ));
    TextSummary { lines }
}

pub(crate) fn build_video_script_summary(script: &VideoScript) -> TextSummary {
    let mut lines = vec![format!("Hook: {}", or_na(script.hook.as_deref()))];

    lines.push("Key messages:".to_string());
    if script.key_messages.is_empty() {
        lines.push("  N/A".to_string());
    }
    lines.extend(script.key_messages.iter().map(|m| format!("  - {m}")));

    lines.push(format!(
        "Call to action: {}",
        or_na(script.call_to_action.as_deref())
    ));

    lines.push("Visual suggestions:".to_string());
    if script.visual_suggestions.is_empty() {
        lines.push("  N/A".to_string());
    }
    lines.extend(script.visual_suggestions.iter().map(|v| format!("  - {v}")));

    if let Some(p) = script.image_prompts.as_ref() {
        lines.push("Image prompts:".to_string());
        lines.push(format!("  Hook: {}", or_na(p.hook.as_deref())));
        lines.push(format!("  Key messages: {}", or_na(p.key_messages.as_deref())));
        lines.push(format!("  Call to action: {}", or_na(p.cta.as_deref())));
        lines.push(format!("  Visuals: {}", or_na(p.visuals.as_deref())));
    }
    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CampaignPrediction, ImagePrompts};
    use pretty_assertions::assert_eq;

    fn prediction(text: &str, score: f64) -> CampaignPrediction {
        CampaignPrediction {
            text: text.into(),
            score,
            roi_projection: "1.5x".into(),
            sentiment_alignment: None,
            business_rules_applied: vec![],
            risks: vec![],
            recommendation: None,
            reasoning: None,
        }
    }

    #[test]
    fn outcome_shows_percentages_only_with_a_total() {
        let mut outcome = JobOutcome {
            job_id: "j".into(),
            counts: SentimentCounts {
                positive: 3,
                negative: 1,
                neutral: 6,
                total: 10,
            },
            result_error: None,
            finished_utc: "t".into(),
        };
        let lines = build_outcome_summary(&outcome).lines;
        assert_eq!(lines[1], "Positive: 3 (30%)");
        assert_eq!(lines[3], "Neutral:  6 (60%)");

        outcome.counts = SentimentCounts::default();
        let lines = build_outcome_summary(&outcome).lines;
        assert_eq!(lines[1], "Positive: 0");
    }

    #[test]
    fn campaign_keeps_server_order_and_server_best() {
        let resp = CampaignResponse {
            predictions: vec![prediction("a", 4.0), prediction("b", 9.0)],
            best_variant: prediction("b", 9.0),
            total_analyzed: Some(2),
            analysis_method: None,
        };
        let lines = build_campaign_summary(&resp).lines;
        assert_eq!(lines[0], "1. a [4.0/10, weak]");
        assert_eq!(lines[2], "2. b [9.0/10, strong]");
        assert_eq!(lines[4], "Scores: avg 6.5 med 9.0 p25 4.0 p75 9.0");
        assert_eq!(
            lines.last().unwrap(),
            "Best variant (#2): \"b\" score 9.0/10, ROI 1.5x"
        );
    }

    #[test]
    fn video_script_fills_gaps_with_na() {
        let script = VideoScript {
            hook: None,
            key_messages: vec!["Over 80% positive".into()],
            call_to_action: Some("Book now".into()),
            visual_suggestions: vec![],
            image_prompts: Some(ImagePrompts {
                hook: Some("smiling guests".into()),
                ..Default::default()
            }),
        };
        let lines = build_video_script_summary(&script).lines;
        assert_eq!(lines[0], "Hook: N/A");
        assert_eq!(lines[2], "  - Over 80% positive");
        assert_eq!(lines[3], "Call to action: Book now");
        assert_eq!(lines[5], "  N/A");
        assert!(lines.contains(&"  Visuals: N/A".to_string()));
    }
}
