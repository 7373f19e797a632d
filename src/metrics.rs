use crate::model::SentimentCounts;

/// Share of `part` in `total` as a whole percent, rounded to nearest.
/// `None` when there is nothing to divide by.
pub fn share_percent(part: u64, total: u64) -> Option<u64> {
    if total == 0 {
        return None;
    }
    Some(((part as f64 / total as f64) * 100.0).round() as u64)
}

/// Positive, negative and neutral shares of a job's total.
pub fn sentiment_shares(counts: &SentimentCounts) -> Option<(u64, u64, u64)> {
    Some((
        share_percent(counts.positive, counts.total)?,
        share_percent(counts.negative, counts.total)?,
        share_percent(counts.neutral, counts.total)?,
    ))
}

/// Compute metrics (mean, median, 25th percentile, 75th percentile) from values
pub fn compute_metrics(values: &[f64]) -> Option<(f64, f64, f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let median = sorted[n / 2];
    let p25 = sorted[n / 4];
    let p75 = sorted[3 * n / 4];
    Some((mean, median, p25, p75))
}
