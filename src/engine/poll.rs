use super::{emit_state, with_timeout};
use crate::api::JobApi;
use crate::error::JobError;
use crate::model::{InfoEvent, JobEvent, JobState, JobStatus};
use rand::Rng;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Parameters for polling one job until it reaches a terminal status.
pub(crate) struct PollParams<'a> {
    pub api: &'a dyn JobApi,
    pub job_id: &'a str,
    pub interval: Duration,
    pub max_interval: Duration,
    pub request_timeout: Duration,
    pub deadline: Duration,
    pub event_tx: &'a mpsc::UnboundedSender<JobEvent>,
    pub cancel: Arc<AtomicBool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    Completed,
    Failed(String),
    Cancelled,
    TimedOut,
}

/// Delay before the next status request after `failures` consecutive errors.
///
/// Doubles per failure starting from `interval`, capped at `max_interval`.
pub(crate) fn backoff_delay(interval: Duration, max_interval: Duration, failures: u32) -> Duration {
    if failures == 0 {
        return interval;
    }
    let factor = 1u32.checked_shl(failures.min(16)).unwrap_or(u32::MAX);
    interval
        .checked_mul(factor)
        .unwrap_or(max_interval)
        .min(max_interval.max(interval))
}

fn jittered(delay: Duration, cap: Duration) -> Duration {
    let spread = (delay.as_millis() / 10) as u64;
    if spread == 0 {
        return delay;
    }
    let extra = rand::thread_rng().gen_range(0..=spread);
    (delay + Duration::from_millis(extra)).min(cap.max(delay))
}

/// Issue status requests on a fixed cadence until the job is terminal.
///
/// One request is in flight at a time, so responses are applied in issue order.
/// Transport failures never end the loop; they only stretch the next delay.
pub(crate) async fn poll_until_terminal(params: PollParams<'_>) -> PollOutcome {
    let PollParams {
        api,
        job_id,
        interval,
        max_interval,
        request_timeout,
        deadline,
        event_tx,
        cancel,
    } = params;
    let start = Instant::now();
    let mut failures = 0u32;
    let mut delay = interval;

    loop {
        let remaining = deadline.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            return PollOutcome::TimedOut;
        }
        tokio::time::sleep(delay.min(remaining)).await;

        if cancel.load(Ordering::Relaxed) {
            return PollOutcome::Cancelled;
        }
        if start.elapsed() >= deadline {
            return PollOutcome::TimedOut;
        }

        match with_timeout(request_timeout, api.job_status(job_id)).await {
            Ok(status) => {
                failures = 0;
                delay = interval;
                match &status.status {
                    JobStatus::Completed => return PollOutcome::Completed,
                    JobStatus::Failed => return PollOutcome::Failed(status.message_text()),
                    JobStatus::Pending | JobStatus::Running => {}
                    JobStatus::Unknown(other) => {
                        tracing::warn!(job_id, status = %other, "unknown job status, treating as in progress");
                        let _ = event_tx.send(JobEvent::Info(InfoEvent::UnknownStatus {
                            status: other.clone(),
                        }));
                    }
                }
                emit_state(
                    event_tx,
                    JobState::Polling {
                        job_id: job_id.to_string(),
                        progress: status.progress_percent(),
                        message: status.message_text(),
                    },
                );
            }
            Err(e) => {
                failures += 1;
                delay = jittered(backoff_delay(interval, max_interval, failures), max_interval);
                let error = JobError::Poll(e).to_string();
                tracing::warn!(job_id, attempt = failures, %error, "status request failed");
                let _ = event_tx.send(JobEvent::Info(InfoEvent::PollRetry {
                    attempt: failures,
                    error,
                    retry_in: delay,
                }));
            }
        }
    }
}
