mod poll;

use crate::api::JobApi;
use crate::error::{ApiError, JobError};
use crate::model::{AnalysisRequest, InfoEvent, JobEvent, JobOutcome, JobState, RunConfig};
use crate::storage::RecentJobStore;
use poll::{poll_until_terminal, PollOutcome, PollParams};
use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum EngineControl {
    /// Stop tracking the job at the next suspension point
    Cancel,
}

/// Aborts the wrapped task when dropped, including when the engine future
/// itself is aborted mid-flight.
struct AbortOnDrop(tokio::task::JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub(crate) fn emit_state(event_tx: &mpsc::UnboundedSender<JobEvent>, state: JobState) {
    tracing::debug!(state = state.name(), "job state");
    let _ = event_tx.send(JobEvent::StateChanged { state });
}

pub(crate) async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ApiError::Timeout(limit))?
}

/// Runs one analysis job from submission to a terminal state.
pub struct JobEngine {
    cfg: RunConfig,
    request: AnalysisRequest,
    store: Option<RecentJobStore>,
}

impl JobEngine {
    pub fn new(cfg: RunConfig, request: AnalysisRequest, store: Option<RecentJobStore>) -> Self {
        Self {
            cfg,
            request,
            store,
        }
    }

    pub async fn run(
        self,
        api: Arc<dyn JobApi>,
        event_tx: mpsc::UnboundedSender<JobEvent>,
        mut control_rx: mpsc::UnboundedReceiver<EngineControl>,
    ) -> Result<JobOutcome, JobError> {
        let cancel = Arc::new(AtomicBool::new(false));

        let cancel2 = cancel.clone();
        let _control = AbortOnDrop(tokio::spawn(async move {
            while let Some(msg) = control_rx.recv().await {
                match msg {
                    EngineControl::Cancel => {
                        cancel2.store(true, Ordering::Relaxed);
                        break;
                    }
                }
            }
        }));

        emit_state(&event_tx, JobState::Submitting);
        tracing::info!(
            method = %self.request.search_method,
            target = %self.request.url,
            "submitting analysis job"
        );

        let submitted = with_timeout(self.cfg.request_timeout, api.submit_job(&self.request)).await;
        let job_id = match submitted {
            Ok(resp) => resp.job_id.filter(|id| !id.trim().is_empty()),
            Err(e) => {
                let err = match e {
                    ApiError::Decode(inner) => {
                        JobError::Protocol(format!("unreadable submit response: {inner}"))
                    }
                    other => JobError::Submission(other),
                };
                emit_state(
                    &event_tx,
                    JobState::Failed {
                        job_id: None,
                        reason: err.to_string(),
                    },
                );
                return Err(err);
            }
        };
        let Some(job_id) = job_id else {
            let err = JobError::Protocol("missing job id".into());
            emit_state(
                &event_tx,
                JobState::Failed {
                    job_id: None,
                    reason: err.to_string(),
                },
            );
            return Err(err);
        };

        tracing::info!(%job_id, "job accepted");
        let _ = event_tx.send(JobEvent::Info(InfoEvent::JobAccepted {
            job_id: job_id.clone(),
        }));
        if let Some(store) = self.store.as_ref() {
            if let Err(e) = store.save(&job_id) {
                tracing::warn!(%job_id, error = %format!("{e:#}"), "could not persist recent job id");
                let _ = event_tx.send(JobEvent::Info(InfoEvent::RecentJobNotSaved {
                    error: format!("{e:#}"),
                }));
            }
        }

        if cancel.load(Ordering::Relaxed) {
            let _ = event_tx.send(JobEvent::Info(InfoEvent::Cancelled {
                job_id: Some(job_id),
            }));
            return Err(JobError::Cancelled);
        }

        emit_state(
            &event_tx,
            JobState::Polling {
                job_id: job_id.clone(),
                progress: 0,
                message: String::new(),
            },
        );

        let outcome = poll_until_terminal(PollParams {
            api: api.as_ref(),
            job_id: &job_id,
            interval: self.cfg.poll_interval,
            max_interval: self.cfg.max_poll_interval,
            request_timeout: self.cfg.request_timeout,
            deadline: self.cfg.deadline,
            event_tx: &event_tx,
            cancel: cancel.clone(),
        })
        .await;

        match outcome {
            PollOutcome::Completed => {}
            PollOutcome::Failed(message) => {
                tracing::info!(%job_id, %message, "job failed");
                emit_state(
                    &event_tx,
                    JobState::Failed {
                        job_id: Some(job_id),
                        reason: message.clone(),
                    },
                );
                return Err(JobError::JobFailed(message));
            }
            PollOutcome::TimedOut => {
                let err = JobError::Timeout(self.cfg.deadline);
                tracing::warn!(%job_id, "job did not finish before the deadline");
                emit_state(
                    &event_tx,
                    JobState::Failed {
                        job_id: Some(job_id),
                        reason: err.to_string(),
                    },
                );
                return Err(err);
            }
            PollOutcome::Cancelled => {
                let _ = event_tx.send(JobEvent::Info(InfoEvent::Cancelled {
                    job_id: Some(job_id),
                }));
                return Err(JobError::Cancelled);
            }
        }

        emit_state(
            &event_tx,
            JobState::FetchingResult {
                job_id: job_id.clone(),
            },
        );

        // The job itself succeeded; a failed results request only degrades the summary.
        let (counts, result_error) =
            match with_timeout(self.cfg.request_timeout, api.job_results(&job_id)).await {
                Ok(payload) => (payload.counts(), None),
                Err(e) => {
                    let error = JobError::ResultFetch(e).to_string();
                    tracing::warn!(%job_id, %error, "reporting completion without counts");
                    let _ = event_tx.send(JobEvent::Info(InfoEvent::ResultFetchFailed {
                        error: error.clone(),
                    }));
                    (Default::default(), Some(error))
                }
            };

        let outcome = JobOutcome {
            job_id,
            counts,
            result_error,
            finished_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
        };
        tracing::info!(job_id = %outcome.job_id, total = outcome.counts.total, "job completed");
        emit_state(
            &event_tx,
            JobState::Completed {
                outcome: outcome.clone(),
            },
        );
        Ok(outcome)
    }
}
