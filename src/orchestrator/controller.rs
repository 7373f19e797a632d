//! Job lifecycle controller.
//!
//! Owns the current job, replaces it on re-submission and emits events for
//! presentation layers.

use crate::api::JobApi;
use crate::engine::{emit_state, EngineControl, JobEngine};
use crate::error::JobError;
use crate::model::{AnalysisForm, InfoEvent, JobEvent, JobOutcome, JobState, RunConfig};
use crate::storage::RecentJobStore;
use crate::validate::build_request;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

/// Commands emitted by the CLI layer to drive the controller.
#[derive(Debug)]
pub(crate) enum UiCommand {
    Submit {
        form: Box<AnalysisForm>,
        reply: oneshot::Sender<Result<(), JobError>>,
    },
    Cancel,
    Quit,
}

/// Internal handle for a running job task.
struct RunCtx {
    ctrl_tx: UnboundedSender<EngineControl>,
    handle: Option<tokio::task::JoinHandle<Result<JobOutcome, JobError>>>,
}

fn flatten_join(
    res: Result<Result<JobOutcome, JobError>, tokio::task::JoinError>,
) -> Result<JobOutcome, JobError> {
    match res {
        Ok(r) => r,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => Err(JobError::Cancelled),
    }
}

/// At most one job is active per controller.
pub struct JobController {
    api: Arc<dyn JobApi>,
    cfg: RunConfig,
    store: Option<RecentJobStore>,
    event_tx: UnboundedSender<JobEvent>,
    active: Option<RunCtx>,
}

impl JobController {
    pub fn new(
        api: Arc<dyn JobApi>,
        cfg: RunConfig,
        store: Option<RecentJobStore>,
        event_tx: UnboundedSender<JobEvent>,
    ) -> Self {
        emit_state(&event_tx, JobState::Idle);
        Self {
            api,
            cfg,
            store,
            event_tx,
            active: None,
        }
    }

    /// Most recently submitted job id, if one was persisted.
    pub fn recent_job_id(&self) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.load() {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "could not read recent job id");
                None
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .and_then(|c| c.handle.as_ref())
            .is_some_and(|h| !h.is_finished())
    }

    /// Validate `form` and start tracking it as the current job.
    ///
    /// Invalid input is returned immediately and leaves any active job alone.
    /// Otherwise the active job, if any, is stopped and joined before the new
    /// submission is spawned.
    pub async fn submit(&mut self, form: &AnalysisForm) -> Result<(), JobError> {
        let request = build_request(form, self.recent_job_id())?;

        if self.cancel().await {
            tracing::info!("previous job superseded by new submission");
        }

        let (ctrl_tx, ctrl_rx) = tokio::sync::mpsc::unbounded_channel::<EngineControl>();
        let store = self.store.clone().filter(|_| self.cfg.remember_job);
        let engine = JobEngine::new(self.cfg.clone(), request, store);
        let api = self.api.clone();
        let event_tx = self.event_tx.clone();
        let handle = tokio::spawn(async move { engine.run(api, event_tx, ctrl_rx).await });
        self.active = Some(RunCtx {
            ctrl_tx,
            handle: Some(handle),
        });
        Ok(())
    }

    /// Stop the active job and wait for its task to end.
    ///
    /// Returns `false` when nothing was running.
    pub async fn cancel(&mut self) -> bool {
        let Some(mut ctx) = self.active.take() else {
            return false;
        };
        let Some(handle) = ctx.handle.take() else {
            return false;
        };
        if handle.is_finished() {
            return false;
        }
        let _ = ctx.ctrl_tx.send(EngineControl::Cancel);
        handle.abort();
        // Joining guarantees no request of the old job is still in flight.
        let _ = handle.await;
        let _ = self
            .event_tx
            .send(JobEvent::Info(InfoEvent::Cancelled { job_id: None }));
        emit_state(&self.event_tx, JobState::Idle);
        true
    }

    /// Wait for the active job to reach a terminal state.
    ///
    /// Cancel-safe: if the returned future is dropped, the job keeps running.
    pub async fn wait(&mut self) -> Option<Result<JobOutcome, JobError>> {
        let handle = self.active.as_mut()?.handle.as_mut()?;
        let res = handle.await;
        self.active = None;
        Some(flatten_join(res))
    }
}

/// Drive a controller from UI commands until `Quit` or the command channel closes.
pub(crate) async fn run_controller(
    mut controller: JobController,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Submit { form, reply }) => {
                        let res = controller.submit(&form).await;
                        if let Err(e) = &res {
                            tracing::info!(error = %e, "submission rejected");
                        }
                        let _ = reply.send(res);
                    }
                    Some(UiCommand::Cancel) => {
                        controller.cancel().await;
                    }
                    Some(UiCommand::Quit) | None => {
                        if controller.is_active() {
                            tracing::info!("stopping active job before exit");
                        }
                        controller.cancel().await;
                        break Ok(());
                    }
                }
            }
            // The handle stays in the controller until this branch wins, so a
            // command arriving first never loses the running job.
            done = async {
                match controller.wait().await {
                    Some(res) => res,
                    None => futures::future::pending().await,
                }
            } => {
                match done {
                    Ok(outcome) => tracing::debug!(job_id = %outcome.job_id, "job finished"),
                    Err(JobError::Cancelled) => tracing::debug!("job cancelled"),
                    Err(e) => tracing::debug!(error = %e, "job ended with error"),
                }
            }
        }
    }
}
