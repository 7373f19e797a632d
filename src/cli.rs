use crate::api::{JobApi, SentimentClient};
use crate::model::{
    AnalysisForm, JobEvent, JobOutcome, JobState, Language, RunConfig, SearchMethod,
    VideoScriptRequest,
};
use crate::orchestrator::{
    default_report_name, download_report, process_job_completion, run_controller, JobController,
    UiCommand,
};
use crate::storage::RecentJobStore;
use crate::text_summary::{self, TextSummary};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "sentiment-job-cli",
    version,
    about = "Submit review sentiment analyses and follow them to completion"
)]
pub struct Cli {
    /// Base URL of the analysis service
    #[arg(
        long,
        global = true,
        env = "SENTIMENT_API_URL",
        default_value = "http://localhost:8001"
    )]
    pub base_url: String,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Timeout for each HTTP request
    #[arg(long, global = true, default_value = "15s")]
    pub request_timeout: humantime::Duration,

    /// File holding the most recent job id
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Submit an analysis and wait for it to finish
    Analyze(AnalyzeArgs),
    /// Show the current status of a job
    Status { job_id: Option<String> },
    /// Show the sentiment counts of a finished job
    Results { job_id: Option<String> },
    /// Download the PDF report of a finished job
    Report {
        job_id: Option<String>,
        /// Target file (default: sentiment_report_<job>.pdf)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Generate a short marketing video script from a job's results
    VideoScript {
        job_id: Option<String>,
        /// Target length in seconds
        #[arg(long, default_value_t = 30)]
        duration: u32,
        #[arg(long, value_enum, default_value = "en")]
        language: Language,
    },
    /// Score campaign variants against the latest results
    Predict {
        /// One variant; repeat for more
        #[arg(long = "variant")]
        variants: Vec<String>,
        /// File with one variant per line
        #[arg(long)]
        variants_file: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "en")]
        language: Language,
    },
    /// Ask a question about the results
    Chat {
        question: String,
        /// Job to ask about (default: most recent)
        #[arg(long)]
        job: Option<String>,
    },
    /// Show the dashboard of a job
    Dashboard {
        job_id: Option<String>,
        /// Also save the CSV export (default: dashboard_export_<job>.csv)
        #[arg(long, num_args = 0..=1)]
        export_csv: Option<Option<PathBuf>>,
    },
    /// Print or clear the most recent job id
    Recent {
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Debug, Args, Clone)]
pub struct AnalyzeArgs {
    /// Report recipients, comma separated
    #[arg(long)]
    pub email: String,

    /// How reviews are collected
    #[arg(long, value_enum)]
    pub method: Option<SearchMethod>,

    /// Listing URL (with --method url)
    #[arg(long)]
    pub url: Option<String>,

    /// Search keywords (with --method keywords)
    #[arg(long)]
    pub keywords: Option<String>,

    /// Extra instructions for the summary
    #[arg(long)]
    pub prompt: Option<String>,

    #[arg(long, value_enum, default_value = "en")]
    pub language: Language,

    /// Download the PDF report here once the job completes
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Delay between status checks
    #[arg(long, default_value = "2s")]
    pub poll_interval: humantime::Duration,

    /// Upper bound for the retry backoff
    #[arg(long, default_value = "30s")]
    pub max_poll_interval: humantime::Duration,

    /// Give up on the job after this long
    #[arg(long, default_value = "30m")]
    pub deadline: humantime::Duration,

    /// Use --remember-job true or --remember-job false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub remember_job: bool,
}

impl AnalyzeArgs {
    fn to_form(&self) -> AnalysisForm {
        AnalysisForm {
            email: self.email.clone(),
            search_method: self.method,
            url: self.url.clone(),
            keywords: self.keywords.clone(),
            custom_prompt: self.prompt.clone(),
            language: self.language,
        }
    }
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    let mut cfg = RunConfig {
        base_url: args.base_url.clone(),
        user_agent: format!("sentiment-job-cli/{}", env!("CARGO_PKG_VERSION")),
        request_timeout: Duration::from(args.request_timeout),
        ..RunConfig::default()
    };
    if let Command::Analyze(a) = &args.command {
        cfg.poll_interval = Duration::from(a.poll_interval);
        cfg.max_poll_interval = Duration::from(a.max_poll_interval);
        cfg.deadline = Duration::from(a.deadline);
        cfg.remember_job = a.remember_job;
    }
    cfg
}

/// Where command output goes.
struct Output {
    tx: mpsc::UnboundedSender<OutputLine>,
    json: bool,
}

impl Output {
    fn info(&self, msg: impl Into<String>) {
        let _ = self.tx.send(OutputLine::Stderr(msg.into()));
    }

    fn summary(&self, summary: TextSummary) {
        for line in summary.lines {
            let _ = self.tx.send(OutputLine::Stdout(line));
        }
    }

    fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let out = serde_json::to_string_pretty(value)?;
        let _ = self.tx.send(OutputLine::Stdout(out));
        Ok(())
    }
}

fn open_store(args: &Cli) -> Option<RecentJobStore> {
    if let Some(p) = args.state_file.as_ref() {
        return Some(RecentJobStore::new(p.clone()));
    }
    match RecentJobStore::open_default() {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "recent job id will not be remembered");
            None
        }
    }
}

fn recent_job(store: Option<&RecentJobStore>) -> Result<Option<String>> {
    match store {
        Some(s) => s.load(),
        None => Ok(None),
    }
}

/// The given job id, or the most recent one.
fn resolve_job_id(given: Option<&str>, store: Option<&RecentJobStore>) -> Result<String> {
    if let Some(id) = given.map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }
    recent_job(store)?
        .ok_or_else(|| anyhow!("no job id given and no recent job recorded; run `analyze` first"))
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let store = open_store(&args);
    let (tx, out_handle) = spawn_output_writer();
    let out = Output {
        tx,
        json: args.json,
    };

    let res = dispatch(&args, cfg, store, &out).await;

    drop(out);
    let _ = out_handle.await;
    res
}

async fn dispatch(
    args: &Cli,
    cfg: RunConfig,
    store: Option<RecentJobStore>,
    out: &Output,
) -> Result<()> {
    let client = SentimentClient::new(&cfg).context("invalid service configuration")?;
    let store_ref = store.as_ref();

    match &args.command {
        Command::Analyze(a) => run_analyze(a, cfg, client, store, out).await,
        Command::Status { job_id } => {
            let id = resolve_job_id(job_id.as_deref(), store_ref)?;
            let status = client
                .job_status(&id)
                .await
                .with_context(|| format!("status of job {id}"))?;
            if out.json {
                out.json(&status)
            } else {
                out.summary(text_summary::build_status_summary(&id, &status));
                Ok(())
            }
        }
        Command::Results { job_id } => {
            let id = resolve_job_id(job_id.as_deref(), store_ref)?;
            let counts = client
                .job_results(&id)
                .await
                .with_context(|| format!("results of job {id}"))?
                .counts();
            if out.json {
                out.json(&serde_json::json!({ "job_id": id, "counts": counts }))
            } else {
                out.summary(text_summary::build_counts_summary(&id, &counts));
                Ok(())
            }
        }
        Command::Report { job_id, output } => {
            let id = resolve_job_id(job_id.as_deref(), store_ref)?;
            let target = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(default_report_name(&id)));
            let path = download_report(&client, &id, &target).await?;
            if out.json {
                out.json(&serde_json::json!({ "job_id": id, "path": path }))
            } else {
                out.info(format!("Saved report: {}", path.display()));
                Ok(())
            }
        }
        Command::VideoScript {
            job_id,
            duration,
            language,
        } => {
            let id = resolve_job_id(job_id.as_deref(), store_ref)?;
            tracing::info!(job_id = %id, duration, "generating video script");
            let script = client
                .generate_video_script(&VideoScriptRequest {
                    job_id: id.clone(),
                    language: *language,
                    duration: *duration,
                })
                .await
                .with_context(|| format!("video script for job {id}"))?;
            if out.json {
                out.json(&script)
            } else {
                out.summary(text_summary::build_video_script_summary(&script));
                Ok(())
            }
        }
        Command::Predict {
            variants,
            variants_file,
            language,
        } => {
            let file_text = match variants_file {
                Some(p) => Some(
                    std::fs::read_to_string(p)
                        .with_context(|| format!("read {}", p.display()))?,
                ),
                None => None,
            };
            let inputs = variants
                .iter()
                .map(String::as_str)
                .chain(file_text.as_deref());
            let job_id = recent_job(store_ref).unwrap_or_else(|e| {
                tracing::warn!(error = %format!("{e:#}"), "scoring without job context");
                None
            });
            let resp = crate::campaign::predict(&client, inputs, *language, job_id).await?;
            if out.json {
                out.json(&resp)
            } else {
                out.summary(text_summary::build_campaign_summary(&resp));
                Ok(())
            }
        }
        Command::Chat { question, job } => {
            let job_id = match job {
                Some(id) => Some(id.clone()),
                None => recent_job(store_ref).unwrap_or(None),
            };
            let reply = crate::chat::ask(&client, question, job_id.as_deref()).await?;
            if out.json {
                out.json(&reply)
            } else {
                if reply.source == crate::chat::AnswerSource::Offline {
                    out.info("Service unreachable, answering offline.");
                }
                out.summary(TextSummary {
                    lines: vec![reply.answer],
                });
                Ok(())
            }
        }
        Command::Dashboard { job_id, export_csv } => {
            let id = resolve_job_id(job_id.as_deref(), store_ref)?;
            let data = client
                .dashboard(&id)
                .await
                .with_context(|| format!("dashboard for job {id}"))?;
            if out.json {
                out.json(&data)?;
            } else {
                out.summary(text_summary::build_dashboard_summary(&data));
            }
            if let Some(target) = export_csv {
                let path = crate::dashboard::export_csv(&client, &id, target.as_deref()).await?;
                out.info(format!("Saved export: {}", path.display()));
            }
            Ok(())
        }
        Command::Recent { clear } => {
            let Some(store) = store_ref else {
                bail!("no location for the recent job id; pass --state-file");
            };
            if *clear {
                let removed = store.clear()?;
                if out.json {
                    out.json(&serde_json::json!({ "cleared": removed }))?;
                } else if removed {
                    out.info(format!("Recent job forgotten ({}).", store.path().display()));
                } else {
                    out.info("No recent job recorded.");
                }
                return Ok(());
            }
            let id = store.load()?;
            if out.json {
                out.json(&serde_json::json!({ "job_id": id }))
            } else {
                match id {
                    Some(id) => out.summary(TextSummary { lines: vec![id] }),
                    None => out.info("No recent job recorded."),
                }
                Ok(())
            }
        }
    }
}

/// Submit through the controller, print progress and wait for a terminal state.
async fn run_analyze(
    a: &AnalyzeArgs,
    cfg: RunConfig,
    client: SentimentClient,
    store: Option<RecentJobStore>,
    out: &Output,
) -> Result<()> {
    let api: Arc<dyn JobApi> = Arc::new(client.clone());
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<JobEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let controller = JobController::new(api, cfg.clone(), store, evt_tx);
    let ctl_handle = tokio::spawn(run_controller(controller, cmd_rx));

    let (reply_tx, reply_rx) = oneshot::channel();
    cmd_tx
        .send(UiCommand::Submit {
            form: Box::new(a.to_form()),
            reply: reply_tx,
        })
        .map_err(|_| anyhow!("job controller stopped"))?;
    if let Err(e) = reply_rx.await.context("job controller stopped")? {
        let _ = cmd_tx.send(UiCommand::Quit);
        let _ = ctl_handle.await;
        return Err(e.into());
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut last_progress: Option<(u8, String)> = None;

    let finished: Result<JobOutcome> = loop {
        tokio::select! {
            ev = evt_rx.recv() => match ev {
                Some(JobEvent::StateChanged { state }) => match state {
                    JobState::Completed { outcome } => break Ok(outcome),
                    JobState::Failed { job_id, reason } => {
                        break Err(match job_id {
                            Some(id) => anyhow!("job {id} failed: {reason}"),
                            None => anyhow!("job not submitted: {reason}"),
                        });
                    }
                    JobState::Submitting => out.info("Submitting analysis..."),
                    JobState::Polling { job_id, progress, message } => {
                        let current = (progress, message);
                        if last_progress.as_ref() != Some(&current) {
                            let (progress, message) = &current;
                            out.info(format!("[{progress:>3}%] {job_id} {message}").trim_end().to_string());
                            last_progress = Some(current);
                        }
                    }
                    JobState::FetchingResult { .. } => out.info("Fetching results..."),
                    JobState::Idle => {}
                },
                Some(JobEvent::Info(info)) => out.info(info.to_message()),
                None => break Err(anyhow!("job controller stopped")),
            },
            _ = &mut ctrl_c => {
                let _ = cmd_tx.send(UiCommand::Cancel);
                break Err(anyhow!("analysis cancelled"));
            }
        }
    };

    let _ = cmd_tx.send(UiCommand::Quit);
    ctl_handle.await.context("job controller task failed")??;

    let outcome = finished?;
    let processed = process_job_completion(&client, a.report.as_deref(), &outcome).await;
    for msg in processed.messages {
        out.info(msg);
    }
    if out.json {
        out.json(&analyze_document(
            &cfg,
            &outcome,
            processed.report_path.as_deref(),
        ))
    } else {
        out.summary(text_summary::build_outcome_summary(&outcome));
        Ok(())
    }
}

/// JSON document printed by `analyze --json`, including the effective settings.
fn analyze_document(
    cfg: &RunConfig,
    outcome: &JobOutcome,
    report_path: Option<&Path>,
) -> serde_json::Value {
    serde_json::json!({
        "job_id": outcome.job_id,
        "counts": outcome.counts,
        "result_error": outcome.result_error,
        "finished_utc": outcome.finished_utc,
        "report_path": report_path,
        "config": cfg,
    })
}
