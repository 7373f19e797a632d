use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub base_url: String,
    pub user_agent: String,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Upper bound for the retry delay after failed status requests.
    #[serde(with = "humantime_serde")]
    pub max_poll_interval: Duration,
    /// Overall budget for a job to reach a terminal status once accepted.
    #[serde(with = "humantime_serde")]
    pub deadline: Duration,
    pub remember_job: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".into(),
            user_agent: format!("sentiment-job-cli/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_secs(2),
            max_poll_interval: Duration::from_secs(30),
            deadline: Duration::from_secs(30 * 60),
            remember_job: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    Url,
    Keywords,
    Demo,
}

impl SearchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchMethod::Url => "url",
            SearchMethod::Keywords => "keywords",
            SearchMethod::Demo => "demo",
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    De,
    #[default]
    En,
}

/// Raw user input for an analysis job, before validation.
#[derive(Debug, Clone, Default)]
pub struct AnalysisForm {
    pub email: String,
    pub search_method: Option<SearchMethod>,
    pub url: Option<String>,
    pub keywords: Option<String>,
    pub custom_prompt: Option<String>,
    pub language: Language,
}

/// Validated submission payload as sent to `POST /api/analyze`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub email: String,
    #[serde(rename = "customPrompt")]
    pub custom_prompt: Option<String>,
    #[serde(rename = "searchMethod")]
    pub search_method: SearchMethod,
    pub language: Language,
    /// Hint pointing the server at the previously submitted job.
    #[serde(rename = "job_id")]
    pub previous_job_id: Option<String>,
    /// Target for the chosen search method (URL, keyword string or `demo`).
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub job_id: Option<String>,
}

/// Server-reported job status. Values the client does not know are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Unknown(String),
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Unknown(s),
        }
    }
}

impl From<JobStatus> for String {
    fn from(s: JobStatus) -> Self {
        match s {
            JobStatus::Pending => "pending".into(),
            JobStatus::Running => "running".into(),
            JobStatus::Completed => "completed".into(),
            JobStatus::Failed => "failed".into(),
            JobStatus::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusResponse {
    /// Progress rounded to a whole percent and clamped to 0..=100.
    pub fn progress_percent(&self) -> u8 {
        let p = self.progress.unwrap_or(0.0);
        if !p.is_finite() {
            return 0;
        }
        p.round().clamp(0.0, 100.0) as u8
    }

    pub fn message_text(&self) -> String {
        self.message.clone().unwrap_or_default()
    }
}

/// Aggregate sentiment tally for a completed job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
    pub total: u64,
}

/// `statistics` object of the flat results shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlatStatistics {
    #[serde(default)]
    pub positive: Option<u64>,
    #[serde(default)]
    pub negative: Option<u64>,
    #[serde(default)]
    pub neutral: Option<u64>,
    #[serde(default)]
    pub total_reviews: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendsEnvelope {
    #[serde(default)]
    pub summary: Option<TrendsSummary>,
}

/// `trends.summary` object of the nested results shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendsSummary {
    #[serde(default)]
    pub total_positive: Option<u64>,
    #[serde(default)]
    pub total_negative: Option<u64>,
    #[serde(default)]
    pub total_neutral: Option<u64>,
    #[serde(default)]
    pub total_reviews: Option<u64>,
}

/// Body of `GET /api/results/{id}/data`.
///
/// The server answers with one of two shapes. A non-null `statistics` object
/// wins; anything else is read as the nested `trends.summary` shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResultsPayload {
    Flat {
        statistics: FlatStatistics,
    },
    Nested {
        #[serde(default)]
        trends: Option<TrendsEnvelope>,
    },
}

impl ResultsPayload {
    pub fn counts(&self) -> SentimentCounts {
        match self {
            ResultsPayload::Flat { statistics } => SentimentCounts {
                positive: statistics.positive.unwrap_or(0),
                negative: statistics.negative.unwrap_or(0),
                neutral: statistics.neutral.unwrap_or(0),
                total: statistics.total_reviews.unwrap_or(0),
            },
            ResultsPayload::Nested { trends } => {
                let summary = trends
                    .as_ref()
                    .and_then(|t| t.summary.clone())
                    .unwrap_or_default();
                SentimentCounts {
                    positive: summary.total_positive.unwrap_or(0),
                    negative: summary.total_negative.unwrap_or(0),
                    neutral: summary.total_neutral.unwrap_or(0),
                    total: summary.total_reviews.unwrap_or(0),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoScriptRequest {
    pub job_id: String,
    pub language: Language,
    pub duration: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoScript {
    #[serde(default)]
    pub hook: Option<String>,
    #[serde(default)]
    pub key_messages: Vec<String>,
    #[serde(default)]
    pub call_to_action: Option<String>,
    #[serde(default)]
    pub visual_suggestions: Vec<String>,
    #[serde(default)]
    pub image_prompts: Option<ImagePrompts>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePrompts {
    #[serde(default)]
    pub hook: Option<String>,
    #[serde(default)]
    pub key_messages: Option<String>,
    #[serde(default)]
    pub cta: Option<String>,
    #[serde(default)]
    pub visuals: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignRequest {
    pub variants: Vec<String>,
    pub language: Language,
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignPrediction {
    pub text: String,
    pub score: f64,
    #[serde(default)]
    pub roi_projection: String,
    #[serde(default)]
    pub sentiment_alignment: Option<String>,
    #[serde(default)]
    pub business_rules_applied: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignResponse {
    pub predictions: Vec<CampaignPrediction>,
    /// Server's pick. Authoritative even when it disagrees with list order.
    pub best_variant: CampaignPrediction,
    #[serde(default)]
    pub total_analyzed: Option<u64>,
    #[serde(default)]
    pub analysis_method: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    #[serde(rename = "POSITIVE", default)]
    pub positive: u64,
    #[serde(rename = "NEUTRAL", default)]
    pub neutral: u64,
    #[serde(rename = "NEGATIVE", default)]
    pub negative: u64,
}

/// One point of the dashboard trend series. Accepts both lower-case keys and
/// the upper-case distribution keys the server uses when it has no trend file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    #[serde(default, alias = "POSITIVE")]
    pub positive: f64,
    #[serde(default, alias = "NEUTRAL")]
    pub neutral: f64,
    #[serde(default, alias = "NEGATIVE")]
    pub negative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardAlert {
    pub severity: String,
    #[serde(default)]
    pub icon: String,
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub sentiment_distribution: SentimentDistribution,
    #[serde(default)]
    pub positive_percentage: f64,
    #[serde(default)]
    pub sentiment_trends: Vec<TrendPoint>,
    #[serde(default)]
    pub alerts: Vec<DashboardAlert>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// Terminal result of a job that the server reported as completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub counts: SentimentCounts,
    /// Set when the results request failed and `counts` fell back to zero.
    #[serde(default)]
    pub result_error: Option<String>,
    pub finished_utc: String,
}

/// Local view of the current job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Submitting,
    Polling {
        job_id: String,
        progress: u8,
        message: String,
    },
    FetchingResult {
        job_id: String,
    },
    Completed {
        outcome: JobOutcome,
    },
    Failed {
        job_id: Option<String>,
        reason: String,
    },
}

impl JobState {
    pub fn name(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Submitting => "submitting",
            JobState::Polling { .. } => "polling",
            JobState::FetchingResult { .. } => "fetching_result",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    StateChanged { state: JobState },
    Info(InfoEvent),
}

/// Structured info events emitted by the engine and consumed by the CLI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoEvent {
    JobAccepted { job_id: String },
    RecentJobNotSaved { error: String },
    PollRetry { attempt: u32, error: String, retry_in: Duration },
    UnknownStatus { status: String },
    ResultFetchFailed { error: String },
    Cancelled { job_id: Option<String> },
}

impl InfoEvent {
    /// Render a human-readable message for the CLI.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::JobAccepted { job_id } => format!("Job accepted: {job_id}"),
            InfoEvent::RecentJobNotSaved { error } => {
                format!("Could not remember job id: {error}")
            }
            InfoEvent::PollRetry {
                attempt,
                error,
                retry_in,
            } => format!(
                "Status check failed (attempt {attempt}): {error}; retrying in {}",
                humantime::format_duration(*retry_in)
            ),
            InfoEvent::UnknownStatus { status } => {
                format!("Server reported unknown status '{status}', still waiting")
            }
            InfoEvent::ResultFetchFailed { error } => {
                format!("Job completed but results could not be loaded: {error}")
            }
            InfoEvent::Cancelled { job_id: Some(id) } => format!("Stopped tracking job {id}"),
            InfoEvent::Cancelled { job_id: None } => "Submission cancelled".to_string(),
        }
    }
}
