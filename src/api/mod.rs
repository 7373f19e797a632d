//! HTTP contract of the sentiment-analysis service.
//!
//! `JobApi` is the narrow seam the job engine drives; `SentimentClient`
//! implements it over reqwest and additionally exposes the endpoints used by
//! follow-up commands.

mod client;

pub use client::SentimentClient;

use crate::error::ApiError;
use crate::model::{AnalysisRequest, ResultsPayload, StatusResponse, SubmitResponse};
use async_trait::async_trait;

#[async_trait]
pub trait JobApi: Send + Sync {
    async fn submit_job(&self, request: &AnalysisRequest) -> Result<SubmitResponse, ApiError>;

    async fn job_status(&self, job_id: &str) -> Result<StatusResponse, ApiError>;

    async fn job_results(&self, job_id: &str) -> Result<ResultsPayload, ApiError>;
}
