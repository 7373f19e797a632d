//! Error taxonomy for the job lifecycle.
//!
//! `ApiError` describes what went wrong on the wire; `JobError` says at which
//! point of the lifecycle it happened and is what callers match on.

use crate::model::SearchMethod;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response body: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("unusable base url '{0}'")]
    BaseUrl(String),
}

/// Local validation failures. Nothing is sent when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid email address(es): {}", .0.join(", "))]
    InvalidEmails(Vec<String>),
    #[error("a search method is required")]
    MissingSearchMethod,
    #[error("search method '{0}' needs a non-empty target")]
    MissingTarget(SearchMethod),
    #[error("at least one campaign variant is required")]
    NoVariants,
    #[error("question must not be empty")]
    EmptyQuestion,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),
    #[error("submission failed: {0}")]
    Submission(#[source] ApiError),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("status check failed: {0}")]
    Poll(#[source] ApiError),
    #[error("could not load results: {0}")]
    ResultFetch(#[source] ApiError),
    #[error("job failed: {0}")]
    JobFailed(String),
    #[error("job did not finish within {0:?}")]
    Timeout(Duration),
    #[error("job tracking was cancelled")]
    Cancelled,
}
