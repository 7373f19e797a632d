//! Local checks applied before anything is sent to the server.

use crate::error::ValidationError;
use crate::model::{AnalysisForm, AnalysisRequest, SearchMethod};
use regex::Regex;
use std::sync::OnceLock;

static EMAIL_PATTERN: OnceLock<Regex> = OnceLock::new();

fn email_pattern() -> &'static Regex {
    EMAIL_PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern compiles")
    })
}

/// Split a comma-separated recipient list and check every entry.
///
/// Returns the trimmed addresses, or every entry that failed the check.
pub fn validate_emails(input: &str) -> Result<Vec<String>, ValidationError> {
    let emails: Vec<String> = input.split(',').map(|e| e.trim().to_string()).collect();
    let invalid: Vec<String> = emails
        .iter()
        .filter(|e| !email_pattern().is_match(e))
        .cloned()
        .collect();
    if invalid.is_empty() {
        Ok(emails)
    } else {
        Err(ValidationError::InvalidEmails(invalid))
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Turn raw form input into a submission payload.
///
/// `previous_job_id` is the most recent job id known to the client and is passed
/// through as a hint.
pub fn build_request(
    form: &AnalysisForm,
    previous_job_id: Option<String>,
) -> Result<AnalysisRequest, ValidationError> {
    validate_emails(&form.email)?;
    let search_method = form
        .search_method
        .ok_or(ValidationError::MissingSearchMethod)?;

    let target = match search_method {
        SearchMethod::Url => non_empty(form.url.as_deref()),
        SearchMethod::Keywords => non_empty(form.keywords.as_deref()),
        SearchMethod::Demo => Some("demo".to_string()),
    }
    .ok_or(ValidationError::MissingTarget(search_method))?;

    Ok(AnalysisRequest {
        email: form.email.clone(),
        custom_prompt: non_empty(form.custom_prompt.as_deref()),
        search_method,
        language: form.language,
        previous_job_id,
        url: target,
    })
}

/// Split free-text campaign input into variants, one per non-empty line.
pub fn split_variants<'a, I>(inputs: I) -> Result<Vec<String>, ValidationError>
where
    I: IntoIterator<Item = &'a str>,
{
    let variants: Vec<String> = inputs
        .into_iter()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if variants.is_empty() {
        return Err(ValidationError::NoVariants);
    }
    Ok(variants)
}
