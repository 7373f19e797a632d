//! Application-level orchestration utilities.
//!
//! This module owns the job lifecycle (submit/replace/cancel) and post-completion
//! processing such as report download. CLI layers call into this module to keep
//! responsibilities separated.

mod controller;
mod post_process;

pub(crate) use controller::{run_controller, JobController, UiCommand};
pub(crate) use post_process::{
    default_export_name, default_report_name, download_report, process_job_completion,
    write_file,
};
