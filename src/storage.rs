//! Durable "most recent job" slot.
//!
//! A single job id is kept in a plain file so that follow-up commands (chat,
//! dashboard, report, export) can run against the last submission without
//! re-submitting.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "sentiment-job-cli";
const RECENT_JOB_FILE: &str = "recent_job";

/// Default location: `<data_dir>/sentiment-job-cli/recent_job`.
pub fn default_recent_job_path() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(dirs::home_dir)
        .context("could not determine a data directory")?;
    Ok(base.join(APP_DIR).join(RECENT_JOB_FILE))
}

#[derive(Debug, Clone)]
pub struct RecentJobStore {
    path: PathBuf,
}

impl RecentJobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::new(default_recent_job_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored job id. A missing or blank file means "no recent job".
    pub fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => {
                let id = s.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read {}", self.path.display())),
        }
    }

    /// Replace the stored job id. Last writer wins.
    pub fn save(&self, job_id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        // Write then rename so a concurrent reader never sees a partial id.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, job_id).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename to {}", self.path.display()))?;
        Ok(())
    }

    /// Forget the stored job id. Returns whether there was one.
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("remove {}", self.path.display())),
        }
    }
}
