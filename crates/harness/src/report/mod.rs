//! Report emission.
//!
//! All three artifacts derive from the same finalized run snapshot; nothing
//! here re-queries the system under test. Artifacts land in a timestamped
//! directory so consecutive runs never clobber each other.

pub mod html;
pub mod json;
pub mod text;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::run::{RunSummary, ValidationRun};

/// Filesystem locations of one run's artifacts.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub dir: PathBuf,
    pub json: PathBuf,
    pub html: PathBuf,
    pub text: PathBuf,
}

/// Write `report.json`, `report.html` and `summary.txt` under a timestamped
/// directory below `base_dir`.
///
/// # Errors
/// Returns an error if the directory cannot be created, a template fails to
/// render, or a file write fails.
pub fn write_all(
    base_dir: &Path,
    run: &ValidationRun,
    summary: &RunSummary,
) -> Result<ReportPaths, Error> {
    let stamp = run.started_at.format("%Y%m%d-%H%M%S").to_string();
    let dir = base_dir.join(stamp);
    fs::create_dir_all(&dir)?;

    let paths = ReportPaths {
        json: dir.join("report.json"),
        html: dir.join("report.html"),
        text: dir.join("summary.txt"),
        dir,
    };

    fs::write(&paths.json, json::render(run, summary)?)?;
    fs::write(&paths.html, html::render(run, summary)?)?;
    fs::write(&paths.text, text::render(run, summary))?;

    Ok(paths)
}
