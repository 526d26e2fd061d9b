//! Garbage report: the audit trail written before anything is deleted.

use chrono::{DateTime, Local};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::error::{ErrorCode, GcError, GcResult};
use crate::models::GcSummary;

/// File name of the report for a run started at `at`.
pub fn report_file_name(at: DateTime<Local>) -> String {
    format!("delete-{}.txt", at.format("%Y-%m-%d %H:%M:%S"))
}

/// Renders the garbage list, one path per line.
pub fn render_report(garbage: &[PathBuf]) -> String {
    let mut out = String::with_capacity(garbage.len() * 96);
    for path in garbage {
        out.push_str(&path.to_string_lossy());
        out.push('\n');
    }
    out
}

/// `name` with `-n` inserted before its extension (`delete-x.txt` -> `delete-x-2.txt`).
fn numbered_name(name: &str, n: usize) -> String {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!(
            "{}-{}.{}",
            stem.to_string_lossy(),
            n,
            ext.to_string_lossy()
        ),
        _ => format!("{}-{}", name, n),
    }
}

/// Writes the report into `dir` and returns its path.
///
/// The content goes to a temporary file first so a report is either complete
/// or absent. An existing report is never replaced: when `name` is taken the
/// first free `name-1`, `name-2`, ... is used instead.
pub async fn write_report(dir: &Path, name: &str, garbage: &[PathBuf]) -> GcResult<PathBuf> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| GcError::io(ErrorCode::ReportWrite, dir, e))?;

    let tmp = dir.join(format!(".{}.tmp", name));
    fs::write(&tmp, render_report(garbage))
        .await
        .map_err(|e| GcError::io(ErrorCode::ReportWrite, &tmp, e))?;

    // hard_link fails with AlreadyExists instead of overwriting
    let mut attempt = 0;
    let path = loop {
        let candidate = if attempt == 0 {
            dir.join(name)
        } else {
            dir.join(numbered_name(name, attempt))
        };
        match fs::hard_link(&tmp, &candidate).await {
            Ok(()) => break candidate,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => {
                let _ = fs::remove_file(&tmp).await;
                return Err(GcError::io(ErrorCode::ReportWrite, &candidate, e));
            }
        }
    };
    if let Err(e) = fs::remove_file(&tmp).await {
        warn!("Failed to remove {}: {}", tmp.display(), e);
    }
    if attempt > 0 {
        warn!("{} already exists, report renamed", dir.join(name).display());
    }

    info!("file list written to {}", path.display());
    Ok(path)
}

/// Writes `summary` as JSON next to the report.
pub async fn write_summary(report: &Path, summary: &GcSummary) -> GcResult<PathBuf> {
    let path = report.with_extension("json");
    let json = serde_json::to_vec_pretty(summary).map_err(|e| {
        GcError::with_message(ErrorCode::ReportWrite, format!("encode summary: {}", e))
    })?;
    fs::write(&path, json)
        .await
        .map_err(|e| GcError::io(ErrorCode::ReportWrite, &path, e))?;
    Ok(path)
}
