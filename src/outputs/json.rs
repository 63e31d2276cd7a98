//! JSON copy of the report.
//!
//! The file holds the whole [`Report`]: expanded keywords, lookback window,
//! cutoff, and the numbered items.

use crate::models::Report;
use crate::utils::ensure_writable_dir;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Serialize `report` to `path`, creating the parent directory if needed.
#[instrument(level = "info", skip_all, fields(path = %path, items = report.items.len()))]
pub async fn write_report(report: &Report, path: &str) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;

    let parent = Path::new(path)
        .parent()
        .and_then(|p| p.to_str())
        .filter(|p| !p.is_empty())
        .unwrap_or(".");
    ensure_writable_dir(parent).await?;

    fs::write(path, json).await?;
    info!("Wrote JSON report");
    Ok(())
}
