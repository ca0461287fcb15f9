//! Report history is served over plain HTTP rather than the event
//! stream, so it survives engine restarts between sessions.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use shared::protocol::ReportSummary;

#[derive(Debug, Deserialize)]
struct ReportListing {
    reports: Vec<ReportSummary>,
}

pub async fn fetch_reports(http: &Client, engine_url: &str) -> Result<Vec<ReportSummary>> {
    let url = format!("{}/api/reports", engine_url.trim_end_matches('/'));
    let listing: ReportListing = http
        .get(&url)
        .send()
        .await
        .with_context(|| format!("failed to fetch report listing: {url}"))?
        .error_for_status()
        .context("report listing request rejected")?
        .json()
        .await
        .context("failed to decode report listing")?;
    Ok(listing.reports)
}

/// Resolves a report's relative path against the engine base URL.
pub fn report_url(engine_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        engine_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
