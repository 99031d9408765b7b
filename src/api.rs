use std::time::Duration;

use crate::error::AppError;
use crate::models::Release;

const API_BASE_URL: &str = "https://api.github.com";
const RAW_BASE_URL: &str = "https://raw.githubusercontent.com";
const USER_AGENT: &str = "pluginmaster/0.1 (+contact: you@example.com)";

/// One client per run; every request carries the same agent and timeout.
/// Failures are not retried, the batch is simply re-run on the next schedule.
pub fn build_client(timeout: u64) -> Result<reqwest::Client, AppError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout))
        .build()?)
}

async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, AppError> {
    let response = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Status(url.to_string(), status));
    }

    Ok(response.text().await?)
}

/// All releases of a repository, newest first as GitHub orders them.
pub async fn list_releases(
    client: &reqwest::Client,
    repo: &str,
) -> Result<Vec<Release>, AppError> {
    let url = format!("{}/repos/{}/releases", API_BASE_URL, repo);
    let text = get_text(client, &url).await?;
    Ok(serde_json::from_str(&text)?)
}

/// The release tagged `v{version}`, or None when the tag does not exist (or
/// the lookup fails in any way the caller should not care about).
pub async fn release_by_tag(
    client: &reqwest::Client,
    owner: &str,
    repo: &str,
    version: &str,
) -> Option<Release> {
    let url = format!(
        "{}/repos/{}/{}/releases/tags/v{}",
        API_BASE_URL, owner, repo, version
    );
    let text = get_text(client, &url).await.ok()?;
    serde_json::from_str(&text).ok()
}

/// Fetch `manifest.json` from the repository's default branch. Some plugin
/// authors commit the file with a UTF-8 BOM, which serde_json rejects, so the
/// prefix is stripped before parsing.
pub async fn fetch_manifest(
    client: &reqwest::Client,
    repo: &str,
) -> Result<crate::models::Manifest, AppError> {
    let url = format!("{}/{}/HEAD/manifest.json", RAW_BASE_URL, repo);
    let text = get_text(client, &url).await?;
    Ok(serde_json::from_str(text.trim_start_matches('\u{feff}'))?)
}
