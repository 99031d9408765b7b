use std::fs;
use std::path::Path;

use serde_json::json;

use crate::api;
use crate::error::AppError;
use crate::manifest::write_master;
use crate::models::{Manifest, Release, ResolvedReleases};

/// Read the newline-delimited `owner/repo` list. Blank lines are skipped.
fn read_repo_list(path: &Path) -> Result<Vec<String>, AppError> {
    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect())
}

/// Pick the latest stable and latest testing release out of a feed that is
/// assumed newest-first (GitHub returns it that way; an unsorted feed would
/// silently pick the wrong "latest"). Stops as soon as both are found.
///
/// A pre-release that shares the stable tag is not testing-distinct and is
/// dropped. A repository with only pre-releases installs from its pre-release.
pub fn resolve_releases(releases: &[Release]) -> Option<ResolvedReleases> {
    let mut stable: Option<&Release> = None;
    let mut testing: Option<&Release> = None;

    for release in releases {
        if release.draft {
            continue;
        }
        if release.prerelease {
            if testing.is_none() {
                testing = Some(release);
            }
        } else if stable.is_none() {
            stable = Some(release);
        }
        if stable.is_some() && testing.is_some() {
            break;
        }
    }

    match (stable, testing) {
        (None, None) => None,
        (Some(s), Some(t)) if t.tag_name == s.tag_name => Some(ResolvedReleases {
            stable: s.clone(),
            testing: None,
        }),
        (Some(s), t) => Some(ResolvedReleases {
            stable: s.clone(),
            testing: t.cloned(),
        }),
        (None, Some(t)) => Some(ResolvedReleases {
            stable: t.clone(),
            testing: Some(t.clone()),
        }),
    }
}

/// Fill the release-derived fields into a fetched manifest. Returns false when
/// the install release has nothing to download, in which case the repository
/// is skipped.
pub fn populate_release_fields(
    manifest: &mut Manifest,
    resolved: &ResolvedReleases,
    download_count: u64,
) -> bool {
    let Some(asset) = resolved.stable.assets.first() else {
        return false;
    };

    manifest.insert("AssemblyVersion".to_string(), json!(resolved.stable.version()));
    manifest.insert(
        "DownloadLinkInstall".to_string(),
        json!(asset.browser_download_url),
    );
    manifest.insert(
        "DownloadLinkUpdate".to_string(),
        json!(asset.browser_download_url),
    );

    if let Some(testing) = &resolved.testing {
        if let Some(testing_asset) = testing.assets.first() {
            manifest.insert("TestingAssemblyVersion".to_string(), json!(testing.version()));
            manifest.insert(
                "DownloadLinkTesting".to_string(),
                json!(testing_asset.browser_download_url),
            );
        }
    }

    if let Some(body) = resolved.stable.body.as_deref() {
        if !body.is_empty() {
            manifest.insert("Changelog".to_string(), json!(body));
        }
    }

    manifest.insert("DownloadCount".to_string(), json!(download_count));
    true
}

pub async fn run(
    client: &reqwest::Client,
    repos_file: &Path,
    output: &Path,
) -> Result<(), AppError> {
    let repos = read_repo_list(repos_file)?;
    println!("Resolving releases for {} repositories", repos.len());

    let mut master: Vec<Manifest> = Vec::new();

    for repo in &repos {
        let releases = api::list_releases(client, repo).await?;

        let Some(resolved) = resolve_releases(&releases) else {
            println!("[SKIP] {}: no published releases", repo);
            continue;
        };

        let mut manifest = api::fetch_manifest(client, repo).await?;

        let total_downloads: u64 = releases
            .iter()
            .filter(|r| !r.draft)
            .map(|r| r.download_count())
            .sum();

        if !populate_release_fields(&mut manifest, &resolved, total_downloads) {
            println!(
                "[SKIP] {}: release {} has no assets",
                repo, resolved.stable.tag_name
            );
            continue;
        }

        match &resolved.testing {
            Some(testing) => println!(
                "[OK] {}: {} (testing {})",
                repo,
                resolved.stable.version(),
                testing.version()
            ),
            None => println!("[OK] {}: {}", repo, resolved.stable.version()),
        }

        master.push(manifest);
    }

    write_master(output, &master).await?;
    println!("Wrote {} manifests to {}", master.len(), output.display());
    Ok(())
}
