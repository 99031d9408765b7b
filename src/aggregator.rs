use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

use crate::api;
use crate::error::AppError;
use crate::manifest::{
    apply_defaults, apply_duplicates, carry_last_update, download_link, required_str, trim,
    write_master, FieldRules,
};
use crate::models::Manifest;

pub struct AggregatorConfig {
    pub plugins_dir: PathBuf,
    pub output: PathBuf,
    /// GitHub account that hosts one release repository per plugin, named
    /// after the plugin's InternalName.
    pub owner: String,
    pub rules: FieldRules,
}

/// Collect one manifest per plugin directory. A subdirectory `Name/` only
/// qualifies when it contains `Name.json`; everything else is ignored.
pub fn discover_manifests(plugins_dir: &Path) -> Result<Vec<Manifest>, AppError> {
    let mut paths: Vec<PathBuf> = Vec::new();

    for entry in fs::read_dir(plugins_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(|s| s.to_string()) else {
            continue;
        };
        let manifest_path = entry.path().join(format!("{}.json", name));
        if manifest_path.is_file() {
            paths.push(manifest_path);
        }
    }

    // read_dir order is platform-dependent; sort for a stable output order
    paths.sort();

    let mut manifests = Vec::new();
    for path in paths {
        let text = fs::read_to_string(&path)?;
        manifests.push(serde_json::from_str(text.trim_start_matches('\u{feff}'))?);
    }
    Ok(manifests)
}

/// Trim to the public field set, then synthesize the derived fields: install
/// link from the URL template, defaults, and the testing/update link fan-out.
pub fn enrich(manifest: &Manifest, rules: &FieldRules) -> Result<Manifest, AppError> {
    let mut trimmed = trim(manifest, rules);
    let link = download_link(&trimmed, rules)?;
    trimmed.insert("DownloadLinkInstall".to_string(), json!(link));
    apply_defaults(&mut trimmed, rules);
    apply_duplicates(&mut trimmed, rules);
    Ok(trimmed)
}

/// The previous run's output, or an empty list on the first run.
fn read_previous(path: &Path) -> Vec<Manifest> {
    fs::read_to_string(path)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub async fn run(client: &reqwest::Client, config: &AggregatorConfig) -> Result<(), AppError> {
    let manifests = discover_manifests(&config.plugins_dir)?;
    println!(
        "Found {} plugin manifests in {}",
        manifests.len(),
        config.plugins_dir.display()
    );

    let mut master: Vec<Manifest> = Vec::new();
    for manifest in &manifests {
        let mut entry = enrich(manifest, &config.rules)?;

        let name = required_str(&entry, "InternalName")?.to_string();
        let version = required_str(&entry, "AssemblyVersion")?.to_string();

        // cosmetic field: any lookup failure counts as zero downloads
        let count = api::release_by_tag(client, &config.owner, &name, &version)
            .await
            .map(|release| release.download_count())
            .unwrap_or(0);
        entry.insert("DownloadCount".to_string(), json!(count));

        println!("[OK] {}: {} ({} downloads)", name, version, count);
        master.push(entry);
    }

    let previous = read_previous(&config.output);
    carry_last_update(&mut master, &previous, unix_now());

    write_master(&config.output, &master).await?;
    println!(
        "Wrote {} manifests to {}",
        master.len(),
        config.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_plugin(root: &Path, name: &str, file: &str, body: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file), body).unwrap();
    }

    #[test]
    fn discovery_requires_matching_file_name() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(tmp.path(), "Good", "Good.json", r#"{"InternalName": "Good"}"#);
        write_plugin(tmp.path(), "Renamed", "other.json", r#"{"InternalName": "Bad"}"#);
        fs::write(tmp.path().join("stray.json"), "{}").unwrap();

        let manifests = discover_manifests(tmp.path()).unwrap();
        assert_eq!(manifests.len(), 1);
        assert_eq!(
            manifests[0].get("InternalName"),
            Some(&json!("Good"))
        );
    }

    #[test]
    fn discovery_tolerates_a_bom_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(
            tmp.path(),
            "Bommy",
            "Bommy.json",
            "\u{feff}{\"InternalName\": \"Bommy\"}",
        );

        let manifests = discover_manifests(tmp.path()).unwrap();
        assert_eq!(manifests.len(), 1);
    }

    #[test]
    fn discovery_sorts_by_path() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(tmp.path(), "Zeta", "Zeta.json", r#"{"InternalName": "Zeta"}"#);
        write_plugin(tmp.path(), "Alpha", "Alpha.json", r#"{"InternalName": "Alpha"}"#);

        let manifests = discover_manifests(tmp.path()).unwrap();
        let names: Vec<_> = manifests
            .iter()
            .map(|m| m.get("InternalName").unwrap().as_str().unwrap())
            .collect();
        assert_eq!(names, ["Alpha", "Zeta"]);
    }

    #[test]
    fn enrich_trims_links_and_defaults() {
        let rules = FieldRules::default();
        let manifest: Manifest = serde_json::from_str(
            r#"{
                "InternalName": "MyPlugin",
                "Name": "My Plugin",
                "RepoUrl": "https://github.com/o/MyPlugin",
                "AssemblyVersion": "1.0.0",
                "PrivateNote": "drop me"
            }"#,
        )
        .unwrap();

        let enriched = enrich(&manifest, &rules).unwrap();
        assert!(!enriched.contains_key("PrivateNote"));
        assert_eq!(
            enriched.get("DownloadLinkInstall"),
            Some(&json!(
                "https://github.com/o/MyPlugin/releases/download/v1.0.0/latest.zip"
            ))
        );
        assert_eq!(
            enriched.get("DownloadLinkInstall"),
            enriched.get("DownloadLinkTesting")
        );
        assert_eq!(
            enriched.get("DownloadLinkInstall"),
            enriched.get("DownloadLinkUpdate")
        );
        assert_eq!(enriched.get("IsHide"), Some(&json!(false)));
        assert_eq!(enriched.get("ApplicableVersion"), Some(&json!("any")));
    }

    #[test]
    fn enrich_fails_without_repo_url() {
        let rules = FieldRules::default();
        let manifest: Manifest = serde_json::from_str(
            r#"{"InternalName": "MyPlugin", "AssemblyVersion": "1.0.0"}"#,
        )
        .unwrap();
        assert!(enrich(&manifest, &rules).is_err());
    }

    #[test]
    fn missing_previous_output_means_first_run() {
        let tmp = tempfile::tempdir().unwrap();
        let previous = read_previous(&tmp.path().join("pluginmaster.json"));
        assert!(previous.is_empty());
    }
}
