use std::collections::HashMap;

use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::Manifest;

/// Fixed field policy for the output manifests: which keys survive trimming,
/// which defaults are injected, and how download links fan out.
#[derive(Debug, Clone)]
pub struct FieldRules {
    pub trimmed_keys: Vec<&'static str>,
    pub defaults: Vec<(&'static str, Value)>,
    pub duplicates: Vec<(&'static str, Vec<&'static str>)>,
    pub download_url: &'static str,
}

impl Default for FieldRules {
    fn default() -> Self {
        FieldRules {
            trimmed_keys: vec![
                "Author",
                "Name",
                "Punchline",
                "Description",
                "Changelog",
                "InternalName",
                "AssemblyVersion",
                "RepoUrl",
                "ApplicableVersion",
                "Tags",
                "CategoryTags",
                "DalamudApiLevel",
                "IconUrl",
                "ImageUrls",
            ],
            defaults: vec![
                ("IsHide", json!(false)),
                ("IsTestingExclusive", json!(false)),
                ("ApplicableVersion", json!("any")),
            ],
            duplicates: vec![(
                "DownloadLinkInstall",
                vec!["DownloadLinkTesting", "DownloadLinkUpdate"],
            )],
            download_url: "{repo}/releases/download/v{version}/latest.zip",
        }
    }
}

/// Keep only the allow-listed keys. Keys absent from the manifest are simply
/// omitted, everything else is dropped.
pub fn trim(manifest: &Manifest, rules: &FieldRules) -> Manifest {
    rules
        .trimmed_keys
        .iter()
        .filter_map(|k| manifest.get(*k).map(|v| (k.to_string(), v.clone())))
        .collect()
}

/// Insert default values for keys the manifest does not set. Existing values
/// are never overwritten.
pub fn apply_defaults(manifest: &mut Manifest, rules: &FieldRules) {
    for (key, value) in &rules.defaults {
        if !manifest.contains_key(*key) {
            manifest.insert(key.to_string(), value.clone());
        }
    }
}

/// Copy each source key into its absent target keys.
pub fn apply_duplicates(manifest: &mut Manifest, rules: &FieldRules) {
    for (source, targets) in &rules.duplicates {
        let Some(value) = manifest.get(*source).cloned() else {
            continue;
        };
        for target in targets {
            if !manifest.contains_key(*target) {
                manifest.insert(target.to_string(), value.clone());
            }
        }
    }
}

pub fn required_str<'a>(manifest: &'a Manifest, key: &str) -> Result<&'a str, AppError> {
    manifest.get(key).and_then(|v| v.as_str()).ok_or_else(|| {
        let name = manifest
            .get("InternalName")
            .and_then(|v| v.as_str())
            .unwrap_or("<unknown>");
        AppError::MissingKey(name.to_string(), key.to_string())
    })
}

/// Build `DownloadLinkInstall` from `RepoUrl` and `AssemblyVersion`.
pub fn download_link(manifest: &Manifest, rules: &FieldRules) -> Result<String, AppError> {
    let repo = required_str(manifest, "RepoUrl")?;
    let version = required_str(manifest, "AssemblyVersion")?;
    Ok(rules
        .download_url
        .replace("{repo}", repo)
        .replace("{version}", version))
}

/// Stamp every manifest with `now`, then carry `LastUpdate` over from the
/// previous run for entries whose `InternalName` and `AssemblyVersion` both
/// still match. First previous entry per name wins.
pub fn carry_last_update(manifests: &mut [Manifest], previous: &[Manifest], now: u64) {
    let mut by_name: HashMap<&str, &Manifest> = HashMap::new();
    for prev in previous {
        if let Some(name) = prev.get("InternalName").and_then(|v| v.as_str()) {
            by_name.entry(name).or_insert(prev);
        }
    }

    for manifest in manifests.iter_mut() {
        let mut last_update = json!(now.to_string());

        let name = manifest.get("InternalName").and_then(|v| v.as_str());
        if let Some(prev) = name.and_then(|n| by_name.get(n)) {
            if manifest.get("AssemblyVersion") == prev.get("AssemblyVersion") {
                if let Some(stamp) = prev.get("LastUpdate") {
                    last_update = stamp.clone();
                }
            }
        }

        manifest.insert("LastUpdate".to_string(), last_update);
    }
}

/// Serialize the pluginmaster as a pretty-printed JSON array.
pub async fn write_master(path: &std::path::Path, master: &[Manifest]) -> Result<(), AppError> {
    let body = serde_json::to_string_pretty(master)?;
    tokio::fs::write(path, body).await?;
    Ok(())
}
