use serde::Deserialize;

/// A plugin manifest is an open key/value document; only a known subset of
/// keys ends up in the output, the rest is carried or dropped as-is.
pub type Manifest = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub download_count: u64,
}

/// A GitHub release. Only the fields we read are declared.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
    pub body: Option<String>,
}

impl Release {
    /// Total downloads across every asset of this release.
    pub fn download_count(&self) -> u64 {
        self.assets.iter().map(|a| a.download_count).sum()
    }

    /// Version string for the manifest: the tag without its leading `v`.
    pub fn version(&self) -> &str {
        self.tag_name.trim_start_matches('v')
    }
}

/// Latest stable and latest testing release of one repository.
///
/// `testing` is None when the pre-release carries the same tag as the stable
/// release, or when no pre-release exists at all. For repositories that only
/// publish pre-releases, the pre-release stands in as `stable` and is kept in
/// `testing` too, so install and testing fields come out identical.
#[derive(Debug, Clone)]
pub struct ResolvedReleases {
    pub stable: Release,
    pub testing: Option<Release>,
}
