use std::fmt;

use log::{debug, info};
use serde::Deserialize;

use crate::error::SyncError;
use crate::networking::NetworkClient;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_OWNER: &str = "GloriousEggroll";
pub const DEFAULT_REPO: &str = "proton-ge-custom";
pub const DEFAULT_ARCHIVE_EXTENSION: &str = ".tar.gz";

/// Owner and name of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Latest-release endpoint for this repository under `api_base`.
    pub fn latest_release_url(&self, api_base: &str) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            api_base.trim_end_matches('/'),
            self.owner,
            self.name
        )
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A downloadable file attached to a release. Does not contain all fields.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

/// A published release. Does not contain all fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl ReleaseInfo {
    /// First asset, in listed order, whose name ends with `extension`.
    pub fn archive_asset(&self, extension: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.name.ends_with(extension))
    }
}

/// Latest version tag together with the archive to fetch for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelease {
    pub tag: String,
    pub asset_name: String,
    pub download_url: String,
}

/// Parse a latest-release document and pick its archive asset.
pub fn resolve_from_json(body: &str, extension: &str) -> Result<ResolvedRelease, SyncError> {
    let release: ReleaseInfo = serde_json::from_str(body).map_err(SyncError::ReleaseParse)?;
    let asset = release
        .archive_asset(extension)
        .ok_or_else(|| SyncError::NoMatchingAsset {
            tag: release.tag_name.clone(),
            extension: extension.to_owned(),
        })?;
    debug!(
        "release: selected asset {} out of {}",
        asset.name,
        release.assets.len()
    );
    Ok(ResolvedRelease {
        tag: release.tag_name.clone(),
        asset_name: asset.name.clone(),
        download_url: asset.browser_download_url.clone(),
    })
}

/// Query the hosting API once for the latest release of `repo`.
///
/// # Errors
/// Transport and status failures map to `ReleaseRequest`, a body that is not
/// a release object to `ReleaseParse`, and a release without a matching
/// asset to `NoMatchingAsset`.
pub async fn fetch_latest(
    network: &NetworkClient,
    api_base: &str,
    repo: &RepoId,
    extension: &str,
) -> Result<ResolvedRelease, SyncError> {
    let url = repo.latest_release_url(api_base);
    info!("release: querying {url}");

    let body = network
        .http()
        .get(&url)
        .header("Accept", "application/vnd.github+json")
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(SyncError::ReleaseRequest)?
        .text()
        .await
        .map_err(SyncError::ReleaseRequest)?;

    resolve_from_json(&body, extension)
}
